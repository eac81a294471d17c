#![forbid(unsafe_code)]

use thiserror::Error;

/// Playlist decoding, encoding and mutation errors.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("#EXTM3U absent")]
    MissingExtM3u,

    #[error("{field}:{value} value must be YES or NO")]
    NotYesOrNo { field: String, value: String },

    #[error("cannot detect playlist type")]
    UndetectablePlaylistType,

    #[error("dangling SCTE-35 DateRange tag after last segment not supported")]
    DanglingScte35DateRange,

    #[error("playlist is empty")]
    PlaylistEmpty,

    #[error("playlist is full")]
    PlaylistFull,

    #[error("winsize {winsize} must not be greater than capacity {capacity}")]
    WinSizeTooSmall { winsize: usize, capacity: usize },

    #[error("playlist already has skipped segments")]
    AlreadySkipped,

    #[error("error parsing {tag}: {cause}")]
    Parse {
        tag: &'static str,
        #[source]
        cause: Box<PlaylistError>,
    },

    #[error("invalid {field} value: {raw:?}")]
    InvalidValue { field: &'static str, raw: String },

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl PlaylistError {
    /// Wraps an error with the tag that was being parsed when it occurred.
    pub(crate) fn in_tag(self, tag: &'static str) -> PlaylistError {
        PlaylistError::Parse {
            tag,
            cause: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaylistError>;
