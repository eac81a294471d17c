//! HLS (m3u8) playlist parsing and generation.
//!
//! HLS playlists come in two kinds: a [`MultivariantPlaylist`] lists the
//! available renditions of a stream, a [`MediaPlaylist`] lists the media
//! segments of one rendition. Both are modeled as owned object graphs with
//! a bidirectional codec: decoding any playlist and re-encoding it yields
//! the same bytes (modulo line-ending normalization), and generated
//! playlists are rendered deterministically.
//!
//! The tag set follows `draft-pantos-hls-rfc8216bis-18`, including
//! Low-Latency HLS (partial segments, server control, delta updates) and
//! the legacy SCTE-35 signalling tags, while staying compatible with every
//! protocol version from 3 up. [`Playlist::decode`] auto-detects the
//! playlist kind by feeding both parsers until a discriminating tag
//! appears.
//!
//! Live playlists keep their segments in a bounded ring; with a non-zero
//! window size only the last `winsize` segments are encoded:
//!
//! ```
//! use syrinx::MediaPlaylist;
//!
//! let mut p = MediaPlaylist::new(3, 50)?;
//! for i in 0..5 {
//!     p.append(format!("test{i}.ts"), 5.0, "")?;
//! }
//! // Only test2.ts, test3.ts and test4.ts are emitted.
//! let out = p.encode();
//! # assert!(out.starts_with(b"#EXTM3U"));
//! # Ok::<(), syrinx::PlaylistError>(())
//! ```
//!
//! Decoding auto-detects the kind:
//!
//! ```
//! use syrinx::Playlist;
//!
//! let data = b"#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000\nlow.m3u8\n";
//! match Playlist::decode(data, true)? {
//!     Playlist::Multivariant(master) => assert_eq!(master.variants.len(), 1),
//!     Playlist::Media(_) => unreachable!(),
//! }
//! # Ok::<(), syrinx::PlaylistError>(())
//! ```
//!
//! A playlist instance is not internally synchronized; distinct instances
//! are independent and may be used from different threads. Encoding
//! populates an internal cache, so sharing one instance requires external
//! synchronization even for read-like calls.

#![forbid(unsafe_code)]

mod custom;
mod decode;
mod encode;
mod error;
mod lex;
mod media;
mod multivariant;
mod segment;
mod time;
mod types;
mod version;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;

pub use crate::custom::{CustomDecoder, CustomMap, CustomTag};
pub use crate::error::{PlaylistError, Result};
pub use crate::lex::{attributes, trimmed_attributes};
pub use crate::media::MediaPlaylist;
pub use crate::multivariant::{Alternative, MultivariantPlaylist, Variant, VariantParams};
pub use crate::segment::{MediaSegment, PartialSegment, SegmentIndexing};
pub use crate::time::{
    full_time_parse, parse_date_time, set_time_parse, strict_time_parse, TimeParseMode,
};
pub use crate::types::{
    Attribute, Channels, ContentSteering, DateRange, Define, DefineType, Key, Map, MediaType,
    PreloadHint, Scte35, Scte35CueKind, Scte35Syntax, ServerControl, SessionData,
};

/// A decoded playlist of either kind.
#[derive(Debug)]
pub enum Playlist {
    Multivariant(MultivariantPlaylist),
    Media(MediaPlaylist),
}

impl Playlist {
    /// Detects the playlist kind and decodes it. With `strict` the first
    /// syntax error is returned; otherwise recoverable errors are skipped.
    pub fn decode(data: &[u8], strict: bool) -> Result<Playlist> {
        decode::decode_playlist(data, strict, None)
    }

    /// Detects the playlist kind and decodes it from a reader.
    pub fn decode_from(reader: impl Read, strict: bool) -> Result<Playlist> {
        decode::decode_playlist_from(reader, strict, None)
    }

    /// Like [`Playlist::decode`], with custom tag decoders installed on
    /// both candidate parsers.
    pub fn decode_with(
        data: &[u8],
        strict: bool,
        decoders: Vec<Arc<dyn CustomDecoder>>,
    ) -> Result<Playlist> {
        decode::decode_playlist(data, strict, Some(decoders))
    }

    /// Renders the playlist, reusing the cached result when possible.
    pub fn encode(&mut self) -> Bytes {
        match self {
            Playlist::Multivariant(p) => p.encode(),
            Playlist::Media(p) => p.encode(),
        }
    }

    /// The declared protocol version.
    pub fn version(&self) -> u8 {
        match self {
            Playlist::Multivariant(p) => p.version(),
            Playlist::Media(p) => p.version(),
        }
    }

    /// The minimal protocol version required by the content present,
    /// together with the rule that requires it.
    pub fn calc_min_version(&self) -> (u8, &'static str) {
        match self {
            Playlist::Multivariant(p) => p.calc_min_version(),
            Playlist::Media(p) => p.calc_min_version(),
        }
    }

    /// The multivariant playlist, if that is the decoded kind.
    pub fn as_multivariant(&self) -> Option<&MultivariantPlaylist> {
        match self {
            Playlist::Multivariant(p) => Some(p),
            Playlist::Media(_) => None,
        }
    }

    /// The media playlist, if that is the decoded kind.
    pub fn as_media(&self) -> Option<&MediaPlaylist> {
        match self {
            Playlist::Multivariant(_) => None,
            Playlist::Media(p) => Some(p),
        }
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Playlist::Multivariant(p) => p.fmt(f),
            Playlist::Media(p) => p.fmt(f),
        }
    }
}
