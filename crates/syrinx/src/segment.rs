//! Media segments and Low-Latency HLS partial segments.

use chrono::{DateTime, FixedOffset};

use crate::custom::CustomMap;
use crate::types::{DateRange, Key, Map, Scte35};

/// One media segment of a media playlist.
#[derive(Debug, Default)]
pub struct MediaSegment {
    /// Sequence number. Unique and consecutive within the playlist.
    pub seq_id: u64,
    pub uri: String,
    /// EXTINF duration in seconds.
    pub duration: f64,
    /// Optional EXTINF title. May contain commas.
    pub title: String,
    /// EXT-X-BYTERANGE length in bytes; zero when the segment is the whole
    /// resource.
    pub limit: i64,
    /// EXT-X-BYTERANGE offset from the start of the resource.
    pub offset: i64,
    /// EXT-X-KEY overrides in effect from this segment on.
    pub keys: Vec<Key>,
    /// EXT-X-MAP override in effect from this segment on.
    pub map: Option<Map>,
    /// EXT-X-DISCONTINUITY before this segment.
    pub discontinuity: bool,
    /// EXT-X-GAP: the segment is announced but unavailable.
    pub gap: bool,
    /// SCTE-35 cue attached to this segment.
    pub scte: Option<Scte35>,
    /// SCTE-35 date ranges preceding this segment.
    pub scte35_date_ranges: Vec<DateRange>,
    /// EXT-X-PROGRAM-DATE-TIME of the first sample.
    pub program_date_time: Option<DateTime<FixedOffset>>,
    /// Custom tags attached to this segment.
    pub custom: CustomMap,
}

impl MediaSegment {
    pub fn new(uri: impl Into<String>, duration: f64, title: impl Into<String>) -> MediaSegment {
        MediaSegment {
            uri: uri.into(),
            duration,
            title: title.into(),
            ..MediaSegment::default()
        }
    }
}

/// One EXT-X-PART of a Low-Latency HLS playlist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialSegment {
    /// Sequence number of the full segment this part belongs to.
    pub seq_id: u64,
    pub uri: String,
    /// Part duration in seconds.
    pub duration: f64,
    /// INDEPENDENT=YES: the part starts with an independent frame.
    pub independent: bool,
    /// BYTERANGE length; zero when the part is the whole resource.
    pub limit: i64,
    /// BYTERANGE offset.
    pub offset: i64,
    /// Program date-time attached to this part.
    pub program_date_time: Option<DateTime<FixedOffset>>,
    /// Whether the parent segment has been appended in full.
    pub completed: bool,
}

impl PartialSegment {
    pub fn new(uri: impl Into<String>, duration: f64, independent: bool) -> PartialSegment {
        PartialSegment {
            uri: uri.into(),
            duration,
            independent,
            ..PartialSegment::default()
        }
    }
}

/// Sequence/part bookkeeping for Low-Latency HLS delivery.
///
/// `next_msn` is the media sequence number the next full segment will get,
/// `next_part` counts the parts appended since the last full segment, and
/// `max_part` latches the highest part index of a completed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentIndexing {
    pub next_msn: u64,
    pub next_part: u64,
    pub max_part: u64,
}
