//! Tag value types shared between the two playlist kinds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::error::{PlaylistError, Result};

/// EXT-X-PLAYLIST-TYPE value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Event,
    Vod,
}

/// Raw key/value pair of an attribute list.
///
/// The value is verbatim: quotes of a quoted-string and the `0x` prefix of
/// a hexadecimal value are included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// EXT-X-KEY / EXT-X-SESSION-KEY parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key {
    /// METHOD: NONE, AES-128, SAMPLE-AES, SAMPLE-AES-CTR.
    pub method: String,
    pub uri: String,
    /// IV as a verbatim hex value including the `0x` prefix.
    pub iv: String,
    pub keyformat: String,
    pub keyformatversions: String,
}

/// EXT-X-MAP: the Media Initialization Section for the segments that
/// follow, until the next EXT-X-MAP.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Map {
    pub uri: String,
    /// Sub-range length in bytes; zero means the whole resource.
    pub limit: i64,
    /// Sub-range offset from the start of the resource.
    pub offset: i64,
}

/// Format of a SCTE-35 cue point in the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scte35Syntax {
    /// No SCTE markers set or seen.
    #[default]
    None,
    /// SCTE-67 2014 syntax (`#EXT-SCTE35:`).
    Scte67_2014,
    /// Non-standard but common OATCLS syntax
    /// (`#EXT-OATCLS-SCTE35:` / `#EXT-X-CUE-OUT` family).
    Oatcls,
    /// Standard EXT-X-DATERANGE carriage. Stored separately on segments.
    DateRange,
}

impl fmt::Display for Scte35Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scte35Syntax::None => "None",
            Scte35Syntax::Scte67_2014 => "SCTE35_67_2014",
            Scte35Syntax::Oatcls => "SCTE35_OATCLS",
            Scte35Syntax::DateRange => "SCTE35_DATERANGE",
        })
    }
}

/// Kind of a SCTE-35 cue point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scte35CueKind {
    /// Cue-out point.
    #[default]
    Start,
    /// A segment between the start and end cue points.
    Mid,
    /// Cue-in point.
    End,
    /// Splice command carried without an out/in pair.
    Cmd,
}

/// A SCTE-35 cue attached to a media segment.
///
/// The cue payload is stored opaquely (base64) and never interpreted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scte35 {
    pub syntax: Scte35Syntax,
    pub kind: Scte35CueKind,
    /// Base64-encoded SCTE-35 cue message.
    pub cue: String,
    pub id: String,
    /// TIME for SCTE-67 signalling, duration for OATCLS.
    pub time: f64,
    /// ELAPSED for OATCLS cue-out continuation.
    pub elapsed: f64,
    pub duration: Option<f64>,
    pub planned_duration: Option<f64>,
    /// Start/end dates used when re-encoding in DATERANGE syntax.
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
}

/// EXT-X-DATERANGE, used for SCTE-35 signalling, interstitials and other
/// timed metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub id: String,
    pub class: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Enumerated-string-list of trigger identifiers: PRE, POST, ONCE.
    pub cue: String,
    pub duration: Option<f64>,
    pub planned_duration: Option<f64>,
    /// Client-defined `X-…` attributes, verbatim.
    pub x_attrs: Vec<Attribute>,
    /// Hex values including the `0x` prefix.
    pub scte35_cmd: String,
    pub scte35_out: String,
    pub scte35_in: String,
    pub end_on_next: bool,
}

impl DateRange {
    pub(crate) fn new(start_date: DateTime<FixedOffset>) -> DateRange {
        DateRange {
            id: String::new(),
            class: String::new(),
            start_date,
            end_date: None,
            cue: String::new(),
            duration: None,
            planned_duration: None,
            x_attrs: Vec::new(),
            scte35_cmd: String::new(),
            scte35_out: String::new(),
            scte35_in: String::new(),
            end_on_next: false,
        }
    }

    /// Whether the date range carries a SCTE-35 payload. Such ranges are
    /// associated with the following segment instead of the playlist.
    pub fn is_scte35(&self) -> bool {
        !self.scte35_cmd.is_empty() || !self.scte35_out.is_empty() || !self.scte35_in.is_empty()
    }
}

/// EXT-X-DEFINE variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineType {
    /// NAME/VALUE pair.
    Value,
    /// IMPORT from the multivariant playlist.
    Import,
    /// QUERYPARAM taken from the playlist URI.
    QueryParam,
}

/// EXT-X-DEFINE: a playlist variable definition or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub kind: DefineType,
    /// Only used when `kind` is [`DefineType::Value`].
    pub value: String,
}

/// EXT-X-SESSION-DATA entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub data_id: String,
    pub value: String,
    pub uri: String,
    /// JSON or RAW; JSON when absent.
    pub format: String,
    pub language: String,
}

impl Default for SessionData {
    fn default() -> Self {
        SessionData {
            data_id: String::new(),
            value: String::new(),
            uri: String::new(),
            format: "JSON".to_string(),
            language: String::new(),
        }
    }
}

/// EXT-X-CONTENT-STEERING record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentSteering {
    pub server_uri: String,
    pub pathway_id: String,
}

/// CHANNELS attribute of EXT-X-MEDIA: a `/`-separated triple where only
/// the channel count is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Channels {
    pub amount: u32,
    pub spatial_audio_identifiers: String,
    pub channel_usage_indicators: String,
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)?;
        if !self.spatial_audio_identifiers.is_empty() {
            write!(f, "/{}", self.spatial_audio_identifiers)?;
            if !self.channel_usage_indicators.is_empty() {
                write!(f, "/{}", self.channel_usage_indicators)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Channels {
    type Err = PlaylistError;

    fn from_str(s: &str) -> Result<Channels> {
        let mut params = s.split('/');
        let amount = params
            .next()
            .unwrap_or_default()
            .parse::<u32>()
            .map_err(|_| PlaylistError::InvalidValue {
                field: "CHANNELS",
                raw: s.to_string(),
            })?;
        let spatial = params.next().unwrap_or_default().to_string();
        let usage = params.next().unwrap_or_default().to_string();
        // A third parameter requires a non-empty second one.
        if !usage.is_empty() && spatial.is_empty() {
            return Err(PlaylistError::InvalidValue {
                field: "CHANNELS",
                raw: s.to_string(),
            });
        }
        Ok(Channels {
            amount,
            spatial_audio_identifiers: spatial,
            channel_usage_indicators: usage,
        })
    }
}

/// EXT-X-SERVER-CONTROL parameters for Low-Latency HLS.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerControl {
    pub can_skip_until: f64,
    pub can_skip_dateranges: bool,
    pub hold_back: f64,
    pub part_hold_back: f64,
    pub can_block_reload: bool,
}

/// EXT-X-PRELOAD-HINT: a resource the server expects to need soon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreloadHint {
    /// PART or MAP.
    pub hint_type: String,
    pub uri: String,
    /// BYTERANGE-LENGTH.
    pub limit: i64,
    /// BYTERANGE-START.
    pub offset: i64,
}
