//! Caller-supplied decoders and encoders for non-standard tags.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// An encodable custom tag held by a playlist or segment.
pub trait CustomTag: fmt::Debug + fmt::Display + Send + Sync {
    /// The full identifier, including the leading `#` and the trailing `:`
    /// when the tag carries a value or attribute list.
    fn tag_name(&self) -> &str;

    /// The complete tag line to write, without the line terminator.
    /// Returning `None` suppresses emission.
    fn encode(&self) -> Option<String>;
}

/// A decoder for custom or unsupported tags.
///
/// Registered decoders observe each line whose prefix matches
/// [`tag_name`](CustomDecoder::tag_name) before built-in parsing runs.
pub trait CustomDecoder: Send + Sync {
    /// The full identifier, including the leading `#` and the trailing `:`
    /// when the tag carries a value or attribute list.
    fn tag_name(&self) -> &str;

    /// Parses a playlist line into its [`CustomTag`] representation.
    fn decode(&self, line: &str) -> Result<Box<dyn CustomTag>>;

    /// Whether the tag applies to the following segment rather than the
    /// playlist header. Ignored for multivariant playlists.
    fn is_segment_tag(&self) -> bool;
}

/// Custom tags keyed by tag name. Ordered so emission is stable.
pub type CustomMap = BTreeMap<String, Box<dyn CustomTag>>;
