//! Multivariant (master) playlists.

use std::sync::Arc;

use bytes::Bytes;

use crate::custom::{CustomDecoder, CustomMap, CustomTag};
use crate::media::MediaPlaylist;
use crate::types::{Channels, ContentSteering, Define, Key, SessionData};
use crate::version::MIN_VER;

/// A multivariant (master) playlist: parameters plus one or more variant
/// media playlists.
pub struct MultivariantPlaylist {
    /// Variant media playlists in declaration order.
    pub variants: Vec<Variant>,
    /// Every EXT-X-MEDIA rendition seen by the decoder, in order,
    /// including renditions no variant references.
    pub alternatives: Vec<Alternative>,
    /// Optional query string appended to variant URIs.
    pub args: String,
    /// EXT-X-START:TIME-OFFSET, positive or negative.
    pub start_time: f64,
    /// EXT-X-START:PRECISE=YES.
    pub start_time_precise: bool,
    /// EXT-X-DEFINE tags.
    pub defines: Vec<Define>,
    /// EXT-X-SESSION-DATA tags.
    pub session_datas: Vec<SessionData>,
    /// EXT-X-SESSION-KEY tags.
    pub session_keys: Vec<Key>,
    /// EXT-X-CONTENT-STEERING.
    pub content_steering: Option<ContentSteering>,
    /// Custom playlist-level tags for encoding.
    pub custom: CustomMap,

    pub(crate) custom_decoders: Vec<Arc<dyn CustomDecoder>>,
    pub(crate) independent_segments: bool,
    pub(crate) ver: u8,
    pub(crate) cache: Option<Bytes>,
}

/// One variant entry of a multivariant playlist.
#[derive(Debug)]
pub struct Variant {
    /// Path to the media playlist. For I-frame variants this is the URI
    /// attribute of the tag itself.
    pub uri: String,
    /// The variant's media playlist, when resolved.
    pub chunklist: Option<Box<MediaPlaylist>>,
    pub params: VariantParams,
}

/// EXT-X-STREAM-INF / EXT-X-I-FRAME-STREAM-INF parameters.
///
/// Attributes are listed in the same order as in the protocol
/// specification for easy comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantParams {
    pub bandwidth: u32,
    pub average_bandwidth: u32,
    pub score: f64,
    pub codecs: String,
    pub supplemental_codecs: String,
    /// RESOLUTION as `WxH`.
    pub resolution: String,
    pub frame_rate: f64,
    /// HDCP-LEVEL: NONE, TYPE-0, TYPE-1.
    pub hdcp_level: String,
    pub allowed_cpc: String,
    /// VIDEO-RANGE: SDR, HLG, PQ.
    pub video_range: String,
    pub req_video_layout: String,
    pub stable_variant_id: String,
    /// AUDIO rendition group id. EXT-X-STREAM-INF only.
    pub audio: String,
    /// VIDEO rendition group id.
    pub video: String,
    /// SUBTITLES rendition group id. EXT-X-STREAM-INF only.
    pub subtitles: String,
    /// CLOSED-CAPTIONS: NONE or a rendition group id.
    pub captions: String,
    /// PATHWAY-ID for content steering.
    pub pathway_id: String,
    /// NAME. Non-standard Wowza/JWPlayer extension.
    pub name: String,
    /// PROGRAM-ID. Removed in protocol version 6.
    pub program_id: Option<i64>,
    /// Set for EXT-X-I-FRAME-STREAM-INF entries.
    pub iframe: bool,
    /// EXT-X-MEDIA renditions referenced by this variant's group ids.
    pub alternatives: Vec<Alternative>,
}

/// An EXT-X-MEDIA rendition.
///
/// Attributes are listed in the same order as in the protocol
/// specification for easy comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alternative {
    /// TYPE: AUDIO, VIDEO, SUBTITLES or CLOSED-CAPTIONS.
    pub media_type: String,
    pub uri: String,
    pub group_id: String,
    pub language: String,
    pub assoc_language: String,
    pub name: String,
    pub stable_rendition_id: String,
    pub default: bool,
    pub autoselect: bool,
    pub forced: bool,
    pub instream_id: String,
    pub bit_depth: u8,
    pub sample_rate: u32,
    pub characteristics: String,
    pub channels: Option<Channels>,
}

impl Default for MultivariantPlaylist {
    fn default() -> Self {
        MultivariantPlaylist::new()
    }
}

impl MultivariantPlaylist {
    /// Creates an empty multivariant playlist.
    pub fn new() -> MultivariantPlaylist {
        MultivariantPlaylist {
            variants: Vec::new(),
            alternatives: Vec::new(),
            args: String::new(),
            start_time: 0.0,
            start_time_precise: false,
            defines: Vec::new(),
            session_datas: Vec::new(),
            session_keys: Vec::new(),
            content_steering: None,
            custom: CustomMap::new(),
            custom_decoders: Vec::new(),
            independent_segments: false,
            ver: MIN_VER,
            cache: None,
        }
    }

    /// Adds custom tag decoders used by subsequent decodes.
    pub fn with_custom_decoders(
        mut self,
        decoders: Vec<Arc<dyn CustomDecoder>>,
    ) -> MultivariantPlaylist {
        self.custom_decoders = decoders;
        self
    }

    /// Appends a variant. This operation resets the encode cache.
    ///
    /// Renditions on the variant raise the declared version floor to 4.
    /// Not required by the protocol, but kept for compatibility with
    /// clients that expect it; override with
    /// [`set_version`](Self::set_version).
    pub fn append_variant(
        &mut self,
        uri: impl Into<String>,
        chunklist: Option<MediaPlaylist>,
        params: VariantParams,
    ) {
        if !params.alternatives.is_empty() {
            self.update_version_floor(4);
        }
        self.variants.push(Variant {
            uri: uri.into(),
            chunklist: chunklist.map(Box::new),
            params,
        });
        self.cache = None;
    }

    /// Appends an EXT-X-DEFINE entry.
    pub fn append_define(&mut self, define: Define) {
        self.defines.push(define);
        self.cache = None;
    }

    /// The declared protocol version.
    pub fn version(&self) -> u8 {
        self.ver
    }

    /// Overrides the declared protocol version. Note that mutators may
    /// already have raised it.
    pub fn set_version(&mut self, ver: u8) {
        self.ver = ver;
        self.cache = None;
    }

    pub(crate) fn update_version_floor(&mut self, ver: u8) {
        if self.ver < ver {
            self.ver = ver;
        }
    }

    /// EXT-X-INDEPENDENT-SEGMENTS presence.
    pub fn independent_segments(&self) -> bool {
        self.independent_segments
    }

    pub fn set_independent_segments(&mut self, value: bool) {
        self.independent_segments = value;
        self.cache = None;
    }

    /// Sets a custom tag on the playlist, keyed by its tag name.
    pub fn set_custom_tag(&mut self, tag: Box<dyn CustomTag>) {
        self.custom.insert(tag.tag_name().to_string(), tag);
        self.cache = None;
    }

    /// A custom playlist-level tag by name, if present.
    pub fn custom_tag(&self, name: &str) -> Option<&dyn CustomTag> {
        self.custom.get(name).map(|t| t.as_ref())
    }

    /// All renditions, deduplicated by (group id, type, name, language)
    /// and sorted by that tuple.
    pub fn all_alternatives(&self) -> Vec<&Alternative> {
        let mut dedup = std::collections::BTreeMap::new();
        let all = self
            .alternatives
            .iter()
            .chain(self.variants.iter().flat_map(|v| v.params.alternatives.iter()));
        for alt in all {
            let key = (
                alt.group_id.clone(),
                alt.media_type.clone(),
                alt.name.clone(),
                alt.language.clone(),
            );
            dedup.entry(key).or_insert(alt);
        }
        dedup.into_values().collect()
    }

    /// Attaches renditions to the variants whose group ids reference them.
    pub(crate) fn attach_renditions_to_variants(&mut self, alternatives: &[Alternative]) {
        for variant in &mut self.variants {
            if variant.params.iframe {
                continue;
            }
            for alt in alternatives {
                let group_matches = match alt.media_type.as_str() {
                    "VIDEO" => variant.params.video == alt.group_id,
                    "AUDIO" => variant.params.audio == alt.group_id,
                    "CLOSED-CAPTIONS" => variant.params.captions == alt.group_id,
                    "SUBTITLES" => variant.params.subtitles == alt.group_id,
                    _ => false,
                };
                if group_matches && !alt.group_id.is_empty() {
                    variant.params.alternatives.push(alt.clone());
                }
            }
        }
    }

    /// Drops the cached encode result; the next encode renders afresh.
    pub fn reset_cache(&mut self) {
        self.cache = None;
    }
}
