//! Minimum protocol version calculation.
//!
//! Rules follow the protocol version compatibility table of
//! draft-pantos-hls-rfc8216bis section 8. Versions below 3 are not
//! reported: floating-point EXTINF durations are always produced, so 3 is
//! the floor.

use crate::media::MediaPlaylist;
use crate::multivariant::MultivariantPlaylist;

/// Minimum protocol version supported by this library.
pub(crate) const MIN_VER: u8 = 3;

const REASON_MIN: &str = "minimal version supported by this library";
const REASON_BYTERANGE: &str = "EXT-X-BYTERANGE tag";
const REASON_IFRAMES_ONLY: &str = "EXT-X-I-FRAMES-ONLY tag";
const REASON_ALTERNATIVES: &str = "EXT-X-MEDIA alternative renditions (legacy compatibility)";
const REASON_KEY: &str =
    "EXT-X-KEY tag with a METHOD of SAMPLE-AES, KEYFORMAT or KEYFORMATVERSIONS attributes";
const REASON_MAP: &str = "EXT-X-MAP tag";
const REASON_MAP_NO_IFRAMES: &str =
    "EXT-X-MAP tag in a Media Playlist that does not contain EXT-X-I-FRAMES-ONLY";
const REASON_INSTREAM_SERVICE: &str =
    "SERVICE value for the INSTREAM-ID attribute of the EXT-X-MEDIA";
const REASON_DEFINE: &str = "Variable substitution";
const REASON_QUERYPARAM: &str = "EXT-X-DEFINE tag with a QUERYPARAM attribute";
const REASON_REQ: &str = "REQ- attribute";
const REASON_INSTREAM_NON_CC: &str =
    "EXT-X-MEDIA tag with INSTREAM-ID attribute for non CLOSED-CAPTIONS TYPE";

fn update_min(ver: &mut u8, reason: &mut &'static str, new_ver: u8, new_reason: &'static str) {
    if new_ver <= *ver {
        return;
    }
    *ver = new_ver;
    *reason = new_reason;
}

impl MultivariantPlaylist {
    /// The minimal protocol version required by the content present,
    /// together with the rule that requires it.
    pub fn calc_min_version(&self) -> (u8, &'static str) {
        let mut ver = MIN_VER;
        let mut reason = REASON_MIN;

        if self
            .variants
            .iter()
            .any(|v| !v.params.alternatives.is_empty())
        {
            update_min(&mut ver, &mut reason, 4, REASON_ALTERNATIVES);
        }

        if self.variants.iter().any(|v| {
            v.params
                .alternatives
                .iter()
                .any(|alt| alt.instream_id.starts_with("SERVICE"))
        }) {
            update_min(&mut ver, &mut reason, 7, REASON_INSTREAM_SERVICE);
        }

        if self
            .defines
            .iter()
            .any(|d| d.kind == crate::types::DefineType::QueryParam)
        {
            update_min(&mut ver, &mut reason, 11, REASON_QUERYPARAM);
        }

        if self
            .variants
            .iter()
            .any(|v| !v.params.req_video_layout.is_empty())
        {
            update_min(&mut ver, &mut reason, 12, REASON_REQ);
        }

        if self.variants.iter().any(|v| {
            v.params.alternatives.iter().any(|alt| {
                alt.media_type != "CLOSED-CAPTIONS" && !alt.instream_id.is_empty()
            })
        }) {
            update_min(&mut ver, &mut reason, 13, REASON_INSTREAM_NON_CC);
        }

        (ver, reason)
    }
}

fn key_needs_v5(key: &crate::types::Key) -> bool {
    key.method == "SAMPLE-AES" || !key.keyformat.is_empty() || !key.keyformatversions.is_empty()
}

impl MediaPlaylist {
    /// The minimal protocol version required by the content present,
    /// together with the rule that requires it. Only segments inside the
    /// encode window are considered.
    pub fn calc_min_version(&self) -> (u8, &'static str) {
        let mut ver = MIN_VER;
        let mut reason = REASON_MIN;

        let window = || self.segments().skip(self.window_start());

        if window().any(|seg| seg.limit > 0) {
            update_min(&mut ver, &mut reason, 4, REASON_BYTERANGE);
        }
        if self.iframe {
            update_min(&mut ver, &mut reason, 4, REASON_IFRAMES_ONLY);
        }

        if self.keys.iter().any(key_needs_v5) {
            update_min(&mut ver, &mut reason, 5, REASON_KEY);
        }
        if self.map.is_some() {
            update_min(&mut ver, &mut reason, 5, REASON_MAP);
        }

        for seg in window() {
            if seg.keys.iter().any(key_needs_v5) {
                update_min(&mut ver, &mut reason, 5, REASON_KEY);
            }
            if seg.map.is_some() {
                update_min(&mut ver, &mut reason, 5, REASON_MAP);
                if !self.iframe {
                    update_min(&mut ver, &mut reason, 6, REASON_MAP_NO_IFRAMES);
                }
            }
        }

        if self.map.is_some() && !self.iframe {
            update_min(&mut ver, &mut reason, 6, REASON_MAP_NO_IFRAMES);
        }

        if !self.defines.is_empty() {
            update_min(&mut ver, &mut reason, 8, REASON_DEFINE);
        }

        if self
            .defines
            .iter()
            .any(|d| d.kind == crate::types::DefineType::QueryParam)
        {
            update_min(&mut ver, &mut reason, 11, REASON_QUERYPARAM);
        }

        (ver, reason)
    }
}
