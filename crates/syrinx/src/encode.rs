//! Deterministic M3U8 rendering.
//!
//! Both playlist kinds render into a cached [`Bytes`] buffer; any mutation
//! drops the cache and the next encode rebuilds it. `Display` renders
//! afresh without touching the cache.

use std::collections::HashMap;
use std::fmt;

use base64::Engine as _;
use bytes::Bytes;

use crate::error::{PlaylistError, Result};
use crate::media::MediaPlaylist;
use crate::multivariant::{Alternative, MultivariantPlaylist, VariantParams};
use crate::segment::PartialSegment;
use crate::time::format_date_time;
use crate::types::{DateRange, Define, DefineType, Key, Map, MediaType, Scte35, Scte35CueKind, Scte35Syntax};

/// Shortest decimal form that round-trips, `.` as separator, no exponent
/// for playlist-scale magnitudes.
fn fmt_shortest(v: f64) -> String {
    format!("{v}")
}

fn write_quoted(out: &mut String, key: &str, value: &str) {
    out.push(',');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(value);
    out.push('"');
}

fn write_unquoted(out: &mut String, key: &str, value: &str) {
    out.push(',');
    out.push_str(key);
    out.push('=');
    out.push_str(value);
}

fn write_uint(out: &mut String, key: &str, value: u64) {
    write_unquoted(out, key, &value.to_string());
}

fn write_float(out: &mut String, key: &str, value: f64) {
    write_unquoted(out, key, &format!("{value:.3}"));
}

fn write_define(out: &mut String, define: &Define) {
    out.push_str("#EXT-X-DEFINE:");
    match define.kind {
        DefineType::Value => {
            out.push_str("NAME=\"");
            out.push_str(&define.name);
            out.push_str("\",VALUE=\"");
            out.push_str(&define.value);
            out.push('"');
        }
        DefineType::Import => {
            out.push_str("IMPORT=\"");
            out.push_str(&define.name);
            out.push('"');
        }
        DefineType::QueryParam => {
            out.push_str("QUERYPARAM=\"");
            out.push_str(&define.name);
            out.push('"');
        }
    }
    out.push('\n');
}

fn write_key(out: &mut String, tag: &str, key: &Key) {
    out.push_str(tag);
    out.push_str("METHOD=");
    out.push_str(&key.method);
    if key.method != "NONE" {
        write_quoted(out, "URI", &key.uri);
        if !key.iv.is_empty() {
            write_unquoted(out, "IV", &key.iv);
        }
        if !key.keyformat.is_empty() {
            write_quoted(out, "KEYFORMAT", &key.keyformat);
        }
        if !key.keyformatversions.is_empty() {
            write_quoted(out, "KEYFORMATVERSIONS", &key.keyformatversions);
        }
    }
    out.push('\n');
}

fn write_map(out: &mut String, map: &Map) {
    out.push_str("#EXT-X-MAP:URI=\"");
    out.push_str(&map.uri);
    out.push('"');
    if map.limit > 0 {
        write_unquoted(out, "BYTERANGE", &format!("{}@{}", map.limit, map.offset));
    }
    out.push('\n');
}

/// Writes an EXT-X-MEDIA line. No validation is applied.
fn write_ext_x_media(out: &mut String, alt: &Alternative) {
    out.push_str("#EXT-X-MEDIA:TYPE=");
    out.push_str(&alt.media_type);
    write_quoted(out, "GROUP-ID", &alt.group_id);
    write_quoted(out, "NAME", &alt.name);
    if !alt.language.is_empty() {
        write_quoted(out, "LANGUAGE", &alt.language);
    }
    if !alt.assoc_language.is_empty() {
        write_quoted(out, "ASSOC-LANGUAGE", &alt.assoc_language);
    }
    if !alt.stable_rendition_id.is_empty() {
        write_quoted(out, "STABLE-RENDITION-ID", &alt.stable_rendition_id);
    }
    out.push_str(",DEFAULT=");
    out.push_str(if alt.default { "YES" } else { "NO" });
    if alt.autoselect {
        out.push_str(",AUTOSELECT=YES");
    }
    if alt.forced {
        out.push_str(",FORCED=YES");
    }
    if !alt.instream_id.is_empty() {
        write_quoted(out, "INSTREAM-ID", &alt.instream_id);
    }
    if alt.bit_depth != 0 {
        write_uint(out, "BIT-DEPTH", alt.bit_depth as u64);
    }
    if alt.sample_rate != 0 {
        write_uint(out, "SAMPLE-RATE", alt.sample_rate as u64);
    }
    if !alt.characteristics.is_empty() {
        write_quoted(out, "CHARACTERISTICS", &alt.characteristics);
    }
    if let Some(channels) = &alt.channels {
        write_quoted(out, "CHANNELS", &channels.to_string());
    }
    if !alt.uri.is_empty() {
        write_quoted(out, "URI", &alt.uri);
    }
    out.push('\n');
}

fn write_date_range(out: &mut String, dr: &DateRange) {
    out.push_str("#EXT-X-DATERANGE:ID=\"");
    out.push_str(&dr.id);
    out.push('"');
    if !dr.class.is_empty() {
        write_quoted(out, "CLASS", &dr.class);
    }
    write_quoted(out, "START-DATE", &format_date_time(&dr.start_date));
    if !dr.cue.is_empty() {
        write_unquoted(out, "CUE", &dr.cue);
    }
    if let Some(end) = &dr.end_date {
        write_quoted(out, "END-DATE", &format_date_time(end));
    }
    if let Some(duration) = dr.duration {
        write_float(out, "DURATION", duration);
    }
    if let Some(planned) = dr.planned_duration {
        write_float(out, "PLANNED-DURATION", planned);
    }
    if !dr.scte35_cmd.is_empty() {
        write_unquoted(out, "SCTE35-CMD", &dr.scte35_cmd);
    }
    if !dr.scte35_out.is_empty() {
        write_unquoted(out, "SCTE35-OUT", &dr.scte35_out);
    }
    if !dr.scte35_in.is_empty() {
        write_unquoted(out, "SCTE35-IN", &dr.scte35_in);
    }
    if dr.end_on_next {
        out.push_str(",END-ON-NEXT=YES");
    }
    for attr in &dr.x_attrs {
        write_unquoted(out, &attr.key, &attr.value);
    }
    out.push('\n');
}

fn write_scte35(out: &mut String, scte: &Scte35) {
    match scte.syntax {
        Scte35Syntax::Scte67_2014 => {
            out.push_str("#EXT-SCTE35:CUE=\"");
            out.push_str(&scte.cue);
            out.push('"');
            if !scte.id.is_empty() {
                write_quoted(out, "ID", &scte.id);
            }
            if scte.time != 0.0 {
                write_unquoted(out, "TIME", &fmt_shortest(scte.time));
            }
            out.push('\n');
        }
        Scte35Syntax::Oatcls => match scte.kind {
            Scte35CueKind::Start => {
                if !scte.cue.is_empty() {
                    out.push_str("#EXT-OATCLS-SCTE35:");
                    out.push_str(&scte.cue);
                    out.push('\n');
                }
                out.push_str("#EXT-X-CUE-OUT:");
                out.push_str(&fmt_shortest(scte.time));
                out.push('\n');
            }
            Scte35CueKind::Mid => {
                out.push_str("#EXT-X-CUE-OUT-CONT:ElapsedTime=");
                out.push_str(&fmt_shortest(scte.elapsed));
                out.push_str(",Duration=");
                out.push_str(&fmt_shortest(scte.time));
                out.push_str(",SCTE35=");
                out.push_str(&scte.cue);
                out.push('\n');
            }
            Scte35CueKind::End => {
                out.push_str("#EXT-X-CUE-IN\n");
            }
            Scte35CueKind::Cmd => {}
        },
        Scte35Syntax::DateRange => {
            let Some(start_date) = scte.start_date else {
                tracing::warn!("SCTE-35 DATERANGE cue without a start date, not emitted");
                return;
            };
            let mut dr = DateRange::new(start_date);
            dr.id = scte.id.clone();
            dr.end_date = scte.end_date;
            dr.duration = scte.duration;
            dr.planned_duration = scte.planned_duration;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(scte.cue.as_bytes())
                .unwrap_or_default();
            let cue_val = format!("0x{}", hex::encode(decoded));
            match scte.kind {
                Scte35CueKind::Start => dr.scte35_out = cue_val,
                Scte35CueKind::End => dr.scte35_in = cue_val,
                Scte35CueKind::Cmd => dr.scte35_cmd = cue_val,
                Scte35CueKind::Mid => {}
            }
            write_date_range(out, &dr);
        }
        Scte35Syntax::None => {}
    }
}

fn write_start(out: &mut String, time_offset: f64, precise: bool) {
    out.push_str("#EXT-X-START:TIME-OFFSET=");
    out.push_str(&fmt_shortest(time_offset));
    if precise {
        out.push_str(",PRECISE=YES");
    }
    out.push('\n');
}

fn write_partial_segment(out: &mut String, ps: &PartialSegment) {
    if let Some(t) = &ps.program_date_time {
        out.push_str("#EXT-X-PROGRAM-DATE-TIME:");
        out.push_str(&format_date_time(t));
        out.push('\n');
    }
    out.push_str("#EXT-X-PART:DURATION=");
    out.push_str(&fmt_shortest(ps.duration));
    write_quoted(out, "URI", &ps.uri);
    if ps.independent {
        out.push_str(",INDEPENDENT=YES");
    }
    if ps.limit > 0 {
        write_unquoted(out, "BYTERANGE", &format!("{}@{}", ps.limit, ps.offset));
    }
    out.push('\n');
}

fn write_uri_with_args(out: &mut String, uri: &str, args: &str) {
    out.push_str(uri);
    if !args.is_empty() {
        out.push(if uri.contains('?') { '&' } else { '?' });
        out.push_str(args);
    }
    out.push('\n');
}

fn write_stream_inf(out: &mut String, p: &VariantParams) {
    out.push_str("BANDWIDTH=");
    out.push_str(&p.bandwidth.to_string());
    if p.average_bandwidth != 0 {
        write_uint(out, "AVERAGE-BANDWIDTH", p.average_bandwidth as u64);
    }
    if p.score != 0.0 {
        write_unquoted(out, "SCORE", &fmt_shortest(p.score));
    }
    if !p.codecs.is_empty() {
        write_quoted(out, "CODECS", &p.codecs);
    }
    if !p.supplemental_codecs.is_empty() {
        write_quoted(out, "SUPPLEMENTAL-CODECS", &p.supplemental_codecs);
    }
    if !p.resolution.is_empty() {
        // Resolution is not quoted.
        write_unquoted(out, "RESOLUTION", &p.resolution);
    }
    if !p.iframe && p.frame_rate != 0.0 {
        write_float(out, "FRAME-RATE", p.frame_rate);
    }
    if !p.hdcp_level.is_empty() {
        write_unquoted(out, "HDCP-LEVEL", &p.hdcp_level);
    }
    if !p.allowed_cpc.is_empty() {
        write_quoted(out, "ALLOWED-CPC", &p.allowed_cpc);
    }
    if !p.video_range.is_empty() {
        write_unquoted(out, "VIDEO-RANGE", &p.video_range);
    }
    if !p.req_video_layout.is_empty() {
        write_quoted(out, "REQ-VIDEO-LAYOUT", &p.req_video_layout);
    }
    if !p.stable_variant_id.is_empty() {
        write_quoted(out, "STABLE-VARIANT-ID", &p.stable_variant_id);
    }
    if !p.iframe && !p.audio.is_empty() {
        write_quoted(out, "AUDIO", &p.audio);
    }
    if !p.video.is_empty() {
        write_quoted(out, "VIDEO", &p.video);
    }
    if !p.iframe && !p.subtitles.is_empty() {
        write_quoted(out, "SUBTITLES", &p.subtitles);
    }
    if !p.iframe && !p.captions.is_empty() {
        // CLOSED-CAPTIONS is not quoted when NONE.
        if p.captions == "NONE" {
            write_unquoted(out, "CLOSED-CAPTIONS", "NONE");
        } else {
            write_quoted(out, "CLOSED-CAPTIONS", &p.captions);
        }
    }
    if !p.pathway_id.is_empty() {
        write_quoted(out, "PATHWAY-ID", &p.pathway_id);
    }
    if !p.iframe && !p.name.is_empty() {
        write_quoted(out, "NAME", &p.name);
    }
    if let Some(program_id) = p.program_id {
        write_unquoted(out, "PROGRAM-ID", &program_id.to_string());
    }
}

impl MultivariantPlaylist {
    /// Renders the playlist, reusing the cached result when no mutation
    /// occurred since the previous encode.
    pub fn encode(&mut self) -> Bytes {
        if let Some(cache) = &self.cache {
            return cache.clone();
        }
        let mut out = String::new();
        self.render(&mut out);
        let bytes = Bytes::from(out);
        self.cache = Some(bytes.clone());
        bytes
    }

    pub(crate) fn render(&self, out: &mut String) {
        out.push_str("#EXTM3U\n#EXT-X-VERSION:");
        out.push_str(&self.ver.to_string());
        out.push('\n');

        if let Some(steering) = &self.content_steering {
            out.push_str("#EXT-X-CONTENT-STEERING:SERVER-URI=\"");
            out.push_str(&steering.server_uri);
            out.push('"');
            if !steering.pathway_id.is_empty() {
                write_quoted(out, "PATHWAY-ID", &steering.pathway_id);
            }
            out.push('\n');
        }
        if self.independent_segments {
            out.push_str("#EXT-X-INDEPENDENT-SEGMENTS\n");
        }
        if self.start_time != 0.0 {
            write_start(out, self.start_time, self.start_time_precise);
        }
        for define in &self.defines {
            write_define(out, define);
        }

        for sd in &self.session_datas {
            out.push_str("#EXT-X-SESSION-DATA:DATA-ID=\"");
            out.push_str(&sd.data_id);
            out.push('"');
            if !sd.value.is_empty() {
                write_quoted(out, "VALUE", &sd.value);
            }
            if !sd.uri.is_empty() {
                write_quoted(out, "URI", &sd.uri);
            }
            if sd.format != "JSON" {
                write_unquoted(out, "FORMAT", &sd.format);
            }
            if !sd.language.is_empty() {
                write_quoted(out, "LANGUAGE", &sd.language);
            }
            out.push('\n');
        }
        for key in &self.session_keys {
            write_key(out, "#EXT-X-SESSION-KEY:", key);
        }

        for tag in self.custom.values() {
            if let Some(line) = tag.encode() {
                out.push_str(&line);
                out.push('\n');
            }
        }

        for alt in self.all_alternatives() {
            write_ext_x_media(out, alt);
        }

        for variant in &self.variants {
            if variant.params.iframe {
                out.push_str("#EXT-X-I-FRAME-STREAM-INF:");
                write_stream_inf(out, &variant.params);
                if !variant.uri.is_empty() {
                    write_quoted(out, "URI", &variant.uri);
                }
                out.push('\n');
            } else {
                out.push_str("#EXT-X-STREAM-INF:");
                write_stream_inf(out, &variant.params);
                out.push('\n');
                write_uri_with_args(out, &variant.uri, &self.args);
            }
        }
    }
}

impl fmt::Display for MultivariantPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for MultivariantPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultivariantPlaylist")
            .field("variants", &self.variants)
            .field("alternatives", &self.alternatives)
            .field("args", &self.args)
            .field("start_time", &self.start_time)
            .field("start_time_precise", &self.start_time_precise)
            .field("defines", &self.defines)
            .field("session_datas", &self.session_datas)
            .field("session_keys", &self.session_keys)
            .field("content_steering", &self.content_steering)
            .field("custom", &self.custom)
            .field("custom_decoders", &self.custom_decoders.len())
            .field("independent_segments", &self.independent_segments)
            .field("ver", &self.ver)
            .field("cache", &self.cache)
            .finish()
    }
}

impl MediaPlaylist {
    /// Renders the playlist, reusing the cached result when no mutation
    /// occurred since the previous encode.
    ///
    /// With a non-zero window only the last `winsize` segments are
    /// emitted; with a zero window every segment is.
    pub fn encode(&mut self) -> Bytes {
        if let Some(cache) = &self.cache {
            return cache.clone();
        }
        let mut out = String::new();
        self.render(&mut out);
        let bytes = Bytes::from(out);
        self.cache = Some(bytes.clone());
        bytes
    }

    /// Renders a playlist delta update: writes
    /// `#EXT-X-SKIP:SKIPPED-SEGMENTS=n` and omits the first `n` segments
    /// of the window. Fails with [`PlaylistError::AlreadySkipped`] when a
    /// skip count is already present.
    pub fn encode_with_skip(&mut self, skipped: u64) -> Result<Bytes> {
        if self.skipped_segments > 0 {
            return Err(PlaylistError::AlreadySkipped);
        }
        self.skipped_segments = skipped;
        self.skip_offset = skipped;
        self.cache = None;
        Ok(self.encode())
    }

    pub(crate) fn render(&self, out: &mut String) {
        out.push_str("#EXTM3U\n#EXT-X-VERSION:");
        out.push_str(&self.ver.to_string());
        out.push('\n');

        if self.independent_segments {
            out.push_str("#EXT-X-INDEPENDENT-SEGMENTS\n");
        }
        for tag in self.custom.values() {
            if let Some(line) = tag.encode() {
                out.push_str(&line);
                out.push('\n');
            }
        }
        if let Some(allow) = self.allow_cache {
            out.push_str("#EXT-X-ALLOW-CACHE:");
            out.push_str(if allow { "YES" } else { "NO" });
            out.push('\n');
        }
        for define in &self.defines {
            write_define(out, define);
        }
        for key in &self.keys {
            write_key(out, "#EXT-X-KEY:", key);
        }
        match self.media_type {
            Some(MediaType::Event) => out.push_str("#EXT-X-PLAYLIST-TYPE:EVENT\n"),
            Some(MediaType::Vod) => out.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n"),
            None => {}
        }
        if let Some(sc) = &self.server_control {
            let mut parts = Vec::new();
            if sc.can_skip_until > 0.0 {
                parts.push(format!("CAN-SKIP-UNTIL={}", fmt_shortest(sc.can_skip_until)));
            }
            if sc.can_skip_dateranges {
                parts.push("CAN-SKIP-DATERANGES=YES".to_string());
            }
            if sc.hold_back > 0.0 {
                parts.push(format!("HOLD-BACK={}", fmt_shortest(sc.hold_back)));
            }
            if sc.part_hold_back > 0.0 {
                parts.push(format!("PART-HOLD-BACK={}", fmt_shortest(sc.part_hold_back)));
            }
            if sc.can_block_reload {
                parts.push("CAN-BLOCK-RELOAD=YES".to_string());
            }
            out.push_str("#EXT-X-SERVER-CONTROL:");
            out.push_str(&parts.join(","));
            out.push('\n');
        }
        if self.part_target_duration > 0.0 {
            out.push_str("#EXT-X-PART-INF:PART-TARGET=");
            out.push_str(&fmt_shortest(self.part_target_duration));
            out.push('\n');
        }

        let window_start = self.window_start();
        out.push_str("#EXT-X-MEDIA-SEQUENCE:");
        out.push_str(&(self.seq_no + window_start as u64).to_string());
        out.push('\n');
        out.push_str("#EXT-X-TARGETDURATION:");
        out.push_str(&self.target_duration.to_string());
        out.push('\n');

        if self.start_time != 0.0 {
            write_start(out, self.start_time, self.start_time_precise);
        }
        if self.discontinuity_seq != 0 {
            out.push_str("#EXT-X-DISCONTINUITY-SEQUENCE:");
            out.push_str(&self.discontinuity_seq.to_string());
            out.push('\n');
        }
        if self.iframe {
            out.push_str("#EXT-X-I-FRAMES-ONLY\n");
        }
        let skip_emitted = self.skipped_segments > 0;
        if skip_emitted {
            out.push_str("#EXT-X-SKIP:SKIPPED-SEGMENTS=");
            out.push_str(&self.skipped_segments.to_string());
            out.push('\n');
        }
        if !skip_emitted {
            if let Some(map) = &self.map {
                write_map(out, map);
            }
        }

        let mut current_keys = self.keys.clone();
        let mut current_map = self.map.clone();
        let mut duration_cache: HashMap<u64, String> = HashMap::new();

        for seg in self
            .segments()
            .skip(window_start + self.skip_offset as usize)
        {
            if seg.discontinuity {
                out.push_str("#EXT-X-DISCONTINUITY\n");
            }
            if let Some(scte) = &seg.scte {
                write_scte35(out, scte);
            }
            for dr in &seg.scte35_date_ranges {
                write_date_range(out, dr);
            }
            if !seg.keys.is_empty() && seg.keys != current_keys {
                for key in &seg.keys {
                    write_key(out, "#EXT-X-KEY:", key);
                }
                current_keys = seg.keys.clone();
            }
            if seg.gap {
                out.push_str("#EXT-X-GAP\n");
            }
            if let Some(map) = &seg.map {
                if current_map.as_ref() != Some(map) {
                    write_map(out, map);
                    current_map = Some(map.clone());
                }
            }
            if let Some(t) = &seg.program_date_time {
                out.push_str("#EXT-X-PROGRAM-DATE-TIME:");
                out.push_str(&format_date_time(t));
                out.push('\n');
            }
            for ps in self
                .partial_segments
                .iter()
                .filter(|ps| ps.completed && ps.seq_id == seg.seq_id)
            {
                write_partial_segment(out, ps);
            }
            if seg.limit > 0 {
                out.push_str("#EXT-X-BYTERANGE:");
                out.push_str(&format!("{}@{}", seg.limit, seg.offset));
                out.push('\n');
            }
            for tag in seg.custom.values() {
                if let Some(line) = tag.encode() {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            out.push_str("#EXTINF:");
            let bits = seg.duration.to_bits();
            let formatted = duration_cache.entry(bits).or_insert_with(|| {
                if self.duration_precision < 0 {
                    fmt_shortest(seg.duration)
                } else {
                    format!("{:.*}", self.duration_precision as usize, seg.duration)
                }
            });
            out.push_str(formatted);
            out.push(',');
            out.push_str(&seg.title);
            out.push('\n');
            write_uri_with_args(out, &seg.uri, &self.args);
        }

        for ps in self.partial_segments.iter().filter(|ps| !ps.completed) {
            write_partial_segment(out, ps);
        }
        if let Some(hint) = &self.preload_hint {
            out.push_str("#EXT-X-PRELOAD-HINT:TYPE=");
            out.push_str(&hint.hint_type);
            write_quoted(out, "URI", &hint.uri);
            if hint.offset > 0 {
                write_uint(out, "BYTERANGE-START", hint.offset as u64);
            }
            if hint.limit > 0 {
                write_uint(out, "BYTERANGE-LENGTH", hint.limit as u64);
            }
            out.push('\n');
        }
        if self.closed {
            out.push_str("#EXT-X-ENDLIST\n");
        }
        for dr in &self.date_ranges {
            write_date_range(out, dr);
        }
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out);
        f.write_str(&out)
    }
}
