//! Stateful line-by-line playlist decoding.
//!
//! Both playlist kinds are decoded by feeding each logical line through a
//! dispatch keyed on the tag prefix. Segment-scoped tags (keys, maps, byte
//! ranges, SCTE-35 cues, dates) are buffered on a per-decode state and
//! attached when the terminating URI line arrives. The type-agnostic entry
//! points feed every line to both parsers until a discriminating tag
//! settles the playlist kind.
//!
//! In strict mode the first error aborts the decode; in lax mode
//! recoverable errors are logged and skipped.

use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::custom::CustomDecoder;
use crate::error::{PlaylistError, Result};
use crate::lex::{self, attributes, dequote, trimmed_attributes, yes_or_no};
use crate::media::MediaPlaylist;
use crate::multivariant::{Alternative, MultivariantPlaylist, Variant, VariantParams};
use crate::segment::{MediaSegment, PartialSegment};
use crate::time::{parse_date_time, strict_time_parse};
use crate::types::{
    ContentSteering, DateRange, Define, DefineType, Key, Map, MediaType, PreloadHint, Scte35,
    Scte35CueKind, Scte35Syntax, ServerControl, SessionData,
};
use crate::Playlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Multivariant,
    Media,
}

/// Per-decode scratch state. Owned by the decode call, never shared.
#[derive(Default)]
pub(crate) struct DecodingState {
    list_kind: Option<ListKind>,
    m3u: bool,
    tag_stream_inf: bool,
    tag_inf: bool,
    tag_scte35: bool,
    tag_range: bool,
    tag_discontinuity: bool,
    tag_gap: bool,
    tag_program_date_time: bool,
    tag_key: bool,
    tag_custom: bool,
    tag_partial_segment: bool,
    program_date_time: Option<DateTime<FixedOffset>>,
    limit: i64,
    offset: i64,
    duration: f64,
    title: String,
    alternatives: Vec<Alternative>,
    xkeys: Vec<Key>,
    last_read_map: Option<Map>,
    last_stored_map: Option<Map>,
    scte: Option<Scte35>,
    scte35_date_ranges: Vec<DateRange>,
    custom: crate::custom::CustomMap,
}

fn parse_num<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| PlaylistError::InvalidValue {
        field,
        raw: raw.to_string(),
    })
}

/// `n[@o]` of EXT-X-BYTERANGE attribute values (EXT-X-MAP, EXT-X-PART).
/// Both fields are required in the attribute form.
fn parse_byterange_pair(raw: &str) -> Result<(i64, i64)> {
    let raw = dequote(raw);
    let (limit, offset) = raw.split_once('@').ok_or(PlaylistError::InvalidValue {
        field: "BYTERANGE",
        raw: raw.to_string(),
    })?;
    Ok((
        parse_num("BYTERANGE", limit)?,
        parse_num("BYTERANGE", offset)?,
    ))
}

fn parse_ext_x_media(line: &str, strict: bool) -> Result<Alternative> {
    let rest = line
        .strip_prefix("#EXT-X-MEDIA:")
        .ok_or_else(|| PlaylistError::InvalidValue {
            field: "EXT-X-MEDIA",
            raw: line.to_string(),
        })?;
    let mut alt = Alternative::default();
    for (key, value) in trimmed_attributes(rest) {
        match key.as_str() {
            "TYPE" => alt.media_type = value,
            "URI" => alt.uri = value,
            "GROUP-ID" => alt.group_id = value,
            "LANGUAGE" => alt.language = value,
            "ASSOC-LANGUAGE" => alt.assoc_language = value,
            "NAME" => alt.name = value,
            "STABLE-RENDITION-ID" => alt.stable_rendition_id = value,
            "DEFAULT" => alt.default = yes_or_no(&key, &value, strict)?,
            "AUTOSELECT" => alt.autoselect = yes_or_no(&key, &value, strict)?,
            "FORCED" => alt.forced = yes_or_no(&key, &value, strict)?,
            "INSTREAM-ID" => alt.instream_id = value,
            "BIT-DEPTH" => alt.bit_depth = parse_num("BIT-DEPTH", &value)?,
            "SAMPLE-RATE" => alt.sample_rate = parse_num("SAMPLE-RATE", &value)?,
            "CHARACTERISTICS" => alt.characteristics = value,
            "CHANNELS" => alt.channels = Some(value.parse()?),
            _ => {}
        }
    }
    Ok(alt)
}

fn parse_stream_inf(line: &str, strict: bool) -> Result<(VariantParams, String)> {
    let rest = line
        .strip_prefix("#EXT-X-STREAM-INF:")
        .or_else(|| line.strip_prefix("#EXT-X-I-FRAME-STREAM-INF:"))
        .ok_or_else(|| PlaylistError::InvalidValue {
            field: "EXT-X-STREAM-INF",
            raw: line.to_string(),
        })?;
    let mut params = VariantParams::default();
    let mut uri = String::new();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "BANDWIDTH" => match parse_num::<u32>("BANDWIDTH", value) {
                Ok(v) => params.bandwidth = v,
                Err(e) if strict => return Err(e),
                Err(_) => {}
            },
            "AVERAGE-BANDWIDTH" => match parse_num::<u32>("AVERAGE-BANDWIDTH", value) {
                Ok(v) => params.average_bandwidth = v,
                Err(e) if strict => return Err(e),
                Err(_) => {}
            },
            "SCORE" => match parse_num::<f64>("SCORE", value) {
                Ok(v) => params.score = v,
                Err(e) if strict => return Err(e),
                Err(_) => {}
            },
            "CODECS" => params.codecs = dequote(value).to_string(),
            "SUPPLEMENTAL-CODECS" => params.supplemental_codecs = dequote(value).to_string(),
            "RESOLUTION" => params.resolution = value.to_string(),
            "FRAME-RATE" => match parse_num::<f64>("FRAME-RATE", value) {
                Ok(v) => params.frame_rate = v,
                Err(e) if strict => return Err(e),
                Err(_) => {}
            },
            "HDCP-LEVEL" => params.hdcp_level = value.to_string(),
            "ALLOWED-CPC" => params.allowed_cpc = dequote(value).to_string(),
            "VIDEO-RANGE" => params.video_range = value.to_string(),
            "REQ-VIDEO-LAYOUT" => params.req_video_layout = dequote(value).to_string(),
            "STABLE-VARIANT-ID" => params.stable_variant_id = dequote(value).to_string(),
            "AUDIO" => params.audio = dequote(value).to_string(),
            "VIDEO" => params.video = dequote(value).to_string(),
            "SUBTITLES" => params.subtitles = dequote(value).to_string(),
            "CLOSED-CAPTIONS" => {
                params.captions = if value == "NONE" {
                    "NONE".to_string()
                } else {
                    dequote(value).to_string()
                }
            }
            "PATHWAY-ID" => params.pathway_id = dequote(value).to_string(),
            "URI" => uri = dequote(value).to_string(),
            "PROGRAM-ID" => match parse_num::<i64>("PROGRAM-ID", value) {
                Ok(v) => params.program_id = Some(v),
                Err(e) if strict => return Err(e),
                Err(_) => {}
            },
            "NAME" => params.name = dequote(value).to_string(),
            _ => {}
        }
    }
    Ok((params, uri))
}

fn parse_date_range(line: &str) -> Result<DateRange> {
    let rest = line
        .strip_prefix("#EXT-X-DATERANGE:")
        .ok_or_else(|| PlaylistError::InvalidValue {
            field: "EXT-X-DATERANGE",
            raw: line.to_string(),
        })?;
    let attrs = attributes(rest);
    let start_date = attrs
        .iter()
        .find(|a| a.key == "START-DATE")
        .ok_or(PlaylistError::InvalidValue {
            field: "START-DATE",
            raw: line.to_string(),
        })
        .and_then(|a| strict_time_parse(dequote(&a.value)))?;
    let mut dr = DateRange::new(start_date);
    for attr in attrs {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "ID" => dr.id = dequote(value).to_string(),
            "CLASS" => dr.class = dequote(value).to_string(),
            "START-DATE" => {}
            "END-DATE" => dr.end_date = Some(strict_time_parse(dequote(value))?),
            "CUE" => dr.cue = value.to_string(),
            "DURATION" => dr.duration = Some(parse_num("DURATION", value)?),
            "PLANNED-DURATION" => {
                dr.planned_duration = Some(parse_num("PLANNED-DURATION", value)?)
            }
            "SCTE35-CMD" => dr.scte35_cmd = scte35_hex("SCTE35-CMD", value)?,
            "SCTE35-OUT" => dr.scte35_out = scte35_hex("SCTE35-OUT", value)?,
            "SCTE35-IN" => dr.scte35_in = scte35_hex("SCTE35-IN", value)?,
            "END-ON-NEXT" => dr.end_on_next = value == "YES",
            key if key.starts_with("X-") => dr.x_attrs.push(attr.clone()),
            _ => {}
        }
    }
    Ok(dr)
}

/// SCTE35-CMD/OUT/IN values must be hex with a `0x` prefix; they are
/// preserved verbatim.
fn scte35_hex(field: &'static str, value: &str) -> Result<String> {
    if value.len() <= 4 || !value.starts_with("0x") {
        return Err(PlaylistError::InvalidValue {
            field,
            raw: value.to_string(),
        });
    }
    Ok(value.to_string())
}

fn parse_start_params(rest: &str) -> Result<(f64, bool)> {
    let mut time_offset = 0.0;
    let mut precise = false;
    for attr in attributes(rest) {
        match attr.key.as_str() {
            "TIME-OFFSET" => time_offset = parse_num("TIME-OFFSET", &attr.value)?,
            "PRECISE" => precise = attr.value == "YES",
            _ => {}
        }
    }
    Ok((time_offset, precise))
}

fn parse_define(line: &str) -> Result<Define> {
    let rest = line
        .strip_prefix("#EXT-X-DEFINE:")
        .ok_or_else(|| PlaylistError::InvalidValue {
            field: "EXT-X-DEFINE",
            raw: line.to_string(),
        })?;
    let attrs = trimmed_attributes(rest);
    let kind = match attrs.first().map(|(k, _)| k.as_str()) {
        Some("NAME") => DefineType::Value,
        Some("QUERYPARAM") => DefineType::QueryParam,
        Some("IMPORT") => DefineType::Import,
        _ => {
            return Err(PlaylistError::InvalidValue {
                field: "EXT-X-DEFINE",
                raw: line.to_string(),
            })
        }
    };
    let name = attrs[0].1.clone();
    let mut value = String::new();
    if kind == DefineType::Value {
        value = attrs
            .iter()
            .find(|(k, _)| k == "VALUE")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| PlaylistError::InvalidValue {
                field: "EXT-X-DEFINE",
                raw: line.to_string(),
            })?;
    }
    Ok(Define { name, kind, value })
}

fn parse_partial_segment(rest: &str) -> Result<PartialSegment> {
    let mut ps = PartialSegment::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "URI" => ps.uri = dequote(value).to_string(),
            "DURATION" => ps.duration = parse_num("DURATION", value)?,
            "INDEPENDENT" => ps.independent = value == "YES",
            "BYTERANGE" => (ps.limit, ps.offset) = parse_byterange_pair(value)?,
            _ => {}
        }
    }
    Ok(ps)
}

fn parse_preload_hint(rest: &str) -> Result<PreloadHint> {
    let mut hint = PreloadHint::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "TYPE" => hint.hint_type = value.to_string(),
            "URI" => hint.uri = dequote(value).to_string(),
            "BYTERANGE-START" => hint.offset = parse_num("BYTERANGE-START", value)?,
            "BYTERANGE-LENGTH" => hint.limit = parse_num("BYTERANGE-LENGTH", value)?,
            _ => {}
        }
    }
    Ok(hint)
}

fn parse_skip(rest: &str) -> Result<u64> {
    let mut skipped = 0;
    for attr in attributes(rest) {
        if attr.key == "SKIPPED-SEGMENTS" {
            skipped = parse_num("SKIPPED-SEGMENTS", &attr.value)?;
        }
    }
    Ok(skipped)
}

fn parse_server_control(rest: &str) -> Result<ServerControl> {
    let mut sc = ServerControl::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "CAN-SKIP-UNTIL" => sc.can_skip_until = parse_num("CAN-SKIP-UNTIL", value)?,
            "CAN-SKIP-DATERANGES" => sc.can_skip_dateranges = value == "YES",
            "HOLD-BACK" => sc.hold_back = parse_num("HOLD-BACK", value)?,
            "PART-HOLD-BACK" => sc.part_hold_back = parse_num("PART-HOLD-BACK", value)?,
            "CAN-BLOCK-RELOAD" => sc.can_block_reload = value == "YES",
            _ => {}
        }
    }
    Ok(sc)
}

fn parse_session_data(line: &str) -> Result<SessionData> {
    let rest = line
        .strip_prefix("#EXT-X-SESSION-DATA:")
        .ok_or_else(|| PlaylistError::InvalidValue {
            field: "EXT-X-SESSION-DATA",
            raw: line.to_string(),
        })?;
    let mut sd = SessionData::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "DATA-ID" => sd.data_id = dequote(value).to_string(),
            "VALUE" => sd.value = dequote(value).to_string(),
            "URI" => sd.uri = dequote(value).to_string(),
            "FORMAT" => match value {
                "JSON" | "RAW" => sd.format = value.to_string(),
                _ => {
                    return Err(PlaylistError::InvalidValue {
                        field: "FORMAT",
                        raw: value.to_string(),
                    })
                }
            },
            "LANGUAGE" => sd.language = dequote(value).to_string(),
            _ => {}
        }
    }
    Ok(sd)
}

fn parse_key_params(rest: &str) -> Key {
    let mut key = Key::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "METHOD" => key.method = value.to_string(),
            "URI" => key.uri = dequote(value).to_string(),
            "IV" => key.iv = value.to_string(),
            "KEYFORMAT" => key.keyformat = dequote(value).to_string(),
            "KEYFORMATVERSIONS" => key.keyformatversions = dequote(value).to_string(),
            _ => {}
        }
    }
    key
}

fn parse_map_params(rest: &str) -> Result<Map> {
    let mut map = Map::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "URI" => map.uri = dequote(value).to_string(),
            "BYTERANGE" => (map.limit, map.offset) = parse_byterange_pair(value)?,
            _ => {}
        }
    }
    Ok(map)
}

fn parse_content_steering(rest: &str) -> ContentSteering {
    let mut cs = ContentSteering::default();
    for attr in attributes(rest) {
        let value = attr.value.as_str();
        match attr.key.as_str() {
            "SERVER-URI" => cs.server_uri = dequote(value).to_string(),
            "PATHWAY-ID" => cs.pathway_id = dequote(value).to_string(),
            _ => {}
        }
    }
    cs
}

/// Decodes one line of a multivariant playlist.
fn decode_multivariant_line(
    p: &mut MultivariantPlaylist,
    state: &mut DecodingState,
    line: &str,
    strict: bool,
) -> Result<()> {
    // Custom decoders observe matching lines first; they may re-parse
    // existing tags but do not suppress built-in handling.
    for decoder in &p.custom_decoders {
        if line.starts_with(decoder.tag_name()) {
            match decoder.decode(line) {
                Ok(tag) => {
                    p.custom.insert(tag.tag_name().to_string(), tag);
                }
                Err(e) if strict => return Err(e),
                Err(e) => debug!(error = %e, line, "custom decoder failed"),
            }
        }
    }

    if line == "#EXTM3U" {
        state.m3u = true;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-VERSION:") {
        match parse_num::<u8>("EXT-X-VERSION", rest) {
            Ok(v) => p.ver = v,
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad version"),
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-START:") {
        let (time_offset, precise) =
            parse_start_params(rest).map_err(|e| e.in_tag("EXT-X-START"))?;
        p.start_time = time_offset;
        p.start_time_precise = precise;
    } else if line == "#EXT-X-INDEPENDENT-SEGMENTS" {
        p.set_independent_segments(true);
    } else if line.starts_with("#EXT-X-MEDIA:") {
        state.list_kind = Some(ListKind::Multivariant);
        let alt = parse_ext_x_media(line, strict).map_err(|e| e.in_tag("EXT-X-MEDIA"))?;
        state.alternatives.push(alt);
    } else if !state.tag_stream_inf && line.starts_with("#EXT-X-STREAM-INF:") {
        state.tag_stream_inf = true;
        state.list_kind = Some(ListKind::Multivariant);
        let (params, _) = parse_stream_inf(line, strict).map_err(|e| e.in_tag("EXT-X-STREAM-INF"))?;
        p.variants.push(Variant {
            uri: String::new(),
            chunklist: None,
            params,
        });
    } else if state.tag_stream_inf && !line.starts_with('#') {
        state.tag_stream_inf = false;
        if let Some(variant) = p.variants.last_mut() {
            variant.uri = line.to_string();
        }
    } else if line.starts_with("#EXT-X-I-FRAME-STREAM-INF:") {
        state.list_kind = Some(ListKind::Multivariant);
        let (mut params, uri) =
            parse_stream_inf(line, strict).map_err(|e| e.in_tag("EXT-X-I-FRAME-STREAM-INF"))?;
        params.iframe = true;
        p.variants.push(Variant {
            uri,
            chunklist: None,
            params,
        });
    } else if line.starts_with("#EXT-X-DEFINE:") {
        let define = parse_define(line).map_err(|e| e.in_tag("EXT-X-DEFINE"))?;
        p.append_define(define);
    } else if line.starts_with("#EXT-X-SESSION-DATA:") {
        let sd = parse_session_data(line).map_err(|e| e.in_tag("EXT-X-SESSION-DATA"))?;
        p.session_datas.push(sd);
    } else if let Some(rest) = line.strip_prefix("#EXT-X-SESSION-KEY:") {
        p.session_keys.push(parse_key_params(rest));
    } else if let Some(rest) = line.strip_prefix("#EXT-X-CONTENT-STEERING:") {
        p.content_steering = Some(parse_content_steering(rest));
    }
    Ok(())
}

/// Decodes one line of a media playlist.
fn decode_media_line(
    p: &mut MediaPlaylist,
    state: &mut DecodingState,
    line: &str,
    strict: bool,
) -> Result<()> {
    // Custom decoders observe matching lines first; segment tags are
    // buffered until the terminating URI.
    for decoder in &p.custom_decoders {
        if line.starts_with(decoder.tag_name()) {
            match decoder.decode(line) {
                Ok(tag) => {
                    if decoder.is_segment_tag() {
                        state.tag_custom = true;
                        state.custom.insert(tag.tag_name().to_string(), tag);
                    } else {
                        p.custom.insert(tag.tag_name().to_string(), tag);
                    }
                }
                Err(e) if strict => return Err(e),
                Err(e) => debug!(error = %e, line, "custom decoder failed"),
            }
        }
    }

    if line == "#EXT-X-INDEPENDENT-SEGMENTS" {
        p.set_independent_segments(true);
    } else if !state.tag_inf && line.starts_with("#EXTINF:") {
        state.tag_inf = true;
        state.list_kind = Some(ListKind::Media);
        let rest = &line["#EXTINF:".len()..];
        let (duration, title) = match rest.find(',') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None if strict => {
                return Err(PlaylistError::InvalidValue {
                    field: "EXTINF",
                    raw: line.to_string(),
                })
            }
            None => (rest, ""),
        };
        state.title = title.to_string();
        if !duration.is_empty() {
            match parse_num::<f64>("EXTINF duration", duration) {
                Ok(d) => state.duration = d,
                Err(e) if strict => return Err(e),
                Err(_) => state.duration = 0.0,
            }
        }
    } else if !line.starts_with('#') {
        if state.tag_inf {
            state.tag_inf = false;
            let mut seg =
                MediaSegment::new(line, state.duration, std::mem::take(&mut state.title));
            if state.last_read_map.is_some() && state.last_read_map != state.last_stored_map {
                seg.map = state.last_read_map.clone();
                state.last_stored_map = state.last_read_map.clone();
            }
            p.append_segment_extending(seg);
        }
        if state.tag_range {
            state.tag_range = false;
            if let Err(e) = p.set_range(state.limit, state.offset) {
                if strict {
                    return Err(e);
                }
            }
        }
        if state.tag_scte35 {
            state.tag_scte35 = false;
            if let Some(scte) = state.scte.take() {
                p.scte35_syntax = scte.syntax;
                if let Err(e) = p.set_scte35(scte) {
                    if strict {
                        return Err(e);
                    }
                }
            }
        }
        if !state.scte35_date_ranges.is_empty() {
            let ranges = std::mem::take(&mut state.scte35_date_ranges);
            p.scte35_syntax = Scte35Syntax::DateRange;
            if let Some(seg) = p.last_segment_mut() {
                seg.scte35_date_ranges = ranges;
            }
        }
        if state.tag_discontinuity {
            state.tag_discontinuity = false;
            if let Err(e) = p.set_discontinuity() {
                if strict {
                    return Err(e);
                }
            }
        }
        if state.tag_gap {
            state.tag_gap = false;
            if let Err(e) = p.set_gap() {
                if strict {
                    return Err(e);
                }
            }
        }
        if state.tag_program_date_time && p.count() > 0 {
            state.tag_program_date_time = false;
            if let Some(t) = state.program_date_time {
                if let Err(e) = p.set_program_date_time(t) {
                    if strict {
                        return Err(e);
                    }
                }
            }
        }
        // A key seen before the segment URI applies to this segment; the
        // first one doubles as the playlist default for convenient
        // generation.
        if state.tag_key {
            state.tag_key = false;
            let keys = std::mem::take(&mut state.xkeys);
            if p.keys.is_empty() {
                p.keys = keys.clone();
            }
            if let Some(seg) = p.last_segment_mut() {
                seg.keys = keys;
            }
        }
        if state.tag_custom {
            state.tag_custom = false;
            let custom = std::mem::take(&mut state.custom);
            if let Some(seg) = p.last_segment_mut() {
                seg.custom = custom;
            }
        }
        if state.tag_partial_segment {
            // The segment URI completes the pending part group; the ring
            // append already marked the parts.
            state.tag_partial_segment = false;
        }
    } else if line == "#EXTM3U" {
        state.m3u = true;
    } else if line == "#EXT-X-ENDLIST" {
        state.list_kind = Some(ListKind::Media);
        p.closed = true;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-VERSION:") {
        match parse_num::<u8>("EXT-X-VERSION", rest) {
            Ok(v) => p.ver = v,
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad version"),
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
        state.list_kind = Some(ListKind::Media);
        match parse_num::<u64>("EXT-X-TARGETDURATION", rest) {
            Ok(v) => p.target_duration = v,
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad target duration"),
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-PART-INF:PART-TARGET=") {
        state.list_kind = Some(ListKind::Media);
        match parse_num::<f64>("PART-TARGET", rest) {
            Ok(v) => p.part_target_duration = v,
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad part target"),
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-SERVER-CONTROL:") {
        state.list_kind = Some(ListKind::Media);
        p.server_control =
            Some(parse_server_control(rest).map_err(|e| e.in_tag("EXT-X-SERVER-CONTROL"))?);
    } else if let Some(rest) = line.strip_prefix("#EXT-X-SKIP:") {
        state.list_kind = Some(ListKind::Media);
        p.skipped_segments = parse_skip(rest).map_err(|e| e.in_tag("EXT-X-SKIP"))?;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-PART:") {
        state.list_kind = Some(ListKind::Media);
        state.tag_partial_segment = true;
        let mut ps = parse_partial_segment(rest).map_err(|e| e.in_tag("EXT-X-PART"))?;
        if state.tag_program_date_time && p.has_partial_segments() {
            ps.program_date_time = state.program_date_time;
            state.tag_program_date_time = false;
        }
        p.append_partial_segment(ps)?;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-PRELOAD-HINT:") {
        p.preload_hint =
            Some(parse_preload_hint(rest).map_err(|e| e.in_tag("EXT-X-PRELOAD-HINT"))?);
    } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
        state.list_kind = Some(ListKind::Media);
        match parse_num::<u64>("EXT-X-MEDIA-SEQUENCE", rest) {
            Ok(v) => {
                p.seq_no = v;
                p.segment_indexing.next_msn = v;
            }
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad media sequence"),
        }
    } else if line.starts_with("#EXT-X-DEFINE:") {
        let define = parse_define(line).map_err(|e| e.in_tag("EXT-X-DEFINE"))?;
        p.defines.push(define);
    } else if let Some(rest) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
        state.list_kind = Some(ListKind::Media);
        match rest {
            "EVENT" => p.media_type = Some(MediaType::Event),
            "VOD" => p.media_type = Some(MediaType::Vod),
            _ => {}
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-DISCONTINUITY-SEQUENCE:") {
        state.list_kind = Some(ListKind::Media);
        match parse_num::<u64>("EXT-X-DISCONTINUITY-SEQUENCE", rest) {
            Ok(v) => p.discontinuity_seq = v,
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad discontinuity sequence"),
        }
    } else if let Some(rest) = line.strip_prefix("#EXT-X-START:") {
        let (time_offset, precise) =
            parse_start_params(rest).map_err(|e| e.in_tag("EXT-X-START"))?;
        p.start_time = time_offset;
        p.start_time_precise = precise;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-KEY:") {
        state.list_kind = Some(ListKind::Media);
        state.xkeys.push(parse_key_params(rest));
        state.tag_key = true;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-MAP:") {
        state.list_kind = Some(ListKind::Media);
        let map = parse_map_params(rest).map_err(|e| e.in_tag("EXT-X-MAP"))?;
        // The first map before any segment becomes the playlist default.
        if state.last_read_map.is_none() && p.count() == 0 {
            p.map = Some(map.clone());
            state.last_stored_map = Some(map.clone());
        }
        if state.last_read_map.as_ref() != Some(&map) {
            state.last_read_map = Some(map);
        }
    } else if !state.tag_program_date_time && line.starts_with("#EXT-X-PROGRAM-DATE-TIME:") {
        state.tag_program_date_time = true;
        state.list_kind = Some(ListKind::Media);
        let rest = &line["#EXT-X-PROGRAM-DATE-TIME:".len()..];
        match parse_date_time(rest) {
            Ok(t) => state.program_date_time = Some(t),
            Err(e) if strict => return Err(e),
            Err(e) => debug!(error = %e, line, "skipping bad program date-time"),
        }
    } else if !state.tag_range && line.starts_with("#EXT-X-BYTERANGE:") {
        state.tag_range = true;
        state.list_kind = Some(ListKind::Media);
        state.offset = 0;
        let rest = &line["#EXT-X-BYTERANGE:".len()..];
        let (limit, offset) = match rest.split_once('@') {
            Some((l, o)) => (l, Some(o)),
            None => (rest, None),
        };
        match parse_num::<i64>("BYTERANGE length", limit) {
            Ok(v) => state.limit = v,
            Err(e) if strict => return Err(e.in_tag("EXT-X-BYTERANGE")),
            Err(e) => debug!(error = %e, line, "skipping bad byte-range length"),
        }
        if let Some(offset) = offset {
            match parse_num::<i64>("BYTERANGE offset", offset) {
                Ok(v) => state.offset = v,
                Err(e) if strict => return Err(e.in_tag("EXT-X-BYTERANGE")),
                Err(e) => debug!(error = %e, line, "skipping bad byte-range offset"),
            }
        }
    } else if !state.tag_scte35 && line.starts_with("#EXT-SCTE35:") {
        state.tag_scte35 = true;
        state.list_kind = Some(ListKind::Media);
        let mut scte = Scte35 {
            syntax: Scte35Syntax::Scte67_2014,
            ..Scte35::default()
        };
        for (key, value) in trimmed_attributes(&line["#EXT-SCTE35:".len()..]) {
            match key.as_str() {
                "CUE" => scte.cue = value,
                "ID" => scte.id = value,
                "TIME" => scte.time = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        state.scte = Some(scte);
    } else if !state.tag_scte35 && line.starts_with("#EXT-OATCLS-SCTE35:") {
        // The OATCLS line carries the cue; a following EXT-X-CUE-OUT
        // supplies the duration.
        state.tag_scte35 = true;
        state.scte = Some(Scte35 {
            syntax: Scte35Syntax::Oatcls,
            cue: line["#EXT-OATCLS-SCTE35:".len()..].to_string(),
            ..Scte35::default()
        });
    } else if state.tag_scte35
        && state
            .scte
            .as_ref()
            .is_some_and(|s| s.syntax == Scte35Syntax::Oatcls)
        && line.starts_with("#EXT-X-CUE-OUT:")
    {
        if let Some(scte) = state.scte.as_mut() {
            scte.time = line["#EXT-X-CUE-OUT:".len()..].parse().unwrap_or_default();
            scte.kind = Scte35CueKind::Start;
        }
    } else if !state.tag_scte35 && line.starts_with("#EXT-X-CUE-OUT-CONT:") {
        state.tag_scte35 = true;
        let mut scte = Scte35 {
            syntax: Scte35Syntax::Oatcls,
            kind: Scte35CueKind::Mid,
            ..Scte35::default()
        };
        for (key, value) in trimmed_attributes(&line["#EXT-X-CUE-OUT-CONT:".len()..]) {
            match key.as_str() {
                "SCTE35" => scte.cue = value,
                "Duration" => scte.time = value.parse().unwrap_or_default(),
                "ElapsedTime" => scte.elapsed = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        state.scte = Some(scte);
    } else if !state.tag_scte35 && line.starts_with("#EXT-X-CUE-OUT") {
        state.tag_scte35 = true;
        let mut scte = Scte35 {
            syntax: Scte35Syntax::Oatcls,
            kind: Scte35CueKind::Start,
            ..Scte35::default()
        };
        if let Some(rest) = line.strip_prefix("#EXT-X-CUE-OUT:") {
            scte.time = rest.parse().unwrap_or_default();
        }
        state.scte = Some(scte);
    } else if !state.tag_scte35 && line == "#EXT-X-CUE-IN" {
        state.tag_scte35 = true;
        state.scte = Some(Scte35 {
            syntax: Scte35Syntax::Oatcls,
            kind: Scte35CueKind::End,
            ..Scte35::default()
        });
    } else if line.starts_with("#EXT-X-DATERANGE:") {
        let dr = parse_date_range(line).map_err(|e| e.in_tag("EXT-X-DATERANGE"))?;
        if dr.is_scte35() {
            state.scte35_date_ranges.push(dr);
        } else {
            p.date_ranges.push(dr);
        }
    } else if !state.tag_discontinuity && line.starts_with("#EXT-X-DISCONTINUITY") {
        state.tag_discontinuity = true;
        state.list_kind = Some(ListKind::Media);
    } else if !state.tag_gap && line.starts_with("#EXT-X-GAP") {
        state.tag_gap = true;
        state.list_kind = Some(ListKind::Media);
    } else if line.starts_with("#EXT-X-I-FRAMES-ONLY") {
        state.list_kind = Some(ListKind::Media);
        p.iframe = true;
    } else if let Some(rest) = line.strip_prefix("#EXT-X-ALLOW-CACHE:") {
        p.allow_cache = Some(rest == "YES");
    }
    Ok(())
}

impl MultivariantPlaylist {
    /// Decodes a multivariant playlist into this instance. With `strict`
    /// the first syntax error is returned; otherwise recoverable errors
    /// are skipped.
    pub fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        let mut state = DecodingState::default();
        for line in lex::lines(data) {
            if line.is_empty() {
                continue;
            }
            let res = decode_multivariant_line(self, &mut state, &line, strict);
            if strict {
                res?;
            }
        }
        self.attach_renditions_to_variants(&state.alternatives);
        self.alternatives = state.alternatives;
        if strict && !state.m3u {
            return Err(PlaylistError::MissingExtM3u);
        }
        self.cache = None;
        Ok(())
    }

    /// Decodes a multivariant playlist from a reader.
    pub fn decode_from(&mut self, mut reader: impl Read, strict: bool) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decode(&data, strict)
    }
}

impl MediaPlaylist {
    /// Decodes a media playlist into this instance. The ring auto-extends
    /// as needed. With `strict` the first syntax error is returned;
    /// otherwise recoverable errors are skipped.
    pub fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        let mut state = DecodingState::default();
        for line in lex::lines(data) {
            if line.is_empty() {
                continue;
            }
            let res = decode_media_line(self, &mut state, &line, strict);
            if strict {
                res?;
            }
        }
        if strict && !state.m3u {
            return Err(PlaylistError::MissingExtM3u);
        }
        // SCTE-35 date ranges bind to the following segment; one left
        // after the last segment has nothing to bind to.
        if !state.scte35_date_ranges.is_empty() {
            return Err(PlaylistError::DanglingScte35DateRange);
        }
        self.cache = None;
        Ok(())
    }

    /// Decodes a media playlist from a reader.
    pub fn decode_from(&mut self, mut reader: impl Read, strict: bool) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decode(&data, strict)
    }
}

/// Auto-detecting decode: every line is fed to both parsers until a
/// type-discriminating tag settles the kind.
pub(crate) fn decode_playlist(
    data: &[u8],
    strict: bool,
    decoders: Option<Vec<Arc<dyn CustomDecoder>>>,
) -> Result<Playlist> {
    let mut state = DecodingState::default();
    let mut multivariant = MultivariantPlaylist::new();
    // Winsize is forced to 0 for VOD/EVENT after decode; the ring
    // auto-extends beyond the initial capacity.
    let mut media = MediaPlaylist::new(8, 1024)?;

    if let Some(decoders) = decoders {
        multivariant = multivariant.with_custom_decoders(decoders.clone());
        media = media.with_custom_decoders(decoders);
    }

    for line in lex::lines(data) {
        if line.is_empty() {
            continue;
        }
        if state.list_kind != Some(ListKind::Media) {
            let res = decode_multivariant_line(&mut multivariant, &mut state, &line, strict);
            if strict {
                res?;
            }
        }
        if state.list_kind != Some(ListKind::Multivariant) {
            let res = decode_media_line(&mut media, &mut state, &line, strict);
            if strict {
                res?;
            }
        }
    }

    if strict && !state.m3u {
        return Err(PlaylistError::MissingExtM3u);
    }

    match state.list_kind {
        Some(ListKind::Multivariant) => {
            multivariant.attach_renditions_to_variants(&state.alternatives);
            multivariant.alternatives = state.alternatives;
            multivariant.cache = None;
            Ok(Playlist::Multivariant(multivariant))
        }
        Some(ListKind::Media) => {
            // VOD and EVENT playlists show every segment.
            if media.closed || media.media_type == Some(MediaType::Event) {
                let _ = media.set_win_size(0);
            }
            if !state.scte35_date_ranges.is_empty() {
                return Err(PlaylistError::DanglingScte35DateRange);
            }
            media.cache = None;
            Ok(Playlist::Media(media))
        }
        None => Err(PlaylistError::UndetectablePlaylistType),
    }
}

/// Auto-detecting decode from a reader.
pub(crate) fn decode_playlist_from(
    mut reader: impl Read,
    strict: bool,
    decoders: Option<Vec<Arc<dyn CustomDecoder>>>,
) -> Result<Playlist> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_playlist(&data, strict, decoders)
}
