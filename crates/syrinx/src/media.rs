//! Media playlists: a bounded ring of segments with sliding-window,
//! VOD/EVENT and Low-Latency HLS semantics.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset};

use crate::custom::{CustomDecoder, CustomMap, CustomTag};
use crate::error::{PlaylistError, Result};
use crate::segment::{MediaSegment, PartialSegment, SegmentIndexing};
use crate::types::{DateRange, Key, Map, MediaType, PreloadHint, Scte35, Scte35Syntax, ServerControl};
use crate::version::MIN_VER;

/// A single-bitrate (media) playlist.
///
/// Used for VOD, EVENT and live sliding-window playlists. Segments live in
/// a ring of fixed `capacity`; when `winsize` is non-zero only the last
/// `winsize` segments are encoded.
pub struct MediaPlaylist {
    /// Maximum media segment duration. Rounding depends on the version.
    pub target_duration: u64,
    /// EXT-X-MEDIA-SEQUENCE: sequence id of the segment at the ring head.
    pub seq_no: u64,
    /// Optional query string appended to segment URIs.
    pub args: String,
    /// EXT-X-DEFINE tags.
    pub defines: Vec<crate::types::Define>,
    /// EXT-X-I-FRAMES-ONLY.
    pub iframe: bool,
    /// Whether EXT-X-ENDLIST is (to be) present.
    pub closed: bool,
    /// EXT-X-PLAYLIST-TYPE.
    pub media_type: Option<MediaType>,
    /// EXT-X-DISCONTINUITY-SEQUENCE.
    pub discontinuity_seq: u64,
    /// EXT-X-START:TIME-OFFSET, positive or negative.
    pub start_time: f64,
    /// EXT-X-START:PRECISE=YES.
    pub start_time_precise: bool,
    /// Default EXT-X-KEY tags emitted before any segment.
    pub keys: Vec<Key>,
    /// Default EXT-X-MAP emitted before any segment.
    pub map: Option<Map>,
    /// EXT-X-DATERANGE tags not associated with SCTE-35.
    pub date_ranges: Vec<DateRange>,
    /// Legacy EXT-X-ALLOW-CACHE, removed in protocol version 7.
    pub allow_cache: Option<bool>,
    /// Custom playlist-level tags for encoding.
    pub custom: CustomMap,
    /// EXT-X-PART-INF:PART-TARGET.
    pub part_target_duration: f64,
    /// EXT-X-PART tags, each tied to its parent segment by sequence id.
    pub partial_segments: Vec<PartialSegment>,
    /// EXT-X-PRELOAD-HINT.
    pub preload_hint: Option<PreloadHint>,
    /// EXT-X-SERVER-CONTROL.
    pub server_control: Option<ServerControl>,
    /// Sequence/part counters for Low-Latency delivery.
    pub segment_indexing: SegmentIndexing,

    pub(crate) custom_decoders: Vec<Arc<dyn CustomDecoder>>,
    pub(crate) skipped_segments: u64,
    pub(crate) skip_offset: u64,
    pub(crate) scte35_syntax: Scte35Syntax,
    pub(crate) ver: u8,
    pub(crate) independent_segments: bool,
    pub(crate) duration_precision: i8,
    pub(crate) cache: Option<Bytes>,

    segments: Vec<Option<MediaSegment>>,
    winsize: usize,
    capacity: usize,
    head: usize,
    tail: usize,
    count: usize,
    target_dur_locked: bool,
}

impl MediaPlaylist {
    /// Creates an empty media playlist.
    ///
    /// `winsize` is the live window emitted by the encoder; use 0 for VOD
    /// and EVENT playlists (and call [`close`](Self::close) after the last
    /// segment). `capacity` is the fixed size of the backing ring.
    pub fn new(winsize: usize, capacity: usize) -> Result<MediaPlaylist> {
        if winsize > capacity {
            return Err(PlaylistError::WinSizeTooSmall { winsize, capacity });
        }
        Ok(MediaPlaylist {
            target_duration: 0,
            seq_no: 0,
            args: String::new(),
            defines: Vec::new(),
            iframe: false,
            closed: false,
            media_type: None,
            discontinuity_seq: 0,
            start_time: 0.0,
            start_time_precise: false,
            keys: Vec::new(),
            map: None,
            date_ranges: Vec::new(),
            allow_cache: None,
            custom: CustomMap::new(),
            part_target_duration: 0.0,
            partial_segments: Vec::new(),
            preload_hint: None,
            server_control: None,
            segment_indexing: SegmentIndexing::default(),
            custom_decoders: Vec::new(),
            skipped_segments: 0,
            skip_offset: 0,
            scte35_syntax: Scte35Syntax::None,
            ver: MIN_VER,
            independent_segments: false,
            duration_precision: 3,
            cache: None,
            segments: std::iter::repeat_with(|| None).take(capacity).collect(),
            winsize,
            capacity,
            head: 0,
            tail: 0,
            count: 0,
            target_dur_locked: false,
        })
    }

    /// Adds custom tag decoders used by subsequent decodes.
    pub fn with_custom_decoders(mut self, decoders: Vec<Arc<dyn CustomDecoder>>) -> MediaPlaylist {
        self.custom_decoders = decoders;
        self
    }

    /// Ring index of the most recently appended segment.
    fn last(&self) -> usize {
        if self.tail == 0 {
            self.capacity - 1
        } else {
            self.tail - 1
        }
    }

    /// The most recently appended segment.
    pub fn last_segment(&self) -> Option<&MediaSegment> {
        if self.count == 0 {
            return None;
        }
        self.segments[self.last()].as_ref()
    }

    pub(crate) fn last_segment_mut(&mut self) -> Option<&mut MediaSegment> {
        if self.count == 0 {
            return None;
        }
        let idx = self.last();
        self.segments[idx].as_mut()
    }

    fn last_segment_mut_or_empty(&mut self) -> Result<&mut MediaSegment> {
        self.last_segment_mut().ok_or(PlaylistError::PlaylistEmpty)
    }

    /// Appends a segment built from its URI, duration and title.
    /// This operation resets the encode cache.
    pub fn append(
        &mut self,
        uri: impl Into<String>,
        duration: f64,
        title: impl Into<String>,
    ) -> Result<()> {
        self.append_segment(MediaSegment::new(uri, duration, title))
    }

    /// Appends a segment to the tail of the ring.
    /// This operation resets the encode cache.
    pub fn append_segment(&mut self, seg: MediaSegment) -> Result<()> {
        if self.count == self.capacity {
            return Err(PlaylistError::PlaylistFull);
        }
        self.push_segment(seg);
        Ok(())
    }

    /// Appends during decode, doubling the backing storage when the ring
    /// is full. Decode never removes segments, so the ring is laid out
    /// from index zero and the tail can be rewritten directly.
    pub(crate) fn append_segment_extending(&mut self, seg: MediaSegment) {
        if self.count == self.capacity {
            let grow = self.count.max(1);
            self.segments.extend(std::iter::repeat_with(|| None).take(grow));
            self.capacity = self.segments.len();
            self.tail = self.count;
        }
        self.push_segment(seg);
    }

    fn push_segment(&mut self, mut seg: MediaSegment) {
        let duration = seg.duration;
        seg.seq_id = self.seq_no;
        if self.count > 0 {
            if let Some(prev) = self.segments[self.last()].as_ref() {
                seg.seq_id = prev.seq_id + 1;
            }
        }
        self.segments[self.tail] = Some(seg);
        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        if !self.target_dur_locked {
            self.target_duration =
                calc_new_target_duration(duration, self.ver, self.target_duration);
        }
        // A full segment completes the pending part group.
        if self.segment_indexing.next_part > 0 {
            self.segment_indexing.max_part = self
                .segment_indexing
                .max_part
                .max(self.segment_indexing.next_part - 1);
            self.segment_indexing.next_part = 0;
        }
        for ps in &mut self.partial_segments {
            ps.completed = true;
        }
        self.segment_indexing.next_msn = self.seq_no + self.count as u64;
        self.prune_partials();
        self.cache = None;
    }

    /// Appends a partial segment built from its URI, duration and
    /// independence flag. Requires at least one full segment.
    pub fn append_partial(
        &mut self,
        uri: impl Into<String>,
        duration: f64,
        independent: bool,
    ) -> Result<()> {
        self.append_partial_segment(PartialSegment::new(uri, duration, independent))
    }

    /// Appends a partial segment belonging to the next full segment.
    /// Requires at least one full segment; partial segments older than the
    /// last three full segments are dropped.
    pub fn append_partial_segment(&mut self, mut ps: PartialSegment) -> Result<()> {
        if self.count == 0 {
            return Err(PlaylistError::PlaylistEmpty);
        }
        ps.seq_id = self.segment_indexing.next_msn;
        ps.completed = false;
        self.partial_segments.push(ps);
        self.segment_indexing.next_part += 1;
        self.prune_partials();
        self.cache = None;
        Ok(())
    }

    fn prune_partials(&mut self) {
        let next_msn = self.segment_indexing.next_msn;
        self.partial_segments.retain(|ps| ps.seq_id + 3 > next_msn);
    }

    /// Removes the segment at the head of the ring.
    /// This operation resets the encode cache.
    pub fn remove(&mut self) -> Result<()> {
        if self.count == 0 {
            return Err(PlaylistError::PlaylistEmpty);
        }
        self.segments[self.head] = None;
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        if !self.closed {
            self.seq_no += 1;
        }
        self.cache = None;
        Ok(())
    }

    /// Removes the head segment once the live window is full, then appends
    /// a new one. This operation resets the encode cache.
    pub fn slide(
        &mut self,
        uri: impl Into<String>,
        duration: f64,
        title: impl Into<String>,
    ) -> Result<()> {
        if !self.closed && self.count >= self.winsize {
            let _ = self.remove();
        }
        self.append(uri, duration, title)
    }

    /// Marks the playlist closed; subsequent encodings emit
    /// EXT-X-ENDLIST. An already-populated encode cache is extended in
    /// place rather than invalidated.
    pub fn close(&mut self) {
        if let Some(cache) = self.cache.take() {
            let mut buf = Vec::from(cache.as_ref());
            buf.extend_from_slice(b"#EXT-X-ENDLIST\n");
            self.cache = Some(Bytes::from(buf));
        }
        self.closed = true;
    }

    /// Number of segments currently in the ring.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The live window size; zero means every segment is encoded.
    pub fn win_size(&self) -> usize {
        self.winsize
    }

    /// Changes the live window size. Fails when the window would exceed
    /// the ring capacity; the previous value is kept.
    pub fn set_win_size(&mut self, winsize: usize) -> Result<()> {
        if winsize > self.capacity {
            return Err(PlaylistError::WinSizeTooSmall {
                winsize,
                capacity: self.capacity,
            });
        }
        self.winsize = winsize;
        self.cache = None;
        Ok(())
    }

    /// Sets the target duration and stops tracking segment durations.
    /// The value is locked for the life of the playlist.
    pub fn set_target_duration(&mut self, duration: u64) {
        self.target_duration = duration;
        self.target_dur_locked = true;
        self.cache = None;
    }

    /// Number of decimals used for EXTINF durations; `-1` selects the
    /// shortest round-trip form.
    pub fn set_duration_precision(&mut self, precision: i8) {
        self.duration_precision = precision;
        self.cache = None;
    }

    /// Sets the default encryption keys emitted before any segment.
    pub fn set_default_keys(&mut self, keys: Vec<Key>) {
        if keys
            .iter()
            .any(|k| !k.keyformat.is_empty() || !k.keyformatversions.is_empty())
        {
            self.update_version_floor(5);
        }
        self.keys = keys;
        self.cache = None;
    }

    /// Sets a single default encryption key.
    pub fn set_default_key(&mut self, key: Key) {
        self.set_default_keys(vec![key]);
    }

    /// Sets the default Media Initialization Section emitted at the start
    /// of the playlist. Individual segments may override it.
    pub fn set_default_map(&mut self, map: Map) {
        self.update_version_floor(5);
        self.map = Some(map);
        self.cache = None;
    }

    /// Sets the encryption keys for the current (and following) segments.
    pub fn set_keys(&mut self, keys: Vec<Key>) -> Result<()> {
        if self.count == 0 {
            return Err(PlaylistError::PlaylistEmpty);
        }
        if keys
            .iter()
            .any(|k| !k.keyformat.is_empty() || !k.keyformatversions.is_empty())
        {
            self.update_version_floor(5);
        }
        self.last_segment_mut_or_empty()?.keys = keys;
        self.cache = None;
        Ok(())
    }

    /// Sets a single encryption key for the current segment.
    pub fn set_key(&mut self, key: Key) -> Result<()> {
        self.set_keys(vec![key])
    }

    /// Sets the Media Initialization Section for the current segment.
    pub fn set_map(&mut self, map: Map) -> Result<()> {
        if self.count == 0 {
            return Err(PlaylistError::PlaylistEmpty);
        }
        self.update_version_floor(5);
        self.last_segment_mut_or_empty()?.map = Some(map);
        self.cache = None;
        Ok(())
    }

    /// Sets the byte range of the current segment.
    pub fn set_range(&mut self, limit: i64, offset: i64) -> Result<()> {
        if self.count == 0 {
            return Err(PlaylistError::PlaylistEmpty);
        }
        self.update_version_floor(4);
        let seg = self.last_segment_mut_or_empty()?;
        seg.limit = limit;
        seg.offset = offset;
        self.cache = None;
        Ok(())
    }

    /// Marks an encoding discontinuity before the current segment.
    pub fn set_discontinuity(&mut self) -> Result<()> {
        self.last_segment_mut_or_empty()?.discontinuity = true;
        self.cache = None;
        Ok(())
    }

    /// Marks the current segment as a gap.
    pub fn set_gap(&mut self) -> Result<()> {
        self.last_segment_mut_or_empty()?.gap = true;
        self.cache = None;
        Ok(())
    }

    /// Attaches a SCTE-35 cue to the current segment.
    pub fn set_scte35(&mut self, scte: Scte35) -> Result<()> {
        self.last_segment_mut_or_empty()?.scte = Some(scte);
        self.cache = None;
        Ok(())
    }

    /// Associates the first sample of the current segment with an absolute
    /// date and/or time.
    pub fn set_program_date_time(&mut self, value: DateTime<FixedOffset>) -> Result<()> {
        self.last_segment_mut_or_empty()?.program_date_time = Some(value);
        self.cache = None;
        Ok(())
    }

    /// Sets a custom tag on the playlist, keyed by its tag name.
    pub fn set_custom_tag(&mut self, tag: Box<dyn CustomTag>) {
        self.custom.insert(tag.tag_name().to_string(), tag);
        self.cache = None;
    }

    /// Sets a custom tag on the current segment, keyed by its tag name.
    pub fn set_custom_segment_tag(&mut self, tag: Box<dyn CustomTag>) -> Result<()> {
        let seg = self.last_segment_mut_or_empty()?;
        seg.custom.insert(tag.tag_name().to_string(), tag);
        self.cache = None;
        Ok(())
    }

    /// A custom playlist-level tag by name, if present.
    pub fn custom_tag(&self, name: &str) -> Option<&dyn CustomTag> {
        self.custom.get(name).map(|t| t.as_ref())
    }

    /// Marks the playlist as containing only I-frames.
    pub fn set_iframe_only(&mut self) {
        self.update_version_floor(4);
        self.iframe = true;
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

    /// SCTE-35 syntax detected while decoding.
    pub fn scte35_syntax(&self) -> Scte35Syntax {
        self.scte35_syntax
    }

    /// Value of the EXT-X-SKIP:SKIPPED-SEGMENTS tag.
    pub fn skipped_segments(&self) -> u64 {
        self.skipped_segments
    }

    /// Whether any partial segments are stored.
    pub fn has_partial_segments(&self) -> bool {
        !self.partial_segments.is_empty()
    }

    /// Segments in append order, the sliding window ignored.
    pub fn segments(&self) -> impl Iterator<Item = &MediaSegment> {
        (0..self.count).filter_map(move |i| self.segments[(self.head + i) % self.capacity].as_ref())
    }

    /// Number of leading segments hidden by the sliding window.
    pub(crate) fn window_start(&self) -> usize {
        if self.winsize > 0 && self.count > self.winsize {
            self.count - self.winsize
        } else {
            0
        }
    }

    /// Index of the last full segment, accounting for skipped segments.
    pub fn last_seg_index(&self) -> u64 {
        let next = self.segment_indexing.next_msn + self.skipped_segments;
        if self.segment_indexing.next_part == 0 {
            // Just rolled over to the next segment.
            next.saturating_sub(1)
        } else {
            next
        }
    }

    /// Index of the last partial segment within the current part group.
    pub fn last_part_seg_index(&self) -> u64 {
        if self.segment_indexing.next_part == 0 {
            // Just rolled over to the next segment.
            self.segment_indexing.max_part
        } else {
            self.segment_indexing.next_part - 1
        }
    }

    /// The (sequence, part) pair a Low-Latency client should request next.
    pub fn next_sequence_and_part(&self) -> (u64, u64) {
        let mut seq = self.last_seg_index();
        let mut part = self.last_part_seg_index();
        if part == self.segment_indexing.max_part {
            // Roll over to the next segment.
            part = 0;
            seq += 1;
        } else {
            part += 1;
        }
        (seq, part)
    }

    /// Whether a full or partial segment with the given URI suffix has
    /// been stored.
    pub fn is_segment_ready(&self, uri: &str) -> bool {
        self.segments().any(|seg| uri.ends_with(&seg.uri))
            || self
                .partial_segments
                .iter()
                .any(|ps| uri.ends_with(&ps.uri))
    }

    /// Drops the cached encode result; the next encode renders afresh.
    pub fn reset_cache(&mut self) {
        self.cache = None;
    }
}

impl std::fmt::Debug for MediaPlaylist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlaylist")
            .field("target_duration", &self.target_duration)
            .field("seq_no", &self.seq_no)
            .field("args", &self.args)
            .field("defines", &self.defines)
            .field("iframe", &self.iframe)
            .field("closed", &self.closed)
            .field("media_type", &self.media_type)
            .field("discontinuity_seq", &self.discontinuity_seq)
            .field("start_time", &self.start_time)
            .field("start_time_precise", &self.start_time_precise)
            .field("keys", &self.keys)
            .field("map", &self.map)
            .field("date_ranges", &self.date_ranges)
            .field("allow_cache", &self.allow_cache)
            .field("custom", &self.custom)
            .field("part_target_duration", &self.part_target_duration)
            .field("partial_segments", &self.partial_segments)
            .field("preload_hint", &self.preload_hint)
            .field("server_control", &self.server_control)
            .field("segment_indexing", &self.segment_indexing)
            .field("custom_decoders", &self.custom_decoders.len())
            .field("skipped_segments", &self.skipped_segments)
            .field("skip_offset", &self.skip_offset)
            .field("scte35_syntax", &self.scte35_syntax)
            .field("ver", &self.ver)
            .field("independent_segments", &self.independent_segments)
            .field("duration_precision", &self.duration_precision)
            .field("cache", &self.cache)
            .field("segments", &self.segments)
            .field("winsize", &self.winsize)
            .field("capacity", &self.capacity)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("count", &self.count)
            .field("target_dur_locked", &self.target_dur_locked)
            .finish()
    }
}

/// Target duration from a segment duration: rounded up for protocol
/// version 5 and earlier, to the nearest integer from version 6 on. Never
/// decreases.
pub(crate) fn calc_new_target_duration(seg_duration: f64, ver: u8, old: u64) -> u64 {
    let new = if ver < 6 {
        seg_duration.ceil() as u64
    } else {
        seg_duration.round() as u64
    };
    new.max(old)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn rejects_window_larger_than_capacity() {
        match MediaPlaylist::new(2, 1) {
            Err(PlaylistError::WinSizeTooSmall { winsize, capacity }) => {
                assert_eq!((winsize, capacity), (2, 1));
            }
            other => panic!("expected WinSizeTooSmall, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn appending_past_capacity_fails() {
        let mut p = MediaPlaylist::new(1, 2).unwrap();
        p.append("test01.ts", 5.0, "").unwrap();
        p.append("test02.ts", 5.0, "").unwrap();
        assert!(matches!(
            p.append("test03.ts", 5.0, ""),
            Err(PlaylistError::PlaylistFull)
        ));
    }

    #[test]
    fn sequence_ids_are_consecutive() {
        let mut p = MediaPlaylist::new(0, 10).unwrap();
        for i in 0..10 {
            p.append(format!("test{i}.ts"), 5.0, "").unwrap();
        }
        let ids: Vec<_> = p.segments().map(|s| s.seq_id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn remove_bumps_seq_no_until_closed() {
        let mut p = MediaPlaylist::new(3, 10).unwrap();
        for i in 1..10 {
            p.append(format!("test{i}.ts"), 5.6, "").unwrap();
        }
        for _ in 1..10 {
            p.remove().unwrap();
        }
        assert!(matches!(p.remove(), Err(PlaylistError::PlaylistEmpty)));
        assert_eq!(p.seq_no, 9);

        let mut closed = MediaPlaylist::new(0, 4).unwrap();
        closed.append("a.ts", 4.0, "").unwrap();
        closed.close();
        closed.remove().unwrap();
        assert_eq!(closed.seq_no, 0);
    }

    #[test]
    fn slide_keeps_window_and_sequence() {
        let mut m = MediaPlaylist::new(3, 4).unwrap();
        for i in 0..4 {
            m.append(format!("t{i:02}.ts"), 10.0, "").unwrap();
        }
        assert_eq!(m.count(), 4);
        assert_eq!(m.seq_no, 0);

        m.slide("t04.ts", 10.0, "").unwrap();
        assert_eq!(m.count(), 4);
        assert_eq!(m.seq_no, 1);
        let first = m.segments().next().unwrap();
        assert_eq!(first.uri, "t01.ts");
        assert_eq!(first.seq_id, 1);

        m.slide("t05.ts", 10.0, "").unwrap();
        m.slide("t06.ts", 10.0, "").unwrap();
        assert_eq!(m.count(), 4);
        assert_eq!(m.seq_no, 3);
        let ids: Vec<_> = m.segments().map(|s| s.seq_id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }

    #[test]
    fn slide_with_full_window_equal_capacity() {
        let mut p = MediaPlaylist::new(6, 6).unwrap();
        for i in 1..10 {
            p.slide(format!("test{i}.ts"), 5.6, "").unwrap();
        }
        assert_eq!(p.count(), 6);
        assert_eq!(p.seq_no, 3);
    }

    #[rstest]
    #[case(3, &[5.0, 5.0], 5)]
    #[case(3, &[5.6], 6)]
    #[case(6, &[5.4], 5)]
    #[case(6, &[4.5], 5)]
    fn target_duration_tracks_max(#[case] ver: u8, #[case] durations: &[f64], #[case] expected: u64) {
        let mut p = MediaPlaylist::new(0, 10).unwrap();
        p.set_version(ver);
        for (i, d) in durations.iter().enumerate() {
            p.append(format!("test{i}.ts"), *d, "").unwrap();
        }
        assert_eq!(p.target_duration, expected);
    }

    #[test]
    fn target_duration_locks_after_set() {
        let mut p = MediaPlaylist::new(0, 10).unwrap();
        p.set_target_duration(10);
        p.append("long.ts", 55.0, "").unwrap();
        assert_eq!(p.target_duration, 10);
    }

    #[test]
    fn set_win_size_keeps_old_value_on_error() {
        let mut m = MediaPlaylist::new(3, 5).unwrap();
        assert_eq!(m.win_size(), 3);
        m.set_win_size(5).unwrap();
        assert_eq!(m.win_size(), 5);
        assert!(m.set_win_size(99999).is_err());
        assert_eq!(m.win_size(), 5);
    }

    #[test]
    fn per_segment_mutators_fail_on_empty_playlist() {
        let mut p = MediaPlaylist::new(0, 4).unwrap();
        assert!(matches!(
            p.set_discontinuity(),
            Err(PlaylistError::PlaylistEmpty)
        ));
        assert!(matches!(p.set_gap(), Err(PlaylistError::PlaylistEmpty)));
        assert!(matches!(
            p.set_range(100, 0),
            Err(PlaylistError::PlaylistEmpty)
        ));
        assert!(matches!(
            p.set_key(Key::default()),
            Err(PlaylistError::PlaylistEmpty)
        ));
        assert!(matches!(
            p.append_partial("part.1.m4s", 1.0, true),
            Err(PlaylistError::PlaylistEmpty)
        ));
    }

    #[test]
    fn keyformat_bumps_version_floor() {
        let mut p = MediaPlaylist::new(0, 4).unwrap();
        p.append("a.ts", 4.0, "").unwrap();
        p.set_key(Key {
            method: "AES-128".to_string(),
            uri: "key".to_string(),
            iv: String::new(),
            keyformat: "identity".to_string(),
            keyformatversions: "1".to_string(),
        })
        .unwrap();
        assert_eq!(p.version(), 5);
    }

    #[test]
    fn low_latency_indexing_rolls_over() {
        let mut p = MediaPlaylist::new(0, 16).unwrap();
        // Four parts per segment, two segments completed.
        p.append("fileSequence0.m4s", 4.0, "").unwrap();
        for part in 1..=4 {
            p.append_partial(format!("filePart1.{part}.m4s"), 1.0, part == 1)
                .unwrap();
        }
        p.append("fileSequence1.m4s", 4.0, "").unwrap();
        assert_eq!(p.segment_indexing.max_part, 3);
        assert_eq!(p.last_seg_index(), 1);
        assert_eq!(p.last_part_seg_index(), 3);
        assert_eq!(p.next_sequence_and_part(), (2, 0));

        p.append_partial("filePart2.1.m4s", 1.0, true).unwrap();
        assert_eq!(p.last_seg_index(), 2);
        assert_eq!(p.last_part_seg_index(), 0);
        assert_eq!(p.next_sequence_and_part(), (2, 1));
    }

    #[test]
    fn old_partials_are_pruned() {
        let mut p = MediaPlaylist::new(0, 16).unwrap();
        p.append("s0.m4s", 1.0, "").unwrap();
        for msn in 1..=6 {
            p.append_partial(format!("p{msn}.1.m4s"), 0.5, true).unwrap();
            p.append(format!("s{msn}.m4s"), 1.0, "").unwrap();
        }
        // next_msn is 7; only parts with seq_id > 4 remain.
        assert!(p.partial_segments.iter().all(|ps| ps.seq_id + 3 > 7));
        assert!(p.partial_segments.len() < 6);
    }

    #[test]
    fn is_segment_ready_matches_suffixes() {
        let mut p = MediaPlaylist::new(0, 8).unwrap();
        p.append("fileSequence250.m4s", 4.0, "").unwrap();
        p.append_partial("filePart251.1.m4s", 1.0, true).unwrap();
        assert!(p.is_segment_ready("https://cdn/x/fileSequence250.m4s"));
        assert!(p.is_segment_ready("filePart251.1.m4s"));
        assert!(!p.is_segment_ready("filePart251.2.m4s"));
    }
}
