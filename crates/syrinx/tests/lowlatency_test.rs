//! Low-Latency HLS: partial segments, indexing, preload hints and delta
//! updates.

mod common;

use syrinx::{MediaPlaylist, Playlist, PlaylistError};

fn decode_lowlatency() -> MediaPlaylist {
    match Playlist::decode(&common::fixture("media-lowlatency.m3u8"), true).unwrap() {
        Playlist::Media(media) => media,
        Playlist::Multivariant(_) => panic!("expected a media playlist"),
    }
}

#[test]
fn decodes_part_target_and_partial_segments() {
    let media = decode_lowlatency();
    assert_eq!(media.target_duration, 4);
    assert!(!media.closed);
    assert_eq!(media.count(), 7);
    assert_eq!(media.part_target_duration, 1.002);
    assert_eq!(media.partial_segments.len(), 6);

    for ps in &media.partial_segments {
        assert_eq!(ps.duration, 1.00008);
        assert!(ps.uri.starts_with("filePart"));
    }
    let independent: Vec<_> = media
        .partial_segments
        .iter()
        .filter(|ps| ps.independent)
        .map(|ps| ps.uri.as_str())
        .collect();
    assert_eq!(independent, ["filePart249.1.m4s", "filePart250.1.m4s"]);

    let hint = media.preload_hint.as_ref().expect("preload hint");
    assert_eq!(hint.hint_type, "PART");
    assert_eq!(hint.uri, "filePart250.3.m4s");

    let sc = media.server_control.as_ref().expect("server control");
    assert!(sc.can_block_reload);
    assert_eq!(sc.part_hold_back, 3.006);
}

#[test]
fn next_sequence_and_part_rolls_over_on_a_full_segment() {
    let mut media = decode_lowlatency();

    assert_eq!(media.last_seg_index(), 250);
    assert_eq!(media.last_part_seg_index(), 1);
    assert_eq!(media.next_sequence_and_part(), (250, 2));

    media.append_partial("filePart250.3.m4s", 1.00008, false).unwrap();
    assert_eq!(media.last_part_seg_index(), 2);
    assert!(media.is_segment_ready("filePart250.3.m4s"));

    media.append_partial("filePart250.4.m4s", 1.00008, false).unwrap();
    media.append("fileSequence250.m4s", 4.0, "").unwrap();
    assert_eq!(media.last_seg_index(), 250);
    assert_eq!(media.last_part_seg_index(), 3);
    assert!(media.is_segment_ready("fileSequence250.m4s"));

    // Rolled over to the next segment.
    assert_eq!(media.next_sequence_and_part(), (251, 0));

    media.append_partial("filePart251.1.m4s", 1.00008, true).unwrap();
    assert_eq!(media.last_seg_index(), 251);
    assert_eq!(media.last_part_seg_index(), 0);
    assert_eq!(media.next_sequence_and_part(), (251, 1));
}

#[test]
fn completed_parts_are_emitted_with_their_parent_segment() {
    let mut media = decode_lowlatency();
    let out = String::from_utf8(media.encode().to_vec()).unwrap();
    let parts_block = out
        .find("#EXT-X-PART:DURATION=1.00008,URI=\"filePart249.1.m4s\",INDEPENDENT=YES")
        .expect("first completed part");
    let parent = out.find("fileSequence249.m4s").expect("parent segment");
    assert!(parts_block < parent);
    // Pending parts of the next segment follow the last full segment.
    let pending = out
        .find("#EXT-X-PART:DURATION=1.00008,URI=\"filePart250.1.m4s\"")
        .expect("pending part");
    assert!(parent < pending);
    assert!(out.ends_with("#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"filePart250.3.m4s\"\n"));
}

#[test]
fn skip_tag_survives_decode_and_blocks_further_skips() {
    let playlist = Playlist::decode(&common::fixture("media-with-skip.m3u8"), true).unwrap();
    let mut media = match playlist {
        Playlist::Media(media) => media,
        Playlist::Multivariant(_) => panic!("expected a media playlist"),
    };
    assert_eq!(media.skipped_segments(), 3);
    assert_eq!(media.seq_no, 264);
    assert_eq!(media.count(), 3);
    let sc = media.server_control.as_ref().expect("server control");
    assert_eq!(sc.can_skip_until, 24.0);

    assert!(matches!(
        media.encode_with_skip(1),
        Err(PlaylistError::AlreadySkipped)
    ));
}

#[test]
fn delta_update_skips_leading_segments() {
    let mut media = MediaPlaylist::new(0, 16).unwrap();
    for i in 0..6 {
        media.append(format!("fileSequence{i}.m4s"), 4.0, "").unwrap();
    }
    let out = String::from_utf8(media.encode_with_skip(4).unwrap().to_vec()).unwrap();
    assert!(out.contains("#EXT-X-SKIP:SKIPPED-SEGMENTS=4\n"));
    assert!(!out.contains("fileSequence3.m4s"));
    assert!(out.contains("fileSequence4.m4s"));
    assert!(out.contains("fileSequence5.m4s"));
}

#[test]
fn partial_append_requires_a_full_segment() {
    let mut media = MediaPlaylist::new(0, 4).unwrap();
    assert!(matches!(
        media.append_partial("filePart0.1.m4s", 1.0, true),
        Err(PlaylistError::PlaylistEmpty)
    ));
}
