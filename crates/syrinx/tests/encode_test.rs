mod common;

use common::MockCustomTag;
use syrinx::{
    Alternative, Key, Map, MediaPlaylist, MultivariantPlaylist, PlaylistError, Scte35,
    Scte35CueKind, Scte35Syntax, VariantParams,
};

fn text(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8(bytes.as_ref().to_vec()).unwrap()
}

#[test]
fn sliding_window_playlist_emits_exactly_the_window() {
    let mut p = MediaPlaylist::new(3, 50).unwrap();
    for i in 0..5 {
        p.append(format!("test{i}.ts"), 5.0, "").unwrap();
    }
    let out = text(p.encode());
    let uris: Vec<_> = out
        .lines()
        .filter(|l| !l.starts_with('#'))
        .collect();
    assert_eq!(uris, ["test2.ts", "test3.ts", "test4.ts"]);
    assert!(out.contains("#EXT-X-MEDIA-SEQUENCE:2\n"));
    assert!(out.contains("#EXT-X-TARGETDURATION:5\n"));
}

#[test]
fn service_instream_id_reports_version_seven_with_reason() {
    let mut master = MultivariantPlaylist::new();
    master.append_variant(
        "video.m3u8",
        None,
        VariantParams {
            bandwidth: 1280000,
            alternatives: vec![Alternative {
                media_type: "CLOSED-CAPTIONS".to_string(),
                group_id: "cc".to_string(),
                name: "English".to_string(),
                instream_id: "SERVICE1".to_string(),
                ..Alternative::default()
            }],
            ..VariantParams::default()
        },
    );
    assert_eq!(
        master.calc_min_version(),
        (
            7,
            "SERVICE value for the INSTREAM-ID attribute of the EXT-X-MEDIA"
        )
    );
}

#[test]
fn generated_media_playlist_has_canonical_header_order() {
    let mut p = MediaPlaylist::new(0, 8).unwrap();
    p.set_default_key(Key {
        method: "AES-128".to_string(),
        uri: "https://keys/k".to_string(),
        iv: "0x0000000000000000000000000000002a".to_string(),
        ..Key::default()
    });
    p.append("a.ts", 4.0, "").unwrap();
    p.close();
    let out = text(p.encode());
    let expected = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-KEY:METHOD=AES-128,URI=\"https://keys/k\",IV=0x0000000000000000000000000000002a\n\
        #EXT-X-MEDIA-SEQUENCE:0\n\
        #EXT-X-TARGETDURATION:4\n\
        #EXTINF:4.000,\n\
        a.ts\n\
        #EXT-X-ENDLIST\n";
    assert_eq!(out, expected);
}

#[test]
fn generated_master_playlist_lists_renditions_before_variants() {
    let alt = Alternative {
        media_type: "AUDIO".to_string(),
        group_id: "aac".to_string(),
        name: "English".to_string(),
        language: "en".to_string(),
        default: true,
        autoselect: true,
        uri: "audio.m3u8".to_string(),
        ..Alternative::default()
    };
    let mut master = MultivariantPlaylist::new();
    master.append_variant(
        "video.m3u8",
        None,
        VariantParams {
            bandwidth: 1280000,
            codecs: "avc1.42c015,mp4a.40.2".to_string(),
            resolution: "640x360".to_string(),
            audio: "aac".to_string(),
            alternatives: vec![alt],
            ..VariantParams::default()
        },
    );
    let out = text(master.encode());
    let expected = "#EXTM3U\n\
        #EXT-X-VERSION:4\n\
        #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,AUTOSELECT=YES,URI=\"audio.m3u8\"\n\
        #EXT-X-STREAM-INF:BANDWIDTH=1280000,CODECS=\"avc1.42c015,mp4a.40.2\",RESOLUTION=640x360,AUDIO=\"aac\"\n\
        video.m3u8\n";
    assert_eq!(out, expected);
}

#[test]
fn duplicate_renditions_are_emitted_once() {
    let alt = Alternative {
        media_type: "AUDIO".to_string(),
        group_id: "aac".to_string(),
        name: "English".to_string(),
        language: "en".to_string(),
        ..Alternative::default()
    };
    let mut master = MultivariantPlaylist::new();
    for uri in ["low.m3u8", "hi.m3u8"] {
        master.append_variant(
            uri,
            None,
            VariantParams {
                bandwidth: 1280000,
                audio: "aac".to_string(),
                alternatives: vec![alt.clone()],
                ..VariantParams::default()
            },
        );
    }
    let out = text(master.encode());
    assert_eq!(out.matches("#EXT-X-MEDIA:").count(), 1);
}

#[test]
fn scte35_daterange_cue_is_reencoded_as_hex() {
    let mut p = MediaPlaylist::new(0, 4).unwrap();
    p.append("out.ts", 30.0, "").unwrap();
    p.set_scte35(Scte35 {
        syntax: Scte35Syntax::DateRange,
        kind: Scte35CueKind::Start,
        id: "SPLICE-1".to_string(),
        // base64 of 0xfc002f00
        cue: "/AAvAA==".to_string(),
        duration: Some(60.0),
        start_date: Some(syrinx::strict_time_parse("2014-03-05T11:15:00Z").unwrap()),
        ..Scte35::default()
    })
    .unwrap();
    let out = text(p.encode());
    assert!(out.contains(
        "#EXT-X-DATERANGE:ID=\"SPLICE-1\",START-DATE=\"2014-03-05T11:15:00Z\",DURATION=60.000,SCTE35-OUT=0xfc002f00\n"
    ));
}

#[test]
fn empty_custom_tag_encodings_are_suppressed() {
    let mut p = MediaPlaylist::new(1, 1).unwrap();
    p.set_custom_tag(Box::new(MockCustomTag {
        name: "#CustomPTag",
        decode_error: None,
        segment: false,
        encoded: "#CustomPTag",
    }));
    p.set_custom_tag(Box::new(MockCustomTag {
        name: "#CustomEmptyPTag",
        decode_error: None,
        segment: false,
        encoded: "",
    }));
    p.append("test01.ts", 5.0, "").unwrap();
    p.set_custom_segment_tag(Box::new(MockCustomTag {
        name: "#CustomSTag",
        decode_error: None,
        segment: true,
        encoded: "#CustomSTag",
    }))
    .unwrap();
    p.set_custom_segment_tag(Box::new(MockCustomTag {
        name: "#CustomEmptySTag",
        decode_error: None,
        segment: true,
        encoded: "",
    }))
    .unwrap();
    let out = text(p.encode());
    assert!(out.contains("#CustomPTag\n"));
    assert!(out.contains("#CustomSTag\n"));
    assert!(!out.contains("#CustomEmptyPTag"));
    assert!(!out.contains("#CustomEmptySTag"));
}

#[test]
fn default_map_is_suppressed_after_a_skip() {
    let mut p = MediaPlaylist::new(0, 8).unwrap();
    p.set_default_map(Map {
        uri: "init.mp4".to_string(),
        ..Map::default()
    });
    for i in 0..4 {
        p.append(format!("s{i}.m4s"), 4.0, "").unwrap();
    }
    let out = text(p.encode_with_skip(2).unwrap());
    assert!(out.contains("#EXT-X-SKIP:SKIPPED-SEGMENTS=2\n"));
    assert!(!out.contains("#EXT-X-MAP:"));
    assert!(!out.contains("s1.m4s"));
    assert!(out.contains("s2.m4s"));
}

#[test]
fn appending_to_a_full_ring_fails_without_sliding() {
    let mut p = MediaPlaylist::new(0, 2).unwrap();
    p.append("a.ts", 4.0, "").unwrap();
    p.append("b.ts", 4.0, "").unwrap();
    assert!(matches!(
        p.append("c.ts", 4.0, ""),
        Err(PlaylistError::PlaylistFull)
    ));
}

#[test]
fn declared_version_never_falls_below_calculated_for_fixtures() {
    for name in common::fixture_names() {
        let playlist = syrinx::Playlist::decode(&common::fixture(&name), false)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        let (min_ver, reason) = playlist.calc_min_version();
        assert!(
            playlist.version() >= min_ver,
            "{name}: declared {} < required {min_ver} ({reason})",
            playlist.version(),
        );
    }
}
