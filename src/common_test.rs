use crate::common::*;
use crate::error::*;
use std::path::Path;

#[test]
fn test_multi_value_joined() {
    assert_eq!(MultiValue::from(vec!["A", "B"]).joined(), "A, B");
    assert_eq!(MultiValue::from("A; B").joined(), "A; B");
    // No trimming, no deduplication, no reordering.
    assert_eq!(MultiValue::from(vec![" B ", "A", "A"]).joined(), " B , A, A");
    assert_eq!(MultiValue::from(Vec::<String>::new()).joined(), "");
}

#[test]
fn test_join_optional() {
    assert_eq!(join_optional(Some(&MultiValue::from(vec!["x", "y"]))), Some("x, y".to_string()));
    assert_eq!(join_optional(Some(&MultiValue::from(""))), None);
    assert_eq!(join_optional(Some(&MultiValue::from(Vec::<&str>::new()))), None);
    assert_eq!(join_optional(None), None);
}

#[test]
fn test_multi_value_deserializes_from_string_or_list() {
    let single: MultiValue = serde_json::from_str(r#""Techno""#).unwrap();
    assert_eq!(single, MultiValue::Single("Techno".to_string()));
    let many: MultiValue = serde_json::from_str(r#"["Techno", "House"]"#).unwrap();
    assert_eq!(many, MultiValue::Many(vec!["Techno".to_string(), "House".to_string()]));
}

#[test]
fn test_track_info_deserialize() {
    let track: TrackInfo = serde_json::from_str(
        r#"{
            "name": "Track 1",
            "artists": ["A", "B"],
            "explicit": "clean",
            "release_year": 2024,
            "tags": {"track_number": 3, "genres": "Techno", "extra_tags": {"MOOD": ["calm", "warm"]}}
        }"#,
    )
    .unwrap();
    assert_eq!(track.name, "Track 1");
    assert_eq!(track.album, None);
    assert_eq!(track.explicit, Some(Explicit::Clean));
    assert_eq!(track.tags.track_number, Some(3));
    assert_eq!(track.tags.total_tracks, None);
    assert_eq!(track.tags.genres, Some(MultiValue::from("Techno")));
    assert_eq!(track.tags.extra_tags["MOOD"].joined(), "calm, warm");
}

#[test]
fn test_credit_entry_uses_type_key() {
    let credit: CreditEntry = serde_json::from_str(r#"{"type": "Producer", "names": ["P1", "P2"]}"#).unwrap();
    assert_eq!(credit, CreditEntry::new("Producer", &["P1", "P2"]));
    assert_eq!(credit.joined_names(), "P1, P2");
}

#[test]
fn test_explicit() {
    assert_eq!(Explicit::Explicit.as_str(), "Explicit");
    assert_eq!(Explicit::Clean.as_str(), "Clean");
    assert_eq!(Explicit::Explicit.rating_byte(), 0x01);
    assert_eq!(Explicit::Clean.rating_byte(), 0x02);
}

#[test]
fn test_non_empty_and_positive() {
    assert_eq!(non_empty(Some("x")), Some("x"));
    assert_eq!(non_empty(Some("")), None);
    assert_eq!(non_empty(None), None);
    assert_eq!(positive(Some(3)), Some(3));
    assert_eq!(positive(Some(0)), None);
    assert_eq!(positive(None), None);
    assert_eq!(non_zero(Some(-0.5)), Some(-0.5));
    assert_eq!(non_zero(Some(0.0)), None);
    assert_eq!(decimal(3.0), "3.0");
    assert_eq!(decimal(-7.25), "-7.25");
}

#[test]
fn test_container_format_from_str() {
    assert_eq!("flac".parse::<ContainerFormat>().unwrap(), ContainerFormat::Flac);
    assert_eq!("OPUS".parse::<ContainerFormat>().unwrap(), ContainerFormat::Opus);
    assert_eq!("ogg".parse::<ContainerFormat>().unwrap(), ContainerFormat::Vorbis);
    assert_eq!("vorbis".parse::<ContainerFormat>().unwrap(), ContainerFormat::Vorbis);
    assert_eq!(".mp3".parse::<ContainerFormat>().unwrap(), ContainerFormat::Mp3);
    assert_eq!("m4a".parse::<ContainerFormat>().unwrap(), ContainerFormat::Mp4);
    assert_eq!("mp4".parse::<ContainerFormat>().unwrap(), ContainerFormat::Mp4);

    match "wav".parse::<ContainerFormat>() {
        Err(TagError::UnsupportedContainerFormat { format }) => assert_eq!(format, "wav"),
        other => panic!("expected UnsupportedContainerFormat, got {:?}", other),
    }
}

#[test]
fn test_container_format_from_path() {
    assert_eq!(ContainerFormat::from_path(Path::new("/music/01.flac")).unwrap(), ContainerFormat::Flac);
    assert_eq!(ContainerFormat::from_path(Path::new("song.M4A")).unwrap(), ContainerFormat::Mp4);
    assert!(matches!(ContainerFormat::from_path(Path::new("song")), Err(TagError::UnsupportedContainerFormat { .. })));
    assert!(matches!(ContainerFormat::from_path(Path::new("song.wav")), Err(TagError::UnsupportedContainerFormat { .. })));
}

#[test]
fn test_container_format_display_round_trips() {
    for format in ContainerFormat::ALL {
        assert_eq!(format.to_string().parse::<ContainerFormat>().unwrap(), format);
    }
}
