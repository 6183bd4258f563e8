use crate::common::{ContainerFormat, TrackInfo};
use crate::config::TaggerConfig;
use crate::container::{ContainerError, RawFrame, SaveError, SaveQuirk, TagContainer, TagValue, MIME_JPEG};
use crate::cover::METADATA_BLOCK_PICTURE;
use crate::error::TagError;
use crate::memory::MemoryContainer;
use crate::tagger::*;
use crate::testing;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fs;

fn decoded_vorbis_picture(c: &MemoryContainer) -> metaflac::block::Picture {
    let encoded = match c.get(METADATA_BLOCK_PICTURE) {
        Some(TagValue::Text(values)) => {
            assert_eq!(values.len(), 1);
            values[0].clone()
        }
        other => panic!("expected an encoded picture, got {:?}", other),
    };
    metaflac::block::Picture::from_bytes(&STANDARD.decode(encoded).unwrap()).unwrap()
}

#[test]
fn test_oversized_cover_is_skipped() {
    let temp_dir = testing::init();
    let cover = testing::write_blob(temp_dir.path(), "cover.jpg", 40 * 1024 * 1024);
    let track = testing::full_track();

    for format in ContainerFormat::ALL {
        let mut c = MemoryContainer::new(format, temp_dir.path().join(format!("track.{}", format)));
        tag_container(&mut c, Some(cover.as_path()), &track, &[], None, &TaggerConfig::default()).unwrap();
        assert_eq!(c.frame("picture"), None, "{}", format);
        assert_eq!(c.get(METADATA_BLOCK_PICTURE), None, "{}", format);
        assert_eq!(c.get("title"), Some(TagValue::text("Track 1")), "{}", format);
        assert_eq!(c.save_count(), 1, "{}", format);
    }
}

#[test]
fn test_cover_limit_is_configurable() {
    let temp_dir = testing::init();
    let cover = testing::write_blob(temp_dir.path(), "cover.jpg", 2048);
    let config = TaggerConfig {
        max_cover_bytes: 1024,
        ..Default::default()
    };
    let mut c = MemoryContainer::new(ContainerFormat::Flac, temp_dir.path().join("track.flac"));
    tag_container(&mut c, Some(cover.as_path()), &testing::full_track(), &[], None, &config).unwrap();
    assert_eq!(c.frame("picture"), None);
}

#[test]
fn test_cover_embedding_per_format() {
    let temp_dir = testing::init();
    let cover = testing::write_blob(temp_dir.path(), "cover.jpg", 100);
    let track = testing::full_track();
    let config = TaggerConfig::default();

    let mut c = MemoryContainer::new(ContainerFormat::Flac, temp_dir.path().join("track.flac"));
    tag_container(&mut c, Some(cover.as_path()), &track, &[], None, &config).unwrap();
    match c.frame("picture") {
        Some(RawFrame::Picture(p)) => {
            assert_eq!(p.mime_type, MIME_JPEG);
            assert_eq!(p.description, "");
            assert_eq!(p.data, vec![0u8; 100]);
        }
        other => panic!("expected a picture frame, got {:?}", other),
    }

    let mut c = MemoryContainer::new(ContainerFormat::Mp3, temp_dir.path().join("track.mp3"));
    tag_container(&mut c, Some(cover.as_path()), &track, &[], None, &config).unwrap();
    match c.frame("picture") {
        Some(RawFrame::Picture(p)) => {
            assert_eq!(p.mime_type, MIME_JPEG);
            assert_eq!(p.description, "Cover");
            assert_eq!(p.data.len(), 100);
        }
        other => panic!("expected a picture frame, got {:?}", other),
    }

    let mut c = MemoryContainer::new(ContainerFormat::Mp4, temp_dir.path().join("track.m4a"));
    tag_container(&mut c, Some(cover.as_path()), &track, &[], None, &config).unwrap();
    assert!(matches!(c.frame("picture"), Some(RawFrame::Picture(p)) if p.data.len() == 100));

    // The blob is not a decodable image: dimensions stay at zero but the cover is still embedded.
    for format in [ContainerFormat::Opus, ContainerFormat::Vorbis] {
        let mut c = MemoryContainer::new(format, temp_dir.path().join(format!("track.{}", format)));
        tag_container(&mut c, Some(cover.as_path()), &track, &[], None, &config).unwrap();
        let picture = decoded_vorbis_picture(&c);
        assert_eq!(picture.mime_type, MIME_JPEG);
        assert_eq!((picture.width, picture.height, picture.depth), (0, 0, 24));
        assert_eq!(picture.data.len(), 100);
    }
}

#[test]
fn test_vorbis_cover_dimensions_are_probed() {
    let temp_dir = testing::init();
    let cover = temp_dir.path().join("cover.png");
    image::RgbImage::new(32, 16).save(&cover).unwrap();

    let mut c = MemoryContainer::new(ContainerFormat::Opus, temp_dir.path().join("track.opus"));
    tag_container(&mut c, Some(cover.as_path()), &testing::full_track(), &[], None, &TaggerConfig::default()).unwrap();
    let picture = decoded_vorbis_picture(&c);
    assert_eq!((picture.width, picture.height), (32, 16));

    let config = TaggerConfig {
        probe_cover_dimensions: false,
        ..Default::default()
    };
    let mut c = MemoryContainer::new(ContainerFormat::Opus, temp_dir.path().join("track.opus"));
    tag_container(&mut c, Some(cover.as_path()), &testing::full_track(), &[], None, &config).unwrap();
    let picture = decoded_vorbis_picture(&c);
    assert_eq!((picture.width, picture.height), (0, 0));
}

#[test]
fn test_unreadable_cover_aborts_before_save() {
    let temp_dir = testing::init();
    let mut c = MemoryContainer::new(ContainerFormat::Flac, temp_dir.path().join("track.flac"));
    let result = tag_container(&mut c, Some(temp_dir.path().join("nope.jpg").as_path()), &testing::full_track(), &[], None, &TaggerConfig::default());
    assert!(matches!(result, Err(TagError::CoverReadFailure { .. })));
    assert_eq!(c.save_count(), 0);
    assert!(!temp_dir.path().join("track_tags.txt").exists());
}

#[test]
fn test_save_failure_writes_sidecar_and_reraises() {
    let temp_dir = testing::init();
    let audio = temp_dir.path().join("track.flac");
    let mut track = TrackInfo::new("Track 1", "Artist", 2024);
    track.tags.copyright = Some("(C) 2024 Label".to_string());
    track.tags.comment = Some("Great track".to_string());

    let mut c = MemoryContainer::new(ContainerFormat::Flac, &audio);
    c.fail_saves_with(SaveError::Failed { reason: "disk full".to_string() });
    let result = tag_container(&mut c, None, &track, &testing::credits(), Some("la\nla"), &TaggerConfig::default());

    match result {
        Err(TagError::TagSavingFailure { path, reason }) => {
            assert_eq!(path, audio);
            assert_eq!(reason, "disk full");
        }
        other => panic!("expected TagSavingFailure, got {:?}", other),
    }
    let sidecar = fs::read_to_string(temp_dir.path().join("track_tags.txt")).unwrap();
    assert!(sidecar.contains("copyright: (C) 2024 Label\n"));
    assert!(sidecar.contains("comment: Great track"));
    assert!(sidecar.contains("credits:\n    Composer: Composer A, Composer B"));
    assert!(sidecar.ends_with("lyrics:\n    la\n    la"));
}

#[test]
fn test_save_failure_without_sidecar() {
    let temp_dir = testing::init();
    let config = TaggerConfig {
        write_sidecar: false,
        ..Default::default()
    };
    let mut c = MemoryContainer::new(ContainerFormat::Mp3, temp_dir.path().join("track.mp3"));
    c.fail_saves_with(SaveError::Failed { reason: "locked".to_string() });
    let result = tag_container(&mut c, None, &testing::full_track(), &[], None, &config);
    assert!(matches!(result, Err(TagError::TagSavingFailure { .. })));
    assert!(!temp_dir.path().join("track_tags.txt").exists());
}

#[test]
fn test_non_fatal_save_quirk_is_ignored() {
    let temp_dir = testing::init();
    let mut c = MemoryContainer::new(ContainerFormat::Mp3, temp_dir.path().join("track.mp3"));
    c.fail_saves_with(SaveError::NonFatal {
        quirk: SaveQuirk::Id3v1Trailer,
        reason: "read-only tail".to_string(),
    });
    tag_container(&mut c, None, &testing::full_track(), &[], None, &TaggerConfig::default()).unwrap();
    assert!(c.saved_block().is_some());
    assert!(!temp_dir.path().join("track_tags.txt").exists());
}

#[test]
fn test_tagging_twice_is_idempotent() {
    let temp_dir = testing::init();
    let cover = testing::write_blob(temp_dir.path(), "cover.jpg", 100);
    let track = testing::full_track();
    let credits = testing::credits();

    for format in ContainerFormat::ALL {
        let mut c = MemoryContainer::new(format, temp_dir.path().join(format!("track.{}", format)));
        tag_container(&mut c, Some(cover.as_path()), &track, &credits, Some("la"), &TaggerConfig::default()).unwrap();
        let first = c.saved_block().unwrap().to_string();
        tag_container(&mut c, Some(cover.as_path()), &track, &credits, Some("la"), &TaggerConfig::default()).unwrap();
        assert_eq!(c.saved_block().unwrap(), first, "{}", format);
    }
}

#[test]
fn test_unsupported_format_touches_nothing() {
    let temp_dir = testing::init();
    let audio = testing::write_blob(temp_dir.path(), "track.wav", 256);

    let result = TagJob::for_path(&audio, testing::full_track());
    assert!(matches!(result, Err(TagError::UnsupportedContainerFormat { .. })));
    assert_eq!(fs::read(&audio).unwrap(), vec![0u8; 256]);
    assert!(!temp_dir.path().join("track_tags.txt").exists());
}

#[test]
fn test_unparsable_file_fails_before_mutation() {
    let temp_dir = testing::init();
    let audio = testing::write_blob(temp_dir.path(), "track.flac", 256);
    let job = TagJob::for_path(&audio, testing::full_track()).unwrap();
    let result = Tagger::default().tag(&job);
    assert!(matches!(result, Err(TagError::Container(ContainerError::Open { .. }))));
    assert_eq!(fs::read(&audio).unwrap(), vec![0u8; 256]);
    assert!(!temp_dir.path().join("track_tags.txt").exists());
}

#[test]
fn test_tag_batch() {
    let temp_dir = testing::init();
    let ok1 = testing::write_mp3(temp_dir.path(), "one.mp3", 512);
    let bad = testing::write_blob(temp_dir.path(), "two.flac", 512);
    let ok2 = testing::write_mp3(temp_dir.path(), "three.mp3", 512);

    let jobs = vec![
        TagJob::new(&ok1, testing::full_track(), ContainerFormat::Mp3).with_credits(testing::credits()),
        TagJob::new(&bad, testing::full_track(), ContainerFormat::Flac),
        TagJob::new(&ok2, testing::full_track(), ContainerFormat::Mp3).with_lyrics("la"),
    ];
    let tagger = Tagger::new(TaggerConfig {
        max_proc: 2,
        ..Default::default()
    });
    let results = tagger.tag_batch(&jobs).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(TagError::Container(_))));
    assert!(results[2].is_ok());

    for p in [&ok1, &ok2] {
        let tag = id3::Tag::read_from_path(p).unwrap();
        assert_eq!(id3::TagLike::title(&tag), Some("Track 1"));
    }
}

#[test]
fn test_tag_batch_rejects_duplicate_paths() {
    let temp_dir = testing::init();
    let audio = testing::write_mp3(temp_dir.path(), "one.mp3", 512);
    let before = fs::read(&audio).unwrap();
    let jobs = vec![
        TagJob::new(&audio, testing::full_track(), ContainerFormat::Mp3),
        TagJob::new(&audio, testing::full_track(), ContainerFormat::Mp3),
    ];
    let result = Tagger::default().tag_batch(&jobs);
    assert!(matches!(result, Err(TagError::DuplicatePath { .. })));
    assert_eq!(fs::read(&audio).unwrap(), before);
}
