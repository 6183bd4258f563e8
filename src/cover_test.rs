use crate::container::MIME_JPEG;
use crate::cover::*;
use crate::error::TagError;
use crate::testing;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use metaflac::block::{Picture, PictureType};

#[test]
fn test_load_cover() {
    let temp_dir = testing::init();
    let path = testing::write_blob(temp_dir.path(), "cover.jpg", 1000);
    let cover = load_cover(&path, 1001).unwrap().unwrap();
    assert_eq!(cover.data.len(), 1000);
    assert_eq!(cover.path, path);
}

#[test]
fn test_load_cover_at_limit_is_skipped() {
    let temp_dir = testing::init();
    let path = testing::write_blob(temp_dir.path(), "cover.jpg", 1000);
    assert_eq!(load_cover(&path, 1000).unwrap(), None);
}

#[test]
fn test_load_cover_missing_file() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("missing.jpg");
    match load_cover(&path, 1000) {
        Err(TagError::CoverReadFailure { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected CoverReadFailure, got {:?}", other),
    }
}

#[test]
fn test_probe_dimensions() {
    let temp_dir = testing::init();
    let path = temp_dir.path().join("cover.png");
    image::RgbImage::new(7, 5).save(&path).unwrap();
    assert_eq!(probe_dimensions(&path), Some((7, 5)));

    let garbage = testing::write_blob(temp_dir.path(), "garbage.jpg", 64);
    assert_eq!(probe_dimensions(&garbage), None);
}

#[test]
fn test_encode_vorbis_picture() {
    let cover = CoverArt {
        path: "cover.jpg".into(),
        data: vec![1, 2, 3, 4],
    };
    let mut block = picture_block(&cover, "");
    block.width = 600;
    block.height = 400;
    block.depth = COVER_DEPTH;

    let encoded = encode_vorbis_picture(block);
    let decoded = Picture::from_bytes(&STANDARD.decode(encoded).unwrap()).unwrap();
    assert_eq!(decoded.picture_type, PictureType::CoverFront);
    assert_eq!(decoded.mime_type, MIME_JPEG);
    assert_eq!(decoded.width, 600);
    assert_eq!(decoded.height, 400);
    assert_eq!(decoded.depth, 24);
    assert_eq!(decoded.data, vec![1, 2, 3, 4]);
}
