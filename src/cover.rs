/// The cover module loads front cover images and encodes them into the picture representation each
/// container expects. Covers are always treated as JPEG.
use crate::container::{PictureBlock, MIME_JPEG};
use crate::error::{Result, TagError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageReader;
use metaflac::block::{Picture, PictureType};
use std::fs;
use std::path::{Path, PathBuf};

/// Vorbis comment field holding a base64 encoded FLAC picture block.
pub const METADATA_BLOCK_PICTURE: &str = "METADATA_BLOCK_PICTURE";

pub const COVER_DEPTH: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

/// Reads the cover into memory. Returns None, with a warning, when it is too large to embed.
pub fn load_cover(p: &Path, max_bytes: u64) -> Result<Option<CoverArt>> {
    let data = fs::read(p).map_err(|e| TagError::CoverReadFailure {
        path: p.to_path_buf(),
        source: e,
    })?;
    if data.len() as u64 >= max_bytes {
        tracing::warn!(
            "Cover file {} is too large ({:.2}MB), only {:.2}MB are allowed: the track will not have a cover embedded",
            p.display(),
            data.len() as f64 / (1024.0 * 1024.0),
            max_bytes as f64 / (1024.0 * 1024.0),
        );
        return Ok(None);
    }
    tracing::debug!("Loaded {} byte cover from {}", data.len(), p.display());
    Ok(Some(CoverArt {
        path: p.to_path_buf(),
        data,
    }))
}

/// Returns the image width and height, or None when the file cannot be decoded.
pub fn probe_dimensions(p: &Path) -> Option<(u32, u32)> {
    let probed = ImageReader::open(p).and_then(|r| r.with_guessed_format()).map_err(image::ImageError::IoError).and_then(|r| r.into_dimensions());
    match probed {
        Ok(dims) => Some(dims),
        Err(e) => {
            tracing::warn!("Could not read image dimensions for cover {}: {}", p.display(), e);
            None
        }
    }
}

pub fn picture_block(cover: &CoverArt, description: &str) -> PictureBlock {
    PictureBlock {
        mime_type: MIME_JPEG.to_string(),
        description: description.to_string(),
        data: cover.data.clone(),
        ..Default::default()
    }
}

/// Serializes the picture as a FLAC PICTURE block body and base64 encodes it.
pub fn encode_vorbis_picture(picture: PictureBlock) -> String {
    let mut p = Picture::new();
    p.picture_type = PictureType::CoverFront;
    p.mime_type = picture.mime_type;
    p.description = picture.description;
    p.width = picture.width;
    p.height = picture.height;
    p.depth = picture.depth;
    p.data = picture.data;
    STANDARD.encode(p.to_bytes())
}
