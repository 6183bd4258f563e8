/// Ogg Vorbis and Ogg Opus backend. Both carry plain Vorbis comments; there is no binary picture
/// slot, so covers arrive here already encoded as `METADATA_BLOCK_PICTURE` text.
///
/// lofty lifts `METADATA_BLOCK_PICTURE` fields out of the comment list into the tag's picture store
/// on read and writes them back on save, so that key is served from the picture store.
use crate::common::ContainerFormat;
use crate::container::{is_valid_vorbis_key, register_vorbis_alias, vorbis_field, ContainerError, KeyBinding, KeyRegistry, RawFrame, SaveError, SaveOptions, TagContainer, TagValue};
use crate::cover::METADATA_BLOCK_PICTURE;
use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::ogg::{OggPictureStorage, OpusFile, VorbisComments, VorbisFile};
use lofty::picture::{Picture, PictureType};
use lofty::prelude::{AudioFile, TagExt};
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct OggContainer {
    format: ContainerFormat,
    path: PathBuf,
    comments: VorbisComments,
    aliases: KeyRegistry,
}

impl OggContainer {
    pub fn open(format: ContainerFormat, p: &Path) -> Result<OggContainer, ContainerError> {
        let open_err = |message: String| ContainerError::Open { format, message };

        let mut file = File::open(p).map_err(|e| open_err(format!("{}: {}", p.display(), e)))?;
        let options = ParseOptions::new().read_properties(false);
        let comments = match format {
            ContainerFormat::Opus => OpusFile::read_from(&mut file, options).map(|f| f.vorbis_comments().clone()),
            ContainerFormat::Vorbis => VorbisFile::read_from(&mut file, options).map(|f| f.vorbis_comments().clone()),
            _ => return Err(open_err(format!("{} is not an Ogg format", format))),
        }
        .map_err(|e| open_err(format!("Failed to read {}: {}", p.display(), e)))?;

        Ok(OggContainer {
            format,
            path: p.to_path_buf(),
            comments,
            aliases: KeyRegistry::default(),
        })
    }

    pub fn comments(&self) -> &VorbisComments {
        &self.comments
    }

    fn field(&self, key: &str) -> String {
        vorbis_field(&self.aliases, key)
    }
}

fn _is_picture_field(field: &str) -> bool {
    field.eq_ignore_ascii_case(METADATA_BLOCK_PICTURE)
}

/// Reads every value stored under a field.
pub(crate) fn comment_values(comments: &VorbisComments, field: &str) -> Option<TagValue> {
    let mut values: Vec<String> = comments.get_all(field).map(String::from).collect();
    if _is_picture_field(field) {
        values.extend(comments.pictures().iter().filter_map(|(picture, info)| String::from_utf8(picture.as_flac_bytes(*info, true)).ok()));
    }
    if values.is_empty() {
        None
    } else {
        Some(TagValue::Text(values))
    }
}

/// Replaces every value under a field. Encoded pictures go to the picture store, replacing the
/// front cover.
pub(crate) fn replace_comment(comments: &mut VorbisComments, format: ContainerFormat, key: &str, field: &str, value: TagValue) -> Result<(), ContainerError> {
    if !is_valid_vorbis_key(field) {
        return Err(ContainerError::InvalidKey { format, key: key.to_string() });
    }
    let values = match value {
        TagValue::Text(values) => values,
        _ => return Err(ContainerError::UnsupportedValue { format, key: key.to_string() }),
    };

    if _is_picture_field(field) {
        let mut pictures = Vec::with_capacity(values.len());
        for v in &values {
            let decoded = Picture::from_flac_bytes(v.as_bytes(), true, ParsingMode::BestAttempt).map_err(|_| ContainerError::UnsupportedValue { format, key: key.to_string() })?;
            pictures.push(decoded);
        }
        remove_comment(comments, field);
        for (picture, info) in pictures {
            let end = comments.pictures().len();
            comments.set_picture(end, picture, info);
        }
        return Ok(());
    }

    let _removed: Vec<_> = comments.remove(field).collect();
    for v in values {
        comments.push(field.to_string(), v);
    }
    Ok(())
}

/// Drops a field. Returns whether anything was stored under it.
pub(crate) fn remove_comment(comments: &mut VorbisComments, field: &str) -> bool {
    let removed: Vec<_> = comments.remove(field).collect();
    let mut present = !removed.is_empty();
    if _is_picture_field(field) {
        present |= comments.pictures().iter().any(|(p, _)| p.pic_type() == PictureType::CoverFront);
        comments.remove_picture_type(PictureType::CoverFront);
    }
    present
}

impl TagContainer for OggContainer {
    fn format(&self) -> ContainerFormat {
        self.format
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
        register_vorbis_alias(self.format, &mut self.aliases, key, binding)
    }

    fn get(&self, key: &str) -> Option<TagValue> {
        comment_values(&self.comments, &self.field(key))
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError> {
        let field = self.field(key);
        replace_comment(&mut self.comments, self.format, key, &field, value)
    }

    fn remove(&mut self, key: &str) -> bool {
        let field = self.field(key);
        remove_comment(&mut self.comments, &field)
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError> {
        Err(ContainerError::UnsupportedFrame {
            format: self.format,
            frame: frame.kind(),
        })
    }

    fn save(&mut self, _options: &SaveOptions) -> Result<(), SaveError> {
        self.comments.save_to_path(&self.path, WriteOptions::default()).map_err(|e| SaveError::Failed {
            reason: format!("Failed to write {} tags: {}", self.format, e),
        })
    }
}
