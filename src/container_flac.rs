/// FLAC backend. Vorbis comment fields are free-form, so every well-formed key is accepted without
/// registration; cover art goes into a native PICTURE metadata block.
use crate::common::ContainerFormat;
use crate::container::{register_vorbis_alias, vorbis_field, ContainerError, KeyBinding, KeyRegistry, PictureBlock, RawFrame, SaveError, SaveOptions, TagContainer, TagValue};
use crate::container_ogg::{comment_values, remove_comment, replace_comment};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::flac::FlacFile;
use lofty::ogg::{OggPictureStorage, VorbisComments};
use lofty::picture::{MimeType, Picture, PictureInformation, PictureType};
use lofty::prelude::AudioFile;
use std::fs::File;
use std::path::{Path, PathBuf};

const FORMAT: ContainerFormat = ContainerFormat::Flac;

pub struct FlacContainer {
    path: PathBuf,
    file: FlacFile,
    comments: VorbisComments,
    aliases: KeyRegistry,
}

impl FlacContainer {
    pub fn open(p: &Path) -> Result<FlacContainer, ContainerError> {
        let open_err = |message: String| ContainerError::Open { format: FORMAT, message };

        let mut f = File::open(p).map_err(|e| open_err(format!("{}: {}", p.display(), e)))?;
        let mut file = FlacFile::read_from(&mut f, ParseOptions::new().read_properties(false)).map_err(|e| open_err(format!("{}: {}", p.display(), e)))?;
        let comments = file.remove_vorbis_comments().unwrap_or_default();
        Ok(FlacContainer {
            path: p.to_path_buf(),
            file,
            comments,
            aliases: KeyRegistry::default(),
        })
    }

    pub fn comments(&self) -> &VorbisComments {
        &self.comments
    }

    pub fn pictures(&self) -> &[(Picture, PictureInformation)] {
        self.file.pictures()
    }

    fn field(&self, key: &str) -> String {
        vorbis_field(&self.aliases, key)
    }
}

fn _flac_picture(picture: PictureBlock) -> (Picture, PictureInformation) {
    let info = PictureInformation {
        width: picture.width,
        height: picture.height,
        color_depth: picture.depth,
        num_colors: 0,
    };
    let description = Some(picture.description).filter(|d| !d.is_empty());
    let picture = Picture::new_unchecked(PictureType::CoverFront, Some(MimeType::from_str(&picture.mime_type)), description, picture.data);
    (picture, info)
}

impl TagContainer for FlacContainer {
    fn format(&self) -> ContainerFormat {
        FORMAT
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
        register_vorbis_alias(FORMAT, &mut self.aliases, key, binding)
    }

    fn get(&self, key: &str) -> Option<TagValue> {
        comment_values(&self.comments, &self.field(key))
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError> {
        let field = self.field(key);
        replace_comment(&mut self.comments, FORMAT, key, &field, value)
    }

    fn remove(&mut self, key: &str) -> bool {
        let field = self.field(key);
        remove_comment(&mut self.comments, &field)
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError> {
        match frame {
            RawFrame::Picture(picture) => {
                let (picture, info) = _flac_picture(picture);
                self.file.remove_picture_type(PictureType::CoverFront);
                self.comments.remove_picture_type(PictureType::CoverFront);
                let end = self.file.pictures().len();
                self.file.set_picture(end, picture, info);
                Ok(())
            }
            other => Err(ContainerError::UnsupportedFrame { format: FORMAT, frame: other.kind() }),
        }
    }

    fn save(&mut self, _options: &SaveOptions) -> Result<(), SaveError> {
        self.file.set_vorbis_comments(self.comments.clone());
        self.file.save_to_path(&self.path, WriteOptions::default()).map_err(|e| SaveError::Failed {
            reason: format!("Failed to write FLAC tags: {}", e),
        })
    }
}
