/// ID3 backend for MPEG audio files. Logical keys resolve to text frames or `TXXX` frames; comments,
/// lyrics, cover art, the publisher and the legacy day/month date are written as raw frames.
use crate::common::ContainerFormat;
use crate::container::{ContainerError, Id3Version, KeyBinding, KeyRegistry, RawFrame, SaveError, SaveOptions, SaveQuirk, TagContainer, TagValue};
use id3::frame::{Comment, ExtendedText, Lyrics, Picture, PictureType};
use id3::{Tag as Id3Tag, TagLike, Version};
use lofty::config::WriteOptions;
use lofty::id3::v1::{Id3v1Tag, GENRES};
use lofty::prelude::TagExt;
use std::path::{Path, PathBuf};

const FORMAT: ContainerFormat = ContainerFormat::Mp3;

/// Multiple values share one frame, null separated. The id3 crate rewrites the separator for v2.3.
const VALUE_SEPARATOR: &str = "\0";

pub(crate) fn builtin_keys() -> Vec<(&'static str, KeyBinding)> {
    vec![
        ("title", KeyBinding::text_frame("TIT2")),
        ("album", KeyBinding::text_frame("TALB")),
        ("artist", KeyBinding::text_frame("TPE1")),
        ("albumartist", KeyBinding::text_frame("TPE2")),
        ("tracknumber", KeyBinding::text_frame("TRCK")),
        ("discnumber", KeyBinding::text_frame("TPOS")),
        ("date", KeyBinding::text_frame("TYER")),
        ("copyright", KeyBinding::text_frame("TCOP")),
        ("genre", KeyBinding::text_frame("TCON")),
        ("isrc", KeyBinding::text_frame("TSRC")),
        ("replaygain_track_gain", KeyBinding::user_text("REPLAYGAIN_TRACK_GAIN")),
        ("replaygain_track_peak", KeyBinding::user_text("REPLAYGAIN_TRACK_PEAK")),
    ]
}

pub struct Id3Container {
    path: PathBuf,
    tag: Id3Tag,
    keys: KeyRegistry,
}

impl Id3Container {
    /// Reads the existing tag, or starts an empty one when the file carries none.
    pub fn open(p: &Path) -> Result<Id3Container, ContainerError> {
        let tag = match Id3Tag::read_from_path(p) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => {
                tracing::debug!("No ID3 tag in {}, starting an empty one", p.display());
                Id3Tag::new()
            }
            Err(e) => {
                return Err(ContainerError::Open {
                    format: FORMAT,
                    message: format!("{}: {}", p.display(), e),
                })
            }
        };
        Ok(Id3Container {
            path: p.to_path_buf(),
            tag,
            keys: KeyRegistry::with_builtins(builtin_keys()),
        })
    }

    pub fn tag(&self) -> &Id3Tag {
        &self.tag
    }

    fn binding(&self, key: &str) -> Result<KeyBinding, ContainerError> {
        self.keys.resolve(key).cloned().ok_or_else(|| ContainerError::UnknownKey {
            format: FORMAT,
            key: key.to_string(),
        })
    }
}

impl TagContainer for Id3Container {
    fn format(&self) -> ContainerFormat {
        FORMAT
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
        match binding {
            KeyBinding::TextFrame(ref id) if id.len() == 4 && id.starts_with('T') => {}
            KeyBinding::UserText(_) => {}
            _ => {
                return Err(ContainerError::UnsupportedBinding {
                    format: FORMAT,
                    key: key.to_string(),
                })
            }
        }
        tracing::trace!("Registering ID3 key {} as {}", key, binding);
        self.keys.register(key, binding);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<TagValue> {
        match self.keys.resolve(key)? {
            KeyBinding::TextFrame(id) => self.tag.get(id.as_str()).and_then(|f| f.content().text()).map(_split_values),
            KeyBinding::UserText(desc) => self.tag.extended_texts().find(|e| e.description == *desc).map(|e| _split_values(&e.value)),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError> {
        let text = match value {
            TagValue::Text(values) => values.join(VALUE_SEPARATOR),
            _ => {
                return Err(ContainerError::UnsupportedValue {
                    format: FORMAT,
                    key: key.to_string(),
                })
            }
        };
        match self.binding(key)? {
            KeyBinding::TextFrame(id) => self.tag.set_text(id, text),
            KeyBinding::UserText(desc) => {
                self.tag.remove_extended_text(Some(desc.as_str()), None);
                self.tag.add_frame(ExtendedText { description: desc, value: text });
            }
            _ => {
                return Err(ContainerError::UnsupportedBinding {
                    format: FORMAT,
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.keys.resolve(key).cloned() {
            Some(KeyBinding::TextFrame(id)) => !self.tag.remove(id).is_empty(),
            Some(KeyBinding::UserText(desc)) => {
                let present = self.tag.extended_texts().any(|e| e.description == desc);
                self.tag.remove_extended_text(Some(desc.as_str()), None);
                present
            }
            _ => false,
        }
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError> {
        match frame {
            RawFrame::LegacyDate { ddmm } => self.tag.set_text("TDAT", ddmm),
            RawFrame::Publisher(publisher) => self.tag.set_text("TPUB", publisher),
            RawFrame::Comment { language, description, text } => {
                self.tag.remove_comment(Some(description.as_str()), None);
                self.tag.add_frame(Comment {
                    lang: language,
                    description,
                    text,
                });
            }
            RawFrame::Lyrics { language, description, text } => {
                self.tag.remove("USLT");
                self.tag.add_frame(Lyrics {
                    lang: language,
                    description,
                    text,
                });
            }
            RawFrame::Picture(picture) => {
                self.tag.remove_picture_by_type(PictureType::CoverFront);
                self.tag.add_frame(Picture {
                    mime_type: picture.mime_type,
                    picture_type: PictureType::CoverFront,
                    description: picture.description,
                    data: picture.data,
                });
            }
        }
        Ok(())
    }

    fn save(&mut self, options: &SaveOptions) -> Result<(), SaveError> {
        let version = match options.id3_version {
            Id3Version::V23 => Version::Id3v23,
            Id3Version::V24 => Version::Id3v24,
        };
        self.tag.write_to_path(&self.path, version).map_err(|e| SaveError::Failed {
            reason: format!("Failed to write ID3 tags: {}", e),
        })?;

        if options.id3_write_v1 {
            write_id3v1_trailer(&self.path, &self.tag).map_err(|e| SaveError::NonFatal {
                quirk: SaveQuirk::Id3v1Trailer,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn _split_values(text: &str) -> TagValue {
    TagValue::Text(text.trim_end_matches('\0').split('\0').map(String::from).collect())
}

/// Derives the ID3v1.1 tag from the v2 tag. Fields are cut to their slot size on a character boundary.
pub fn id3v1_tag(tag: &Id3Tag) -> Id3v1Tag {
    let mut v1 = Id3v1Tag::new();
    v1.title = tag.title().map(|s| _fit(s, 30));
    v1.artist = tag.artist().map(|s| _fit(s, 30));
    v1.album = tag.album().map(|s| _fit(s, 30));
    v1.year = tag.get("TYER").and_then(|f| f.content().text()).map(|s| _fit(s, 4));
    v1.comment = tag.comments().find(|c| c.description.is_empty()).map(|c| _fit(&c.text, 28));
    v1.track_number = tag.track().and_then(|n| u8::try_from(n).ok()).filter(|n| *n > 0);
    v1.genre = tag.get("TCON").and_then(|f| f.content().text()).and_then(id3v1_genre);
    v1
}

/// Index of the first listed genre in the ID3v1 genre table.
pub fn id3v1_genre(genres: &str) -> Option<u8> {
    let first = genres.split(['\0', ',']).map(str::trim).find(|g| !g.is_empty())?;
    GENRES.iter().position(|g| g.eq_ignore_ascii_case(first)).and_then(|i| u8::try_from(i).ok())
}

fn _fit(s: &str, max_bytes: usize) -> String {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if i + c.len_utf8() > max_bytes {
            break;
        }
        end = i + c.len_utf8();
    }
    s[..end].to_string()
}

fn write_id3v1_trailer(p: &Path, tag: &Id3Tag) -> lofty::error::Result<()> {
    id3v1_tag(tag).save_to_path(p, WriteOptions::default())
}
