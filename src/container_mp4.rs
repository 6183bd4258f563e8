/// MPEG-4 backend. Logical keys resolve to item list atoms or freeform (`----`) atoms; anything not
/// in the builtin table must be registered first. Track and disc numbers accept `N` or `N/M` text
/// and are stored in their binary `trkn`/`disk` layout.
use crate::common::ContainerFormat;
use crate::container::{ContainerError, KeyBinding, KeyRegistry, RawFrame, SaveError, SaveOptions, TagContainer, TagValue};
use mp4ameta::{Data, DataIdent, Fourcc, Ident, Tag as Mp4Tag};
use std::path::{Path, PathBuf};

const FORMAT: ContainerFormat = ContainerFormat::Mp4;

const TRACK_NUMBER: [u8; 4] = *b"trkn";
const DISC_NUMBER: [u8; 4] = *b"disk";
const ARTWORK: [u8; 4] = *b"covr";

pub(crate) fn builtin_keys() -> Vec<(&'static str, KeyBinding)> {
    vec![
        ("title", KeyBinding::atom("©nam")),
        ("album", KeyBinding::atom("©alb")),
        ("artist", KeyBinding::atom("©ART")),
        ("albumartist", KeyBinding::atom("aART")),
        ("date", KeyBinding::atom("©day")),
        ("genre", KeyBinding::atom("©gen")),
        ("copyright", KeyBinding::atom("cprt")),
        ("tracknumber", KeyBinding::Atom(TRACK_NUMBER)),
        ("discnumber", KeyBinding::Atom(DISC_NUMBER)),
    ]
}

pub struct Mp4Container {
    path: PathBuf,
    tag: Mp4Tag,
    keys: KeyRegistry,
}

impl Mp4Container {
    pub fn open(p: &Path) -> Result<Mp4Container, ContainerError> {
        let tag = Mp4Tag::read_from_path(p).map_err(|e| ContainerError::Open {
            format: FORMAT,
            message: format!("{}: {}", p.display(), e),
        })?;
        Ok(Mp4Container {
            path: p.to_path_buf(),
            tag,
            keys: KeyRegistry::with_builtins(builtin_keys()),
        })
    }

    pub fn tag(&self) -> &Mp4Tag {
        &self.tag
    }

    fn ident(&self, key: &str) -> Result<DataIdent, ContainerError> {
        match self.keys.resolve(key) {
            Some(binding) => data_ident(binding).ok_or_else(|| ContainerError::UnsupportedBinding {
                format: FORMAT,
                key: key.to_string(),
            }),
            None => Err(ContainerError::UnknownKey {
                format: FORMAT,
                key: key.to_string(),
            }),
        }
    }

    fn set_pair(&mut self, ident: [u8; 4], key: &str, text: &str) -> Result<(), ContainerError> {
        let (number, total) = parse_pair(text).ok_or_else(|| ContainerError::UnsupportedValue {
            format: FORMAT,
            key: key.to_string(),
        })?;
        match (ident, total) {
            (TRACK_NUMBER, Some(total)) => self.tag.set_track(number, total),
            (TRACK_NUMBER, None) => {
                self.tag.remove_track();
                self.tag.set_track_number(number);
            }
            (_, Some(total)) => self.tag.set_disc(number, total),
            (_, None) => {
                self.tag.remove_disc();
                self.tag.set_disc_number(number);
            }
        }
        Ok(())
    }
}

fn data_ident(binding: &KeyBinding) -> Option<DataIdent> {
    match binding {
        KeyBinding::Atom(bytes) => Some(DataIdent::Fourcc(Fourcc(*bytes))),
        KeyBinding::Freeform { mean, name } => Some(DataIdent::freeform(mean.clone(), name.clone())),
        _ => None,
    }
}

/// Parses `N` or `N/M`.
pub(crate) fn parse_pair(text: &str) -> Option<(u16, Option<u16>)> {
    match text.split_once('/') {
        Some((n, t)) => Some((n.trim().parse().ok()?, Some(t.trim().parse().ok()?))),
        None => Some((text.trim().parse().ok()?, None)),
    }
}

fn _format_pair(pair: (Option<u16>, Option<u16>)) -> Option<String> {
    match pair {
        (Some(n), Some(t)) if t > 0 => Some(format!("{}/{}", n, t)),
        (Some(n), _) => Some(n.to_string()),
        _ => None,
    }
}

impl TagContainer for Mp4Container {
    fn format(&self) -> ContainerFormat {
        FORMAT
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
        if data_ident(&binding).is_none() {
            return Err(ContainerError::UnsupportedBinding {
                format: FORMAT,
                key: key.to_string(),
            });
        }
        tracing::trace!("Registering MP4 key {} as {}", key, binding);
        self.keys.register(key, binding);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<TagValue> {
        let ident = self.ident(key).ok()?;
        match Ident::fourcc(&ident).map(|f| f.0) {
            Some(TRACK_NUMBER) => return _format_pair(self.tag.track()).map(TagValue::text),
            Some(DISC_NUMBER) => return _format_pair(self.tag.disc()).map(TagValue::text),
            _ => {}
        }

        let mut texts = Vec::new();
        for data in self.tag.data_of(&ident) {
            match data {
                Data::Utf8(s) | Data::Utf16(s) => texts.push(s.clone()),
                Data::Reserved(bytes) => return Some(TagValue::Bytes(bytes.clone())),
                Data::BeSigned(bytes) if bytes.len() == 1 => return Some(TagValue::Flag(bytes[0])),
                _ => {}
            }
        }
        if texts.is_empty() {
            None
        } else {
            Some(TagValue::Text(texts))
        }
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError> {
        let ident = self.ident(key)?;
        if let Some(pair_ident @ (TRACK_NUMBER | DISC_NUMBER)) = Ident::fourcc(&ident).map(|f| f.0) {
            let text = value.as_text().map(String::from).ok_or_else(|| ContainerError::UnsupportedValue {
                format: FORMAT,
                key: key.to_string(),
            })?;
            return self.set_pair(pair_ident, key, &text);
        }

        match value {
            TagValue::Text(values) => self.tag.set_all_data(ident, values.into_iter().map(Data::Utf8)),
            TagValue::Bytes(bytes) => self.tag.set_data(ident, Data::Reserved(bytes)),
            TagValue::Flag(b) => self.tag.set_data(ident, Data::BeSigned(vec![b])),
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        let Ok(ident) = self.ident(key) else {
            return false;
        };
        let present = self.tag.data_of(&ident).next().is_some();
        self.tag.remove_data_of(&ident);
        present
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError> {
        match frame {
            RawFrame::Picture(picture) => {
                self.tag.set_data(Fourcc(ARTWORK), Data::Jpeg(picture.data));
                Ok(())
            }
            other => Err(ContainerError::UnsupportedFrame { format: FORMAT, frame: other.kind() }),
        }
    }

    fn save(&mut self, _options: &SaveOptions) -> Result<(), SaveError> {
        self.tag.write_to_path(&self.path).map_err(|e| SaveError::Failed {
            reason: format!("Failed to write MP4 tags: {}", e),
        })
    }
}
