/// An in-memory tag container with the key semantics of the real backends: ID3 and MP4 only accept
/// builtin or registered keys, Vorbis comment formats accept any well-formed field name, and frames
/// are limited to the kinds each format can hold. Useful for dry runs and for exercising the format
/// adapters without audio fixtures.
use crate::common::ContainerFormat;
use crate::container::{is_valid_vorbis_key, register_vorbis_alias, vorbis_field, ContainerError, KeyBinding, KeyRegistry, RawFrame, SaveError, SaveOptions, TagContainer, TagValue};
use crate::{container_id3, container_mp4};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MemoryContainer {
    format: ContainerFormat,
    path: PathBuf,
    keys: KeyRegistry,
    values: BTreeMap<String, TagValue>,
    frames: Vec<RawFrame>,
    registrations: Vec<(String, KeyBinding)>,
    fail_save: Option<SaveError>,
    saves: usize,
    saved: Option<String>,
}

impl MemoryContainer {
    pub fn new(format: ContainerFormat, path: impl Into<PathBuf>) -> MemoryContainer {
        let keys = match format {
            ContainerFormat::Mp3 => KeyRegistry::with_builtins(container_id3::builtin_keys()),
            ContainerFormat::Mp4 => KeyRegistry::with_builtins(container_mp4::builtin_keys()),
            _ => KeyRegistry::default(),
        };
        MemoryContainer {
            format,
            path: path.into(),
            keys,
            values: BTreeMap::new(),
            frames: Vec::new(),
            registrations: Vec::new(),
            fail_save: None,
            saves: 0,
            saved: None,
        }
    }

    /// Makes every following save return this error.
    pub fn fail_saves_with(&mut self, err: SaveError) {
        self.fail_save = Some(err);
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Registrations in the order they were made.
    pub fn registrations(&self) -> &[(String, KeyBinding)] {
        &self.registrations
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    pub fn frame(&self, kind: &str) -> Option<&RawFrame> {
        self.frames.iter().find(|f| f.kind() == kind)
    }

    /// Underlying identifiers currently holding a value, e.g. `TIT2` or `TITLE`.
    pub fn stored_ids(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// The tag block as of the last successful save.
    pub fn saved_block(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    /// A stable textual rendering of the staged tag block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (id, value) in &self.values {
            out.push_str(&format!("{}={:?}\n", id, value));
        }
        for frame in &self.frames {
            out.push_str(&format!("{:?}\n", frame));
        }
        out
    }

    /// Resolves a logical key to the identifier the value is stored under. Two keys bound to the
    /// same identifier share storage, as they do in the real backends.
    fn storage_id(&self, key: &str) -> Result<String, ContainerError> {
        match self.format {
            ContainerFormat::Flac | ContainerFormat::Opus | ContainerFormat::Vorbis => {
                let field = vorbis_field(&self.keys, key);
                if is_valid_vorbis_key(&field) {
                    Ok(field)
                } else {
                    Err(ContainerError::InvalidKey {
                        format: self.format,
                        key: key.to_string(),
                    })
                }
            }
            ContainerFormat::Mp3 | ContainerFormat::Mp4 => match self.keys.resolve(key) {
                Some(binding) => Ok(binding.to_string()),
                None => Err(ContainerError::UnknownKey {
                    format: self.format,
                    key: key.to_string(),
                }),
            },
        }
    }

    fn normalize(&self, key: &str, id: &str, value: TagValue) -> Result<TagValue, ContainerError> {
        let unsupported = || ContainerError::UnsupportedValue {
            format: self.format,
            key: key.to_string(),
        };
        match (self.format, value) {
            (ContainerFormat::Mp4, value) if id == "trkn" || id == "disk" => {
                let text = value.as_text().ok_or_else(unsupported)?;
                match container_mp4::parse_pair(text).ok_or_else(unsupported)? {
                    (n, Some(t)) if t > 0 => Ok(TagValue::text(format!("{}/{}", n, t))),
                    (n, _) => Ok(TagValue::text(n.to_string())),
                }
            }
            (ContainerFormat::Mp4, value) => Ok(value),
            (_, TagValue::Text(values)) => Ok(TagValue::Text(values)),
            _ => Err(unsupported()),
        }
    }

    fn accepts_frame(&self, frame: &RawFrame) -> bool {
        match self.format {
            ContainerFormat::Mp3 => true,
            ContainerFormat::Flac | ContainerFormat::Mp4 => matches!(frame, RawFrame::Picture(_)),
            ContainerFormat::Opus | ContainerFormat::Vorbis => false,
        }
    }
}

fn _same_slot(a: &RawFrame, b: &RawFrame) -> bool {
    match (a, b) {
        (RawFrame::Comment { description: x, .. }, RawFrame::Comment { description: y, .. }) => x == y,
        _ => a.kind() == b.kind(),
    }
}

impl TagContainer for MemoryContainer {
    fn format(&self) -> ContainerFormat {
        self.format
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
        let accepted = match (self.format, &binding) {
            (ContainerFormat::Mp3, KeyBinding::TextFrame(id)) => id.len() == 4 && id.starts_with('T'),
            (ContainerFormat::Mp3, KeyBinding::UserText(_)) => true,
            (ContainerFormat::Mp4, KeyBinding::Atom(_) | KeyBinding::Freeform { .. }) => true,
            (ContainerFormat::Mp3 | ContainerFormat::Mp4, _) => false,
            _ => {
                register_vorbis_alias(self.format, &mut self.keys, key, binding.clone())?;
                self.registrations.push((key.to_string(), binding));
                return Ok(());
            }
        };
        if !accepted {
            return Err(ContainerError::UnsupportedBinding {
                format: self.format,
                key: key.to_string(),
            });
        }
        self.keys.register(key, binding.clone());
        self.registrations.push((key.to_string(), binding));
        Ok(())
    }

    fn get(&self, key: &str) -> Option<TagValue> {
        let id = self.storage_id(key).ok()?;
        self.values.get(&id).cloned()
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError> {
        let id = self.storage_id(key)?;
        let value = self.normalize(key, &id, value)?;
        self.values.insert(id, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.storage_id(key) {
            Ok(id) => self.values.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError> {
        if !self.accepts_frame(&frame) {
            return Err(ContainerError::UnsupportedFrame {
                format: self.format,
                frame: frame.kind(),
            });
        }
        self.frames.retain(|f| !_same_slot(f, &frame));
        self.frames.push(frame);
        Ok(())
    }

    fn save(&mut self, _options: &SaveOptions) -> Result<(), SaveError> {
        self.saves += 1;
        match &self.fail_save {
            Some(err @ SaveError::Failed { .. }) => Err(err.clone()),
            Some(err @ SaveError::NonFatal { .. }) => {
                self.saved = Some(self.render());
                Err(err.clone())
            }
            None => {
                self.saved = Some(self.render());
                Ok(())
            }
        }
    }
}
