/// The container module defines the contract every tag container backend fulfils: a staged,
/// in-memory key/value view over one file's tag block, explicit registration of keys the backend
/// does not know by default, raw frame injection for values the key/value view cannot express,
/// and an explicit save result.
///
/// Nothing reaches the disk until [`TagContainer::save`] is called.
use crate::common::ContainerFormat;
use crate::container_flac::FlacContainer;
use crate::container_id3::Id3Container;
use crate::container_mp4::Mp4Container;
use crate::container_ogg::OggContainer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const MIME_JPEG: &str = "image/jpeg";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Failed to open {format} container: {message}")]
    Open { format: ContainerFormat, message: String },
    #[error("Key {key} is not known to the {format} container and was never registered")]
    UnknownKey { format: ContainerFormat, key: String },
    #[error("Key {key} cannot be stored in a {format} container")]
    InvalidKey { format: ContainerFormat, key: String },
    #[error("Key {key} in a {format} container cannot hold this kind of value")]
    UnsupportedValue { format: ContainerFormat, key: String },
    #[error("Binding for {key} does not apply to a {format} container")]
    UnsupportedBinding { format: ContainerFormat, key: String },
    #[error("The {format} container does not accept {frame} frames")]
    UnsupportedFrame { format: ContainerFormat, frame: &'static str },
}

/// A value staged under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// One or more text values. Backends with single-valued text slots keep them as one entry each
    /// where the format allows it.
    Text(Vec<String>),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// A single big-endian integer byte.
    Flag(u8),
}

impl TagValue {
    pub fn text(s: impl Into<String>) -> TagValue {
        TagValue::Text(vec![s.into()])
    }

    /// Returns the first text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(xs) => xs.first().map(String::as_str),
            _ => None,
        }
    }
}

/// The underlying identifier a logical key is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyBinding {
    /// An ID3v2 text frame such as `TSSE`.
    TextFrame(String),
    /// An ID3v2 user-defined text frame (`TXXX`) with this description.
    UserText(String),
    /// An MPEG-4 item list atom such as `©pub`.
    Atom([u8; 4]),
    /// An MPEG-4 freeform (`----`) atom.
    Freeform { mean: String, name: String },
    /// A Vorbis comment field name.
    Field(String),
}

pub const ITUNES_MEAN: &str = "com.apple.iTunes";

impl KeyBinding {
    pub fn text_frame(id: &str) -> KeyBinding {
        KeyBinding::TextFrame(id.to_string())
    }

    pub fn user_text(description: &str) -> KeyBinding {
        KeyBinding::UserText(description.to_string())
    }

    /// Builds an atom binding from its printable name. `©` maps to the 0xA9 byte used in atom
    /// identifiers.
    pub fn atom(name: &str) -> KeyBinding {
        let mut bytes = [b' '; 4];
        for (slot, c) in bytes.iter_mut().zip(name.chars()) {
            *slot = if c == '©' { 0xA9 } else { c as u8 };
        }
        KeyBinding::Atom(bytes)
    }

    pub fn itunes(name: &str) -> KeyBinding {
        KeyBinding::Freeform {
            mean: ITUNES_MEAN.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyBinding::TextFrame(id) => write!(f, "{}", id),
            KeyBinding::UserText(desc) => write!(f, "TXXX:{}", desc),
            KeyBinding::Atom(bytes) => {
                let s: String = bytes.iter().map(|b| if *b == 0xA9 { '©' } else { *b as char }).collect();
                write!(f, "{}", s)
            }
            KeyBinding::Freeform { mean, name } => write!(f, "----:{}:{}", mean, name),
            KeyBinding::Field(name) => write!(f, "{}", name),
        }
    }
}

/// Logical key to binding table. Keys are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    bindings: HashMap<String, KeyBinding>,
}

impl KeyRegistry {
    pub fn with_builtins(builtins: Vec<(&str, KeyBinding)>) -> KeyRegistry {
        let mut registry = KeyRegistry::default();
        for (key, binding) in builtins {
            registry.register(key, binding);
        }
        registry
    }

    pub fn register(&mut self, key: &str, binding: KeyBinding) {
        self.bindings.insert(key.to_lowercase(), binding);
    }

    pub fn resolve(&self, key: &str) -> Option<&KeyBinding> {
        self.bindings.get(&key.to_lowercase())
    }
}

/// A front cover picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PictureBlock {
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub data: Vec<u8>,
}

/// Frames that sit outside the simple key/value view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Picture(PictureBlock),
    /// Day and month as `DDMM` (ID3v2.3 `TDAT`).
    LegacyDate { ddmm: String },
    Publisher(String),
    Comment { language: String, description: String, text: String },
    Lyrics { language: String, description: String, text: String },
}

impl RawFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            RawFrame::Picture(_) => "picture",
            RawFrame::LegacyDate { .. } => "legacy date",
            RawFrame::Publisher(_) => "publisher",
            RawFrame::Comment { .. } => "comment",
            RawFrame::Lyrics { .. } => "lyrics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Id3Version {
    #[serde(rename = "2.3")]
    V23,
    #[serde(rename = "2.4")]
    V24,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub id3_version: Id3Version,
    /// Also write an ID3v1 trailer.
    pub id3_write_v1: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            id3_version: Id3Version::V23,
            id3_write_v1: true,
        }
    }
}

/// Known ways a save can report trouble while the tag block itself was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveQuirk {
    /// The ID3v2 block was written but refreshing the ID3v1 trailer failed.
    Id3v1Trailer,
}

impl fmt::Display for SaveQuirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveQuirk::Id3v1Trailer => write!(f, "ID3v1 trailer not refreshed"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The tag block could not be committed.
    #[error("{reason}")]
    Failed { reason: String },
    /// The tag block was committed; the named quirk is safe to ignore.
    #[error("{quirk}: {reason}")]
    NonFatal { quirk: SaveQuirk, reason: String },
}

pub trait TagContainer {
    fn format(&self) -> ContainerFormat;

    fn path(&self) -> &Path;

    /// Binds a logical key to an underlying identifier. Later `get`/`set`/`remove` calls with that
    /// key address the bound identifier. Registering an existing key replaces the binding.
    fn register_key(&mut self, key: &str, binding: KeyBinding) -> Result<(), ContainerError>;

    fn get(&self, key: &str) -> Option<TagValue>;

    /// Replaces every value stored under the key.
    fn set(&mut self, key: &str, value: TagValue) -> Result<(), ContainerError>;

    /// Removes the key, returning whether anything was stored under it. Unknown keys are not an
    /// error.
    fn remove(&mut self, key: &str) -> bool;

    /// Stages a frame, replacing any earlier frame of the same kind (and, for comments and lyrics,
    /// the same description).
    fn inject_frame(&mut self, frame: RawFrame) -> Result<(), ContainerError>;

    fn save(&mut self, options: &SaveOptions) -> Result<(), SaveError>;
}

/// Opens a backend for the file. Fails before any mutation when the file cannot be parsed.
pub fn open_container(format: ContainerFormat, path: &Path) -> Result<Box<dyn TagContainer>, ContainerError> {
    tracing::debug!("Opening {} container for {}", format, path.display());
    let container: Box<dyn TagContainer> = match format {
        ContainerFormat::Flac => Box::new(FlacContainer::open(path)?),
        ContainerFormat::Opus | ContainerFormat::Vorbis => Box::new(OggContainer::open(format, path)?),
        ContainerFormat::Mp3 => Box::new(Id3Container::open(path)?),
        ContainerFormat::Mp4 => Box::new(Mp4Container::open(path)?),
    };
    Ok(container)
}

/// Returns whether the name is a legal Vorbis comment field name: printable ASCII without `=`.
pub fn is_valid_vorbis_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| (0x20..=0x7D).contains(&b) && b != b'=')
}

/// Resolves a logical key to the upper-cased Vorbis comment field it is stored under.
pub fn vorbis_field(aliases: &KeyRegistry, key: &str) -> String {
    match aliases.resolve(key) {
        Some(KeyBinding::Field(name)) => name.to_uppercase(),
        _ => key.to_uppercase(),
    }
}

/// Only `Field` bindings make sense for Vorbis comments.
pub fn register_vorbis_alias(format: ContainerFormat, aliases: &mut KeyRegistry, key: &str, binding: KeyBinding) -> Result<(), ContainerError> {
    match binding {
        KeyBinding::Field(ref name) if is_valid_vorbis_key(name) => {
            aliases.register(key, binding);
            Ok(())
        }
        _ => Err(ContainerError::UnsupportedBinding { format, key: key.to_string() }),
    }
}
