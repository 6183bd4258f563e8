/// The common module holds the canonical, format-agnostic track metadata that every format adapter
/// consumes, along with the multi-value serializer and the logging bootstrap.
use crate::error::{Result, TagError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Separator used whenever a list has to be flattened into a single text value.
pub const SEPARATOR: &str = ", ";

/// A field that callers may supply either as one string or as an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    Single(String),
    Many(Vec<String>),
}

impl MultiValue {
    /// Flattens the value into one string. Lists are joined with [`SEPARATOR`] in order; nothing is
    /// trimmed, deduplicated or reordered.
    pub fn joined(&self) -> String {
        match self {
            MultiValue::Single(s) => s.clone(),
            MultiValue::Many(xs) => xs.join(SEPARATOR),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MultiValue::Single(s) => s.is_empty(),
            MultiValue::Many(xs) => xs.is_empty(),
        }
    }
}

impl From<&str> for MultiValue {
    fn from(s: &str) -> Self {
        MultiValue::Single(s.to_string())
    }
}

impl From<String> for MultiValue {
    fn from(s: String) -> Self {
        MultiValue::Single(s)
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(xs: Vec<String>) -> Self {
        MultiValue::Many(xs)
    }
}

impl From<Vec<&str>> for MultiValue {
    fn from(xs: Vec<&str>) -> Self {
        MultiValue::Many(xs.into_iter().map(String::from).collect())
    }
}

/// Returns the joined value of an optional multi-value field, or None when it is absent or empty.
pub fn join_optional(value: Option<&MultiValue>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(MultiValue::joined)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Explicit {
    Explicit,
    Clean,
}

impl Explicit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Explicit::Explicit => "Explicit",
            Explicit::Clean => "Clean",
        }
    }

    /// iTunes `rtng` byte.
    pub fn rating_byte(&self) -> u8 {
        match self {
            Explicit::Explicit => 0x01,
            Explicit::Clean => 0x02,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagDetail {
    pub album_artist: Option<MultiValue>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub disc_number: Option<u32>,
    pub total_discs: Option<u32>,
    pub release_date: Option<String>,
    pub copyright: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub isrc: Option<String>,
    pub upc: Option<String>,
    pub genres: Option<MultiValue>,
    pub replay_gain: Option<f64>,
    pub replay_peak: Option<f64>,
    pub extra_tags: BTreeMap<String, MultiValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub name: String,
    #[serde(default)]
    pub album: Option<String>,
    pub artists: MultiValue,
    #[serde(default)]
    pub explicit: Option<Explicit>,
    pub release_year: i32,
    #[serde(default)]
    pub tags: TagDetail,
}

impl TrackInfo {
    pub fn new(name: &str, artists: impl Into<MultiValue>, release_year: i32) -> Self {
        TrackInfo {
            name: name.to_string(),
            album: None,
            artists: artists.into(),
            explicit: None,
            release_year,
            tags: TagDetail::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEntry {
    #[serde(rename = "type")]
    pub role: String,
    pub names: Vec<String>,
}

impl CreditEntry {
    pub fn new(role: &str, names: &[&str]) -> Self {
        CreditEntry {
            role: role.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn joined_names(&self) -> String {
        self.names.join(SEPARATOR)
    }
}

/// Returns the value as-is when present and non-empty.
pub fn non_empty(x: Option<&str>) -> Option<&str> {
    x.filter(|s| !s.is_empty())
}

/// Returns the number when present and positive.
pub fn positive(x: Option<u32>) -> Option<u32> {
    x.filter(|n| *n > 0)
}

pub fn non_zero(x: Option<f64>) -> Option<f64> {
    x.filter(|n| *n != 0.0)
}

/// Renders a float with at least one fractional digit, so `3.0` stays `"3.0"`.
pub fn decimal(x: f64) -> String {
    format!("{:?}", x)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Flac,
    Opus,
    Vorbis,
    Mp3,
    Mp4,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 5] = [ContainerFormat::Flac, ContainerFormat::Opus, ContainerFormat::Vorbis, ContainerFormat::Mp3, ContainerFormat::Mp4];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Flac => "flac",
            ContainerFormat::Opus => "opus",
            ContainerFormat::Vorbis => "vorbis",
            ContainerFormat::Mp3 => "mp3",
            ContainerFormat::Mp4 => "mp4",
        }
    }

    /// Picks the format from the file extension.
    pub fn from_path(p: &Path) -> Result<ContainerFormat> {
        let extension = p.extension().and_then(|s| s.to_str()).unwrap_or_default();
        extension.parse()
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerFormat {
    type Err = TagError;

    fn from_str(s: &str) -> Result<ContainerFormat> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "flac" => Ok(ContainerFormat::Flac),
            "opus" => Ok(ContainerFormat::Opus),
            "ogg" | "vorbis" => Ok(ContainerFormat::Vorbis),
            "mp3" => Ok(ContainerFormat::Mp3),
            "m4a" | "mp4" => Ok(ContainerFormat::Mp4),
            _ => Err(TagError::UnsupportedContainerFormat { format: s.to_string() }),
        }
    }
}

// Logging initialization
use directories::ProjectDirs;
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

static LOGGING_INITIALIZED: Mutex<Option<HashSet<Option<String>>>> = Mutex::new(None);

pub fn initialize_logging(logger_name: Option<&str>, output: &str) -> Result<()> {
    {
        let mut initialized = LOGGING_INITIALIZED.lock().map_err(|_| TagError::Generic("logging state poisoned".to_string()))?;
        let set = initialized.get_or_insert_with(HashSet::new);
        if !set.insert(logger_name.map(|s| s.to_string())) {
            return Ok(());
        }
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        "stderr" => {
            let subscriber = tracing_fmt::Subscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr).with_target(true).finish();
            tracing::subscriber::set_global_default(subscriber).map_err(|e| TagError::Generic(format!("Failed to install logger: {}", e)))?;
        }
        "file" => {
            let proj_dirs = ProjectDirs::from("", "", "tagwright").ok_or_else(|| TagError::Generic("Failed to get project directories".to_string()))?;
            let log_dir = proj_dirs.state_dir().unwrap_or(proj_dirs.cache_dir());
            fs::create_dir_all(log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .max_log_files(10)
                .filename_prefix("tagwright")
                .filename_suffix("log")
                .build(log_dir)
                .map_err(|e| TagError::Generic(format!("Failed to create log file: {}", e)))?;

            // Blocking writer: a non-blocking guard would have to outlive this call.
            let subscriber = tracing_fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file_appender))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).map_err(|e| TagError::Generic(format!("Failed to install logger: {}", e)))?;
        }
        _ => return Err(TagError::Generic(format!("Unknown logging output: {}", output))),
    }

    Ok(())
}
