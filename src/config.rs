/// The config module provides the tagger configuration and its TOML parsing logic.
///
/// Every key is optional. Unknown keys are reported with a warning instead of failing, so that a
/// configuration file written for a newer version still loads.
use crate::container::{Id3Version, SaveOptions};
use crate::error::{Result, TagError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Covers at or above this size are never embedded.
pub const DEFAULT_MAX_COVER_BYTES: u64 = 32 * 1024 * 1024;

pub const DEFAULT_LANGUAGE: &str = "eng";

const KNOWN_KEYS: &[&str] = &["max_proc", "max_cover_bytes", "probe_cover_dimensions", "language", "id3_version", "id3_write_v1", "write_sidecar"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Worker threads used by batch tagging.
    pub max_proc: usize,
    pub max_cover_bytes: u64,
    pub probe_cover_dimensions: bool,
    /// ISO-639-2 code stored in ID3 comment and lyrics frames.
    pub language: String,
    pub id3_version: Id3Version,
    pub id3_write_v1: bool,
    pub write_sidecar: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        TaggerConfig {
            max_proc: num_cpus::get().max(1),
            max_cover_bytes: DEFAULT_MAX_COVER_BYTES,
            probe_cover_dimensions: true,
            language: DEFAULT_LANGUAGE.to_string(),
            id3_version: Id3Version::V23,
            id3_write_v1: true,
            write_sidecar: true,
        }
    }
}

impl TaggerConfig {
    pub fn parse_file(cfgpath: &Path) -> Result<TaggerConfig> {
        let contents = fs::read_to_string(cfgpath).map_err(|e| TagError::Config {
            path: cfgpath.to_path_buf(),
            message: format!("Failed to read configuration file: {}", e),
        })?;
        Self::parse_str(cfgpath, &contents)
    }

    pub fn parse_str(cfgpath: &Path, contents: &str) -> Result<TaggerConfig> {
        let table: toml::Table = toml::from_str(contents).map_err(|e| TagError::Config {
            path: cfgpath.to_path_buf(),
            message: format!("Failed to decode configuration file: invalid TOML: {}", e),
        })?;

        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!("Unrecognized option in configuration file {}: {}", cfgpath.display(), key);
            }
        }

        let config: TaggerConfig = toml::from_str(contents).map_err(|e| TagError::Config {
            path: cfgpath.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.max_proc == 0 {
            return Err(TagError::Config {
                path: cfgpath.to_path_buf(),
                message: "max_proc must be a positive integer".to_string(),
            });
        }
        if config.language.chars().count() != 3 || !config.language.is_ascii() {
            return Err(TagError::Config {
                path: cfgpath.to_path_buf(),
                message: format!("language must be a three-letter ISO-639-2 code: got {:?}", config.language),
            });
        }

        Ok(config)
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            id3_version: self.id3_version,
            id3_write_v1: self.id3_write_v1,
        }
    }
}
