use crate::common::{ContainerFormat, CreditEntry, MultiValue, TrackInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// A track with every optional field populated.
pub fn full_track() -> TrackInfo {
    let mut track = TrackInfo::new("Track 1", vec!["Artist A", "Artist B"], 2024);
    track.album = Some("A Cool Album".to_string());
    track.tags.album_artist = Some(MultiValue::from("Artist A"));
    track.tags.track_number = Some(3);
    track.tags.total_tracks = Some(10);
    track.tags.disc_number = Some(1);
    track.tags.total_discs = Some(2);
    track.tags.release_date = Some("2024-03-15".to_string());
    track.tags.copyright = Some("(C) 2024 Label".to_string());
    track.tags.label = Some("Silk Music".to_string());
    track.tags.description = Some("Liner notes".to_string());
    track.tags.comment = Some("Great track".to_string());
    track.tags.isrc = Some("USABC2400001".to_string());
    track.tags.upc = Some("0123456789012".to_string());
    track.tags.genres = Some(MultiValue::from(vec!["Techno", "Deep House"]));
    track.tags.replay_gain = Some(-7.5);
    track.tags.replay_peak = Some(0.98);
    track
}

pub fn credits() -> Vec<CreditEntry> {
    vec![CreditEntry::new("Composer", &["Composer A", "Composer B"])]
}

// Writes a file of `size` bytes; the content does not need to be a valid image.
pub fn write_blob(dir: &Path, name: &str, size: usize) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, vec![0u8; size]).expect("failed to write blob");
    p
}

// An MPEG audio file: one frame header (MPEG-1 layer III, 128 kbps, 44.1 kHz) followed by silence.
pub fn write_mp3(dir: &Path, name: &str, size: usize) -> PathBuf {
    let p = dir.join(name);
    let mut bytes = vec![0xFF, 0xFB, 0x90, 0x64];
    bytes.resize(size.max(4), 0);
    fs::write(&p, bytes).expect("failed to write mp3");
    p
}

pub fn vorbis_formats() -> [ContainerFormat; 3] {
    [ContainerFormat::Flac, ContainerFormat::Opus, ContainerFormat::Vorbis]
}
