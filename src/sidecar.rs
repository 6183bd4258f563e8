/// The sidecar module writes the plain text fallback record of every tag a failed save would have
/// embedded. The file sits next to the audio file as `<stem>_tags.txt`.
use crate::common::{CreditEntry, MultiValue, TagDetail};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

const INDENT: &str = "    ";

/// Replaces the extension (the part after the last dot of the file name) with `_tags.txt`.
pub fn sidecar_path(p: &Path) -> PathBuf {
    let mut name = p.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push("_tags.txt");
    p.with_file_name(name)
}

/// One `key: value` line per populated field, in declaration order, followed by the credits and
/// lyrics sections when there is anything to put in them.
pub fn render_sidecar(tags: &TagDetail, credits: &[CreditEntry], lyrics: Option<&str>) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = |key: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", key, v));
        }
    };
    let multi = |v: &Option<MultiValue>| v.as_ref().map(MultiValue::joined);
    let number = |n: Option<u32>| n.filter(|n| *n > 0).map(|n| n.to_string());

    line("album_artist", multi(&tags.album_artist));
    line("track_number", number(tags.track_number));
    line("total_tracks", number(tags.total_tracks));
    line("disc_number", number(tags.disc_number));
    line("total_discs", number(tags.total_discs));
    line("release_date", tags.release_date.clone());
    line("copyright", tags.copyright.clone());
    line("label", tags.label.clone());
    line("description", tags.description.clone());
    line("comment", tags.comment.clone());
    line("isrc", tags.isrc.clone());
    line("upc", tags.upc.clone());
    line("genres", multi(&tags.genres));
    line("replay_gain", tags.replay_gain.filter(|x| *x != 0.0).map(|x| x.to_string()));
    line("replay_peak", tags.replay_peak.filter(|x| *x != 0.0).map(|x| x.to_string()));
    let extra: Vec<String> = tags.extra_tags.iter().map(|(k, v)| format!("{}={}", k, v.joined())).collect();
    line("extra_tags", Some(extra.join(", ")));

    let mut text = lines.join("\n");

    let credit_lines: Vec<String> = credits.iter().filter(|c| !c.names.is_empty()).map(|c| format!("{}: {}", c.role, c.joined_names())).collect();
    if !credits.is_empty() {
        text.push_str("\n\ncredits:\n");
        text.push_str(INDENT);
        text.push_str(&credit_lines.join(&format!("\n{}", INDENT)));
    }

    if let Some(lyrics) = lyrics.filter(|l| !l.is_empty()) {
        text.push_str("\n\nlyrics:\n");
        text.push_str(INDENT);
        text.push_str(&lyrics.split('\n').collect::<Vec<_>>().join(&format!("\n{}", INDENT)));
    }

    text
}

/// Writes (or overwrites) the sidecar for the audio file and returns its path.
pub fn write_sidecar(audio_path: &Path, tags: &TagDetail, credits: &[CreditEntry], lyrics: Option<&str>) -> Result<PathBuf> {
    let path = sidecar_path(audio_path);
    fs::write(&path, render_sidecar(tags, credits, lyrics))?;
    tracing::info!("Wrote tag fallback to {}", path.display());
    Ok(path)
}
