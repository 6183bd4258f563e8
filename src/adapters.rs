/// The adapters module maps the canonical track metadata onto each container's tag vocabulary.
///
/// One adapter exists per tag dialect: Vorbis comments (FLAC, Ogg Vorbis and Ogg Opus, which only
/// differ in how the cover is stored), ID3 and MP4. The shared field walk lives in
/// [`FormatAdapter::write_fields`]; each adapter fills in the hooks where its dialect diverges.
/// [`adapter_for`] is the only place that dispatches on [`ContainerFormat`].
use crate::common::{decimal, join_optional, non_empty, non_zero, positive, ContainerFormat, CreditEntry, Explicit, MultiValue, TagDetail, TrackInfo};
use crate::config::TaggerConfig;
use crate::container::{KeyBinding, RawFrame, SaveError, SaveOptions, TagContainer, TagValue};
use crate::cover::{encode_vorbis_picture, picture_block, probe_dimensions, CoverArt, COVER_DEPTH, METADATA_BLOCK_PICTURE};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Leftovers of an upstream transcode that must never survive into the tagged file.
pub const TRANSCODER_KEYS: [&str; 4] = ["major_brand", "minor_version", "compatible_brands", "encoder"];

pub const REPLAYGAIN_TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
pub const REPLAYGAIN_TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";

const ID3_COVER_DESCRIPTION: &str = "Cover";

pub trait FormatAdapter {
    fn format(&self) -> ContainerFormat;

    /// Registers every key the container does not know by default and strips transcoder leftovers.
    /// Runs before any field is written.
    fn prepare(&self, c: &mut dyn TagContainer, track: &TrackInfo, lyrics: Option<&str>) -> Result<()>;

    fn write_numbers(&self, c: &mut dyn TagContainer, tags: &TagDetail) -> Result<()>;

    fn write_date(&self, c: &mut dyn TagContainer, track: &TrackInfo) -> Result<()>;

    fn write_explicit(&self, c: &mut dyn TagContainer, explicit: Explicit) -> Result<()> {
        self.set_text(c, "Rating", explicit.as_str())
    }

    fn write_identifiers(&self, c: &mut dyn TagContainer, isrc: Option<&str>, upc: Option<&str>) -> Result<()> {
        if let Some(isrc) = isrc {
            self.set_text(c, "isrc", isrc)?;
        }
        if let Some(upc) = upc {
            self.set_text(c, "UPC", upc)?;
        }
        Ok(())
    }

    fn write_label(&self, c: &mut dyn TagContainer, label: &str) -> Result<()>;

    fn write_description(&self, _c: &mut dyn TagContainer, _description: &str) -> Result<()> {
        tracing::debug!("{} tags have no description field, skipping it", self.format());
        Ok(())
    }

    fn write_comment(&self, _c: &mut dyn TagContainer, _comment: &str) -> Result<()> {
        tracing::debug!("{} tags have no comment field, skipping it", self.format());
        Ok(())
    }

    fn write_extra_tags(&self, c: &mut dyn TagContainer, extra: &BTreeMap<String, MultiValue>) -> Result<()>;

    fn writes_replay_gain(&self) -> bool {
        true
    }

    fn write_credits(&self, c: &mut dyn TagContainer, credits: &[CreditEntry]) -> Result<()>;

    fn write_lyrics(&self, c: &mut dyn TagContainer, lyrics: &str) -> Result<()> {
        self.set_text(c, "lyrics", lyrics)
    }

    fn set_cover(&self, c: &mut dyn TagContainer, cover: &CoverArt) -> Result<()>;

    fn set_text(&self, c: &mut dyn TagContainer, key: &str, value: &str) -> Result<()> {
        c.set(key, TagValue::text(value))?;
        Ok(())
    }

    /// Writes the joined value; empty values are skipped.
    fn set_multi_value(&self, c: &mut dyn TagContainer, key: &str, value: Option<&MultiValue>) -> Result<()> {
        match join_optional(value) {
            Some(joined) => self.set_text(c, key, &joined),
            None => Ok(()),
        }
    }

    /// Writes every populated canonical field. Credits, lyrics and the cover are written separately.
    fn write_fields(&self, c: &mut dyn TagContainer, track: &TrackInfo) -> Result<()> {
        let tags = &track.tags;

        self.set_text(c, "title", &track.name)?;
        if let Some(album) = non_empty(track.album.as_deref()) {
            self.set_text(c, "album", album)?;
        }
        self.set_multi_value(c, "albumartist", tags.album_artist.as_ref())?;
        self.set_multi_value(c, "artist", Some(&track.artists))?;
        self.write_numbers(c, tags)?;
        self.write_date(c, track)?;
        if let Some(copyright) = non_empty(tags.copyright.as_deref()) {
            self.set_text(c, "copyright", copyright)?;
        }
        if let Some(explicit) = track.explicit {
            self.write_explicit(c, explicit)?;
        }
        self.set_multi_value(c, "genre", tags.genres.as_ref())?;
        self.write_identifiers(c, non_empty(tags.isrc.as_deref()), non_empty(tags.upc.as_deref()))?;
        if let Some(label) = non_empty(tags.label.as_deref()) {
            self.write_label(c, label)?;
        }
        if let Some(description) = non_empty(tags.description.as_deref()) {
            self.write_description(c, description)?;
        }
        if let Some(comment) = non_empty(tags.comment.as_deref()) {
            self.write_comment(c, comment)?;
        }
        if !tags.extra_tags.is_empty() {
            self.write_extra_tags(c, &tags.extra_tags)?;
        }
        if let (Some(gain), Some(peak)) = (non_zero(tags.replay_gain), non_zero(tags.replay_peak)) {
            if self.writes_replay_gain() {
                self.set_text(c, REPLAYGAIN_TRACK_GAIN, &decimal(gain))?;
                self.set_text(c, REPLAYGAIN_TRACK_PEAK, &decimal(peak))?;
            } else {
                tracing::debug!("{} tags do not carry replay gain, skipping it", self.format());
            }
        }
        Ok(())
    }

    fn commit(&self, c: &mut dyn TagContainer, options: &SaveOptions) -> std::result::Result<(), SaveError> {
        c.save(options)
    }
}

/// Picks the adapter for the format.
pub fn adapter_for(format: ContainerFormat, config: &TaggerConfig) -> Box<dyn FormatAdapter> {
    match format {
        ContainerFormat::Flac => Box::new(VorbisCommentAdapter {
            format,
            cover_style: VorbisCoverStyle::PictureBlock,
        }),
        ContainerFormat::Opus | ContainerFormat::Vorbis => Box::new(VorbisCommentAdapter {
            format,
            cover_style: VorbisCoverStyle::EncodedComment {
                probe_dimensions: config.probe_cover_dimensions,
            },
        }),
        ContainerFormat::Mp3 => Box::new(Id3Adapter {
            language: config.language.clone(),
        }),
        ContainerFormat::Mp4 => Box::new(Mp4Adapter),
    }
}

fn _strip_transcoder_keys(c: &mut dyn TagContainer) {
    for key in TRANSCODER_KEYS {
        if c.remove(key) {
            tracing::debug!("Removed leftover {} tag from {}", key, c.path().display());
        }
    }
}

/// `N/M` when both are known, `N` otherwise.
fn _combined_number(number: Option<u32>, total: Option<u32>) -> Option<String> {
    match (positive(number), positive(total)) {
        (Some(n), Some(t)) => Some(format!("{}/{}", n, t)),
        (Some(n), None) => Some(n.to_string()),
        _ => None,
    }
}

fn _release_date(track: &TrackInfo) -> Option<&str> {
    non_empty(track.tags.release_date.as_deref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VorbisCoverStyle {
    /// A native FLAC PICTURE block.
    PictureBlock,
    /// A base64 encoded picture block under `METADATA_BLOCK_PICTURE`.
    EncodedComment { probe_dimensions: bool },
}

/// FLAC, Ogg Vorbis and Ogg Opus.
#[derive(Debug, Clone)]
pub struct VorbisCommentAdapter {
    pub format: ContainerFormat,
    pub cover_style: VorbisCoverStyle,
}

impl FormatAdapter for VorbisCommentAdapter {
    fn format(&self) -> ContainerFormat {
        self.format
    }

    fn prepare(&self, c: &mut dyn TagContainer, _track: &TrackInfo, _lyrics: Option<&str>) -> Result<()> {
        _strip_transcoder_keys(c);
        Ok(())
    }

    fn write_numbers(&self, c: &mut dyn TagContainer, tags: &TagDetail) -> Result<()> {
        let fields = [
            ("tracknumber", tags.track_number),
            ("discnumber", tags.disc_number),
            ("totaltracks", tags.total_tracks),
            ("totaldiscs", tags.total_discs),
        ];
        for (key, value) in fields {
            if let Some(n) = positive(value) {
                self.set_text(c, key, &n.to_string())?;
            }
        }
        Ok(())
    }

    fn write_date(&self, c: &mut dyn TagContainer, track: &TrackInfo) -> Result<()> {
        match _release_date(track) {
            Some(date) => self.set_text(c, "date", date),
            None => self.set_text(c, "date", &track.release_year.to_string()),
        }
    }

    fn write_label(&self, c: &mut dyn TagContainer, label: &str) -> Result<()> {
        self.set_text(c, "Label", label)
    }

    fn write_extra_tags(&self, c: &mut dyn TagContainer, extra: &BTreeMap<String, MultiValue>) -> Result<()> {
        for (key, value) in extra {
            self.set_text(c, key, &value.joined())?;
        }
        Ok(())
    }

    fn write_credits(&self, c: &mut dyn TagContainer, credits: &[CreditEntry]) -> Result<()> {
        for credit in credits {
            if let Err(e) = c.set(&credit.role, TagValue::text(credit.joined_names())) {
                tracing::debug!("Skipping credit {}: {}", credit.role, e);
            }
        }
        Ok(())
    }

    fn set_cover(&self, c: &mut dyn TagContainer, cover: &CoverArt) -> Result<()> {
        let mut picture = picture_block(cover, "");
        match self.cover_style {
            VorbisCoverStyle::PictureBlock => {
                c.inject_frame(RawFrame::Picture(picture))?;
            }
            VorbisCoverStyle::EncodedComment { probe_dimensions: probe } => {
                if probe {
                    if let Some((width, height)) = probe_dimensions(&cover.path) {
                        picture.width = width;
                        picture.height = height;
                    }
                }
                picture.depth = COVER_DEPTH;
                c.set(METADATA_BLOCK_PICTURE, TagValue::Text(vec![encode_vorbis_picture(picture)]))?;
            }
        }
        Ok(())
    }
}

/// MPEG audio with ID3v2 tags.
#[derive(Debug, Clone)]
pub struct Id3Adapter {
    /// ISO-639-2 code for comment and lyrics frames.
    pub language: String,
}

impl FormatAdapter for Id3Adapter {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Mp3
    }

    fn prepare(&self, c: &mut dyn TagContainer, _track: &TrackInfo, _lyrics: Option<&str>) -> Result<()> {
        c.register_key("encoder", KeyBinding::text_frame("TSSE"))?;
        for key in ["compatible_brands", "major_brand", "minor_version", "Rating"] {
            c.register_key(key, KeyBinding::user_text(key))?;
        }
        c.register_key("upc", KeyBinding::user_text("BARCODE"))?;
        _strip_transcoder_keys(c);
        Ok(())
    }

    fn write_numbers(&self, c: &mut dyn TagContainer, tags: &TagDetail) -> Result<()> {
        if let Some(track) = _combined_number(tags.track_number, tags.total_tracks) {
            self.set_text(c, "tracknumber", &track)?;
        }
        if let Some(disc) = _combined_number(tags.disc_number, tags.total_discs) {
            self.set_text(c, "discnumber", &disc)?;
        }
        Ok(())
    }

    /// ID3v2.3 has no full date frame: the day and month go into `TDAT` and `date` holds the year.
    fn write_date(&self, c: &mut dyn TagContainer, track: &TrackInfo) -> Result<()> {
        if let Some(date) = _release_date(track) {
            match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(d) => c.inject_frame(RawFrame::LegacyDate {
                    ddmm: format!("{:02}{:02}", d.day(), d.month()),
                })?,
                Err(e) => tracing::warn!("Release date {:?} is not YYYY-MM-DD, writing the year only: {}", date, e),
            }
        }
        self.set_text(c, "date", &track.release_year.to_string())
    }

    fn write_label(&self, c: &mut dyn TagContainer, label: &str) -> Result<()> {
        c.inject_frame(RawFrame::Publisher(label.to_string()))?;
        Ok(())
    }

    fn write_comment(&self, c: &mut dyn TagContainer, comment: &str) -> Result<()> {
        c.inject_frame(RawFrame::Comment {
            language: self.language.clone(),
            description: String::new(),
            text: comment.to_string(),
        })?;
        Ok(())
    }

    fn write_extra_tags(&self, _c: &mut dyn TagContainer, extra: &BTreeMap<String, MultiValue>) -> Result<()> {
        tracing::debug!("ID3 tags do not carry extra tags, skipping {} of them", extra.len());
        Ok(())
    }

    fn write_credits(&self, c: &mut dyn TagContainer, credits: &[CreditEntry]) -> Result<()> {
        for credit in credits {
            c.register_key(&credit.role, KeyBinding::user_text(&credit.role.to_uppercase()))?;
            self.set_text(c, &credit.role, &credit.joined_names())?;
        }
        Ok(())
    }

    fn write_lyrics(&self, c: &mut dyn TagContainer, lyrics: &str) -> Result<()> {
        c.inject_frame(RawFrame::Lyrics {
            language: self.language.clone(),
            description: String::new(),
            text: lyrics.to_string(),
        })?;
        Ok(())
    }

    fn set_cover(&self, c: &mut dyn TagContainer, cover: &CoverArt) -> Result<()> {
        c.inject_frame(RawFrame::Picture(picture_block(cover, ID3_COVER_DESCRIPTION)))?;
        Ok(())
    }
}

/// MPEG-4 audio with an iTunes style item list.
#[derive(Debug, Clone, Copy)]
pub struct Mp4Adapter;

impl Mp4Adapter {
    fn set_bytes(&self, c: &mut dyn TagContainer, key: &str, value: &str) -> Result<()> {
        c.set(key, TagValue::Bytes(value.as_bytes().to_vec()))?;
        Ok(())
    }
}

impl FormatAdapter for Mp4Adapter {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Mp4
    }

    fn prepare(&self, c: &mut dyn TagContainer, track: &TrackInfo, lyrics: Option<&str>) -> Result<()> {
        c.register_key("encoder", KeyBinding::atom("©too"))?;
        for key in ["compatible_brands", "major_brand", "minor_version"] {
            c.register_key(key, KeyBinding::itunes(key))?;
        }
        c.register_key("isrc", KeyBinding::itunes("ISRC"))?;
        c.register_key("upc", KeyBinding::itunes("UPC"))?;
        if track.explicit.is_some() {
            c.register_key("explicit", KeyBinding::atom("rtng"))?;
        }
        if non_empty(lyrics).is_some() {
            c.register_key("lyrics", KeyBinding::atom("©lyr"))?;
        }
        c.register_key("label", KeyBinding::atom("©pub"))?;
        c.register_key("description", KeyBinding::atom("desc"))?;
        c.register_key("comment", KeyBinding::atom("©cmt"))?;
        _strip_transcoder_keys(c);
        Ok(())
    }

    fn write_numbers(&self, c: &mut dyn TagContainer, tags: &TagDetail) -> Result<()> {
        if let Some(track) = _combined_number(tags.track_number, tags.total_tracks) {
            self.set_text(c, "tracknumber", &track)?;
        }
        if let Some(disc) = _combined_number(tags.disc_number, tags.total_discs) {
            self.set_text(c, "discnumber", &disc)?;
        }
        Ok(())
    }

    fn write_date(&self, c: &mut dyn TagContainer, track: &TrackInfo) -> Result<()> {
        match _release_date(track) {
            Some(date) => self.set_text(c, "date", date),
            None => self.set_text(c, "date", &track.release_year.to_string()),
        }
    }

    fn write_explicit(&self, c: &mut dyn TagContainer, explicit: Explicit) -> Result<()> {
        c.set("explicit", TagValue::Flag(explicit.rating_byte()))?;
        Ok(())
    }

    fn write_identifiers(&self, c: &mut dyn TagContainer, isrc: Option<&str>, upc: Option<&str>) -> Result<()> {
        if let Some(isrc) = isrc {
            self.set_bytes(c, "isrc", isrc)?;
        }
        if let Some(upc) = upc {
            self.set_bytes(c, "upc", upc)?;
        }
        Ok(())
    }

    fn write_label(&self, c: &mut dyn TagContainer, label: &str) -> Result<()> {
        self.set_text(c, "label", label)
    }

    fn write_description(&self, c: &mut dyn TagContainer, description: &str) -> Result<()> {
        self.set_text(c, "description", description)
    }

    fn write_comment(&self, c: &mut dyn TagContainer, comment: &str) -> Result<()> {
        self.set_text(c, "comment", comment)
    }

    fn write_extra_tags(&self, c: &mut dyn TagContainer, extra: &BTreeMap<String, MultiValue>) -> Result<()> {
        for (key, value) in extra {
            c.register_key(key, KeyBinding::itunes(key))?;
            self.set_bytes(c, key, &value.joined())?;
        }
        Ok(())
    }

    fn writes_replay_gain(&self) -> bool {
        false
    }

    fn write_credits(&self, c: &mut dyn TagContainer, credits: &[CreditEntry]) -> Result<()> {
        for credit in credits {
            c.register_key(&credit.role, KeyBinding::itunes(&credit.role))?;
            self.set_bytes(c, &credit.role, &credit.joined_names())?;
        }
        Ok(())
    }

    fn set_cover(&self, c: &mut dyn TagContainer, cover: &CoverArt) -> Result<()> {
        c.inject_frame(RawFrame::Picture(picture_block(cover, "")))?;
        Ok(())
    }
}
