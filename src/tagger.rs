/// The tagger module runs the tagging pipeline for one file: pick the adapter, register keys, map
/// the fields, credits, lyrics and cover onto the staged container, then commit. A failed commit
/// leaves a sidecar with everything that was meant to be embedded.
///
/// Batches of independent files run on a rayon pool.
use crate::adapters::adapter_for;
use crate::common::{non_empty, ContainerFormat, CreditEntry, TrackInfo};
use crate::config::TaggerConfig;
use crate::container::{open_container, SaveError, TagContainer};
use crate::cover::load_cover;
use crate::error::{Result, TagError};
use crate::sidecar::write_sidecar;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tags the file in place.
pub fn tag_file(
    path: &Path,
    cover: Option<&Path>,
    track: &TrackInfo,
    credits: &[CreditEntry],
    lyrics: Option<&str>,
    format: ContainerFormat,
    config: &TaggerConfig,
) -> Result<()> {
    let mut container = open_container(format, path)?;
    tag_container(container.as_mut(), cover, track, credits, lyrics, config)
}

/// Runs the pipeline against an already opened container.
pub fn tag_container(
    c: &mut dyn TagContainer,
    cover: Option<&Path>,
    track: &TrackInfo,
    credits: &[CreditEntry],
    lyrics: Option<&str>,
    config: &TaggerConfig,
) -> Result<()> {
    let adapter = adapter_for(c.format(), config);
    let lyrics = non_empty(lyrics);
    debug!("Tagging {} as {}", c.path().display(), adapter.format());

    adapter.prepare(c, track, lyrics)?;
    adapter.write_fields(c, track)?;
    if !credits.is_empty() {
        adapter.write_credits(c, credits)?;
    }
    if let Some(lyrics) = lyrics {
        adapter.write_lyrics(c, lyrics)?;
    }
    if let Some(cover_path) = cover {
        if let Some(art) = load_cover(cover_path, config.max_cover_bytes)? {
            adapter.set_cover(c, &art)?;
        }
    }

    match adapter.commit(c, &config.save_options()) {
        Ok(()) => {
            debug!("Saved tags to {}", c.path().display());
            Ok(())
        }
        Err(SaveError::NonFatal { quirk, reason }) => {
            warn!("Saved tags to {} with a known quirk ({}): {}", c.path().display(), quirk, reason);
            Ok(())
        }
        Err(SaveError::Failed { reason }) => {
            warn!("Tagging {} failed: {}", c.path().display(), reason);
            if config.write_sidecar {
                if let Err(e) = write_sidecar(c.path(), &track.tags, credits, lyrics) {
                    warn!("Failed to write tag fallback for {}: {}", c.path().display(), e);
                }
            }
            Err(TagError::TagSavingFailure {
                path: c.path().to_path_buf(),
                reason,
            })
        }
    }
}

/// Everything needed to tag one file.
#[derive(Debug, Clone)]
pub struct TagJob {
    pub path: PathBuf,
    pub cover: Option<PathBuf>,
    pub track: TrackInfo,
    pub credits: Vec<CreditEntry>,
    pub lyrics: Option<String>,
    pub format: ContainerFormat,
}

impl TagJob {
    pub fn new(path: impl Into<PathBuf>, track: TrackInfo, format: ContainerFormat) -> TagJob {
        TagJob {
            path: path.into(),
            cover: None,
            track,
            credits: Vec::new(),
            lyrics: None,
            format,
        }
    }

    /// Builds a job whose format comes from the file extension.
    pub fn for_path(path: impl Into<PathBuf>, track: TrackInfo) -> Result<TagJob> {
        let path = path.into();
        let format = ContainerFormat::from_path(&path)?;
        Ok(TagJob::new(path, track, format))
    }

    pub fn with_cover(mut self, cover: impl Into<PathBuf>) -> TagJob {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_credits(mut self, credits: Vec<CreditEntry>) -> TagJob {
        self.credits = credits;
        self
    }

    pub fn with_lyrics(mut self, lyrics: &str) -> TagJob {
        self.lyrics = Some(lyrics.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tagger {
    config: TaggerConfig,
}

impl Tagger {
    pub fn new(config: TaggerConfig) -> Tagger {
        Tagger { config }
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn tag(&self, job: &TagJob) -> Result<()> {
        tag_file(&job.path, job.cover.as_deref(), &job.track, &job.credits, job.lyrics.as_deref(), job.format, &self.config)
    }

    /// Tags independent files in parallel and returns one result per job, in input order. A batch
    /// that names the same file twice is rejected before any file is touched.
    pub fn tag_batch(&self, jobs: &[TagJob]) -> Result<Vec<Result<()>>> {
        let mut seen = HashSet::new();
        for job in jobs {
            if !seen.insert(job.path.as_path()) {
                return Err(TagError::DuplicatePath { path: job.path.clone() });
            }
        }

        if jobs.len() < 2 || self.config.max_proc == 1 {
            debug!("Tagging {} files in the calling thread", jobs.len());
            return Ok(jobs.iter().map(|job| self.tag(job)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_proc)
            .build()
            .map_err(|e| TagError::Generic(format!("Failed to start tagging pool: {}", e)))?;
        info!("Tagging {} files with {} workers", jobs.len(), self.config.max_proc);
        Ok(pool.install(|| jobs.par_iter().map(|job| self.tag(job)).collect()))
    }
}
