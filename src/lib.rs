pub mod adapters;
pub mod common;
pub mod config;
pub mod container;
pub mod container_flac;
pub mod container_id3;
pub mod container_mp4;
pub mod container_ogg;
pub mod cover;
pub mod error;
pub mod memory;
pub mod sidecar;
pub mod tagger;

#[cfg(test)]
mod testing;

pub use common::{ContainerFormat, CreditEntry, Explicit, MultiValue, TagDetail, TrackInfo};
pub use config::TaggerConfig;
pub use error::{Result, TagError};
pub use tagger::{tag_container, tag_file, TagJob, Tagger};

#[cfg(test)]
mod common_test;
#[cfg(test)]
mod cover_test;
#[cfg(test)]
mod tagger_test;
