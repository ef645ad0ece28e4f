//! Game catalog for the RetroDeck companion
//!
//! Reads the LaunchBox per-platform metadata files into an in-memory index
//! keyed by normalized ROM path and filename, and resolves artwork by fuzzy
//! title matching. The library is read-only from our side.

mod artwork;
mod index;
mod metadata;

pub use artwork::{ArtworkResolver, IMAGE_EXTENSIONS, ImageCategory, normalize_for_match};
pub use index::{CatalogIndex, join_library_path, normalize_path};
pub use metadata::{GameImages, GameRecord, UNKNOWN_PLATFORM, parse_platform_xml};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Platforms directory not found: {0}")]
    PlatformsNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: quick_xml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
