//! Artwork lookup by fuzzy title match

use crate::GameImages;
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions treated as artwork
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Artwork categories, each stored in its own folder per platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageCategory {
    BoxFront,
    Screenshot,
    ClearLogo,
    FanartBackground,
}

impl ImageCategory {
    pub const ALL: [ImageCategory; 4] = [
        ImageCategory::BoxFront,
        ImageCategory::Screenshot,
        ImageCategory::ClearLogo,
        ImageCategory::FanartBackground,
    ];

    /// Folder name under `Images/<platform>/`
    pub fn folder(&self) -> &'static str {
        match self {
            ImageCategory::BoxFront => "Box - Front",
            ImageCategory::Screenshot => "Screenshot - Gameplay",
            ImageCategory::ClearLogo => "Clear Logo",
            ImageCategory::FanartBackground => "Fanart - Background",
        }
    }
}

/// Lowercase, turn everything but ASCII letters and digits into spaces and
/// collapse runs of whitespace.
///
/// `"The Legend of Zelda: The Wind Waker"` and the on-disk
/// `"The Legend of Zelda - The Wind Waker-01.png"` share a prefix after this.
pub fn normalize_for_match(s: &str) -> String {
    let spaced: String = s
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Directory entries sorted by name; unreadable directories are empty
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    paths
}

fn first_match(paths: &[PathBuf], normalized_title: &str) -> Option<PathBuf> {
    paths
        .iter()
        .filter(|path| path.is_file() && is_image(path))
        .find(|path| {
            path.file_name()
                .map(|name| normalize_for_match(&name.to_string_lossy()))
                .is_some_and(|name| name.starts_with(normalized_title))
        })
        .cloned()
}

/// Find the first image in `dir` (then in its region subfolders) whose
/// normalized filename starts with the normalized title.
pub fn find_image_in_dir(dir: &Path, title: &str) -> Option<PathBuf> {
    let normalized_title = normalize_for_match(title);
    if normalized_title.is_empty() {
        return None;
    }

    let entries = sorted_entries(dir);
    if let Some(found) = first_match(&entries, &normalized_title) {
        return Some(found);
    }

    entries
        .iter()
        .filter(|path| path.is_dir())
        .find_map(|sub| first_match(&sorted_entries(sub), &normalized_title))
}

/// Resolves artwork under `<root>/Images/<platform>/<category>/`
#[derive(Debug, Clone)]
pub struct ArtworkResolver {
    images_root: PathBuf,
}

impl ArtworkResolver {
    /// Create a resolver for an `Images` directory
    pub fn new(images_root: impl Into<PathBuf>) -> Self {
        Self {
            images_root: images_root.into(),
        }
    }

    /// Create a resolver for a library root
    pub fn for_library(root: &Path) -> Self {
        Self::new(root.join("Images"))
    }

    /// Look up every category for a game; unmatched slots stay empty
    pub fn resolve(&self, title: &str, platform: &str) -> GameImages {
        let platform_dir = self.images_root.join(platform);
        let mut images = GameImages::default();

        for category in ImageCategory::ALL {
            let dir = platform_dir.join(category.folder());
            if let Some(found) = find_image_in_dir(&dir, title) {
                tracing::debug!("{:?}: {}", category, found.display());
                images.fill(category, found);
            }
        }

        match images.found_count() {
            0 => tracing::debug!(
                "No images found for \"{}\" in {}",
                title,
                platform_dir.display()
            ),
            n => tracing::debug!("Found {}/4 image types for \"{}\"", n, title),
        }

        images
    }
}
