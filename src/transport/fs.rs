use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::dataset::IMG_EXTENSIONS;
use crate::errors::TrainError;

/// Filesystem transport that enumerates the image files under a root.
pub struct ImageDirectory {
    root: PathBuf,
    follow_links: bool,
}

impl ImageDirectory {
    /// Create an enumerator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: true,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Root directory being enumerated.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every image file under the root, recursively, sorted by full path.
    ///
    /// A missing root (or any unreadable entry) is a `DatasetUnavailable` error.
    pub fn list_images(&self) -> Result<Vec<PathBuf>, TrainError> {
        if !self.root.is_dir() {
            return Err(TrainError::DatasetUnavailable {
                path: self.root.clone(),
                reason: "not a valid directory".to_string(),
            });
        }
        let mut images = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(self.follow_links) {
            let entry = entry.map_err(|err| TrainError::DatasetUnavailable {
                path: err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                reason: err.to_string(),
            })?;
            if entry.file_type().is_file() && is_image_file(entry.path()) {
                images.push(entry.into_path());
            }
        }
        images.sort();
        Ok(images)
    }

    /// Image files whose name ends with `suffix`, sorted by full path.
    pub fn list_with_suffix(&self, suffix: &str) -> Result<Vec<PathBuf>, TrainError> {
        Ok(self
            .list_images()?
            .into_iter()
            .filter(|path| has_suffix(path, suffix))
            .collect())
    }
}

/// True if the path carries a known image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMG_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// True if the file name ends with `suffix`.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(suffix))
        .unwrap_or(false)
}
