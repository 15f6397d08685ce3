//! FaceForensics++ directory layout.
//!
//! ```text
//! <root>/original_sequences/youtube/<compression>/<data_type>/<video>/<frame>.png
//! <root>/manipulated_sequences/<method>/<compression>/<data_type>/<video>/<frame>.png
//! ```

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

pub const PRISTINE_METHOD: &str = "youtube";

#[derive(Debug, Clone)]
pub struct FaceForensicsLayout {
    root: PathBuf,
    image_extension: String,
}

impl FaceForensicsLayout {
    pub fn new(root: impl Into<PathBuf>, image_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            image_extension: image_extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one folder per video for a method/compression/data type.
    pub fn data_dir(&self, method: &str, compression: &str, data_type: &str) -> PathBuf {
        let base = if method == PRISTINE_METHOD {
            self.root.join("original_sequences").join(PRISTINE_METHOD)
        } else {
            self.root.join("manipulated_sequences").join(method)
        };
        base.join(compression).join(data_type)
    }

    /// Video folders under `data_dir`, sorted by name. A missing directory yields none.
    pub fn video_dirs(&self, data_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if !data_dir.exists() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<PathBuf> = fs::read_dir(data_dir)
            .with_context(|| format!("listing {}", data_dir.display()))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Frame images of one video, sorted by file name.
    pub fn frames(&self, video_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if !video_dir.exists() {
            return Ok(Vec::new());
        }
        let mut frames: Vec<PathBuf> = fs::read_dir(video_dir)
            .with_context(|| format!("listing {}", video_dir.display()))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.image_extension))
            })
            .collect();
        frames.sort();
        Ok(frames)
    }
}

/// Video identifier used for split membership: the text before the first `_`.
pub fn video_id(video_dir: &Path) -> Option<&str> {
    let name = video_dir.file_name()?.to_str()?;
    name.split('_').next()
}
