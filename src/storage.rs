//! Client-side "save as" for finished recordings

use crate::errors::CaptureError;
use crate::types::DownloadArtifact;
use std::fs;
use std::path::{Path, PathBuf};

/// Hands a finished artifact to the user
pub trait FileSaver {
    /// Persist the artifact and return where it ended up.
    fn save_as(&self, artifact: &DownloadArtifact) -> Result<PathBuf, CaptureError>;
}

/// Writes downloads into a directory, never overwriting an existing file
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    directory: PathBuf,
}

impl DirectorySaver {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
    fn available_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.directory.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };

        (1u32..)
            .map(|n| match extension {
                Some(ext) => self.directory.join(format!("{stem} ({n}).{ext}")),
                None => self.directory.join(format!("{stem} ({n})")),
            })
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

impl FileSaver for DirectorySaver {
    fn save_as(&self, artifact: &DownloadArtifact) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.directory).map_err(|e| {
            CaptureError::SaveFailed(format!(
                "Failed to create output directory {:?}: {}",
                self.directory, e
            ))
        })?;

        let path = self.available_path(&artifact.file_name);
        fs::write(&path, &artifact.data)
            .map_err(|e| CaptureError::SaveFailed(format!("Failed to write {:?}: {}", path, e)))?;

        log::info!(
            "Saved {} ({} bytes, {}) to {:?}",
            artifact.file_name,
            artifact.size(),
            artifact.mime_type,
            path
        );
        Ok(path)
    }
}
