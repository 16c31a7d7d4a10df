// Backing game log file: load into a snapshot, replace wholesale on upload.

use std::io::Write;
use std::path::{Path, PathBuf};

use bullpen_core::{ingest_reader, Snapshot};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Upload extensions accepted, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// True when `filename` ends in one of [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// Details about a freshly stored game log, echoed back to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceReport {
    pub saved_as: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub data_dir_contents: Vec<String>,
}

/// The single game log file every request reads from.
#[derive(Debug, Clone)]
pub struct RowSource {
    dir: PathBuf,
    filename: String,
}

impl RowSource {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Read and ingest the game log. A missing file is an empty snapshot.
    pub fn load(&self) -> Result<Snapshot, StorageError> {
        let path = self.path();
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("game log {} not found; returning empty pitcher list", path.display());
                return Ok(Snapshot::empty());
            }
            Err(e) => return Err(StorageError::Io { path, source: e }),
        };

        let snapshot = ingest_reader(file);
        let stats = snapshot.stats();
        debug!(
            "loaded {} pitchers from {} ({} rows, {} skipped)",
            snapshot.len(),
            path.display(),
            stats.rows_read,
            stats.rows_skipped()
        );
        Ok(snapshot)
    }

    /// Replace the game log with `contents`. The new file is written beside
    /// the target and renamed over it, so readers never see a partial write.
    /// The previous content is discarded.
    pub fn replace(&self, contents: &[u8]) -> Result<ReplaceReport, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.path();
        let write_err = |e: std::io::Error| StorageError::Write {
            path: path.clone(),
            source: e,
        };

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp_file.write_all(contents).map_err(write_err)?;
        temp_file.flush().map_err(write_err)?;
        temp_file.persist(&path).map_err(|e| StorageError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let report = ReplaceReport {
            saved_as: self.filename.clone(),
            exists: path.exists(),
            size_bytes,
            data_dir_contents: self.list_dir(),
        };
        info!(
            "game log saved to {} ({} bytes)",
            path.display(),
            report.size_bytes
        );
        Ok(report)
    }

    fn list_dir(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
