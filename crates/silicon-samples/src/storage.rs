//! Persistence of interview results.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::interview::InterviewResult;

/// Stores results and loads them back without loss.
pub trait ResultSink {
    /// Persists a result and returns an id that [`ResultSink::load`] accepts.
    fn persist(&self, result: &InterviewResult) -> Result<String, StorageError>;
    fn load(&self, location: &str) -> Result<InterviewResult, StorageError>;
}

/// Pretty-printed JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
    prefix: String,
}

impl JsonDirectorySink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            prefix: "silicon-samples".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(&self, result: &InterviewResult) -> String {
        format!(
            "{}-{}-{}",
            self.prefix,
            result.started_at.format("%Y%m%d-%H%M%S%.3f"),
            result.repetition
        )
    }

    /// Opens a file that did not exist before; a taken name gets a `-2`, `-3`, ... suffix.
    fn create_file(&self, result: &InterviewResult) -> Result<(PathBuf, File), StorageError> {
        let stem = self.file_stem(result);
        let mut attempt = 1;
        loop {
            let name = match attempt {
                1 => format!("{stem}.json"),
                n => format!("{stem}-{n}.json"),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
    }
}

impl ResultSink for JsonDirectorySink {
    fn persist(&self, result: &InterviewResult) -> Result<String, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let json = serde_json::to_string_pretty(result)?;
        let (path, mut file) = self.create_file(result)?;
        file.write_all(json.as_bytes())
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "interview result saved");
        Ok(path.display().to_string())
    }

    fn load(&self, location: &str) -> Result<InterviewResult, StorageError> {
        let path = PathBuf::from(location);
        let json = std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => StorageError::NotFound(location.to_string()),
            _ => StorageError::Io {
                path: path.clone(),
                source,
            },
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Keeps serialized results in memory, for tests and dry runs that should not touch disk.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    results: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySink {
    pub fn len(&self) -> usize {
        self.results.lock().expect("result mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for InMemorySink {
    fn persist(&self, result: &InterviewResult) -> Result<String, StorageError> {
        let json = serde_json::to_string(result)?;
        let mut guard = self.results.lock().expect("result mutex poisoned");
        let id = format!("memory-{}", guard.len() + 1);
        guard.insert(id.clone(), json);
        Ok(id)
    }

    fn load(&self, location: &str) -> Result<InterviewResult, StorageError> {
        let guard = self.results.lock().expect("result mutex poisoned");
        let json = guard
            .get(location)
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("result could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to write answer table: {0}")]
    Csv(#[from] csv::Error),
    #[error("no stored result at {0}")]
    NotFound(String),
}
