//! Record store: one YAML file per record under the project root

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::project::{Project, RECORD_EXTENSION};

/// File-backed record collection for a project
pub struct RecordStore<'p> {
    project: &'p Project,
}

impl<'p> RecordStore<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    /// Parse every record of a type, keeping per-file results
    pub fn load_all<T: Entity>(&self) -> Vec<(PathBuf, Result<T, RecordStoreError>)> {
        let mut files: Vec<PathBuf> = self.project.iter_entity_files::<T>().collect();
        files.sort();
        files
            .into_iter()
            .map(|path| {
                let result = read_record::<T>(&path);
                (path, result)
            })
            .collect()
    }

    /// All records of a type; fails on the first malformed file
    pub fn list<T: Entity>(&self) -> Result<Vec<T>, RecordStoreError> {
        self.load_all::<T>()
            .into_iter()
            .map(|(_, result)| result)
            .collect()
    }

    /// Identifiers of every record of a type.
    ///
    /// Files that fail to parse still contribute the identifier encoded in
    /// their filename, so allocation never reuses a number held by a broken file.
    pub fn existing_ids<T: Entity>(&self) -> Vec<String> {
        self.load_all::<T>()
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(record) => Some(record.id_string()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "using filename as identifier for unreadable record");
                    id_from_path(&path)
                }
            })
            .collect()
    }

    /// Find a record by identifier, filename stem or unique identifier prefix.
    ///
    /// Unreadable files of the same type are skipped unless they are the
    /// only candidate for `reference`, in which case their parse error is
    /// returned.
    pub fn find<T: Entity>(&self, reference: &str) -> Result<(PathBuf, T), RecordStoreError> {
        let reference = reference.trim();
        let stem = reference.replace('/', "_");
        let mut prefix_matches = Vec::new();
        let mut unreadable = Vec::new();

        for (path, result) in self.load_all::<T>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let held = id_from_path(&path).unwrap_or_default();
                    if held == reference || held.replace('/', "_") == stem {
                        return Err(e);
                    }
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                    if held.starts_with(reference) {
                        unreadable.push(e);
                    }
                    continue;
                }
            };
            let id = record.id_string();
            if id == reference || record.file_stem() == stem {
                return Ok((path, record));
            }
            if id.starts_with(reference) {
                prefix_matches.push((path, record));
            }
        }

        match prefix_matches.len() {
            // A broken file is the only candidate
            0 if unreadable.len() == 1 => Err(unreadable.remove(0)),
            0 => Err(RecordStoreError::NotFound {
                kind: T::TYPE_NAME,
                reference: reference.to_string(),
            }),
            1 => Ok(prefix_matches.remove(0)),
            n => Err(RecordStoreError::Ambiguous {
                kind: T::TYPE_NAME,
                reference: reference.to_string(),
                count: n,
            }),
        }
    }

    /// Write a new record; fails if a file for its identifier already exists
    pub fn create<T: Entity>(&self, record: &T) -> Result<PathBuf, RecordStoreError> {
        let path = self.project.entity_path(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yml::to_string(record)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RecordStoreError::AlreadyExists(record.id_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(content.as_bytes())?;

        tracing::debug!(kind = T::TYPE_NAME, id = %record.id_string(), path = %path.display(), "created record");
        Ok(path)
    }

    /// Overwrite an existing record
    pub fn update<T: Entity>(&self, record: &T) -> Result<PathBuf, RecordStoreError> {
        let path = self.project.entity_path(record);
        if !path.exists() {
            return Err(RecordStoreError::NotFound {
                kind: T::TYPE_NAME,
                reference: record.id_string(),
            });
        }
        fs::write(&path, serde_yml::to_string(record)?)?;
        Ok(path)
    }

    /// Replace every record of a type with the given set
    pub fn replace_all<T: Entity>(&self, records: &[T]) -> Result<usize, RecordStoreError> {
        self.stage(records)?.apply()
    }

    /// Write a full replacement set for a type into the staging directory.
    ///
    /// Live files are untouched until [`StagedRecords::apply`] is called.
    /// Fails on identifiers that occur more than once in `records`.
    pub fn stage<T: Entity>(&self, records: &[T]) -> Result<StagedRecords, RecordStoreError> {
        let mut stems = HashSet::new();
        for record in records {
            if !stems.insert(record.file_stem()) {
                return Err(RecordStoreError::Duplicate(record.id_string()));
            }
        }

        let staging = self.project.staging_directory::<T>();
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let mut staged = StagedRecords {
            kind: T::TYPE_NAME,
            staging,
            target: self.project.entity_directory::<T>(),
            replaced: self.project.iter_entity_files::<T>().collect(),
            files: Vec::with_capacity(records.len()),
        };
        for record in records {
            let name = format!("{}{}", record.file_stem(), RECORD_EXTENSION);
            let path = staged.staging.join(&name);
            fs::write(&path, serde_yml::to_string(record)?)?;
            staged.files.push(name);
        }
        Ok(staged)
    }
}

/// Replacement records for one type, written aside and not yet live.
///
/// Dropping without applying discards the staged files.
#[must_use]
pub struct StagedRecords {
    kind: &'static str,
    staging: PathBuf,
    target: PathBuf,
    replaced: Vec<PathBuf>,
    files: Vec<String>,
}

impl StagedRecords {
    /// Remove the live files and move the staged ones into place
    pub fn apply(self) -> Result<usize, RecordStoreError> {
        for path in &self.replaced {
            fs::remove_file(path)?;
        }
        fs::create_dir_all(&self.target)?;
        for name in &self.files {
            fs::rename(self.staging.join(name), self.target.join(name))?;
        }
        tracing::debug!(kind = self.kind, removed = self.replaced.len(), written = self.files.len(), "replaced records");
        Ok(self.files.len())
    }
}

impl Drop for StagedRecords {
    fn drop(&mut self) {
        if self.staging.exists() {
            if let Err(e) = fs::remove_dir_all(&self.staging) {
                tracing::warn!(path = %self.staging.display(), error = %e, "could not remove staging directory");
            }
        }
    }
}

fn read_record<T: Entity>(path: &Path) -> Result<T, RecordStoreError> {
    let content = fs::read_to_string(path)?;
    serde_yml::from_str(&content).map_err(|e| RecordStoreError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Recover the identifier from a record filename (`258_2026_01.creg.yaml` -> `258/2026/01`)
fn id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(RECORD_EXTENSION)?;
    if stem.contains('_') {
        Some(stem.replace('_', "/"))
    } else {
        Some(stem.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("no {kind} found matching '{reference}'")]
    NotFound {
        kind: &'static str,
        reference: String,
    },

    #[error("'{reference}' matches {count} {kind} records; use a longer identifier")]
    Ambiguous {
        kind: &'static str,
        reference: String,
        count: usize,
    },

    #[error("a record with identifier {0} already exists")]
    AlreadyExists(String),

    #[error("identifier {0} appears more than once")]
    Duplicate(String),

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_yml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
