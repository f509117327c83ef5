//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::category::CategoryRegistry;
use crate::core::entity::Entity;
use crate::core::identity::OfficeCode;
use crate::entities::{Asset, GaragePermit, Requisition, ServiceRequest};

/// Project marker directory
pub const PROJECT_DIR: &str = ".creg";

/// Extension used for every record file
pub const RECORD_EXTENSION: &str = ".creg.yaml";

/// Represents a council registry project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .creg/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use `--project` when given, otherwise discover from the working directory
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path, council: &str, office: &OfficeCode) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root, council, office)
    }

    /// Force initialization even if .creg/ exists (rewrites the config)
    pub fn init_force(path: &Path, council: &str, office: &OfficeCode) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        Self::write_structure(root, council, office)
    }

    fn write_structure(root: PathBuf, council: &str, office: &OfficeCode) -> Result<Self, ProjectError> {
        let dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(dir.join("config.yaml"), Self::default_config(council, office))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(dir.join(".gitignore"), "sequences.db*\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for sub in Self::record_directories() {
            std::fs::create_dir_all(root.join(sub))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config(council: &str, office: &OfficeCode) -> String {
        let mut out = String::new();
        out.push_str("# Council registry configuration\n\n");
        out.push_str(&format!("council: {:?}\n", council));
        out.push_str(&format!("office_code: \"{}\"\n\n", office));
        out.push_str("# Default author for new records (can be overridden by global config)\n");
        out.push_str("# author: \"\"\n\n");
        out.push_str("# Default output format (auto, yaml, json, tsv, csv, md, id)\n");
        out.push_str("# default_format: auto\n\n");
        out.push_str("# Asset categories and the class codes used in register numbers.\n");
        out.push_str("# Code 99 is reserved for unknown categories.\n");
        out.push_str("categories:\n");
        for cat in CategoryRegistry::defaults() {
            out.push_str(&format!("  - name: {:?}\n    code: \"{}\"\n", cat.name, cat.code));
        }
        out
    }

    /// Directories created for record files
    pub fn record_directories() -> [&'static str; 4] {
        [
            Asset::DIRECTORY,
            GaragePermit::DIRECTORY,
            Requisition::DIRECTORY,
            ServiceRequest::DIRECTORY,
        ]
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .creg configuration directory
    pub fn creg_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.creg_dir().join("config.yaml")
    }

    /// Location of the allocation-state database
    pub fn sequence_db_path(&self) -> PathBuf {
        self.creg_dir().join("sequences.db")
    }

    /// Directory for a record type
    pub fn entity_directory<T: Entity>(&self) -> PathBuf {
        self.root.join(T::DIRECTORY)
    }

    /// Scratch directory where a full replacement of a record type is
    /// written before it is swapped in
    pub fn staging_directory<T: Entity>(&self) -> PathBuf {
        self.creg_dir().join("staging").join(T::DIRECTORY)
    }

    /// Path of the file holding a record
    pub fn entity_path<T: Entity>(&self, record: &T) -> PathBuf {
        self.entity_directory::<T>()
            .join(format!("{}{}", record.file_stem(), RECORD_EXTENSION))
    }

    /// Iterate all record files of a given type
    pub fn iter_entity_files<T: Entity>(&self) -> impl Iterator<Item = PathBuf> {
        let dir = self.entity_directory::<T>();
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(RECORD_EXTENSION))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a council registry project (searched from {searched_from:?}). Run 'creg init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("council registry project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn office() -> OfficeCode {
        OfficeCode::new("258").unwrap()
    }

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path(), "Test Council", &office()).unwrap();

        assert!(project.creg_dir().exists());
        assert!(project.config_path().exists());
        assert!(project.root().join("assets").is_dir());
        assert!(project.root().join("permits").is_dir());
        assert!(project.root().join("requisitions").is_dir());
        assert!(project.root().join("requests").is_dir());
    }

    #[test]
    fn test_default_config_parses() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path(), "Test \"Quoted\" Council", &office()).unwrap();
        let content = std::fs::read_to_string(project.config_path()).unwrap();
        let value: serde_yml::Value = serde_yml::from_str(&content).unwrap();

        assert_eq!(value["council"].as_str(), Some("Test \"Quoted\" Council"));
        assert_eq!(value["office_code"].as_str(), Some("258"));
        assert_eq!(value["categories"][3]["name"].as_str(), Some("Fleet"));
        assert_eq!(value["categories"][3]["code"].as_str(), Some("04"));
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path(), "Test Council", &office()).unwrap();

        let err = Project::init(tmp.path(), "Test Council", &office()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
        assert!(Project::init_force(tmp.path(), "Other", &office()).is_ok());
    }

    #[test]
    fn test_project_discover_finds_creg_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path(), "Test Council", &office()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_creg_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
