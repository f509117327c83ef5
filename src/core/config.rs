//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::category::{AssetCategory, CategoryError, CategoryRegistry};
use crate::core::identity::{IdParseError, OfficeCode};
use crate::core::Project;

/// Registry configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Council name (also keys the mirror document)
    pub council: Option<String>,

    /// Office code embedded in every document number
    pub office_code: Option<String>,

    /// Default author for new records
    pub author: Option<String>,

    /// Editor command for `creg ... edit`
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Asset categories; replaces the built-in list when set
    pub categories: Option<Vec<AssetCategory>>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_for(project.as_ref())
    }

    /// Load configuration for a specific project
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/creg/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.creg/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("CREG_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(office) = std::env::var("CREG_OFFICE_CODE") {
            config.office_code = Some(office);
        }
        if let Ok(council) = std::env::var("CREG_COUNCIL") {
            config.council = Some(council);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "creg")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.council.is_some() {
            self.council = other.council;
        }
        if other.office_code.is_some() {
            self.office_code = other.office_code;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.categories.is_some() {
            self.categories = other.categories;
        }
    }

    /// Council name, or an error if none is configured
    pub fn council(&self) -> Result<&str, ConfigError> {
        self.council
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(ConfigError::Missing("council"))
    }

    /// The configured office code, validated
    pub fn office_code(&self) -> Result<OfficeCode, ConfigError> {
        let raw = self
            .office_code
            .as_deref()
            .ok_or(ConfigError::Missing("office_code"))?;
        Ok(OfficeCode::new(raw.trim())?)
    }

    /// The category registry (configured list, or the built-in defaults)
    pub fn category_registry(&self) -> Result<CategoryRegistry, ConfigError> {
        let categories = self
            .categories
            .clone()
            .unwrap_or_else(CategoryRegistry::defaults);
        Ok(CategoryRegistry::new(categories)?)
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, properly handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let parts: Vec<&str> = editor.split_whitespace().collect();

        let Some((cmd, args)) = parts.split_first() else {
            return std::process::Command::new("vi").arg(file_path).status();
        };

        std::process::Command::new(cmd)
            .args(args)
            .arg(file_path)
            .status()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{0}' is not configured (set it in .creg/config.yaml)")]
    Missing(&'static str),

    #[error("invalid office code in config: {0}")]
    Office(#[from] IdParseError),

    #[error("invalid category list in config: {0}")]
    Categories(#[from] CategoryError),
}
