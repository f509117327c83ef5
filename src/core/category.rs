//! Asset category registry
//!
//! Maps a category name to the two-digit class code embedded in asset
//! identifiers. Names missing from the registry resolve to the reserved
//! fallback code instead of failing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::identity::ClassCode;

/// A named asset category and its class code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCategory {
    pub name: String,
    pub code: ClassCode,
}

/// Result of a category lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub code: ClassCode,
    /// Category name as registered, or `None` when the fallback was used
    pub name: Option<String>,
}

impl Resolved {
    pub fn is_fallback(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<AssetCategory>,
}

impl CategoryRegistry {
    /// Build a registry, rejecting duplicate names or codes
    pub fn new(categories: Vec<AssetCategory>) -> Result<Self, CategoryError> {
        for (i, cat) in categories.iter().enumerate() {
            if cat.code.is_fallback() {
                return Err(CategoryError::ReservedCode(cat.name.clone()));
            }
            for other in &categories[..i] {
                if other.name.eq_ignore_ascii_case(&cat.name) {
                    return Err(CategoryError::DuplicateName(cat.name.clone()));
                }
                if other.code == cat.code {
                    return Err(CategoryError::DuplicateCode {
                        code: cat.code.to_string(),
                        first: other.name.clone(),
                        second: cat.name.clone(),
                    });
                }
            }
        }
        Ok(Self { categories })
    }

    /// The categories shipped with a fresh project
    pub fn defaults() -> Vec<AssetCategory> {
        [
            ("Furniture", "01"),
            ("IT Equipment", "02"),
            ("Machinery", "03"),
            ("Fleet", "04"),
            ("Buildings", "05"),
            ("Office Equipment", "06"),
            ("Land", "07"),
            ("Infrastructure", "08"),
        ]
        .into_iter()
        .filter_map(|(name, code)| {
            ClassCode::new(code).ok().map(|code| AssetCategory {
                name: name.to_string(),
                code,
            })
        })
        .collect()
    }

    /// Resolve a category name (case-insensitive) to its class code
    pub fn resolve(&self, name: Option<&str>) -> Resolved {
        let found = name.and_then(|n| {
            let n = n.trim();
            self.categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(n))
        });

        match found {
            Some(cat) => Resolved {
                code: cat.code.clone(),
                name: Some(cat.name.clone()),
            },
            None => {
                if let Some(n) = name {
                    tracing::warn!(category = n, "unknown asset category, using fallback class code");
                }
                Resolved {
                    code: ClassCode::fallback(),
                    name: None,
                }
            }
        }
    }

    /// Look up the category name registered for a class code
    pub fn name_for(&self, code: &ClassCode) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| &c.code == code)
            .map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("duplicate category name: {0}")]
    DuplicateName(String),

    #[error("class code {code} is used by both '{first}' and '{second}'")]
    DuplicateCode {
        code: String,
        first: String,
        second: String,
    },

    #[error("category '{0}' uses the reserved fallback code 99")]
    ReservedCode(String),
}
