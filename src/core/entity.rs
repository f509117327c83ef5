//! Entity traits - common interface for all record types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{ClassCode, DocumentId, DocumentKind};

/// Common trait for all registry records
pub trait Entity: Serialize + DeserializeOwned {
    /// Human-readable record type name (e.g., "asset", "permit")
    const TYPE_NAME: &'static str;

    /// Directory (relative to the project root) holding this record type
    const DIRECTORY: &'static str;

    /// The record's identifier as text
    fn id_string(&self) -> String;

    /// Filename stem for this record (without the `.creg.yaml` extension)
    fn file_stem(&self) -> String {
        self.id_string()
    }

    /// Short description used in listings
    fn title(&self) -> &str;

    /// Status shown in listings
    fn status(&self) -> String;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}

/// Records that carry a sequential document identifier.
///
/// The identifier and the fields it was derived from are fixed once the
/// record is written.
pub trait Numbered: Entity {
    const KIND: DocumentKind;

    fn document_id(&self) -> &DocumentId;

    /// Date whose year selects the identifier's period
    fn effective_date(&self) -> NaiveDate;

    /// Class code the identifier was allocated under (assets only)
    fn class_code(&self) -> Option<&ClassCode> {
        None
    }

    /// Category name the class code was resolved from (assets only)
    fn classification(&self) -> Option<&str> {
        None
    }
}

/// Priority values for service requests
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}
