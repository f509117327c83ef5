//! Asset entity type - Fixed-asset register entry

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Numbered};
use crate::core::identity::{ClassCode, DocumentId, DocumentKind};

/// Physical condition of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum AssetCondition {
    New,
    #[default]
    Good,
    Fair,
    Poor,
    Disposed,
}

impl std::fmt::Display for AssetCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetCondition::New => write!(f, "new"),
            AssetCondition::Good => write!(f, "good"),
            AssetCondition::Fair => write!(f, "fair"),
            AssetCondition::Poor => write!(f, "poor"),
            AssetCondition::Disposed => write!(f, "disposed"),
        }
    }
}

impl std::str::FromStr for AssetCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(AssetCondition::New),
            "good" => Ok(AssetCondition::Good),
            "fair" => Ok(AssetCondition::Fair),
            "poor" => Ok(AssetCondition::Poor),
            "disposed" => Ok(AssetCondition::Disposed),
            _ => Err(format!(
                "Invalid asset condition: {}. Use new, good, fair, poor, or disposed",
                s
            )),
        }
    }
}

/// Fixed-asset register entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Register number (e.g. 258-2026-04-01)
    pub id: DocumentId,

    /// Asset description
    pub title: String,

    /// Category name as entered at registration
    pub category: String,

    /// Class code the register number was allocated under
    pub class_code: ClassCode,

    /// Date the asset entered the register
    pub entry_date: NaiveDate,

    /// Where the asset is kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub condition: AssetCondition,

    /// Acquisition value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,
}

impl Entity for Asset {
    const TYPE_NAME: &'static str = "asset";
    const DIRECTORY: &'static str = "assets";

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn file_stem(&self) -> String {
        self.id.file_stem()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> String {
        self.condition.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Numbered for Asset {
    const KIND: DocumentKind = DocumentKind::Asset;

    fn document_id(&self) -> &DocumentId {
        &self.id
    }

    fn effective_date(&self) -> NaiveDate {
        self.entry_date
    }

    fn class_code(&self) -> Option<&ClassCode> {
        Some(&self.class_code)
    }

    fn classification(&self) -> Option<&str> {
        Some(&self.category)
    }
}

impl Asset {
    /// Create a new asset under an already committed register number
    pub fn new(
        id: DocumentId,
        title: String,
        category: String,
        entry_date: NaiveDate,
        author: String,
    ) -> Self {
        let class_code = id.class().cloned().unwrap_or_else(ClassCode::fallback);
        Self {
            id,
            title,
            category,
            class_code,
            entry_date,
            location: None,
            condition: AssetCondition::default(),
            value: None,
            notes: None,
            created: Utc::now(),
            author,
        }
    }
}
