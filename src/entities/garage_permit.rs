//! Garage permit entity type

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Numbered};
use crate::core::identity::{DocumentId, DocumentKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PermitStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl std::fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermitStatus::Active => write!(f, "active"),
            PermitStatus::Expired => write!(f, "expired"),
            PermitStatus::Revoked => write!(f, "revoked"),
        }
    }
}

impl std::str::FromStr for PermitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PermitStatus::Active),
            "expired" => Ok(PermitStatus::Expired),
            "revoked" => Ok(PermitStatus::Revoked),
            _ => Err(format!(
                "Invalid permit status: {}. Use active, expired, or revoked",
                s
            )),
        }
    }
}

/// Garage permit issued to a property holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaragePermit {
    /// Permit number (e.g. 258/2026/01)
    pub id: DocumentId,

    /// Permit holder
    pub holder: String,

    /// Property address
    pub address: String,

    /// Vehicle registration plate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,

    pub issue_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,

    #[serde(default)]
    pub permit_status: PermitStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,
}

impl Entity for GaragePermit {
    const TYPE_NAME: &'static str = "permit";
    const DIRECTORY: &'static str = "permits";

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn file_stem(&self) -> String {
        self.id.file_stem()
    }

    fn title(&self) -> &str {
        &self.holder
    }

    fn status(&self) -> String {
        self.effective_status(Utc::now().date_naive()).to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Numbered for GaragePermit {
    const KIND: DocumentKind = DocumentKind::GaragePermit;

    fn document_id(&self) -> &DocumentId {
        &self.id
    }

    fn effective_date(&self) -> NaiveDate {
        self.issue_date
    }
}

impl GaragePermit {
    pub fn new(
        id: DocumentId,
        holder: String,
        address: String,
        issue_date: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id,
            holder,
            address,
            plate: None,
            issue_date,
            expiry_date: None,
            fee: None,
            permit_status: PermitStatus::default(),
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    /// Status as of `today`: an active permit past its expiry date reads as expired
    pub fn effective_status(&self, today: NaiveDate) -> PermitStatus {
        match (self.permit_status, self.expiry_date) {
            (PermitStatus::Active, Some(expiry)) if expiry < today => PermitStatus::Expired,
            (status, _) => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn permit() -> GaragePermit {
        GaragePermit::new(
            "258/2026/01".parse().unwrap(),
            "J. Doe".to_string(),
            "12 High Street".to_string(),
            date(2026, 3, 1),
            "Test Author".to_string(),
        )
    }

    #[test]
    fn test_permit_file_stem_has_no_slashes() {
        assert_eq!(permit().file_stem(), "258_2026_01");
    }

    #[test]
    fn test_effective_status_expires() {
        let mut p = permit();
        p.expiry_date = Some(date(2026, 12, 31));
        assert_eq!(p.effective_status(date(2026, 6, 1)), PermitStatus::Active);
        assert_eq!(p.effective_status(date(2027, 1, 1)), PermitStatus::Expired);

        p.permit_status = PermitStatus::Revoked;
        assert_eq!(p.effective_status(date(2027, 1, 1)), PermitStatus::Revoked);
    }

    #[test]
    fn test_permit_status_parsing() {
        assert_eq!("revoked".parse::<PermitStatus>().unwrap(), PermitStatus::Revoked);
        assert!("pending".parse::<PermitStatus>().is_err());
    }

    #[test]
    fn test_permit_serialization() {
        let yaml = serde_yml::to_string(&permit()).unwrap();
        assert!(yaml.contains("258/2026/01"));
        assert!(yaml.contains("12 High Street"));
        let back: GaragePermit = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back.id, permit().id);
    }
}
