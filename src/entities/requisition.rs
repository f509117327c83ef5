//! Requisition form entity type

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Numbered};
use crate::core::identity::{DocumentId, DocumentKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RequisitionStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl std::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequisitionStatus::Draft => write!(f, "draft"),
            RequisitionStatus::Submitted => write!(f, "submitted"),
            RequisitionStatus::Approved => write!(f, "approved"),
            RequisitionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for RequisitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(RequisitionStatus::Draft),
            "submitted" => Ok(RequisitionStatus::Submitted),
            "approved" => Ok(RequisitionStatus::Approved),
            "rejected" => Ok(RequisitionStatus::Rejected),
            _ => Err(format!(
                "Invalid requisition status: {}. Use draft, submitted, approved, or rejected",
                s
            )),
        }
    }
}

/// One requested item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Unit of measure (e.g. "box", "each")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Estimated cost per unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn line_total(&self) -> Option<f64> {
        self.unit_cost.map(|c| c * f64::from(self.quantity))
    }
}

impl std::str::FromStr for LineItem {
    type Err = String;

    /// Parse `description[:quantity[:unit_cost]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let description = parts
            .next()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| format!("Invalid item '{}': missing description", s))?
            .to_string();
        let quantity = match parts.next() {
            Some(q) => q
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid item '{}': quantity must be a whole number", s))?,
            None => 1,
        };
        let unit_cost = match parts.next() {
            Some(c) => Some(
                c.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid item '{}': unit cost must be a number", s))?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(format!(
                "Invalid item '{}': expected description[:quantity[:unit_cost]]",
                s
            ));
        }
        Ok(Self {
            description,
            quantity,
            unit: None,
            unit_cost,
        })
    }
}

/// Internal requisition form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    /// Form number (e.g. RF258/2026/07)
    pub id: DocumentId,

    pub requester: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    pub purpose: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,

    /// Date the form was raised
    pub date: NaiveDate,

    #[serde(default)]
    pub requisition_status: RequisitionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,
}

impl Entity for Requisition {
    const TYPE_NAME: &'static str = "requisition";
    const DIRECTORY: &'static str = "requisitions";

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn file_stem(&self) -> String {
        self.id.file_stem()
    }

    fn title(&self) -> &str {
        &self.purpose
    }

    fn status(&self) -> String {
        self.requisition_status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Numbered for Requisition {
    const KIND: DocumentKind = DocumentKind::Requisition;

    fn document_id(&self) -> &DocumentId {
        &self.id
    }

    fn effective_date(&self) -> NaiveDate {
        self.date
    }
}

impl Requisition {
    pub fn new(
        id: DocumentId,
        requester: String,
        purpose: String,
        date: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id,
            requester,
            department: None,
            purpose,
            items: Vec::new(),
            date,
            requisition_status: RequisitionStatus::default(),
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    /// Sum of the priced line items
    pub fn estimated_total(&self) -> f64 {
        self.items.iter().filter_map(LineItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_parsing() {
        let item: LineItem = "A4 paper:10:4.5".parse().unwrap();
        assert_eq!(item.description, "A4 paper");
        assert_eq!(item.quantity, 10);
        assert_eq!(item.unit_cost, Some(4.5));

        let item: LineItem = "Stapler".parse().unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_cost, None);

        assert!("".parse::<LineItem>().is_err());
        assert!("Pens:many".parse::<LineItem>().is_err());
        assert!("Pens:1:2:3".parse::<LineItem>().is_err());
    }

    #[test]
    fn test_estimated_total_skips_unpriced_items() {
        let mut req = Requisition::new(
            "RF258/2026/01".parse().unwrap(),
            "Clerk".to_string(),
            "Office supplies".to_string(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            "Test Author".to_string(),
        );
        req.items = vec![
            "Paper:10:4.5".parse().unwrap(),
            "Toner:2:60".parse().unwrap(),
            "Sticky notes".parse().unwrap(),
        ];
        assert!((req.estimated_total() - 165.0).abs() < f64::EPSILON);
        assert_eq!(req.file_stem(), "RF258_2026_01");
    }

    #[test]
    fn test_requisition_deserialization() {
        let yaml = r#"
id: RF258/2026/03
requester: "Works Dept"
purpose: "Road signage"
items:
  - description: "Stop sign"
    quantity: 4
    unit_cost: 85.0
date: 2026-05-02
requisition_status: submitted
created: 2026-05-02T08:30:00Z
author: "Test Author"
"#;
        let req: Requisition = serde_yml::from_str(yaml).unwrap();
        assert_eq!(req.id.kind(), DocumentKind::Requisition);
        assert_eq!(req.requisition_status, RequisitionStatus::Submitted);
        assert_eq!(req.items[0].quantity, 4);
    }
}
