//! Printable documents rendered from embedded templates
//!
//! Identifiers are inserted as opaque text; nothing here reformats them.

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::entity::Entity;
use crate::entities::{Asset, GaragePermit, Requisition};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const ASSET_TAG: &str = "asset_tag.txt.tera";
const PERMIT: &str = "permit.txt.tera";
const REQUISITION: &str = "requisition.txt.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

#[derive(Serialize)]
struct ItemLine<'a> {
    description: &'a str,
    quantity: u32,
    unit: Option<&'a str>,
    total: Option<String>,
}

/// Renders asset tags, garage permits and requisition forms
pub struct DocumentPrinter {
    tera: Tera,
    council: String,
}

impl DocumentPrinter {
    /// Load the embedded templates for the named council
    pub fn new(council: impl Into<String>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let source = std::str::from_utf8(&content.data)
                    .map_err(|e| TemplateError::RenderError(format!("{}: {}", filename, e)))?;
                tera.add_raw_template(filename, source)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }

        Ok(Self {
            tera,
            council: council.into(),
        })
    }

    fn context<T: Entity>(&self, record: &T) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("council", &self.council);
        context.insert("id", &record.id_string());
        context.insert("author", record.author());
        context.insert("status", &record.status());
        context
    }

    fn render(&self, name: &str, context: &tera::Context) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }

    pub fn asset_tag(&self, asset: &Asset) -> Result<String, TemplateError> {
        let mut context = self.context(asset);
        context.insert("title", &asset.title);
        context.insert("category", &asset.category);
        context.insert("class_code", asset.class_code.as_str());
        context.insert("entry_date", &asset.entry_date.to_string());
        context.insert("location", &asset.location);
        self.render(ASSET_TAG, &context)
    }

    pub fn permit(&self, permit: &GaragePermit) -> Result<String, TemplateError> {
        let mut context = self.context(permit);
        context.insert("holder", &permit.holder);
        context.insert("address", &permit.address);
        context.insert("plate", &permit.plate);
        context.insert("issue_date", &permit.issue_date.to_string());
        context.insert("expiry_date", &permit.expiry_date.map(|d| d.to_string()));
        context.insert("fee", &permit.fee.map(money));
        context.insert("notes", &permit.notes);
        self.render(PERMIT, &context)
    }

    pub fn requisition(&self, requisition: &Requisition) -> Result<String, TemplateError> {
        let mut context = self.context(requisition);
        context.insert("requester", &requisition.requester);
        context.insert("department", &requisition.department);
        context.insert("purpose", &requisition.purpose);
        context.insert("date", &requisition.date.to_string());

        let items: Vec<ItemLine<'_>> = requisition
            .items
            .iter()
            .map(|item| ItemLine {
                description: &item.description,
                quantity: item.quantity,
                unit: item.unit.as_deref(),
                total: item.line_total().map(money),
            })
            .collect();
        context.insert("items", &items);

        let priced = requisition.items.iter().any(|i| i.unit_cost.is_some());
        context.insert("total", &priced.then(|| money(requisition.estimated_total())));
        self.render(REQUISITION, &context)
    }
}

fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::requisition::LineItem;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn printer() -> DocumentPrinter {
        DocumentPrinter::new("Springfield Municipal Council").unwrap()
    }

    #[test]
    fn test_asset_tag_contains_identifier() {
        let mut asset = Asset::new(
            "258-2026-04-02".parse().unwrap(),
            "Refuse truck".to_string(),
            "Fleet".to_string(),
            date(2026, 2, 14),
            "Clerk".to_string(),
        );
        asset.location = Some("North depot".to_string());

        let out = printer().asset_tag(&asset).unwrap();
        assert!(out.contains("SPRINGFIELD MUNICIPAL COUNCIL"));
        assert!(out.contains("258-2026-04-02"));
        assert!(out.contains("Fleet (04)"));
        assert!(out.contains("North depot"));
    }

    #[test]
    fn test_permit_omits_missing_fields() {
        let permit = GaragePermit::new(
            "258/2026/01".parse().unwrap(),
            "J. Smith".to_string(),
            "4 Elm Rd".to_string(),
            date(2026, 3, 1),
            "Clerk".to_string(),
        );

        let out = printer().permit(&permit).unwrap();
        assert!(out.contains("GARAGE PERMIT No. 258/2026/01"));
        assert!(out.contains("J. Smith"));
        assert!(!out.contains("Vehicle plate"));
        assert!(!out.contains("Fee paid"));
    }

    #[test]
    fn test_requisition_lists_items_and_total() {
        let mut req = Requisition::new(
            "RF258/2026/07".parse().unwrap(),
            "Parks".to_string(),
            "Spring planting".to_string(),
            date(2026, 4, 2),
            "Clerk".to_string(),
        );
        req.items.push("Tulip bulbs:200:0.5".parse::<LineItem>().unwrap());
        req.items.push("Mulch:3".parse::<LineItem>().unwrap());

        let out = printer().requisition(&req).unwrap();
        assert!(out.contains("REQUISITION FORM No. RF258/2026/07"));
        assert!(out.contains("1. Tulip bulbs x 200 = 100.00"));
        assert!(out.contains("2. Mulch x 3"));
        assert!(out.contains("Estimated total: 100.00"));
    }
}
