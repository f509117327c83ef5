//! Shared utilities for CLI commands over numbered records

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::{Allocation, AllocationRequest, Allocator};
use crate::core::entity::{Entity, Numbered};
use crate::core::sequence::SequenceStore;
use crate::core::{Config, Project, RecordStore};

/// Allocate a number for a new record and write it.
///
/// With `dry_run` only a preview is printed and nothing is reserved or
/// written. Otherwise the number comes from [`Allocator::commit`], never
/// from a preview. `build` receives the committed allocation, including the
/// group it was derived from.
pub fn create_numbered<T, S, F>(
    project: &Project,
    allocator: &Allocator<S>,
    request: &AllocationRequest,
    dry_run: bool,
    build: F,
) -> Result<Option<(PathBuf, T)>>
where
    T: Numbered,
    S: SequenceStore,
    F: FnOnce(Allocation) -> T,
{
    let store = RecordStore::new(project);
    let existing = store.existing_ids::<T>();

    if dry_run {
        let allocation = allocator
            .preview(request, &existing)
            .map_err(|e| miette::miette!("{}", e))?;
        print_preview(T::TYPE_NAME, &allocation);
        return Ok(None);
    }

    let allocation = allocator
        .commit(request, &existing)
        .map_err(|e| miette::miette!("{}", e))?;
    let record = build(allocation);
    let path = store.create(&record).map_err(|e| miette::miette!("{}", e))?;
    Ok(Some((path, record)))
}

fn print_preview(type_name: &str, allocation: &Allocation) {
    println!(
        "{} Next {} number would be {} {}",
        style("→").cyan(),
        type_name,
        style(&allocation.id).cyan().bold(),
        style("(preview only, nothing reserved)").dim()
    );
    if allocation.group.used_fallback() {
        println!(
            "   {} category not registered, class code {} will be used",
            style("!").yellow(),
            style("99").yellow()
        );
    }
}

/// Report a freshly created record
pub fn print_created<T: Entity>(record: &T, path: &std::path::Path, global: &GlobalOpts) {
    if global.format == OutputFormat::Id {
        println!("{}", record.id_string());
        return;
    }
    if global.quiet {
        return;
    }
    println!(
        "{} Created {} {}",
        style("✓").green(),
        T::TYPE_NAME,
        style(record.id_string()).cyan()
    );
    println!("   {}", style(path.display()).dim());
}

/// Open a record in the editor, then reject the edit if any field that
/// determines its number was changed.
pub fn edit_numbered<T: Numbered>(project: &Project, config: &Config, reference: &str) -> Result<()> {
    let store = RecordStore::new(project);
    let (path, original) = store
        .find::<T>(reference)
        .map_err(|e| miette::miette!("{}", e))?;
    let original_content = fs::read_to_string(&path).into_diagnostic()?;

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(config.editor()).yellow()
    );
    config.run_editor(&path).into_diagnostic()?;

    let edited_content = fs::read_to_string(&path).into_diagnostic()?;
    let edited: T = match serde_yml::from_str(&edited_content) {
        Ok(edited) => edited,
        Err(e) => {
            fs::write(&path, &original_content).into_diagnostic()?;
            return Err(miette::miette!(
                "edited {} no longer parses ({}); changes discarded",
                T::TYPE_NAME,
                e
            ));
        }
    };

    if let Some(field) = numbering_change(&original, &edited) {
        fs::write(&path, &original_content).into_diagnostic()?;
        return Err(miette::miette!(
            "{} of {} {} cannot change once the number is assigned; changes discarded",
            field,
            T::TYPE_NAME,
            original.id_string()
        ));
    }

    println!("{} Updated {} {}", style("✓").green(), T::TYPE_NAME, style(edited.id_string()).cyan());
    Ok(())
}

/// Name of the first numbering field that differs between two versions
pub fn numbering_change<T: Numbered>(before: &T, after: &T) -> Option<&'static str> {
    if before.document_id() != after.document_id() {
        Some("the identifier")
    } else if before.effective_date() != after.effective_date() {
        Some("the date")
    } else if before.class_code() != after.class_code() {
        Some("the class code")
    } else if before.classification() != after.classification() {
        Some("the category")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Asset;
    use chrono::NaiveDate;

    fn asset() -> Asset {
        Asset::new(
            "258-2026-04-01".parse().unwrap(),
            "Truck".to_string(),
            "Fleet".to_string(),
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            "Clerk".to_string(),
        )
    }

    #[test]
    fn test_numbering_change_allows_descriptive_edits() {
        let before = asset();
        let mut after = before.clone();
        after.title = "Refuse truck".to_string();
        after.location = Some("Depot".to_string());
        assert_eq!(numbering_change(&before, &after), None);
    }

    #[test]
    fn test_numbering_change_detects_date_and_class() {
        let before = asset();

        let mut after = before.clone();
        after.entry_date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(numbering_change(&before, &after), Some("the date"));

        let mut after = before.clone();
        after.class_code = crate::core::identity::ClassCode::new("02").unwrap();
        assert_eq!(numbering_change(&before, &after), Some("the class code"));

        let mut after = before.clone();
        after.category = "Vehicles".to_string();
        assert_eq!(numbering_change(&before, &after), Some("the category"));
    }
}
