//! `creg validate` command - Check record files and their numbering

use console::style;
use miette::Result;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::cli::helpers::open_project_with_config;
use crate::cli::GlobalOpts;
use crate::core::entity::Numbered;
use crate::core::identity::{DocumentKind, OfficeCode, Period};
use crate::core::project::RECORD_EXTENSION;
use crate::core::RecordStore;
use crate::entities::{Asset, GaragePermit, Requisition, ServiceRequest};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Only check one document kind (asset, permit, requisition)
    #[arg(long, short = 't')]
    pub kind: Option<DocumentKind>,

    /// Strict mode - warnings (gaps, foreign office codes) become errors
    #[arg(long)]
    pub strict: bool,

    /// Show summary only, don't show individual files
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Debug, Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
}

/// Problems found in one record file
#[derive(Debug, Default)]
struct FileReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Check a numbered record against its own fields
fn check_record<T: Numbered>(record: &T, path: &Path, office: Option<&OfficeCode>) -> FileReport {
    let mut report = FileReport::default();
    let id = record.document_id();

    if id.kind() != T::KIND {
        report.errors.push(format!(
            "identifier {} is a {} number, expected a {} number",
            id,
            id.kind(),
            T::KIND
        ));
        return report;
    }

    let period = match Period::from_date(record.effective_date()) {
        Ok(period) => period,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };
    let derived = T::KIND.group_key(id.office(), period, record.class_code());
    if derived != id.group_key() {
        report.errors.push(format!(
            "identifier {} does not match the record's own fields (expected group {})",
            id, derived
        ));
    }

    if let Some(office) = office {
        if id.office() != office {
            report.warnings.push(format!(
                "office code {} differs from this project's {}",
                id.office(),
                office
            ));
        }
    }

    let expected_name = format!("{}{}", record.file_stem(), RECORD_EXTENSION);
    let actual_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if actual_name != expected_name {
        report
            .warnings
            .push(format!("file name should be {}", expected_name));
    }

    report
}

/// Runs of missing sequences below the highest one in each group
fn find_gaps(sequences: &BTreeMap<String, Vec<u32>>) -> Vec<(String, Vec<RangeInclusive<u32>>)> {
    sequences
        .iter()
        .filter_map(|(group, seqs)| {
            let mut sorted = seqs.clone();
            sorted.sort_unstable();
            sorted.dedup();

            let mut missing = Vec::new();
            let mut next = 1u32;
            for &seq in &sorted {
                if seq > next {
                    missing.push(next..=seq - 1);
                }
                next = seq.saturating_add(1);
            }
            (!missing.is_empty()).then(|| (group.clone(), missing))
        })
        .collect()
}

fn format_gap(range: &RangeInclusive<u32>) -> String {
    if range.start() == range.end() {
        range.start().to_string()
    } else {
        format!("{}-{}", range.start(), range.end())
    }
}

struct Validation<'a> {
    args: &'a ValidateArgs,
    office: Option<OfficeCode>,
    stats: ValidationStats,
}

impl Validation<'_> {
    fn print_file(&self, path: &Path, report: &FileReport) {
        if self.args.summary {
            return;
        }
        if !report.errors.is_empty() {
            println!(
                "{} {} - {} error(s)",
                style("✗").red(),
                path.display(),
                report.errors.len()
            );
        } else if !report.warnings.is_empty() {
            println!(
                "{} {} - {} warning(s)",
                style("!").yellow(),
                path.display(),
                report.warnings.len()
            );
        } else {
            println!("{} {}", style("✓").green(), path.display());
        }
        for error in &report.errors {
            println!("    {}", style(error).red());
        }
        for warning in &report.warnings {
            println!("    {}", style(warning).yellow());
        }
    }

    fn tally(&mut self, report: &FileReport) {
        self.stats.files_checked += 1;
        self.stats.total_errors += report.errors.len();
        self.stats.total_warnings += report.warnings.len();
        let failed = !report.errors.is_empty() || (self.args.strict && !report.warnings.is_empty());
        if failed {
            self.stats.files_failed += 1;
        } else {
            self.stats.files_passed += 1;
        }
    }

    fn check_kind<T: Numbered>(&mut self, store: &RecordStore<'_>) {
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut sequences: BTreeMap<String, Vec<u32>> = BTreeMap::new();

        for (path, result) in store.load_all::<T>() {
            let report = match result {
                Ok(record) => {
                    let mut report = check_record(&record, &path, self.office.as_ref());
                    let id = record.document_id();
                    match seen.get(&id.to_string()) {
                        Some(first) => report.errors.push(format!(
                            "duplicate identifier {}, also used by {}",
                            id,
                            first.display()
                        )),
                        None => {
                            seen.insert(id.to_string(), path.clone());
                            sequences
                                .entry(id.group_key().to_string())
                                .or_default()
                                .push(id.sequence());
                        }
                    }
                    report
                }
                Err(e) => FileReport {
                    errors: vec![e.to_string()],
                    warnings: Vec::new(),
                },
            };
            self.print_file(&path, &report);
            self.tally(&report);
        }

        for (group, missing) in find_gaps(&sequences) {
            self.stats.total_warnings += 1;
            if self.args.strict {
                self.stats.total_errors += 1;
            }
            if !self.args.summary {
                let list: Vec<String> = missing.iter().map(format_gap).collect();
                println!(
                    "{} {} group {} is missing sequence(s) {}",
                    style("!").yellow(),
                    T::TYPE_NAME,
                    style(&group).cyan(),
                    list.join(", ")
                );
            }
        }
    }

    fn check_requests(&mut self, store: &RecordStore<'_>) {
        for (path, result) in store.load_all::<ServiceRequest>() {
            let report = match result {
                Ok(_) => FileReport::default(),
                Err(e) => FileReport {
                    errors: vec![e.to_string()],
                    warnings: Vec::new(),
                },
            };
            self.print_file(&path, &report);
            self.tally(&report);
        }
    }
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);

    let office = match config.office_code() {
        Ok(office) => Some(office),
        Err(e) => {
            tracing::warn!(error = %e, "no usable office code, skipping office checks");
            None
        }
    };

    let mut validation = Validation {
        args: &args,
        office,
        stats: ValidationStats::default(),
    };

    if !global.quiet {
        println!("{} Validating records in {}...\n", style("→").blue(), project.root().display());
    }

    let wants = |kind: DocumentKind| args.kind.map_or(true, |k| k == kind);
    if wants(DocumentKind::Asset) {
        validation.check_kind::<Asset>(&store);
    }
    if wants(DocumentKind::GaragePermit) {
        validation.check_kind::<GaragePermit>(&store);
    }
    if wants(DocumentKind::Requisition) {
        validation.check_kind::<Requisition>(&store);
    }
    if args.kind.is_none() {
        validation.check_requests(&store);
    }

    let stats = validation.stats;
    let failed = stats.files_failed > 0 || (args.strict && stats.total_warnings > 0);

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    println!();

    if failed {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else if stats.files_failed > 1 {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        } else {
            Err(miette::miette!(
                "Validation failed: {} warning(s) in strict mode",
                stats.total_warnings
            ))
        }
    } else {
        println!("{} All records passed validation!", style("✓").green().bold());
        Ok(())
    }
}
