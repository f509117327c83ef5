//! Integration tests for the creg CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a creg command isolated from the user's environment
fn creg(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("creg").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env("CREG_AUTHOR", "Test Clerk")
        .env_remove("CREG_OFFICE_CODE")
        .env_remove("CREG_COUNCIL")
        .env_remove("CREG_LOG")
        .env_remove("EDITOR")
        .env_remove("VISUAL");
    cmd
}

/// Helper to create a registry for office 258 in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    creg(tmp.path())
        .args(["init", "--council", "Test Council", "--office-code", "258"])
        .assert()
        .success();
    tmp
}

/// Run a command with `-f id` and return the trimmed stdout
fn run_for_id(tmp: &TempDir, args: &[&str]) -> String {
    let output = creg(tmp.path())
        .args(args)
        .args(["-f", "id"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn new_asset(tmp: &TempDir, title: &str, category: &str, date: &str) -> String {
    run_for_id(tmp, &["asset", "new", "-t", title, "-c", category, "-d", date])
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    creg(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Council Registry"))
        .stdout(predicate::str::contains("asset"))
        .stdout(predicate::str::contains("permit"));
}

#[test]
fn test_init_creates_structure() {
    let tmp = setup_test_project();
    assert!(tmp.path().join(".creg/config.yaml").is_file());
    for dir in ["assets", "permits", "requisitions", "requests"] {
        assert!(tmp.path().join(dir).is_dir(), "{} missing", dir);
    }
    let config = fs::read_to_string(tmp.path().join(".creg/config.yaml")).unwrap();
    assert!(config.contains("office_code: \"258\""));
    assert!(config.contains("Fleet"));
}

#[test]
fn test_init_rejects_bad_office_code() {
    let tmp = TempDir::new().unwrap();
    creg(tmp.path())
        .args(["init", "--council", "Test Council", "--office-code", "2 58"])
        .assert()
        .failure();
    assert!(!tmp.path().join(".creg").exists());
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    creg(tmp.path()).args(["asset", "list"]).assert().failure();
}

// ============================================================================
// Numbering
// ============================================================================

#[test]
fn test_asset_numbers_are_sequential_per_group() {
    let tmp = setup_test_project();
    assert_eq!(new_asset(&tmp, "Refuse truck", "Fleet", "2026-02-14"), "258-2026-04-01");
    assert_eq!(new_asset(&tmp, "Street sweeper", "Fleet", "2026-03-02"), "258-2026-04-02");
    // Other categories count separately
    assert_eq!(new_asset(&tmp, "Desk", "Furniture", "2026-03-02"), "258-2026-01-01");
    assert!(tmp.path().join("assets/258-2026-04-02.creg.yaml").is_file());
}

#[test]
fn test_unknown_category_uses_fallback_class() {
    let tmp = setup_test_project();
    assert_eq!(new_asset(&tmp, "Survey drone", "Drones", "2026-05-01"), "258-2026-99-01");
    assert_eq!(new_asset(&tmp, "Kayak", "Boats", "2026-05-02"), "258-2026-99-02");
}

#[test]
fn test_category_match_is_case_insensitive() {
    let tmp = setup_test_project();
    assert_eq!(new_asset(&tmp, "Van", "fleet", "2026-02-14"), "258-2026-04-01");
}

#[test]
fn test_year_rollover_starts_new_group() {
    let tmp = setup_test_project();
    assert_eq!(new_asset(&tmp, "Old truck", "Fleet", "2026-12-31"), "258-2026-04-01");
    assert_eq!(new_asset(&tmp, "New truck", "Fleet", "2027-01-01"), "258-2027-04-01");
}

#[test]
fn test_permit_and_requisition_formats() {
    let tmp = setup_test_project();
    let permit = run_for_id(
        &tmp,
        &["permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "-d", "2026-03-01"],
    );
    assert_eq!(permit, "258/2026/01");
    assert!(tmp.path().join("permits/258_2026_01.creg.yaml").is_file());

    let reqf = run_for_id(
        &tmp,
        &["reqf", "new", "-r", "Parks", "-p", "Spring planting", "-d", "2026-03-01"],
    );
    assert_eq!(reqf, "RF258/2026/01");

    let second = run_for_id(
        &tmp,
        &["permit", "new", "--holder", "A. Jones", "-a", "3 Oak St", "-d", "2026-04-11"],
    );
    assert_eq!(second, "258/2026/02");
}

#[test]
fn test_preview_reserves_nothing() {
    let tmp = setup_test_project();
    creg(tmp.path())
        .args(["asset", "new", "-t", "Truck", "-c", "Fleet", "-d", "2026-02-14", "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("258-2026-04-01"))
        .stdout(predicate::str::contains("nothing reserved"));

    creg(tmp.path())
        .args(["asset", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");

    // The real creation still gets the first number
    assert_eq!(new_asset(&tmp, "Truck", "Fleet", "2026-02-14"), "258-2026-04-01");
}

#[test]
fn test_id_preview_is_stable_and_tracks_commits() {
    let tmp = setup_test_project();
    let args = ["id", "preview", "asset", "-c", "Fleet", "-d", "2026-02-14"];
    assert_eq!(run_for_id(&tmp, &args), "258-2026-04-01");
    assert_eq!(run_for_id(&tmp, &args), "258-2026-04-01");

    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    assert_eq!(run_for_id(&tmp, &args), "258-2026-04-02");

    creg(tmp.path())
        .args(["id", "groups"])
        .assert()
        .success()
        .stdout(predicate::str::contains("258-2026-04"));
}

#[test]
fn test_unreadable_record_still_holds_its_number() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    fs::write(
        tmp.path().join("assets/258-2026-04-05.creg.yaml"),
        "id: [not valid yaml\n",
    )
    .unwrap();

    assert_eq!(new_asset(&tmp, "Van", "Fleet", "2026-02-20"), "258-2026-04-06");
}

#[test]
fn test_unreadable_record_does_not_hide_others() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    fs::write(
        tmp.path().join("assets/258-2026-04-05.creg.yaml"),
        "id: [not valid yaml\n",
    )
    .unwrap();

    creg(tmp.path())
        .args(["asset", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("258-2026-04-01"));
    creg(tmp.path())
        .args(["asset", "show", "258-2026-04-05"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn test_asset_stores_registered_category_name() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Van", " FLEET ", "2026-02-14");
    assert_eq!(id, "258-2026-04-01");

    creg(tmp.path())
        .args(["asset", "show", &id, "-f", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("category: Fleet"));
}

#[test]
fn test_invalid_date_is_rejected() {
    let tmp = setup_test_project();
    creg(tmp.path())
        .args(["asset", "new", "-t", "Truck", "-c", "Fleet", "-d", "2026-13-01"])
        .assert()
        .code(2);
    creg(tmp.path())
        .args(["asset", "list", "--count"])
        .assert()
        .stdout("0\n");
}

#[test]
fn test_dates_without_four_digit_year_are_rejected() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");

    creg(tmp.path())
        .args(["asset", "new", "-t", "Future", "-c", "Fleet", "-d", "+10000-01-01"])
        .assert()
        .code(2);
    creg(tmp.path())
        .args(["asset", "new", "-t", "Ancient", "-c", "Fleet", "--date=-0005-01-01"])
        .assert()
        .code(2);
    creg(tmp.path())
        .args(["id", "preview", "permit", "-d", "+10000-01-01"])
        .assert()
        .code(2);
    creg(tmp.path())
        .args([
            "permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "--expires", "+10000-01-01",
        ])
        .assert()
        .code(2);

    // The register stays readable
    creg(tmp.path())
        .args(["asset", "list", "-f", "id"])
        .assert()
        .success()
        .stdout("258-2026-04-01\n");
}

#[test]
fn test_permit_expiry_before_issue_is_rejected() {
    let tmp = setup_test_project();
    creg(tmp.path())
        .args([
            "permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "-d", "2026-03-01",
            "--expires", "2026-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before the issue date"));
}

// ============================================================================
// Categories
// ============================================================================

#[test]
fn test_category_resolve() {
    let tmp = setup_test_project();
    assert_eq!(run_for_id(&tmp, &["category", "resolve", "Fleet"]), "04");
    assert_eq!(run_for_id(&tmp, &["category", "resolve", "Drones"]), "99");

    creg(tmp.path())
        .args(["category", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IT Equipment"));
}

// ============================================================================
// Editing
// ============================================================================

#[cfg(unix)]
#[test]
fn test_edit_cannot_change_entry_date() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    let path = tmp.path().join("assets/258-2026-04-01.creg.yaml");
    let before = fs::read_to_string(&path).unwrap();

    creg(tmp.path())
        .env("EDITOR", "sed -i s/2026-02-14/2027-01-01/")
        .args(["asset", "edit", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot change once the number is assigned"));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[cfg(unix)]
#[test]
fn test_edit_cannot_change_category() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");

    creg(tmp.path())
        .env("EDITOR", "sed -i s/category:.Fleet/category:\\x20Machinery/")
        .args(["asset", "edit", &id])
        .assert()
        .failure();

    creg(tmp.path())
        .args(["asset", "show", &id, "-f", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("category: Fleet"));
}

#[cfg(unix)]
#[test]
fn test_edit_descriptive_fields_in_editor() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");

    creg(tmp.path())
        .env("EDITOR", "sed -i s/Truck/Tipper/")
        .args(["asset", "edit", &id])
        .assert()
        .success();

    creg(tmp.path())
        .args(["asset", "show", &id, "-f", "yaml"])
        .assert()
        .stdout(predicate::str::contains("Tipper"));
}

#[test]
fn test_edit_with_flags() {
    let tmp = setup_test_project();
    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");

    creg(tmp.path())
        .args(["asset", "edit", &id, "--location", "Depot", "--condition", "poor"])
        .assert()
        .success();

    creg(tmp.path())
        .args(["asset", "show", &id, "-f", "yaml"])
        .assert()
        .stdout(predicate::str::contains("location: Depot"))
        .stdout(predicate::str::contains("condition: poor"))
        .stdout(predicate::str::contains("2026-02-14"));
}

// ============================================================================
// Listing, import and printing
// ============================================================================

#[test]
fn test_asset_list_filters() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    new_asset(&tmp, "Desk", "Furniture", "2026-02-14");
    new_asset(&tmp, "Old van", "Fleet", "2025-06-01");

    creg(tmp.path())
        .args(["asset", "list", "-c", "fleet", "--count"])
        .assert()
        .stdout("2\n");
    creg(tmp.path())
        .args(["asset", "list", "-y", "2026", "-f", "id"])
        .assert()
        .stdout("258-2026-01-01\n258-2026-04-01\n");
}

#[test]
fn test_asset_import_numbers_rows_in_order() {
    let tmp = setup_test_project();
    let csv_path = tmp.path().join("assets.csv");
    fs::write(
        &csv_path,
        "title,category,entry_date,location,value,notes\n\
         Truck,Fleet,2026-02-14,Depot,30000,\n\
         Van,Fleet,2026-02-15,,,\n\
         Drone,Drones,2026-02-16,,,survey\n",
    )
    .unwrap();

    creg(tmp.path())
        .args(["asset", "import", "assets.csv", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("258-2026-04-02"))
        .stdout(predicate::str::contains("258-2026-99-01"));
    creg(tmp.path())
        .args(["asset", "list", "--count"])
        .assert()
        .stdout("0\n");

    creg(tmp.path())
        .args(["asset", "import", "assets.csv"])
        .assert()
        .success();
    creg(tmp.path())
        .args(["asset", "list", "-f", "id"])
        .assert()
        .stdout("258-2026-04-01\n258-2026-04-02\n258-2026-99-01\n");
}

#[test]
fn test_print_documents() {
    let tmp = setup_test_project();
    run_for_id(
        &tmp,
        &["permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "-d", "2026-03-01"],
    );
    creg(tmp.path())
        .args(["permit", "print", "258/2026/01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TEST COUNCIL"))
        .stdout(predicate::str::contains("GARAGE PERMIT No. 258/2026/01"))
        .stdout(predicate::str::contains("J. Smith"));

    run_for_id(
        &tmp,
        &[
            "reqf", "new", "-r", "Parks", "-p", "Spring planting", "-d", "2026-03-01",
            "--item", "Tulip bulbs:200:0.5",
        ],
    );
    creg(tmp.path())
        .args(["reqf", "print", "RF258/2026/01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REQUISITION FORM No. RF258/2026/01"))
        .stdout(predicate::str::contains("1. Tulip bulbs x 200 = 100.00"));

    let id = new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    creg(tmp.path())
        .args(["asset", "tag", &id, "-o", "tag.txt"])
        .assert()
        .success();
    let tag = fs::read_to_string(tmp.path().join("tag.txt")).unwrap();
    assert!(tag.contains("258-2026-04-01"));
    assert!(tag.contains("Fleet (04)"));
}

#[test]
fn test_asset_report() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    creg(tmp.path())
        .args(["asset", "report", "-y", "2026"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Asset Register 2026 - Test Council"))
        .stdout(predicate::str::contains("258-2026-04-01"));
}

// ============================================================================
// Service requests
// ============================================================================

#[test]
fn test_service_request_lifecycle() {
    let tmp = setup_test_project();
    let id = run_for_id(
        &tmp,
        &["request", "new", "--citizen", "A. Citizen", "-s", "Streetlight out", "-p", "high"],
    );
    assert!(id.starts_with("SR-"), "unexpected id {}", id);

    creg(tmp.path())
        .args(["request", "list", "--count"])
        .assert()
        .stdout("1\n");

    creg(tmp.path())
        .args(["request", "update", &id, "--status", "resolved", "--note", "Bulb replaced"])
        .assert()
        .success();

    creg(tmp.path())
        .args(["request", "show", &id, "-f", "yaml"])
        .assert()
        .stdout(predicate::str::contains("resolution: Bulb replaced"));

    // Resolved requests drop out of the default (pending) listing
    creg(tmp.path())
        .args(["request", "list", "--count"])
        .assert()
        .stdout("0\n");
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_clean_project() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    run_for_id(
        &tmp,
        &["permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "-d", "2026-03-01"],
    );
    creg(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All records passed validation"));
}

#[test]
fn test_validate_reports_mismatched_record() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    let path = tmp.path().join("assets/258-2026-04-01.creg.yaml");
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replace("2026-02-14", "2027-02-14")).unwrap();

    creg(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not match"));
}

#[test]
fn test_validate_gaps_fail_only_in_strict_mode() {
    let tmp = setup_test_project();
    new_asset(&tmp, "Truck", "Fleet", "2026-02-14");
    new_asset(&tmp, "Van", "Fleet", "2026-02-14");
    fs::remove_file(tmp.path().join("assets/258-2026-04-01.creg.yaml")).unwrap();

    creg(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing sequence(s) 1"));
    creg(tmp.path())
        .args(["validate", "--strict"])
        .assert()
        .failure();
}

#[test]
fn test_validate_reports_large_gaps_as_ranges() {
    let tmp = setup_test_project();
    let id = run_for_id(
        &tmp,
        &["permit", "new", "--holder", "J. Smith", "-a", "12 Elm Rd", "-d", "2026-03-01"],
    );
    assert_eq!(id, "258/2026/01");
    let original = tmp.path().join("permits/258_2026_01.creg.yaml");
    let content = fs::read_to_string(&original).unwrap();
    fs::write(
        tmp.path().join("permits/258_2026_3000000000.creg.yaml"),
        content.replace("258/2026/01", "258/2026/3000000000"),
    )
    .unwrap();
    fs::remove_file(&original).unwrap();

    creg(tmp.path())
        .args(["validate", "-t", "permit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing sequence(s) 1-2999999999"));
}

// ============================================================================
// Mirror sync
// ============================================================================

#[test]
fn test_sync_push_and_pull() {
    let source = setup_test_project();
    new_asset(&source, "Truck", "Fleet", "2026-02-14");
    new_asset(&source, "Van", "Fleet", "2026-02-15");
    let mirror = TempDir::new().unwrap();
    let mirror_path = mirror.path().to_str().unwrap();

    creg(source.path())
        .args(["sync", "push", "--to", mirror_path])
        .assert()
        .success();
    assert!(mirror.path().join("test-council.json").is_file());

    let target = setup_test_project();
    creg(target.path())
        .args(["sync", "pull", "--from", mirror_path, "--yes"])
        .assert()
        .success();
    creg(target.path())
        .args(["asset", "list", "-f", "id"])
        .assert()
        .stdout("258-2026-04-01\n258-2026-04-02\n");

    // New numbers continue after the restored records
    assert_eq!(new_asset(&target, "Bus", "Fleet", "2026-03-01"), "258-2026-04-03");
}

#[test]
fn test_sync_pull_rejects_other_office() {
    let source = setup_test_project();
    new_asset(&source, "Truck", "Fleet", "2026-02-14");
    let mirror = TempDir::new().unwrap();
    let mirror_path = mirror.path().to_str().unwrap();
    creg(source.path())
        .args(["sync", "push", "--to", mirror_path])
        .assert()
        .success();

    let target = TempDir::new().unwrap();
    creg(target.path())
        .args(["init", "--council", "Test Council", "--office-code", "311"])
        .assert()
        .success();
    creg(target.path())
        .args(["sync", "pull", "--from", mirror_path, "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("office code"));
}

#[test]
fn test_completions_generate() {
    let tmp = TempDir::new().unwrap();
    creg(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("creg"));
}
