//! Whole-state mirror keyed by council name
//!
//! The complete registry state is exported as a single JSON document per
//! council. Pushing replaces the stored document; pulling replaces local
//! records of every kind with the document's contents. There is no partial
//! update or schema migration.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::category::AssetCategory;
use crate::core::entity::Numbered;
use crate::core::identity::{DocumentKind, OfficeCode};
use crate::core::store::{RecordStore, RecordStoreError};
use crate::entities::{Asset, GaragePermit, Requisition, ServiceRequest};

/// Full registry state for one council
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilSnapshot {
    pub council: String,
    pub office_code: OfficeCode,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<AssetCategory>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub permits: Vec<GaragePermit>,
    #[serde(default)]
    pub requisitions: Vec<Requisition>,
    #[serde(default)]
    pub requests: Vec<ServiceRequest>,
}

/// Record counts restored from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub assets: usize,
    pub permits: usize,
    pub requisitions: usize,
    pub requests: usize,
}

impl CouncilSnapshot {
    /// Read the complete local state
    pub fn capture(
        store: &RecordStore<'_>,
        council: &str,
        office_code: OfficeCode,
        categories: Vec<AssetCategory>,
    ) -> Result<Self, MirrorError> {
        Ok(Self {
            council: council.to_string(),
            office_code,
            exported_at: Utc::now(),
            categories,
            assets: store.list()?,
            permits: store.list()?,
            requisitions: store.list()?,
            requests: store.list()?,
        })
    }

    /// Replace local records with this snapshot's.
    ///
    /// Every kind is checked and staged before any local file is removed, so
    /// a snapshot that cannot be written leaves the local records as they were.
    pub fn restore(&self, store: &RecordStore<'_>) -> Result<RestoreStats, MirrorError> {
        check_kinds(&self.assets)?;
        check_kinds(&self.permits)?;
        check_kinds(&self.requisitions)?;

        let assets = store.stage(&self.assets)?;
        let permits = store.stage(&self.permits)?;
        let requisitions = store.stage(&self.requisitions)?;
        let requests = store.stage(&self.requests)?;

        let stats = RestoreStats {
            assets: assets.apply()?,
            permits: permits.apply()?,
            requisitions: requisitions.apply()?,
            requests: requests.apply()?,
        };
        tracing::info!(council = %self.council, ?stats, "restored snapshot");
        Ok(stats)
    }

    pub fn record_count(&self) -> usize {
        self.assets.len() + self.permits.len() + self.requisitions.len() + self.requests.len()
    }
}

fn check_kinds<T: Numbered>(records: &[T]) -> Result<(), MirrorError> {
    match records.iter().find(|r| r.document_id().kind() != T::KIND) {
        Some(record) => Err(MirrorError::WrongKind {
            id: record.document_id().to_string(),
            expected: T::KIND,
        }),
        None => Ok(()),
    }
}

/// Somewhere a snapshot can be pushed to and pulled from
pub trait MirrorBackend {
    /// Human-readable location of a council's document
    fn location(&self, council: &str) -> String;

    /// Upsert the whole document for the snapshot's council
    fn push(&self, snapshot: &CouncilSnapshot) -> Result<(), MirrorError>;

    /// Fetch the document for a council, if one exists
    fn pull(&self, council: &str) -> Result<Option<CouncilSnapshot>, MirrorError>;
}

/// Stored document wrapper
#[derive(Debug, Serialize, Deserialize)]
struct MirrorDocument {
    council: String,
    sha256: String,
    snapshot: serde_json::Value,
}

/// Mirror that keeps one JSON file per council in a directory
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, council: &str) -> PathBuf {
        self.dir.join(format!("{}.json", council_slug(council)))
    }
}

impl MirrorBackend for FileMirror {
    fn location(&self, council: &str) -> String {
        self.document_path(council).display().to_string()
    }

    fn push(&self, snapshot: &CouncilSnapshot) -> Result<(), MirrorError> {
        fs::create_dir_all(&self.dir)?;
        let value = serde_json::to_value(snapshot)?;
        let doc = MirrorDocument {
            council: snapshot.council.clone(),
            sha256: digest(&value)?,
            snapshot: value,
        };

        let path = self.document_path(&snapshot.council);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&doc)?)?;
        fs::rename(&tmp, &path)?;

        tracing::info!(council = %snapshot.council, path = %path.display(), records = snapshot.record_count(), "pushed snapshot");
        Ok(())
    }

    fn pull(&self, council: &str) -> Result<Option<CouncilSnapshot>, MirrorError> {
        let path = self.document_path(council);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let doc: MirrorDocument = serde_json::from_str(&content)?;

        if doc.sha256 != digest(&doc.snapshot)? {
            return Err(MirrorError::DigestMismatch(path));
        }
        let snapshot: CouncilSnapshot = serde_json::from_value(doc.snapshot)?;
        if council_slug(&snapshot.council) != council_slug(council) {
            return Err(MirrorError::CouncilMismatch {
                expected: council.to_string(),
                found: snapshot.council,
            });
        }
        Ok(Some(snapshot))
    }
}

/// Digest of the canonical (sorted-key) JSON form
fn digest(value: &serde_json::Value) -> Result<String, MirrorError> {
    let canonical = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Filesystem-safe key for a council name
pub fn council_slug(council: &str) -> String {
    let mut slug = String::with_capacity(council.len());
    for c in council.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Check that a pulled snapshot belongs to this office
pub fn ensure_office(snapshot: &CouncilSnapshot, office: &OfficeCode) -> Result<(), MirrorError> {
    if &snapshot.office_code != office {
        return Err(MirrorError::OfficeMismatch {
            expected: office.to_string(),
            found: snapshot.office_code.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror document {0:?} failed its integrity check")]
    DigestMismatch(PathBuf),

    #[error("mirror document belongs to council '{found}', expected '{expected}'")]
    CouncilMismatch { expected: String, found: String },

    #[error("mirror document uses office code {found}, this project uses {expected}")]
    OfficeMismatch { expected: String, found: String },

    #[error("mirror document lists {id} among the {expected} records")]
    WrongKind { id: String, expected: DocumentKind },

    #[error(transparent)]
    Store(#[from] RecordStoreError),

    #[error("mirror JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::CategoryRegistry;
    use crate::core::project::Project;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn office() -> OfficeCode {
        OfficeCode::new("258").unwrap()
    }

    #[test]
    fn test_council_slug() {
        assert_eq!(council_slug("Springfield Municipal Council"), "springfield-municipal-council");
        assert_eq!(council_slug("  St. Mary's -- Ward 3 "), "st-mary-s-ward-3");
    }

    #[test]
    fn test_push_pull_roundtrip() {
        let tmp = tempdir().unwrap();
        let project = Project::init(&tmp.path().join("p"), "Test Council", &office()).unwrap();
        let store = RecordStore::new(&project);
        store
            .create(&Asset::new(
                "258-2026-04-01".parse().unwrap(),
                "Truck".into(),
                "Fleet".into(),
                NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
                "Test Author".into(),
            ))
            .unwrap();

        let snapshot =
            CouncilSnapshot::capture(&store, "Test Council", office(), CategoryRegistry::defaults()).unwrap();
        assert_eq!(snapshot.record_count(), 1);

        let mirror = FileMirror::new(tmp.path().join("mirror"));
        mirror.push(&snapshot).unwrap();
        assert!(tmp.path().join("mirror/test-council.json").exists());

        let pulled = mirror.pull("Test Council").unwrap().unwrap();
        assert_eq!(pulled, snapshot);

        store.replace_all::<Asset>(&[]).unwrap();
        let stats = pulled.restore(&store).unwrap();
        assert_eq!(stats.assets, 1);
        assert_eq!(store.list::<Asset>().unwrap()[0].id.to_string(), "258-2026-04-01");
    }

    fn empty_snapshot() -> CouncilSnapshot {
        CouncilSnapshot {
            council: "Test Council".into(),
            office_code: office(),
            exported_at: Utc::now(),
            categories: Vec::new(),
            assets: Vec::new(),
            permits: Vec::new(),
            requisitions: Vec::new(),
            requests: Vec::new(),
        }
    }

    fn fleet_asset(id: &str) -> Asset {
        Asset::new(
            id.parse().unwrap(),
            "Truck".into(),
            "Fleet".into(),
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            "Test Author".into(),
        )
    }

    fn asset_ids(store: &RecordStore<'_>) -> Vec<String> {
        let mut ids = store.existing_ids::<Asset>();
        ids.sort();
        ids
    }

    #[test]
    fn test_restore_with_duplicate_ids_keeps_local_records() {
        let tmp = tempdir().unwrap();
        let project = Project::init(&tmp.path().join("p"), "Test Council", &office()).unwrap();
        let store = RecordStore::new(&project);
        for id in ["258-2026-04-01", "258-2026-04-02", "258-2026-04-03"] {
            store.create(&fleet_asset(id)).unwrap();
        }
        store
            .create(&GaragePermit::new(
                "258/2026/01".parse().unwrap(),
                "Holder".into(),
                "1 Main St".into(),
                NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
                "Test Author".into(),
            ))
            .unwrap();

        let mut snapshot = empty_snapshot();
        snapshot.assets = vec![fleet_asset("258-2026-04-09"), fleet_asset("258-2026-04-09")];

        let err = snapshot.restore(&store).unwrap_err();
        assert!(matches!(err, MirrorError::Store(RecordStoreError::Duplicate(_))));
        assert_eq!(
            asset_ids(&store),
            vec!["258-2026-04-01", "258-2026-04-02", "258-2026-04-03"]
        );
        assert_eq!(store.existing_ids::<GaragePermit>(), vec!["258/2026/01"]);
    }

    #[test]
    fn test_restore_rejects_records_of_the_wrong_kind() {
        let tmp = tempdir().unwrap();
        let project = Project::init(&tmp.path().join("p"), "Test Council", &office()).unwrap();
        let store = RecordStore::new(&project);
        store.create(&fleet_asset("258-2026-04-01")).unwrap();

        let mut snapshot = empty_snapshot();
        let mut stray = fleet_asset("258-2026-04-02");
        stray.id = "258/2026/02".parse().unwrap();
        snapshot.assets = vec![stray];

        let err = snapshot.restore(&store).unwrap_err();
        assert!(matches!(err, MirrorError::WrongKind { .. }));
        assert_eq!(asset_ids(&store), vec!["258-2026-04-01"]);
    }

    #[test]
    fn test_pull_missing_council_is_none() {
        let tmp = tempdir().unwrap();
        let mirror = FileMirror::new(tmp.path());
        assert!(mirror.pull("Nobody").unwrap().is_none());
    }

    #[test]
    fn test_tampered_document_fails_digest() {
        let tmp = tempdir().unwrap();
        let mirror = FileMirror::new(tmp.path());
        let snapshot = CouncilSnapshot {
            council: "Test Council".into(),
            office_code: office(),
            exported_at: Utc::now(),
            categories: Vec::new(),
            assets: Vec::new(),
            permits: Vec::new(),
            requisitions: Vec::new(),
            requests: Vec::new(),
        };
        mirror.push(&snapshot).unwrap();

        let path = tmp.path().join("test-council.json");
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("\"258\"", "\"259\"")).unwrap();

        assert!(matches!(
            mirror.pull("Test Council"),
            Err(MirrorError::DigestMismatch(_))
        ));
    }

    #[test]
    fn test_office_mismatch_detected() {
        let snapshot = CouncilSnapshot {
            council: "Test Council".into(),
            office_code: office(),
            exported_at: Utc::now(),
            categories: Vec::new(),
            assets: Vec::new(),
            permits: Vec::new(),
            requisitions: Vec::new(),
            requests: Vec::new(),
        };
        assert!(ensure_office(&snapshot, &office()).is_ok());
        assert!(ensure_office(&snapshot, &OfficeCode::new("300").unwrap()).is_err());
    }
}
