//! Sequential document ID allocation
//!
//! Identifiers are allocated in two phases:
//!
//! - [`Allocator::preview`] is read-only and cheap. It is recomputed whenever
//!   the classification or effective date changes and may race with other
//!   writers, so its result must never be persisted.
//! - [`Allocator::commit`] re-derives the group and atomically reserves the
//!   next sequence in the [`SequenceStore`]. Only committed identifiers are
//!   written to records.
//!
//! [`allocate`] is the underlying pure rule: count the identifiers that start
//! with the group key and add one.

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::core::category::{CategoryRegistry, Resolved};
use crate::core::identity::{
    ClassCode, DocumentId, DocumentKind, GroupKey, OfficeCode, Period, SEQUENCE_WIDTH,
};
use crate::core::sequence::{SequenceStore, SequenceStoreError};

/// Attempts made by [`Allocator::commit`] before giving up on a group
pub const MAX_COMMIT_ATTEMPTS: usize = 8;

/// Compute the next identifier for `key` from the existing identifiers alone.
///
/// Identifiers of other groups are ignored. The result is unique among
/// `existing_ids` at the moment of computation, assuming a single writer.
pub fn allocate<S: AsRef<str>>(existing_ids: &[S], kind: DocumentKind, key: &GroupKey) -> String {
    let count = count_in_group(existing_ids, key);
    kind.format_id(key, count.saturating_add(1))
}

/// Number of identifiers that start with the group key
pub fn count_in_group<S: AsRef<str>>(existing_ids: &[S], key: &GroupKey) -> u32 {
    let count = existing_ids
        .iter()
        .filter(|id| key.is_prefix_of(id.as_ref()))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Highest sequence already used in the group.
///
/// This is at least the prefix count, and also covers collections with gaps
/// (e.g. after a record was deleted or imported out of order).
pub fn group_floor<S: AsRef<str>>(existing_ids: &[S], kind: DocumentKind, key: &GroupKey) -> u32 {
    let highest = existing_ids
        .iter()
        .filter_map(|id| DocumentId::parse_kind(kind, id.as_ref()).ok())
        .filter(|id| &id.group_key() == key)
        .map(|id| id.sequence())
        .max()
        .unwrap_or(0);
    highest.max(count_in_group(existing_ids, key))
}

/// What the caller wants an identifier for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub kind: DocumentKind,
    /// Category name (assets only; ignored for other kinds)
    pub category: Option<String>,
    /// Effective date, which determines the period
    pub date: NaiveDate,
}

impl AllocationRequest {
    pub fn new(kind: DocumentKind, date: NaiveDate) -> Self {
        Self {
            kind,
            category: None,
            date,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Group derived from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: DocumentKind,
    pub key: GroupKey,
    pub period: Period,
    pub class: Option<ClassCode>,
    /// Registered category name (assets whose category was found)
    pub category: Option<String>,
}

impl Group {
    /// True when an asset's category was unknown and the fallback code is used
    pub fn used_fallback(&self) -> bool {
        self.class.as_ref().is_some_and(|c| c.is_fallback())
    }
}

/// An identifier produced by preview or commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: DocumentId,
    pub group: Group,
}

/// Allocator bound to one office, its category registry and a sequence store
pub struct Allocator<S: SequenceStore> {
    office: OfficeCode,
    categories: CategoryRegistry,
    store: S,
}

impl<S: SequenceStore> Allocator<S> {
    pub fn new(office: OfficeCode, categories: CategoryRegistry, store: S) -> Self {
        Self {
            office,
            categories,
            store,
        }
    }

    pub fn office(&self) -> &OfficeCode {
        &self.office
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Derive the group for a request
    pub fn group(&self, request: &AllocationRequest) -> Result<Group, AllocationError> {
        let period = Period::from_date(request.date)
            .map_err(|_| AllocationError::PeriodOutOfRange { date: request.date })?;
        let (class, category) = if request.kind.uses_class_code() {
            let Resolved { code, name } = self.categories.resolve(request.category.as_deref());
            (Some(code), name)
        } else {
            (None, None)
        };
        let key = request.kind.group_key(&self.office, period, class.as_ref());
        Ok(Group {
            kind: request.kind,
            key,
            period,
            class,
            category,
        })
    }

    fn document_id(&self, group: &Group, sequence: u32) -> DocumentId {
        DocumentId::new(
            group.kind,
            self.office.clone(),
            group.period,
            group.class.clone(),
            sequence,
        )
    }

    /// Read-only look at the identifier a commit would most likely produce.
    ///
    /// Calling this twice against the same `existing_ids` and store state
    /// returns the same identifier.
    pub fn preview<T: AsRef<str>>(
        &self,
        request: &AllocationRequest,
        existing_ids: &[T],
    ) -> Result<Allocation, AllocationError> {
        let group = self.group(request)?;
        let floor = group_floor(existing_ids, group.kind, &group.key);
        let last = self.store.last_issued(&group.key)?;
        let sequence = floor
            .max(last)
            .checked_add(1)
            .ok_or_else(|| AllocationError::Exhausted {
                group: group.key.to_string(),
                attempts: 0,
            })?;

        let id = self.document_id(&group, sequence);
        tracing::debug!(group = %group.key, %id, "previewed identifier");
        Ok(Allocation { id, group })
    }

    /// Authoritatively allocate an identifier, reserving its sequence.
    ///
    /// The returned identifier is not present in `existing_ids` and its
    /// sequence will never be handed out again by the same store.
    pub fn commit<T: AsRef<str>>(
        &self,
        request: &AllocationRequest,
        existing_ids: &[T],
    ) -> Result<Allocation, AllocationError> {
        let group = self.group(request)?;
        let taken: HashSet<&str> = existing_ids.iter().map(|s| s.as_ref()).collect();
        let floor = group_floor(existing_ids, group.kind, &group.key);

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let sequence = self.store.reserve(&group.key, floor)?;
            let id = self.document_id(&group, sequence);
            let text = id.to_string();

            if taken.contains(text.as_str()) {
                tracing::warn!(group = %group.key, id = %text, attempt, "identifier already taken, retrying");
                continue;
            }

            if sequence >= 10u32.pow(SEQUENCE_WIDTH as u32) {
                tracing::warn!(group = %group.key, sequence, "sequence wider than {} digits", SEQUENCE_WIDTH);
            }
            tracing::info!(group = %group.key, %id, "committed identifier");
            return Ok(Allocation { id, group });
        }

        Err(AllocationError::Exhausted {
            group: group.key.to_string(),
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("could not allocate a free identifier in group '{group}' after {attempts} attempt(s)")]
    Exhausted { group: String, attempts: usize },

    #[error("effective date {date} has no four-digit year")]
    PeriodOutOfRange { date: NaiveDate },

    #[error(transparent)]
    Store(#[from] SequenceStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::MemorySequenceStore;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocator() -> Allocator<MemorySequenceStore> {
        Allocator::new(
            OfficeCode::new("258").unwrap(),
            CategoryRegistry::new(CategoryRegistry::defaults()).unwrap(),
            MemorySequenceStore::new(),
        )
    }

    fn fleet(y: i32, m: u32, d: u32) -> AllocationRequest {
        AllocationRequest::new(DocumentKind::Asset, date(y, m, d)).with_category("Fleet")
    }

    #[test]
    fn test_pure_allocate_sequential_calls_are_unique() {
        let alloc = allocator();
        let key = alloc.group(&fleet(2026, 3, 1)).unwrap().key;
        let mut existing: Vec<String> = Vec::new();

        for n in 1..=120u32 {
            let id = allocate(&existing, DocumentKind::Asset, &key);
            assert_eq!(id, format!("258-2026-04-{:02}", n));
            existing.push(id);
        }

        let unique: HashSet<&String> = existing.iter().collect();
        assert_eq!(unique.len(), 120);
        assert_eq!(existing[0], "258-2026-04-01");
        assert_eq!(existing[98], "258-2026-04-99");
        assert_eq!(existing[99], "258-2026-04-100");
    }

    #[test]
    fn test_grouping_independence() {
        let alloc = allocator();
        let fleet_key = alloc.group(&fleet(2026, 3, 1)).unwrap().key;
        let furniture_key = alloc
            .group(&AllocationRequest::new(DocumentKind::Asset, date(2026, 3, 1)).with_category("Furniture"))
            .unwrap()
            .key;

        let existing = vec![
            "258-2026-01-01".to_string(),
            "258-2026-01-02".to_string(),
            "258-2026-01-03".to_string(),
            "258-2025-04-01".to_string(),
        ];
        assert_eq!(allocate(&existing, DocumentKind::Asset, &fleet_key), "258-2026-04-01");
        assert_eq!(allocate(&existing, DocumentKind::Asset, &furniture_key), "258-2026-01-04");
    }

    #[test]
    fn test_unknown_category_uses_fallback_code() {
        let alloc = allocator();
        let request =
            AllocationRequest::new(DocumentKind::Asset, date(2026, 3, 1)).with_category("Hovercraft");
        let allocation = alloc.commit(&request, &Vec::<String>::new()).unwrap();

        assert_eq!(allocation.id.to_string(), "258-2026-99-01");
        assert!(allocation.group.used_fallback());
        assert_eq!(allocation.group.category, None);
    }

    #[test]
    fn test_preview_is_idempotent() {
        let alloc = allocator();
        let existing = vec!["258-2026-04-01".to_string()];

        let first = alloc.preview(&fleet(2026, 2, 14), &existing).unwrap();
        let second = alloc.preview(&fleet(2026, 2, 14), &existing).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id.to_string(), "258-2026-04-02");
        // Preview must not reserve anything
        assert_eq!(alloc.store().last_issued(&first.group.key).unwrap(), 0);
    }

    #[test]
    fn test_year_rollover_starts_new_group() {
        let alloc = allocator();
        let mut existing: Vec<String> = Vec::new();

        let dec = alloc.commit(&fleet(2025, 12, 31), &existing).unwrap();
        existing.push(dec.id.to_string());
        let jan = alloc.commit(&fleet(2026, 1, 1), &existing).unwrap();

        assert_ne!(dec.group.key, jan.group.key);
        assert_eq!(dec.id.to_string(), "258-2025-04-01");
        assert_eq!(jan.id.to_string(), "258-2026-04-01");
    }

    #[test]
    fn test_fleet_example() {
        let alloc = allocator();
        let existing = vec!["258-2026-04-01".to_string()];

        let key = alloc.group(&fleet(2026, 2, 14)).unwrap().key;
        assert_eq!(allocate(&existing, DocumentKind::Asset, &key), "258-2026-04-02");

        let committed = alloc.commit(&fleet(2026, 2, 14), &existing).unwrap();
        assert_eq!(committed.id.to_string(), "258-2026-04-02");
    }

    #[test]
    fn test_commit_against_stale_snapshot_never_repeats() {
        let alloc = allocator();
        let snapshot = vec!["258-2026-04-01".to_string()];

        // Two creation flows that both read the same snapshot
        let a = alloc.commit(&fleet(2026, 2, 14), &snapshot).unwrap();
        let b = alloc.commit(&fleet(2026, 2, 14), &snapshot).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.id.to_string(), "258-2026-04-02");
        assert_eq!(b.id.to_string(), "258-2026-04-03");
    }

    #[test]
    fn test_preview_accounts_for_reserved_sequences() {
        let alloc = allocator();
        let snapshot: Vec<String> = Vec::new();
        alloc.commit(&fleet(2026, 2, 14), &snapshot).unwrap();

        // Record not yet visible in the snapshot, but the store knows about it
        let preview = alloc.preview(&fleet(2026, 2, 14), &snapshot).unwrap();
        assert_eq!(preview.id.to_string(), "258-2026-04-02");
    }

    #[test]
    fn test_commit_skips_past_gaps() {
        let alloc = allocator();
        let existing = vec!["258-2026-04-01".to_string(), "258-2026-04-05".to_string()];

        assert_eq!(group_floor(&existing, DocumentKind::Asset, &alloc.group(&fleet(2026, 1, 1)).unwrap().key), 5);
        let committed = alloc.commit(&fleet(2026, 7, 1), &existing).unwrap();
        assert_eq!(committed.id.to_string(), "258-2026-04-06");
    }

    #[test]
    fn test_permits_and_requisitions_ignore_category() {
        let alloc = allocator();
        let existing = vec!["258/2026/01".to_string(), "RF258/2026/01".to_string()];

        let permit = alloc
            .commit(
                &AllocationRequest::new(DocumentKind::GaragePermit, date(2026, 4, 2)).with_category("Fleet"),
                &existing,
            )
            .unwrap();
        assert_eq!(permit.id.to_string(), "258/2026/02");
        assert!(permit.group.class.is_none());

        let req = alloc
            .commit(
                &AllocationRequest::new(DocumentKind::Requisition, date(2026, 4, 2)),
                &existing,
            )
            .unwrap();
        assert_eq!(req.id.to_string(), "RF258/2026/02");
    }

    #[test]
    fn test_permit_prefix_does_not_count_requisitions() {
        let alloc = allocator();
        let key = alloc
            .group(&AllocationRequest::new(DocumentKind::GaragePermit, date(2026, 1, 1)))
            .unwrap()
            .key;
        let existing = vec!["RF258/2026/01".to_string(), "RF258/2026/02".to_string()];
        assert_eq!(count_in_group(&existing, &key), 0);
    }

    #[test]
    fn test_commit_widens_past_99() {
        let alloc = allocator();
        let existing: Vec<String> = (1..=99).map(|n| format!("258/2026/{:02}", n)).collect();
        let permit = alloc
            .commit(
                &AllocationRequest::new(DocumentKind::GaragePermit, date(2026, 9, 9)),
                &existing,
            )
            .unwrap();
        assert_eq!(permit.id.to_string(), "258/2026/100");
    }

    #[test]
    fn test_commit_rejects_dates_without_four_digit_year() {
        let alloc = allocator();
        let existing: Vec<String> = Vec::new();

        for year in [10000, -5] {
            let err = alloc.commit(&fleet(year, 3, 1), &existing).unwrap_err();
            assert!(matches!(err, AllocationError::PeriodOutOfRange { .. }));
            assert!(alloc.preview(&fleet(year, 3, 1), &existing).is_err());
        }
        // Nothing was reserved for the rejected requests
        assert!(alloc.store().groups().unwrap().is_empty());
    }
}
