//! In-memory occurrence store.
//!
//! Occurrences are kept in canonical read order: most recent `detected_at`
//! first, ties broken by insertion order with the newest insert first. The
//! only mutation after insertion is the operator verdict.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use vigil_core::{Occurrence, OccurrenceId, Severity, Validation};

use crate::error::{StoreError, ViewError};
use crate::view::{view, OccurrenceFilters, OccurrenceView};

/// Occurrence counts per review status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub unreviewed: usize,
    pub confirmed: usize,
    pub false_positive: usize,
}

/// Occurrence counts per severity level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    #[serde(rename = "C")]
    pub c: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "X")]
    pub x: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::C => self.c,
            Severity::B => self.b,
            Severity::A => self.a,
            Severity::X => self.x,
        }
    }
}

#[derive(Default)]
struct Entries {
    occurrences: Vec<Occurrence>,
    // Mirrors the ids in `occurrences`.
    ids: HashSet<OccurrenceId>,
}

/// Thread-safe occurrence store.
pub struct OccurrenceStore {
    entries: Mutex<Entries>,
}

impl OccurrenceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
        }
    }

    fn write(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    // Every mutation is a single insert or field assignment, so the data
    // behind a poisoned lock is still consistent for readers.
    fn read(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new occurrence at its canonical position.
    ///
    /// Fails with [`StoreError::DuplicateId`] if the id is already present,
    /// leaving the store untouched.
    pub fn insert(&self, occurrence: Occurrence) -> Result<(), StoreError> {
        let mut entries = self.write()?;

        if entries.ids.contains(&occurrence.id()) {
            return Err(StoreError::DuplicateId(occurrence.id()));
        }

        let detected_at = occurrence.detected_at();
        let position = entries
            .occurrences
            .partition_point(|o| o.detected_at() > detected_at);

        tracing::info!(
            id = %occurrence.id(),
            category = %occurrence.category(),
            severity = %occurrence.severity(),
            duration_secs = occurrence.duration_secs(),
            "Occurrence stored"
        );
        entries.ids.insert(occurrence.id());
        entries.occurrences.insert(position, occurrence);
        Ok(())
    }

    /// Record the operator verdict: `Confirmed` if `confirmed`, otherwise
    /// `FalsePositive`.
    ///
    /// Repeated calls overwrite the previous verdict. Unknown ids fail with
    /// [`StoreError::NotFound`] and change nothing.
    pub fn set_validation(&self, id: OccurrenceId, confirmed: bool) -> Result<Occurrence, StoreError> {
        let mut entries = self.write()?;

        let occurrence = entries
            .occurrences
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or(StoreError::NotFound(id))?;

        let validation = Validation::from_verdict(confirmed);
        if occurrence.validation() != Validation::Unreviewed
            && occurrence.validation() != validation
        {
            tracing::info!(
                id = %id,
                from = %occurrence.validation(),
                to = %validation,
                "Overwriting previous verdict"
            );
        }
        occurrence.set_validation(validation);
        tracing::info!(id = %id, validation = %validation, "Occurrence validated");

        Ok(occurrence.clone())
    }

    /// Owned snapshot of every occurrence in canonical order.
    pub fn all(&self) -> Vec<Occurrence> {
        self.read().occurrences.clone()
    }

    /// Look up one occurrence. Absence is not an error.
    pub fn find(&self, id: OccurrenceId) -> Option<Occurrence> {
        let entries = self.read();
        if !entries.ids.contains(&id) {
            return None;
        }
        entries.occurrences.iter().find(|o| o.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().occurrences.is_empty()
    }

    /// Run the filter/page engine over a snapshot of the store.
    pub fn view(
        &self,
        filters: &OccurrenceFilters,
        page: usize,
        page_size: usize,
    ) -> Result<OccurrenceView, ViewError> {
        let snapshot = self.all();
        view(&snapshot, filters, page, page_size)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for o in self.read().occurrences.iter() {
            match o.validation() {
                Validation::Unreviewed => counts.unreviewed += 1,
                Validation::Confirmed => counts.confirmed += 1,
                Validation::FalsePositive => counts.false_positive += 1,
            }
        }
        counts
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for o in self.read().occurrences.iter() {
            match o.severity() {
                Severity::C => counts.c += 1,
                Severity::B => counts.b += 1,
                Severity::A => counts.a += 1,
                Severity::X => counts.x += 1,
            }
        }
        counts
    }

    /// Distinct program names present in the store, sorted.
    pub fn program_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .read()
            .occurrences
            .iter()
            .filter_map(|o| o.program_name().map(str::to_string))
            .collect();
        names.into_iter().collect()
    }

    /// Distinct program categories present in the store, sorted.
    pub fn program_categories(&self) -> Vec<String> {
        let categories: BTreeSet<String> = self
            .read()
            .occurrences
            .iter()
            .filter_map(|o| o.program_category().map(str::to_string))
            .collect();
        categories.into_iter().collect()
    }
}

impl Default for OccurrenceStore {
    fn default() -> Self {
        Self::new()
    }
}
