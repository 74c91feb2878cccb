//! Filter / page engine for the occurrence review screen.
//!
//! `view` is a pure function over a snapshot of the store. It never re-sorts:
//! the input is expected in canonical order and the output keeps it.

use std::str::FromStr;

use serde::Serialize;
use vigil_core::{Category, Occurrence, Severity, Validation};

use crate::error::ViewError;

/// A single predicate that either matches everything or one exact value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter<T> {
    Any,
    Only(T),
}

// Manual impl: the derive would demand `T: Default`.
impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::Any
    }
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::Any => true,
            Filter::Only(expected) => expected == value,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Filter::Any)
    }
}

impl Filter<String> {
    /// Match optional free-text metadata. An occurrence without the field
    /// only passes `Any`.
    pub fn matches_str(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Filter::Any, _) => true,
            (Filter::Only(expected), Some(v)) => expected == v,
            (Filter::Only(_), None) => false,
        }
    }
}

/// Parses `"any"` (or an empty string) as [`Filter::Any`], anything else as
/// a concrete value.
impl<T: FromStr> FromStr for Filter<T> {
    type Err = T::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
            Ok(Filter::Any)
        } else {
            trimmed.parse().map(Filter::Only)
        }
    }
}

/// AND-combined review filters. The default matches every occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccurrenceFilters {
    /// Case-insensitive substring searched in the category code and label,
    /// the id, and the program name. Empty matches all.
    pub text: String,
    pub severity: Filter<Severity>,
    pub validation: Filter<Validation>,
    pub category: Filter<Category>,
    pub program_category: Filter<String>,
    pub program_name: Filter<String>,
}

impl OccurrenceFilters {
    pub fn is_unfiltered(&self) -> bool {
        self.text.is_empty()
            && self.severity.is_any()
            && self.validation.is_any()
            && self.category.is_any()
            && self.program_category.is_any()
            && self.program_name.is_any()
    }

    /// Whether one occurrence passes every predicate.
    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        self.matches_text(occurrence)
            && self.severity.matches(&occurrence.severity())
            && self.validation.matches(&occurrence.validation())
            && self.category.matches(occurrence.category())
            && self
                .program_category
                .matches_str(occurrence.program_category())
            && self.program_name.matches_str(occurrence.program_name())
    }

    fn matches_text(&self, occurrence: &Occurrence) -> bool {
        if self.text.is_empty() {
            return true;
        }
        let needle = self.text.to_lowercase();
        let category = occurrence.category();
        category.code().to_lowercase().contains(&needle)
            || category.label().to_lowercase().contains(&needle)
            || occurrence.id().to_string().contains(&needle)
            || occurrence
                .program_name()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
    }
}

/// One page of filtered occurrences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceView {
    pub items: Vec<Occurrence>,
    /// Occurrences matching the filters across all pages.
    pub total_count: usize,
    /// Always at least 1, even when nothing matched.
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Filter `occurrences` and cut out page `page` (1-indexed).
///
/// A page past the end (or page 0) yields no items but still reports the
/// correct totals; clamping the requested page is the caller's job.
pub fn view(
    occurrences: &[Occurrence],
    filters: &OccurrenceFilters,
    page: usize,
    page_size: usize,
) -> Result<OccurrenceView, ViewError> {
    if page_size == 0 {
        return Err(ViewError::ZeroPageSize);
    }

    let filtered: Vec<&Occurrence> = occurrences
        .iter()
        .filter(|o| filters.matches(o))
        .collect();

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(page_size).max(1);

    let items = match page.checked_sub(1) {
        Some(index) => {
            let start = index.saturating_mul(page_size).min(total_count);
            let end = start.saturating_add(page_size).min(total_count);
            filtered[start..end].iter().map(|o| Occurrence::clone(o)).collect()
        }
        None => Vec::new(),
    };

    Ok(OccurrenceView {
        items,
        total_count,
        total_pages,
        page,
        page_size,
    })
}
