//! Vigil occurrence storage and review queries.
//!
//! Holds the in-memory occurrence store in canonical (most recent first)
//! order, and the pure filter/page engine the review screen reads through.

pub mod error;
pub mod store;
pub mod view;

pub use error::{StoreError, ViewError};
pub use store::{OccurrenceStore, SeverityCounts, StatusCounts};
pub use view::{view, Filter, OccurrenceFilters, OccurrenceView};
