use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::severity::Severity;
use crate::severity::classify;

// =============================================================================
// Enums
// =============================================================================

/// Kind of broadcast anomaly reported by the detector.
///
/// The known set is closed, but a detector may report a kind this build does
/// not know about. Such values are kept verbatim in [`Category::Other`] and
/// displayed as-is rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    DarkScreen,
    Freeze,
    Lipsync,
    Cut,
    Fade,
    WrongImage,
    ReporterStatic,
    PixelVariance,
    /// Unrecognized category code, preserved exactly as received.
    Other(String),
}

impl Category {
    /// Every known category, in display order.
    pub const KNOWN: [Category; 8] = [
        Category::DarkScreen,
        Category::Freeze,
        Category::Lipsync,
        Category::Cut,
        Category::Fade,
        Category::WrongImage,
        Category::ReporterStatic,
        Category::PixelVariance,
    ];

    /// Wire code of the category.
    pub fn code(&self) -> &str {
        match self {
            Category::DarkScreen => "dark_screen",
            Category::Freeze => "freeze",
            Category::Lipsync => "lipsync",
            Category::Cut => "cut",
            Category::Fade => "fade",
            Category::WrongImage => "wrong_image",
            Category::ReporterStatic => "reporter_static",
            Category::PixelVariance => "pixel_variance",
            Category::Other(code) => code,
        }
    }

    /// Human-readable label. Unknown categories display their raw code.
    pub fn label(&self) -> &str {
        match self {
            Category::DarkScreen => "Dark Screen",
            Category::Freeze => "Frozen Screen",
            Category::Lipsync => "Lip-sync Drift",
            Category::Cut => "Program Cut",
            Category::Fade => "Unexpected Fade",
            Category::WrongImage => "Wrong Image",
            Category::ReporterStatic => "Static Reporter",
            Category::PixelVariance => "Pixel Variance",
            Category::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl From<String> for Category {
    fn from(code: String) -> Self {
        match code.as_str() {
            "dark_screen" => Category::DarkScreen,
            "freeze" => Category::Freeze,
            "lipsync" => Category::Lipsync,
            "cut" => Category::Cut,
            "fade" => Category::Fade,
            "wrong_image" => Category::WrongImage,
            "reporter_static" => Category::ReporterStatic,
            "pixel_variance" => Category::PixelVariance,
            _ => Category::Other(code),
        }
    }
}

impl From<&str> for Category {
    fn from(code: &str) -> Self {
        Category::from(code.to_string())
    }
}

impl std::str::FromStr for Category {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(code) => code,
            known => known.code().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Operator verdict on an occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// Not yet looked at by an operator.
    #[default]
    Unreviewed,
    /// Operator confirmed the anomaly is real.
    Confirmed,
    /// Operator marked the detection as a false positive.
    FalsePositive,
}

impl Validation {
    /// Verdict produced by the validate action.
    pub fn from_verdict(confirmed: bool) -> Self {
        if confirmed {
            Validation::Confirmed
        } else {
            Validation::FalsePositive
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Unreviewed => write!(f, "unreviewed"),
            Validation::Confirmed => write!(f, "confirmed"),
            Validation::FalsePositive => write!(f, "false_positive"),
        }
    }
}

impl std::str::FromStr for Validation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unreviewed" => Ok(Validation::Unreviewed),
            "confirmed" => Ok(Validation::Confirmed),
            "false_positive" => Ok(Validation::FalsePositive),
            _ => Err(format!("Unknown validation status: {}", s)),
        }
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unique identifier for an occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccurrenceId(pub Uuid);

impl OccurrenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OccurrenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for OccurrenceId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(OccurrenceId)
    }
}

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A single detected broadcast anomaly.
///
/// Everything except `validation` is fixed at creation. Severity is not a
/// field: it is recomputed from the duration on every call to
/// [`Occurrence::severity`], so it can never drift from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OccurrenceRecord", into = "OccurrenceRecord")]
pub struct Occurrence {
    id: OccurrenceId,
    category: Category,
    detected_at: DateTime<Utc>,
    duration_secs: u32,
    validation: Validation,
    program_name: Option<String>,
    program_category: Option<String>,
}

impl Occurrence {
    /// Create an unreviewed occurrence with a fresh id.
    pub fn new(category: Category, duration_secs: u32, detected_at: DateTime<Utc>) -> Self {
        Self {
            id: OccurrenceId::new(),
            category,
            detected_at,
            duration_secs,
            validation: Validation::Unreviewed,
            program_name: None,
            program_category: None,
        }
    }

    /// Attach program-guide metadata known at detection time.
    pub fn with_program(
        mut self,
        program_name: Option<String>,
        program_category: Option<String>,
    ) -> Self {
        self.program_name = program_name;
        self.program_category = program_category;
        self
    }

    pub fn id(&self) -> OccurrenceId {
        self.id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn severity(&self) -> Severity {
        classify(self.duration_secs)
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    pub fn program_category(&self) -> Option<&str> {
        self.program_category.as_deref()
    }

    /// Record an operator verdict. Overwrites any previous verdict.
    pub fn set_validation(&mut self, validation: Validation) {
        self.validation = validation;
    }
}

/// Serialized shape of an [`Occurrence`].
///
/// `severity` is emitted for consumers but ignored on input; it is always
/// re-derived from `durationSeconds`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceRecord {
    id: OccurrenceId,
    category: Category,
    #[serde(default, skip_deserializing)]
    severity: Option<Severity>,
    detected_at: DateTime<Utc>,
    duration_seconds: u32,
    #[serde(default)]
    validation: Validation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_category: Option<String>,
}

impl From<OccurrenceRecord> for Occurrence {
    fn from(record: OccurrenceRecord) -> Self {
        Self {
            id: record.id,
            category: record.category,
            detected_at: record.detected_at,
            duration_secs: record.duration_seconds,
            validation: record.validation,
            program_name: record.program_name,
            program_category: record.program_category,
        }
    }
}

impl From<Occurrence> for OccurrenceRecord {
    fn from(o: Occurrence) -> Self {
        Self {
            severity: Some(o.severity()),
            id: o.id,
            category: o.category,
            detected_at: o.detected_at,
            duration_seconds: o.duration_secs,
            validation: o.validation,
            program_name: o.program_name,
            program_category: o.program_category,
        }
    }
}

/// Raw detection as produced by an external detector.
///
/// `duration_secs` is signed so that a malformed negative duration reaches
/// the adapter and is rejected there instead of failing to parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub category: Category,
    #[serde(rename = "durationSeconds")]
    pub duration_secs: i64,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_category: Option<String>,
}

impl DetectionEvent {
    pub fn new(category: impl Into<Category>, duration_secs: i64, detected_at: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            duration_secs,
            detected_at,
            program_name: None,
            program_category: None,
        }
    }
}
