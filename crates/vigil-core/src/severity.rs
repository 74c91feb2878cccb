//! Duration-based severity grading.
//!
//! An occurrence's severity is never stored independently: it is always
//! recomputed from the occurrence duration through [`classify`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the C band, in seconds.
pub const C_MAX_SECS: u32 = 4;
/// Upper bound (inclusive) of the B band, in seconds.
pub const B_MAX_SECS: u32 = 9;
/// Upper bound (inclusive) of the A band, in seconds. Anything longer is X.
pub const A_MAX_SECS: u32 = 59;

/// Anomaly grade, from lightest (C) to most severe (X).
///
/// The derived ordering follows that rank: `C < B < A < X`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    C,
    B,
    A,
    X,
}

impl Severity {
    /// All levels in ascending rank.
    pub const ALL: [Severity; 4] = [Severity::C, Severity::B, Severity::A, Severity::X];

    /// Single-letter code used in filters and on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Severity::C => "C",
            Severity::B => "B",
            Severity::A => "A",
            Severity::X => "X",
        }
    }

    /// Short badge label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::C => "Level C",
            Severity::B => "Level B",
            Severity::A => "Level A",
            Severity::X => "Level X",
        }
    }

    /// Operator-facing description of the band.
    pub fn description(&self) -> &'static str {
        match self {
            Severity::C => "Minor occurrence (≤ 4 seconds)",
            Severity::B => "Moderate occurrence (≤ 9 seconds)",
            Severity::A => "Severe occurrence (≤ 59 seconds)",
            Severity::X => "Critical occurrence (≥ 60 seconds)",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Severity::C),
            "B" => Ok(Severity::B),
            "A" => Ok(Severity::A),
            "X" => Ok(Severity::X),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Grade an anomaly by how long it lasted.
///
/// `≤ 4 → C`, `5..=9 → B`, `10..=59 → A`, `≥ 60 → X`.
pub fn classify(duration_secs: u32) -> Severity {
    if duration_secs <= C_MAX_SECS {
        Severity::C
    } else if duration_secs <= B_MAX_SECS {
        Severity::B
    } else if duration_secs <= A_MAX_SECS {
        Severity::A
    } else {
        Severity::X
    }
}
