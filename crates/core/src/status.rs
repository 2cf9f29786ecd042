//! Canonical job states and the provider status-vocabulary translator.
//!
//! The provider reports task status as free-form strings with inconsistent
//! casing and several synonyms per state. All translation happens through
//! the single [`STATUS_SYNONYMS`] table so a new synonym is a one-line
//! addition rather than another scattered string comparison.

use serde::{Deserialize, Serialize};

/// Normalized job status, independent of provider-specific strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    /// Accepted by the provider, not yet executing.
    Pending,
    /// Executing on the provider.
    Running,
    /// Finished successfully; artifacts are available.
    Completed,
    /// The provider reported a failure.
    Failed,
    /// Terminated by the caller.
    Cancelled,
    /// The polling ceiling was exceeded (locally or provider-side).
    TimedOut,
}

impl CanonicalStatus {
    /// Terminal states are absorbing: no further transitions occur.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CanonicalStatus::Pending | CanonicalStatus::Running)
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Running => "running",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Failed => "failed",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known provider status strings and their canonical meaning.
///
/// Matching is case-insensitive. Keep this table exhaustive for every
/// synonym the provider has been observed to emit.
pub const STATUS_SYNONYMS: &[(&str, CanonicalStatus)] = &[
    ("SUCCESS", CanonicalStatus::Completed),
    ("SUCCEEDED", CanonicalStatus::Completed),
    ("COMPLETED", CanonicalStatus::Completed),
    ("FINISHED", CanonicalStatus::Completed),
    ("RUNNING", CanonicalStatus::Running),
    ("PROCESSING", CanonicalStatus::Running),
    ("IN_PROGRESS", CanonicalStatus::Running),
    ("GENERATING", CanonicalStatus::Running),
    ("PENDING", CanonicalStatus::Pending),
    ("QUEUED", CanonicalStatus::Pending),
    ("WAITING", CanonicalStatus::Pending),
    ("CREATED", CanonicalStatus::Pending),
    ("SUBMITTED", CanonicalStatus::Pending),
    ("FAILED", CanonicalStatus::Failed),
    ("ERROR", CanonicalStatus::Failed),
    ("CANCELLED", CanonicalStatus::Cancelled),
    ("CANCELED", CanonicalStatus::Cancelled),
    ("TIMEOUT", CanonicalStatus::TimedOut),
    ("TIMED_OUT", CanonicalStatus::TimedOut),
];

/// Outcome of translating a raw provider status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTranslation {
    /// The string mapped to a canonical state.
    Recognized(CanonicalStatus),
    /// Unknown vocabulary; the raw string is preserved unmodified and
    /// treated as non-terminal so polling continues through provider
    /// vocabulary drift.
    Unrecognized(String),
}

impl StatusTranslation {
    /// Whether polling can stop on this translation.
    pub fn is_terminal(&self) -> bool {
        match self {
            StatusTranslation::Recognized(status) => status.is_terminal(),
            StatusTranslation::Unrecognized(_) => false,
        }
    }

    /// The canonical state to report while this translation is current.
    /// Unrecognized vocabulary is reported as [`CanonicalStatus::Running`]
    /// since the provider is still doing *something* with the task.
    pub fn observed_status(&self) -> CanonicalStatus {
        match self {
            StatusTranslation::Recognized(status) => *status,
            StatusTranslation::Unrecognized(_) => CanonicalStatus::Running,
        }
    }
}

/// Translate a raw provider status string into the canonical vocabulary.
pub fn translate_status(raw: &str) -> StatusTranslation {
    let needle = raw.trim();
    for (synonym, status) in STATUS_SYNONYMS {
        if synonym.eq_ignore_ascii_case(needle) {
            return StatusTranslation::Recognized(*status);
        }
    }
    StatusTranslation::Unrecognized(raw.to_string())
}

/// Whether `from -> to` is a legal move through the status DAG:
/// `Pending -> Running -> {Completed | Failed | TimedOut}`, with
/// `Cancelled` reachable from `Pending`/`Running` only. Terminal states
/// are absorbing and a self-transition is not a transition.
pub fn can_transition(from: CanonicalStatus, to: CanonicalStatus) -> bool {
    if from.is_terminal() || from == to {
        return false;
    }
    match to {
        CanonicalStatus::Pending => false,
        CanonicalStatus::Running => from == CanonicalStatus::Pending,
        CanonicalStatus::Completed
        | CanonicalStatus::Failed
        | CanonicalStatus::TimedOut
        | CanonicalStatus::Cancelled => {
            matches!(from, CanonicalStatus::Pending | CanonicalStatus::Running)
        }
    }
}

/// A single transport-independent status observation for a task.
///
/// Whether it came from the provider directly or from a backend relaying
/// the provider, the poll loop only ever sees this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    /// Raw status string as reported, untranslated.
    pub raw_status: String,
    /// Explicit numeric progress (0-100) when the provider supplies one.
    pub progress: Option<u8>,
}
