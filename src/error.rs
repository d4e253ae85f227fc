//! Error types for `phasekeeper`
//!
//! Tracker operations report one of three discriminated failures
//! (`NotFound`, `InvalidState`, `StoreFailure`). The CLI shell wraps
//! them, together with configuration and I/O failures, into
//! [`PhaseKeeperError`] and maps each to a process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `phasekeeper` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Unknown participant or phase
    pub const NOT_FOUND: i32 = 4;

    /// Transition precondition not met
    pub const INVALID_STATE: i32 = 5;

    /// Assignment store rejected or failed a read/write
    pub const STORE_ERROR: i32 = 6;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `phasekeeper` operations.
#[derive(Debug, Error)]
pub enum PhaseKeeperError {
    /// Tracker operation failed
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Configuration, encounter file, or script could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Script execution stopped at a failing action
    #[error("action #{index} ({action}) failed: {source}")]
    Script {
        /// Zero-based position of the failing action
        index: usize,
        /// Action kind, as written in the script
        action: String,
        /// Underlying tracker failure
        #[source]
        source: TrackerError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PhaseKeeperError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Tracker(err) | Self::Script { source: err, .. } => err.exit_code(),
            Self::Config(ConfigError::Io { .. }) | Self::Io(_) => ExitCode::IO_ERROR,
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
        }
    }
}

impl From<StoreError> for PhaseKeeperError {
    fn from(err: StoreError) -> Self {
        Self::Tracker(TrackerError::StoreFailure(err))
    }
}

// ============================================================================
// Tracker Errors
// ============================================================================

/// Failures reported by tracker operations.
///
/// Every failure is returned to the caller; nothing is retried or rolled
/// back inside the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Unknown participant, phase, or group reference
    #[error("{kind} not found: '{id}'{}", suggestion.as_ref().map_or_else(String::new, |s| format!(" (did you mean '{s}'?)")))]
    NotFound {
        /// What kind of reference failed to resolve (`participant`, `phase`, `group`)
        kind: &'static str,
        /// The unresolved identifier
        id: String,
        /// Closest known identifier, if any
        suggestion: Option<String>,
    },

    /// A transition precondition was not met; no writes were issued
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The assignment store failed; earlier writes of the same operation stay applied
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl TrackerError {
    /// Builds a `NotFound` for an unknown participant id.
    #[must_use]
    pub fn participant(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "participant",
            id: id.into(),
            suggestion: None,
        }
    }

    /// Returns the exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => ExitCode::NOT_FOUND,
            Self::InvalidState(_) => ExitCode::INVALID_STATE,
            Self::StoreFailure(_) => ExitCode::STORE_ERROR,
        }
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

// ============================================================================
// Store Errors
// ============================================================================

/// Assignment store adapter failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a specific write
    #[error("write rejected for {participant}.{key}: {reason}")]
    Rejected {
        /// Participant whose flag was written
        participant: String,
        /// Flag key
        key: String,
        /// Reason given by the store
        reason: String,
    },

    /// A value could not be encoded for the store
    #[error("serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Loading and validation errors for configuration, encounter files, and scripts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the offending file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Referenced file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// File exists but could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Validation found one or more problems
    #[error("validation failed for {path}: {}", issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    ValidationFailed {
        /// File (or source) that failed validation
        path: String,
        /// Problems found
        issues: Vec<ValidationIssue>,
    },
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g. `ordering.seed`)
    pub path: String,
    /// Description of the problem
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.path)
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `phasekeeper` operations.
pub type Result<T> = std::result::Result<T, PhaseKeeperError>;

// ============================================================================
// Tests
// ============================================================================
