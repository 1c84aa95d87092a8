//! Error types for lookup resolution.
//!
//! Every lookup failure is reported through [`LookupError`]. Messages always
//! name the offending term, path, pattern or plugin so the failure is
//! actionable, and underlying causes are chained through `#[source]` rather
//! than flattened into strings.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lookup operations.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Boxed underlying cause carried by [`LookupError::SourceUnavailable`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving a lookup.
#[derive(Error, Debug)]
pub enum LookupError {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// The requested lookup plugin is not registered.
    #[error("Lookup plugin not found: {0}")]
    NotFound(String),

    /// A strict registration found the name already taken.
    #[error("Lookup plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    // ========================================================================
    // Term and Option Errors
    // ========================================================================
    /// The term cannot be interpreted (bad glob, non-terminating sequence,
    /// CSV spec without a file, ...).
    #[error("Invalid lookup term '{term}': {message}")]
    InvalidTerm {
        /// The offending term
        term: String,
        /// What is wrong with it
        message: String,
    },

    /// An option carries a value the plugin cannot use.
    #[error("Invalid option '{option}': {message}")]
    InvalidOption {
        /// Option name
        option: String,
        /// What is wrong with it
        message: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A file, URL or command could not be read.
    #[error("Failed to read from '{source_name}': {cause}")]
    SourceUnavailable {
        /// Path, URL or command that failed
        source_name: String,
        /// Underlying cause
        #[source]
        cause: BoxedCause,
    },

    /// A generated value could not be persisted.
    #[error("Failed to persist '{path}': {source}")]
    PersistenceFailure {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// None of the candidates exist.
    #[error("No file was found when searching for: {}", .0.join(", "))]
    NoMatch(Vec<String>),

    /// The caller cancelled the lookup.
    #[error("Lookup was cancelled")]
    Cancelled,
}

impl LookupError {
    /// Build an [`LookupError::InvalidTerm`].
    pub fn invalid_term(term: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTerm {
            term: term.into(),
            message: message.into(),
        }
    }

    /// Build an [`LookupError::InvalidOption`].
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Build a [`LookupError::SourceUnavailable`] wrapping any error.
    pub fn source_unavailable<E>(source_name: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            cause: cause.into(),
        }
    }

    /// Build a [`LookupError::PersistenceFailure`].
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source,
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            Self::NotFound(_) => LookupErrorKind::NotFound,
            Self::AlreadyRegistered(_) => LookupErrorKind::AlreadyRegistered,
            Self::InvalidTerm { .. } | Self::InvalidOption { .. } => LookupErrorKind::InvalidTerm,
            Self::SourceUnavailable { .. } => LookupErrorKind::SourceUnavailable,
            Self::PersistenceFailure { .. } => LookupErrorKind::PersistenceFailure,
            Self::NoMatch(_) => LookupErrorKind::NoMatch,
            Self::Cancelled => LookupErrorKind::Cancelled,
        }
    }
}

/// Coarse error category, for callers that branch on the kind of failure
/// rather than on its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupErrorKind {
    /// Unregistered plugin name
    NotFound,
    /// Duplicate strict registration
    AlreadyRegistered,
    /// Malformed term or option
    InvalidTerm,
    /// File, URL or command read failure
    SourceUnavailable,
    /// Directory or file could not be written
    PersistenceFailure,
    /// first_found exhausted its candidates
    NoMatch,
    /// Cancelled by the caller
    Cancelled,
}

impl fmt::Display for LookupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupErrorKind::NotFound => "not_found",
            LookupErrorKind::AlreadyRegistered => "already_registered",
            LookupErrorKind::InvalidTerm => "invalid_term",
            LookupErrorKind::SourceUnavailable => "source_unavailable",
            LookupErrorKind::PersistenceFailure => "persistence_failure",
            LookupErrorKind::NoMatch => "no_match",
            LookupErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}
