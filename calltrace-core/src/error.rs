//! Typed error handling for calltrace.
//!
//! Provides structured errors that library consumers can match on,
//! with full context about what went wrong and where.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for calltrace operations.
///
/// Conditions that are part of a normal answer (unresolved callees, depth
/// truncation, cycles, scope exclusions) are never errors; they are reported
/// on the resulting tree and summary instead.
#[derive(Error, Debug)]
pub enum CalltraceError {
    /// I/O error when reading snapshot files
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed snapshot content
    #[error("Snapshot error in {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    /// A package whose binding information is partial or has type errors
    #[error("Package {package} is incomplete: {reason}")]
    IncompletePackage { package: String, reason: String },

    /// The same package path was loaded twice
    #[error("Duplicate package: {package}")]
    DuplicatePackage { package: String },

    /// A declaration without the identity needed for lookups
    #[error("Invalid declaration {name} in package {package}: {message}")]
    InvalidDeclaration {
        package: String,
        name: String,
        message: String,
    },

    /// Query did not match any declaration
    #[error("Symbol not found: {query}")]
    SymbolNotFound { query: String },

    /// Query matched more than one declaration
    #[error("Ambiguous symbol {query}: matches {}", candidates.join(", "))]
    AmbiguousSymbol {
        query: String,
        candidates: Vec<String>,
    },

    /// Start symbol is not a function or method
    #[error("{name} is a {kind}, not a function or method")]
    NotCallable { name: String, kind: String },

    /// Start symbol has no body (external or assembly declaration)
    #[error("{name} has no body to analyze")]
    NoBody { name: String },

    /// Traversal was cancelled between package scans
    #[error("Traversal cancelled while scanning {package}")]
    Cancelled { package: String },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CalltraceError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a snapshot format error.
    pub fn snapshot(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an incomplete-package error.
    pub fn incomplete(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompletePackage {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-declaration error.
    pub fn invalid_decl(
        package: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDeclaration {
            package: package.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a symbol-not-found error.
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            query: query.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if the caller can fix the query and retry against the same
    /// loaded program.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SymbolNotFound { .. }
                | Self::AmbiguousSymbol { .. }
                | Self::NotCallable { .. }
                | Self::NoBody { .. }
                | Self::Cancelled { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Snapshot { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for calltrace results.
pub type CalltraceResult<T> = Result<T, CalltraceError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> CalltraceResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> CalltraceResult<T> {
        self.map_err(|e| CalltraceError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let err = CalltraceError::io(
            PathBuf::from("/snap/app.json"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        assert!(matches!(err, CalltraceError::Io { .. }));
        assert_eq!(err.path(), Some(&PathBuf::from("/snap/app.json")));
        assert!(err.to_string().contains("/snap/app.json"));
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = CalltraceError::AmbiguousSymbol {
            query: "Run".into(),
            candidates: vec!["app.Run".into(), "app.Server.Run".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("app.Run"));
        assert!(msg.contains("app.Server.Run"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CalltraceError::not_found("app.Missing").is_recoverable());
        assert!(CalltraceError::NoBody { name: "app.asm".into() }.is_recoverable());
        assert!(!CalltraceError::incomplete("app", "type errors").is_recoverable());
        assert!(!CalltraceError::snapshot("/s.json", "bad").is_recoverable());
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let mapped = result.with_path("/missing/snapshot.json");
        assert!(matches!(mapped, Err(CalltraceError::Io { .. })));
    }
}
