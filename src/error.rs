//! # Error Handling
//!
//! Every failure in the capture core is scoped to the single capture or submission
//! attempt that raised it. Nothing here is fatal to the process: the buffer is left
//! untouched and the operator may repeat the action.
//!
//! ## Error Classification
//!
//! - `Validation`: a required field is empty or an index is out of range. Raised
//!   before any network or compression work starts.
//! - `Compression`: decoding, resizing or encoding an image failed. The capture is
//!   aborted and nothing is written to the buffer.
//! - `Network`: fetching the baseline or submitting a record failed, including any
//!   non-success status and malformed response bodies. Never retried automatically.
//! - `State`: an activity was requested while the coordinator or buffer was in a
//!   state that does not admit it.
//! - `Auth`: the persisted session identity is missing. Requires the operator.
//! - `Config` / `Io`: ambient failures around configuration and local files.
//!
//! Falling short of the compression budget is not an error; see
//! [`crate::processing::BudgetMiss`].
//!
//! ## Usage
//!
//! ```rust
//! use field_capture::error::{CaptureError, HasRecoverySuggestion, Retryable};
//!
//! let error = CaptureError::network("submit record")
//!     .with_status(502)
//!     .with_recovery_suggestion("Submit the row again once the link is back");
//!
//! assert!(error.is_retryable());
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Degraded results the operator may want to know about
    Warning,
    /// Errors that abort one attempt but leave the session usable
    Error,
    /// Errors that need the operator before anything else can proceed
    Critical,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the field capture client
#[derive(Debug)]
pub enum CaptureError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Empty required fields and out-of-range indices
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Image decode, resize or encode failures
    Compression {
        operation: String,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Fetch or submit failures, including non-success statuses and malformed bodies
    Network {
        operation: String,
        address: Option<String>,
        status: Option<u16>,
        reason: Option<String>,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Invalid state transitions
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Missing or unusable session identity
    Auth {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl CaptureError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a compression error
    pub fn compression(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compression {
            operation: operation.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a compression error wrapping the codec failure
    pub fn compression_from(
        operation: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Compression {
            operation: operation.into(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            address: None,
            status: None,
            reason: None,
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an authentication error
    pub fn auth(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the address a network error was raised against
    pub fn with_address(mut self, addr: impl Into<String>) -> Self {
        if let Self::Network { address, .. } = &mut self {
            *address = Some(addr.into());
        }
        self
    }

    /// Attach the HTTP status a network error was raised for
    pub fn with_status(mut self, code: u16) -> Self {
        if let Self::Network { status, .. } = &mut self {
            *status = Some(code);
        }
        self
    }

    /// Attach a human-readable reason to a network error
    pub fn with_reason(mut self, text: impl Into<String>) -> Self {
        if let Self::Network { reason, .. } = &mut self {
            *reason = Some(text.into());
        }
        self
    }

    /// Attach the underlying transport or decode failure to a network error
    pub fn with_source(mut self, err: impl StdError + Send + Sync + 'static) -> Self {
        if let Self::Network { source, reason, .. } = &mut self {
            if reason.is_none() {
                *reason = Some(err.to_string());
            }
            *source = Some(Box::new(err));
        }
        self
    }

    /// Attach a file path to an I/O error
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(p.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Compression { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Compression { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Compression { .. } => "compression",
            Self::Network { .. } => "network",
            Self::State { .. } => "state",
            Self::Auth { .. } => "auth",
            Self::Io { .. } => "io",
        }
    }

    /// HTTP status carried by a network error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            CaptureError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {:?})",
                    field, constraint, value
                )
            }
            CaptureError::Compression {
                operation, reason, ..
            } => {
                write!(f, "Compression failed during {}: {}", operation, reason)
            }
            CaptureError::Network {
                operation,
                address,
                status,
                reason,
                ..
            } => {
                write!(f, "Network error during {}", operation)?;
                if let Some(address) = address {
                    write!(f, " on {}", address)?;
                }
                if let Some(status) = status {
                    write!(f, " (HTTP status {})", status)?;
                }
                if let Some(reason) = reason {
                    write!(f, ": {}", reason)?;
                }
                Ok(())
            }
            CaptureError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            CaptureError::Auth {
                operation, reason, ..
            } => {
                write!(f, "Session error during {}: {}", operation, reason)
            }
            CaptureError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
        }
    }
}

impl StdError for CaptureError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Compression {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::Network {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Trait for errors the operator may safely repeat by hand.
///
/// Nothing in the client retries on its own; this only tells the caller whether
/// offering "try again" makes sense.
pub trait Retryable {
    /// Check if repeating the failed action is safe
    fn is_retryable(&self) -> bool;
}

impl Retryable for CaptureError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Io { .. } | Self::Compression { .. }
        )
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for CaptureError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for CaptureError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error is transient (may resolve itself)
    pub fn is_transient(error: &CaptureError) -> bool {
        matches!(error, CaptureError::Network { .. })
    }

    /// Check if an error requires user intervention
    pub fn requires_user_intervention(error: &CaptureError) -> bool {
        matches!(error, CaptureError::Auth { .. }) || error.severity() >= ErrorSeverity::Critical
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(error: image::ImageError) -> Self {
        Self::compression_from("image codec", error)
    }
}

impl From<cap_scale::cpu::ScaleError> for CaptureError {
    fn from(error: cap_scale::cpu::ScaleError) -> Self {
        Self::compression_from("resize", error)
    }
}

impl From<reqwest::Error> for CaptureError {
    fn from(error: reqwest::Error) -> Self {
        let status = error.status().map(|s| s.as_u16());
        let address = error.url().map(|u| u.to_string());
        let mut err = Self::network("http request").with_source(error);
        if let Some(status) = status {
            err = err.with_status(status);
        }
        if let Some(address) = address {
            err = err.with_address(address);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = CaptureError::validation("barcode", "must not be empty", "  ");
        assert_eq!(error.category(), "validation");
        assert!(!error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_network_error_display() {
        let error = CaptureError::network("fetch baseline")
            .with_address("http://localhost/list")
            .with_status(503)
            .with_reason("service unavailable");

        assert_eq!(error.status(), Some(503));
        assert!(error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Network error during fetch baseline on http://localhost/list (HTTP status 503): service unavailable"
        );
    }

    #[test]
    fn test_error_with_context() {
        let error = CaptureError::compression("encode", "unsupported color type")
            .with_context("front image for row 3")
            .with_recovery_suggestion("retake the photo");

        assert_eq!(error.category(), "compression");
        assert_eq!(error.recovery_suggestion(), Some("retake the photo"));
        assert_eq!(error.context().context.as_deref(), Some("front image for row 3"));
    }

    #[test]
    fn test_error_classification() {
        let auth = CaptureError::auth("load session", "no session identity stored");
        assert!(classify::requires_user_intervention(&auth));
        assert!(!classify::is_transient(&auth));

        let network = CaptureError::network("submit record");
        assert!(classify::is_transient(&network));
        assert!(!classify::requires_user_intervention(&network));
    }

    #[test]
    fn test_io_source_is_exposed() {
        let error = CaptureError::io(
            "read session",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        )
        .with_path("/tmp/session");
        assert!(error.source().is_some());
        assert!(error.to_string().contains("/tmp/session"));
    }
}
