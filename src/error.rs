//! Error types for the registration planner.

use thiserror::Error;

/// Planner errors
///
/// Analysis itself never fails because of what it finds: cycles, captive
/// dependencies and malformed markers are reported as diagnostics. These
/// variants cover the remaining failure modes: cancelled passes, unreadable
/// input, configuration problems, and the explicit escalation performed when
/// a plan is applied under a strict policy.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::PlanError;
///
/// let cancelled = PlanError::Cancelled;
/// assert_eq!(cancelled.to_string(), "Planning pass cancelled");
///
/// let syntax = PlanError::SymbolTable { line: 3, message: "unexpected indentation".into() };
/// assert_eq!(syntax.to_string(), "Symbol table line 3: unexpected indentation");
/// ```
#[derive(Debug, Error)]
pub enum PlanError {
    /// The pass was cancelled before analysis started
    #[error("Planning pass cancelled")]
    Cancelled,
    /// Plan application refused because of reported findings
    #[error("Plan rejected: {errors} error(s), {warnings} warning(s); first: {first}")]
    FatalDiagnostics {
        errors: usize,
        warnings: usize,
        first: String,
    },
    /// Symbol table text could not be parsed
    #[error("Symbol table line {line}: {message}")]
    SymbolTable { line: usize, message: String },
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
    /// Graph or manifest export failed
    #[error("Export failed: {0}")]
    Export(String),
    /// Reading configuration or symbol files failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON decoding or encoding failed
    #[cfg(feature = "serde_json")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for planner operations
///
/// A convenience alias for `Result<T, PlanError>`.
///
/// ```rust
/// use ferrous_plan::{PlanError, PlanResult};
///
/// fn check(cancelled: bool) -> PlanResult<()> {
///     if cancelled {
///         return Err(PlanError::Cancelled);
///     }
///     Ok(())
/// }
///
/// assert!(check(false).is_ok());
/// assert!(matches!(check(true), Err(PlanError::Cancelled)));
/// ```
pub type PlanResult<T> = Result<T, PlanError>;
