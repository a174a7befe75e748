//! Diagnostics produced by a planning pass and the sinks that receive them.
//!
//! Every finding carries a stable code (`FP001`..), a severity and a message
//! naming the types involved. Analysis only collects diagnostics; sinks are
//! notified once the pass completes, in the same order the report lists them.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::key::{AssemblyRef, TypeRef};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// May be resolved elsewhere; never blocks anything
    Info,
    /// Suspicious configuration; fatal only under a strict policy
    Warning,
    /// The plan must not be applied
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Stable diagnostic identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiagnosticCode {
    CycleDetected,
    LifetimeMismatch,
    DisposableCaptive,
    ExcludedTypeReferenced,
    UnresolvedInterface,
    OrphanedDecorator,
    InvalidMarkers,
    RequiresFactory,
    ConflictingCandidate,
    DuplicateRegistration,
}

impl DiagnosticCode {
    /// The stable string id.
    pub const fn id(self) -> &'static str {
        match self {
            DiagnosticCode::CycleDetected => "FP001",
            DiagnosticCode::LifetimeMismatch => "FP002",
            DiagnosticCode::DisposableCaptive => "FP003",
            DiagnosticCode::ExcludedTypeReferenced => "FP004",
            DiagnosticCode::UnresolvedInterface => "FP005",
            DiagnosticCode::OrphanedDecorator => "FP006",
            DiagnosticCode::InvalidMarkers => "FP007",
            DiagnosticCode::RequiresFactory => "FP008",
            DiagnosticCode::ConflictingCandidate => "FP009",
            DiagnosticCode::DuplicateRegistration => "FP010",
        }
    }

    /// Severity a diagnostic with this code is reported at.
    pub const fn severity(self) -> Severity {
        match self {
            DiagnosticCode::CycleDetected | DiagnosticCode::InvalidMarkers => Severity::Error,
            DiagnosticCode::LifetimeMismatch
            | DiagnosticCode::DisposableCaptive
            | DiagnosticCode::ExcludedTypeReferenced
            | DiagnosticCode::OrphanedDecorator
            | DiagnosticCode::ConflictingCandidate => Severity::Warning,
            DiagnosticCode::UnresolvedInterface
            | DiagnosticCode::RequiresFactory
            | DiagnosticCode::DuplicateRegistration => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A single finding.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{Diagnostic, DiagnosticCode, Severity, TypeRef};
///
/// let d = Diagnostic::new(DiagnosticCode::CycleDetected, "App.A -> App.B -> App.A")
///     .with_subject(TypeRef::new("App.A"));
/// assert_eq!(d.severity, Severity::Error);
/// assert_eq!(d.to_string(), "error FP001 [App.A]: App.A -> App.B -> App.A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// Type whose location the finding is reported at
    pub subject: Option<TypeRef>,
    pub unit: Option<AssemblyRef>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            subject: None,
            unit: None,
        }
    }

    pub fn with_subject(mut self, subject: TypeRef) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_unit(mut self, unit: AssemblyRef) -> Self {
        self.unit = Some(unit);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity, self.code)?;
        if let Some(subject) = &self.subject {
            write!(f, " [{}]", subject)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Receiver for diagnostics.
///
/// Keep implementations cheap; they are called synchronously once per
/// finding after the pass completes.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at the level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, d: &Diagnostic) {
        let subject = d.subject.as_ref().map(TypeRef::name).unwrap_or("-");
        match d.severity {
            Severity::Info => tracing::info!(code = d.code.id(), subject, "{}", d.message),
            Severity::Warning => tracing::warn!(code = d.code.id(), subject, "{}", d.message),
            Severity::Error => tracing::error!(code = d.code.id(), subject, "{}", d.message),
        }
    }
}

#[cfg(feature = "parking-lot")]
type SinkLock<T> = parking_lot::Mutex<T>;
#[cfg(not(feature = "parking-lot"))]
type SinkLock<T> = std::sync::Mutex<T>;

/// Collects every diagnostic it receives, for tests and tooling.
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: SinkLock<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.lock().iter().filter(|d| d.code == code).count()
    }

    #[cfg(feature = "parking-lot")]
    fn lock(&self) -> parking_lot::MutexGuard<'_, Vec<Diagnostic>> {
        self.items.lock()
    }

    #[cfg(not(feature = "parking-lot"))]
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // A poisoned sink still holds valid diagnostics
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.lock().push(diagnostic.clone());
    }
}

/// Counts of diagnostics per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub info: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl SeverityCounts {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        diagnostics.iter().fold(Self::default(), |mut acc, d| {
            match d.severity {
                Severity::Info => acc.info += 1,
                Severity::Warning => acc.warnings += 1,
                Severity::Error => acc.errors += 1,
            }
            acc
        })
    }
}
