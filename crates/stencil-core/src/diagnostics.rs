//! Diagnostics handed back to the host.
//!
//! Every failure the engine produces (classification errors, match failures,
//! synthesis invariant failures) is converted into a [`Diagnostic`] with a
//! stable [`DiagnosticCode`], a severity, a message and the identity of the
//! record it concerns.
//!
//! # Examples
//!
//! ```
//! use stencil_core::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.push(Diagnostic::new(
//!     Severity::Warning,
//!     DiagnosticCode::ConflictingDefinition,
//!     "template 'Comparer' declared twice",
//! ));
//! assert!(!diagnostics.has_errors());
//! assert_eq!(diagnostics.warning_count(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;

use crate::{
    ClassificationError, MatchFailure, MatchFailureKind, RecordIdentity, SynthesisError,
};

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// The affected unit produces no output.
    Error,
    /// Output is unaffected, but something looks wrong.
    Warning,
    /// Informational.
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCode {
    Classification,
    NoImplementationFound,
    ConstraintViolation,
    ArityMismatch,
    AmbiguousImplementations,
    MissingMembers,
    UnknownImplementation,
    ConstraintsNotSubsumed,
    ConflictingDefinition,
    PendingInstantiation,
    UnknownTemplate,
    SynthesisInvariant,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::Classification => "STN0001",
            DiagnosticCode::NoImplementationFound => "STN0101",
            DiagnosticCode::ConstraintViolation => "STN0102",
            DiagnosticCode::ArityMismatch => "STN0103",
            DiagnosticCode::AmbiguousImplementations => "STN0104",
            DiagnosticCode::MissingMembers => "STN0105",
            DiagnosticCode::UnknownImplementation => "STN0106",
            DiagnosticCode::ConstraintsNotSubsumed => "STN0201",
            DiagnosticCode::ConflictingDefinition => "STN0202",
            DiagnosticCode::PendingInstantiation => "STN0203",
            DiagnosticCode::UnknownTemplate => "STN0204",
            DiagnosticCode::SynthesisInvariant => "STN0301",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// The record this diagnostic is about, if any.
    pub related: Option<RecordIdentity>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            related: None,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn with_related(mut self, related: impl Into<RecordIdentity>) -> Self {
        self.related = Some(related.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity.as_str(), self.code, self.message)?;
        if let Some(related) = &self.related {
            write!(f, " ({related})")?;
        }
        Ok(())
    }
}

impl From<&MatchFailureKind> for DiagnosticCode {
    fn from(kind: &MatchFailureKind) -> Self {
        match kind {
            MatchFailureKind::NoImplementationFound { .. } => DiagnosticCode::NoImplementationFound,
            MatchFailureKind::ConstraintViolation { .. } => DiagnosticCode::ConstraintViolation,
            MatchFailureKind::ArityMismatch { .. } => DiagnosticCode::ArityMismatch,
            MatchFailureKind::AmbiguousImplementations { .. } => {
                DiagnosticCode::AmbiguousImplementations
            }
            MatchFailureKind::MissingMembers { .. } => DiagnosticCode::MissingMembers,
            MatchFailureKind::UnknownImplementation { .. } => DiagnosticCode::UnknownImplementation,
            MatchFailureKind::ConstraintsNotSubsumed { .. } => {
                DiagnosticCode::ConstraintsNotSubsumed
            }
        }
    }
}

impl From<&MatchFailure> for Diagnostic {
    fn from(failure: &MatchFailure) -> Self {
        Diagnostic::error(DiagnosticCode::from(&failure.kind), failure.kind.to_string())
            .with_related(failure.record.clone())
    }
}

impl From<MatchFailure> for Diagnostic {
    fn from(failure: MatchFailure) -> Self {
        Diagnostic::from(&failure)
    }
}

impl From<&ClassificationError> for Diagnostic {
    fn from(error: &ClassificationError) -> Self {
        let diagnostic = Diagnostic::error(DiagnosticCode::Classification, error.to_string());
        match error.declaration() {
            Some(name) => diagnostic.with_related(RecordIdentity::Declaration(name.clone())),
            None => diagnostic,
        }
    }
}

impl From<&SynthesisError> for Diagnostic {
    fn from(error: &SynthesisError) -> Self {
        Diagnostic::error(DiagnosticCode::SynthesisInvariant, error.to_string())
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.is_error())
    }

    /// All diagnostics with the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(move |d| d.code == code)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::collections::vec_deque::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::collections::vec_deque::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
