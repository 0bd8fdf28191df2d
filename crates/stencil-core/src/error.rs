//! Error types for the template engine.
//!
//! One error type per phase, with a top-level wrapper for unified handling.
//!
//! ## Error Hierarchy
//!
//! ```text
//! StencilError (top-level wrapper)
//! ├── ConstraintError      - invalid constraint declarations
//! ├── ClassificationError  - malformed marker data / declaration shape
//! ├── MatchFailure         - instantiation could not be bound
//! ├── SynthesisError       - internal invariant failure during synthesis
//! ├── DiscoveryError       - offer rejected by the pass
//! └── PassError            - pass could not be completed
//! ```
//!
//! All of these are values returned to the host; none of them aborts a pass
//! on its own.

use thiserror::Error;

use crate::{QualifiedName, RecordIdentity, Requirement, TemplateName, TypeRef};

// ============================================================================
// Constraint Errors
// ============================================================================

/// Errors building a [`ConstraintSet`](crate::ConstraintSet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// Value-type and reference-type requirements on the same parameter.
    #[error("parameter '{parameter}' cannot be both a value type and a reference type")]
    Conflicting { parameter: String },

    /// The same parameter name appears twice.
    #[error("duplicate generic parameter '{parameter}'")]
    DuplicateParameter { parameter: String },
}

// ============================================================================
// Classification Errors
// ============================================================================

/// Malformed marker data or an unusable declaration shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("declaration has an empty name")]
    EmptyName,

    #[error("{declaration}: {source}")]
    InvalidConstraints {
        declaration: QualifiedName,
        #[source]
        source: ConstraintError,
    },

    #[error(
        "{declaration}: generic parameter '{parameter}' declared at position {found}, \
         expected {expected}"
    )]
    ParameterPosition {
        declaration: QualifiedName,
        parameter: String,
        expected: usize,
        found: usize,
    },

    #[error("{declaration}: a {marker} marker cannot be applied to {shape}")]
    ShapeMismatch {
        declaration: QualifiedName,
        marker: &'static str,
        shape: String,
    },

    #[error("{declaration}: member '{member}' has no body")]
    MissingBody {
        declaration: QualifiedName,
        member: String,
    },

    #[error("{declaration}: type argument '{argument}' is not closed")]
    OpenTypeArgument {
        declaration: QualifiedName,
        argument: TypeRef,
    },

    #[error("{declaration}: output name is blank")]
    EmptyOutputName { declaration: QualifiedName },

    #[error("{declaration}: marker names an empty template")]
    EmptyTemplateName { declaration: QualifiedName },
}

impl ClassificationError {
    /// The declaration this error is about, when it has a name.
    pub fn declaration(&self) -> Option<&QualifiedName> {
        match self {
            ClassificationError::EmptyName => None,
            ClassificationError::InvalidConstraints { declaration, .. }
            | ClassificationError::ParameterPosition { declaration, .. }
            | ClassificationError::ShapeMismatch { declaration, .. }
            | ClassificationError::MissingBody { declaration, .. }
            | ClassificationError::OpenTypeArgument { declaration, .. }
            | ClassificationError::EmptyOutputName { declaration }
            | ClassificationError::EmptyTemplateName { declaration } => Some(declaration),
        }
    }
}

// ============================================================================
// Match Failures
// ============================================================================

fn join_names(names: &[QualifiedName]) -> String {
    names
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a match attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchFailureKind {
    #[error("no implementation found for template '{template}'")]
    NoImplementationFound { template: TemplateName },

    #[error(
        "type argument '{argument}' does not satisfy parameter '{parameter}' \
         (position {position}): {requirement}"
    )]
    ConstraintViolation {
        position: usize,
        parameter: String,
        argument: TypeRef,
        requirement: Requirement,
    },

    #[error("template '{template}' expects {expected} type argument(s), got {got}")]
    ArityMismatch {
        template: TemplateName,
        expected: usize,
        got: usize,
    },

    #[error("ambiguous implementations of '{template}': {}", join_names(.candidates))]
    AmbiguousImplementations {
        template: TemplateName,
        candidates: Vec<QualifiedName>,
    },

    #[error("implementation '{implementation}' is missing members: {}", .members.join(", "))]
    MissingMembers {
        implementation: QualifiedName,
        members: Vec<String>,
    },

    #[error("no implementation named '{name}' for template '{template}'")]
    UnknownImplementation {
        template: TemplateName,
        name: QualifiedName,
    },

    #[error(
        "implementation constraints on '{parameter}' (position {position}) \
         do not subsume the interface: {requirement}"
    )]
    ConstraintsNotSubsumed {
        position: usize,
        parameter: String,
        requirement: Requirement,
    },
}

/// A failed match together with the record that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{record}: {kind}")]
pub struct MatchFailure {
    pub kind: MatchFailureKind,
    pub record: RecordIdentity,
}

impl MatchFailure {
    pub fn new(kind: MatchFailureKind, record: impl Into<RecordIdentity>) -> Self {
        Self {
            kind,
            record: record.into(),
        }
    }
}

// ============================================================================
// Synthesis Errors
// ============================================================================

/// Internal invariant failures found while synthesizing a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// A generic parameter survived substitution.
    #[error("unit '{unit}': parameter '{parameter}' is unresolved in {location}")]
    UnresolvedParameter {
        unit: QualifiedName,
        parameter: String,
        location: String,
    },

    /// The binding's substitution map does not cover a template parameter.
    #[error("unit '{unit}': no argument bound for parameter '{parameter}'")]
    UnboundParameter {
        unit: QualifiedName,
        parameter: String,
    },
}

impl SynthesisError {
    pub fn unit(&self) -> &QualifiedName {
        match self {
            SynthesisError::UnresolvedParameter { unit, .. }
            | SynthesisError::UnboundParameter { unit, .. } => unit,
        }
    }
}

// ============================================================================
// Pass Errors
// ============================================================================

/// An offer the pass refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("discovery pass {pass} was aborted")]
    Aborted { pass: u64 },

    #[error("discovery pass {pass} is already complete")]
    Completed { pass: u64 },
}

/// A pass that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("discovery pass {pass} was aborted")]
    Aborted { pass: u64 },

    #[error("discovery pass {pass} is already complete")]
    AlreadyComplete { pass: u64 },
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Unified error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StencilError {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Match(#[from] MatchFailure),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Pass(#[from] PassError),
}
