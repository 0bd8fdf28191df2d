//! Stencil core types.
//!
//! Value types shared by the discovery engine and its hosts:
//!
//! - [`type_hash`]: structural fingerprints
//! - [`qualified_name`]: scoped names
//! - [`types`]: type references and concrete type descriptors
//! - [`operator`]: structural operator requirements
//! - [`constraints`]: the constraint model (`satisfies`, `subsumes`)
//! - [`records`]: classified discovery records
//! - [`declaration`]: front-end input shapes and marker data
//! - [`error`] / [`diagnostics`]: failures and how they are reported

pub mod constraints;
pub mod declaration;
pub mod diagnostics;
pub mod error;
pub mod operator;
pub mod qualified_name;
pub mod records;
pub mod type_hash;
pub mod types;

pub use constraints::{
    ConstraintFlags, ConstraintSet, ParamConstraints, Requirement, Violation, satisfies, subsumes,
};
pub use declaration::{DeclarationKind, DeclarationShape, DeclaredMember, GenericParam, Marker};
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{
    ClassificationError, ConstraintError, DiscoveryError, MatchFailure, MatchFailureKind,
    PassError, StencilError, SynthesisError,
};
pub use operator::{Operator, OperatorForm, PassMode, ReturnKind};
pub use qualified_name::QualifiedName;
pub use records::{
    MemberBody, MemberSignature, Param, RecordIdentity, TemplateId, TemplateImplementationRecord,
    TemplateInstantiationRecord, TemplateInterfaceRecord, TemplateName,
};
pub use type_hash::{Fingerprint, FingerprintBuilder, Fingerprinted};
pub use types::{ConcreteType, TypeCategory, TypeRef, TypeTraits};
