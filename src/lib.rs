//! Stencil: template discovery and instantiation.
//!
//! Hosts feed `(DeclarationShape, Marker)` pairs into a [`DiscoveryPass`],
//! from as many threads as they like, then complete the pass to get bindings
//! and synthesize specialized units.
//!
//! This crate re-exports `stencil-core` (value types) and `stencil-engine`
//! (classification, dedup, matching, synthesis, notifications).

pub use stencil_engine as engine;

pub use stencil_core::*;
pub use stencil_engine::{
    AbortHandle, Binding, ClassifiedRecord, DeferredPolicy, Discovery, DiscoveryPass,
    DiscoveryStore, EngineConfig, Offer, PassOutcome, Resolution, Subscription,
    SynthesizedMember, SynthesizedType, SynthesizedUnit, TemplateEngine, classify, synthesize,
};

pub mod prelude {
    pub use stencil_core::{
        ConcreteType, ConstraintFlags, DeclarationKind, DeclarationShape, DeclaredMember,
        Diagnostic, DiagnosticCode, Diagnostics, Marker, MemberSignature, Operator, Param,
        ParamConstraints, QualifiedName, TypeRef,
    };
    pub use stencil_engine::{
        DiscoveryPass, EngineConfig, Offer, PassOutcome, SynthesizedUnit, TemplateEngine,
    };
}
