//! Template synthesis.
//!
//! - `substitution`: parameter substitution over types, signatures and bodies
//! - `naming`: output, display and witness names
//! - `synthesis`: building and rendering specialized units

pub mod naming;
pub mod substitution;
pub mod synthesis;

pub use substitution::{
    SubstitutionMap, build_substitution_map, substitute_body, substitute_signature,
    substitute_type,
};
pub use synthesis::{
    SynthesizedMember, SynthesizedType, SynthesizedUnit, render, synthesize, synthesize_all,
};
