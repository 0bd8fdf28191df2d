//! Interface ↔ implementation pairing.
//!
//! Pairing does not look at concrete arguments. An implementation pairs with
//! an interface when their arities agree, its constraints subsume the
//! interface's, and it provides every interface member.

use stencil_core::{MatchFailureKind, TemplateImplementationRecord, TemplateInterfaceRecord};

use crate::template::substitution::{rename_map, substitute_signature};

/// Check that `implementation` can serve `interface`.
pub fn pair(
    interface: &TemplateInterfaceRecord,
    implementation: &TemplateImplementationRecord,
) -> Result<(), MatchFailureKind> {
    if implementation.arity() != interface.arity() {
        return Err(MatchFailureKind::ArityMismatch {
            template: interface.name().clone(),
            expected: interface.arity(),
            got: implementation.arity(),
        });
    }

    if let Some(violation) = implementation
        .constraints
        .first_unsubsumed(&interface.constraints)
    {
        return Err(MatchFailureKind::ConstraintsNotSubsumed {
            position: violation.position,
            parameter: violation.parameter,
            requirement: violation.requirement,
        });
    }

    let missing = missing_members(interface, implementation);
    if !missing.is_empty() {
        return Err(MatchFailureKind::MissingMembers {
            implementation: implementation.name.clone(),
            members: missing,
        });
    }
    Ok(())
}

/// Interface members the implementation does not provide, compared by name
/// and parameter types after renaming interface parameters to the
/// implementation's.
pub fn missing_members(
    interface: &TemplateInterfaceRecord,
    implementation: &TemplateImplementationRecord,
) -> Vec<String> {
    let renames = rename_map(&interface.constraints, &implementation.constraints);
    interface
        .members
        .iter()
        .filter(|member| {
            let expected = substitute_signature(member, &renames);
            !implementation
                .members
                .iter()
                .any(|m| m.signature.shape() == expected.shape())
        })
        .map(|member| member.name.clone())
        .collect()
}
