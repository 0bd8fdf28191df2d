//! Unit synthesis.
//!
//! Turns a [`Binding`] into a fully specialized type definition. Interface
//! signatures are substituted structurally, implementation bodies token-wise,
//! and the result is re-checked so that no generic parameter survives.

use std::fmt::Write as _;

use rustc_hash::FxHashSet;
use stencil_core::{
    ConcreteType, Diagnostics, MemberSignature, Operator, OperatorForm, Param, ParamConstraints,
    QualifiedName, ReturnKind, SynthesisError, TypeRef,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::matcher::Binding;
use crate::template::naming::witness_name;
use crate::template::substitution::{
    identifiers, rename_map, substitute_body, substitute_signature,
};

/// A member of a synthesized type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedMember {
    pub signature: MemberSignature,
    pub body: String,
}

/// A closed type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedType {
    pub name: QualifiedName,
    /// The closed type this definition implements.
    pub implements: TypeRef,
    pub members: Vec<SynthesizedMember>,
}

impl SynthesizedType {
    pub fn member(&self, name: &str) -> Option<&SynthesizedMember> {
        self.members.iter().find(|m| m.signature.name == name)
    }
}

/// Everything synthesized for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedUnit {
    pub output_name: QualifiedName,
    pub unit: SynthesizedType,
    /// Operator witnesses emitted next to the unit.
    pub auxiliary: Vec<SynthesizedType>,
    /// Rendered source of the unit and its auxiliaries.
    pub source_text: String,
}

/// Synthesize the unit for `binding`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn synthesize(
    binding: &Binding,
    config: &EngineConfig,
) -> Result<SynthesizedUnit, SynthesisError> {
    let output_name = binding.output_name().clone();
    check_coverage(binding)?;

    let interface = &binding.interface;
    let implementation = &binding.implementation;
    let renames = rename_map(&interface.constraints, &implementation.constraints);

    let mut members = Vec::with_capacity(implementation.members.len());
    for member in &implementation.members {
        // Interface members take the interface's declared types. Parameter
        // names stay the implementation's, since its body refers to them.
        let declared = interface.members.iter().find(|sig| {
            substitute_signature(sig, &renames).shape() == member.signature.shape()
        });
        let signature = match declared {
            Some(sig) => {
                let mut signature = substitute_signature(sig, &binding.substitution);
                for (param, own) in signature.params.iter_mut().zip(&member.signature.params) {
                    param.name.clone_from(&own.name);
                }
                signature
            }
            None => substitute_signature(&member.signature, &binding.implementation_substitution),
        };
        let body = substitute_body(&member.body, &binding.implementation_substitution);
        members.push(SynthesizedMember { signature, body });
    }

    let unit = SynthesizedType {
        name: output_name.clone(),
        implements: binding.implemented_type(),
        members,
    };
    revalidate(&unit, binding)?;

    let auxiliary = if config.emit_operator_witnesses {
        operator_witnesses(binding, &config.output_name_separator)
    } else {
        Vec::new()
    };

    let mut source_text = render(&unit);
    for aux in &auxiliary {
        source_text.push('\n');
        source_text.push_str(&render(aux));
    }

    debug!(
        unit = %output_name,
        implementation = %implementation.name,
        members = unit.members.len(),
        witnesses = auxiliary.len(),
        "synthesized unit"
    );
    Ok(SynthesizedUnit {
        output_name,
        unit,
        auxiliary,
        source_text,
    })
}

/// Synthesize every binding, collecting failures as diagnostics.
pub fn synthesize_all<'a>(
    bindings: impl IntoIterator<Item = &'a Binding>,
    config: &EngineConfig,
) -> (Vec<SynthesizedUnit>, Diagnostics) {
    let mut units = Vec::new();
    let mut diagnostics = Diagnostics::new();
    for binding in bindings {
        match synthesize(binding, config) {
            Ok(unit) => units.push(unit),
            Err(err) => diagnostics.push((&err).into()),
        }
    }
    (units, diagnostics)
}

fn check_coverage(binding: &Binding) -> Result<(), SynthesisError> {
    let sets = [
        (&binding.interface.constraints, &binding.substitution),
        (
            &binding.implementation.constraints,
            &binding.implementation_substitution,
        ),
    ];
    for (constraints, map) in sets {
        if let Some(missing) = constraints.names().find(|name| !map.contains_key(*name)) {
            return Err(SynthesisError::UnboundParameter {
                unit: binding.output_name().clone(),
                parameter: missing.to_string(),
            });
        }
    }
    Ok(())
}

fn revalidate(unit: &SynthesizedType, binding: &Binding) -> Result<(), SynthesisError> {
    for member in &unit.members {
        let sig = &member.signature;
        let open = sig
            .params
            .iter()
            .map(|p| &p.ty)
            .chain(std::iter::once(&sig.returns))
            .flat_map(|ty| ty.params())
            .next();
        if let Some(parameter) = open {
            return Err(SynthesisError::UnresolvedParameter {
                unit: unit.name.clone(),
                parameter: parameter.to_string(),
                location: format!("signature of '{}'", sig.name),
            });
        }
    }

    // Identifiers that legitimately appear because an argument spells them.
    let mut spelled: FxHashSet<&str> = FxHashSet::default();
    let renderings: Vec<String> = binding
        .implementation_substitution
        .values()
        .filter(|ty| ty.is_closed())
        .map(ToString::to_string)
        .collect();
    for text in &renderings {
        spelled.extend(identifiers(text).into_iter().map(|r| &text[r]));
    }

    let params: Vec<&str> = binding
        .implementation
        .constraints
        .names()
        .filter(|name| !spelled.contains(name))
        .collect();
    for member in &unit.members {
        for range in identifiers(&member.body) {
            let ident = &member.body[range];
            if params.contains(&ident) {
                return Err(SynthesisError::UnresolvedParameter {
                    unit: unit.name.clone(),
                    parameter: ident.to_string(),
                    location: format!("body of '{}'", member.signature.name),
                });
            }
        }
    }
    Ok(())
}

/// One witness per parameter whose constraints require operators. Each
/// required operator is forwarded to the concrete argument.
fn operator_witnesses(binding: &Binding, separator: &str) -> Vec<SynthesizedType> {
    binding
        .implementation
        .constraints
        .iter()
        .zip(binding.arguments())
        .filter(|(param, _)| !param.operators.is_empty())
        .map(|(param, arg)| witness(binding.output_name(), param, arg, separator))
        .collect()
}

fn witness(
    unit: &QualifiedName,
    param: &ParamConstraints,
    arg: &ConcreteType,
    separator: &str,
) -> SynthesizedType {
    SynthesizedType {
        name: witness_name(unit, &param.name, separator),
        implements: TypeRef::generic("Operators", vec![arg.ty.clone()]),
        members: param
            .operators
            .iter()
            .map(|(op, form)| forward_operator(*op, *form, &arg.ty))
            .collect(),
    }
}

fn forward_operator(op: Operator, form: OperatorForm, operand: &TypeRef) -> SynthesizedMember {
    let names = ["a", "b", "c"];
    let params: Vec<Param> = names
        .iter()
        .take(form.arity as usize)
        .map(|n| Param::new(*n, operand.clone()))
        .collect();
    let returns = match form.returns {
        ReturnKind::Bool => TypeRef::named("Bool"),
        ReturnKind::Int => TypeRef::named("Int32"),
        ReturnKind::Operand => operand.clone(),
        ReturnKind::Void => TypeRef::named("Void"),
    };
    let expr = match form.arity {
        0 => String::new(),
        1 => format!("{}a", op.symbol()),
        _ => format!("a {} b", op.symbol()),
    };
    let body = if form.returns == ReturnKind::Void {
        format!("{expr};")
    } else {
        format!("return {expr};")
    };
    SynthesizedMember {
        signature: MemberSignature::new(op.member_name(), params, returns),
        body,
    }
}

/// Render a type definition as source text.
pub fn render(ty: &SynthesizedType) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "type {} : {} {{", ty.name, ty.implements);
    for (i, member) in ty.members.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "    fn {} {{", member.signature);
        for line in member.body.lines() {
            let line = line.trim();
            if !line.is_empty() {
                let _ = writeln!(out, "        {line}");
            }
        }
        out.push_str("    }\n");
    }
    out.push_str("}\n");
    out
}
