//! Declaration classifier.
//!
//! Turns a `(DeclarationShape, Marker)` pair into exactly one typed record.
//! Classification is pure: the same input always yields an equal record, which
//! is what lets the dedup store collapse repeated discoveries.
//!
//! References to other templates are recorded, never resolved here.

use stencil_core::{
    ClassificationError, ConstraintSet, DeclarationKind, DeclarationShape, Fingerprint,
    Fingerprinted, Marker, MemberBody, QualifiedName, TemplateId, TemplateImplementationRecord,
    TemplateInstantiationRecord, TemplateInterfaceRecord,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::template::naming::{derive_output_name, resolve_output_name};

/// The result of classifying one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassifiedRecord {
    Interface(TemplateInterfaceRecord),
    Implementation(TemplateImplementationRecord),
    Instantiation(TemplateInstantiationRecord),
}

impl ClassifiedRecord {
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            ClassifiedRecord::Interface(r) => r.fingerprint(),
            ClassifiedRecord::Implementation(r) => r.fingerprint(),
            ClassifiedRecord::Instantiation(r) => r.fingerprint(),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ClassifiedRecord::Interface(_) => "interface",
            ClassifiedRecord::Implementation(_) => "implementation",
            ClassifiedRecord::Instantiation(_) => "instantiation",
        }
    }
}

/// Classify with default naming settings.
pub fn classify(
    decl: &DeclarationShape,
    marker: &Marker,
) -> Result<ClassifiedRecord, ClassificationError> {
    classify_with(decl, marker, &EngineConfig::default())
}

/// Classify a declaration according to its marker.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn classify_with(
    decl: &DeclarationShape,
    marker: &Marker,
    config: &EngineConfig,
) -> Result<ClassifiedRecord, ClassificationError> {
    if decl.name.name.trim().is_empty() {
        return Err(ClassificationError::EmptyName);
    }

    let record = match marker {
        Marker::Interface => ClassifiedRecord::Interface(classify_interface(decl)?),
        Marker::Implementation { template, forced } => {
            if template.name.trim().is_empty() {
                return Err(ClassificationError::EmptyTemplateName {
                    declaration: decl.name.clone(),
                });
            }
            ClassifiedRecord::Implementation(classify_implementation(decl, template, *forced)?)
        }
        Marker::Instantiation {
            template,
            arguments,
            output_name,
            implementation,
        } => {
            if template.name.trim().is_empty() {
                return Err(ClassificationError::EmptyTemplateName {
                    declaration: decl.name.clone(),
                });
            }
            if decl.is_generic() {
                return Err(shape_mismatch(decl, marker));
            }
            if let Some(open) = arguments.iter().find(|a| !a.is_closed()) {
                return Err(ClassificationError::OpenTypeArgument {
                    declaration: decl.name.clone(),
                    argument: open.ty.clone(),
                });
            }
            let output_name = match output_name {
                Some(name) if name.trim().is_empty() => {
                    return Err(ClassificationError::EmptyOutputName {
                        declaration: decl.name.clone(),
                    });
                }
                Some(name) => resolve_output_name(name, &decl.name.scope),
                None => QualifiedName::new(
                    derive_output_name(template, arguments, &config.output_name_separator),
                    decl.name.scope.clone(),
                ),
            };
            ClassifiedRecord::Instantiation(TemplateInstantiationRecord {
                template: template.clone(),
                arguments: arguments.clone(),
                output_name,
                implementation: implementation.clone(),
            })
        }
    };

    debug!(
        declaration = %decl.name,
        kind = record.kind_str(),
        fingerprint = %record.fingerprint(),
        "classified declaration"
    );
    Ok(record)
}

fn classify_interface(
    decl: &DeclarationShape,
) -> Result<TemplateInterfaceRecord, ClassificationError> {
    if decl.kind != DeclarationKind::Interface || !decl.is_generic() {
        return Err(shape_mismatch(decl, &Marker::Interface));
    }
    let constraints = constraint_set(decl)?;
    Ok(TemplateInterfaceRecord {
        id: TemplateId::new(decl.name.clone(), constraints.arity()),
        members: decl.members.iter().map(|m| m.signature.clone()).collect(),
        constraints,
    })
}

fn classify_implementation(
    decl: &DeclarationShape,
    template: &QualifiedName,
    forced: bool,
) -> Result<TemplateImplementationRecord, ClassificationError> {
    if decl.kind == DeclarationKind::Interface || !decl.is_generic() {
        return Err(shape_mismatch(
            decl,
            &Marker::Implementation {
                template: template.clone(),
                forced,
            },
        ));
    }
    let constraints = constraint_set(decl)?;
    let members = decl
        .members
        .iter()
        .map(|m| match &m.body {
            Some(body) => Ok(MemberBody::new(m.signature.clone(), body.clone())),
            None => Err(ClassificationError::MissingBody {
                declaration: decl.name.clone(),
                member: m.signature.name.clone(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TemplateImplementationRecord {
        name: decl.name.clone(),
        template: template.clone(),
        constraints,
        members,
        forced,
    })
}

/// Validate parameter positions and build the declaration's constraint set.
fn constraint_set(decl: &DeclarationShape) -> Result<ConstraintSet, ClassificationError> {
    for (expected, param) in decl.generic_params.iter().enumerate() {
        if param.position != expected {
            return Err(ClassificationError::ParameterPosition {
                declaration: decl.name.clone(),
                parameter: param.name().to_string(),
                expected,
                found: param.position,
            });
        }
    }
    ConstraintSet::new(
        decl.generic_params
            .iter()
            .map(|p| p.constraints.clone())
            .collect(),
    )
    .map_err(|source| ClassificationError::InvalidConstraints {
        declaration: decl.name.clone(),
        source,
    })
}

fn shape_mismatch(decl: &DeclarationShape, marker: &Marker) -> ClassificationError {
    let shape = match (decl.is_generic(), decl.kind) {
        (true, DeclarationKind::Interface) => "a generic interface".to_string(),
        (false, DeclarationKind::Interface) => "a non-generic interface".to_string(),
        (true, kind) => format!("a generic {}", kind.as_str()),
        (false, kind) => format!("a non-generic {}", kind.as_str()),
    };
    ClassificationError::ShapeMismatch {
        declaration: decl.name.clone(),
        marker: marker.kind_str(),
        shape,
    }
}
