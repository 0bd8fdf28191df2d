//! Discovery records.
//!
//! Records are the typed, immutable result of classifying one declaration.
//! They compare and hash structurally, which is what the dedup store keys on.

use std::fmt;

use crate::{
    ConcreteType, ConstraintSet, Fingerprint, Fingerprinted, QualifiedName, TypeRef,
};

/// A template referenced by name, as markers spell it. Arity is resolved
/// against the known interfaces.
pub type TemplateName = QualifiedName;

/// Identity of a template interface: scope, name and arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId {
    pub name: TemplateName,
    pub arity: usize,
}

impl TemplateId {
    pub fn new(name: impl Into<TemplateName>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}`{}", self.name, self.arity)
    }
}

/// A named, typed member parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A member signature declared on a template or implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    /// Member name.
    pub name: String,
    /// Parameters in order.
    pub params: Vec<Param>,
    /// Return type.
    pub returns: TypeRef,
}

impl MemberSignature {
    pub fn new(name: impl Into<String>, params: Vec<Param>, returns: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }

    /// Check if a generic parameter occurs anywhere in this signature.
    pub fn mentions(&self, param: &str) -> bool {
        self.returns.mentions(param) || self.params.iter().any(|p| p.ty.mentions(param))
    }

    /// Name and parameter types; return types do not distinguish members.
    pub fn shape(&self) -> (&str, Vec<&TypeRef>) {
        (&self.name, self.params.iter().map(|p| &p.ty).collect())
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", p.name, p.ty)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

impl Fingerprinted for MemberSignature {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::TYPE)
            .str(&self.name)
            .len(self.params.len());
        for p in &self.params {
            builder = builder.str(&p.name).nested(p.ty.fingerprint());
        }
        builder.nested(self.returns.fingerprint()).finish()
    }
}

/// A member signature with its opaque, substitutable body text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberBody {
    pub signature: MemberSignature,
    pub body: String,
}

impl MemberBody {
    pub fn new(signature: MemberSignature, body: impl Into<String>) -> Self {
        Self {
            signature,
            body: body.into(),
        }
    }
}

/// A discovered template interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateInterfaceRecord {
    pub id: TemplateId,
    pub members: Vec<MemberSignature>,
    pub constraints: ConstraintSet,
}

impl TemplateInterfaceRecord {
    pub fn name(&self) -> &TemplateName {
        &self.id.name
    }

    pub fn arity(&self) -> usize {
        self.id.arity
    }
}

impl Fingerprinted for TemplateInterfaceRecord {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::INTERFACE)
            .nested(self.id.name.fingerprint())
            .u64(self.id.arity as u64)
            .nested(self.constraints.fingerprint())
            .len(self.members.len());
        for member in &self.members {
            builder = builder.nested(member.fingerprint());
        }
        builder.finish()
    }
}

/// A discovered template implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateImplementationRecord {
    /// Implementation name with declaring scope.
    pub name: QualifiedName,
    /// The template this type claims to implement.
    pub template: TemplateName,
    /// Constraints on the implementation's own parameters.
    pub constraints: ConstraintSet,
    /// Member bodies in declaration order.
    pub members: Vec<MemberBody>,
    /// Preferred when auto-selection would otherwise be ambiguous.
    pub forced: bool,
}

impl TemplateImplementationRecord {
    pub fn arity(&self) -> usize {
        self.constraints.arity()
    }

    pub fn member(&self, name: &str) -> Option<&MemberBody> {
        self.members.iter().find(|m| m.signature.name == name)
    }
}

impl Fingerprinted for TemplateImplementationRecord {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::IMPLEMENTATION)
            .nested(self.name.fingerprint())
            .nested(self.template.fingerprint())
            .nested(self.constraints.fingerprint())
            .flag(self.forced)
            .len(self.members.len());
        for member in &self.members {
            builder = builder
                .nested(member.signature.fingerprint())
                .str(&member.body);
        }
        builder.finish()
    }
}

/// A request to instantiate a template with concrete arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateInstantiationRecord {
    /// Requested template.
    pub template: TemplateName,
    /// Closed type arguments in order.
    pub arguments: Vec<ConcreteType>,
    /// Name of the synthesized type.
    pub output_name: QualifiedName,
    /// Explicitly chosen implementation; auto-selected when `None`.
    pub implementation: Option<QualifiedName>,
}

impl TemplateInstantiationRecord {
    pub fn argument_list(&self) -> String {
        self.arguments
            .iter()
            .map(|a| a.ty.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn auto_selects(&self) -> bool {
        self.implementation.is_none()
    }
}

impl Fingerprinted for TemplateInstantiationRecord {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::INSTANTIATION)
            .nested(self.template.fingerprint())
            .len(self.arguments.len());
        for arg in &self.arguments {
            builder = builder.nested(arg.fingerprint());
        }
        builder = builder.nested(self.output_name.fingerprint());
        match &self.implementation {
            Some(name) => builder.flag(true).nested(name.fingerprint()).finish(),
            None => builder.flag(false).finish(),
        }
    }
}

/// The identity of a record, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordIdentity {
    Interface(TemplateId),
    Implementation {
        name: QualifiedName,
        template: TemplateName,
    },
    Instantiation {
        template: TemplateName,
        arguments: Vec<TypeRef>,
        output_name: QualifiedName,
    },
    /// A declaration that never became a record.
    Declaration(QualifiedName),
}

impl From<&TemplateInterfaceRecord> for RecordIdentity {
    fn from(record: &TemplateInterfaceRecord) -> Self {
        RecordIdentity::Interface(record.id.clone())
    }
}

impl From<&TemplateImplementationRecord> for RecordIdentity {
    fn from(record: &TemplateImplementationRecord) -> Self {
        RecordIdentity::Implementation {
            name: record.name.clone(),
            template: record.template.clone(),
        }
    }
}

impl From<&TemplateInstantiationRecord> for RecordIdentity {
    fn from(record: &TemplateInstantiationRecord) -> Self {
        RecordIdentity::Instantiation {
            template: record.template.clone(),
            arguments: record.arguments.iter().map(|a| a.ty.clone()).collect(),
            output_name: record.output_name.clone(),
        }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIdentity::Interface(id) => write!(f, "template interface {id}"),
            RecordIdentity::Implementation { name, template } => {
                write!(f, "implementation {name} of {template}")
            }
            RecordIdentity::Instantiation {
                template,
                arguments,
                output_name,
            } => {
                write!(f, "instantiation {template}<")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "> as {output_name}")
            }
            RecordIdentity::Declaration(name) => write!(f, "declaration {name}"),
        }
    }
}
