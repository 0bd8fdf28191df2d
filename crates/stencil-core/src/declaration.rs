//! Front-end input: declaration shapes and decoded marker data.

use crate::{ConcreteType, MemberSignature, ParamConstraints, QualifiedName, TemplateName};

/// The syntactic kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Interface-like: signatures only.
    Interface,
    /// Reference-type class.
    Class,
    /// Value-type struct.
    Struct,
}

impl DeclarationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Interface => "interface",
            DeclarationKind::Class => "class",
            DeclarationKind::Struct => "struct",
        }
    }
}

/// A generic parameter as the front end reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParam {
    /// 0-based position within the parameter list.
    pub position: usize,
    /// Declared constraints; `constraints.name` is the parameter name.
    pub constraints: ParamConstraints,
}

impl GenericParam {
    pub fn new(position: usize, constraints: ParamConstraints) -> Self {
        Self {
            position,
            constraints,
        }
    }

    /// An unconstrained parameter.
    pub fn plain(position: usize, name: impl Into<String>) -> Self {
        Self::new(position, ParamConstraints::new(name))
    }

    pub fn name(&self) -> &str {
        &self.constraints.name
    }
}

/// A member as the front end reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredMember {
    pub signature: MemberSignature,
    /// Body fragment; absent on interface members.
    pub body: Option<String>,
}

impl DeclaredMember {
    pub fn abstract_member(signature: MemberSignature) -> Self {
        Self {
            signature,
            body: None,
        }
    }

    pub fn with_body(signature: MemberSignature, body: impl Into<String>) -> Self {
        Self {
            signature,
            body: Some(body.into()),
        }
    }
}

/// A declaration produced by the host front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationShape {
    /// Name with declaring scope.
    pub name: QualifiedName,
    pub kind: DeclarationKind,
    pub generic_params: Vec<GenericParam>,
    pub members: Vec<DeclaredMember>,
}

impl DeclarationShape {
    pub fn new(name: impl Into<QualifiedName>, kind: DeclarationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            generic_params: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Append a generic parameter at the next position.
    pub fn with_param(mut self, constraints: ParamConstraints) -> Self {
        let position = self.generic_params.len();
        self.generic_params.push(GenericParam::new(position, constraints));
        self
    }

    pub fn with_member(mut self, member: DeclaredMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

/// Decoded marker data attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    /// "This interface is a template."
    Interface,
    /// "This type implements template X."
    Implementation {
        template: TemplateName,
        /// Prefer this implementation when auto-selection finds several.
        forced: bool,
    },
    /// "Instantiate template X with these arguments, producing N."
    Instantiation {
        template: TemplateName,
        arguments: Vec<ConcreteType>,
        /// Output name; derived from template and arguments when `None`.
        output_name: Option<String>,
        /// Explicit implementation choice.
        implementation: Option<QualifiedName>,
    },
}

impl Marker {
    pub fn implementation(template: impl Into<TemplateName>) -> Self {
        Marker::Implementation {
            template: template.into(),
            forced: false,
        }
    }

    pub fn instantiation(
        template: impl Into<TemplateName>,
        arguments: Vec<ConcreteType>,
        output_name: impl Into<String>,
    ) -> Self {
        Marker::Instantiation {
            template: template.into(),
            arguments,
            output_name: Some(output_name.into()),
            implementation: None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Marker::Interface => "template interface",
            Marker::Implementation { .. } => "template implementation",
            Marker::Instantiation { .. } => "template instantiation",
        }
    }
}
