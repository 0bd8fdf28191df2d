//! Type references and concrete type descriptors.
//!
//! [`TypeRef`] is the type expression used in member signatures: either a
//! generic parameter or a named (possibly generic) type. [`ConcreteType`] is a
//! closed type as described by the host front end, carrying the structural
//! facts the constraint model checks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;

use crate::{Fingerprint, Fingerprinted, Operator, OperatorForm, QualifiedName};

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    /// A generic parameter, e.g. `T`.
    Param(String),
    /// A named type with optional type arguments, e.g. `List<T>`.
    Named {
        name: QualifiedName,
        args: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// Reference a generic parameter.
    pub fn param(name: impl Into<String>) -> Self {
        TypeRef::Param(name.into())
    }

    /// Reference a non-generic named type.
    pub fn named(name: impl Into<QualifiedName>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Reference a generic named type.
    pub fn generic(name: impl Into<QualifiedName>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    /// A type is closed if no generic parameter occurs anywhere in it.
    pub fn is_closed(&self) -> bool {
        match self {
            TypeRef::Param(_) => false,
            TypeRef::Named { args, .. } => args.iter().all(TypeRef::is_closed),
        }
    }

    /// Collect every parameter name occurring in this type, in order of first
    /// appearance.
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Param(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            TypeRef::Named { args, .. } => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }

    /// Check if the given parameter occurs in this type.
    pub fn mentions(&self, param: &str) -> bool {
        match self {
            TypeRef::Param(name) => name == param,
            TypeRef::Named { args, .. } => args.iter().any(|a| a.mentions(param)),
        }
    }

    /// Identifier-safe rendering: `Map<String, List<Int32>>` becomes
    /// `Map_String_List_Int32`.
    pub fn mangled(&self) -> String {
        match self {
            TypeRef::Param(name) => name.clone(),
            TypeRef::Named { name, args } => {
                let mut out = name.mangled();
                for arg in args {
                    out.push('_');
                    out.push_str(&arg.mangled());
                }
                out
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Param(name) => write!(f, "{name}"),
            TypeRef::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

impl Fingerprinted for TypeRef {
    fn fingerprint(&self) -> Fingerprint {
        match self {
            TypeRef::Param(name) => Fingerprint::builder(Fingerprint::TYPE)
                .flag(false)
                .str(name)
                .finish(),
            TypeRef::Named { name, args } => {
                let mut builder = Fingerprint::builder(Fingerprint::TYPE)
                    .flag(true)
                    .nested(name.fingerprint())
                    .len(args.len());
                for arg in args {
                    builder = builder.nested(arg.fingerprint());
                }
                builder.finish()
            }
        }
    }
}

/// Memory category of a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCategory {
    /// Copied on assignment.
    Value,
    /// Handle semantics.
    Reference,
}

bitflags! {
    /// Structural facts about a concrete type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct TypeTraits: u8 {
        /// Contains no managed references anywhere in its layout.
        const UNMANAGED = 1 << 0;
        /// Is an enumeration.
        const ENUM = 1 << 1;
        /// Is immutable after construction.
        const READONLY = 1 << 2;
        /// Declares no instance fields.
        const NO_INSTANCE_FIELDS = 1 << 3;
    }
}

/// A closed type argument and the facts the constraint model checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteType {
    /// The type itself.
    pub ty: TypeRef,
    /// Value or reference semantics.
    pub category: TypeCategory,
    /// Structural traits.
    pub traits: TypeTraits,
    /// Operators the type provides, with their functional form.
    pub operators: BTreeMap<Operator, OperatorForm>,
    /// Member names the type overrides.
    pub overrides: BTreeSet<String>,
}

impl ConcreteType {
    /// Create a concrete type with no traits, operators or overrides.
    pub fn new(ty: TypeRef, category: TypeCategory) -> Self {
        Self {
            ty,
            category,
            traits: TypeTraits::empty(),
            operators: BTreeMap::new(),
            overrides: BTreeSet::new(),
        }
    }

    /// A plain value type.
    pub fn value(name: impl Into<QualifiedName>) -> Self {
        Self::new(TypeRef::named(name), TypeCategory::Value)
    }

    /// An unmanaged value type (primitive-like).
    pub fn unmanaged(name: impl Into<QualifiedName>) -> Self {
        Self::value(name).with_traits(TypeTraits::UNMANAGED)
    }

    /// An enumeration. Enums are unmanaged value types.
    pub fn enumeration(name: impl Into<QualifiedName>) -> Self {
        Self::value(name).with_traits(TypeTraits::UNMANAGED | TypeTraits::ENUM)
    }

    /// A reference type.
    pub fn reference(name: impl Into<QualifiedName>) -> Self {
        Self::new(TypeRef::named(name), TypeCategory::Reference)
    }

    pub fn with_traits(mut self, traits: TypeTraits) -> Self {
        self.traits |= traits;
        self
    }

    /// Declare an operator in its natural form.
    pub fn with_operator(self, op: Operator) -> Self {
        self.with_operator_form(op, op.natural_form())
    }

    pub fn with_operator_form(mut self, op: Operator, form: OperatorForm) -> Self {
        self.operators.insert(op, form);
        self
    }

    pub fn with_override(mut self, member: impl Into<String>) -> Self {
        self.overrides.insert(member.into());
        self
    }

    pub fn is_value_type(&self) -> bool {
        self.category == TypeCategory::Value
    }

    pub fn is_closed(&self) -> bool {
        self.ty.is_closed()
    }

    /// Check if the type provides `op` with exactly `form`.
    pub fn provides(&self, op: Operator, form: OperatorForm) -> bool {
        self.operators.get(&op) == Some(&form)
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

impl Fingerprinted for ConcreteType {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::TYPE)
            .nested(self.ty.fingerprint())
            .flag(self.is_value_type())
            .u64(self.traits.bits() as u64)
            .len(self.operators.len());
        for (op, form) in &self.operators {
            builder = builder
                .u64(*op as u64)
                .u64(form.pass as u64)
                .u64(form.arity as u64)
                .u64(form.returns as u64);
        }
        builder = builder.len(self.overrides.len());
        for name in &self.overrides {
            builder = builder.str(name);
        }
        builder.finish()
    }
}
