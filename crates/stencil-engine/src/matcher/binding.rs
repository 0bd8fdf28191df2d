//! The result of a successful match.

use std::sync::Arc;

use stencil_core::{
    ConcreteType, QualifiedName, TemplateImplementationRecord, TemplateInstantiationRecord,
    TemplateInterfaceRecord, TypeRef,
};

use crate::template::SubstitutionMap;
use crate::template::naming::format_template_instance_name;

/// An instantiation bound to one interface and one implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub interface: Arc<TemplateInterfaceRecord>,
    pub implementation: Arc<TemplateImplementationRecord>,
    pub instantiation: Arc<TemplateInstantiationRecord>,
    /// Interface parameter name → argument.
    pub substitution: SubstitutionMap,
    /// Implementation parameter name → argument.
    pub implementation_substitution: SubstitutionMap,
}

impl Binding {
    pub fn output_name(&self) -> &QualifiedName {
        &self.instantiation.output_name
    }

    pub fn arguments(&self) -> &[ConcreteType] {
        &self.instantiation.arguments
    }

    /// The closed interface type the unit implements, e.g. `Comparer<Int32>`.
    pub fn implemented_type(&self) -> TypeRef {
        TypeRef::generic(
            self.interface.name().clone(),
            self.arguments().iter().map(|a| a.ty.clone()).collect(),
        )
    }

    pub fn display_name(&self) -> String {
        format_template_instance_name(self.interface.name(), self.arguments())
    }
}
