//! Names for synthesized units.

use stencil_core::{ConcreteType, QualifiedName, TemplateName};

/// Display name of an instance: `Comparer<Int32>`.
pub fn format_template_instance_name(
    template: &TemplateName,
    type_args: &[ConcreteType],
) -> String {
    format!("{}<{}>", template, format_type_args(type_args))
}

/// Type arguments as a comma-separated list.
pub fn format_type_args(type_args: &[ConcreteType]) -> String {
    type_args
        .iter()
        .map(|t| t.ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Identifier-safe output name derived from the template's simple name and
/// its arguments: `Comparer_Int32`, `Map_String_List_Int32`.
pub fn derive_output_name(
    template: &TemplateName,
    type_args: &[ConcreteType],
    separator: &str,
) -> String {
    let mut name = template.simple_name().to_string();
    for arg in type_args {
        name.push_str(separator);
        name.push_str(&arg.ty.mangled());
    }
    name
}

/// Resolve a requested output name against the declaring scope: a bare name
/// lands in `scope`, a `::`-qualified name is taken as is.
pub fn resolve_output_name(requested: &str, scope: &[String]) -> QualifiedName {
    if requested.contains("::") {
        QualifiedName::from_qualified_string(requested)
    } else {
        QualifiedName::new(requested.trim(), scope.to_vec())
    }
}

/// Name of the operator witness emitted for one parameter of a unit.
pub fn witness_name(unit: &QualifiedName, parameter: &str, separator: &str) -> QualifiedName {
    unit.sibling(format!("{}{}{}Ops", unit.name, separator, parameter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::TypeRef;

    fn int() -> ConcreteType {
        ConcreteType::unmanaged("Int32")
    }

    #[test]
    fn display_name() {
        let template = TemplateName::from("Collections::Map");
        let args = [ConcreteType::reference("String"), int()];
        assert_eq!(
            format_template_instance_name(&template, &args),
            "Collections::Map<String, Int32>"
        );
    }

    #[test]
    fn derived_name_uses_simple_template_name() {
        let template = TemplateName::from("Collections::Comparer");
        assert_eq!(derive_output_name(&template, &[int()], "_"), "Comparer_Int32");
    }

    #[test]
    fn derived_name_mangles_nested_arguments() {
        let list = ConcreteType::new(
            TypeRef::generic("List", vec![TypeRef::named("Int32")]),
            stencil_core::TypeCategory::Reference,
        );
        let template = TemplateName::from("Map");
        assert_eq!(
            derive_output_name(&template, &[ConcreteType::reference("String"), list], "_"),
            "Map_String_List_Int32"
        );
    }

    #[test]
    fn output_name_scope_resolution() {
        let scope = vec!["Generated".to_string()];
        assert_eq!(
            resolve_output_name("Comparer_Int32", &scope).to_string(),
            "Generated::Comparer_Int32"
        );
        assert_eq!(
            resolve_output_name("Other::Comparer_Int32", &scope).to_string(),
            "Other::Comparer_Int32"
        );
    }

    #[test]
    fn witness_is_sibling_of_unit() {
        let unit = QualifiedName::from("Generated::Comparer_Int32");
        assert_eq!(
            witness_name(&unit, "T", "_").to_string(),
            "Generated::Comparer_Int32_TOps"
        );
    }
}
