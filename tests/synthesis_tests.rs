// tests/synthesis_tests.rs
//! End-to-end synthesis tests: declarations in, specialized source out.


use stencil::prelude::*;
use test_harness::*;

#[test]
fn test_round_trip_comparer_int32() {
    let engine = TemplateEngine::default();
    let outcome = standard_outcome(&engine);
    let (units, diagnostics) = outcome.synthesize_all();

    assert!(diagnostics.is_empty(), "{diagnostics}");
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit.output_name.to_string(), "Generated::Comparer_Int32");
    assert_eq!(unit.unit.implements.to_string(), "Collections::Comparer<Int32>");

    let names: Vec<&str> = unit
        .unit
        .members
        .iter()
        .map(|m| m.signature.name.as_str())
        .collect();
    assert_eq!(names, vec!["less", "equal"]);

    let less = unit.unit.member("less").unwrap();
    assert_eq!(less.signature.to_string(), "less(a: Int32, b: Int32) -> Bool");
    assert_eq!(less.body, "let lhs: Int32 = a;\nreturn lhs < b;");
    let equal = unit.unit.member("equal").unwrap();
    assert_eq!(equal.signature.to_string(), "equal(a: Int32, b: Int32) -> Bool");
    assert_eq!(equal.body, "let rhs: Int32 = b;\nreturn !(a < rhs) && !(rhs < a);");

    assert!(
        !identifiers(&unit.source_text).iter().any(|i| i == "T"),
        "generic parameter survived:\n{}",
        unit.source_text
    );
}

#[test]
fn test_renamed_implementation_parameter() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("NumComparer", value_param("Elem")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(
        &requests(),
        &comparer_request(vec![ConcreteType::unmanaged("Float64")], "Comparer_Float64"),
    )
    .unwrap();
    let outcome = pass.complete().unwrap();

    let unit = outcome.units().next().unwrap().unwrap();
    assert_eq!(
        unit.unit.member("less").unwrap().body,
        "let lhs: Float64 = a;\nreturn lhs < b;"
    );
    assert!(!identifiers(&unit.source_text).iter().any(|i| i == "Elem"));
}

#[test]
fn test_signature_keeps_implementation_parameter_names() {
    let interface_less = MemberSignature::new(
        "less",
        vec![
            Param::new("x", TypeRef::param("T")),
            Param::new("y", TypeRef::param("T")),
        ],
        TypeRef::named("Bool"),
    );
    let interface = DeclarationShape::new("Ordering", DeclarationKind::Interface)
        .with_param(value_param("T"))
        .with_member(DeclaredMember::abstract_member(interface_less));
    let implementation = DeclarationShape::new("PlainOrdering", DeclarationKind::Struct)
        .with_param(value_param("T"))
        .with_member(DeclaredMember::with_body(less("T"), "return a < b;"));

    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&interface, &Marker::Interface).unwrap();
    pass.offer(&implementation, &Marker::implementation("Ordering")).unwrap();
    pass.offer(
        &requests(),
        &Marker::instantiation("Ordering", vec![int32()], "Ordering_Int32"),
    )
    .unwrap();
    let (units, diagnostics) = pass.complete().unwrap().synthesize_all();
    assert!(diagnostics.is_empty(), "{diagnostics}");

    let less = units[0].unit.member("less").unwrap();
    assert_eq!(less.signature.to_string(), "less(a: Int32, b: Int32) -> Bool");
    assert_eq!(less.body, "return a < b;");
    assert!(
        units[0]
            .source_text
            .contains("fn less(a: Int32, b: Int32) -> Bool {\n        return a < b;")
    );
}

#[test]
fn test_two_parameter_template_with_nested_argument() {
    let get = MemberSignature::new(
        "get",
        vec![Param::new("key", TypeRef::param("K"))],
        TypeRef::param("V"),
    );
    let map = DeclarationShape::new("Lookup", DeclarationKind::Interface)
        .with_param(ParamConstraints::new("K").require_operator(Operator::Equals))
        .with_param(ParamConstraints::new("V"))
        .with_member(DeclaredMember::abstract_member(get.clone()));
    let linear = DeclarationShape::new("LinearLookup", DeclarationKind::Class)
        .with_param(ParamConstraints::new("K").require_operator(Operator::Equals))
        .with_param(ParamConstraints::new("V"))
        .with_member(DeclaredMember::with_body(
            get,
            "for entry in self.entries { if entry.key == key { return entry.value as V; } }\n\
             return V::default();",
        ));

    let string_key = ConcreteType::reference("String").with_operator(Operator::Equals);
    let list = ConcreteType::new(
        TypeRef::generic("List", vec![TypeRef::named("Int32")]),
        stencil::TypeCategory::Reference,
    );

    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&map, &Marker::Interface).unwrap();
    pass.offer(&linear, &Marker::implementation("Lookup")).unwrap();
    pass.offer(
        &requests(),
        &Marker::Instantiation {
            template: "Lookup".into(),
            arguments: vec![string_key, list],
            output_name: None,
            implementation: None,
        },
    )
    .unwrap();
    let outcome = pass.complete().unwrap();
    let (units, diagnostics) = outcome.synthesize_all();
    assert!(diagnostics.is_empty(), "{diagnostics}");

    let unit = &units[0];
    assert_eq!(unit.output_name.to_string(), "Generated::Lookup_String_List_Int32");
    let get = unit.unit.member("get").unwrap();
    assert_eq!(get.signature.to_string(), "get(key: String) -> List<Int32>");
    assert!(get.body.contains("entry.value as List<Int32>"));
    assert!(get.body.contains("return List<Int32>::default();"));

    // K requires ==, so one witness forwards it.
    assert_eq!(unit.auxiliary.len(), 1);
    let witness = &unit.auxiliary[0];
    assert_eq!(witness.name.to_string(), "Generated::Lookup_String_List_Int32_KOps");
    assert!(witness.member("op_equals").is_some());
}

#[test]
fn test_failed_instantiation_produces_no_unit() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("NumComparer", value_param("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    pass.offer(&requests(), &comparer_request(vec![string()], "Comparer_String"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    let (units, diagnostics) = outcome.synthesize_all();
    assert_eq!(units.len(), 1);
    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        diagnostics.errors().next().unwrap().code,
        DiagnosticCode::ConstraintViolation
    );
}

#[test]
fn test_synthesis_is_deterministic_across_passes() {
    let engine = TemplateEngine::default();
    let first = standard_outcome(&engine).synthesize_all().0;
    let second = standard_outcome(&engine).synthesize_all().0;
    assert_eq!(first, second);
}
