// tests/matching_tests.rs
//! Matching tests: constraint semantics, selection and failure reporting.


use stencil::prelude::*;
use stencil::{MatchFailureKind, Requirement, satisfies, subsumes};
use test_harness::*;

fn failures(outcome: &PassOutcome, code: DiagnosticCode) -> Vec<String> {
    outcome
        .diagnostics()
        .with_code(code)
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn test_constraint_monotonicity() {
    // Adding a requirement can only shrink the set of satisfying types.
    let types = [
        int32(),
        string(),
        ConcreteType::enumeration("Color"),
        ConcreteType::value("Point"),
    ];
    let loose = ParamConstraints::new("T").with_flags(ConstraintFlags::VALUE_TYPE);
    let strict = loose.clone().with_flags(ConstraintFlags::UNMANAGED);
    let stricter = strict.clone().require_operator(Operator::LessThan);

    for ty in &types {
        if satisfies(ty, &stricter) {
            assert!(satisfies(ty, &strict), "{ty} passes stricter but not strict");
        }
        if satisfies(ty, &strict) {
            assert!(satisfies(ty, &loose), "{ty} passes strict but not loose");
        }
    }
    assert!(satisfies(&int32(), &stricter));
    assert!(!satisfies(&ConcreteType::value("Point"), &strict));
}

#[test]
fn test_subsumption_is_positional() {
    let interface = stencil::ConstraintSet::new(vec![value_param("T")]).unwrap();
    let stricter = stencil::ConstraintSet::new(vec![
        ParamConstraints::new("U").with_flags(ConstraintFlags::UNMANAGED),
    ])
    .unwrap();
    let looser = stencil::ConstraintSet::new(vec![ParamConstraints::new("U")]).unwrap();
    assert!(subsumes(&stricter, &interface));
    assert!(!subsumes(&looser, &interface));
}

#[test]
fn test_no_false_positive_match() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("NumComparer", value_param("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(&requests(), &comparer_request(vec![string()], "Comparer_String"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    assert!(outcome.bindings().is_empty());
    let diagnostic = outcome
        .diagnostics()
        .with_code(DiagnosticCode::ConstraintViolation)
        .next()
        .unwrap();
    assert!(diagnostic.message.contains("position 0"));
    assert!(diagnostic.message.contains("must be a value type"));
    assert!(diagnostic.message.contains("'String'"));
}

#[test]
fn test_ambiguity_is_never_silently_resolved() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    for name in ["Impls::Fast", "Impls::Slow"] {
        pass.offer(
            &comparer_implementation(name, value_param("T")),
            &implements_comparer(),
        )
        .unwrap();
    }
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    assert!(outcome.bindings().is_empty());
    assert_eq!(
        failures(&outcome, DiagnosticCode::AmbiguousImplementations),
        vec!["ambiguous implementations of 'Collections::Comparer': Impls::Fast, Impls::Slow"]
    );
}

#[test]
fn test_forced_implementation_resolves_ambiguity() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("Impls::Fast", value_param("T")),
        &Marker::Implementation {
            template: "Collections::Comparer".into(),
            forced: true,
        },
    )
    .unwrap();
    pass.offer(
        &comparer_implementation("Impls::Slow", value_param("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    assert_eq!(outcome.bindings().len(), 1);
    assert_eq!(
        outcome.bindings()[0].implementation.name.to_string(),
        "Impls::Fast"
    );
}

#[test]
fn test_explicit_implementation_choice() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    for name in ["Impls::Fast", "Impls::Slow"] {
        pass.offer(
            &comparer_implementation(name, value_param("T")),
            &implements_comparer(),
        )
        .unwrap();
    }
    let marker = Marker::Instantiation {
        template: "Collections::Comparer".into(),
        arguments: vec![int32()],
        output_name: None,
        implementation: Some("Impls::Slow".into()),
    };
    pass.offer(&requests(), &marker).unwrap();
    let outcome = pass.complete().unwrap();

    let binding = outcome
        .binding_for(&QualifiedName::from("Generated::Comparer_Int32"))
        .unwrap();
    assert_eq!(binding.implementation.name.to_string(), "Impls::Slow");
}

#[test]
fn test_arity_checked_before_constraints() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    // Two reference-type arguments: wrong arity and wrong category.
    pass.offer(
        &requests(),
        &comparer_request(vec![string(), string()], "Comparer_Bad"),
    )
    .unwrap();
    let outcome = pass.complete().unwrap();

    assert_eq!(
        failures(&outcome, DiagnosticCode::ArityMismatch),
        vec!["template 'Collections::Comparer' expects 1 type argument(s), got 2"]
    );
    assert!(failures(&outcome, DiagnosticCode::ConstraintViolation).is_empty());
}

#[test]
fn test_deferred_instantiation_binds_when_template_arrives() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    let request = comparer_request(vec![int32()], "Comparer_Int32");
    pass.offer(&requests(), &request).unwrap();

    let record = pass.store().instantiations.snapshot()[0].clone();
    assert!(pass.provisional(&record).unwrap().is_deferred());

    pass.offer(
        &comparer_implementation("NumComparer", value_param("T")),
        &implements_comparer(),
    )
    .unwrap();
    // Implementation alone is not enough: the interface is still unknown.
    assert!(pass.provisional(&record).unwrap().is_deferred());

    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    assert!(pass.provisional(&record).unwrap().binding().is_some());

    let outcome = pass.complete().unwrap();
    assert_eq!(outcome.bindings().len(), 1);
}

#[test]
fn test_unknown_template_fails_on_completion() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    let outcome = pass.complete().unwrap();
    let failure = outcome
        .diagnostics()
        .with_code(DiagnosticCode::NoImplementationFound)
        .next()
        .unwrap();
    assert!(failure.is_error());
    assert!(matches!(
        failure.related,
        Some(stencil::RecordIdentity::Instantiation { .. })
    ));
}

#[test]
fn test_implementation_with_weaker_constraints_is_excluded() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("Loose", ParamConstraints::new("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    assert_eq!(
        failures(&outcome, DiagnosticCode::ConstraintsNotSubsumed).len(),
        1
    );
    assert_eq!(
        failures(&outcome, DiagnosticCode::NoImplementationFound).len(),
        1
    );
}

#[test]
fn test_first_declared_implementation_wins_even_when_excluded() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    pass.offer(
        &comparer_implementation("Impls::Impl", ParamConstraints::new("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(
        &comparer_implementation("Impls::Impl", value_param("T")),
        &implements_comparer(),
    )
    .unwrap();
    pass.offer(&requests(), &comparer_request(vec![int32()], "Comparer_Int32"))
        .unwrap();
    let outcome = pass.complete().unwrap();

    // The later, well-formed declaration must not stand in for the first.
    assert!(outcome.bindings().is_empty());
    assert_eq!(
        failures(&outcome, DiagnosticCode::ConflictingDefinition).len(),
        1
    );
    assert_eq!(
        failures(&outcome, DiagnosticCode::ConstraintsNotSubsumed).len(),
        1
    );
    assert_eq!(
        failures(&outcome, DiagnosticCode::NoImplementationFound).len(),
        1
    );
}

#[test]
fn test_implementation_missing_members_is_excluded() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    pass.offer(&comparer_interface(), &Marker::Interface).unwrap();
    let empty = DeclarationShape::new("Empty", DeclarationKind::Class).with_param(value_param("T"));
    pass.offer(&empty, &implements_comparer()).unwrap();
    let outcome = pass.complete().unwrap();
    assert_eq!(
        failures(&outcome, DiagnosticCode::MissingMembers),
        vec!["implementation 'Empty' is missing members: less, equal"]
    );
}

#[test]
fn test_operator_requirement_is_structural() {
    let engine = TemplateEngine::default();
    let pass = engine.begin_pass();
    let ordered = DeclarationShape::new("Ordered", DeclarationKind::Interface)
        .with_param(ParamConstraints::new("T").require_operator(Operator::LessThan));
    pass.offer(&ordered, &Marker::Interface).unwrap();
    pass.offer(
        &DeclarationShape::new("OrderedImpl", DeclarationKind::Class)
            .with_param(ParamConstraints::new("T").require_operator(Operator::LessThan)),
        &Marker::implementation("Ordered"),
    )
    .unwrap();

    // Same operator, different form: by-value operands instead of `in`.
    let odd = ConcreteType::value("Odd").with_operator_form(
        Operator::LessThan,
        stencil::OperatorForm::new(stencil::PassMode::Value, 2, stencil::ReturnKind::Bool),
    );
    pass.offer(
        &requests(),
        &Marker::instantiation("Ordered", vec![odd], "Ordered_Odd"),
    )
    .unwrap();
    let outcome = pass.complete().unwrap();

    let failure = outcome
        .diagnostics()
        .with_code(DiagnosticCode::ConstraintViolation)
        .next()
        .unwrap();
    assert!(failure.message.contains("must provide operator < (in, in) -> bool"));

    let kind = MatchFailureKind::ConstraintViolation {
        position: 0,
        parameter: "T".into(),
        argument: TypeRef::named("Odd"),
        requirement: Requirement::Operator {
            op: Operator::LessThan,
            form: Operator::LessThan.natural_form(),
        },
    };
    assert_eq!(failure.message, kind.to_string());
}
