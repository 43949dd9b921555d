//! Integration tests for the scope-building pass.


use moonc::*;
use test_harness::*;

#[test]
fn polynomial_program_builds_without_diagnostics() {
    let harness = TestHarness::analyze(polynomial_program());
    harness.assert_no_errors();
    assert!(harness.warnings().is_empty());
}

#[test]
fn polynomial_scope_tree_shape() {
    let harness = TestHarness::analyze(polynomial_program());
    let tree = &harness.analysis.scopes;

    let top: Vec<String> = tree
        .nested_scopes(tree.root())
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect();
    assert_eq!(top, vec!["POLYNOMIAL", "LINEAR", "QUADRATIC", "main()"]);

    let linear: Vec<String> = tree
        .nested_scopes(harness.scope(&["LINEAR"]))
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect();
    assert_eq!(linear, vec!["build(float, float)", "evaluate(float)"]);

    let ctor = harness.scope(&["QUADRATIC", "QUADRATIC(float, float, float)"]);
    assert_eq!(
        tree.qualified_name(ctor),
        "QUADRATIC::QUADRATIC(float, float, float)"
    );
    assert_eq!(tree.scope(ctor).unwrap().kind(), ScopeKind::Function);
    assert_eq!(tree.parent(ctor), Some(harness.scope(&["QUADRATIC"])));
}

#[test]
fn polynomial_class_symbols() {
    let harness = TestHarness::analyze(polynomial_program());

    let linear = harness.symbol(&[], "LINEAR");
    assert_eq!(linear.kind, SymbolKind::Class);
    assert_eq!(linear.inherited_classes, vec!["POLYNOMIAL".to_string()]);
    let polynomial = harness.symbol(&[], "POLYNOMIAL");
    assert!(polynomial.inherited_classes.is_empty());

    let a = harness.symbol(&["LINEAR"], "a");
    assert_eq!(a.kind, SymbolKind::Variable);
    assert_eq!(a.declared_type, "float");
    assert_eq!(a.visibility, Visibility::Private);
    // Visibility markers stick until the next one
    let visibility = |name| harness.symbol(&["LINEAR"], name).visibility;
    assert_eq!(visibility("b"), Visibility::Private);
    assert_eq!(visibility("evaluate"), Visibility::Public);
}

#[test]
fn member_functions_are_declared_and_defined() {
    let harness = TestHarness::analyze(polynomial_program());

    let build = harness.symbol(&["LINEAR"], "build");
    assert_eq!(build.kind, SymbolKind::Function);
    assert_eq!(build.declared_type, "LINEAR");
    assert!(build.declared && build.defined);
    assert!(build.definition_span.is_some());
    let params: Vec<_> = build.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["A", "B"]);

    let ctor = harness.symbol(&["QUADRATIC"], "QUADRATIC");
    assert_eq!(ctor.declared_type, "QUADRATIC");
    assert_eq!(ctor.params.len(), 3);
}

#[test]
fn function_scopes_hold_parameters_and_locals() {
    let harness = TestHarness::analyze(polynomial_program());
    let scopes = &harness.analysis.scopes;

    let build = harness.scope(&["LINEAR", "build(float, float)"]);
    let names: Vec<_> = scopes
        .scope(build)
        .unwrap()
        .symbols()
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert_eq!(
        names,
        vec![
            ("A", SymbolKind::Parameter),
            ("B", SymbolKind::Parameter),
            ("new_function", SymbolKind::Variable),
        ]
    );

    // Locals of `main` are visible from its scope but not from the globals
    let main = harness.scope(&["main()"]);
    assert!(scopes.lookup(main, "counter", true).is_some());
    assert!(scopes.lookup(scopes.root(), "counter", false).is_none());
    // Lookup walks outwards unless restricted to the local scope
    assert!(scopes.lookup(main, "LINEAR", false).is_some());
    assert!(scopes.lookup(main, "LINEAR", true).is_none());
}

#[test]
fn registration_counters() {
    let ast = polynomial_program();
    let out = ScopeBuildingPass::new(&ast).run();
    assert_eq!(out.classes_registered, 3);
    // Five member declarations and `main`
    assert_eq!(out.functions_registered, 6);
    // Five data members and six locals
    assert_eq!(out.variables_registered, 11);
}

#[test]
fn faulty_program_reports_every_problem() {
    let harness = TestHarness::analyze(faulty_program());
    macro_rules! assert_count {
        ($variant:ident, $expected:expr) => {
            let found = harness.count(|e| matches!(e, SemanticError::$variant { .. }));
            assert_eq!(found, $expected, stringify!($variant));
        };
    }

    assert_count!(DuplicateClass, 1);
    assert_count!(DuplicateVariable, 1);
    assert_count!(DuplicateParameter, 1);
    assert_count!(DuplicateFunction, 1);
    assert_count!(UndeclaredClass, 1);
    assert_count!(UndeclaredParentClass, 1);
    assert_count!(CircularInheritance, 2);
    assert_count!(MissingDefinition, 1);
    assert_count!(MissingDeclaration, 1);
    assert_count!(InvalidArrayDimension, 1);
    assert_count!(OverloadedFunction, 1);
    assert_count!(ShadowedMember, 2);

    assert_eq!(harness.errors().len(), 11);
    assert_eq!(harness.warnings().len(), 3);
}

#[test]
fn faulty_program_messages_name_the_offender() {
    let harness = TestHarness::analyze(faulty_program());
    let text = harness.analysis.diagnostics.to_string();

    for expected in [
        "multiply declared class 'A'",
        "multiply declared variable 'y' in 'A::f(int)'",
        "multiply declared parameter 'a' in 'dup(int, int)'",
        "multiply declared function 'over(int)'",
        "implementation for undeclared class 'GHOST'",
        "class 'A' inherits from undeclared class 'NOPE'",
        "no definition for declared member function 'A::g()'",
        "definition provided for undeclared member function 'A::h()'",
        "invalid array dimension 'abc'",
        "overloaded function 'over(float)'",
    ] {
        assert!(text.contains(expected), "missing: {expected}");
    }
}

#[test]
fn rejected_declarations_are_skipped() {
    let harness = TestHarness::analyze(faulty_program());
    let scopes = &harness.analysis.scopes;

    // Unknown parents are dropped from the inheritance list
    let a = harness.symbol(&[], "A");
    assert_eq!(a.inherited_classes, vec!["B".to_string()]);

    // Only the first `y` survives, with its original type
    let f = harness.scope(&["A", "f(int)"]);
    let y = scopes.lookup(f, "y", true).unwrap();
    assert_eq!(y.declared_type, "int");

    // The malformed dimension is recorded as dynamic
    let v = harness.symbol(&["dup(int, int)"], "v");
    assert_eq!(v.array_dimensions, vec![-1]);

    // The rejected `over(int): int` keeps the first definition's return type
    let signature = Signature::new("over", vec!["int".into()]);
    let root = scopes.root();
    let over = scopes.lookup_function(root, &signature, true).unwrap();
    assert_eq!(over.declared_type, "void");
    let overloads = scopes.lookup_functions(root, "over", true);
    assert_eq!(overloads.len(), 2);
}

#[test]
fn diagnostics_are_in_discovery_order() {
    let harness = TestHarness::analyze(faulty_program());
    let all: Vec<_> = harness.analysis.diagnostics.iter().collect();

    assert!(matches!(all[0], SemanticError::DuplicateClass { .. }));
    assert!(matches!(all[1], SemanticError::DuplicateVariable { .. }));
    assert!(matches!(all[2], SemanticError::UndeclaredClass { .. }));
    // Post-traversal checks run after every declaration was visited
    let last = all.last().unwrap();
    assert!(matches!(last, SemanticError::ShadowedMember { .. }));
    assert_eq!(last.severity(), Severity::Warning);
}
