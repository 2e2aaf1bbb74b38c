//! Core expression/rule evaluation (spec.md §4.6-§4.9) through `evaluate`.

use policy_engine::{evaluate, ErrorKind, Value};

fn obj(pairs: &[(&str, Value)]) -> Value {
    let mut map = indexmap::IndexMap::new();
    for (k, v) in pairs {
        map.insert((*k).into(), v.clone());
    }
    Value::Object(map)
}

fn ok(source: &str) -> Value {
    evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap().value
}

#[test]
fn arithmetic_operators() {
    assert_eq!(ok("package p\nr := 1 + 2"), Value::int(3));
    assert_eq!(ok("package p\nr := 5 - 2"), Value::int(3));
    assert_eq!(ok("package p\nr := 4 * 2"), Value::int(8));
    assert_eq!(ok("package p\nr := 7 / 2"), Value::float(3.5));
    assert_eq!(ok("package p\nr := 6 / 2"), Value::int(3));
    assert_eq!(ok("package p\nr := 7 % 2"), Value::int(1));
}

#[test]
fn float_and_int_mix_promotes_to_float() {
    assert_eq!(ok("package p\nr := 1 + 1.5"), Value::float(2.5));
}

#[test]
fn division_by_zero_is_undefined_not_an_error() {
    let result = evaluate("package p\nr := 1 / 0", Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn arithmetic_type_mismatch_is_undefined_not_an_error() {
    let result = evaluate("package p\nr := 1 + \"a\"", Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn comparison_type_mismatch_is_undefined_not_an_error() {
    let result = evaluate("package p\nr := 1 < \"a\"", Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn equality_with_an_undefined_operand_is_undefined() {
    let result = evaluate("package p\nr := input.missing == 1", Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn deny_does_not_fire_on_an_undefined_comparison() {
    let source = "package p\nr if { input.user != \"admin\" }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn comparison_operators() {
    assert_eq!(ok("package p\nr := 1 < 2"), Value::Bool(true));
    assert_eq!(ok("package p\nr := 2 <= 2"), Value::Bool(true));
    assert_eq!(ok("package p\nr := 3 > 2"), Value::Bool(true));
    assert_eq!(ok("package p\nr := 3 >= 4"), Value::Bool(false));
    assert_eq!(ok("package p\nr := 1 == 1.0"), Value::Bool(true));
    assert_eq!(ok("package p\nr := \"a\" != \"b\""), Value::Bool(true));
}

#[test]
fn equality_is_type_strict_across_kinds() {
    assert_eq!(ok("package p\nr := \"1\" == 1"), Value::Bool(false));
}

#[test]
fn and_or_short_circuit_on_truthiness() {
    assert_eq!(ok("package p\nr := false | true"), Value::Bool(true));
    assert_eq!(ok("package p\nr := true & false"), Value::Bool(false));
}

#[test]
fn unary_negation() {
    assert_eq!(ok("package p\nr := -(3 + 2)"), Value::int(-5));
}

#[test]
fn array_and_object_literal_construction() {
    assert_eq!(ok("package p\nr := [1, 2, 3]"), Value::array([Value::int(1), Value::int(2), Value::int(3)]));
    assert_eq!(
        ok(r#"package p
r := {"a": 1, "b": 2}"#),
        obj(&[("a", Value::int(1)), ("b", Value::int(2))])
    );
}

#[test]
fn reference_walks_nested_documents() {
    let source = "package p\nr := input.user.roles[0]";
    let input = obj(&[("user", obj(&[("roles", Value::array([Value::string("admin"), Value::string("viewer")]))]))]);
    let result = evaluate(source, input, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::string("admin"));
}

#[test]
fn reference_through_another_rule_in_the_same_package() {
    let source = "package p\nbase := {\"x\": 1}\nr := base.x";
    assert_eq!(ok(source), Value::int(1));
}

#[test]
fn undefined_index_is_undefined_not_an_error() {
    let source = "package p\nr := input.missing.deeper";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
    assert!(!result.success);
}

#[test]
fn default_rule_provides_a_fallback_value() {
    let source = "package p\ndefault r := \"fallback\"\nr := \"set\" if { false }";
    assert_eq!(ok(source), Value::string("fallback"));
}

#[test]
fn complete_rule_conflict_raises_an_error() {
    let source = "package p\nr := 1 if { true }\nr := 2 if { true }";
    let err = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Evaluation);
}

#[test]
fn else_clause_is_used_when_the_primary_body_fails() {
    let source = "package p\nr := \"a\" if { false } else := \"b\" if { true }";
    assert_eq!(ok(source), Value::string("b"));
}

#[test]
fn function_rule_dispatches_by_argument_pattern() {
    let source = "package p\ngreet(\"admin\") := \"hi boss\"\ngreet(name) := name\nr := greet(\"admin\")";
    assert_eq!(ok(source), Value::string("hi boss"));
    let source = "package p\ngreet(\"admin\") := \"hi boss\"\ngreet(name) := name\nr := greet(\"bob\")";
    assert_eq!(ok(source), Value::string("bob"));
}

#[test]
fn mutual_recursion_through_memoized_rules_resolves() {
    let source = "package p\nis_even(n) := true if { n == 0 }\nis_even(n) := is_odd(n - 1) if { n != 0 }\nis_odd(n) := false if { n == 0 }\nis_odd(n) := is_even(n - 1) if { n != 0 }\nr := is_even(6)";
    assert_eq!(ok(source), Value::Bool(true));
}

#[test]
fn negation_succeeds_when_inner_body_has_no_solutions() {
    let source = "package p\nr := true if { not input.blocked }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn negation_fails_when_inner_body_has_a_solution() {
    let source = "package p\nr := true if { not input.blocked }";
    let input = obj(&[("blocked", Value::Bool(true))]);
    let result = evaluate(source, input, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn partial_set_rule_accumulates_across_iterations() {
    let source = "package p\nadmins contains u if { u := data.users[_]; u != \"guest\" }\nr := admins";
    let data = obj(&[("users", Value::array([Value::string("root"), Value::string("guest"), Value::string("alice")]))]);
    let result = evaluate(source, Value::Null, data, Some("data.p.r".into())).unwrap();
    let Value::Set(set) = result.value else { panic!("expected a set") };
    assert_eq!(set.len(), 2);
    assert!(set.contains(&Value::string("root")));
    assert!(set.contains(&Value::string("alice")));
}

#[test]
fn builtin_call_dispatches_to_the_stdlib_registry() {
    assert_eq!(ok("package p\nr := count([1, 2, 3])"), Value::int(3));
    assert_eq!(ok(r#"package p
r := upper("abc")"#), Value::string("ABC"));
}

#[test]
fn unknown_call_target_raises_an_error() {
    let err = evaluate("package p\nr := not_a_real_builtin(1)", Value::Null, Value::Null, Some("data.p.r".into())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Evaluation);
}
