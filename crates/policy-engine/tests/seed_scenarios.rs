//! The concrete seed scenarios and universal properties (spec.md §8),
//! exercised through the `Policy` handle rather than the one-shot
//! `evaluate` free function for variety (`lib.rs`'s own inline tests already
//! cover the free-function path).

use policy_engine::{ErrorKind, Policy, Value};

fn obj(pairs: &[(&str, Value)]) -> Value {
    let mut map = indexmap::IndexMap::new();
    for (k, v) in pairs {
        map.insert((*k).into(), v.clone());
    }
    Value::Object(map)
}

#[test]
fn scenario_1_basic_allow() {
    let policy = Policy::compile("package example\ndefault allow := false\nallow if { input.user == \"admin\" }").unwrap();

    let result = policy.evaluate(obj(&[("user", Value::string("admin"))]), Value::Null, Some("data.example.allow".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
    assert!(result.success);

    let result = policy.evaluate(obj(&[("user", Value::string("bob"))]), Value::Null, Some("data.example.allow".into())).unwrap();
    assert_eq!(result.value, Value::Bool(false));
    assert!(result.success);
}

#[test]
fn scenario_2_comprehension() {
    let policy = Policy::compile("package p\nxs := [x | x := data.items[_]; x > 1]").unwrap();
    let data = obj(&[("items", Value::array([Value::int(1), Value::int(2), Value::int(3)]))]);
    let result = policy.evaluate(Value::Null, data, Some("data.p.xs".into())).unwrap();
    assert_eq!(result.value, Value::array([Value::int(2), Value::int(3)]));
}

#[test]
fn scenario_3_partial_object_with_conflict() {
    let policy = Policy::compile("package p\nusers[\"a\"] := 1\nusers[\"a\"] := 2").unwrap();
    let err = policy.evaluate(Value::Null, Value::Null, Some("data.p.users".into())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ObjectKeyConflict);
}

#[test]
fn scenario_4_with_mock_of_builtin() {
    let policy = Policy::compile("package p\nok { count([1, 2, 3]) == 6 with count as sum }").unwrap();
    let result = policy.evaluate(Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn scenario_5_every_quantification() {
    let policy = Policy::compile("package p\nok { every x in [1, 2, 3] { x > 0 } }").unwrap();
    let result = policy.evaluate(Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));

    let policy = Policy::compile("package p\nxs := input.xs\nok { every x in xs { x > 0 } }").unwrap();
    let input = obj(&[("xs", Value::array([Value::int(1), Value::int(2), Value::int(0)]))]);
    let result = policy.evaluate(input, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
    assert!(!result.success);
}

#[test]
fn scenario_6_unification_backtracking() {
    let policy = Policy::compile("package p\nfound { some k; input[k] == \"target\" }").unwrap();
    let input = obj(&[("a", Value::string("x")), ("b", Value::string("target"))]);
    let result = policy.evaluate(input, Value::Null, Some("data.p.found".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn property_truthiness_is_exactly_false_null_undefined() {
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Undefined.is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(Value::int(0).is_truthy());
    assert!(Value::string("").is_truthy());
}

#[test]
fn property_equality_is_type_strict() {
    assert_ne!(Value::string("1"), Value::int(1));
}

#[test]
fn property_evaluate_is_referentially_transparent_without_side_effecting_builtins() {
    let policy = Policy::compile("package p\nr := count([1, 2, 3])").unwrap();
    let first = policy.evaluate(Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    let second = policy.evaluate(Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(first.value, second.value);
}

#[test]
fn property_with_modified_scope_does_not_leak() {
    let policy = Policy::compile("package p\nmocked { count([1]) == 9 with count as 9 }\nreal := count([1])").unwrap();
    let mocked = policy.evaluate(Value::Null, Value::Null, Some("data.p.mocked".into())).unwrap();
    let real = policy.evaluate(Value::Null, Value::Null, Some("data.p.real".into())).unwrap();
    assert_eq!(mocked.value, Value::Bool(true));
    assert_eq!(real.value, Value::int(1));
}

#[test]
fn property_negation_safety_is_a_compile_time_error() {
    let err = Policy::compile("package p\nok { not missing == 1 }").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Compilation);
}

#[test]
fn property_negation_bound_by_earlier_literal_compiles_and_runs() {
    let policy = Policy::compile("package p\nok { x := 1; not x == 2 }").unwrap();
    let result = policy.evaluate(Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn default_query_evaluates_the_whole_package_as_a_document() {
    let policy = Policy::compile("package p\na := 1\nb := 2").unwrap();
    let result = policy.evaluate(Value::Null, Value::Null, None).unwrap();
    assert_eq!(result.value, obj(&[("a", Value::int(1)), ("b", Value::int(2))]));
}
