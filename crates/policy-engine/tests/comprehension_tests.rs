//! Array/set/object comprehensions and `every` quantification (spec.md §4.11).

use policy_engine::{evaluate, ErrorKind, Value};

fn obj(pairs: &[(&str, Value)]) -> Value {
    let mut map = indexmap::IndexMap::new();
    for (k, v) in pairs {
        map.insert((*k).into(), v.clone());
    }
    Value::Object(map)
}

fn run(source: &str, input: Value, data: Value) -> Value {
    evaluate(source, input, data, Some("data.p.r".into())).unwrap().value
}

#[test]
fn array_comprehension_preserves_source_order() {
    let source = "package p\nr := [x | x := data.xs[_]; x > 1]";
    let data = obj(&[("xs", Value::array([Value::int(3), Value::int(1), Value::int(2)]))]);
    assert_eq!(run(source, Value::Null, data), Value::array([Value::int(3), Value::int(2)]));
}

#[test]
fn set_comprehension_deduplicates() {
    let source = "package p\nr := {x % 2 | x := data.xs[_]}";
    let data = obj(&[("xs", Value::array([Value::int(1), Value::int(3), Value::int(4)]))]);
    let Value::Set(set) = run(source, Value::Null, data) else { panic!("expected a set") };
    assert_eq!(set.len(), 2);
    assert!(set.contains(&Value::int(1)));
    assert!(set.contains(&Value::int(0)));
}

#[test]
fn object_comprehension_builds_key_value_pairs() {
    let source = "package p\nr := {k: v | k := data.pairs[_][0]; v := data.pairs[_][1]; k == \"a\"}";
    let data = obj(&[("pairs", Value::array([Value::array([Value::string("a"), Value::int(1)])]))]);
    assert_eq!(run(source, Value::Null, data), obj(&[("a", Value::int(1))]));
}

#[test]
fn object_comprehension_rejects_duplicate_keys_with_different_values() {
    let source = "package p\nr := {k: v | k := \"same\"; v := data.xs[_]}";
    let data = obj(&[("xs", Value::array([Value::int(1), Value::int(2)]))]);
    let err = evaluate(source, Value::Null, data, Some("data.p.r".into())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ObjectKeyConflict);
}

#[test]
fn nested_comprehension_is_a_self_contained_scope() {
    let source = "package p\nr := [[y | y := data.inner[_]] | _ := data.outer[_]]";
    let data = obj(&[("outer", Value::array([Value::int(1)])), ("inner", Value::array([Value::int(9), Value::int(8)]))]);
    assert_eq!(run(source, Value::Null, data), Value::array([Value::array([Value::int(9), Value::int(8)])]));
}

#[test]
fn every_over_array_holds_when_all_elements_satisfy_the_body() {
    let source = "package p\nr := true if { every x in [1, 2, 3] { x > 0 } }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::Bool(true));
}

#[test]
fn every_over_array_is_undefined_when_one_element_fails() {
    let source = "package p\nr := true if { every x in [1, -2, 3] { x > 0 } }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn every_with_key_value_over_an_object() {
    let source = "package p\nr := true if { every k, v in data.scores { v >= 0 } }";
    let data = obj(&[("scores", obj(&[("a", Value::int(1)), ("b", Value::int(2))]))]);
    assert_eq!(run(source, Value::Null, data), Value::Bool(true));
}

#[test]
fn every_over_an_empty_collection_is_vacuously_true() {
    let source = "package p\nr := true if { every x in [] { x > 0 } }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::Bool(true));
}

#[test]
fn every_with_key_variable_over_a_set_is_undefined() {
    // Sets have no addressable key, so the `key_var, v in <set>` form never
    // holds (spec.md §4.11's iteration table).
    let source = "package p\nr := true if { every k, v in {1, 2, 3} { v > 0 } }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}
