//! `with` modifier scoping (spec.md §4.10): mocking `input`, `data`, and
//! builtins/function rules, all torn down once the literal finishes. A
//! `with` clause attaches to a single body literal, so every case here runs
//! the mocked expression inside an explicit rule body.

use policy_engine::{evaluate, Value};

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
fn with_input_overrides_the_whole_document() {
    let source = "package p\nr := v if { v := input.user with input as {\"user\": \"mocked\"} }";
    assert_eq!(run(source, obj(&[("user", Value::string("real"))]), Value::Null), Value::string("mocked"));
}

#[test]
fn with_input_path_overrides_only_that_subtree() {
    let source = "package p\nr := v if { v := input.user with input.user as \"mocked\" }";
    let input = obj(&[("user", Value::string("real")), ("other", Value::string("untouched"))]);
    assert_eq!(run(source, input, Value::Null), Value::string("mocked"));
}

#[test]
fn with_input_path_leaves_sibling_keys_intact() {
    let source = "package p\nr := v if { v := input.other with input.user as \"mocked\" }";
    let input = obj(&[("user", Value::string("real")), ("other", Value::string("untouched"))]);
    assert_eq!(run(source, input, Value::Null), Value::string("untouched"));
}

#[test]
fn with_data_overrides_a_subtree() {
    let source = "package p\nr := v if { v := data.flags.enabled with data.flags.enabled as true }";
    let data = obj(&[("flags", obj(&[("enabled", Value::Bool(false))]))]);
    assert_eq!(run(source, Value::Null, data), Value::Bool(true));
}

#[test]
fn with_builtin_redirect_replaces_one_builtin_with_another() {
    let source = "package p\nr { count([1, 2, 3]) == 6 with count as sum }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::Bool(true));
}

#[test]
fn with_builtin_value_replaces_the_result_outright() {
    let source = "package p\nr := v if { v := count([1, 2, 3]) with count as 99 }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::int(99));
}

#[test]
fn with_function_rule_redirect() {
    let source = "package p\ndouble(x) := x * 2\ntriple(x) := x * 3\nr := v if { v := double(5) with double as triple }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::int(15));
}

#[test]
fn override_does_not_leak_outside_the_literal() {
    let source = "package p\nmocked { count([1]) == 9 with count as 9 }\nreal := count([1])\nr := [mocked, real]";
    assert_eq!(run(source, Value::Null, Value::Null), Value::array([Value::Bool(true), Value::int(1)]));
}

#[test]
fn chained_with_modifiers_apply_left_to_right() {
    let source = "package p\nr := v if { v := [input.a, input.b] with input.a as 1 with input.b as 2 }";
    assert_eq!(run(source, Value::Null, Value::Null), Value::array([Value::int(1), Value::int(2)]));
}

#[test]
fn dynamic_with_path_undefined_key_fails_the_literal() {
    let source = "package p\nr { true with input[input.missing] as 1 }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.r".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}
