//! Structural unification (spec.md §4.5), exercised indirectly through
//! `evaluate` — the unifier itself has no public surface, only the
//! `:=`/`=` body literals and function-call argument binding that use it.

use policy_engine::{evaluate, Value};

#[test]
fn wildcard_matches_anything() {
    let source = "package p\nok { [_, b] := [1, 2]; b == 2 }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn array_pattern_destructures_elementwise() {
    let source = "package p\nfirst := x { [x, _, _] := [10, 20, 30] }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.first".into())).unwrap();
    assert_eq!(result.value, Value::int(10));
}

#[test]
fn array_pattern_rejects_length_mismatch() {
    let source = "package p\nok { [a, b] := [1, 2, 3] }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn nested_array_pattern_unifies_recursively() {
    let source = "package p\nok { [a, [b, c]] := [1, [2, 3]]; a == 1; b == 2; c == 3 }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn repeated_variable_requires_consistent_binding() {
    let source = "package p\nok { [a, a] := [1, 1] }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));

    let source = "package p\nok { [a, a] := [1, 2] }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn function_call_argument_is_a_unification_pattern() {
    let source = "package p\nhead([x, _]) := x\nresult := head([\"first\", \"second\"])";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.result".into())).unwrap();
    assert_eq!(result.value, Value::string("first"));
}

#[test]
fn object_pattern_with_a_variable_key_finds_the_matching_entry() {
    // Cardinality must match exactly (spec.md §4.5), so the pattern pairs
    // `input`'s two entries one-for-one; `k` is free to bind to whichever
    // key lines up with the `2` it's paired against.
    let source = "package p\nok { some k; {k: 2, \"a\": 1} := input; k == \"b\" }";
    let input = obj(&[("a", Value::int(1)), ("b", Value::int(2))]);
    let result = evaluate(source, input, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn object_pattern_cardinality_must_match() {
    let source = "package p\nok { {\"a\": 1} := input }";
    let input = obj(&[("a", Value::int(1)), ("b", Value::int(2))]);
    let result = evaluate(source, input, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Undefined);
}

#[test]
fn ground_expression_equality_goes_through_the_unifier_fallback() {
    // Neither side is a bare pattern variable/array literal, so unification
    // falls back to evaluating both sides and comparing.
    let source = "package p\nok { 1 + 1 := 2 }";
    let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
    assert_eq!(result.value, Value::Bool(true));
}
