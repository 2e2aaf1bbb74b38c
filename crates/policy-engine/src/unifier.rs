//! Structural unification of a pattern expression against a concrete value
//! (spec.md §4.5). Produces every binding set consistent with the match —
//! zero for a failed match, one for a fully-determined pattern, or more than
//! one when a sub-pattern itself enumerates (handled by the evaluator before
//! calling in here; the unifier itself never enumerates a *value*, only a
//! *pattern*'s internal variable bindings).

use std::collections::{HashMap, HashSet};

use crate::{ast::*, environment::Environment, error::Error, evaluator::Evaluator, value::Value};

pub type BindingMap = HashMap<String, Value>;

/// Attempts to match `pattern` against `value`, returning every consistent
/// binding set. An already-bound variable in `pattern` must equal `value`
/// rather than rebind (unification, not assignment). `evaluator` is only
/// consulted for the fallback branch — a pattern shape other than a
/// variable/const/array/object literal is evaluated as an expression (so a
/// reference, call, or arithmetic sub-pattern still works).
pub fn unify(evaluator: &Evaluator, pattern: &Expr, value: &Value, env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    unify_into(evaluator, pattern, value, env, &BindingMap::new())
}

/// Extends `bindings` with every consistent match of `pattern` against
/// `value`, returning one extended copy per solution (empty on failure).
/// Array elements and object key choices that themselves admit more than one
/// solution fan out into independent candidates (spec.md §4.5's
/// Cartesian-product / key-enumeration rule), so the only caller that needs
/// to thread more than one candidate through is this function itself.
fn unify_into(evaluator: &Evaluator, pattern: &Expr, value: &Value, env: &mut Environment, bindings: &BindingMap) -> Result<Vec<BindingMap>, Error> {
    match pattern {
        Expr::Variable(name, _) if name == "_" => Ok(vec![bindings.clone()]),
        Expr::Variable(name, _) => {
            if let Some(existing) = bindings.get(name) {
                return Ok(if existing == value { vec![bindings.clone()] } else { Vec::new() });
            }
            if env.is_locally_bound(name) {
                let existing = env.lookup(name);
                if !existing.is_undefined() {
                    return Ok(if &existing == value { vec![bindings.clone()] } else { Vec::new() });
                }
            }
            let mut extended = bindings.clone();
            extended.insert(name.clone(), value.clone());
            Ok(vec![extended])
        }
        Expr::Const(c, _) => Ok(if const_matches(c, value) { vec![bindings.clone()] } else { Vec::new() }),
        Expr::ArrayLiteral(items, _) => {
            let Value::Array(values) = value else { return Ok(Vec::new()) };
            if items.len() != values.len() {
                return Ok(Vec::new());
            }
            let mut candidates = vec![bindings.clone()];
            for (item_pattern, item_value) in items.iter().zip(values) {
                let mut next = Vec::new();
                for candidate in &candidates {
                    next.extend(unify_into(evaluator, item_pattern, item_value, env, candidate)?);
                }
                candidates = next;
                if candidates.is_empty() {
                    break;
                }
            }
            Ok(candidates)
        }
        Expr::ObjectLiteral(pairs, _) => {
            let Value::Object(map) = value else { return Ok(Vec::new()) };
            if pairs.len() != map.len() {
                return Ok(Vec::new());
            }
            // (bindings, keys already consumed by an earlier pair) — a key
            // claimed by one pair cannot be reused by another.
            let mut candidates: Vec<(BindingMap, HashSet<Box<str>>)> = vec![(bindings.clone(), HashSet::new())];
            for (key_pattern, value_pattern) in pairs {
                let mut next = Vec::new();
                for (candidate_bindings, consumed) in &candidates {
                    for (key, found) in map {
                        if consumed.contains(key) {
                            continue;
                        }
                        let key_value = Value::string(key.as_ref());
                        for key_bound in unify_into(evaluator, key_pattern, &key_value, env, candidate_bindings)? {
                            for value_bound in unify_into(evaluator, value_pattern, found, env, &key_bound)? {
                                let mut consumed = consumed.clone();
                                consumed.insert(key.clone());
                                next.push((value_bound, consumed));
                            }
                        }
                    }
                }
                candidates = next;
                if candidates.is_empty() {
                    break;
                }
            }
            Ok(candidates.into_iter().map(|(b, _)| b).collect())
        }
        // Any other pattern shape (reference, call, arithmetic) is treated
        // as an already-ground expression: evaluate it in the ambient
        // environment plus bindings collected so far and compare for
        // equality, matching spec.md §4.5's "value vs value" fallback.
        other => {
            let evaluated = evaluator.evaluate_with_overlay(other, env, bindings)?;
            Ok(if evaluated == *value { vec![bindings.clone()] } else { Vec::new() })
        }
    }
}

fn const_matches(c: &Const, value: &Value) -> bool {
    match c {
        Const::Null => matches!(value, Value::Null),
        Const::Bool(b) => matches!(value, Value::Bool(v) if v == b),
        Const::Number(n) => matches!(value, Value::Number(v) if v == n),
        Const::String(s) => matches!(value, Value::String(v) if v.as_ref() == s.as_str()),
    }
}
