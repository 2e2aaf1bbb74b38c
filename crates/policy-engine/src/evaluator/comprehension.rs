//! Array/set/object comprehensions and the `every` quantifier (spec.md
//! §4.11): each pushes a scope, shadows its body-local variables the same
//! way a rule body does, enumerates solutions, and collects (or checks)
//! per-solution term values.

use indexmap::{IndexMap, IndexSet};

use super::{shadow, Evaluator};
use crate::{ast::BodyLiteral, ast::Expr, environment::BindingMap, environment::Environment, error::Error, value::Value};

pub fn eval_array_comprehension(evaluator: &Evaluator, term: &Expr, body: &[BodyLiteral], env: &mut Environment) -> Result<Value, Error> {
    let solutions = shadow::solve_body(evaluator, body, env)?;
    let mut out = Vec::new();
    for bindings in &solutions {
        let v = env.with_bindings(bindings, |env| evaluator.evaluate(term, env))?;
        if !v.is_undefined() {
            out.push(v);
        }
    }
    Ok(Value::Array(out))
}

pub fn eval_set_comprehension(evaluator: &Evaluator, term: &Expr, body: &[BodyLiteral], env: &mut Environment) -> Result<Value, Error> {
    let solutions = shadow::solve_body(evaluator, body, env)?;
    let mut set = IndexSet::new();
    for bindings in &solutions {
        let v = env.with_bindings(bindings, |env| evaluator.evaluate(term, env))?;
        if !v.is_undefined() {
            set.insert(v);
        }
    }
    Ok(Value::Set(set))
}

pub fn eval_object_comprehension(evaluator: &Evaluator, key: &Expr, value: &Expr, body: &[BodyLiteral], env: &mut Environment) -> Result<Value, Error> {
    let solutions = shadow::solve_body(evaluator, body, env)?;
    let mut map: IndexMap<Box<str>, Value> = IndexMap::new();
    for bindings in &solutions {
        let (k, v) = env.with_bindings(bindings, |env| -> Result<(Value, Value), Error> {
            let k = evaluator.evaluate(key, env)?;
            let v = evaluator.evaluate(value, env)?;
            Ok((k, v))
        })?;
        if k.is_undefined() || v.is_undefined() {
            continue;
        }
        if !k.is_atomic() {
            return Err(Error::evaluation("object comprehension keys must be atomic values").with_location(key.location()));
        }
        let normalized = k.normalize_key();
        match map.get(&normalized) {
            None => {
                map.insert(normalized, v);
            }
            Some(existing) if existing == &v => {}
            Some(_) => {
                return Err(Error::object_key_conflict(format!("key `{normalized}` maps to conflicting values")).with_location(key.location()));
            }
        }
    }
    Ok(Value::Object(map))
}

/// `every k?, v in domain { body }`: undefined/wrong-kind domain fails
/// outright; otherwise every key/value pair of the domain must yield at
/// least one solution for `body`, else the whole expression is undefined
/// (not `false` — spec.md §4.11).
pub fn eval_every(
    evaluator: &Evaluator,
    key_var: Option<&str>,
    value_var: &str,
    domain: &Expr,
    body: &[BodyLiteral],
    env: &mut Environment,
) -> Result<Value, Error> {
    let domain_value = evaluator.evaluate(domain, env)?;
    if key_var.is_some() && matches!(domain_value, Value::Set(_)) {
        return Ok(Value::Undefined);
    }
    let items: Vec<(Option<Value>, Value)> = match &domain_value {
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (Some(Value::int(i as i64)), v.clone())).collect(),
        Value::Set(items) => items.iter().map(|v| (None, v.clone())).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (Some(Value::string(k.clone())), v.clone())).collect(),
        _ => return Ok(Value::Undefined),
    };

    for (key_value, value_value) in items {
        let mut bindings = BindingMap::new();
        if let Some(kv) = key_var {
            if kv != "_" {
                bindings.insert(kv.to_string(), key_value.unwrap_or(Value::Undefined));
            }
        }
        if value_var != "_" {
            bindings.insert(value_var.to_string(), value_value);
        }
        let solutions = env.with_bindings(&bindings, |env| shadow::solve_body(evaluator, body, env))?;
        if solutions.is_empty() {
            return Ok(Value::Undefined);
        }
    }
    Ok(Value::Bool(true))
}
