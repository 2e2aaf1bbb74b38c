//! Rule-group evaluation and function call dispatch (spec.md §4.8-4.9):
//! complete/partial-set/partial-object accumulation with `else`-chaining and
//! recursion-fixpoint memoization, plus call-site dispatch to either a
//! user-defined function rule or the builtin registry.

use indexmap::{IndexMap, IndexSet};

use super::{cartesian_extend, merge_bindings, reference, shadow, Evaluator};
use crate::{
    ast::{BodyLiteral, CallName, Expr, RuleHead},
    compiler::{RuleGroup, RuleKind},
    environment::{BindingMap, Environment, NameOverride},
    error::Error,
    location::Location,
    memo::RuleKey,
    unifier,
    value::Value,
};

/// Evaluates a rule group referenced as a value (bare variable or the tail
/// of a reference) — complete, partial-set, or partial-object. A function
/// group reached this way (no call arguments given) is an error.
pub fn eval_rule_group(evaluator: &Evaluator, name: &str, env: &mut Environment) -> Result<Value, Error> {
    let key = RuleKey::complete_or_partial(name);
    if let Some(value) = env.memo.get(&key) {
        return Ok(value.clone());
    }
    if env.memo.is_in_progress(&key) {
        return Ok(Value::Undefined);
    }
    env.memo.enter(key.clone());
    let result = eval_rule_group_uncached(evaluator, name, env);
    env.memo.leave(&key);
    let value = result?;
    env.memo.insert(key, value.clone());
    Ok(value)
}

fn eval_rule_group_uncached(evaluator: &Evaluator, name: &str, env: &mut Environment) -> Result<Value, Error> {
    let group = evaluator.module.rules.get(name).expect("caller already checked the rule exists");
    match group.kind {
        RuleKind::Complete => eval_complete(evaluator, name, group, env),
        RuleKind::PartialSet => eval_partial_set(evaluator, group, env),
        RuleKind::PartialObject => eval_partial_object(evaluator, name, group, env),
        RuleKind::Function(_) => Err(Error::evaluation(format!("function rule `{name}` must be called with arguments")).with_rule(name.to_string())),
    }
}

/// A rule's own body, with the pushed-scope-and-shadowed treatment spec.md
/// §4.8 requires. A body-less rule (a plain fact, e.g. `x := 1`) has exactly
/// one trivial solution and needs no scope of its own.
fn solve_rule_body(evaluator: &Evaluator, body: Option<&[BodyLiteral]>, env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    match body {
        Some(body) => shadow::solve_body(evaluator, body, env),
        None => Ok(vec![BindingMap::new()]),
    }
}

fn eval_head_value(evaluator: &Evaluator, value: Option<&Expr>, bindings: &BindingMap, env: &mut Environment) -> Result<Value, Error> {
    match value {
        Some(expr) => env.with_bindings(bindings, |env| evaluator.evaluate(expr, env)),
        None => Ok(Value::Bool(true)),
    }
}

fn push_unique(results: &mut Vec<Value>, value: Value) {
    if !value.is_undefined() && !results.contains(&value) {
        results.push(value);
    }
}

fn eval_complete(evaluator: &Evaluator, name: &str, group: &RuleGroup, env: &mut Environment) -> Result<Value, Error> {
    let mut results = Vec::new();
    let mut default_value = None;

    for rule in &group.rules {
        let RuleHead::Complete { value } = &rule.head else { continue };
        if rule.is_default {
            default_value = Some(eval_head_value(evaluator, value.as_ref(), &BindingMap::new(), env)?);
            continue;
        }

        let mut solutions = solve_rule_body(evaluator, rule.body.as_deref(), env)?;
        let mut head = value.as_ref();
        let mut satisfied = !solutions.is_empty();
        if !satisfied {
            for clause in &rule.else_clauses {
                let else_solutions = solve_rule_body(evaluator, clause.body.as_deref(), env)?;
                if !else_solutions.is_empty() {
                    solutions = else_solutions;
                    head = clause.value.as_ref().or(value.as_ref());
                    satisfied = true;
                    break;
                }
            }
        }
        if !satisfied {
            continue;
        }
        for bindings in &solutions {
            let v = eval_head_value(evaluator, head, bindings, env)?;
            push_unique(&mut results, v);
        }
    }

    match results.len() {
        0 => Ok(default_value.unwrap_or(Value::Undefined)),
        1 => Ok(results.into_iter().next().expect("length checked")),
        _ => Err(Error::evaluation(format!("conflicting values for `{name}`")).with_rule(name.to_string())),
    }
}

fn eval_partial_set(evaluator: &Evaluator, group: &RuleGroup, env: &mut Environment) -> Result<Value, Error> {
    let mut set = IndexSet::new();
    for rule in &group.rules {
        if rule.is_default {
            continue;
        }
        let RuleHead::PartialSet { term } = &rule.head else { continue };
        let solutions = solve_rule_body(evaluator, rule.body.as_deref(), env)?;
        for bindings in &solutions {
            let v = env.with_bindings(bindings, |env| evaluator.evaluate(term, env))?;
            if !v.is_undefined() {
                set.insert(v);
            }
        }
    }
    if set.is_empty() { Ok(Value::Undefined) } else { Ok(Value::Set(set)) }
}

fn eval_partial_object(evaluator: &Evaluator, name: &str, group: &RuleGroup, env: &mut Environment) -> Result<Value, Error> {
    let mut map: IndexMap<Box<str>, Value> = IndexMap::new();
    let mut nested_flags: std::collections::HashMap<Box<str>, bool> = std::collections::HashMap::new();

    for rule in &group.rules {
        if rule.is_default {
            continue;
        }
        let RuleHead::PartialObject { key, value, nested } = &rule.head else { continue };
        let solutions = solve_rule_body(evaluator, rule.body.as_deref(), env)?;
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
                return Err(Error::evaluation("partial object rule key must be an atomic value").with_location(rule.location).with_rule(name.to_string()));
            }
            let normalized = k.normalize_key();
            match map.get(&normalized) {
                None => {
                    map.insert(normalized.clone(), v);
                    nested_flags.insert(normalized, *nested);
                }
                Some(existing) if existing == &v => {}
                Some(existing) => {
                    let both_nested = *nested && nested_flags.get(&normalized).copied().unwrap_or(false);
                    if both_nested {
                        if let (Value::Object(_), Value::Object(_)) = (existing, &v) {
                            let merged = deep_merge(existing, &v, name)?;
                            map.insert(normalized, merged);
                            continue;
                        }
                    }
                    return Err(Error::object_key_conflict(format!("key `{normalized}` maps to conflicting values"))
                        .with_location(rule.location)
                        .with_rule(name.to_string()));
                }
            }
        }
    }
    if map.is_empty() { Ok(Value::Undefined) } else { Ok(Value::Object(map)) }
}

fn deep_merge(a: &Value, b: &Value, name: &str) -> Result<Value, Error> {
    let (Value::Object(ma), Value::Object(mb)) = (a, b) else { unreachable!("caller already checked both are objects") };
    let mut merged = ma.clone();
    for (k, v) in mb {
        match merged.get(k) {
            None => {
                merged.insert(k.clone(), v.clone());
            }
            Some(existing) if existing == v => {}
            Some(existing) if matches!((existing, v), (Value::Object(_), Value::Object(_))) => {
                let combined = deep_merge(existing, v, name)?;
                merged.insert(k.clone(), combined);
            }
            _ => return Err(Error::object_key_conflict(format!("key `{k}` maps to conflicting values")).with_rule(name.to_string())),
        }
    }
    Ok(Value::Object(merged))
}

/// `Expr::Call` dispatch: resolves the callee name, evaluates arguments
/// nondeterministically (cartesian over each argument's own candidates, as
/// any other n-ary construct does), then dispatches each argument tuple.
pub fn eval_call(evaluator: &Evaluator, name: &CallName, args: &[Expr], location: Location, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
    let call_name = resolve_call_name(evaluator, name, location)?;

    let mut arg_candidates: Vec<(BindingMap, Vec<Value>)> = vec![(BindingMap::new(), Vec::new())];
    for arg in args {
        let candidates = evaluator.eval_multi(arg, env)?;
        arg_candidates = cartesian_extend(arg_candidates, candidates, |mut acc, v| {
            acc.push(v);
            acc
        })?;
    }

    let mut out = Vec::new();
    for (bindings, arg_values) in arg_candidates {
        let value = env.with_bindings(&bindings, |env| dispatch_call(evaluator, &call_name, &arg_values, location, env))?;
        out.push((bindings, value));
    }
    Ok(out)
}

/// Turns a `CallName` into the flat name the registry/rule table key on:
/// a bare identifier as written, a dotted builtin name (`object.union`), or
/// — for `data.<this module's package>.<rule>` — the bare rule name.
fn resolve_call_name(evaluator: &Evaluator, name: &CallName, location: Location) -> Result<String, Error> {
    match name {
        CallName::Bare(s) => Ok(s.clone()),
        CallName::Ref(expr) => {
            let Expr::Reference { base, path, .. } = expr.as_ref() else {
                return Err(Error::evaluation("unsupported call target").with_location(location));
            };
            let Expr::Variable(root, _) = base.as_ref() else {
                return Err(Error::evaluation("unsupported call target").with_location(location));
            };
            if root == "data" {
                if let Some((rule_name, rest)) = reference::match_own_package(evaluator.module, path) {
                    if rest.is_empty() {
                        return Ok(rule_name);
                    }
                }
            }
            let mut parts = vec![root.clone()];
            for seg in path {
                match seg {
                    crate::ast::RefArg::Dot(n) => parts.push(n.clone()),
                    crate::ast::RefArg::Bracket(_) => return Err(Error::evaluation("dynamic call targets are not supported").with_location(location)),
                }
            }
            Ok(parts.join("."))
        }
    }
}

fn dispatch_call(evaluator: &Evaluator, call_name: &str, args: &[Value], location: Location, env: &mut Environment) -> Result<Value, Error> {
    if let Some(over) = env.name_override(call_name).cloned() {
        return match over {
            NameOverride::Value(v) => Ok(v),
            NameOverride::Redirect(target) => dispatch_call(evaluator, &target, args, location, env),
        };
    }
    if let Some(group) = evaluator.module.rules.get(call_name) {
        return call_function_rule(evaluator, call_name, group, args, location, env);
    }
    if let Some(entry) = env.registry().entry_for(call_name) {
        if args.len() != entry.arity {
            return Err(Error::evaluation(format!("{call_name}: expected {} argument(s), got {}", entry.arity, args.len())).with_location(location));
        }
        return (entry.handler)(args).map_err(|e| e.with_location(location));
    }
    Err(Error::evaluation(format!("unknown call target `{call_name}`")).with_location(location))
}

fn call_function_rule(evaluator: &Evaluator, name: &str, group: &RuleGroup, args: &[Value], location: Location, env: &mut Environment) -> Result<Value, Error> {
    let RuleKind::Function(arity) = group.kind else {
        return Err(Error::evaluation(format!("`{name}` is not a function")).with_location(location).with_rule(name.to_string()));
    };
    if args.len() != arity {
        return Err(Error::evaluation(format!("function `{name}` expects {arity} argument(s), got {}", args.len()))
            .with_location(location)
            .with_rule(name.to_string()));
    }

    let key = RuleKey::function_call(name, args);
    if let Some(value) = env.memo.get(&key) {
        return Ok(value.clone());
    }
    if env.memo.is_in_progress(&key) {
        return Ok(Value::Undefined);
    }
    env.memo.enter(key.clone());
    let result = call_function_rule_uncached(evaluator, name, group, args, location, env);
    env.memo.leave(&key);
    let value = result?;
    env.memo.insert(key, value.clone());
    Ok(value)
}

fn call_function_rule_uncached(evaluator: &Evaluator, name: &str, group: &RuleGroup, args: &[Value], location: Location, env: &mut Environment) -> Result<Value, Error> {
    let mut results = Vec::new();
    let mut default_value = None;

    for rule in &group.rules {
        let RuleHead::Function { args: params, value } = &rule.head else { continue };
        if rule.is_default {
            default_value = Some(eval_head_value(evaluator, value.as_ref(), &BindingMap::new(), env)?);
            continue;
        }

        let mut binding_sets = vec![BindingMap::new()];
        for (param, arg_value) in params.iter().zip(args) {
            let mut next = Vec::new();
            for bindings in &binding_sets {
                let sols = env.with_bindings(bindings, |env| unifier::unify(evaluator, param, arg_value, env))?;
                for sol in sols {
                    if let Some(merged) = merge_bindings(bindings, &sol) {
                        next.push(merged);
                    }
                }
            }
            binding_sets = next;
            if binding_sets.is_empty() {
                break;
            }
        }
        if binding_sets.is_empty() {
            continue;
        }

        for param_bindings in &binding_sets {
            let body_solutions = env.with_bindings(param_bindings, |env| solve_rule_body(evaluator, rule.body.as_deref(), env))?;
            for body_bindings in &body_solutions {
                let Some(combined) = merge_bindings(param_bindings, body_bindings) else { continue };
                let v = eval_head_value(evaluator, value.as_ref(), &combined, env)?;
                push_unique(&mut results, v);
            }
        }
    }

    match results.len() {
        0 => Ok(default_value.unwrap_or(Value::Undefined)),
        1 => Ok(results.into_iter().next().expect("length checked")),
        _ => Err(Error::evaluation(format!("conflicting values for `{name}`")).with_location(location).with_rule(name.to_string())),
    }
}
