//! Body-literal evaluation: `some` declarations, `eval_with_unification` for
//! `:=`/`=`/plain-truthy literals (spec.md §4.6, §4.8), negation, and the
//! `with`-modifier override chain (spec.md §4.10).

use super::{merge_bindings, rule, Evaluator};
use crate::{
    ast::{BinOp, BodyLiteral, Const, Expr, RefArg, SomeDecl, WithModifier},
    compiler::RuleKind,
    environment::{BindingMap, Environment, NameOverride},
    error::Error,
    unifier,
    value::Value,
};

pub(crate) fn eval_literal(evaluator: &Evaluator, literal: &BodyLiteral, env: &mut Environment, cur: &BindingMap) -> Result<Vec<BindingMap>, Error> {
    match literal {
        BodyLiteral::Some(decl) => eval_some(evaluator, decl, env, cur),
        BodyLiteral::Expr { expr, negated, with_mods, .. } => {
            if with_mods.is_empty() {
                eval_expr_literal(evaluator, expr, *negated, env, cur)
            } else {
                apply_with_chain(evaluator, expr, *negated, with_mods, env, cur)
            }
        }
    }
}

fn eval_some(evaluator: &Evaluator, decl: &SomeDecl, env: &mut Environment, cur: &BindingMap) -> Result<Vec<BindingMap>, Error> {
    let Some(collection_expr) = &decl.collection else {
        let mut next = cur.clone();
        for var in &decl.variables {
            if var != "_" {
                next.insert(var.clone(), Value::Undefined);
            }
        }
        return Ok(vec![next]);
    };

    let collection = env.with_bindings(cur, |env| evaluator.evaluate(collection_expr, env))?;
    let mut out = Vec::new();
    let bind = |out: &mut Vec<BindingMap>, pairs: &[(&str, Value)]| {
        let mut next = cur.clone();
        for (name, value) in pairs {
            if *name != "_" {
                next.insert((*name).to_string(), value.clone());
            }
        }
        out.push(next);
    };

    match (decl.variables.as_slice(), &collection) {
        ([v], Value::Array(items)) => {
            for item in items {
                bind(&mut out, &[(v.as_str(), item.clone())]);
            }
        }
        ([v], Value::Set(items)) => {
            for item in items {
                bind(&mut out, &[(v.as_str(), item.clone())]);
            }
        }
        ([v], Value::Object(map)) => {
            for key in map.keys() {
                bind(&mut out, &[(v.as_str(), Value::string(key.clone()))]);
            }
        }
        ([k, v], Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                bind(&mut out, &[(k.as_str(), Value::int(index as i64)), (v.as_str(), item.clone())]);
            }
        }
        ([k, v], Value::Object(map)) => {
            for (key, item) in map {
                bind(&mut out, &[(k.as_str(), Value::string(key.clone())), (v.as_str(), item.clone())]);
            }
        }
        // Two-variable iteration over a set, or a collection of the wrong
        // kind/undefined: no solutions (spec.md §4.11's iteration table has
        // no entry there).
        _ => {}
    }
    Ok(out)
}

fn eval_expr_literal(evaluator: &Evaluator, expr: &Expr, negated: bool, env: &mut Environment, cur: &BindingMap) -> Result<Vec<BindingMap>, Error> {
    if negated {
        if matches!(expr, Expr::Every { .. }) {
            return Err(Error::evaluation("`not every` is not allowed").with_location(expr.location()));
        }
        let solutions = env.with_bindings(cur, |env| eval_with_unification(evaluator, expr, env))?;
        return Ok(if solutions.is_empty() { vec![cur.clone()] } else { Vec::new() });
    }
    let deltas = env.with_bindings(cur, |env| eval_with_unification(evaluator, expr, env))?;
    Ok(deltas
        .into_iter()
        .map(|delta| {
            let mut next = cur.clone();
            next.extend(delta);
            next
        })
        .collect())
}

/// spec.md §4.6: `:=` unifies the evaluated RHS against the LHS pattern and
/// keeps every solution the RHS enumerates (the `x := data.items[_]`
/// comprehension idiom depends on this: each free-variable candidate from
/// the RHS reference gets its own unification attempt); `=` unifies
/// symmetrically; anything else is a plain truthiness test that may still
/// carry free-variable bindings (a bare `data.users[i].active` body literal
/// both tests and binds `i`).
pub(crate) fn eval_with_unification(evaluator: &Evaluator, expr: &Expr, env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    match expr {
        Expr::BinaryOp { op: BinOp::Assign, left, right, .. } => unify_against_candidates(evaluator, left, right, env),
        Expr::BinaryOp { op: BinOp::Unify, left, right, .. } => symmetric_unify(evaluator, left, right, env),
        _ => {
            let candidates = evaluator.eval_multi(expr, env)?;
            Ok(candidates.into_iter().filter(|(_, v)| v.is_truthy()).map(|(b, _)| b).collect())
        }
    }
}

/// Unifies `pattern` against every (bindings, value) candidate `rhs`
/// produces, merging each candidate's own bindings with the unification
/// result.
fn unify_against_candidates(evaluator: &Evaluator, pattern: &Expr, rhs: &Expr, env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    let mut out = Vec::new();
    for (rb, rv) in evaluator.eval_multi(rhs, env)? {
        let solutions = env.with_bindings(&rb, |env| unifier::unify(evaluator, pattern, &rv, env))?;
        for sol in solutions {
            if let Some(merged) = merge_bindings(&rb, &sol) {
                out.push(merged);
            }
        }
    }
    Ok(out)
}

fn symmetric_unify(evaluator: &Evaluator, left: &Expr, right: &Expr, env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    let forward = unify_against_candidates(evaluator, left, right, env)?;
    if !forward.is_empty() {
        return Ok(forward);
    }
    unify_against_candidates(evaluator, right, left, env)
}

enum TargetKind {
    Input(Option<Vec<String>>),
    Data(Option<Vec<String>>),
    Name(String),
}

fn apply_with_chain(
    evaluator: &Evaluator,
    expr: &Expr,
    negated: bool,
    with_mods: &[WithModifier],
    env: &mut Environment,
    cur: &BindingMap,
) -> Result<Vec<BindingMap>, Error> {
    let Some((first, rest)) = with_mods.split_first() else {
        return eval_expr_literal(evaluator, expr, negated, env, cur);
    };
    match classify_target(&first.target, evaluator, env, cur)? {
        TargetKind::Input(Some(path)) => {
            let value = env.with_bindings(cur, |env| evaluator.evaluate(&first.value, env))?;
            env.with_input_override(&path, value, |env| apply_with_chain(evaluator, expr, negated, rest, env, cur))
        }
        TargetKind::Data(Some(path)) => {
            let value = env.with_bindings(cur, |env| evaluator.evaluate(&first.value, env))?;
            env.with_data_override(&path, value, |env| apply_with_chain(evaluator, expr, negated, rest, env, cur))
        }
        TargetKind::Input(None) | TargetKind::Data(None) => Ok(Vec::new()),
        TargetKind::Name(name) => {
            let over = classify_name_value(evaluator, &first.value, env, cur)?;
            env.with_name_override(&name, over, |env| apply_with_chain(evaluator, expr, negated, rest, env, cur))
        }
    }
}

fn classify_target(target: &Expr, evaluator: &Evaluator, env: &mut Environment, cur: &BindingMap) -> Result<TargetKind, Error> {
    match target {
        Expr::Variable(name, _) if name == "input" => Ok(TargetKind::Input(Some(Vec::new()))),
        Expr::Variable(name, _) if name == "data" => Ok(TargetKind::Data(Some(Vec::new()))),
        Expr::Variable(name, _) => Ok(TargetKind::Name(name.clone())),
        Expr::Reference { base, path, .. } => {
            let Expr::Variable(root, _) = base.as_ref() else {
                return Err(Error::evaluation("invalid `with` target").with_location(target.location()));
            };
            if root == "input" || root == "data" {
                let resolved = resolve_path(path, evaluator, env, cur)?;
                return Ok(if root == "input" { TargetKind::Input(resolved) } else { TargetKind::Data(resolved) });
            }
            let mut parts = vec![root.clone()];
            for seg in path {
                match seg {
                    RefArg::Dot(n) => parts.push(n.clone()),
                    RefArg::Bracket(_) => {
                        return Err(Error::evaluation("`with` builtin target must be a static name").with_location(target.location()))
                    }
                }
            }
            Ok(TargetKind::Name(parts.join(".")))
        }
        other => Err(Error::evaluation("invalid `with` target").with_location(other.location())),
    }
}

/// Evaluates a (possibly dynamic) `with input.<path>`/`with data.<path>`
/// target path; `None` signals an undefined path-key, which fails the whole
/// literal rather than erroring (spec.md §4.10).
fn resolve_path(path: &[RefArg], evaluator: &Evaluator, env: &mut Environment, cur: &BindingMap) -> Result<Option<Vec<String>>, Error> {
    let mut out = Vec::new();
    for seg in path {
        match seg {
            RefArg::Dot(name) => out.push(name.clone()),
            RefArg::Bracket(expr) => {
                let v = env.with_bindings(cur, |env| evaluator.evaluate(expr, env))?;
                if v.is_undefined() {
                    return Ok(None);
                }
                out.push(match v {
                    Value::String(s) => s.to_string(),
                    other => other.normalize_key().to_string(),
                });
            }
        }
    }
    Ok(Some(out))
}

fn classify_name_value(evaluator: &Evaluator, value_expr: &Expr, env: &mut Environment, cur: &BindingMap) -> Result<NameOverride, Error> {
    if let Some(candidate) = callable_name_candidate(value_expr) {
        let is_builtin = env.registry().contains(&candidate);
        let is_function_rule = matches!(evaluator.module.rules.get(&candidate).map(|g| g.kind), Some(RuleKind::Function(_)));
        if is_builtin || is_function_rule {
            return Ok(NameOverride::Redirect(candidate));
        }
        if evaluator.module.rules.contains_key(&candidate) {
            let v = env.with_bindings(cur, |env| rule::eval_rule_group(evaluator, &candidate, env))?;
            return Ok(NameOverride::Value(v));
        }
    }
    let v = env.with_bindings(cur, |env| evaluator.evaluate(value_expr, env))?;
    Ok(NameOverride::Value(v))
}

/// A `with <builtin> as <replacement>` value that's itself a bare name, a
/// dotted reference, or a string literal names another callable — anything
/// else (an arithmetic expression, a literal object, ...) is evaluated for
/// its value instead (spec.md §4.10 cases (a) vs (b)/(c)).
fn callable_name_candidate(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Variable(name, _) => Some(name.clone()),
        Expr::Const(Const::String(s), _) => Some(s.clone()),
        Expr::Reference { base, path, .. } => {
            let Expr::Variable(root, _) = base.as_ref() else { return None };
            let mut parts = vec![root.clone()];
            for seg in path {
                match seg {
                    RefArg::Dot(n) => parts.push(n.clone()),
                    RefArg::Bracket(_) => return None,
                }
            }
            Some(parts.join("."))
        }
        _ => None,
    }
}
