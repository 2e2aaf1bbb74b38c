//! Reference resolution (spec.md §4.4, §4.7): walks a base value through a
//! chain of dot/bracket segments, enumerating once a bracket segment's key
//! is an unbound variable (the `data.items[_]` iteration idiom), substituting
//! import aliases and this module's own `data.<pkg>.<rule>` prefix along the
//! way.

use super::{rule, Evaluator};
use crate::{
    ast::{Expr, Import, RefArg},
    compiler::CompiledModule,
    environment::{BindingMap, Environment},
    error::Error,
    value::Value,
};

pub fn resolve_reference(evaluator: &Evaluator, base: &Expr, path: &[RefArg], env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
    if let Expr::Variable(name, _) = base {
        if name != "_" && name != "input" && name != "data" && !env.is_locally_bound(name) {
            if let Some(import) = find_import(evaluator.module, name) {
                let (sub_base, mut sub_path) = import_target(import);
                sub_path.extend(path.iter().cloned());
                return resolve_reference(evaluator, &sub_base, &sub_path, env);
            }
        }
        if name == "data" {
            if let Some((rule_name, rest)) = match_own_package(evaluator.module, path) {
                let value = rule::eval_rule_group(evaluator, &rule_name, env)?;
                return walk_path(evaluator, vec![(BindingMap::new(), value)], &rest, env);
            }
        }
    }
    let frontier = evaluator.eval_multi(base, env)?;
    walk_path(evaluator, frontier, path, env)
}

fn walk_path(evaluator: &Evaluator, mut frontier: Vec<(BindingMap, Value)>, path: &[RefArg], env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
    for segment in path {
        let mut next = Vec::new();
        for (bindings, value) in frontier {
            match segment {
                RefArg::Dot(name) => {
                    next.push((bindings.clone(), value.fetch(&Value::string(name.clone()))));
                }
                RefArg::Bracket(key_expr) => {
                    if let Some(var_name) = free_variable(key_expr, env, &bindings) {
                        enumerate_keys(&var_name, &value, &bindings, &mut next);
                    } else {
                        let key_value = env.with_bindings(&bindings, |env| evaluator.evaluate(key_expr, env))?;
                        next.push((bindings.clone(), value.fetch(&key_value)));
                    }
                }
            }
        }
        frontier = next;
    }
    Ok(frontier)
}

/// `data.<pkg...>.<rule>` where `<pkg...>` is exactly this module's own
/// package path: the rule's evaluated value substitutes for a literal `data`
/// tree lookup (spec.md §4.7 point 4), since rule values aren't materialized
/// into the `data` document.
pub(crate) fn match_own_package<'a>(module: &CompiledModule, path: &'a [RefArg]) -> Option<(String, Vec<RefArg>)> {
    let pkg = &module.package_path;
    if path.len() < pkg.len() + 1 {
        return None;
    }
    for (seg, expected) in path.iter().zip(pkg.iter()) {
        let RefArg::Dot(name) = seg else { return None };
        if name != expected {
            return None;
        }
    }
    let RefArg::Dot(rule_name) = &path[pkg.len()] else { return None };
    if !module.rules.contains_key(rule_name) {
        return None;
    }
    Some((rule_name.clone(), path[pkg.len() + 1..].to_vec()))
}

pub(crate) fn alias_of(import: &Import) -> String {
    import.alias.clone().unwrap_or_else(|| import.path.rsplit('.').next().unwrap_or(&import.path).to_string())
}

fn find_import<'a>(module: &'a CompiledModule, alias_name: &str) -> Option<&'a Import> {
    module.imports.iter().find(|imp| alias_of(imp) == alias_name)
}

fn import_target(import: &Import) -> (Expr, Vec<RefArg>) {
    let mut parts = import.path.split('.');
    let root = parts.next().unwrap_or("data").to_string();
    let base = Expr::Variable(root, import.location);
    let rest = parts.map(|p| RefArg::Dot(p.to_string())).collect();
    (base, rest)
}

/// A bracket key counts as a free iteration variable when it's a bare
/// variable (including `_`) that isn't already bound by an earlier segment
/// in this same reference, an earlier literal in this body, or an outer
/// scope.
fn free_variable(key_expr: &Expr, env: &Environment, bindings: &BindingMap) -> Option<String> {
    let Expr::Variable(name, _) = key_expr else { return None };
    if name == "_" {
        return Some(name.clone());
    }
    if bindings.contains_key(name) || env.is_locally_bound(name) {
        return None;
    }
    Some(name.clone())
}

fn enumerate_keys(var_name: &str, value: &Value, bindings: &BindingMap, out: &mut Vec<(BindingMap, Value)>) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let mut next = bindings.clone();
                if var_name != "_" {
                    next.insert(var_name.to_string(), Value::int(index as i64));
                }
                out.push((next, item.clone()));
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let mut next = bindings.clone();
                if var_name != "_" {
                    next.insert(var_name.to_string(), Value::string(key.clone()));
                }
                out.push((next, item.clone()));
            }
        }
        // Sets aren't addressable by a free key (spec.md §4.4); contributes
        // no candidates rather than erroring, matching "undefined is not an
        // error".
        _ => {}
    }
}
