//! The nondeterministic evaluator (spec.md §4.6-§4.11): expression
//! evaluation, reference resolution, rule-group dispatch, `with`-modifier
//! scoping, and comprehensions/`every`, split across submodules by
//! responsibility the way the root module only wires them together.

mod comprehension;
mod reference;
mod rule;
mod shadow;
mod with_mod;

use crate::{
    ast::*,
    compiler::CompiledModule,
    environment::{BindingMap, Environment},
    error::Error,
    value::Value,
};

pub struct Evaluator<'m> {
    pub module: &'m CompiledModule,
}

impl<'m> Evaluator<'m> {
    pub fn new(module: &'m CompiledModule) -> Self {
        Self { module }
    }

    /// Deterministic single-value evaluation: takes the first candidate from
    /// `eval_multi`, treating an empty result (an enumeration over an empty
    /// collection) as `undefined`.
    pub fn evaluate(&self, expr: &Expr, env: &mut Environment) -> Result<Value, Error> {
        Ok(self.eval_multi(expr, env)?.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Undefined))
    }

    /// Same as `evaluate`, but binds `overlay` in a fresh scope first — used
    /// wherever a pattern needs to see bindings collected earlier in the
    /// same unification/array-pattern before they've been committed to the
    /// ambient environment.
    pub fn evaluate_with_overlay(&self, expr: &Expr, env: &mut Environment, overlay: &BindingMap) -> Result<Value, Error> {
        env.with_bindings(overlay, |env| self.evaluate(expr, env))
    }

    /// The general evaluation engine: returns every (new-bindings, value)
    /// candidate `expr` can produce. For a ground expression this is always
    /// exactly one candidate with empty bindings; a reference through an
    /// unbound variable (e.g. `data.items[_]`) enumerates one candidate per
    /// element (spec.md §4.5's "(bindings, resolved_value) pairs").
    pub fn eval_multi(&self, expr: &Expr, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        match expr {
            Expr::Const(c, _) => Ok(vec![(BindingMap::new(), const_to_value(c))]),
            Expr::Variable(name, _) => self.eval_variable(name, env),
            Expr::Reference { base, path, .. } => reference::resolve_reference(self, base, path, env),
            Expr::BinaryOp { op, left, right, location } => self.eval_binary(*op, left, right, *location, env),
            Expr::UnaryOp { op, operand, location } => self.eval_unary(*op, operand, *location, env),
            Expr::ArrayLiteral(items, _) => self.eval_array_literal(items, env),
            Expr::SetLiteral(items, _) => self.eval_set_literal(items, env),
            Expr::ObjectLiteral(pairs, location) => self.eval_object_literal(pairs, *location, env),
            Expr::ArrayComprehension { term, body, .. } => {
                comprehension::eval_array_comprehension(self, term, body, env).map(|v| vec![(BindingMap::new(), v)])
            }
            Expr::SetComprehension { term, body, .. } => {
                comprehension::eval_set_comprehension(self, term, body, env).map(|v| vec![(BindingMap::new(), v)])
            }
            Expr::ObjectComprehension { key, value, body, .. } => {
                comprehension::eval_object_comprehension(self, key, value, body, env).map(|v| vec![(BindingMap::new(), v)])
            }
            Expr::Call { name, args, location } => rule::eval_call(self, name, args, *location, env),
            Expr::Every { key_var, value_var, domain, body, .. } => {
                comprehension::eval_every(self, key_var.as_deref(), value_var, domain, body, env).map(|v| vec![(BindingMap::new(), v)])
            }
        }
    }

    fn eval_variable(&self, name: &str, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        if name == "_" {
            return Ok(vec![(BindingMap::new(), Value::Undefined)]);
        }
        if env.is_locally_bound(name) || name == "input" || name == "data" {
            return Ok(vec![(BindingMap::new(), env.lookup(name))]);
        }
        if self.module.rules.contains_key(name) {
            let value = rule::eval_rule_group(self, name, env)?;
            return Ok(vec![(BindingMap::new(), value)]);
        }
        if self.module.imports.iter().any(|imp| reference::alias_of(imp) == name) {
            return reference::resolve_reference(self, &Expr::Variable(name.to_string(), Default::default()), &[], env);
        }
        Ok(vec![(BindingMap::new(), Value::Undefined)])
    }

    fn eval_array_literal(&self, items: &[Expr], env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        let mut candidates = vec![(BindingMap::new(), Vec::new())];
        for item in items {
            let item_candidates = self.eval_multi(item, env)?;
            candidates = cartesian_extend(candidates, item_candidates, |mut acc, v| {
                acc.push(v);
                acc
            })?;
        }
        Ok(candidates.into_iter().map(|(b, items)| (b, Value::Array(items))).collect())
    }

    fn eval_set_literal(&self, items: &[Expr], env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        let arrays = self.eval_array_literal(items, env)?;
        Ok(arrays
            .into_iter()
            .map(|(b, v)| {
                let Value::Array(items) = v else { unreachable!() };
                (b, Value::Set(items.into_iter().collect()))
            })
            .collect())
    }

    /// spec.md §4.6: "skipping to undefined if any [key or value] is
    /// undefined" — once a pair's key or value is undefined, the whole
    /// candidate settles on `Value::Undefined` rather than a partial object;
    /// remaining pairs are still evaluated for their bindings but no longer
    /// contribute to the (already-abandoned) map.
    fn eval_object_literal(&self, pairs: &[(Expr, Expr)], location: crate::location::Location, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        let mut candidates: Vec<(BindingMap, Option<indexmap::IndexMap<Box<str>, Value>>)> = vec![(BindingMap::new(), Some(indexmap::IndexMap::new()))];
        for (key_expr, value_expr) in pairs {
            let key_candidates = self.eval_multi(key_expr, env)?;
            let mut next = Vec::new();
            for (bindings, map) in candidates {
                for (kb, key_value) in &key_candidates {
                    let Some(merged_bindings) = merge_bindings(&bindings, kb) else { continue };
                    let value_candidates = env.with_bindings(&merged_bindings, |env| self.eval_multi(value_expr, env))?;
                    for (vb, value) in value_candidates {
                        let Some(final_bindings) = merge_bindings(&merged_bindings, &vb) else { continue };
                        let Some(map) = &map else {
                            next.push((final_bindings, None));
                            continue;
                        };
                        if key_value.is_undefined() || value.is_undefined() {
                            next.push((final_bindings, None));
                            continue;
                        }
                        if !key_value.is_atomic() {
                            return Err(Error::evaluation("object literal keys must be atomic values").with_location(location));
                        }
                        let mut map = map.clone();
                        let key = key_value.normalize_key();
                        if let Some(existing) = map.get(&key) {
                            if existing != &value {
                                return Err(Error::object_key_conflict(format!("key `{key}` maps to conflicting values")).with_location(location));
                            }
                        }
                        map.insert(key, value);
                        next.push((final_bindings, Some(map)));
                    }
                }
            }
            candidates = next;
        }
        Ok(candidates.into_iter().map(|(b, map)| (b, map.map_or(Value::Undefined, Value::Object))).collect())
    }

    fn eval_binary(&self, op: BinOp, left: &Expr, right: &Expr, _location: crate::location::Location, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        if matches!(op, BinOp::Assign | BinOp::Unify) {
            // Only meaningful as a full body literal; nested use falls back
            // to an equality test.
            let lv = self.evaluate(left, env)?;
            let rv = self.evaluate(right, env)?;
            return Ok(vec![(BindingMap::new(), Value::Bool(lv == rv))]);
        }
        if matches!(op, BinOp::Or | BinOp::And) {
            let lefts = self.eval_multi(left, env)?;
            let mut out = Vec::new();
            for (lb, lv) in lefts {
                let left_truthy = lv.is_truthy();
                if (op == BinOp::Or && left_truthy) || (op == BinOp::And && !left_truthy) {
                    out.push((lb, Value::Bool(op == BinOp::Or)));
                    continue;
                }
                let rights = env.with_bindings(&lb, |env| self.eval_multi(right, env))?;
                for (rb, rv) in rights {
                    let Some(bindings) = merge_bindings(&lb, &rb) else { continue };
                    out.push((bindings, Value::Bool(rv.is_truthy())));
                }
            }
            return Ok(out);
        }
        let lefts = self.eval_multi(left, env)?;
        let mut out = Vec::new();
        for (lb, lv) in lefts {
            let rights = env.with_bindings(&lb, |env| self.eval_multi(right, env))?;
            for (rb, rv) in rights {
                let Some(bindings) = merge_bindings(&lb, &rb) else { continue };
                out.push((bindings, apply_binop(op, &lv, &rv)));
            }
        }
        Ok(out)
    }

    fn eval_unary(&self, op: UnOp, operand: &Expr, location: crate::location::Location, env: &mut Environment) -> Result<Vec<(BindingMap, Value)>, Error> {
        let operands = self.eval_multi(operand, env)?;
        operands
            .into_iter()
            .map(|(b, v)| {
                let result = match op {
                    UnOp::Not => Value::Bool(!v.is_truthy()),
                    UnOp::Neg => match v {
                        Value::Number(n) => Value::Number(n.negate()),
                        other => return Err(Error::evaluation(format!("cannot negate a {}", other.type_name())).with_location(location)),
                    },
                };
                Ok((b, result))
            })
            .collect()
    }

    pub(crate) fn eval_body(&self, body: &[BodyLiteral], env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
        let mut generations = vec![BindingMap::new()];
        for literal in body {
            let mut next = Vec::new();
            for cur in &generations {
                let deltas = with_mod::eval_literal(self, literal, env, cur)?;
                for delta in deltas {
                    if let Some(merged) = merge_bindings(cur, &delta) {
                        next.push(merged);
                    }
                }
            }
            generations = next;
            if generations.is_empty() {
                break;
            }
        }
        Ok(generations)
    }
}

fn const_to_value(c: &Const) -> Value {
    match c {
        Const::Null => Value::Null,
        Const::Bool(b) => Value::Bool(*b),
        Const::Number(n) => Value::Number(*n),
        Const::String(s) => Value::string(s.clone()),
    }
}

/// Merges two binding maps; `None` if they disagree on any shared key
/// (conflicting candidates are simply dropped from the search).
pub fn merge_bindings(a: &BindingMap, b: &BindingMap) -> Option<BindingMap> {
    let mut merged = a.clone();
    for (k, v) in b {
        if let Some(existing) = merged.get(k) {
            if existing != v {
                return None;
            }
        } else {
            merged.insert(k.clone(), v.clone());
        }
    }
    Some(merged)
}

/// Extends every existing (bindings, partial-T) candidate with every
/// (bindings, value) candidate for the next item, dropping combinations
/// whose bindings conflict.
fn cartesian_extend<T: Clone>(
    acc: Vec<(BindingMap, T)>,
    next: Vec<(BindingMap, Value)>,
    combine: impl Fn(T, Value) -> T,
) -> Result<Vec<(BindingMap, T)>, Error> {
    let mut out = Vec::new();
    for (ab, av) in acc {
        for (nb, nv) in &next {
            if let Some(bindings) = merge_bindings(&ab, nb) {
                out.push((bindings, combine(av.clone(), nv.clone())));
            }
        }
    }
    Ok(out)
}

/// spec.md §4.6's operator table: every one of these degrades to
/// `Value::Undefined` rather than raising — on an undefined operand, on a
/// type mismatch, or (for `/`/`%`) on division by zero — except `==`/`!=`,
/// which only degrade on an undefined operand and are otherwise always a
/// `Bool`.
fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Value {
    use BinOp::*;
    if matches!(op, Eq | Ne) {
        if left.is_undefined() || right.is_undefined() {
            return Value::Undefined;
        }
        return Value::Bool(if op == Eq { left == right } else { left != right });
    }
    if left.is_undefined() || right.is_undefined() {
        return Value::Undefined;
    }
    match op {
        Lt | Le | Gt | Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Value::Undefined,
            };
            let Some(ordering) = ordering else { return Value::Undefined };
            Value::Bool(match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                Ge => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
        Add | Sub | Mul | Div | Mod => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else { return Value::Undefined };
            let result = match op {
                Add => a.checked_add(*b),
                Sub => a.checked_sub(*b),
                Mul => a.checked_mul(*b),
                Div => a.checked_div(*b),
                Mod => a.checked_rem(*b),
                _ => unreachable!(),
            };
            result.map_or(Value::Undefined, Value::Number)
        }
        In => eval_in(left, right),
        Or | And => unreachable!("handled in eval_binary"),
        Assign | Unify => unreachable!("handled in eval_binary"),
    }
}

/// `in` membership test (spec.md §4.6): undefined rather than an error on a
/// non-collection right-hand side, since the spec's operator table lists
/// `in` as the one comparison-shaped operator that degrades to `undefined`
/// instead of raising.
fn eval_in(left: &Value, right: &Value) -> Value {
    match right {
        Value::Array(items) => Value::Bool(items.contains(left)),
        Value::Set(items) => Value::Bool(items.contains(left)),
        Value::Object(map) => {
            if !left.is_atomic() {
                return Value::Undefined;
            }
            Value::Bool(map.contains_key(left.normalize_key().as_ref()))
        }
        _ => Value::Undefined,
    }
}
