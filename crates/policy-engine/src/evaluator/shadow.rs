//! Rule/comprehension-body shadowing (spec.md §4.8): before a body's first
//! literal runs, every variable name the body introduces via `some`/`:=`/`=`
//! is pre-bound to `undefined` in a fresh scope. This isolates rule-local
//! variables from a same-named variable bound in an enclosing comprehension
//! or rule — without it, an inner body with no binding yet for `x` would see
//! an outer `x` through plain scope lookup instead of treating it as fresh.

use std::collections::HashSet;

use super::Evaluator;
use crate::{
    ast::{BinOp, BodyLiteral, Expr, RefArg},
    environment::{BindingMap, Environment},
    error::Error,
};

pub(crate) fn solve_body(evaluator: &Evaluator, body: &[BodyLiteral], env: &mut Environment) -> Result<Vec<BindingMap>, Error> {
    env.push_scope();
    for name in collect_shadow_vars(body) {
        env.bind(&name, crate::value::Value::Undefined);
    }
    let result = evaluator.eval_body(body, env);
    env.pop_scope();
    result
}

fn collect_shadow_vars(body: &[BodyLiteral]) -> HashSet<String> {
    let mut names = HashSet::new();
    for literal in body {
        match literal {
            BodyLiteral::Some(decl) => {
                for var in &decl.variables {
                    if var != "_" {
                        names.insert(var.clone());
                    }
                }
            }
            BodyLiteral::Expr { expr: Expr::BinaryOp { op: BinOp::Assign | BinOp::Unify, left, right, .. }, .. } => {
                collect_vars(left, &mut names);
                collect_vars(right, &mut names);
            }
            BodyLiteral::Expr { .. } => {}
        }
    }
    names
}

/// Every variable name mentioned anywhere in `expr`, not stopping at
/// already-bound vs free — shadowing is conservative by design; binding an
/// extra name to `undefined` that later gets assigned a real value is
/// harmless. Comprehension/`every` sub-bodies are self-contained scopes and
/// are not descended into.
fn collect_vars(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Const(..) => {}
        Expr::Variable(name, _) => {
            if name != "_" && name != "input" && name != "data" {
                out.insert(name.clone());
            }
        }
        Expr::Reference { base, path, .. } => {
            collect_vars(base, out);
            for arg in path {
                if let RefArg::Bracket(key) = arg {
                    collect_vars(key, out);
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_vars(left, out);
            collect_vars(right, out);
        }
        Expr::UnaryOp { operand, .. } => collect_vars(operand, out),
        Expr::ArrayLiteral(items, _) | Expr::SetLiteral(items, _) => {
            for item in items {
                collect_vars(item, out);
            }
        }
        Expr::ObjectLiteral(pairs, _) => {
            for (k, v) in pairs {
                collect_vars(k, out);
                collect_vars(v, out);
            }
        }
        Expr::ArrayComprehension { .. } | Expr::SetComprehension { .. } | Expr::ObjectComprehension { .. } | Expr::Every { .. } => {}
        Expr::Call { name, args, .. } => {
            if let crate::ast::CallName::Ref(r) = name {
                collect_vars(r, out);
            }
            for arg in args {
                collect_vars(arg, out);
            }
        }
    }
}
