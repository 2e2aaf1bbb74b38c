//! Compiles a parsed `Module` into a `CompiledModule`: groups rules by name,
//! checks rule-kind/arity consistency and default-rule cardinality, checks
//! function names against the builtin registry, validates imports, builds a
//! same-module rule dependency graph, and runs the negation-safety walk
//! (spec.md §4.3).

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::{ast::*, builtins::BuiltinRegistry, error::Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Complete,
    PartialSet,
    PartialObject,
    Function(usize),
}

pub struct RuleGroup {
    pub kind: RuleKind,
    pub rules: Vec<Rule>,
}

pub struct CompiledModule {
    pub package_path: Vec<String>,
    pub imports: Vec<Import>,
    pub rules: IndexMap<String, RuleGroup>,
    pub dependencies: HashMap<String, HashSet<String>>,
}

impl CompiledModule {
    pub fn qualified_name(&self) -> String {
        self.package_path.join(".")
    }
}

pub fn compile(module: &Module, registry: &BuiltinRegistry) -> Result<CompiledModule, Error> {
    let rule_names: HashSet<String> = module.rules.iter().map(|r| r.name.clone()).collect();
    validate_imports(module, &rule_names)?;

    let mut groups: IndexMap<String, RuleGroup> = IndexMap::new();
    for rule in &module.rules {
        let kind = rule_kind(rule);
        match groups.get_mut(&rule.name) {
            None => {
                groups.insert(rule.name.clone(), RuleGroup { kind, rules: vec![rule.clone()] });
            }
            Some(group) => {
                if !kinds_compatible(group.kind, kind) {
                    return Err(Error::compilation(format!(
                        "rule `{}` is defined with incompatible head shapes across its group",
                        rule.name
                    ))
                    .with_location(rule.location)
                    .with_rule(rule.name.clone()));
                }
                group.rules.push(rule.clone());
            }
        }
    }

    for (name, group) in &groups {
        let defaults = group.rules.iter().filter(|r| r.is_default).count();
        if defaults > 1 {
            return Err(Error::compilation(format!("rule `{name}` has more than one `default` definition")).with_rule(name.clone()));
        }
        if let RuleKind::Function(declared_arity) = group.kind {
            if registry.contains(name) {
                return Err(Error::compilation(format!(
                    "function rule `{name}` collides with a builtin of the same name"
                ))
                .with_rule(name.clone()));
            }
            for rule in &group.rules {
                if let RuleHead::Function { args, .. } = &rule.head {
                    if args.len() != declared_arity {
                        return Err(Error::compilation(format!(
                            "function rule `{name}` has inconsistent arity across its definitions"
                        ))
                        .with_location(rule.location)
                        .with_rule(name.clone()));
                    }
                }
            }
        }
    }

    for rule in &module.rules {
        check_negation_safety(rule)?;
    }

    let dependencies = build_dependency_graph(module, &groups);

    Ok(CompiledModule { package_path: module.package_path.clone(), imports: module.imports.clone(), rules: groups, dependencies })
}

fn rule_kind(rule: &Rule) -> RuleKind {
    match &rule.head {
        RuleHead::Complete { .. } => RuleKind::Complete,
        RuleHead::PartialSet { .. } => RuleKind::PartialSet,
        RuleHead::PartialObject { .. } => RuleKind::PartialObject,
        RuleHead::Function { args, .. } => RuleKind::Function(args.len()),
    }
}

fn kinds_compatible(a: RuleKind, b: RuleKind) -> bool {
    match (a, b) {
        (RuleKind::Function(x), RuleKind::Function(y)) => x == y,
        (x, y) => std::mem::discriminant(&x) == std::mem::discriminant(&y),
    }
}

/// spec.md §4.3 step 4: reject duplicate aliases, reject aliases colliding
/// with a declared rule name or a reserved root name — except that `import
/// data`/`import input` with no explicit alias names only the reserved root
/// itself and introduces no alias to conflict with anything.
fn validate_imports(module: &Module, rule_names: &HashSet<String>) -> Result<(), Error> {
    let mut seen_aliases = HashSet::new();
    for import in &module.imports {
        if !(import.path.starts_with("data.") || import.path.starts_with("input.") || import.path == "data" || import.path == "input") {
            return Err(Error::compilation(format!("import path `{}` must start with `data` or `input`", import.path))
                .with_location(import.location));
        }
        let is_bare_root = import.alias.is_none() && (import.path == "data" || import.path == "input");
        if is_bare_root {
            continue;
        }
        let alias = import.alias.clone().unwrap_or_else(|| import.path.rsplit('.').next().unwrap_or(&import.path).to_string());
        if alias == "input" || alias == "data" {
            return Err(Error::compilation(format!("import alias `{alias}` cannot shadow the reserved `{alias}` root")).with_location(import.location));
        }
        if rule_names.contains(&alias) {
            return Err(Error::compilation(format!("import alias `{alias}` collides with a declared rule name")).with_location(import.location));
        }
        if !seen_aliases.insert(alias.clone()) {
            return Err(Error::compilation(format!("import alias `{alias}` is declared more than once")).with_location(import.location));
        }
    }
    Ok(())
}

/// spec.md §4.3 negation safety: every variable free in a `not` literal must
/// already be bound by an earlier literal in the same body.
fn check_negation_safety(rule: &Rule) -> Result<(), Error> {
    let Some(body) = &rule.body else { return Ok(()) };
    let mut bound: HashSet<String> = HashSet::new();
    if let RuleHead::Function { args, .. } = &rule.head {
        for arg in args {
            collect_free_vars(arg, &mut bound);
        }
    }
    walk_body_safety(body, &mut bound, &rule.name)?;
    for clause in &rule.else_clauses {
        if let Some(body) = &clause.body {
            let mut bound = bound.clone();
            walk_body_safety(body, &mut bound, &rule.name)?;
        }
    }
    Ok(())
}

fn walk_body_safety(body: &[BodyLiteral], bound: &mut HashSet<String>, rule_name: &str) -> Result<(), Error> {
    for literal in body {
        match literal {
            BodyLiteral::Some(decl) => {
                if let Some(collection) = &decl.collection {
                    collect_free_vars(collection, bound);
                }
                for var in &decl.variables {
                    bound.insert(var.clone());
                }
            }
            BodyLiteral::Expr { expr, negated: true, .. } => {
                let mut free = HashSet::new();
                collect_free_vars(expr, &mut free);
                for var in &free {
                    if !bound.contains(var) {
                        return Err(Error::compilation(format!("variable `{var}` is unsafe: used under `not` before being bound"))
                            .with_location(literal.location())
                            .with_rule(rule_name.to_string()));
                    }
                }
            }
            BodyLiteral::Expr { expr, negated: false, .. } => {
                bind_from_literal(expr, bound);
            }
        }
    }
    Ok(())
}

/// Variables introduced by a non-negated literal: both sides of `:=`/`=`,
/// and any reference/call result treated as newly available afterward.
fn bind_from_literal(expr: &Expr, bound: &mut HashSet<String>) {
    if let Expr::BinaryOp { op: BinOp::Assign | BinOp::Unify, left, right, .. } = expr {
        collect_pattern_vars(left, bound);
        collect_pattern_vars(right, bound);
        return;
    }
    collect_free_vars(expr, bound);
}

fn collect_pattern_vars(expr: &Expr, bound: &mut HashSet<String>) {
    match expr {
        Expr::Variable(name, _) if name != "_" => {
            bound.insert(name.clone());
        }
        Expr::ArrayLiteral(items, _) | Expr::SetLiteral(items, _) => {
            for item in items {
                collect_pattern_vars(item, bound);
            }
        }
        Expr::ObjectLiteral(pairs, _) => {
            for (_, v) in pairs {
                collect_pattern_vars(v, bound);
            }
        }
        other => collect_free_vars(other, bound),
    }
}

fn collect_free_vars(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Const(..) => {}
        Expr::Variable(name, _) => {
            if name != "_" {
                out.insert(name.clone());
            }
        }
        Expr::Reference { base, path, .. } => {
            collect_free_vars(base, out);
            for arg in path {
                if let RefArg::Bracket(key) = arg {
                    collect_free_vars(key, out);
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_free_vars(left, out);
            collect_free_vars(right, out);
        }
        Expr::UnaryOp { operand, .. } => collect_free_vars(operand, out),
        Expr::ArrayLiteral(items, _) | Expr::SetLiteral(items, _) => {
            for item in items {
                collect_free_vars(item, out);
            }
        }
        Expr::ObjectLiteral(pairs, _) => {
            for (k, v) in pairs {
                collect_free_vars(k, out);
                collect_free_vars(v, out);
            }
        }
        // Comprehension/every bodies are self-contained scopes; only the
        // outer domain expression can reference already-bound variables.
        Expr::ArrayComprehension { .. } | Expr::SetComprehension { .. } | Expr::ObjectComprehension { .. } => {}
        Expr::Call { name, args, .. } => {
            if let CallName::Ref(r) = name {
                collect_free_vars(r, out);
            }
            for arg in args {
                collect_free_vars(arg, out);
            }
        }
        Expr::Every { domain, .. } => collect_free_vars(domain, out),
    }
}

fn build_dependency_graph(module: &Module, groups: &IndexMap<String, RuleGroup>) -> HashMap<String, HashSet<String>> {
    let mut deps: HashMap<String, HashSet<String>> = HashMap::new();
    for rule in &module.rules {
        let mut refs = HashSet::new();
        if let RuleHead::Complete { value: Some(v) } = &rule.head {
            collect_rule_refs(v, groups, &mut refs);
        }
        if let RuleHead::PartialSet { term } = &rule.head {
            collect_rule_refs(term, groups, &mut refs);
        }
        if let RuleHead::PartialObject { key, value, .. } = &rule.head {
            collect_rule_refs(key, groups, &mut refs);
            collect_rule_refs(value, groups, &mut refs);
        }
        if let RuleHead::Function { value: Some(v), .. } = &rule.head {
            collect_rule_refs(v, groups, &mut refs);
        }
        if let Some(body) = &rule.body {
            for literal in body {
                if let BodyLiteral::Expr { expr, .. } = literal {
                    collect_rule_refs(expr, groups, &mut refs);
                }
            }
        }
        deps.entry(rule.name.clone()).or_default().extend(refs);
    }
    deps
}

fn collect_rule_refs(expr: &Expr, groups: &IndexMap<String, RuleGroup>, out: &mut HashSet<String>) {
    let mut names = HashSet::new();
    collect_free_vars(expr, &mut names);
    for name in names {
        if groups.contains_key(&name) {
            out.insert(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn rejects_incompatible_rule_kinds() {
        let module = parse("package p\nx := 1\nx contains 2 if { true }").unwrap();
        let registry = BuiltinRegistry::with_stdlib();
        assert!(compile(&module, &registry).is_err());
    }

    #[test]
    fn rejects_unsafe_negation() {
        let module = parse("package p\nok { not x == 1 }").unwrap();
        let registry = BuiltinRegistry::with_stdlib();
        assert!(compile(&module, &registry).is_err());
    }

    #[test]
    fn accepts_negation_bound_by_earlier_literal() {
        let module = parse("package p\nok { x := 1; not x == 2 }").unwrap();
        let registry = BuiltinRegistry::with_stdlib();
        assert!(compile(&module, &registry).is_ok());
    }

    #[test]
    fn rejects_function_colliding_with_builtin() {
        let module = parse("package p\ncount(x) := 1").unwrap();
        let registry = BuiltinRegistry::with_stdlib();
        assert!(compile(&module, &registry).is_err());
    }
}
