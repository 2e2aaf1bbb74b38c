//! A Rego/OPA-flavored policy language interpreter (spec.md §1-§2): lexer →
//! parser → compiler → evaluator, producing a value/success/bindings result
//! from a policy module plus `input`/`data` documents and an optional query.
//!
//! ```
//! # use policy_engine::{evaluate, Value};
//! let source = "package example\ndefault allow := false\nallow if { input.user == \"admin\" }";
//! let input = {
//!     let mut m = indexmap::IndexMap::new();
//!     m.insert("user".into(), Value::string("admin"));
//!     Value::Object(m)
//! };
//! let result = evaluate(source, input, Value::Null, Some("data.example.allow".into())).unwrap();
//! assert_eq!(result.value, Value::Bool(true));
//! assert!(result.success);
//! ```

mod ast;
mod builtins;
mod compiler;
mod environment;
mod error;
mod evaluator;
mod lexer;
mod location;
mod memo;
mod parser;
mod result;
mod token;
mod unifier;
mod value;

pub use crate::{
    ast::Module,
    builtins::{BuiltinFn, BuiltinRegistry},
    compiler::{CompiledModule, RuleGroup, RuleKind},
    environment::Environment,
    error::{Error, ErrorKind},
    location::Location,
    result::EvalResult,
    value::{Number, Value},
};

use crate::{ast::Expr, evaluator::Evaluator};

/// `parse(source) -> Module` (spec.md §6).
pub fn parse(source: &str) -> Result<Module, Error> {
    parser::parse(source)
}

/// `compile(source) -> CompiledModule` (spec.md §6), using the default
/// (stdlib) builtin registry to check function/builtin name collisions.
/// Callers that need a custom registry should go through `compile_with` or
/// `Policy::compile_with`.
pub fn compile(source: &str) -> Result<CompiledModule, Error> {
    compile_with(source, &BuiltinRegistry::with_stdlib())
}

pub fn compile_with(source: &str, registry: &BuiltinRegistry) -> Result<CompiledModule, Error> {
    let module = parse(source)?;
    compiler::compile(&module, registry)
}

/// A query shape accepted by `evaluate`/`Policy::evaluate` (spec.md §6): a
/// dotted-path string resolved as a reference, an AST expression used
/// directly, or any other `Value` treated as a literal result.
pub enum QueryInput {
    Path(String),
    Expr(Expr),
    Literal(Value),
}

impl From<&str> for QueryInput {
    fn from(s: &str) -> Self {
        QueryInput::Path(s.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(s: String) -> Self {
        QueryInput::Path(s)
    }
}

impl From<Expr> for QueryInput {
    fn from(expr: Expr) -> Self {
        QueryInput::Expr(expr)
    }
}

impl From<Value> for QueryInput {
    fn from(value: Value) -> Self {
        QueryInput::Literal(value)
    }
}

/// Splits a dotted path into a reference expression, the first segment
/// becoming the base variable (`input`/`data`/a bare rule name) and the rest
/// dot segments. An empty segment (leading/trailing/doubled `.`) is
/// rejected, per spec.md §6.
fn path_to_reference(path: &str) -> Result<Expr, Error> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::evaluation(format!("query path `{path}` has an empty segment")));
    }
    let loc = Location::synthetic();
    let mut iter = segments.into_iter();
    let base = iter.next().expect("split always yields at least one segment");
    let base_expr = Expr::Variable(base.to_string(), loc);
    let rest: Vec<ast::RefArg> = iter.map(|s| ast::RefArg::Dot(s.to_string())).collect();
    if rest.is_empty() {
        Ok(base_expr)
    } else {
        Ok(Expr::Reference { base: Box::new(base_expr), path: rest, location: loc })
    }
}

/// A compiled module paired with the builtin registry it was compiled
/// against, ready for repeated `evaluate` calls (spec.md §6 `Policy`).
pub struct Policy {
    module: CompiledModule,
    registry: BuiltinRegistry,
}

impl Policy {
    pub fn compile(source: &str) -> Result<Self, Error> {
        Self::compile_with(source, BuiltinRegistry::with_stdlib())
    }

    pub fn compile_with(source: &str, registry: BuiltinRegistry) -> Result<Self, Error> {
        let module = parse(source)?;
        let compiled = compiler::compile(&module, &registry)?;
        Ok(Self { module: compiled, registry })
    }

    pub fn evaluate(&self, input: Value, data: Value, query: Option<QueryInput>) -> Result<EvalResult, Error> {
        let evaluator = Evaluator::new(&self.module);
        let mut env = Environment::new(input, data, &self.registry);
        run_query(&evaluator, &self.module, query, &mut env)
    }

    pub fn module(&self) -> &CompiledModule {
        &self.module
    }

    pub fn registry(&self) -> &BuiltinRegistry {
        &self.registry
    }
}

/// `evaluate(source, input, data, query?) -> Result` (spec.md §6):
/// convenience wrapper that compiles then evaluates in one call.
pub fn evaluate(source: &str, input: Value, data: Value, query: Option<QueryInput>) -> Result<EvalResult, Error> {
    Policy::compile(source)?.evaluate(input, data, query)
}

fn run_query(
    evaluator: &Evaluator,
    module: &CompiledModule,
    query: Option<QueryInput>,
    env: &mut Environment,
) -> Result<EvalResult, Error> {
    let expr = match query {
        None => return Ok(EvalResult::literal(full_package_document(evaluator, module, env)?)),
        Some(QueryInput::Literal(v)) => return Ok(EvalResult::literal(v)),
        Some(QueryInput::Expr(expr)) => expr,
        Some(QueryInput::Path(path)) => path_to_reference(&path)?,
    };
    let candidates = evaluator.eval_multi(&expr, env)?;
    match candidates.into_iter().next() {
        Some((bindings, value)) => Ok(EvalResult::new(value, bindings.into_iter().collect())),
        None => Ok(EvalResult::new(Value::Undefined, Default::default())),
    }
}

/// The implicit document evaluated when no query is given: every
/// non-function rule in the module's own package, keyed by rule name —
/// analogous to evaluating a bare `data.<package>` reference.
fn full_package_document(evaluator: &Evaluator, module: &CompiledModule, env: &mut Environment) -> Result<Value, Error> {
    let mut out = indexmap::IndexMap::new();
    for (name, group) in &module.rules {
        if matches!(group.kind, RuleKind::Function(_)) {
            continue;
        }
        let value = evaluator.evaluate(&Expr::Variable(name.clone(), Location::synthetic()), env)?;
        if !value.is_undefined() {
            out.insert(name.clone().into_boxed_str(), value);
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        let mut map = indexmap::IndexMap::new();
        for (k, v) in pairs {
            map.insert((*k).into(), v.clone());
        }
        Value::Object(map)
    }

    #[test]
    fn basic_allow_scenario() {
        let source = "package example\ndefault allow := false\nallow if { input.user == \"admin\" }";
        let result = evaluate(source, obj(&[("user", Value::string("admin"))]), Value::Null, Some("data.example.allow".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));
        assert!(result.success);

        let result = evaluate(source, obj(&[("user", Value::string("bob"))]), Value::Null, Some("data.example.allow".into())).unwrap();
        assert_eq!(result.value, Value::Bool(false));
        assert!(result.success);
    }

    #[test]
    fn comprehension_scenario() {
        let source = "package p\nxs := [x | x := data.items[_]; x > 1]";
        let data = obj(&[("items", Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]))]);
        let result = evaluate(source, Value::Null, data, Some("data.p.xs".into())).unwrap();
        assert_eq!(result.value, Value::array(vec![Value::int(2), Value::int(3)]));
    }

    #[test]
    fn partial_object_conflict_scenario() {
        let source = "package p\nusers[\"a\"] := 1\nusers[\"a\"] := 2";
        let err = evaluate(source, Value::Null, Value::Null, Some("data.p.users".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ObjectKeyConflict);
    }

    #[test]
    fn with_mock_of_builtin_scenario() {
        let source = "package p\nok { count([1, 2, 3]) == 6 with count as sum }";
        let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));
    }

    #[test]
    fn every_quantification_scenario() {
        let source = "package p\nok { every x in [1, 2, 3] { x > 0 } }";
        let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));

        let source = "package p\nxs := input.xs\nok { every x in xs { x > 0 } }";
        let input = obj(&[("xs", Value::array(vec![Value::int(1), Value::int(2), Value::int(0)]))]);
        let result = evaluate(source, input, Value::Null, Some("data.p.ok".into())).unwrap();
        assert_eq!(result.value, Value::Undefined);
        assert!(!result.success);
    }

    #[test]
    fn unification_backtracking_scenario() {
        // `k` is a bare free variable in the bracket position, never shadowed
        // by a `some` declaration, so the reference enumerates every key of
        // `input` looking for one whose value is "target".
        let source = "package p\nfound { input[k] == \"target\" }";
        let input = obj(&[("a", Value::string("x")), ("b", Value::string("target"))]);
        let result = evaluate(source, input, Value::Null, Some("data.p.found".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));
    }

    #[test]
    fn membership_operator() {
        let source = "package p\nok { 2 in [1, 2, 3] }\nmissing { not 4 in [1, 2, 3] }";
        let result = evaluate(source, Value::Null, Value::Null, Some("data.p.ok".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));
        let result = evaluate(source, Value::Null, Value::Null, Some("data.p.missing".into())).unwrap();
        assert_eq!(result.value, Value::Bool(true));
    }

    #[test]
    fn default_query_evaluates_whole_package() {
        let source = "package p\na := 1\nb := 2";
        let result = evaluate(source, Value::Null, Value::Null, None).unwrap();
        assert_eq!(result.value, obj(&[("a", Value::int(1)), ("b", Value::int(2))]));
    }
}
