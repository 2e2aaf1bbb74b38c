//! Scope stack, `input`/`data` roots, and the `with`-override overlay
//! mechanism (spec.md §4.4, §4.10).

use std::collections::HashMap;

use crate::{builtins::BuiltinRegistry, memo::MemoContext, value::Value};

pub type BindingMap = HashMap<String, Value>;

/// What a `with <name> as <replacement>` modifier installs (spec.md §4.10):
/// either a plain constant result, or a redirect to another registered
/// callable (builtin or function rule) that the original arguments are
/// forwarded to.
#[derive(Debug, Clone, PartialEq)]
pub enum NameOverride {
    Value(Value),
    Redirect(String),
}

pub struct Environment<'r> {
    scopes: Vec<BindingMap>,
    input_stack: Vec<Value>,
    data_stack: Vec<Value>,
    registry: &'r BuiltinRegistry,
    name_overrides: Vec<HashMap<String, NameOverride>>,
    pub memo: MemoContext,
}

impl<'r> Environment<'r> {
    pub fn new(input: Value, data: Value, registry: &'r BuiltinRegistry) -> Self {
        Self {
            scopes: vec![BindingMap::new()],
            input_stack: vec![input],
            data_stack: vec![data],
            registry,
            name_overrides: Vec::new(),
            memo: MemoContext::new(),
        }
    }

    pub fn input(&self) -> &Value {
        self.input_stack.last().expect("input stack always has a root")
    }

    pub fn data(&self) -> &Value {
        self.data_stack.last().expect("data stack always has a root")
    }

    // ---- scope stack --------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.scopes.push(BindingMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.scopes.push(BindingMap::new());
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.scopes.last_mut().expect("scope stack never empty").insert(name.to_string(), value);
    }

    /// `input`/`data` are roots, not ordinary bindings, and never shadowed.
    pub fn lookup(&self, name: &str) -> Value {
        if name == "input" {
            return self.input().clone();
        }
        if name == "data" {
            return self.data().clone();
        }
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return value.clone();
            }
        }
        Value::Undefined
    }

    /// True if `name` is declared in any active local scope, including as a
    /// `some`-introduced-but-still-undefined variable. Used to tell a
    /// reference's free iteration variables apart from already-bound names.
    pub fn is_locally_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Merges `bindings` into a fresh innermost scope for the duration of
    /// `f`, then tears it down — the copy-on-merge scope-teardown pattern
    /// from spec.md §9.
    pub fn with_bindings<T>(&mut self, bindings: &BindingMap, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_scope();
        for (name, value) in bindings {
            self.bind(name, value.clone());
        }
        let result = f(self);
        self.pop_scope();
        result
    }

    // ---- with-modifier overrides ---------------------------------------------

    pub fn with_input_override<T>(&mut self, path: &[String], value: Value, f: impl FnOnce(&mut Self) -> T) -> T {
        let patched = set_path(self.input(), path, value);
        self.input_stack.push(patched);
        self.memo.push_scope();
        let result = f(self);
        self.memo.pop_scope();
        self.input_stack.pop();
        result
    }

    pub fn with_data_override<T>(&mut self, path: &[String], value: Value, f: impl FnOnce(&mut Self) -> T) -> T {
        let patched = set_path(self.data(), path, value);
        self.data_stack.push(patched);
        self.memo.push_scope();
        let result = f(self);
        self.memo.pop_scope();
        self.data_stack.pop();
        result
    }

    /// Mocks a builtin or function rule for the duration of `f` — either
    /// with a constant value (`with count as 3`, or a rule/literal
    /// replacement per spec.md §4.10(b)/(c)) or a redirect to another
    /// callable name (`with count as sum`, §4.10(a)).
    pub fn with_name_override<T>(&mut self, name: &str, over: NameOverride, f: impl FnOnce(&mut Self) -> T) -> T {
        let mut overlay = HashMap::new();
        overlay.insert(name.to_string(), over);
        self.name_overrides.push(overlay);
        self.memo.push_scope();
        let result = f(self);
        self.memo.pop_scope();
        self.name_overrides.pop();
        result
    }

    pub fn name_override(&self, name: &str) -> Option<&NameOverride> {
        self.name_overrides.iter().rev().find_map(|overlay| overlay.get(name))
    }

    pub fn registry(&self) -> &'r BuiltinRegistry {
        self.registry
    }
}

/// Clones `root` and sets the value at `path`, creating object segments for
/// any path component that's missing or not yet an object.
fn set_path(root: &Value, path: &[String], value: Value) -> Value {
    let Some((head, rest)) = path.split_first() else { return value };
    let mut object = match root {
        Value::Object(map) => map.clone(),
        _ => indexmap::IndexMap::new(),
    };
    let child = object.get(head.as_str()).cloned().unwrap_or(Value::Object(indexmap::IndexMap::new()));
    object.insert(head.clone().into_boxed_str(), set_path(&child, rest, value));
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinRegistry;

    #[test]
    fn lookup_falls_back_to_undefined() {
        let registry = BuiltinRegistry::with_stdlib();
        let env = Environment::new(Value::Null, Value::Null, &registry);
        assert!(env.lookup("nope").is_undefined());
    }

    #[test]
    fn input_override_is_scoped_to_closure() {
        let registry = BuiltinRegistry::with_stdlib();
        let mut env = Environment::new(Value::Object(indexmap::IndexMap::new()), Value::Null, &registry);
        let patched = env.with_input_override(&["user".to_string()], Value::string("admin"), |env| {
            env.input().fetch(&Value::string("user"))
        });
        assert_eq!(patched, Value::string("admin"));
        assert!(env.input().fetch(&Value::string("user")).is_undefined());
    }

    #[test]
    fn scope_bindings_are_torn_down() {
        let registry = BuiltinRegistry::with_stdlib();
        let mut env = Environment::new(Value::Null, Value::Null, &registry);
        let mut bindings = BindingMap::new();
        bindings.insert("x".into(), Value::int(1));
        env.with_bindings(&bindings, |env| assert_eq!(env.lookup("x"), Value::int(1)));
        assert!(env.lookup("x").is_undefined());
    }
}
