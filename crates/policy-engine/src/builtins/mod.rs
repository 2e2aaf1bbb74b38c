//! The builtin function registry (spec.md §4.6, §6). Holds a small, bounded
//! demo standard library (see `stdlib`) — the exact set of builtins is
//! explicitly out of scope for the policy language proper; this module only
//! needs to demonstrate the registry/override contract the evaluator
//! dispatches calls through.

mod stdlib;

use std::collections::HashMap;

use crate::{error::Error, value::Value};

pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// A registered builtin: its declared arity alongside the handler — the
/// registry contract (spec.md §6) is `register(name, arity, handler)`, and
/// dispatch (spec.md §4.9) must check "name, arity must match" before
/// invoking the handler at all.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEntry {
    pub arity: usize,
    pub handler: BuiltinFn,
}

#[derive(Default)]
pub struct BuiltinRegistry {
    entries: HashMap<String, BuiltinEntry>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdlib() -> Self {
        let mut registry = Self::new();
        stdlib::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, arity: usize, f: BuiltinFn) {
        self.entries.insert(name.into(), BuiltinEntry { arity, handler: f });
    }

    pub fn entry_for(&self, name: &str) -> Option<BuiltinEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns a copy of this registry with one entry replaced — the
    /// registry-level counterpart to `Environment::with_name_override` for
    /// callers that want a standalone overridden registry rather than a
    /// scoped evaluation closure.
    pub fn with_override(&self, name: impl Into<String>, arity: usize, f: BuiltinFn) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(name.into(), BuiltinEntry { arity, handler: f });
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
