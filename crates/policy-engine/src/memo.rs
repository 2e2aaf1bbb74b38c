//! Recursive-rule memoization (spec.md §4.9, §5): each rule group's results
//! are cached for the lifetime of one evaluation, and a rule currently being
//! evaluated is tracked so direct/indirect self-reference breaks as "no
//! solutions yet" rather than recursing forever.

use std::collections::{HashMap, HashSet};

use crate::value::Value;

/// Identifies one memoized computation: a rule name plus, for function
/// rules, a stable text key for the call arguments (good enough to
/// disambiguate distinct call sites without needing `Value: Hash + Eq` to
/// cover every variant identically to `==`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub rule_name: String,
    pub args_key: Option<String>,
}

impl RuleKey {
    pub fn complete_or_partial(rule_name: impl Into<String>) -> Self {
        Self { rule_name: rule_name.into(), args_key: None }
    }

    pub fn function_call(rule_name: impl Into<String>, args: &[Value]) -> Self {
        let args_key = args.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join(",");
        Self { rule_name: rule_name.into(), args_key: Some(args_key) }
    }
}

/// Scoped per `with`-override frame: pushing a new frame starts a fresh
/// cache (spec.md §4.10 — a mocked rule's memoized answer must not leak
/// into, or be polluted by, the overridden evaluation).
#[derive(Debug, Default)]
pub struct MemoContext {
    frames: Vec<MemoFrame>,
}

#[derive(Debug, Default)]
struct MemoFrame {
    cache: HashMap<RuleKey, Value>,
    in_progress: HashSet<RuleKey>,
}

impl MemoContext {
    pub fn new() -> Self {
        Self { frames: vec![MemoFrame::default()] }
    }

    pub fn push_scope(&mut self) {
        self.frames.push(MemoFrame::default());
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
        if self.frames.is_empty() {
            self.frames.push(MemoFrame::default());
        }
    }

    fn top(&self) -> &MemoFrame {
        self.frames.last().expect("memo context always has at least one frame")
    }

    fn top_mut(&mut self) -> &mut MemoFrame {
        self.frames.last_mut().expect("memo context always has at least one frame")
    }

    pub fn get(&self, key: &RuleKey) -> Option<&Value> {
        self.top().cache.get(key)
    }

    pub fn insert(&mut self, key: RuleKey, value: Value) {
        self.top_mut().cache.insert(key, value);
    }

    pub fn is_in_progress(&self, key: &RuleKey) -> bool {
        self.top().in_progress.contains(key)
    }

    pub fn enter(&mut self, key: RuleKey) {
        self.top_mut().in_progress.insert(key);
    }

    pub fn leave(&mut self, key: &RuleKey) {
        self.top_mut().in_progress.remove(key);
    }
}
