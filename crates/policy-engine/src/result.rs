//! The public evaluation outcome (spec.md §3 "Result", §6, §8). Named
//! `EvalResult` here rather than `Result` to avoid colliding with
//! `std::result::Result`, which every fallible operation in this crate
//! already returns.

use std::collections::HashMap;

use crate::{error::Error, value::Value};

/// `value` + `success` + `bindings` + `errors` from one `evaluate` call.
/// `success` is always `!value.is_undefined()` (spec.md §3) — a query that
/// produced no result surfaces as `success = false` with an empty `value`
/// and, per spec.md §7, an empty `errors` vec unless something actually
/// failed along the way.
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub value: Value,
    pub success: bool,
    pub bindings: HashMap<String, Value>,
    pub errors: Vec<Error>,
}

impl EvalResult {
    pub fn new(value: Value, bindings: HashMap<String, Value>) -> Self {
        let success = !value.is_undefined();
        Self { value, success, bindings, errors: Vec::new() }
    }

    /// A query-literal value passed straight through (spec.md §6: "any
    /// other value becomes a Value literal") — never undefined unless the
    /// caller constructed it that way.
    pub fn literal(value: Value) -> Self {
        Self::new(value, HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_tracks_undefined() {
        assert!(!EvalResult::new(Value::Undefined, HashMap::new()).success);
        assert!(EvalResult::new(Value::Bool(false), HashMap::new()).success);
    }
}
