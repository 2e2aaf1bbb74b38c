//! A small, explicitly non-exhaustive builtin set: just enough to exercise
//! the registry contract and the seed scenarios in spec.md §8. The real
//! Rego/OPA builtin library is out of scope (spec.md Non-goals).

use std::cmp::Ordering;

use super::BuiltinRegistry;
use crate::{error::Error, value::Number, value::Value};

pub fn register_all(registry: &mut BuiltinRegistry) {
    registry.register("count", 1, count);
    registry.register("sum", 1, sum);
    registry.register("max", 1, max);
    registry.register("min", 1, min);
    registry.register("sort", 1, sort);
    registry.register("contains", 2, contains);
    registry.register("startswith", 2, startswith);
    registry.register("endswith", 2, endswith);
    registry.register("upper", 1, upper);
    registry.register("lower", 1, lower);
    registry.register("trim", 1, trim);
    registry.register("abs", 1, abs);
    registry.register("type_name", 1, type_name);
    registry.register("to_number", 1, to_number);
    registry.register("concat", 2, concat);
    registry.register("object.get", 3, object_get);
    registry.register("object.union", 2, object_union);
    registry.register("array.slice", 3, array_slice);
}

fn arity_error(name: &str, expected: usize, got: usize) -> Error {
    Error::evaluation(format!("{name}: expected {expected} argument(s), got {got}"))
}

fn type_error(name: &str, detail: impl std::fmt::Display) -> Error {
    Error::evaluation(format!("{name}: {detail}"))
}

fn as_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, Error> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_error(name, format!("expected string, got {}", other.type_name()))),
    }
}

fn as_number(name: &str, value: &Value) -> Result<Number, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(name, format!("expected number, got {}", other.type_name()))),
    }
}

fn count(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("count", 1, args.len()));
    }
    let n = match &args[0] {
        Value::Array(items) => items.len(),
        Value::Set(items) => items.len(),
        Value::Object(items) => items.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(type_error("count", format!("expected a collection, got {}", other.type_name()))),
    };
    Ok(Value::int(n as i64))
}

fn iter_values(name: &str, value: &Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Set(items) => Ok(items.iter().cloned().collect()),
        other => Err(type_error(name, format!("expected array or set, got {}", other.type_name()))),
    }
}

fn sum(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("sum", 1, args.len()));
    }
    let mut total = Number::Int(0);
    for item in iter_values("sum", &args[0])? {
        let n = as_number("sum", &item)?;
        total = total.checked_add(n).ok_or_else(|| type_error("sum", "overflow"))?;
    }
    Ok(Value::Number(total))
}

fn compare_values(name: &str, a: &Value, b: &Value) -> Result<Ordering, Error> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.partial_cmp(y).ok_or_else(|| type_error(name, "cannot compare NaN"))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(type_error(name, "elements must be all numbers or all strings")),
    }
}

fn max(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("max", 1, args.len()));
    }
    let items = iter_values("max", &args[0])?;
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(cur) => if compare_values("max", &item, &cur)? == Ordering::Greater { item } else { cur },
        });
    }
    best.ok_or_else(|| type_error("max", "empty collection"))
}

fn min(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("min", 1, args.len()));
    }
    let items = iter_values("min", &args[0])?;
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(cur) => if compare_values("min", &item, &cur)? == Ordering::Less { item } else { cur },
        });
    }
    best.ok_or_else(|| type_error("min", "empty collection"))
}

fn sort(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("sort", 1, args.len()));
    }
    let mut items = iter_values("sort", &args[0])?;
    let mut err = None;
    items.sort_by(|a, b| match compare_values("sort", a, b) {
        Ok(ord) => ord,
        Err(e) => {
            err.get_or_insert(e);
            Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::array(items))
}

fn contains(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(arity_error("contains", 2, args.len()));
    }
    let haystack = as_string("contains", &args[0])?;
    let needle = as_string("contains", &args[1])?;
    Ok(Value::Bool(haystack.contains(needle)))
}

fn startswith(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(arity_error("startswith", 2, args.len()));
    }
    Ok(Value::Bool(as_string("startswith", &args[0])?.starts_with(as_string("startswith", &args[1])?)))
}

fn endswith(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(arity_error("endswith", 2, args.len()));
    }
    Ok(Value::Bool(as_string("endswith", &args[0])?.ends_with(as_string("endswith", &args[1])?)))
}

fn upper(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("upper", 1, args.len()));
    }
    Ok(Value::string(as_string("upper", &args[0])?.to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("lower", 1, args.len()));
    }
    Ok(Value::string(as_string("lower", &args[0])?.to_lowercase()))
}

fn trim(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("trim", 1, args.len()));
    }
    Ok(Value::string(as_string("trim", &args[0])?.trim()))
}

fn abs(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("abs", 1, args.len()));
    }
    let n = as_number("abs", &args[0])?;
    Ok(Value::Number(match n {
        Number::Int(i) => Number::Int(i.abs()),
        Number::Float(f) => Number::Float(f.abs()),
    }))
}

fn type_name(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("type_name", 1, args.len()));
    }
    Ok(Value::string(args[0].type_name()))
}

fn to_number(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(arity_error("to_number", 1, args.len()));
    }
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::int(i))
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Ok(Value::float(f))
            } else {
                Err(type_error("to_number", format!("cannot parse `{s}` as a number")))
            }
        }
        other => Err(type_error("to_number", format!("expected string or number, got {}", other.type_name()))),
    }
}

fn concat(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(arity_error("concat", 2, args.len()));
    }
    let delim = as_string("concat", &args[0])?;
    let items = iter_values("concat", &args[1])?;
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(as_string("concat", &item)?.to_string());
    }
    Ok(Value::string(parts.join(delim)))
}

fn object_get(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 3 {
        return Err(arity_error("object.get", 3, args.len()));
    }
    let fetched = args[0].fetch(&args[1]);
    Ok(if fetched.is_undefined() { args[2].clone() } else { fetched })
}

fn object_union(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(arity_error("object.union", 2, args.len()));
    }
    let (Value::Object(a), Value::Object(b)) = (&args[0], &args[1]) else {
        return Err(type_error("object.union", "both arguments must be objects"));
    };
    let mut merged = a.clone();
    for (k, v) in b {
        merged.insert(k.clone(), v.clone());
    }
    Ok(Value::Object(merged))
}

fn array_slice(args: &[Value]) -> Result<Value, Error> {
    if args.len() != 3 {
        return Err(arity_error("array.slice", 3, args.len()));
    }
    let Value::Array(items) = &args[0] else {
        return Err(type_error("array.slice", "first argument must be an array"));
    };
    let start = as_number("array.slice", &args[1])?.as_f64().max(0.0) as usize;
    let stop = as_number("array.slice", &args[2])?.as_f64().max(0.0) as usize;
    let start = start.min(items.len());
    let stop = stop.min(items.len()).max(start);
    Ok(Value::array(items[start..stop].to_vec()))
}
