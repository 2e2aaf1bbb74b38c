use std::{
    fmt,
    hash::{Hash, Hasher},
};

use indexmap::{IndexMap, IndexSet};

/// Runtime number: either an integer or an IEEE double, preserved as whichever
/// form the source/document used. Equality and ordering between the two
/// forms are numeric (so `1 == 1.0`), matching how a Rego-like document model
/// treats "number" as one kind with two possible literal shapes.
///
/// No `#[derive(Serialize, Deserialize)]` here: `Value`'s own manual impls
/// (below) serialize a `Number` as a bare JSON number, not as a tagged
/// `Int`/`Float` wrapper, so this type never needs its own serde impl.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_integral(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.fract() == 0.0 && f.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&f),
        }
    }

    /// A key that makes cross-representation equality (`1 == 1.0`) consistent
    /// between `PartialEq`/`Eq` and `Hash`.
    fn canonical_key(self) -> NumKey {
        match self {
            Number::Int(i) => NumKey::Int(i),
            Number::Float(f) if self.is_integral() => NumKey::Int(f as i64),
            Number::Float(f) => NumKey::Float(f.to_bits()),
        }
    }

    pub fn checked_add(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() + other.as_f64())),
        }
    }

    pub fn checked_sub(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() - other.as_f64())),
        }
    }

    pub fn checked_mul(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() * other.as_f64())),
        }
    }

    pub fn checked_div(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if b != 0 && a % b == 0 => Some(Number::Int(a / b)),
            _ => {
                let denom = other.as_f64();
                if denom == 0.0 { None } else { Some(Number::Float(self.as_f64() / denom)) }
            }
        }
    }

    pub fn checked_rem(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if b != 0 => Some(Number::Int(a % b)),
            _ => {
                let denom = other.as_f64();
                if denom == 0.0 { None } else { Some(Number::Float(self.as_f64() % denom)) }
            }
        }
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Int(i) => Number::Int(-i),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
enum NumKey {
    Int(i64),
    Float(u64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}
impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_key().hash(state);
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
        }
    }
}

/// Tagged runtime value. `Undefined` is a distinguished sentinel distinct
/// from `Null` — it denotes "no result here" and is what an evaluation that
/// did not produce a value returns (see `Result::success`).
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(Box<str>),
    Array(Vec<Value>),
    Object(IndexMap<Box<str>, Value>),
    Set(IndexSet<Value>),
}

impl Value {
    pub fn string(s: impl Into<Box<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn int(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Only `false`, `null`, and `undefined` are falsy (spec.md §3).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null | Value::Undefined)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Set(_) => "set",
        }
    }

    /// Coerces an atomic value into the normalized string form used as an
    /// object key (spec.md §3 invariant 2). Composite values (array/object/
    /// set) are rendered via their canonical display form so the operation
    /// stays total; callers that want to forbid composite keys check
    /// `Value::is_atomic` first.
    pub fn normalize_key(&self) -> Box<str> {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string().into_boxed_str(),
            Value::Bool(b) => b.to_string().into_boxed_str(),
            Value::Null => "null".into(),
            Value::Undefined => "undefined".into(),
            other => other.to_string().into_boxed_str(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    /// Reference resolution step (spec.md §4.4 `fetch_reference`): arrays
    /// take an integer index, objects a normalized key, sets are not
    /// addressable, and indexing into `undefined` stays `undefined`.
    pub fn fetch(&self, key: &Value) -> Value {
        match self {
            Value::Array(items) => match key {
                Value::Number(n) if n.is_integral() => {
                    let idx = n.as_f64() as i64;
                    if idx >= 0 {
                        items.get(idx as usize).cloned().unwrap_or(Value::Undefined)
                    } else {
                        Value::Undefined
                    }
                }
                _ => Value::Undefined,
            },
            Value::Object(map) => map.get(key.normalize_key().as_ref()).cloned().unwrap_or(Value::Undefined),
            Value::Set(_) | Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Value::Undefined
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => n.hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(items) => {
                for item in items {
                    item.hash(state);
                }
            }
            Value::Object(map) => {
                // Order-independent: combine per-entry hashes so two objects
                // built in different key orders still hash equal.
                let mut acc: u64 = 0;
                for (k, v) in map {
                    let mut h = ahash::AHasher::default();
                    k.hash(&mut h);
                    v.hash(&mut h);
                    acc ^= h.finish();
                }
                acc.hash(state);
            }
            Value::Set(items) => {
                let mut acc: u64 = 0;
                for item in items {
                    let mut h = ahash::AHasher::default();
                    item.hash(&mut h);
                    acc ^= h.finish();
                }
                acc.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

/// Maps to/from plain JSON shapes — `null`/`true`/`false`/number/string/
/// array/object — rather than a tagged enum encoding, since callers (the
/// CLI's `input`/`data` document loading, JSON result output) expect the
/// document model `Value` is meant to mirror (spec.md §3), not this crate's
/// internal variant names. `Undefined` and `Set` have no literal JSON form:
/// `Undefined` serializes as `null` (it never appears in a document a
/// caller constructs), and `Set` serializes as a JSON array; neither is ever
/// produced by `deserialize` since JSON input can't distinguish them.
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::Set(items) => items.serialize(serializer),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a JSON value")
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
                Ok(Value::int(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
                match i64::try_from(v) {
                    Ok(i) => Ok(Value::int(i)),
                    Err(_) => Ok(Value::float(v as f64)),
                }
            }

            fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
                Ok(Value::float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Value, E> {
                Ok(Value::string(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Value, E> {
                Ok(Value::string(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut out = IndexMap::new();
                while let Some((k, v)) = map.next_entry::<String, Value>()? {
                    out.insert(k.into_boxed_str(), v);
                }
                Ok(Value::Object(out))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::int(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn equality_is_type_strict() {
        assert_ne!(Value::string("1"), Value::int(1));
        assert_eq!(Value::int(1), Value::float(1.0));
    }

    #[test]
    fn object_equality_ignores_key_order() {
        let mut a = IndexMap::new();
        a.insert("x".into(), Value::int(1));
        a.insert("y".into(), Value::int(2));
        let mut b = IndexMap::new();
        b.insert("y".into(), Value::int(2));
        b.insert("x".into(), Value::int(1));
        assert_eq!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn normalize_key_coerces_atoms() {
        assert_eq!(Value::int(1).normalize_key().as_ref(), "1");
        assert_eq!(Value::Bool(true).normalize_key().as_ref(), "true");
        assert_eq!(Value::Null.normalize_key().as_ref(), "null");
    }

    #[test]
    fn array_fetch_by_integer_index() {
        let arr = Value::array([Value::int(10), Value::int(20)]);
        assert_eq!(arr.fetch(&Value::int(1)), Value::int(20));
        assert_eq!(arr.fetch(&Value::int(5)), Value::Undefined);
    }

    #[test]
    fn serializes_as_plain_json_not_a_tagged_enum() {
        let mut obj = IndexMap::new();
        obj.insert("user".into(), Value::string("admin"));
        obj.insert("active".into(), Value::Bool(true));
        obj.insert("age".into(), Value::int(7));
        let value = Value::Object(obj);
        let json = serde_json::to_string(&value).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!({"user": "admin", "active": true, "age": 7}));
    }

    #[test]
    fn deserializes_plain_json_documents() {
        let json = r#"{"user": "admin", "roles": ["a", "b"], "count": 3, "ratio": 1.5, "ok": null}"#;
        let value: Value = serde_json::from_str(json).unwrap();
        let Value::Object(map) = value else { panic!("expected object") };
        assert_eq!(map.get("user"), Some(&Value::string("admin")));
        assert_eq!(map.get("roles"), Some(&Value::array([Value::string("a"), Value::string("b")])));
        assert_eq!(map.get("count"), Some(&Value::int(3)));
        assert_eq!(map.get("ratio"), Some(&Value::float(1.5)));
        assert_eq!(map.get("ok"), Some(&Value::Null));
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let mut obj = IndexMap::new();
        obj.insert("items".into(), Value::array([Value::int(1), Value::int(2)]));
        let original = Value::Object(obj);
        let json = serde_json::to_string(&original).unwrap();
        let round_tripped: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped, original);
    }
}
