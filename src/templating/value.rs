//! Dynamic values of the template interpreter.
//!
//! [`Value::Inert`] stands in for anything the renderer cannot know: unknown
//! variables, missing attributes, results of operations on other inert
//! values. It renders as an empty string, is falsy and converts to `0`, so a
//! recipe that references an unsupported helper still renders its
//! requirement lists.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Longest string `str * int` may produce.
const MAX_REPEAT_LEN: usize = 1 << 20;

/// Built-in callables of the variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Compiler,
    Stdlib,
    Cdt,
    PinSubpackage,
    PinCompatible,
    LoadSetupPyData,
    LoadFileRegex,
    LoadFileData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Inert,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Func(Builtin),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, Value::Inert)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Inert | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Func(_) => true,
        }
    }

    /// Integer conversion; anything unparsable is `0`.
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Float(f) => *f as i64,
            Value::Bool(b) => i64::from(*b),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64)).unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Elements when iterated by `for` or `join`.
    pub fn iter_items(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.clone(),
            Value::Map(map) => map.keys().cloned().map(Value::Str).collect(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            _ => Vec::new(),
        }
    }

    pub fn length(&self) -> Value {
        match self {
            Value::Str(s) => Value::Int(s.chars().count() as i64),
            Value::List(items) => Value::Int(items.len() as i64),
            Value::Map(map) => Value::Int(map.len() as i64),
            Value::Inert => Value::Inert,
            _ => Value::Int(0),
        }
    }

    /// `value.name` lookup.
    pub fn attr(&self, name: &str) -> Value {
        match self {
            Value::Map(map) => map.get(name).cloned().unwrap_or(Value::Inert),
            _ => Value::Inert,
        }
    }

    /// `value[index]` lookup with Python-style negative indices.
    pub fn index(&self, index: &Value) -> Value {
        match (self, index) {
            (Value::Map(map), key) => map.get(&key.to_string()).cloned().unwrap_or(Value::Inert),
            (Value::List(items), Value::Int(i)) => {
                resolve_index(*i, items.len()).and_then(|i| items.get(i).cloned()).unwrap_or(Value::Inert)
            }
            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                resolve_index(*i, chars.len())
                    .and_then(|i| chars.get(i))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Inert)
            }
            _ => Value::Inert,
        }
    }

    /// `value[start:end]`.
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Value {
        fn bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
            let clamp = |i: i64| -> usize {
                if i < 0 {
                    (len as i64 + i).max(0) as usize
                } else {
                    (i as usize).min(len)
                }
            };
            let s = start.map_or(0, clamp);
            let e = end.map_or(len, clamp);
            (s, e.max(s))
        }
        match self {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (a, b) = bounds(start, end, chars.len());
                Value::Str(chars[a..b].iter().collect())
            }
            Value::List(items) => {
                let (a, b) = bounds(start, end, items.len());
                Value::List(items[a..b].to_vec())
            }
            _ => Value::Inert,
        }
    }

    pub fn add(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
            (Value::List(a), Value::List(b)) => Value::List(a.iter().chain(b).cloned().collect()),
            _ => self.numeric(rhs, i64::checked_add, |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Value {
        self.numeric(rhs, i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let count = usize::try_from((*n).max(0)).unwrap_or(usize::MAX);
                match s.len().checked_mul(count) {
                    Some(len) if len <= MAX_REPEAT_LEN => Value::Str(s.repeat(count)),
                    _ => Value::Inert,
                }
            }
            _ => self.numeric(rhs, i64::checked_mul, |a, b| a * b),
        }
    }

    pub fn div(&self, rhs: &Value) -> Value {
        match (self.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) if b != 0.0 => Value::Float(a / b),
            _ => Value::Inert,
        }
    }

    pub fn floor_div(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => floor_div_int(*a, *b).map_or(Value::Inert, Value::Int),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) if b != 0.0 => Value::Float((a / b).floor()),
                _ => Value::Inert,
            },
        }
    }

    /// `%`: modulo on numbers, printf-style formatting on strings.
    pub fn rem(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Str(fmt), args) => format_percent(fmt, args),
            (Value::Int(a), Value::Int(b)) => floor_rem_int(*a, *b).map_or(Value::Inert, Value::Int),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) if b != 0.0 => Value::Float(a - b * (a / b).floor()),
                _ => Value::Inert,
            },
        }
    }

    pub fn neg(&self) -> Value {
        match self {
            Value::Int(i) => i.checked_neg().map_or(Value::Inert, Value::Int),
            Value::Float(f) => Value::Float(-f),
            _ => Value::Inert,
        }
    }

    /// `==`; `None` when either side is inert.
    pub fn equals(&self, rhs: &Value) -> Option<bool> {
        match (self, rhs) {
            (Value::Inert, _) | (_, Value::Inert) => None,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                Some(self.to_float() == rhs.to_float())
            }
            _ => Some(self == rhs),
        }
    }

    /// Ordering for `<` and friends; `None` when the operands are not comparable.
    pub fn compare(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// `needle in self`; `None` when the container is not searchable.
    pub fn contains(&self, needle: &Value) -> Option<bool> {
        match (self, needle) {
            (Value::Str(hay), Value::Str(n)) => Some(hay.contains(n.as_str())),
            (Value::List(items), n) if !n.is_inert() => {
                Some(items.iter().any(|item| item.equals(n) == Some(true)))
            }
            (Value::Map(map), Value::Str(key)) => Some(map.contains_key(key)),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    fn numeric(
        &self,
        rhs: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b).map_or(Value::Inert, Value::Int),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => Value::Float(float_op(a, b)),
                _ => Value::Inert,
            },
        }
    }

    fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

/// Python-style `//`; `None` on a zero divisor or overflow.
fn floor_div_int(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) { q.checked_sub(1) } else { Some(q) }
}

/// Python-style `%`, taking the sign of the divisor.
fn floor_rem_int(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) { r.checked_add(b) } else { Some(r) }
}

fn resolve_index(i: i64, len: usize) -> Option<usize> {
    let idx = if i < 0 { len as i64 + i } else { i };
    (0..len as i64).contains(&idx).then_some(idx as usize)
}

fn format_percent(fmt: &str, args: &Value) -> Value {
    let args = match args {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    };
    let mut args = args.into_iter();
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => out.push_str(&args.next().unwrap_or(Value::Inert).to_string()),
            Some('d' | 'i') => out.push_str(&args.next().unwrap_or(Value::Inert).to_int().to_string()),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Value::Str(out)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Inert | Value::Func(_) => Ok(()),
            Value::Null => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            Value::Map(map) => {
                let inner: Vec<String> = map.iter().map(|(k, v)| format!("'{k}': {}", v.repr())).collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
