//! Filters, tests and string/map methods available to recipe templates.
//!
//! Unknown filters pass their input through unchanged and unknown methods
//! yield [`Value::Inert`]; neither can fail a render.

use super::value::Value;

/// Apply `value | name(args)`.
pub fn apply_filter(name: &str, value: Value, args: &[Value]) -> Value {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Inert);
    match name {
        "lower" => map_str(value, |s| s.to_lowercase()),
        "upper" => map_str(value, |s| s.to_uppercase()),
        "trim" => map_str(value, |s| s.trim().to_string()),
        "replace" => {
            let (from, to) = (arg(0).to_string(), arg(1).to_string());
            map_str(value, |s| s.replace(&from, &to))
        }
        "int" => Value::Int(value.to_int()),
        "float" => Value::Float(value.to_float()),
        "string" => Value::Str(value.to_string()),
        "default" | "d" => {
            let use_default = value.is_inert() || (arg(1).is_truthy() && !value.is_truthy());
            if use_default {
                args.first().cloned().unwrap_or_else(|| Value::str(""))
            } else {
                value
            }
        }
        "length" | "count" => value.length(),
        "first" => value.iter_items().into_iter().next().unwrap_or(Value::Inert),
        "last" => value.iter_items().pop().unwrap_or(Value::Inert),
        "join" => join(&value, &args.first().map(ToString::to_string).unwrap_or_default()),
        "list" => match value {
            Value::Inert => Value::Inert,
            other => Value::List(other.iter_items()),
        },
        _ => value,
    }
}

/// Evaluate `value is name`.
pub fn apply_test(name: &str, value: &Value) -> bool {
    match name {
        "defined" => !value.is_inert(),
        "undefined" => value.is_inert(),
        "none" => matches!(value, Value::Null),
        "string" => matches!(value, Value::Str(_)),
        "number" => matches!(value, Value::Int(_) | Value::Float(_)),
        "mapping" => matches!(value, Value::Map(_)),
        "iterable" => matches!(value, Value::List(_) | Value::Map(_) | Value::Str(_)),
        _ => false,
    }
}

/// Invoke `receiver.name(args)`.
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Value {
    let arg_str = |i: usize| args.get(i).map(ToString::to_string);
    match (receiver, name) {
        (Value::Str(s), "lower") => Value::Str(s.to_lowercase()),
        (Value::Str(s), "upper") => Value::Str(s.to_uppercase()),
        (Value::Str(s), "strip") => Value::Str(strip(s, arg_str(0).as_deref(), true, true)),
        (Value::Str(s), "lstrip") => Value::Str(strip(s, arg_str(0).as_deref(), true, false)),
        (Value::Str(s), "rstrip") => Value::Str(strip(s, arg_str(0).as_deref(), false, true)),
        (Value::Str(s), "replace") => match (arg_str(0), arg_str(1)) {
            (Some(from), Some(to)) => Value::Str(s.replace(&from, &to)),
            _ => Value::Inert,
        },
        (Value::Str(s), "split") => {
            let parts: Vec<Value> = match arg_str(0) {
                Some(sep) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
                _ => s.split_whitespace().map(Value::from).collect(),
            };
            Value::List(parts)
        }
        (Value::Str(s), "startswith") => arg_str(0).map_or(Value::Inert, |p| Value::Bool(s.starts_with(&p))),
        (Value::Str(s), "endswith") => arg_str(0).map_or(Value::Inert, |p| Value::Bool(s.ends_with(&p))),
        (Value::Str(sep), "join") => args.first().map_or(Value::Inert, |items| join(items, sep)),
        (Value::Str(s), "format") => {
            let mut out = s.clone();
            for value in args {
                if let Some(pos) = out.find("{}") {
                    out.replace_range(pos..pos + 2, &value.to_string());
                }
            }
            Value::Str(out)
        }
        (Value::Map(map), "get") => {
            let key = arg_str(0).unwrap_or_default();
            map.get(&key).cloned().unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Null))
        }
        (Value::Map(map), "keys") => Value::List(map.keys().cloned().map(Value::Str).collect()),
        (Value::Map(map), "values") => Value::List(map.values().cloned().collect()),
        (Value::Map(map), "items") => Value::List(
            map.iter()
                .map(|(k, v)| Value::List(vec![Value::Str(k.clone()), v.clone()]))
                .collect(),
        ),
        _ => Value::Inert,
    }
}

fn map_str(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Str(s) => Value::Str(f(&s)),
        Value::Inert => Value::Inert,
        other => Value::Str(f(&other.to_string())),
    }
}

fn join(items: &Value, sep: &str) -> Value {
    match items {
        Value::Inert => Value::Inert,
        other => Value::Str(
            other.iter_items().iter().map(ToString::to_string).collect::<Vec<_>>().join(sep),
        ),
    }
}

fn strip(s: &str, chars: Option<&str>, left: bool, right: bool) -> String {
    let matches = |c: char| chars.map_or(c.is_whitespace(), |set| set.contains(c));
    let mut out = s;
    if left {
        out = out.trim_start_matches(matches);
    }
    if right {
        out = out.trim_end_matches(matches);
    }
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        assert_eq!(apply_filter("upper", Value::str("abc"), &[]), Value::str("ABC"));
        assert_eq!(apply_filter("int", Value::str("12"), &[]), Value::Int(12));
        assert_eq!(apply_filter("int", Value::Inert, &[]), Value::Int(0));
        assert_eq!(apply_filter("default", Value::Inert, &[Value::str("x")]), Value::str("x"));
        assert_eq!(apply_filter("d", Value::str("set"), &[Value::str("x")]), Value::str("set"));
        assert_eq!(apply_filter("unknown_filter", Value::Int(3), &[]), Value::Int(3));
        assert_eq!(apply_filter("lower", Value::Inert, &[]), Value::Inert);
        let list = Value::List(vec![Value::str("a"), Value::str("b")]);
        assert_eq!(apply_filter("join", list.clone(), &[Value::str(",")]), Value::str("a,b"));
        assert_eq!(apply_filter("last", list, &[]), Value::str("b"));
    }

    #[test]
    fn test_methods() {
        let s = Value::str("  py-lief  ");
        assert_eq!(call_method(&s, "strip", &[]), Value::str("py-lief"));
        assert_eq!(call_method(&Value::str("xxaxx"), "strip", &[Value::str("x")]), Value::str("a"));
        assert_eq!(
            call_method(&Value::str("a.b"), "split", &[Value::str(".")]),
            Value::List(vec![Value::str("a"), Value::str("b")])
        );
        assert_eq!(
            call_method(&Value::str("{}-{}"), "format", &[Value::str("a"), Value::Int(1)]),
            Value::str("a-1")
        );
        assert_eq!(call_method(&Value::Int(1), "lower", &[]), Value::Inert);
    }

    #[test]
    fn test_tests() {
        assert!(apply_test("undefined", &Value::Inert));
        assert!(apply_test("none", &Value::Null));
        assert!(!apply_test("defined", &Value::Inert));
        assert!(!apply_test("whatever", &Value::Int(1)));
    }
}
