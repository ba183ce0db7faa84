//! Pipe-function registry and the built-in value transforms.
//!
//! Pipes are chainable transforms applied inside templates
//! (`{{ bar | toUpperCase | truncate(10) }}`). Each receives the running
//! value plus the literal arguments written in the template. The built-in
//! set reproduces the established behavior of the `.lang` format, including
//! a few historical quirks in the numeric clamping functions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::error::PipeError;
use crate::types::{format_number, Primitive, Value};

/// Pipe function signature: the running value plus the pipe's literal
/// arguments, producing the next value in the chain.
pub type PipeFn = fn(&Value, &[Primitive]) -> Result<Value, PipeError>;

/// Registry of named pipe functions, pre-seeded with the built-ins.
#[derive(Debug)]
pub struct PipeRegistry {
    pipes: HashMap<String, PipeFn>,
}

impl PipeRegistry {
    /// Create a registry containing the built-in pipes.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            pipes: HashMap::new(),
        };

        registry.insert("default", pipe_default);
        registry.insert("toUpperCase", pipe_to_upper_case);
        registry.insert("toLowerCase", pipe_to_lower_case);
        registry.insert("capitalize", pipe_capitalize);
        registry.insert("repeat", pipe_repeat);
        registry.insert("padStart", pipe_pad_start);
        registry.insert("padEnd", pipe_pad_end);
        registry.insert("trim", pipe_trim);
        registry.insert("trimLeft", pipe_trim_left);
        registry.insert("trimRight", pipe_trim_right);
        registry.insert("concat", pipe_concat);
        registry.insert("slice", pipe_slice);
        registry.insert("prepend", pipe_prepend);
        registry.insert("split", pipe_split);
        registry.insert("length", pipe_length);
        registry.insert("replace", pipe_replace);
        registry.insert("replaceOnce", pipe_replace_once);
        registry.insert("truncate", pipe_truncate);
        registry.insert("normalizeWhitespace", pipe_normalize_whitespace);
        registry.insert("max", pipe_max);
        registry.insert("min", pipe_min);
        registry.insert("add", pipe_add);
        registry.insert("subtract", pipe_subtract);
        registry.insert("multiplyBy", pipe_multiply_by);
        registry.insert("divideBy", pipe_divide_by);
        registry.insert("floor", pipe_floor);
        registry.insert("ceil", pipe_ceil);
        registry.insert("clamp", pipe_clamp);
        registry.insert("first", pipe_first);
        registry.insert("join", pipe_join);
        registry.insert("unique", pipe_unique);
        registry.insert("pick", pipe_pick);
        registry.insert("select", pipe_select);
        registry.insert("where", pipe_where);
        registry.insert("inspect", pipe_inspect);

        registry
    }

    /// Whether a pipe with the given identifier is registered.
    pub fn has(&self, ident: &str) -> bool {
        self.pipes.contains_key(ident)
    }

    /// Look up a pipe function by identifier.
    pub fn get(&self, ident: &str) -> Option<PipeFn> {
        self.pipes.get(ident).copied()
    }

    /// Register a pipe function, replacing any existing one with the same
    /// identifier.
    pub fn insert(&mut self, ident: &str, pipe: PipeFn) {
        self.pipes.insert(ident.to_string(), pipe);
    }

    /// Registered identifiers, for suggestion computation.
    pub(crate) fn idents(&self) -> Vec<String> {
        self.pipes.keys().cloned().collect()
    }
}

impl Default for PipeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ---------------------------------------------------------------------------
// Argument and value extraction helpers
// ---------------------------------------------------------------------------

fn expect_string<'v>(pipe: &str, value: &'v Value) -> Result<&'v str, PipeError> {
    value
        .as_str()
        .ok_or_else(|| PipeError::new(format!("cannot apply '{pipe}' to {}", value.type_of())))
}

fn expect_number(pipe: &str, value: &Value) -> Result<f64, PipeError> {
    value
        .as_number()
        .ok_or_else(|| PipeError::new(format!("cannot apply '{pipe}' to {}", value.type_of())))
}

fn expect_array<'v>(pipe: &str, value: &'v Value) -> Result<&'v [Value], PipeError> {
    value
        .as_array()
        .ok_or_else(|| PipeError::new(format!("cannot apply '{pipe}' to {}", value.type_of())))
}

fn number_arg(pipe: &str, args: &[Primitive], index: usize) -> Result<f64, PipeError> {
    match args.get(index) {
        Some(Primitive::Number(n)) => Ok(*n),
        Some(_) => Err(PipeError::new(format!(
            "'{pipe}' expects a number for argument {}",
            index + 1
        ))),
        None => Err(PipeError::new(format!(
            "'{pipe}' is missing required argument {}",
            index + 1
        ))),
    }
}

fn string_arg<'a>(pipe: &str, args: &'a [Primitive], index: usize) -> Result<&'a str, PipeError> {
    match args.get(index) {
        Some(Primitive::String(s)) => Ok(s),
        Some(_) => Err(PipeError::new(format!(
            "'{pipe}' expects a string for argument {}",
            index + 1
        ))),
        None => Err(PipeError::new(format!(
            "'{pipe}' is missing required argument {}",
            index + 1
        ))),
    }
}

fn opt_string_arg<'a>(args: &'a [Primitive], index: usize, default: &'a str) -> &'a str {
    match args.get(index) {
        Some(Primitive::String(s)) => s,
        _ => default,
    }
}

fn count_arg(pipe: &str, args: &[Primitive], index: usize) -> Result<usize, PipeError> {
    let n = number_arg(pipe, args, index)?;
    if n < 0.0 || !n.is_finite() {
        return Err(PipeError::new(format!("'{pipe}' expects a non-negative count")));
    }
    Ok(n as usize)
}

/// Resolve optional start/end indices against a length, with negative
/// indices counted from the end.
fn slice_bounds(len: usize, start: Option<f64>, end: Option<f64>) -> (usize, usize) {
    let len = len as i64;
    let resolve = |v: f64| -> i64 {
        if v.is_nan() {
            return 0;
        }
        let v = v as i64;
        if v < 0 { (len + v).max(0) } else { v.min(len) }
    };
    let s = start.map_or(0, resolve);
    let e = end.map_or(len, resolve).max(s);
    (s as usize, e as usize)
}

fn item_field(item: &Value, key: &str) -> Value {
    item.as_object()
        .and_then(|map| map.get(key))
        .cloned()
        .unwrap_or(Value::Undefined)
}

// ---------------------------------------------------------------------------
// Built-in pipes
// ---------------------------------------------------------------------------

fn pipe_default(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    if value.is_undefined() {
        Ok(args.first().map(Primitive::to_value).unwrap_or_default())
    } else {
        Ok(value.clone())
    }
}

fn pipe_to_upper_case(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::String(expect_string("toUpperCase", value)?.to_uppercase()))
}

fn pipe_to_lower_case(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::String(expect_string("toLowerCase", value)?.to_lowercase()))
}

fn pipe_capitalize(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("capitalize", value)?;
    let mut graphemes = s.graphemes(true);
    match graphemes.next() {
        Some(first) => Ok(Value::String(first.to_uppercase() + graphemes.as_str())),
        None => Err(PipeError::new("cannot apply 'capitalize' to an empty string")),
    }
}

fn pipe_repeat(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("repeat", value)?;
    let n = count_arg("repeat", args, 0)?;
    Ok(Value::String(s.repeat(n)))
}

fn pad(s: &str, target: usize, padding: &str, at_start: bool) -> String {
    let len = s.chars().count();
    if target <= len || padding.is_empty() {
        return s.to_string();
    }
    let fill: String = padding.chars().cycle().take(target - len).collect();
    if at_start {
        fill + s
    } else {
        s.to_string() + &fill
    }
}

fn pipe_pad_start(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("padStart", value)?;
    let target = count_arg("padStart", args, 0)?;
    let padding = opt_string_arg(args, 1, " ");
    Ok(Value::String(pad(s, target, padding, true)))
}

fn pipe_pad_end(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("padEnd", value)?;
    let target = count_arg("padEnd", args, 0)?;
    let padding = opt_string_arg(args, 1, " ");
    Ok(Value::String(pad(s, target, padding, false)))
}

fn pipe_trim(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::String(expect_string("trim", value)?.trim().to_string()))
}

fn pipe_trim_left(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::String(expect_string("trimLeft", value)?.trim_start().to_string()))
}

fn pipe_trim_right(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::String(expect_string("trimRight", value)?.trim_end().to_string()))
}

fn pipe_concat(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let mut result = expect_string("concat", value)?.to_string();
    for arg in args {
        result.push_str(&arg.to_string());
    }
    Ok(Value::String(result))
}

fn pipe_slice(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let start = match args.first() {
        Some(Primitive::Number(n)) => Some(*n),
        _ => None,
    };
    let end = match args.get(1) {
        Some(Primitive::Number(n)) => Some(*n),
        _ => None,
    };

    match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = slice_bounds(chars.len(), start, end);
            Ok(Value::String(chars[from..to].iter().collect()))
        }
        Value::Array(items) => {
            let (from, to) = slice_bounds(items.len(), start, end);
            Ok(Value::Array(items[from..to].to_vec()))
        }
        other => Err(PipeError::new(format!(
            "cannot apply 'slice' to {}",
            other.type_of()
        ))),
    }
}

fn pipe_prepend(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("prepend", value)?;
    let prefix = string_arg("prepend", args, 0)?;
    Ok(Value::String(format!("{prefix}{s}")))
}

fn pipe_split(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("split", value)?;
    let separator = string_arg("split", args, 0)?;
    let parts = if separator.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(separator)
            .map(|part| Value::String(part.to_string()))
            .collect()
    };
    Ok(Value::Array(parts))
}

fn pipe_length(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    match value {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        other => Err(PipeError::new(format!(
            "cannot apply 'length' to {}",
            other.type_of()
        ))),
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, PipeError> {
    Regex::new(pattern).map_err(|e| PipeError::new(format!("invalid pattern '{pattern}': {e}")))
}

fn pipe_replace(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("replace", value)?;
    let pattern = compile_pattern(string_arg("replace", args, 0)?)?;
    let replacement = string_arg("replace", args, 1)?;
    Ok(Value::String(pattern.replace_all(s, replacement).into_owned()))
}

fn pipe_replace_once(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("replaceOnce", value)?;
    let pattern = compile_pattern(string_arg("replaceOnce", args, 0)?)?;
    let replacement = string_arg("replaceOnce", args, 1)?;
    Ok(Value::String(pattern.replace(s, replacement).into_owned()))
}

fn pipe_truncate(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("truncate", value)?;
    let len = count_arg("truncate", args, 0)?;
    let fill = opt_string_arg(args, 1, "...");

    let chars: Vec<char> = s.chars().collect();
    if len >= chars.len() {
        return Ok(Value::String(s.to_string()));
    }
    let keep = len.saturating_sub(fill.chars().count());
    let mut result: String = chars[..keep].iter().collect();
    result.push_str(fill);
    Ok(Value::String(result))
}

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern compiles"));

fn pipe_normalize_whitespace(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    let s = expect_string("normalizeWhitespace", value)?;
    Ok(Value::String(
        WHITESPACE_RUN.replace_all(s, " ").trim().to_string(),
    ))
}

// The numeric clamping trio reproduces the source format's established
// behavior verbatim: `max` caps at the bound, `min` floors at the bound,
// and `clamp` combines the bounds in its historically-swapped formula.

fn pipe_max(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let v = expect_number("max", value)?;
    let bound = number_arg("max", args, 0)?;
    Ok(Value::Number(v.min(bound)))
}

fn pipe_min(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let v = expect_number("min", value)?;
    let bound = number_arg("min", args, 0)?;
    Ok(Value::Number(v.max(bound)))
}

fn pipe_add(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(
        expect_number("add", value)? + number_arg("add", args, 0)?,
    ))
}

fn pipe_subtract(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(
        expect_number("subtract", value)? - number_arg("subtract", args, 0)?,
    ))
}

fn pipe_multiply_by(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(
        expect_number("multiplyBy", value)? * number_arg("multiplyBy", args, 0)?,
    ))
}

fn pipe_divide_by(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(
        expect_number("divideBy", value)? / number_arg("divideBy", args, 0)?,
    ))
}

fn pipe_floor(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(expect_number("floor", value)?.floor()))
}

fn pipe_ceil(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    Ok(Value::Number(expect_number("ceil", value)?.ceil()))
}

fn pipe_clamp(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let v = expect_number("clamp", value)?;
    let low = number_arg("clamp", args, 0)?;
    let high = number_arg("clamp", args, 1)?;
    let result = if low < high {
        f64::max(high, f64::min(low, v))
    } else {
        f64::min(low, f64::max(high, v))
    };
    Ok(Value::Number(result))
}

fn pipe_first(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    let items = expect_array("first", value)?;
    Ok(items.first().cloned().unwrap_or(Value::Undefined))
}

fn pipe_join(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let items = expect_array("join", value)?;
    let separator = opt_string_arg(args, 0, ",");
    let rendered: Vec<String> = items
        .iter()
        .map(|item| {
            if item.is_undefined() {
                String::new()
            } else {
                item.to_string()
            }
        })
        .collect();
    Ok(Value::String(rendered.join(separator)))
}

fn pipe_unique(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
    let items = expect_array("unique", value)?;
    let mut result: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !result.iter().any(|seen| seen.strict_eq(item)) {
            result.push(item.clone());
        }
    }
    Ok(Value::Array(result))
}

fn pipe_pick(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let key = string_arg("pick", args, 0)?;
    match value.as_object() {
        Some(map) => Ok(map.get(key).cloned().unwrap_or(Value::Undefined)),
        None => Err(PipeError::new(format!(
            "cannot apply 'pick' to {}",
            value.type_of()
        ))),
    }
}

fn pipe_select(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let items = expect_array("select", value)?;
    let key = string_arg("select", args, 0)?;
    Ok(Value::Array(
        items.iter().map(|item| item_field(item, key)).collect(),
    ))
}

fn pipe_where(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let items = expect_array("where", value)?;
    let key = string_arg("where", args, 0)?;
    let expected = args.get(1).map(Primitive::to_value);

    let filtered = items
        .iter()
        .filter(|item| {
            let field = item_field(item, key);
            match &expected {
                Some(expected) => field.strict_eq(expected),
                None => field.is_truthy(),
            }
        })
        .cloned()
        .collect();
    Ok(Value::Array(filtered))
}

fn pipe_inspect(value: &Value, args: &[Primitive]) -> Result<Value, PipeError> {
    let depth = match args.first() {
        Some(Primitive::Number(n)) => *n as i64,
        _ => 1,
    };
    Ok(Value::String(render_inspect(value, depth)))
}

/// Render a value in inspect notation: quoted strings, bracketed arrays and
/// braced objects, nesting cut off at `depth`.
fn render_inspect(value: &Value, depth: i64) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => format!("'{s}'"),
        Value::Array(items) => {
            if depth < 0 {
                return "[Array]".to_string();
            }
            if items.is_empty() {
                return "[]".to_string();
            }
            let inner: Vec<String> = items
                .iter()
                .map(|item| render_inspect(item, depth - 1))
                .collect();
            format!("[ {} ]", inner.join(", "))
        }
        Value::Object(map) => {
            if depth < 0 {
                return "[Object]".to_string();
            }
            if map.is_empty() {
                return "{}".to_string();
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .iter()
                .map(|key| {
                    let field = map.get(*key).cloned().unwrap_or(Value::Undefined);
                    format!("{key}: {}", render_inspect(&field, depth - 1))
                })
                .collect();
            format!("{{ {} }}", inner.join(", "))
        }
    }
}
