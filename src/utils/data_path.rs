use crate::errors::PluginError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parses `a.b[0]["c d"]` style paths.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PluginError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(PluginError::template("Path must be a non-empty string"));
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    for ch in trimmed.chars() {
        match ch {
            '.' if !in_brackets => flush(&mut current, &mut segments),
            '[' if !in_brackets => {
                flush(&mut current, &mut segments);
                in_brackets = true;
            }
            ']' if in_brackets => {
                flush(&mut current, &mut segments);
                in_brackets = false;
            }
            _ => current.push(ch),
        }
    }
    if in_brackets {
        return Err(PluginError::template(format!(
            "Unclosed '[' in path '{}'",
            trimmed
        )));
    }
    flush(&mut current, &mut segments);
    Ok(segments)
}

fn flush(current: &mut String, segments: &mut Vec<PathSegment>) {
    let raw = current.trim();
    if !raw.is_empty() {
        let unquoted = raw.trim_matches('"').trim_matches('\'');
        let segment = match unquoted.parse::<usize>() {
            Ok(index) if unquoted == raw => PathSegment::Index(index),
            _ => PathSegment::Key(unquoted.to_string()),
        };
        segments.push(segment);
    }
    current.clear();
}

/// Looks up `path` inside `target`. A malformed path is an error; a path that
/// does not resolve is `None`.
pub fn lookup_path<'a>(target: &'a Value, path: &str) -> Result<Option<&'a Value>, PluginError> {
    let segments = parse_path(path)?;
    let mut current = target;
    for segment in segments.iter() {
        let next = match segment {
            PathSegment::Key(key) => current.get(key.as_str()),
            PathSegment::Index(index) => current.as_array().and_then(|arr| arr.get(*index)),
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// JSON truthiness: null, false, zero and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(num) => num.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
