use serde_json::{Map, Value};
use url::Url;

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Endpoint path and decoded query of a URL the agent passed to a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    pub endpoint: String,
    pub parameters: Map<String, Value>,
}

/// Everything before the first `?`, trimmed.
pub fn split_endpoint(raw: &str) -> &str {
    raw.split('?').next().unwrap_or(raw).trim()
}

/// Decodes a query string; one value stays a scalar, repeated keys become an array.
/// Blank values are dropped.
pub fn decode_query(query: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        if value.is_empty() {
            continue;
        }
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }

    let mut out = Map::new();
    for (key, mut values) in grouped {
        let value = if values.len() == 1 {
            Value::String(values.remove(0))
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        out.insert(key, value);
    }
    out
}

/// `None` unless `raw` is an absolute http(s) URL.
pub fn parse_call_target(raw: &str) -> Option<CallTarget> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return None;
    }
    Some(CallTarget {
        endpoint: split_endpoint(raw).to_string(),
        parameters: decode_query(parsed.query().unwrap_or("")),
    })
}
