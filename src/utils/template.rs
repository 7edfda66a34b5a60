//! Response templates: `{{ json_data.path }}` substitution plus
//! `{% for x in path %}..{% endfor %}` and `{% if path %}..{% else %}..{% endif %}` blocks.
//! The decoded payload is bound to `json_data`. Paths that do not resolve render
//! as empty text, iterate as empty lists and test falsy; only malformed
//! templates are errors.

use crate::errors::PluginError;
use crate::utils::data_path::{is_truthy, lookup_path};
use serde_json::{Map, Value};

pub const PAYLOAD_BINDING: &str = "json_data";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Expr(String),
    Tag(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Expr(String),
    For {
        binding: String,
        path: String,
        body: Vec<Node>,
    },
    If {
        path: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

fn tokenize(template: &str) -> Result<Vec<Token>, PluginError> {
    let mut tokens = Vec::new();
    let mut rest = template;
    loop {
        let next = match (rest.find("{{"), rest.find("{%")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let Some(start) = next else {
            if !rest.is_empty() {
                tokens.push(Token::Text(rest.to_string()));
            }
            return Ok(tokens);
        };
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }
        let is_expr = rest[start..].starts_with("{{");
        let close = if is_expr { "}}" } else { "%}" };
        let tail = &rest[start + 2..];
        let end = tail.find(close).ok_or_else(|| {
            PluginError::template(format!("Unterminated '{}' in template", &rest[start..start + 2]))
        })?;
        let inner = tail[..end].trim().to_string();
        tokens.push(if is_expr {
            Token::Expr(inner)
        } else {
            Token::Tag(inner)
        });
        rest = &tail[end + 2..];
    }
}

/// Parses until one of `stops` is seen; returns the nodes and the stop tag that ended them.
fn parse_nodes(
    tokens: &mut std::vec::IntoIter<Token>,
    stops: &[&str],
) -> Result<(Vec<Node>, Option<String>), PluginError> {
    let mut nodes = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Text(text)),
            Token::Expr(expr) => nodes.push(Node::Expr(expr)),
            Token::Tag(tag) => {
                if stops.contains(&tag.as_str()) {
                    return Ok((nodes, Some(tag)));
                }
                nodes.push(parse_block(&tag, tokens)?);
            }
        }
    }
    if stops.is_empty() {
        Ok((nodes, None))
    } else {
        Err(PluginError::template(format!(
            "Missing '{{% {} %}}' in template",
            stops[stops.len() - 1]
        )))
    }
}

fn parse_block(
    tag: &str,
    tokens: &mut std::vec::IntoIter<Token>,
) -> Result<Node, PluginError> {
    let words: Vec<&str> = tag.split_whitespace().collect();
    match words.as_slice() {
        ["for", binding, "in", path] => {
            let (body, _) = parse_nodes(tokens, &["endfor"])?;
            Ok(Node::For {
                binding: binding.to_string(),
                path: path.to_string(),
                body,
            })
        }
        ["if", path] => {
            let (then, stop) = parse_nodes(tokens, &["else", "endif"])?;
            let otherwise = if stop.as_deref() == Some("else") {
                parse_nodes(tokens, &["endif"])?.0
            } else {
                Vec::new()
            };
            Ok(Node::If {
                path: path.to_string(),
                then,
                otherwise,
            })
        }
        _ => Err(PluginError::template(format!(
            "Unsupported template tag '{{% {} %}}'",
            tag
        ))),
    }
}

/// Scalars print the way Jinja prints their Python counterparts.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        _ => value.to_string(),
    }
}

fn render_nodes(nodes: &[Node], scope: &Value, out: &mut String) -> Result<(), PluginError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Expr(expr) => {
                if let Some(value) = lookup_path(scope, expr)? {
                    out.push_str(&stringify(value));
                }
            }
            Node::For {
                binding,
                path,
                body,
            } => {
                let Some(found) = lookup_path(scope, path)? else {
                    continue;
                };
                let items = found.as_array().ok_or_else(|| {
                    PluginError::template(format!("'{}' is not a list", path))
                })?;
                for item in items {
                    let mut inner = scope.as_object().cloned().unwrap_or_default();
                    inner.insert(binding.clone(), item.clone());
                    render_nodes(body, &Value::Object(inner), out)?;
                }
            }
            Node::If {
                path,
                then,
                otherwise,
            } => {
                let branch = match lookup_path(scope, path)? {
                    Some(value) if is_truthy(value) => then,
                    _ => otherwise,
                };
                render_nodes(branch, scope, out)?;
            }
        }
    }
    Ok(())
}

/// Renders `template` with the decoded payload bound to `json_data`.
pub fn render_response_template(template: &str, payload: &Value) -> Result<String, PluginError> {
    let mut tokens = tokenize(template)?.into_iter();
    let (nodes, _) = parse_nodes(&mut tokens, &[])?;
    let mut scope = Map::new();
    scope.insert(PAYLOAD_BINDING.to_string(), payload.clone());
    let mut out = String::new();
    render_nodes(&nodes, &Value::Object(scope), &mut out)?;
    Ok(out)
}
