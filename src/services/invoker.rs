use crate::config::Settings;
use crate::constants::{limits, markers, network};
use crate::errors::PluginError;
use crate::models::ResolvedCallParams;
use crate::services::logger::Logger;
use crate::services::retry::{retry_async, RetryPolicy};
use crate::utils::data_path::is_truthy;
use crate::utils::text::truncate_utf8_prefix;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// The call the invoker performs; borrowed from the caller's resolved params.
#[derive(Debug, Clone, Copy)]
pub struct ApiRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub query_params: Option<&'a Map<String, Value>>,
    pub body: Option<&'a Value>,
}

impl<'a> From<&'a ResolvedCallParams> for ApiRequest<'a> {
    fn from(params: &'a ResolvedCallParams) -> Self {
        Self {
            method: &params.method,
            url: &params.url,
            headers: &params.headers,
            query_params: params.query_params.as_ref(),
            body: params.body.as_ref(),
        }
    }
}

/// Decoded JSON for a 200, raw body text for a 400.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub payload: Value,
    pub status: u16,
}

impl ApiResponse {
    pub fn needs_clarification(&self) -> bool {
        self.status == StatusCode::BAD_REQUEST.as_u16()
    }
}

#[derive(Clone)]
pub struct ApiInvoker {
    logger: Logger,
    client: Client,
    policy: RetryPolicy,
}

impl ApiInvoker {
    pub fn new(logger: Logger, settings: &Settings) -> Result<Self, PluginError> {
        let client = Client::builder()
            .user_agent(network::USER_AGENT)
            .timeout(Duration::from_millis(settings.api_timeout_ms))
            .build()
            .map_err(|err| PluginError::internal(format!("Failed to build HTTP client: {}", err)))?;
        let policy = RetryPolicy::target_api().with_max_attempts(settings.api_max_attempts);
        Ok(Self::with_client(logger, client, policy))
    }

    pub fn with_client(logger: Logger, client: Client, policy: RetryPolicy) -> Self {
        Self {
            logger: logger.child("invoker"),
            client,
            policy,
        }
    }

    /// A copy whose log lines, retry warnings included, carry `request`'s id.
    pub fn for_request(&self, request: &Logger) -> Self {
        Self {
            logger: self.logger.in_request(request),
            client: self.client.clone(),
            policy: self.policy.clone(),
        }
    }

    /// One logical call. Every failure, including a 200 that carries an error body, is retried.
    pub async fn invoke(&self, request: ApiRequest<'_>) -> Result<ApiResponse, PluginError> {
        let label = format!("{} {}", request.method.to_uppercase(), request.url);
        retry_async(&self.policy, &self.logger, &label, |attempt| {
            self.invoke_once(request, attempt)
        })
        .await
    }

    async fn invoke_once(
        &self,
        request: ApiRequest<'_>,
        attempt: usize,
    ) -> Result<ApiResponse, PluginError> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes()).map_err(|_| {
            PluginError::invalid_params(format!("Invalid HTTP method '{}'", request.method))
        })?;
        let mut headers = headers_to_headermap(request.headers)?;
        let query = request.query_params.map(rewrite_content_markers);
        let params_text = query
            .as_ref()
            .map(|q| Value::Object(q.clone()).to_string())
            .unwrap_or_else(|| "null".to_string());

        let mut builder = self.client.request(method, request.url);
        if let Some(query) = &query {
            builder = builder.query(&query_pairs(query));
        }
        match request.body {
            Some(Value::Object(map)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                builder = builder.body(Value::Object(map.clone()).to_string());
            }
            Some(Value::Null) | None => {}
            Some(Value::String(raw)) => builder = builder.body(raw.clone()),
            Some(other) => builder = builder.body(other.to_string()),
        }
        builder = builder.headers(headers);

        self.logger.debug(
            "calling target API",
            Some(&serde_json::json!({"url": request.url, "attempt": attempt})),
        );
        let response = builder.send().await.map_err(|err| {
            let message = diagnostic(request.url, &params_text, "none", &err.to_string());
            if err.is_timeout() {
                PluginError::timeout(message)
            } else {
                PluginError::retryable(message)
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            PluginError::retryable(diagnostic(
                request.url,
                &params_text,
                status.as_str(),
                &err.to_string(),
            ))
        })?;
        if status == StatusCode::BAD_REQUEST {
            return Ok(ApiResponse {
                payload: Value::String(text),
                status: status.as_u16(),
            });
        }
        if status == StatusCode::OK {
            if let Ok(payload) = serde_json::from_str::<Value>(&text) {
                if !reports_failure(&payload) {
                    return Ok(ApiResponse {
                        payload,
                        status: status.as_u16(),
                    });
                }
            }
        }
        Err(PluginError::upstream(diagnostic(
            request.url,
            &params_text,
            status.as_str(),
            &text,
        )))
    }
}

fn diagnostic(url: &str, params: &str, status: &str, body: &str) -> String {
    format!(
        "API: {}, Params: {}, Status code: {}, Response: {}...",
        url,
        params,
        status,
        truncate_utf8_prefix(body, limits::RESPONSE_EXCERPT_BYTES)
    )
}

/// A 200 body is still a failure when it has a truthy `error` or a server-error `message`.
pub fn reports_failure(payload: &Value) -> bool {
    let Value::Object(map) = payload else {
        return false;
    };
    let server_error = map
        .get("message")
        .and_then(|v| v.as_str())
        .map(|m| m.starts_with(markers::SERVER_ERROR_MESSAGE))
        .unwrap_or(false);
    server_error || map.get("error").map(is_truthy).unwrap_or(false)
}

/// Email-style APIs misread a link immediately followed by `)`; pad the paren.
pub fn rewrite_content_markers(query: &Map<String, Value>) -> Map<String, Value> {
    let mut out = query.clone();
    if let Some(Value::String(content)) = out.get_mut(markers::CONTENT_PARAM) {
        for (from, to) in markers::CONTENT_REWRITES {
            *content = content.replace(from, to);
        }
    }
    out
}

fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    value
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn headers_to_headermap(headers: &HashMap<String, String>) -> Result<HeaderMap, PluginError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| PluginError::invalid_params(format!("Invalid header name '{}'", key)))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| PluginError::invalid_params(format!("Invalid value for header '{}'", key)))?;
        map.insert(name, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::{query_pairs, reports_failure, rewrite_content_markers, ApiInvoker};
    use crate::services::logger::Logger;
    use crate::services::retry::RetryPolicy;
    use serde_json::json;

    #[test]
    fn request_scoped_invoker_logs_under_the_request_id() {
        let invoker = ApiInvoker::with_client(
            Logger::new("app"),
            reqwest::Client::new(),
            RetryPolicy::immediate(2),
        );
        assert_eq!(invoker.logger.request_id(), None);

        let request = Logger::new("app").child("execution").for_request();
        let scoped = invoker.for_request(&request);
        assert!(scoped.logger.request_id().is_some());
        assert_eq!(scoped.logger.request_id(), request.request_id());
        assert_eq!(scoped.logger.child("retry").request_id(), request.request_id());
        assert_eq!(scoped.policy, invoker.policy);
    }

    #[test]
    fn error_bodies_are_failures() {
        assert!(reports_failure(&json!({"error": "quota"})));
        assert!(reports_failure(&json!({"message": "Internal Server Error: db down"})));
        assert!(!reports_failure(&json!({"error": null, "data": 1})));
        assert!(!reports_failure(&json!({"error": ""})));
        assert!(!reports_failure(&json!({"message": "ok"})));
        assert!(!reports_failure(&json!([{"error": "inside a list"}])));
    }

    #[test]
    fn content_markers_are_padded() {
        let query = json!({
            "content": "see (https://docs.example.com/d/1/edit) and (notes.txt)",
            "title": "edit)"
        });
        let rewritten = rewrite_content_markers(query.as_object().expect("object"));
        assert_eq!(
            rewritten.get("content"),
            Some(&json!("see (https://docs.example.com/d/1/edit ) and (notes.txt )"))
        );
        assert_eq!(rewritten.get("title"), Some(&json!("edit)")));
    }

    #[test]
    fn arrays_expand_to_repeated_pairs() {
        let query = json!({"tag": ["a", "b"], "n": 3, "skip": null});
        let pairs = query_pairs(query.as_object().expect("object"));
        assert_eq!(
            pairs,
            vec![
                ("n".to_string(), "3".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
    }
}
