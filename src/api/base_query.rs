//! HTTP transport shared by all endpoints of one API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::api::endpoint::RequestSpec;
use crate::api::error::ApiError;

/// Settled JSON body together with the status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub data: Value,
}

#[derive(Clone)]
pub struct BaseQuery {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BaseQuery {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the request path onto the base URL. Query params are appended by `execute`.
    pub fn url_for(&self, request: &RequestSpec) -> String {
        let path = request.path.trim_start_matches('/');
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Perform one request. No retries: callers decide whether to try again.
    pub async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, ApiError> {
        let joined = self.url_for(request);
        let parsed = if request.params.is_empty() {
            Url::parse(&joined)
        } else {
            Url::parse_with_params(&joined, &request.params)
        };
        let url = parsed.map_err(|e| ApiError::Fetch {
            message: format!("invalid request URL '{}': {}", joined, e),
        })?;
        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let timeout_seconds = self.timeout.as_secs();
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_seconds))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_seconds))?;

        if !status.is_success() {
            // Error bodies are kept as JSON when possible, raw text otherwise.
            let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(ApiError::Http {
                status: status.as_u16(),
                data,
            });
        }

        let data = parse_body(&text, is_json).map_err(|message| ApiError::Parsing {
            original_status: status.as_u16(),
            data: text.clone(),
            message,
        })?;

        Ok(RawResponse {
            status: status.as_u16(),
            data,
        })
    }
}

fn parse_body(text: &str, is_json: bool) -> Result<Value, String> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(err) if is_json => Err(err.to_string()),
        Err(err) => Err(format!("response is not JSON: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(url: &str) -> BaseQuery {
        BaseQuery::new(url, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_url_for_empty_path_uses_base() {
        let query = base("https://dummyjson.com/quotes");
        assert_eq!(
            query.url_for(&RequestSpec::get("")),
            "https://dummyjson.com/quotes"
        );
    }

    #[test]
    fn test_url_for_joins_single_slash() {
        let query = base("http://127.0.0.1:3000/api/");
        assert_eq!(
            query.url_for(&RequestSpec::get("/count")),
            "http://127.0.0.1:3000/api/count"
        );
        assert_eq!(
            query.url_for(&RequestSpec::post("increment", json!({"amount": 1}))),
            "http://127.0.0.1:3000/api/increment"
        );
    }

    #[test]
    fn test_parse_body_empty_is_null() {
        assert_eq!(parse_body("  ", true), Ok(Value::Null));
    }

    #[test]
    fn test_parse_body_invalid_json_fails() {
        assert!(parse_body("<html>", false).is_err());
        assert_eq!(parse_body("42", false), Ok(json!(42)));
    }
}
