// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Custom extractors for improved error handling
//!
//! [`JsonExtractor`] replaces `axum::Json` on request bodies so that malformed
//! input produces a 400 with a readable hint instead of axum's default rejection.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde::de::DeserializeOwned;

use crate::error::ServerError;

/// Largest JSON body accepted, matching the request body limit layer
pub const MAX_JSON_PAYLOAD_SIZE: usize = 1024 * 1024;

const EMPTY_BODY: &str = "request body is empty, expected valid JSON";
const TRUNCATED_JSON: &str = "unexpected end of JSON input, request appears to be truncated";
const DEFAULT_SYNTAX_HINT: &str = "check JSON formatting and structure";

/// serde_json message fragment and the hint shown for it
const SYNTAX_HINTS: &[(&str, &str)] = &[
    (
        "expected ','",
        "check for missing or extra commas between object properties or array elements",
    ),
    (
        "trailing comma",
        "check for missing or extra commas between object properties or array elements",
    ),
    (
        "expected '}'",
        "check for missing closing brace '}' for JSON object",
    ),
    (
        "expected ']'",
        "check for missing closing bracket ']' for JSON array",
    ),
    (
        "expected '\"'",
        "check for missing or improperly escaped quotes around string values",
    ),
    (
        "control character",
        "JSON contains invalid control characters that must be escaped",
    ),
    (
        "expected value",
        "expected a valid JSON value (string, number, boolean, null, object, or array)",
    ),
];

/// JSON body extractor with detailed error messages
#[derive(Debug)]
pub struct JsonExtractor<T>(pub T);

impl<T, S> FromRequest<S> for JsonExtractor<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(content_type) = req.headers().get(header::CONTENT_TYPE)
            && let Ok(content_type) = content_type.to_str()
            && !content_type.starts_with("application/json")
        {
            return Err(ServerError::JsonError {
                message: format!(
                    "invalid content-type: expected 'application/json', got '{content_type}'"
                ),
            });
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ServerError::JsonError {
                message: format!("failed to read request body: {rejection}"),
            })?;

        parse_body(&bytes).map(JsonExtractor)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ServerError> {
    if bytes.len() > MAX_JSON_PAYLOAD_SIZE {
        return Err(ServerError::JsonError {
            message: format!(
                "request body too large: {} bytes (max: {MAX_JSON_PAYLOAD_SIZE} bytes)",
                bytes.len()
            ),
        });
    }
    if bytes.is_empty() {
        return Err(ServerError::JsonError {
            message: EMPTY_BODY.to_string(),
        });
    }

    serde_json::from_slice::<T>(bytes).map_err(|err| ServerError::JsonError {
        message: describe(&err),
    })
}

fn describe(err: &serde_json::Error) -> String {
    if err.is_eof() {
        TRUNCATED_JSON.to_string()
    } else if err.is_syntax() {
        format!(
            "invalid JSON syntax at line {}, column {}: {}",
            err.line(),
            err.column(),
            syntax_hint(err)
        )
    } else if err.is_data() {
        format!("JSON data validation failed: {}", data_hint(err))
    } else {
        format!("JSON parsing error: {err}")
    }
}

fn syntax_hint(err: &serde_json::Error) -> &'static str {
    let message = err.to_string();
    SYNTAX_HINTS
        .iter()
        .find(|(fragment, _)| message.contains(fragment))
        .map_or(DEFAULT_SYNTAX_HINT, |&(_, hint)| hint)
}

fn data_hint(err: &serde_json::Error) -> String {
    let message = err.to_string();

    if message.contains("invalid type") {
        let expected = [
            ("expected a string", "a string value"),
            ("expected string", "a string value"),
            ("expected a boolean", "a boolean value (true or false)"),
            ("expected struct", "a JSON object"),
            ("expected a map", "a JSON object"),
        ]
        .into_iter()
        .find(|(fragment, _)| message.contains(fragment));

        match expected {
            Some((_, what)) => format!("expected {what}, but received a different data type"),
            None => format!("data type mismatch: {message}"),
        }
    } else if message.contains("missing field") {
        format!("required field is missing: {message}")
    } else if message.contains("unknown field") {
        format!("unrecognized field found: {message}")
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{HeaderValue, Method},
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Lookup {
        domain: String,
    }

    fn json_request(body: &str) -> Request {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/v1/query")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        req
    }

    async fn extract(body: &str) -> Result<Lookup, String> {
        match JsonExtractor::<Lookup>::from_request(json_request(body), &()).await {
            Ok(JsonExtractor(value)) => Ok(value),
            Err(ServerError::JsonError { message }) => Err(message),
            Err(other) => panic!("expected JsonError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_body() {
        assert_eq!(
            extract(r#"{"domain": "example.com"}"#).await,
            Ok(Lookup {
                domain: "example.com".to_string()
            })
        );
    }

    #[tokio::test]
    async fn empty_body() {
        let message = extract("").await.unwrap_err();
        assert!(message.contains("request body is empty"));
    }

    #[tokio::test]
    async fn truncated_body() {
        let message = extract(r#"{"domain": "example.com""#).await.unwrap_err();
        assert!(message.contains("unexpected end of JSON input"));
    }

    #[tokio::test]
    async fn syntax_error_reports_position() {
        let message = extract(r#"{"domain": "example.com",, }"#).await.unwrap_err();
        assert!(message.contains("invalid JSON syntax"));
        assert!(message.contains("line 1"));
    }

    #[tokio::test]
    async fn wrong_type() {
        let message = extract(r#"{"domain": 42}"#).await.unwrap_err();
        assert!(message.contains("JSON data validation failed"));
        assert!(message.contains("expected a string value"));
    }

    #[tokio::test]
    async fn missing_field() {
        let message = extract(r#"{"name": "example.com"}"#).await.unwrap_err();
        assert!(message.contains("JSON data validation failed"));
    }

    #[tokio::test]
    async fn oversized_body() {
        let body = format!(r#"{{"domain": "{}"}}"#, "a".repeat(MAX_JSON_PAYLOAD_SIZE));
        let message = extract(&body).await.unwrap_err();
        assert!(message.contains("request body too large"));
    }

    #[tokio::test]
    async fn rejects_non_json_content_type() {
        let mut req = json_request(r#"{"domain": "example.com"}"#);
        req.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let result = JsonExtractor::<Lookup>::from_request(req, &()).await;
        match result {
            Err(ServerError::JsonError { message }) => {
                assert!(message.contains("expected 'application/json'"));
                assert!(message.contains("text/plain"));
            }
            other => panic!("expected JsonError, got {other:?}"),
        }
    }
}
