// Error classification
// Recognizes structured problem payloads on failure responses

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Content type that marks a failure body as a structured problem payload
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Fields of a problem payload
///
/// Every field is optional; the service decides which ones it sends.
/// Known fields are read leniently: a mistyped value (`"status":"400"`,
/// `"title":42`) is coerced or dropped on its own instead of failing the
/// whole payload. Anything not modelled here is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub problem_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<u16>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Typed API error built from a problem response
#[derive(Error, Debug, Clone)]
#[error("API error: {} - {}", .status, .details.title.as_deref().unwrap_or("unknown problem"))]
pub struct ProblemError {
    /// Status code of the HTTP response
    pub status: u16,
    pub details: ProblemDetails,
    pub raw_body: String,
}

/// Check whether the response headers identify a problem payload
///
/// Parameters such as `charset` are ignored; the media type itself must match.
pub fn is_problem_response(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case(PROBLEM_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

/// Classify a failure response
///
/// Returns `None` when the response is not a problem payload, in which case
/// the caller propagates the original failure untouched.
pub fn classify(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Option<ProblemError> {
    if !is_problem_response(headers) {
        return None;
    }

    let raw_body = String::from_utf8_lossy(body).into_owned();
    let details = match serde_json::from_slice::<ProblemDetails>(body) {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!(
                status = status.as_u16(),
                error = %e,
                "Problem payload could not be parsed, keeping raw body"
            );
            ProblemDetails::default()
        }
    };

    Some(ProblemError {
        status: status.as_u16(),
        details,
        raw_body,
    })
}
