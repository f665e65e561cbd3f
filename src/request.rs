// Per-request options and body descriptors

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::error::{ApiError, Result};
use crate::multipart::{self, FileSource};

/// Body attached to a pending request
///
/// Descriptors rather than encoded bodies, so every attempt (including the
/// single 401 retry) encodes from scratch.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),

    /// One file part under a caller-chosen field name
    SingleFile {
        field_name: String,
        source: FileSource,
        file_name: String,
    },

    /// The `file` part followed by ordered scalar fields
    MultiField {
        source: FileSource,
        fields: Vec<(String, String)>,
    },
}

/// Per-call overrides layered onto the client defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,

    /// Pass the raw response through: no 401 retry, no error reclassification
    pub stream: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header, rejecting invalid names or values
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::ValidationError(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::ValidationError(format!("invalid value for {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Request as seen by the dispatcher for the duration of one call
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub stream: bool,
}

impl PendingRequest {
    /// Resolve options against the client's base URI and default headers
    pub fn new(base_uri: &str, path: &str, defaults: &HeaderMap, options: RequestOptions) -> Self {
        let mut headers = defaults.clone();
        headers.extend(options.headers);

        Self {
            method: options.method.unwrap_or(Method::GET),
            url: format!(
                "{}/{}",
                base_uri.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            headers,
            query: options.query,
            body: options.body,
            stream: options.stream,
        }
    }

    /// Whether the caller supplied its own Authorization header
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(reqwest::header::AUTHORIZATION)
    }

    /// Build a sendable request for one attempt
    ///
    /// `authorization` overrides whatever Authorization header is present.
    pub async fn build(
        &self,
        client: &reqwest::Client,
        authorization: Option<&HeaderValue>,
    ) -> Result<reqwest::Request> {
        let mut headers = self.headers.clone();
        if let Some(value) = authorization {
            headers.insert(reqwest::header::AUTHORIZATION, value.clone());
        }

        let mut builder = client
            .request(self.method.clone(), &self.url)
            .headers(headers);
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }

        builder = match &self.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::SingleFile {
                field_name,
                source,
                file_name,
            }) => builder.multipart(
                multipart::build_single_file_form(field_name, source, file_name).await?,
            ),
            Some(RequestBody::MultiField { source, fields }) => {
                builder.multipart(multipart::build_multi_field_form(source, fields).await?)
            }
        };

        Ok(builder.build()?)
    }
}
