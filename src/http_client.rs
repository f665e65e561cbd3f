use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use std::path::PathBuf;

use crate::auth::{AuthManager, CredentialStore};
use crate::config::{self, ClientConfig};
use crate::error::{ApiError, Result};
use crate::multipart::FileSource;
use crate::problem;
use crate::request::{PendingRequest, RequestBody, RequestOptions};

/// Progress of one dispatch
///
/// `RetryingOnce` always moves to `Done`, so a request is sent at most twice.
#[derive(Debug)]
enum DispatchState {
    Unauthenticated,
    Sending(Option<HeaderValue>),
    RetryingOnce,
    Done(Response),
}

/// HTTP client for the api.video API with token handling and 401 retry
pub struct ApiHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Authentication manager
    auth_manager: AuthManager,

    base_uri: String,

    /// Headers sent with every request unless overridden per call
    default_headers: HeaderMap,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ApiError::ConfigError(format!("invalid user agent: {}", e)))?,
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static(config::ACCEPT));

        let base_uri = config.base_uri.trim_end_matches('/').to_string();
        let auth_manager = AuthManager::new(client.clone(), config.api_key, &base_uri);

        Ok(Self {
            client,
            auth_manager,
            base_uri,
            default_headers,
        })
    }

    /// Send a request to `path` with per-call overrides
    pub async fn call(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let request = PendingRequest::new(&self.base_uri, path, &self.default_headers, options);
        self.dispatch(request).await
    }

    /// POST a single-field multipart body; the field and file are both named `file_name`
    pub async fn submit(
        &self,
        path: &str,
        source: impl Into<FileSource>,
        file_name: &str,
        headers: HeaderMap,
    ) -> Result<Response> {
        let body = RequestBody::SingleFile {
            field_name: file_name.to_string(),
            source: source.into(),
            file_name: file_name.to_string(),
        };
        self.call(
            path,
            RequestOptions::new()
                .method(Method::POST)
                .headers(headers)
                .body(body),
        )
        .await
    }

    /// POST a file under the `file` field plus ordered scalar fields
    pub async fn submit_multipart(
        &self,
        path: &str,
        source: impl Into<PathBuf>,
        fields: Vec<(String, String)>,
        headers: HeaderMap,
    ) -> Result<Response> {
        let body = RequestBody::MultiField {
            source: FileSource::Path(source.into()),
            fields,
        };
        self.call(
            path,
            RequestOptions::new()
                .method(Method::POST)
                .headers(headers)
                .body(body),
        )
        .await
    }

    /// Whether the response status is in [200, 300)
    pub fn is_successful(response: &Response) -> bool {
        is_success_status(response.status())
    }

    /// Credential state shared by every request of this client
    pub fn credentials(&self) -> &CredentialStore {
        self.auth_manager.store()
    }

    pub fn auth_manager(&self) -> &AuthManager {
        &self.auth_manager
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Run a request through authenticate -> send -> (retry once) -> reclassify
    async fn dispatch(&self, request: PendingRequest) -> Result<Response> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            stream = request.stream,
            "Sending HTTP request"
        );

        let mut state = DispatchState::Unauthenticated;
        loop {
            state = match state {
                DispatchState::Unauthenticated => {
                    DispatchState::Sending(self.authenticate(&request).await?)
                }
                DispatchState::Sending(authorization) => {
                    let response = self.send(&request, authorization.as_ref()).await?;
                    if !request.stream && response.status() == StatusCode::UNAUTHORIZED {
                        tracing::warn!(url = %request.url, "Received 401, refreshing token and retrying once...");
                        DispatchState::RetryingOnce
                    } else {
                        DispatchState::Done(response)
                    }
                }
                DispatchState::RetryingOnce => {
                    let credential = self.auth_manager.refresh().await?;
                    let authorization = authorization_value(&credential.authorization_header())?;
                    DispatchState::Done(self.send(&request, Some(&authorization)).await?)
                }
                DispatchState::Done(response) => {
                    if request.stream {
                        return Ok(response);
                    }
                    return reclassify(response).await;
                }
            };
        }
    }

    /// Authorization to inject, fetching a token first if none exists yet
    ///
    /// Returns `None` when the caller supplied its own header.
    async fn authenticate(&self, request: &PendingRequest) -> Result<Option<HeaderValue>> {
        if request.has_authorization() {
            return Ok(None);
        }
        let credential = self.auth_manager.ensure_credential().await?;
        Ok(Some(authorization_value(&credential.authorization_header())?))
    }

    async fn send(
        &self,
        request: &PendingRequest,
        authorization: Option<&HeaderValue>,
    ) -> Result<Response> {
        let req = request.build(&self.client, authorization).await?;
        let response = self.client.execute(req).await.map_err(|e| {
            tracing::warn!(error = %e, url = %request.url, "HTTP request error");
            ApiError::Transport(e)
        })?;
        tracing::debug!(status = %response.status(), "Received HTTP response");
        Ok(response)
    }
}

/// Turn failure responses into errors
///
/// Problem payloads become `ApiError::Problem`; every other failure keeps the
/// transport's own status error.
async fn reclassify(response: Response) -> Result<Response> {
    let Some(err) = response.error_for_status_ref().err() else {
        return Ok(response);
    };
    let status = response.status();

    if problem::is_problem_response(response.headers()) {
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        if let Some(problem) = problem::classify(status, &headers, &body) {
            tracing::debug!(status = problem.status, title = ?problem.details.title, "API returned problem payload");
            return Err(problem.into());
        }
    }

    tracing::warn!(status = status.as_u16(), "HTTP request failed with error response");
    Err(ApiError::Transport(err))
}

fn authorization_value(header: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(header)
        .map_err(|e| ApiError::ValidationError(format!("invalid Authorization header: {}", e)))
}

/// Status check behind `is_successful`
pub fn is_success_status(status: StatusCode) -> bool {
    (200..300).contains(&status.as_u16())
}
