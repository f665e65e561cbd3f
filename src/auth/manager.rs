use reqwest::Client;

use super::store::CredentialStore;
use super::types::{AccessTokenResponse, ApiKeyRequest, Credential};
use crate::error::{ApiError, Result};

/// Path of the API key exchange endpoint, relative to the base URI
pub const AUTH_PATH: &str = "auth/api-key";

/// Authentication manager
/// Exchanges the API key for tokens and installs them in the credential store
#[derive(Debug, Clone)]
pub struct AuthManager {
    /// Shared credential state of the owning client
    store: CredentialStore,

    /// API key exchanged at the auth endpoint
    api_key: Option<String>,

    /// Fully qualified auth endpoint URL
    auth_url: String,

    /// HTTP client for token requests (sent without Authorization)
    client: Client,
}

impl AuthManager {
    /// Create a new AuthManager around an existing HTTP client
    pub fn new(client: Client, api_key: Option<String>, base_uri: &str) -> Self {
        Self::with_store(client, api_key, base_uri, CredentialStore::new())
    }

    /// Create an AuthManager that shares an existing credential store
    pub fn with_store(
        client: Client,
        api_key: Option<String>,
        base_uri: &str,
        store: CredentialStore,
    ) -> Self {
        Self {
            store,
            api_key,
            auth_url: format!("{}/{}", base_uri.trim_end_matches('/'), AUTH_PATH),
            client,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Exchange the API key for a fresh credential
    ///
    /// Does not touch the store. Fails with `AuthError` when no key is
    /// configured or the endpoint answers with a status >= 400.
    pub async fn fetch_token(&self) -> Result<Credential> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ApiError::AuthError {
            status: None,
            message: "No API key configured".to_string(),
        })?;

        tracing::debug!(url = %self.auth_url, "Fetching access token...");

        let response = self
            .client
            .post(&self.auth_url)
            .json(&ApiKeyRequest { api_key })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %error_text,
                "Access token request rejected"
            );
            return Err(ApiError::AuthError {
                status: Some(status.as_u16()),
                message: format!("auth endpoint returned {}", status),
            });
        }

        let body = response.bytes().await?;
        let data: AccessTokenResponse = serde_json::from_slice(&body)?;

        if data.access_token.is_empty() {
            return Err(ApiError::AuthError {
                status: Some(status.as_u16()),
                message: "Auth response does not contain accessToken".to_string(),
            });
        }

        Ok(data.into())
    }

    /// Replace the shared credential and hand it back
    pub async fn install_credential(&self, credential: Credential) -> Credential {
        tracing::info!(
            token_type = %credential.token_type,
            token_prefix = %credential.access_token.chars().take(8).collect::<String>(),
            "Installing access token"
        );
        self.store.replace(credential.clone()).await;
        credential
    }

    /// Fetch a new credential and install it
    pub async fn refresh(&self) -> Result<Credential> {
        let credential = self.fetch_token().await?;
        Ok(self.install_credential(credential).await)
    }

    /// Current credential, fetching one first if the store is empty
    ///
    /// Concurrent callers that all find the store empty each perform their
    /// own fetch; whichever installs last is kept.
    pub async fn ensure_credential(&self) -> Result<Credential> {
        match self.store.get().await {
            Some(credential) => Ok(credential),
            None => self.refresh().await,
        }
    }
}
