// Authentication types

use serde::{Deserialize, Serialize};

/// Scheme used until the auth endpoint tells us otherwise
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Token material returned by the auth endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Body of `POST /auth/api-key`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRequest<'a> {
    pub api_key: &'a str,
}

/// Auth endpoint response
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub token_type: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl From<AccessTokenResponse> for Credential {
    fn from(data: AccessTokenResponse) -> Self {
        Self {
            token_type: data
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            access_token: data.access_token,
            refresh_token: data.refresh_token,
        }
    }
}
