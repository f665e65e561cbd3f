// api.video transport - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod multipart;
pub mod problem;
pub mod request;

pub use auth::{AuthManager, Credential, CredentialStore};
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, Result};
pub use http_client::ApiHttpClient;
pub use multipart::FileSource;
pub use problem::{ProblemDetails, ProblemError};
pub use request::{RequestBody, RequestOptions};
