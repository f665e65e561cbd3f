// Authentication module
// Holds token material and manages its lifecycle

mod manager;
mod store;
mod types;

pub use manager::{AuthManager, AUTH_PATH};
pub use store::CredentialStore;
pub use types::{Credential, DEFAULT_TOKEN_TYPE};
