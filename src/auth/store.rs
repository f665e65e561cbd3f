// Credential store
// Shared handle to the client's current token material

use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::{Credential, DEFAULT_TOKEN_TYPE};

/// Current credential of one client instance
///
/// Cloning yields another handle to the same state. The credential starts
/// empty and is only ever replaced, never cleared.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    current: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a credential
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(credential))),
        }
    }

    /// Current credential, if one has been installed
    pub async fn get(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Token scheme in use
    pub async fn token_type(&self) -> String {
        self.current
            .read()
            .await
            .as_ref()
            .map(|c| c.token_type.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string())
    }

    pub async fn is_empty(&self) -> bool {
        self.current.read().await.is_none()
    }

    /// Replace the credential; the last write wins
    pub async fn replace(&self, credential: Credential) {
        let mut current = self.current.write().await;
        *current = Some(credential);
    }
}
