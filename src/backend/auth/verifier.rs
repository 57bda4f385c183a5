/**
 * Identity Verifier
 *
 * This module turns an opaque credential into a chat identity. Token
 * cryptography lives in the account service; the chat hub only asks it who
 * a token belongs to.
 *
 * # Flow
 *
 * 1. `GET {AUTH_SERVICE_URL}/api/me` with `Authorization: Bearer <token>`
 * 2. A non-200 answer means the token was rejected
 * 3. The body must carry a non-zero `id` and a non-empty `username`
 *
 * Any failure degrades the connection to anonymous; see
 * [`resolve_identity`].
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::shared::Identity;

/// Reasons a credential did not produce an identity
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The account service could not be reached or answered garbage
    #[error("identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The account service refused the credential
    #[error("identity service rejected the credential with status {0}")]
    Rejected(StatusCode),

    /// The account service answered without a usable id or username
    #[error("identity service returned an incomplete identity")]
    IncompleteIdentity,

    /// The call did not finish within its budget
    #[error("identity verification timed out after {0:?}")]
    Timeout(Duration),
}

/// Resolves a credential to an identity
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError>;
}

/// Body of the account service's `/api/me` response
#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    username: String,
}

/// Verifier backed by the account service's `/api/me` endpoint
#[derive(Debug, Clone)]
pub struct HttpIdentityVerifier {
    client: Client,
    me_url: String,
}

impl HttpIdentityVerifier {
    /// Create a verifier for the account service at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://localhost:8081`
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            me_url: format!("{}/api/me", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        let response = self
            .client
            .get(&self.me_url)
            .header("Authorization", format!("Bearer {}", credential))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(VerifyError::Rejected(response.status()));
        }

        let me: MeResponse = response.json().await?;
        if me.id == 0 || me.username.is_empty() {
            return Err(VerifyError::IncompleteIdentity);
        }

        Ok(Identity::new(me.id, me.username))
    }
}

/// Resolve an optional credential to an identity, degrading to anonymous
///
/// A missing credential, a rejected one, a transport error and a timeout
/// all yield `None`. Failures are logged but never surfaced to the peer.
///
/// # Arguments
///
/// * `verifier` - Identity verifier to consult
/// * `credential` - Token extracted from the upgrade request, if any
/// * `budget` - Upper bound for the verifier call
pub async fn resolve_identity(
    verifier: &dyn IdentityVerifier,
    credential: Option<&str>,
    budget: Duration,
) -> Option<Identity> {
    let credential = credential?;

    let result = match tokio::time::timeout(budget, verifier.verify(credential)).await {
        Ok(result) => result,
        Err(_) => Err(VerifyError::Timeout(budget)),
    };

    match result {
        Ok(identity) => {
            tracing::info!("[Auth] Verified user {} ({})", identity.username, identity.user_id);
            Some(identity)
        }
        Err(e) => {
            tracing::warn!("[Auth] Verification failed, continuing as anonymous: {}", e);
            None
        }
    }
}
