//! Authentication hook for the administrative surface.
//!
//! Players and hosts are never authenticated: a room code is the only
//! capability they need. Admin routes, on the other hand, carry a shared
//! secret in the [`ADMIN_TOKEN_HEADER`] header. The [`Authenticator`]
//! trait keeps the check swappable (a test double, or a real identity
//! provider later) without touching the HTTP layer.

use crate::SessionError;

/// Header carrying the admin secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Validates an admin caller's token.
///
/// # Example
///
/// ```rust
/// use teamquiz_session::{Authenticator, SessionError};
///
/// /// Lets everyone in. Only for local tinkering.
/// struct OpenDoor;
///
/// impl Authenticator for OpenDoor {
///     async fn authenticate(&self, _token: Option<&str>) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Checks the token presented by the caller (`None` when the header
    /// was absent).
    ///
    /// # Returns
    /// - `Ok(())` when the caller may proceed
    /// - `Err(SessionError::Unauthorized)` otherwise
    fn authenticate(
        &self,
        token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Compares the presented token against one configured secret.
///
/// With no secret configured every call is refused, so an unconfigured
/// deployment never exposes the admin surface.
#[derive(Debug, Clone, Default)]
pub struct SharedSecret {
    secret: Option<String>,
}

impl SharedSecret {
    /// Builds the authenticator. Empty strings count as "not configured".
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Whether a secret is configured at all.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

impl Authenticator for SharedSecret {
    async fn authenticate(&self, token: Option<&str>) -> Result<(), SessionError> {
        match (self.secret.as_deref(), token) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => {
                tracing::debug!(configured = self.is_configured(), "admin token rejected");
                Err(SessionError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matching_token_is_accepted() {
        let auth = SharedSecret::new(Some("hunter2".into()));
        assert!(auth.authenticate(Some("hunter2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_or_missing_token_is_rejected() {
        let auth = SharedSecret::new(Some("hunter2".into()));
        assert!(matches!(
            auth.authenticate(Some("hunter3")).await,
            Err(SessionError::Unauthorized)
        ));
        assert!(matches!(
            auth.authenticate(None).await,
            Err(SessionError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_secret_rejects_everything() {
        let auth = SharedSecret::new(None);
        assert!(!auth.is_configured());
        assert!(auth.authenticate(None).await.is_err());
        assert!(auth.authenticate(Some("")).await.is_err());

        let empty = SharedSecret::new(Some(String::new()));
        assert!(!empty.is_configured());
        assert!(empty.authenticate(Some("")).await.is_err());
    }
}
