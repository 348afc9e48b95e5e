//! External identity provider integration.
//!
//! The provider's sign-in widget is an opaque collaborator that loads on its own schedule.
//! [`ExternalIdentity`] is the readiness gate for it, and [`IdentityAssertion`] is the one
//! event it produces, handed to
//! [`Session::login_with_external_identity`](crate::Session::login_with_external_identity).

use std::sync::Arc;
use std::time::Duration;

use derive_more::{From, Into};
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::Error;

/// Signed credential issued by the external identity provider.
///
/// `Debug` is redacted.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct IdentityAssertion(String);

impl IdentityAssertion {
    #[must_use]
    pub fn new(credential: impl Into<String>) -> Self {
        Self(credential.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdentityAssertion(***)")
    }
}

/// Readiness gate for the external identity widget.
///
/// Clones share readiness. The widget side calls [`mark_available`](Self::mark_available)
/// once loaded; the sign-in screen awaits [`wait_until_available`](Self::wait_until_available).
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    client_id: Option<String>,
    wait: Duration,
    ready: Arc<watch::Sender<bool>>,
}

impl ExternalIdentity {
    #[must_use]
    pub fn new(wait: Duration) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            client_id: None,
            wait,
            ready: Arc::new(ready),
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut identity = Self::new(config.identity_wait());
        identity.client_id = config.identity_client_id().map(str::to_owned);
        identity
    }

    /// Client id the widget should be initialized with, if configured.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn mark_available(&self) {
        self.ready.send_replace(true);
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait for the widget, at most the configured bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityProviderUnavailable`] if the widget does not become
    /// available in time.
    pub async fn wait_until_available(&self) -> Result<(), Error> {
        let mut rx = self.ready.subscribe();
        match tokio::time::timeout(self.wait, rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(
                    wait_ms = u64::try_from(self.wait.as_millis()).unwrap_or(u64::MAX),
                    "Identity provider did not load"
                );
                Err(Error::IdentityProviderUnavailable)
            }
        }
    }
}
