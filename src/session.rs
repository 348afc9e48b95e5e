use std::sync::Arc;

use tokio::sync::watch;

use crate::api::AuthApi;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::identity::IdentityAssertion;
use crate::storage::TokenStore;
use crate::types::{AuthPayload, SessionToken, User};

/// Authentication status of a [`Session`].
///
/// Only `Authenticated` carries a user, so "authenticated" and "has a user" cannot disagree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Startup: a stored token may be under verification.
    #[default]
    Loading,
    Unauthenticated,
    Authenticated { token: SessionToken, user: User },
}

impl SessionState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&SessionToken> {
        match self {
            Self::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }
}

/// Owns the token/user lifecycle. The only mutator of authentication state.
///
/// Cheap to clone; all clones share one state. Construct once at startup and hand it to
/// every consumer that needs to make authenticated calls.
///
/// Concurrent credential exchanges are not serialized: whichever response completes last
/// decides the persisted token and the published state.
///
/// ```rust,ignore
/// let config = ClientConfig::from_env()?;
/// let store = FileTokenStore::from_config(path, &config);
/// let session = Session::new(config, store);
/// session.initialize().await;
/// if !session.is_authenticated() {
///     session.login("a@b.com", "hunter22").await?;
/// }
/// let timeline = session.request("/api/user/timeline", RequestOptions::get()).await?;
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    api: AuthApi,
    store: Box<dyn TokenStore>,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("origin", &self.inner.api.config().origin().as_str())
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(config: ClientConfig, store: impl TokenStore) -> Self {
        Self::with_api(AuthApi::new(config), store)
    }

    /// Build a session over a preconfigured [`AuthApi`] (custom HTTP client, etc.).
    #[must_use]
    pub fn with_api(api: AuthApi, store: impl TokenStore) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            inner: Arc::new(Inner {
                api,
                store: Box::new(store),
                state,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.inner.api.config()
    }

    pub(crate) fn api(&self) -> &AuthApi {
        &self.inner.api
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.inner.state.borrow().token().cloned()
    }

    /// Restore the session from a previously persisted token.
    ///
    /// Without a stored token this settles on `Unauthenticated` without any network call.
    /// A stored token is never trusted until the backend confirms it.
    pub async fn initialize(&self) -> SessionState {
        self.set_state(SessionState::Loading);

        let stored = self.inner.store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read persisted token");
            None
        });

        match stored {
            Some(token) => self.verify_token(token).await,
            None => {
                tracing::debug!("No persisted token");
                self.set_state(SessionState::Unauthenticated);
                SessionState::Unauthenticated
            }
        }
    }

    /// Check `token` against the backend and adopt it if accepted.
    ///
    /// Never fails: any rejection or transport problem drops the persisted token and
    /// leaves the session unauthenticated.
    pub async fn verify_token(&self, token: SessionToken) -> SessionState {
        match self.inner.api.current_user(&token).await {
            Ok(user) => {
                self.persist(&token);
                tracing::info!(user_id = %user.id, "Restored session");
                let state = SessionState::Authenticated { token, user };
                self.set_state(state.clone());
                state
            }
            Err(e) => {
                tracing::debug!(error = %e, "Stored token rejected");
                self.forget();
                SessionState::Unauthenticated
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] carrying the backend's message if the credentials
    /// are rejected, or a transport error. The session state is unchanged on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, Error> {
        let payload = self.inner.api.login(email, password).await?;
        Ok(self.establish(payload, "password"))
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthPayload, Error> {
        let payload = self.inner.api.register(email, username, password).await?;
        Ok(self.establish(payload, "register"))
    }

    /// Sign in with an assertion received from the external identity provider.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn login_with_external_identity(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<AuthPayload, Error> {
        let payload = self
            .inner
            .api
            .exchange_external_identity(assertion.as_str())
            .await?;
        Ok(self.establish(payload, "external"))
    }

    /// Drop the session: forget the persisted token and the user. Never fails.
    pub fn logout(&self) {
        self.forget();
        tracing::info!("Logged out");
    }

    fn establish(&self, payload: AuthPayload, method: &'static str) -> AuthPayload {
        self.persist(&payload.token);
        self.set_state(SessionState::Authenticated {
            token: payload.token.clone(),
            user: payload.user.clone(),
        });
        tracing::info!(user_id = %payload.user.id, method, "Signed in");
        payload
    }

    fn persist(&self, token: &SessionToken) {
        if let Err(e) = self.inner.store.save(token) {
            tracing::warn!(error = %e, "Could not persist session token");
        }
    }

    fn forget(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Could not clear persisted token");
        }
        self.set_state(SessionState::Unauthenticated);
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.send_replace(state);
    }
}
