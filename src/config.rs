use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_ORIGIN: &str = "https://eventhorizon-backend-production.up.railway.app";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_KEY: &str = "token";
const DEFAULT_IDENTITY_WAIT: Duration = Duration::from_secs(5);

/// Backend connection settings for a [`Session`](crate::Session).
///
/// The origin is a constructor parameter; everything else has a default.
///
/// ```rust,ignore
/// use eventhorizon_session::ClientConfig;
///
/// let config = ClientConfig::new("http://localhost:5000".parse()?)
///     .with_timeout(std::time::Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) origin: Url,
    pub(crate) timeout: Duration,
    pub(crate) token_key: String,
    pub(crate) identity_wait: Duration,
    pub(crate) identity_client_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN.parse().expect("valid default URL"))
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            timeout: DEFAULT_TIMEOUT,
            token_key: DEFAULT_TOKEN_KEY.into(),
            identity_wait: DEFAULT_IDENTITY_WAIT,
            identity_client_id: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `EVENTHORIZON_API_URL`: backend origin (defaults to the production backend)
    /// - `EVENTHORIZON_TIMEOUT_SECS`: per-request timeout in seconds
    /// - `EVENTHORIZON_TOKEN_KEY`: key of the persisted token entry
    /// - `EVENTHORIZON_GOOGLE_CLIENT_ID`: client id for the external identity widget
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = match var("EVENTHORIZON_API_URL") {
            Some(url_str) => {
                let url: Url = url_str
                    .parse()
                    .map_err(|e| Error::Config(format!("EVENTHORIZON_API_URL: {e}")))?;
                Self::new(url)
            }
            None => Self::default(),
        };

        if let Some(secs) = var("EVENTHORIZON_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("EVENTHORIZON_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(key) = var("EVENTHORIZON_TOKEN_KEY") {
            if key.trim().is_empty() {
                return Err(Error::Config("EVENTHORIZON_TOKEN_KEY is empty".into()));
            }
            config = config.with_token_key(key);
        }
        if let Some(client_id) = var("EVENTHORIZON_GOOGLE_CLIENT_ID") {
            config = config.with_identity_client_id(client_id);
        }

        Ok(config)
    }

    /// Override the per-request timeout (default: 30s).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the key under which the token is persisted (default: `"token"`).
    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Override how long to wait for the external identity widget (default: 5s).
    #[must_use]
    pub fn with_identity_wait(mut self, wait: Duration) -> Self {
        self.identity_wait = wait;
        self
    }

    #[must_use]
    pub fn with_identity_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.identity_client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    #[must_use]
    pub fn identity_wait(&self) -> Duration {
        self.identity_wait
    }

    #[must_use]
    pub fn identity_client_id(&self) -> Option<&str> {
        self.identity_client_id.as_deref()
    }

    /// Resolves `path` against the origin by concatenation, so an origin path prefix survives.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.origin.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        joined
            .parse()
            .map_err(|e| Error::Config(format!("invalid request URL {joined}: {e}")))
    }
}
