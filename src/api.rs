use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::types::{
    AuthPayload, ErrorBody, ExternalIdentityRequest, LoginRequest, MeResponse, RegisterRequest,
    SessionToken, User,
};

pub(crate) const ME_PATH: &str = "/api/auth/me";
pub(crate) const LOGIN_PATH: &str = "/api/auth/login";
pub(crate) const REGISTER_PATH: &str = "/api/auth/register";
pub(crate) const EXTERNAL_IDENTITY_PATH: &str = "/api/auth/google";

/// Raw calls to the backend's authentication endpoints.
///
/// Stateless: nothing here touches the persisted token or the session state. Use
/// [`Session`](crate::Session) for the stateful flow.
#[derive(Debug, Clone)]
pub struct AuthApi {
    config: ClientConfig,
    http: reqwest::Client,
}

impl AuthApi {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve a bearer token to the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`]/[`Error::Timeout`] on transport failure, or
    /// [`Error::Authentication`] if the backend rejects the token.
    pub async fn current_user(&self, token: &SessionToken) -> Result<User, Error> {
        let response = self
            .http
            .get(self.config.endpoint(ME_PATH)?)
            .bearer_auth(token.as_str())
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| Error::transport(e, self.config.timeout))?;

        let response =
            Self::ensure_success(response, "current user", "Session verification failed").await?;
        let me: MeResponse = self.decode(response).await?;
        Ok(me.user)
    }

    /// Exchange email and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] with the backend's message on rejection, or a
    /// transport error if the backend could not be reached.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, Error> {
        self.exchange(
            LOGIN_PATH,
            &LoginRequest { email, password },
            "login",
            "Login failed",
        )
        .await
    }

    /// Create an account and receive a session token for it.
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
        self.exchange(
            REGISTER_PATH,
            &RegisterRequest {
                email,
                username,
                password,
            },
            "register",
            "Registration failed",
        )
        .await
    }

    /// Exchange a third-party identity assertion for a session token.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn exchange_external_identity(
        &self,
        credential: &str,
    ) -> Result<AuthPayload, Error> {
        self.exchange(
            EXTERNAL_IDENTITY_PATH,
            &ExternalIdentityRequest { credential },
            "external identity",
            "Google sign-in failed",
        )
        .await
    }

    async fn exchange<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
        fallback: &'static str,
    ) -> Result<AuthPayload, Error> {
        let response = self
            .http
            .post(self.config.endpoint(path)?)
            .json(body)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| Error::transport(e, self.config.timeout))?;

        let response = Self::ensure_success(response, operation, fallback).await?;
        self.decode(response).await
    }

    pub(crate) async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, Error> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::transport(e, self.config.timeout))
    }

    /// Checks HTTP response status; returns the response on success or the backend's
    /// `error` message (or `fallback`) on failure.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
        fallback: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = ErrorBody::message(&body).unwrap_or_else(|| fallback.to_owned());
        tracing::debug!(operation, status, "Backend rejected credential call");
        Err(Error::Authentication {
            operation,
            status,
            message,
        })
    }
}
