use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::session::Session;

/// Body of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured body; serialized to JSON with `Content-Type: application/json`.
    Json(JsonValue),
    /// Pre-serialized body, sent as-is with the caller's headers.
    Text(String),
}

/// Per-call options for [`Session::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge `headers` into the options; later values win.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a structured body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` cannot be represented as JSON.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, Error> {
        Ok(self.with_json_value(serde_json::to_value(body)?))
    }

    #[must_use]
    pub fn with_json_value(mut self, body: JsonValue) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Attach a pre-serialized body.
    #[must_use]
    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

impl Session {
    /// Send an authenticated request to `origin + path`.
    ///
    /// The bearer token is attached (replacing any caller `Authorization` header). A
    /// [`RequestBody::Json`] body is serialized and labelled `application/json`.
    ///
    /// Responses other than 401/403 are returned untouched, error statuses included.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthenticated`] if there is no session; nothing is sent.
    /// - [`Error::SessionExpired`] on 401/403, after the session has been logged out. If the
    ///   session moved on to a different token while the call was in flight, it is kept.
    /// - [`Error::Http`] / [`Error::Timeout`] if the backend could not be reached.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response, Error> {
        let token = self.token().ok_or(Error::Unauthenticated)?;
        let timeout = self.config().timeout();
        let url = self.config().endpoint(path)?;

        let RequestOptions {
            method,
            mut headers,
            query,
            body,
        } = options;
        headers.remove(AUTHORIZATION);

        let mut builder = self.api().http().request(method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        match body {
            Some(RequestBody::Json(value)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                builder = builder.body(serde_json::to_vec(&value)?);
            }
            Some(RequestBody::Text(text)) => builder = builder.body(text),
            None => {}
        }

        let response = builder
            .headers(headers)
            .bearer_auth(token.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::transport(e, timeout))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // Only the token that was sent is dropped; a newer sign-in survives.
            if self.token().as_ref() == Some(&token) {
                tracing::warn!(%method, path, status = status.as_u16(), "Session rejected by backend");
                self.logout();
            } else {
                tracing::debug!(%method, path, status = status.as_u16(), "Stale token rejected");
            }
            return Err(Error::SessionExpired {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}
