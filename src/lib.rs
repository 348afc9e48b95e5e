#![doc = include_str!("../README.md")]

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod request;
pub mod session;
pub mod storage;
#[cfg(feature = "tracker")]
pub mod tracker;
pub mod types;
pub mod validate;

// Re-exports for convenient access
pub use api::AuthApi;
pub use config::ClientConfig;
pub use error::Error;
pub use identity::{ExternalIdentity, IdentityAssertion};
pub use request::{RequestBody, RequestOptions};
pub use session::{Session, SessionState};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
#[cfg(feature = "tracker")]
pub use tracker::{
    Countdown, EventId, EventKind, Game, GameId, TimelineEvent, Tracker, days_until,
    filter_events,
};
pub use types::{AuthPayload, RecordId, SessionToken, User, UserId};
pub use validate::{RegistrationForm, is_valid_username};
