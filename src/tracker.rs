//! Typed client for the game tracker endpoints.
//!
//! Everything except [`Tracker::search_games`] goes through [`Session::request`], so a
//! rejected session is handled the same way as for any other authenticated call.

use derive_more::{Display, From, Into};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use time::Date;
use time::macros::format_description;

use crate::error::Error;
use crate::request::RequestOptions;
use crate::session::Session;
use crate::types::{ErrorBody, RecordId};

const GAMES_PATH: &str = "/api/games";
const USER_GAMES_PATH: &str = "/api/user/games";
const TIMELINE_PATH: &str = "/api/user/timeline";
const DISCOVER_PATH: &str = "/api/discover/all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct GameId(pub RecordId);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct EventId(pub RecordId);

/// A catalog game. Unmodelled fields are kept so the game can be sent back verbatim when
/// tracking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Game {
    pub id: GameId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Release date as sent by the backend (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(
        default,
        rename = "daysUntilRelease",
        skip_serializing_if = "Option::is_none"
    )]
    pub days_until_release: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<TimelineEvent>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Game {
    #[must_use]
    pub fn release_date(&self) -> Option<Date> {
        self.released.as_deref().and_then(parse_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum EventKind {
    Patch,
    Dlc,
    Expansion,
    Season,
    Movie,
    Show,
    Tournament,
    Irl,
    Ingame,
    #[serde(other)]
    Other,
}

/// One entry of the personalized timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TimelineEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub title: String,
    /// Event date as sent by the backend (`YYYY-MM-DD`, optionally followed by a time).
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "gameName", skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    #[serde(default, rename = "gameImage", skip_serializing_if = "Option::is_none")]
    pub game_image: Option<String>,
}

impl TimelineEvent {
    #[must_use]
    pub fn event_date(&self) -> Option<Date> {
        parse_date(&self.date)
    }

    /// Countdown relative to `today`, or `None` if the date cannot be parsed.
    #[must_use]
    pub fn countdown(&self, today: Date) -> Option<Countdown> {
        self.event_date()
            .map(|date| Countdown::from_days(days_until(date, today)))
    }
}

/// Relative position of an event date, in whole calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Past(u32),
    Today,
    Tomorrow,
    InDays(u32),
}

impl Countdown {
    #[must_use]
    pub fn from_days(days: i64) -> Self {
        let clamp = |d: i64| u32::try_from(d.unsigned_abs()).unwrap_or(u32::MAX);
        match days {
            d if d < 0 => Self::Past(clamp(d)),
            0 => Self::Today,
            1 => Self::Tomorrow,
            d => Self::InDays(clamp(d)),
        }
    }

    #[must_use]
    pub fn is_past(&self) -> bool {
        matches!(self, Self::Past(_))
    }
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Past(days) => write!(f, "{days} days ago"),
            Self::Today => f.write_str("Today!"),
            Self::Tomorrow => f.write_str("Tomorrow"),
            Self::InDays(days) => write!(f, "in {days} days"),
        }
    }
}

/// Whole days from `today` to `date`; negative when `date` is in the past.
#[must_use]
pub fn days_until(date: Date, today: Date) -> i64 {
    (date - today).whole_days()
}

/// Events whose kind is in `kinds` (all events when `kinds` is empty), earliest first.
/// Events with unparseable dates sort last.
#[must_use]
pub fn filter_events<'a>(
    events: &'a [TimelineEvent],
    kinds: &[EventKind],
) -> Vec<&'a TimelineEvent> {
    let mut selected: Vec<&TimelineEvent> = events
        .iter()
        .filter(|e| kinds.is_empty() || kinds.contains(&e.kind))
        .collect();
    selected.sort_by_key(|e| (e.event_date().is_none(), e.event_date()));
    selected
}

fn parse_date(s: &str) -> Option<Date> {
    let day = s.get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

#[derive(Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    events: Vec<TimelineEvent>,
}

#[derive(Serialize)]
struct TrackRequest<'a> {
    game: &'a Game,
}

/// Game search, tracking, and timeline calls for the signed-in user.
#[derive(Debug, Clone)]
pub struct Tracker {
    session: Session,
}

impl Tracker {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Search the public games catalog. Does not need a session.
    ///
    /// A blank query returns no results without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on a non-success status, or a transport error.
    pub async fn search_games(&self, query: &str) -> Result<Vec<Game>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let config = self.session.config();
        let timeout = config.timeout();
        let response = self
            .session
            .api()
            .http()
            .get(config.endpoint(GAMES_PATH)?)
            .query(&[("search", query)])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::transport(e, timeout))?;

        self.json(response).await
    }

    /// Games the user tracks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExpired`] if the session was rejected, [`Error::Api`] on
    /// another non-success status, or a transport error.
    pub async fn tracked_games(&self) -> Result<Vec<Game>, Error> {
        let response = self
            .session
            .request(USER_GAMES_PATH, RequestOptions::get())
            .await?;
        self.json(response).await
    }

    /// Start tracking `game`.
    ///
    /// # Errors
    ///
    /// Same as [`tracked_games`](Self::tracked_games).
    pub async fn track_game(&self, game: &Game) -> Result<(), Error> {
        let options = RequestOptions::post().with_json(&TrackRequest { game })?;
        let response = self.session.request(USER_GAMES_PATH, options).await?;
        self.ensure_success(response).await.map(drop)
    }

    /// Stop tracking the game with `id`.
    ///
    /// # Errors
    ///
    /// Same as [`tracked_games`](Self::tracked_games).
    pub async fn untrack_game(&self, id: &GameId) -> Result<(), Error> {
        let path = format!(
            "{USER_GAMES_PATH}/{}",
            urlencoding::encode(&id.to_string())
        );
        let response = self
            .session
            .request(&path, RequestOptions::delete())
            .await?;
        self.ensure_success(response).await.map(drop)
    }

    /// The user's timeline across all tracked games.
    ///
    /// # Errors
    ///
    /// Same as [`tracked_games`](Self::tracked_games).
    pub async fn timeline(&self) -> Result<Vec<TimelineEvent>, Error> {
        let response = self
            .session
            .request(TIMELINE_PATH, RequestOptions::get())
            .await?;
        let timeline: TimelineResponse = self.json(response).await?;
        Ok(timeline.events)
    }

    /// Ask the backend to discover new events for every tracked game.
    ///
    /// # Errors
    ///
    /// Same as [`tracked_games`](Self::tracked_games).
    pub async fn discover_all(&self) -> Result<(), Error> {
        let response = self
            .session
            .request(DISCOVER_PATH, RequestOptions::post())
            .await?;
        self.ensure_success(response).await.map(drop)
    }

    async fn json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, Error> {
        let response = self.ensure_success(response).await?;
        self.session.api().decode(response).await
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = ErrorBody::message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_owned()
        });
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}
