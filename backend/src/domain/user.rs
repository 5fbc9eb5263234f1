//! User aggregate: identity, credentials, profile, and denormalised counters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stable user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Denormalised per-user aggregate counters.
///
/// These are a cache of ground truth derivable by scanning questions, answers,
/// and vote sets; they are maintained incrementally by the services and can be
/// audited on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserCounters {
    /// Questions currently posted by the user.
    #[serde(rename = "questionsPostedCount")]
    pub questions_posted: i64,
    /// Distinct questions the user has answered at least once.
    #[serde(rename = "questionsAnsweredCount")]
    pub questions_answered: i64,
    /// Up-votes currently held across the user's questions and answers.
    #[serde(rename = "upvotesReceived")]
    pub upvotes_received: i64,
    /// Questions the user currently holds a vote on (either direction).
    #[serde(rename = "votesGivenCount")]
    pub votes_given: i64,
}

impl UserCounters {
    /// Apply a signed adjustment to each counter.
    pub fn apply(&mut self, delta: CounterDelta) {
        self.questions_posted += delta.questions_posted;
        self.questions_answered += delta.questions_answered;
        self.upvotes_received += delta.upvotes_received;
        self.votes_given += delta.votes_given;
    }
}

/// Signed adjustment applied to a user's [`UserCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub questions_posted: i64,
    pub questions_answered: i64,
    pub upvotes_received: i64,
    pub votes_given: i64,
}

impl CounterDelta {
    /// Adjustment touching only `upvotesReceived`.
    pub fn upvotes_received(delta: i64) -> Self {
        Self {
            upvotes_received: delta,
            ..Self::default()
        }
    }

    /// Adjustment touching only `votesGivenCount`.
    pub fn votes_given(delta: i64) -> Self {
        Self {
            votes_given: delta,
            ..Self::default()
        }
    }

    /// Adjustment touching only `questionsPostedCount`.
    pub fn questions_posted(delta: i64) -> Self {
        Self {
            questions_posted: delta,
            ..Self::default()
        }
    }

    /// Adjustment touching only `questionsAnsweredCount`.
    pub fn questions_answered(delta: i64) -> Self {
        Self {
            questions_answered: delta,
            ..Self::default()
        }
    }

    /// True when every component is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Default avatar served when the user has not set a profile picture.
pub const DEFAULT_AVATAR: &str = "/default-avatar.png";

/// Application user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC-format hash of the user's password. Never serialised to
    /// API responses; the inbound adapter maps users to a response DTO.
    pub password_hash: String,
    #[serde(default)]
    pub bio: String,
    pub profile_pic: String,
    #[serde(flatten)]
    pub counters: UserCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Construct a freshly registered user with zeroed counters.
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::random(),
            username: username.into(),
            email: email.into(),
            password_hash,
            bio: String::new(),
            profile_pic: DEFAULT_AVATAR.to_owned(),
            counters: UserCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a profile or credential mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_serialise_with_original_field_names() {
        let user = User::new("ada", "ada@example.org", "hash".to_owned());
        let value = serde_json::to_value(&user).expect("serialise user");
        assert_eq!(value["questionsPostedCount"], 0);
        assert_eq!(value["questionsAnsweredCount"], 0);
        assert_eq!(value["upvotesReceived"], 0);
        assert_eq!(value["votesGivenCount"], 0);
        assert_eq!(value["profilePic"], DEFAULT_AVATAR);
    }

    #[test]
    fn counter_delta_applies_componentwise() {
        let mut counters = UserCounters::default();
        counters.apply(CounterDelta::upvotes_received(2));
        counters.apply(CounterDelta::questions_posted(1));
        counters.apply(CounterDelta::upvotes_received(-1));
        assert_eq!(counters.upvotes_received, 1);
        assert_eq!(counters.questions_posted, 1);
        assert_eq!(counters.votes_given, 0);
    }
}
