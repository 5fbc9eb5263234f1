//! Answer aggregate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::question::QuestionId;
use super::user::UserId;
use super::votes::{Votable, VoteSets};

/// Stable answer identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct AnswerId(Uuid);

impl AnswerId {
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

impl fmt::Display for AnswerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Answer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: AnswerId,
    pub body: String,
    /// Author of the answer. Field name matches the original document shape.
    #[serde(rename = "user")]
    pub owner: UserId,
    pub question: QuestionId,
    #[serde(default)]
    pub votes: VoteSets,
    /// Hide the author's name when rendering. The answer still has an owner
    /// for authorisation and counter purposes.
    #[serde(default)]
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency version, incremented on every write.
    #[serde(default)]
    pub version: u64,
}

impl Answer {
    /// Construct a new answer with no votes.
    pub fn new(
        body: impl Into<String>,
        owner: UserId,
        question: QuestionId,
        anonymous: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AnswerId::random(),
            body: body.into(),
            owner,
            question,
            votes: VoteSets::new(),
            anonymous,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Record a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Current number of up-votes held by the answer.
    pub fn upvote_count(&self) -> i64 {
        self.votes.up.len() as i64
    }
}

impl Votable for Answer {
    fn owner(&self) -> &UserId {
        &self.owner
    }

    fn votes(&self) -> &VoteSets {
        &self.votes
    }

    fn votes_mut(&mut self) -> &mut VoteSets {
        &mut self.votes
    }
}
