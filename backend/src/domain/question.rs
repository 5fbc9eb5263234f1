//! Question aggregate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::answer::AnswerId;
use super::user::UserId;
use super::votes::{Votable, VoteSets};

/// Stable question identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct QuestionId(Uuid);

impl QuestionId {
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

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Question document.
///
/// ## Invariants
/// - `votes.up` and `votes.down` are mutually exclusive per voter.
/// - `answers` holds the ids of every answer whose `question` field points
///   back here, in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Author of the question. Field name matches the original document
    /// shape.
    #[serde(rename = "user")]
    pub owner: UserId,
    #[serde(default)]
    pub answers: Vec<AnswerId>,
    #[serde(default)]
    pub votes: VoteSets,
    #[serde(default)]
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency version, incremented on every write.
    #[serde(default)]
    pub version: u64,
}

impl Question {
    /// Construct a new, unlocked question with no answers or votes.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
        owner: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: QuestionId::random(),
            title: title.into(),
            body: body.into(),
            tags,
            owner,
            answers: Vec::new(),
            votes: VoteSets::new(),
            locked: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Record a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Current number of up-votes held by the question.
    pub fn upvote_count(&self) -> i64 {
        self.votes.up.len() as i64
    }
}

impl Votable for Question {
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
