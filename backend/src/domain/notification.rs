//! Notifications emitted when a question receives an answer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::answer::AnswerId;
use super::question::QuestionId;
use super::user::UserId;

/// Stable notification identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
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

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Notification document.
///
/// ## Invariants
/// - At most one notification exists per (recipient, question, answer)
///   triple; the store enforces this inside the answer-creation transaction.
/// - Created only when the answer's author differs from the question's
///   author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub question: QuestionId,
    pub answer: AnswerId,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Construct an unread notification for the question owner.
    pub fn new(recipient: UserId, question: QuestionId, answer: AnswerId) -> Self {
        Self {
            id: NotificationId::random(),
            recipient,
            question,
            answer,
            read: false,
            created_at: Utc::now(),
        }
    }
}
