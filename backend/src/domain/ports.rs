//! Driven port between the domain services and the document store.
//!
//! The store exposes plain document reads plus a small set of composite
//! writes. Each composite write commits as one atomic transaction so the
//! vote-set/counter and answer/notification/counter pairings can never be
//! observed half-applied. Writes against versioned documents take the
//! version the caller read and fail with [`StoreError::VersionConflict`]
//! when the document moved underneath them; services retry the
//! read-compute-write cycle.

use async_trait::async_trait;
use thiserror::Error as ThisError;

use super::answer::{Answer, AnswerId};
use super::error::Error;
use super::notification::{Notification, NotificationId};
use super::question::{Question, QuestionId};
use super::user::{CounterDelta, User, UserId};

/// Errors surfaced by [`ForumStore`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StoreError {
    /// A unique field (username, email) is already taken.
    #[error("duplicate value for unique field {field}")]
    Duplicate { field: String },
    /// A versioned write lost the race against a concurrent mutation.
    #[error("{entity} was modified concurrently")]
    VersionConflict { entity: &'static str },
    /// A referenced document is gone.
    #[error("{entity} no longer exists")]
    Missing { entity: &'static str },
    /// Storage backend failure.
    #[error("store backend failure: {message}")]
    Backend { message: String },
    /// A document could not be encoded or decoded.
    #[error("document serialisation failed: {message}")]
    Serialization { message: String },
}

impl StoreError {
    /// Helper for duplicate-unique-field failures.
    pub fn duplicate(field: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
        }
    }

    /// Helper for backend failures.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Helper for serialisation failures.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => Self::conflict(format!("{field} is already taken")),
            StoreError::VersionConflict { entity } => {
                Self::conflict(format!("{entity} was modified concurrently"))
            }
            StoreError::Missing { entity } => Self::not_found(format!("{entity} not found")),
            StoreError::Backend { message } => {
                Self::service_unavailable(format!("store unavailable: {message}"))
            }
            StoreError::Serialization { message } => {
                Self::internal(format!("document serialisation failed: {message}"))
            }
        }
    }
}

/// A counter adjustment for one user, applied inside the same transaction as
/// the write that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterAdjustment {
    pub user: UserId,
    pub delta: CounterDelta,
}

impl CounterAdjustment {
    /// Pair a user with a delta.
    pub fn new(user: UserId, delta: CounterDelta) -> Self {
        Self { user, delta }
    }
}

/// Persistence port for the forum's four document collections.
///
/// Versioned-write convention: methods taking `expected_version` compare it
/// against the stored document and, on success, persist the supplied document
/// with `version = expected_version + 1`.
#[async_trait]
pub trait ForumStore: Send + Sync {
    // Users.

    /// Insert a new user; fails with [`StoreError::Duplicate`] when the
    /// username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Fetch a user by id.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Fetch a user by email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Replace a user document; fails with [`StoreError::Duplicate`] when the
    /// new username collides with another user's.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    // Questions.

    /// Insert a question and apply the given counter adjustments atomically.
    async fn insert_question(
        &self,
        question: &Question,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    /// Fetch a question by id.
    async fn find_question(&self, id: &QuestionId) -> Result<Option<Question>, StoreError>;

    /// All questions, unordered.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;

    /// All questions owned by the given user, unordered.
    async fn list_questions_by_owner(&self, owner: &UserId) -> Result<Vec<Question>, StoreError>;

    /// Versioned replace of a question document.
    async fn save_question(
        &self,
        question: &Question,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Versioned replace of a question's vote sets together with the counter
    /// adjustments the vote implies.
    async fn persist_question_vote(
        &self,
        question: &Question,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    /// Cascade-delete a question: first every notification referencing the
    /// question or one of its answers, then the answers, then the question
    /// itself, then the counter adjustments. One transaction.
    async fn delete_question(
        &self,
        id: &QuestionId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    // Answers.

    /// Insert an answer: appends the answer id to the parent question
    /// (versioned), optionally inserts a notification unless one already
    /// exists for its (recipient, question, answer) triple, and applies the
    /// counter adjustments. One transaction.
    async fn insert_answer(
        &self,
        answer: &Answer,
        question_version: u64,
        notification: Option<&Notification>,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    /// Fetch an answer by id.
    async fn find_answer(&self, id: &AnswerId) -> Result<Option<Answer>, StoreError>;

    /// All answers on the given question, in creation order.
    async fn answers_for_question(
        &self,
        question: &QuestionId,
    ) -> Result<Vec<Answer>, StoreError>;

    /// All answers written by the given user, unordered.
    async fn answers_by_user(&self, user: &UserId) -> Result<Vec<Answer>, StoreError>;

    /// Versioned replace of an answer document.
    async fn save_answer(&self, answer: &Answer, expected_version: u64)
        -> Result<(), StoreError>;

    /// Versioned replace of an answer's vote sets together with the counter
    /// adjustments the vote implies.
    async fn persist_answer_vote(
        &self,
        answer: &Answer,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    /// Delete an answer: removes it from the parent question's answer list,
    /// deletes notifications referencing it, and applies the counter
    /// adjustments. One transaction, versioned on the answer.
    async fn delete_answer(
        &self,
        id: &AnswerId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError>;

    /// Does the user have an answer on the question, other than `exclude`?
    async fn user_has_answer(
        &self,
        question: &QuestionId,
        user: &UserId,
        exclude: Option<&AnswerId>,
    ) -> Result<bool, StoreError>;

    // Notifications.

    /// All notifications addressed to the recipient, unordered.
    async fn notifications_for_recipient(
        &self,
        recipient: &UserId,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Mark notifications read. With `ids`, only the recipient's own unread
    /// notifications among them are touched; without, all of the recipient's
    /// unread notifications are. Returns how many documents changed.
    async fn mark_notifications_read(
        &self,
        recipient: &UserId,
        ids: Option<&[NotificationId]>,
    ) -> Result<usize, StoreError>;
}
