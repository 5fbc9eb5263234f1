//! In-memory [`ForumStore`] adapter.
//!
//! Backs unit tests and ephemeral deployments. A single mutex guards all four
//! collections, which makes every composite operation trivially atomic and
//! mirrors the transaction boundaries of the SQLite adapter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::answer::{Answer, AnswerId};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::ports::{CounterAdjustment, ForumStore, StoreError};
use crate::domain::question::{Question, QuestionId};
use crate::domain::user::{User, UserId};

#[derive(Default)]
struct Collections {
    users: HashMap<UserId, User>,
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<AnswerId, Answer>,
    notifications: HashMap<NotificationId, Notification>,
}

impl Collections {
    fn apply_adjustments(&mut self, adjustments: &[CounterAdjustment]) {
        for adjustment in adjustments {
            // A counter for a deleted user has nowhere to land; drop it.
            if let Some(user) = self.users.get_mut(&adjustment.user) {
                user.counters.apply(adjustment.delta);
            }
        }
    }

    fn check_question_version(
        &self,
        id: &QuestionId,
        expected: u64,
    ) -> Result<&Question, StoreError> {
        let question = self
            .questions
            .get(id)
            .ok_or(StoreError::Missing { entity: "question" })?;
        if question.version != expected {
            return Err(StoreError::VersionConflict { entity: "question" });
        }
        Ok(question)
    }

    fn check_answer_version(&self, id: &AnswerId, expected: u64) -> Result<&Answer, StoreError> {
        let answer = self
            .answers
            .get(id)
            .ok_or(StoreError::Missing { entity: "answer" })?;
        if answer.version != expected {
            return Err(StoreError::VersionConflict { entity: "answer" });
        }
        Ok(answer)
    }
}

/// Mutex-guarded map-backed document store.
#[derive(Default)]
pub struct MemoryForumStore {
    collections: Mutex<Collections>,
}

impl MemoryForumStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::backend("store mutex poisoned"))
    }
}

#[async_trait]
impl ForumStore for MemoryForumStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        if store.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::duplicate("username"));
        }
        if store.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::duplicate("email"));
        }
        store.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        if !store.users.contains_key(&user.id) {
            return Err(StoreError::Missing { entity: "user" });
        }
        if store
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::duplicate("username"));
        }
        store.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn insert_question(
        &self,
        question: &Question,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.questions.insert(question.id, question.clone());
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn find_question(&self, id: &QuestionId) -> Result<Option<Question>, StoreError> {
        Ok(self.lock()?.questions.get(id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.lock()?.questions.values().cloned().collect())
    }

    async fn list_questions_by_owner(&self, owner: &UserId) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .lock()?
            .questions
            .values()
            .filter(|q| q.owner == *owner)
            .cloned()
            .collect())
    }

    async fn save_question(
        &self,
        question: &Question,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_question_version(&question.id, expected_version)?;
        let mut doc = question.clone();
        doc.version = expected_version + 1;
        store.questions.insert(doc.id, doc);
        Ok(())
    }

    async fn persist_question_vote(
        &self,
        question: &Question,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_question_version(&question.id, expected_version)?;
        let mut doc = question.clone();
        doc.version = expected_version + 1;
        store.questions.insert(doc.id, doc);
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn delete_question(
        &self,
        id: &QuestionId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_question_version(id, expected_version)?;
        store.notifications.retain(|_, n| n.question != *id);
        store.answers.retain(|_, a| a.question != *id);
        store.questions.remove(id);
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn insert_answer(
        &self,
        answer: &Answer,
        question_version: u64,
        notification: Option<&Notification>,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_question_version(&answer.question, question_version)?;
        {
            let question = store
                .questions
                .get_mut(&answer.question)
                .ok_or(StoreError::Missing { entity: "question" })?;
            question.answers.push(answer.id);
            question.version = question_version + 1;
        }
        store.answers.insert(answer.id, answer.clone());
        if let Some(notification) = notification {
            let exists = store.notifications.values().any(|n| {
                n.recipient == notification.recipient
                    && n.question == notification.question
                    && n.answer == notification.answer
            });
            if !exists {
                store
                    .notifications
                    .insert(notification.id, notification.clone());
            }
        }
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn find_answer(&self, id: &AnswerId) -> Result<Option<Answer>, StoreError> {
        Ok(self.lock()?.answers.get(id).cloned())
    }

    async fn answers_for_question(
        &self,
        question: &QuestionId,
    ) -> Result<Vec<Answer>, StoreError> {
        let mut answers: Vec<Answer> = self
            .lock()?
            .answers
            .values()
            .filter(|a| a.question == *question)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(answers)
    }

    async fn answers_by_user(&self, user: &UserId) -> Result<Vec<Answer>, StoreError> {
        Ok(self
            .lock()?
            .answers
            .values()
            .filter(|a| a.owner == *user)
            .cloned()
            .collect())
    }

    async fn save_answer(
        &self,
        answer: &Answer,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_answer_version(&answer.id, expected_version)?;
        let mut doc = answer.clone();
        doc.version = expected_version + 1;
        store.answers.insert(doc.id, doc);
        Ok(())
    }

    async fn persist_answer_vote(
        &self,
        answer: &Answer,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        store.check_answer_version(&answer.id, expected_version)?;
        let mut doc = answer.clone();
        doc.version = expected_version + 1;
        store.answers.insert(doc.id, doc);
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn delete_answer(
        &self,
        id: &AnswerId,
        expected_version: u64,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), StoreError> {
        let mut store = self.lock()?;
        let question_id = store.check_answer_version(id, expected_version)?.question;
        store.notifications.retain(|_, n| n.answer != *id);
        store.answers.remove(id);
        if let Some(question) = store.questions.get_mut(&question_id) {
            question.answers.retain(|a| a != id);
            question.version += 1;
        }
        store.apply_adjustments(adjustments);
        Ok(())
    }

    async fn user_has_answer(
        &self,
        question: &QuestionId,
        user: &UserId,
        exclude: Option<&AnswerId>,
    ) -> Result<bool, StoreError> {
        Ok(self.lock()?.answers.values().any(|a| {
            a.question == *question && a.owner == *user && Some(&a.id) != exclude
        }))
    }

    async fn notifications_for_recipient(
        &self,
        recipient: &UserId,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.recipient == *recipient)
            .cloned()
            .collect())
    }

    async fn mark_notifications_read(
        &self,
        recipient: &UserId,
        ids: Option<&[NotificationId]>,
    ) -> Result<usize, StoreError> {
        let mut store = self.lock()?;
        let mut changed = 0;
        for notification in store.notifications.values_mut() {
            if notification.recipient != *recipient || notification.read {
                continue;
            }
            if let Some(ids) = ids {
                if !ids.contains(&notification.id) {
                    continue;
                }
            }
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}
