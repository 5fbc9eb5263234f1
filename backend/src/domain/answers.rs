//! Answer use-cases: posting (with notification emission and first-answer
//! counter semantics), voting, editing, and deletion.

use std::sync::Arc;

use async_trait::async_trait;

use super::answer::{Answer, AnswerId};
use super::error::Error;
use super::guard;
use super::notification::Notification;
use super::ports::{CounterAdjustment, ForumStore, StoreError};
use super::question::QuestionId;
use super::questions::{map_vote_error, WRITE_RETRY_ATTEMPTS};
use super::user::{CounterDelta, UserId};
use super::votes::{self, VoteDirection};

/// New answer payload. The anonymity flag has already been coerced from its
/// wire forms (boolean `true` or the literal string `"true"`).
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub body: String,
    pub anonymous: bool,
}

/// Driving port for answer operations.
#[async_trait]
pub trait AnswersApi: Send + Sync {
    /// Answer a question. Rejects self-answers and locked questions; emits at
    /// most one notification for the question owner.
    async fn post(
        &self,
        actor: &UserId,
        question: &QuestionId,
        input: NewAnswer,
    ) -> Result<Answer, Error>;

    /// All answers on a question, in creation order.
    async fn list_for_question(&self, question: &QuestionId) -> Result<Vec<Answer>, Error>;

    /// Toggle the actor's vote on the answer.
    async fn vote(
        &self,
        actor: &UserId,
        id: &AnswerId,
        direction: VoteDirection,
    ) -> Result<Answer, Error>;

    /// Edit the answer body. Owner only; not blocked by a question lock.
    async fn update(&self, actor: &UserId, id: &AnswerId, body: String) -> Result<Answer, Error>;

    /// Delete the answer, its notifications, and adjust the owner's counters.
    async fn delete(&self, actor: &UserId, id: &AnswerId) -> Result<(), Error>;
}

/// [`AnswersApi`] implementation over a [`ForumStore`].
#[derive(Clone)]
pub struct AnswersService<S> {
    store: Arc<S>,
}

impl<S> AnswersService<S> {
    /// Create the service with its backing store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> AnswersService<S>
where
    S: ForumStore,
{
    async fn load(&self, id: &AnswerId) -> Result<Answer, Error> {
        self.store
            .find_answer(id)
            .await?
            .ok_or_else(|| Error::not_found("answer not found"))
    }
}

#[async_trait]
impl<S> AnswersApi for AnswersService<S>
where
    S: ForumStore,
{
    async fn post(
        &self,
        actor: &UserId,
        question_id: &QuestionId,
        input: NewAnswer,
    ) -> Result<Answer, Error> {
        if input.body.trim().is_empty() {
            return Err(Error::invalid_request("body must not be empty"));
        }
        for _ in 0..WRITE_RETRY_ATTEMPTS {
            let question = self
                .store
                .find_question(question_id)
                .await?
                .ok_or_else(|| Error::not_found("question not found"))?;
            guard::can_answer(&question, actor)?;

            let first_answer = !self
                .store
                .user_has_answer(question_id, actor, None)
                .await?;
            let answer = Answer::new(input.body.clone(), *actor, *question_id, input.anonymous);

            // The guard already rejected self-answers; the emitter still
            // checks, as the invariant belongs to it.
            let notification = (question.owner != *actor)
                .then(|| Notification::new(question.owner, *question_id, answer.id));

            let adjustments = if first_answer {
                vec![CounterAdjustment::new(
                    *actor,
                    CounterDelta::questions_answered(1),
                )]
            } else {
                Vec::new()
            };

            match self
                .store
                .insert_answer(
                    &answer,
                    question.version,
                    notification.as_ref(),
                    &adjustments,
                )
                .await
            {
                Ok(()) => return Ok(answer),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict(
            "question is being modified concurrently; retry the answer",
        ))
    }

    async fn list_for_question(&self, question: &QuestionId) -> Result<Vec<Answer>, Error> {
        if self.store.find_question(question).await?.is_none() {
            return Err(Error::not_found("question not found"));
        }
        Ok(self.store.answers_for_question(question).await?)
    }

    async fn vote(
        &self,
        actor: &UserId,
        id: &AnswerId,
        direction: VoteDirection,
    ) -> Result<Answer, Error> {
        for _ in 0..WRITE_RETRY_ATTEMPTS {
            let mut answer = self.load(id).await?;
            guard::can_vote_answer(&answer, actor)?;
            let expected = answer.version;
            let outcome =
                votes::apply_vote(&mut answer, actor, direction).map_err(map_vote_error)?;
            answer.touch();

            // Answers adjust only the owner's received-upvote counter; the
            // votes-given counter is a question-only concept.
            let adjustments = if outcome.owner_delta != 0 {
                vec![CounterAdjustment::new(
                    answer.owner,
                    CounterDelta::upvotes_received(outcome.owner_delta),
                )]
            } else {
                Vec::new()
            };

            match self
                .store
                .persist_answer_vote(&answer, expected, &adjustments)
                .await
            {
                Ok(()) => {
                    answer.version = expected + 1;
                    return Ok(answer);
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict(
            "answer is being voted on concurrently; retry the vote",
        ))
    }

    async fn update(&self, actor: &UserId, id: &AnswerId, body: String) -> Result<Answer, Error> {
        if body.trim().is_empty() {
            return Err(Error::invalid_request("body must not be empty"));
        }
        let mut answer = self.load(id).await?;
        guard::can_edit_answer(&answer.owner, actor)?;
        let expected = answer.version;
        answer.body = body;
        answer.touch();
        self.store.save_answer(&answer, expected).await?;
        answer.version = expected + 1;
        Ok(answer)
    }

    async fn delete(&self, actor: &UserId, id: &AnswerId) -> Result<(), Error> {
        for _ in 0..WRITE_RETRY_ATTEMPTS {
            let answer = self.load(id).await?;
            guard::can_delete_answer(&answer.owner, actor)?;

            let another_remains = self
                .store
                .user_has_answer(&answer.question, actor, Some(id))
                .await?;
            let adjustment = CounterAdjustment::new(
                answer.owner,
                CounterDelta {
                    questions_answered: if another_remains { 0 } else { -1 },
                    upvotes_received: -answer.upvote_count(),
                    ..CounterDelta::default()
                },
            );

            match self
                .store
                .delete_answer(id, answer.version, std::slice::from_ref(&adjustment))
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict(
            "answer is being modified concurrently; retry the deletion",
        ))
    }
}

#[cfg(test)]
#[path = "answers_tests.rs"]
mod tests;
