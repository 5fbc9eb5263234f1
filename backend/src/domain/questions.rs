//! Question use-cases: CRUD, voting, and the lock state machine.

use std::sync::Arc;

use async_trait::async_trait;

use super::answer::Answer;
use super::error::Error;
use super::guard;
use super::ports::{CounterAdjustment, ForumStore, StoreError};
use super::question::{Question, QuestionId};
use super::user::{CounterDelta, UserId};
use super::votes::{self, VoteDirection, VoteError};

/// Attempts made on a versioned read-compute-write cycle before giving up.
pub(crate) const WRITE_RETRY_ATTEMPTS: usize = 3;

/// New question payload. Tags arrive already normalised (split, trimmed,
/// empties dropped).
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

/// Question edit payload.
#[derive(Debug, Clone)]
pub struct QuestionUpdate {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

/// Listing scope for [`QuestionsApi::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionView {
    /// Every question in the forum.
    All,
    /// Only questions owned by the given user.
    Owned(UserId),
}

/// A question together with its answers, in creation order.
#[derive(Debug, Clone)]
pub struct QuestionDetail {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// Driving port for question operations.
#[async_trait]
pub trait QuestionsApi: Send + Sync {
    /// Post a new question.
    async fn create(&self, owner: &UserId, input: NewQuestion) -> Result<Question, Error>;

    /// List questions, newest first.
    async fn list(&self, view: QuestionView) -> Result<Vec<Question>, Error>;

    /// Fetch one question with its answers.
    async fn get(&self, id: &QuestionId) -> Result<QuestionDetail, Error>;

    /// Edit title, body, and tags. Owner only; locked questions reject edits.
    async fn update(
        &self,
        actor: &UserId,
        id: &QuestionId,
        update: QuestionUpdate,
    ) -> Result<Question, Error>;

    /// Delete the question, cascading to its answers and notifications.
    async fn delete(&self, actor: &UserId, id: &QuestionId) -> Result<(), Error>;

    /// Toggle the actor's vote on the question.
    async fn vote(
        &self,
        actor: &UserId,
        id: &QuestionId,
        direction: VoteDirection,
    ) -> Result<Question, Error>;

    /// Move the question between the locked and unlocked states.
    async fn set_locked(
        &self,
        actor: &UserId,
        id: &QuestionId,
        locked: bool,
    ) -> Result<Question, Error>;
}

/// [`QuestionsApi`] implementation over a [`ForumStore`].
#[derive(Clone)]
pub struct QuestionsService<S> {
    store: Arc<S>,
}

impl<S> QuestionsService<S> {
    /// Create the service with its backing store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

pub(crate) fn map_vote_error(err: VoteError) -> Error {
    // Corrupted documents are a server-side bug signal; never auto-correct.
    Error::invariant_violation(err.to_string())
}

fn validate_text(title: &str, body: &str) -> Result<(), Error> {
    if title.trim().is_empty() {
        return Err(Error::invalid_request("title must not be empty"));
    }
    if body.trim().is_empty() {
        return Err(Error::invalid_request("body must not be empty"));
    }
    Ok(())
}

impl<S> QuestionsService<S>
where
    S: ForumStore,
{
    async fn load(&self, id: &QuestionId) -> Result<Question, Error> {
        self.store
            .find_question(id)
            .await?
            .ok_or_else(|| Error::not_found("question not found"))
    }
}

#[async_trait]
impl<S> QuestionsApi for QuestionsService<S>
where
    S: ForumStore,
{
    async fn create(&self, owner: &UserId, input: NewQuestion) -> Result<Question, Error> {
        validate_text(&input.title, &input.body)?;
        if self.store.find_user(owner).await?.is_none() {
            return Err(Error::unauthorized("account no longer exists"));
        }
        let question = Question::new(input.title, input.body, input.tags, *owner);
        let adjustment = CounterAdjustment::new(*owner, CounterDelta::questions_posted(1));
        self.store
            .insert_question(&question, std::slice::from_ref(&adjustment))
            .await?;
        Ok(question)
    }

    async fn list(&self, view: QuestionView) -> Result<Vec<Question>, Error> {
        let mut questions = match view {
            QuestionView::All => self.store.list_questions().await?,
            QuestionView::Owned(owner) => self.store.list_questions_by_owner(&owner).await?,
        };
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    async fn get(&self, id: &QuestionId) -> Result<QuestionDetail, Error> {
        let question = self.load(id).await?;
        let answers = self.store.answers_for_question(id).await?;
        Ok(QuestionDetail { question, answers })
    }

    async fn update(
        &self,
        actor: &UserId,
        id: &QuestionId,
        update: QuestionUpdate,
    ) -> Result<Question, Error> {
        validate_text(&update.title, &update.body)?;
        let mut question = self.load(id).await?;
        guard::can_edit_question(&question, actor)?;
        let expected = question.version;
        question.title = update.title;
        question.body = update.body;
        question.tags = update.tags;
        question.touch();
        self.store.save_question(&question, expected).await?;
        question.version = expected + 1;
        Ok(question)
    }

    async fn delete(&self, actor: &UserId, id: &QuestionId) -> Result<(), Error> {
        for _ in 0..WRITE_RETRY_ATTEMPTS {
            let question = self.load(id).await?;
            guard::can_delete_question(&question, actor)?;
            let adjustment = CounterAdjustment::new(
                question.owner,
                CounterDelta {
                    questions_posted: -1,
                    upvotes_received: -question.upvote_count(),
                    ..CounterDelta::default()
                },
            );
            match self
                .store
                .delete_question(id, question.version, std::slice::from_ref(&adjustment))
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict(
            "question is being modified concurrently; retry the deletion",
        ))
    }

    async fn vote(
        &self,
        actor: &UserId,
        id: &QuestionId,
        direction: VoteDirection,
    ) -> Result<Question, Error> {
        for _ in 0..WRITE_RETRY_ATTEMPTS {
            let mut question = self.load(id).await?;
            guard::can_vote_question(&question, actor)?;
            let expected = question.version;
            let outcome =
                votes::apply_vote(&mut question, actor, direction).map_err(map_vote_error)?;
            question.touch();

            let mut adjustments = Vec::with_capacity(2);
            if outcome.owner_delta != 0 {
                adjustments.push(CounterAdjustment::new(
                    question.owner,
                    CounterDelta::upvotes_received(outcome.owner_delta),
                ));
            }
            // Questions are the only entity tracking votes given by the voter.
            if outcome.voter_delta != 0 {
                adjustments.push(CounterAdjustment::new(
                    *actor,
                    CounterDelta::votes_given(outcome.voter_delta),
                ));
            }

            match self
                .store
                .persist_question_vote(&question, expected, &adjustments)
                .await
            {
                Ok(()) => {
                    question.version = expected + 1;
                    return Ok(question);
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict(
            "question is being voted on concurrently; retry the vote",
        ))
    }

    async fn set_locked(
        &self,
        actor: &UserId,
        id: &QuestionId,
        locked: bool,
    ) -> Result<Question, Error> {
        let mut question = self.load(id).await?;
        guard::can_lock_toggle(&question, actor)?;
        if question.locked == locked {
            return Ok(question);
        }
        let expected = question.version;
        question.locked = locked;
        question.touch();
        self.store.save_question(&question, expected).await?;
        question.version = expected + 1;
        Ok(question)
    }
}

#[cfg(test)]
#[path = "questions_tests.rs"]
mod tests;
