//! Account use-cases: registration, login, profile, password changes, and the
//! on-demand counter audit.

use std::collections::BTreeSet;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use super::answer::Answer;
use super::error::Error;
use super::ports::{ForumStore, StoreError};
use super::question::Question;
use super::user::{User, UserCounters, UserId};

/// Minimum accepted password length, as in the original validators.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Registration payload.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Profile mutation payload.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub bio: String,
    pub profile_pic: Option<String>,
}

/// Password change payload.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Result of recomputing a user's counters from source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterAudit {
    /// Counters as maintained incrementally.
    pub stored: UserCounters,
    /// Counters recomputed by scanning questions, answers, and vote sets.
    pub computed: UserCounters,
}

impl CounterAudit {
    /// True when the incremental counters have drifted from ground truth.
    pub fn drifted(&self) -> bool {
        self.stored != self.computed
    }
}

/// Driving port for account operations.
#[async_trait]
pub trait AccountsApi: Send + Sync {
    /// Register a new user and return the stored document.
    async fn register(&self, registration: Registration) -> Result<User, Error>;

    /// Authenticate by email and password.
    async fn login(&self, email: &str, password: &str) -> Result<User, Error>;

    /// Fetch the authenticated user's document.
    async fn current_user(&self, id: &UserId) -> Result<User, Error>;

    /// Update username, bio, and optionally the profile picture URL.
    async fn update_profile(&self, id: &UserId, update: ProfileUpdate) -> Result<User, Error>;

    /// Change the password after verifying the current one.
    async fn change_password(&self, id: &UserId, change: PasswordChange) -> Result<(), Error>;

    /// Recompute the user's counters from source records, logging any drift.
    async fn audit_counters(&self, id: &UserId) -> Result<CounterAudit, Error>;
}

/// [`AccountsApi`] implementation over a [`ForumStore`].
#[derive(Clone)]
pub struct AccountsService<S> {
    store: Arc<S>,
}

impl<S> AccountsService<S> {
    /// Create the service with its backing store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::internal(format!("password hashing failed: {err}")))
}

fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| Error::internal(format!("stored password hash is invalid: {err}")))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

fn validate_registration(registration: &Registration) -> Result<(), Error> {
    let mut problems = Vec::new();
    if registration.username.trim().is_empty() {
        problems.push("username must not be empty");
    }
    if registration.email.trim().is_empty() {
        problems.push("email must not be empty");
    }
    if registration.password.len() < PASSWORD_MIN_LEN {
        problems.push("password must be at least 6 characters");
    }
    if registration.password != registration.password_confirmation {
        problems.push("passwords do not match");
    }
    match problems.first() {
        None => Ok(()),
        Some(first) => {
            Err(Error::invalid_request(*first).with_details(json!({ "errors": problems })))
        }
    }
}

fn validate_password_change(change: &PasswordChange) -> Result<(), Error> {
    let mut problems = Vec::new();
    if change.current_password.is_empty()
        || change.new_password.is_empty()
        || change.confirm_password.is_empty()
    {
        problems.push("please fill in all fields");
    }
    if change.new_password.len() < PASSWORD_MIN_LEN {
        problems.push("new password must be at least 6 characters");
    }
    if change.new_password != change.confirm_password {
        problems.push("new password and confirmation do not match");
    }
    match problems.first() {
        None => Ok(()),
        Some(first) => {
            Err(Error::invalid_request(*first).with_details(json!({ "errors": problems })))
        }
    }
}

#[async_trait]
impl<S> AccountsApi for AccountsService<S>
where
    S: ForumStore,
{
    async fn register(&self, registration: Registration) -> Result<User, Error> {
        validate_registration(&registration)?;
        let password_hash = hash_password(&registration.password)?;
        let user = User::new(
            registration.username.trim(),
            registration.email.trim(),
            password_hash,
        );
        match self.store.insert_user(&user).await {
            Ok(()) => Ok(user),
            Err(StoreError::Duplicate { field }) => {
                Err(Error::conflict(format!("{field} is already registered")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let user = self.store.find_user_by_email(email).await?;
        let Some(user) = user else {
            return Err(Error::unauthorized("invalid email or password"));
        };
        if !verify_password(&user.password_hash, password)? {
            return Err(Error::unauthorized("invalid email or password"));
        }
        Ok(user)
    }

    async fn current_user(&self, id: &UserId) -> Result<User, Error> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))
    }

    async fn update_profile(&self, id: &UserId, update: ProfileUpdate) -> Result<User, Error> {
        if update.username.trim().is_empty() {
            return Err(Error::invalid_request("username must not be empty"));
        }
        let mut user = self.current_user(id).await?;
        user.username = update.username.trim().to_owned();
        user.bio = update.bio;
        if let Some(profile_pic) = update.profile_pic {
            user.profile_pic = profile_pic;
        }
        user.touch();
        match self.store.update_user(&user).await {
            Ok(()) => Ok(user),
            Err(StoreError::Duplicate { field }) => {
                Err(Error::conflict(format!("{field} is already taken")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn change_password(&self, id: &UserId, change: PasswordChange) -> Result<(), Error> {
        validate_password_change(&change)?;
        let mut user = self.current_user(id).await?;
        if !verify_password(&user.password_hash, &change.current_password)? {
            return Err(Error::invalid_request("current password is incorrect"));
        }
        user.password_hash = hash_password(&change.new_password)?;
        user.touch();
        self.store.update_user(&user).await?;
        Ok(())
    }

    async fn audit_counters(&self, id: &UserId) -> Result<CounterAudit, Error> {
        let user = self.current_user(id).await?;

        let owned_questions = self.store.list_questions_by_owner(id).await?;
        let owned_answers = self.store.answers_by_user(id).await?;
        let all_questions = self.store.list_questions().await?;

        let answered: BTreeSet<_> = owned_answers.iter().map(|a| a.question).collect();
        let upvotes_received = owned_questions
            .iter()
            .map(Question::upvote_count)
            .chain(owned_answers.iter().map(Answer::upvote_count))
            .sum();
        let votes_given = all_questions
            .iter()
            .filter(|q| q.votes.has_upvoted(id) || q.votes.has_downvoted(id))
            .count() as i64;

        let computed = UserCounters {
            questions_posted: owned_questions.len() as i64,
            questions_answered: answered.len() as i64,
            upvotes_received,
            votes_given,
        };
        let audit = CounterAudit {
            stored: user.counters,
            computed,
        };
        if audit.drifted() {
            warn!(
                user = %id,
                stored = ?audit.stored,
                computed = ?audit.computed,
                "aggregate counters drifted from ground truth"
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
