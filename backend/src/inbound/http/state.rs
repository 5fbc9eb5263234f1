//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` and only depend on the
//! driving ports, so they stay testable against any store.

use std::sync::Arc;

use crate::domain::accounts::AccountsService;
use crate::domain::answers::AnswersService;
use crate::domain::notifications::NotificationsService;
use crate::domain::ports::ForumStore;
use crate::domain::questions::QuestionsService;
use crate::domain::{AccountsApi, AnswersApi, NotificationsApi, QuestionsApi};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountsApi>,
    pub questions: Arc<dyn QuestionsApi>,
    pub answers: Arc<dyn AnswersApi>,
    pub notifications: Arc<dyn NotificationsApi>,
}

impl HttpState {
    /// Build the full service stack over one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ForumStore + 'static,
    {
        Self {
            accounts: Arc::new(AccountsService::new(Arc::clone(&store))),
            questions: Arc::new(QuestionsService::new(Arc::clone(&store))),
            answers: Arc::new(AnswersService::new(Arc::clone(&store))),
            notifications: Arc::new(NotificationsService::new(store)),
        }
    }
}
