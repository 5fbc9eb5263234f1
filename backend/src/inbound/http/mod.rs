//! HTTP inbound adapter exposing the REST endpoints.

use actix_web::web;

pub mod answers;
pub mod error;
pub mod health;
pub mod notifications;
pub mod questions;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

/// Register every `/api/v1` endpoint on the given scope.
///
/// Shared by the server bootstrap and the integration tests so both always
/// serve the same route table.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(users::register)
        .service(users::login)
        .service(users::logout)
        .service(users::me)
        .service(users::update_profile)
        .service(users::update_settings)
        .service(users::audit_counters)
        .service(notifications::list_notifications)
        .service(notifications::mark_notifications_read)
        .service(questions::list_questions)
        .service(questions::create_question)
        .service(questions::get_question)
        .service(questions::update_question)
        .service(questions::delete_question)
        .service(questions::vote_question)
        .service(questions::lock_question)
        .service(questions::unlock_question)
        .service(questions::list_answers)
        .service(questions::post_answer)
        .service(answers::vote_answer)
        .service(answers::update_answer)
        .service(answers::delete_answer);
}
