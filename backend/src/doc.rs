//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] generates the OpenAPI specification for the REST API: every
//! endpoint from the inbound layer, the domain and request schemas, and the
//! session cookie security scheme. The document is served at
//! `GET /api-docs/openapi.json`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{
    accounts::CounterAudit, Answer, Error, ErrorCode, Notification, Question, UserCounters,
    VoteDirection, VoteSets,
};
use crate::inbound::http::answers::AnswerUpdateRequest;
use crate::inbound::http::notifications::{MarkReadRequest, MarkReadResponse};
use crate::inbound::http::questions::{
    AnonymousFlag, AnswerRequest, QuestionDetailResponse, QuestionRequest, TagsInput, VoteRequest,
};
use crate::inbound::http::users::{
    LoginRequest, ProfileRequest, RegisterRequest, SettingsRequest, UserResponse,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Quorum backend API",
        description = "HTTP interface for the Q&A forum: accounts, questions, answers, votes, and notifications."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::register,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::me,
        crate::inbound::http::users::update_profile,
        crate::inbound::http::users::update_settings,
        crate::inbound::http::users::audit_counters,
        crate::inbound::http::notifications::list_notifications,
        crate::inbound::http::notifications::mark_notifications_read,
        crate::inbound::http::questions::list_questions,
        crate::inbound::http::questions::create_question,
        crate::inbound::http::questions::get_question,
        crate::inbound::http::questions::update_question,
        crate::inbound::http::questions::delete_question,
        crate::inbound::http::questions::vote_question,
        crate::inbound::http::questions::lock_question,
        crate::inbound::http::questions::unlock_question,
        crate::inbound::http::questions::list_answers,
        crate::inbound::http::questions::post_answer,
        crate::inbound::http::answers::vote_answer,
        crate::inbound::http::answers::update_answer,
        crate::inbound::http::answers::delete_answer,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Question,
        Answer,
        Notification,
        UserCounters,
        VoteDirection,
        VoteSets,
        CounterAudit,
        UserResponse,
        RegisterRequest,
        LoginRequest,
        ProfileRequest,
        SettingsRequest,
        QuestionRequest,
        QuestionDetailResponse,
        TagsInput,
        AnonymousFlag,
        AnswerRequest,
        AnswerUpdateRequest,
        VoteRequest,
        MarkReadRequest,
        MarkReadResponse,
    )),
    tags(
        (name = "auth", description = "Registration, login, and logout"),
        (name = "users", description = "Accounts, sessions, and profiles"),
        (name = "questions", description = "Questions, votes, and locks"),
        (name = "answers", description = "Answers and answer votes"),
        (name = "notifications", description = "The notification inbox"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
