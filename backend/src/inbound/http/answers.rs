//! Answer handlers addressing answers directly by id.
//!
//! ```text
//! POST   /api/v1/answers/{id}/vote
//! PUT    /api/v1/answers/{id}
//! DELETE /api/v1/answers/{id}
//! ```
//!
//! Creation and listing live under `/questions/{id}/answers`.

use actix_web::{delete, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Answer, AnswerId, Error};
use crate::inbound::http::questions::VoteRequest;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// Answer edit request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnswerUpdateRequest {
    pub body: String,
}

fn answer_id(raw: Uuid) -> AnswerId {
    AnswerId::from_uuid(raw)
}

/// Toggle the caller's vote on the answer.
#[utoipa::path(
    post,
    path = "/api/v1/answers/{id}/vote",
    params(("id" = Uuid, Path, description = "Answer id")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Updated answer", body = Answer),
        (status = 400, description = "Invalid vote type", body = Error),
        (status = 403, description = "Own answer", body = Error),
        (status = 404, description = "No such answer", body = Error)
    ),
    tags = ["answers"],
    operation_id = "voteAnswer"
)]
#[post("/answers/{id}/vote")]
pub async fn vote_answer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<VoteRequest>,
) -> ApiResult<web::Json<Answer>> {
    let user_id = session.require_user_id()?;
    let direction = payload.direction()?;
    let answer = state
        .answers
        .vote(&user_id, &answer_id(*path), direction)
        .await?;
    Ok(web::Json(answer))
}

/// Edit the answer body. Owner only; a question lock does not block this.
#[utoipa::path(
    put,
    path = "/api/v1/answers/{id}",
    params(("id" = Uuid, Path, description = "Answer id")),
    request_body = AnswerUpdateRequest,
    responses(
        (status = 200, description = "Updated answer", body = Answer),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "No such answer", body = Error)
    ),
    tags = ["answers"],
    operation_id = "updateAnswer"
)]
#[put("/answers/{id}")]
pub async fn update_answer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<AnswerUpdateRequest>,
) -> ApiResult<web::Json<Answer>> {
    let user_id = session.require_user_id()?;
    let answer = state
        .answers
        .update(&user_id, &answer_id(*path), payload.into_inner().body)
        .await?;
    Ok(web::Json(answer))
}

/// Delete the answer along with its notifications.
#[utoipa::path(
    delete,
    path = "/api/v1/answers/{id}",
    params(("id" = Uuid, Path, description = "Answer id")),
    responses(
        (status = 204, description = "Answer deleted"),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "No such answer", body = Error)
    ),
    tags = ["answers"],
    operation_id = "deleteAnswer"
)]
#[delete("/answers/{id}")]
pub async fn delete_answer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state.answers.delete(&user_id, &answer_id(*path)).await?;
    Ok(HttpResponse::NoContent().finish())
}
