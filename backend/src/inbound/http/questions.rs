//! Question handlers.
//!
//! ```text
//! GET    /api/v1/questions            (?view=mine)
//! POST   /api/v1/questions
//! GET    /api/v1/questions/{id}
//! PUT    /api/v1/questions/{id}
//! DELETE /api/v1/questions/{id}
//! POST   /api/v1/questions/{id}/vote
//! POST   /api/v1/questions/{id}/lock
//! POST   /api/v1/questions/{id}/unlock
//! GET    /api/v1/questions/{id}/answers
//! POST   /api/v1/questions/{id}/answers
//! ```

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::answers::NewAnswer;
use crate::domain::questions::{NewQuestion, QuestionUpdate, QuestionView};
use crate::domain::votes::VoteDirection;
use crate::domain::{Answer, Error, Question, QuestionId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// Tags arrive either as a JSON list or as one comma-separated string.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    /// Split, trim, and drop empty entries.
    pub fn normalise(self) -> Vec<String> {
        let raw = match self {
            Self::List(tags) => tags,
            Self::Csv(csv) => csv.split(',').map(str::to_owned).collect(),
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_owned())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

/// The `anonymous` flag accepts boolean `true` or the literal string
/// `"true"`; every other JSON value means false rather than a client error.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum AnonymousFlag {
    Bool(bool),
    Text(String),
    Other(serde_json::Value),
}

impl AnonymousFlag {
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Text(text) => text == "true",
            Self::Other(_) => false,
        }
    }
}

/// Question create/update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}

/// Vote request body. `voteType` must be exactly `up` or `down`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: String,
}

impl VoteRequest {
    /// Parse the direction, rejecting anything but the two literals.
    pub fn direction(&self) -> Result<VoteDirection, Error> {
        self.vote_type.parse::<VoteDirection>().map_err(|err| {
            Error::invalid_request(err.to_string())
                .with_details(json!({ "field": "voteType", "value": self.vote_type }))
        })
    }
}

/// Answer create request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnswerRequest {
    pub body: String,
    #[serde(default)]
    pub anonymous: Option<AnonymousFlag>,
}

/// A question together with its answers.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionDetailResponse {
    pub question: Question,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    view: Option<String>,
}

fn question_id(raw: Uuid) -> QuestionId {
    QuestionId::from_uuid(raw)
}

/// List questions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/questions",
    params(("view" = Option<String>, Query, description = "`mine` restricts to the caller's questions")),
    responses(
        (status = 200, description = "Questions", body = [Question]),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["questions"],
    operation_id = "listQuestions"
)]
#[get("/questions")]
pub async fn list_questions(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<Vec<Question>>> {
    let user_id = session.require_user_id()?;
    let view = match query.view.as_deref() {
        Some("mine") => QuestionView::Owned(user_id),
        _ => QuestionView::All,
    };
    let questions = state.questions.list(view).await?;
    Ok(web::Json(questions))
}

/// Post a new question.
#[utoipa::path(
    post,
    path = "/api/v1/questions",
    request_body = QuestionRequest,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 400, description = "Invalid question", body = Error),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["questions"],
    operation_id = "createQuestion"
)]
#[post("/questions")]
pub async fn create_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<QuestionRequest>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let payload = payload.into_inner();
    let question = state
        .questions
        .create(
            &user_id,
            NewQuestion {
                title: payload.title,
                body: payload.body,
                tags: payload.tags.map(TagsInput::normalise).unwrap_or_default(),
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(question))
}

/// Fetch one question with its answers in creation order.
#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question detail", body = QuestionDetailResponse),
        (status = 404, description = "No such question", body = Error)
    ),
    tags = ["questions"],
    operation_id = "getQuestion"
)]
#[get("/questions/{id}")]
pub async fn get_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<QuestionDetailResponse>> {
    session.require_user_id()?;
    let detail = state.questions.get(&question_id(*path)).await?;
    Ok(web::Json(QuestionDetailResponse {
        question: detail.question,
        answers: detail.answers,
    }))
}

/// Edit title, body, and tags. Owner only; locked questions reject edits.
#[utoipa::path(
    put,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 403, description = "Not the owner, or locked", body = Error),
        (status = 404, description = "No such question", body = Error)
    ),
    tags = ["questions"],
    operation_id = "updateQuestion"
)]
#[put("/questions/{id}")]
pub async fn update_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<QuestionRequest>,
) -> ApiResult<web::Json<Question>> {
    let user_id = session.require_user_id()?;
    let payload = payload.into_inner();
    let question = state
        .questions
        .update(
            &user_id,
            &question_id(*path),
            QuestionUpdate {
                title: payload.title,
                body: payload.body,
                tags: payload.tags.map(TagsInput::normalise).unwrap_or_default(),
            },
        )
        .await?;
    Ok(web::Json(question))
}

/// Delete the question, cascading to answers and notifications.
#[utoipa::path(
    delete,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "No such question", body = Error)
    ),
    tags = ["questions"],
    operation_id = "deleteQuestion"
)]
#[delete("/questions/{id}")]
pub async fn delete_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state.questions.delete(&user_id, &question_id(*path)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Toggle the caller's vote on the question.
#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/vote",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 400, description = "Invalid vote type", body = Error),
        (status = 403, description = "Own question, or locked", body = Error)
    ),
    tags = ["questions"],
    operation_id = "voteQuestion"
)]
#[post("/questions/{id}/vote")]
pub async fn vote_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<VoteRequest>,
) -> ApiResult<web::Json<Question>> {
    let user_id = session.require_user_id()?;
    let direction = payload.direction()?;
    let question = state
        .questions
        .vote(&user_id, &question_id(*path), direction)
        .await?;
    Ok(web::Json(question))
}

/// Lock the question against new answers, edits, and votes.
#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/lock",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Locked question", body = Question),
        (status = 403, description = "Not the owner", body = Error)
    ),
    tags = ["questions"],
    operation_id = "lockQuestion"
)]
#[post("/questions/{id}/lock")]
pub async fn lock_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Question>> {
    let user_id = session.require_user_id()?;
    let question = state
        .questions
        .set_locked(&user_id, &question_id(*path), true)
        .await?;
    Ok(web::Json(question))
}

/// Reopen a locked question.
#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/unlock",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Unlocked question", body = Question),
        (status = 403, description = "Not the owner", body = Error)
    ),
    tags = ["questions"],
    operation_id = "unlockQuestion"
)]
#[post("/questions/{id}/unlock")]
pub async fn unlock_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Question>> {
    let user_id = session.require_user_id()?;
    let question = state
        .questions
        .set_locked(&user_id, &question_id(*path), false)
        .await?;
    Ok(web::Json(question))
}

/// The question's answers in creation order.
#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}/answers",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Answers", body = [Answer]),
        (status = 404, description = "No such question", body = Error)
    ),
    tags = ["answers"],
    operation_id = "listAnswers"
)]
#[get("/questions/{id}/answers")]
pub async fn list_answers(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Vec<Answer>>> {
    session.require_user_id()?;
    let answers = state
        .answers
        .list_for_question(&question_id(*path))
        .await?;
    Ok(web::Json(answers))
}

/// Answer the question.
#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/answers",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = AnswerRequest,
    responses(
        (status = 201, description = "Answer created", body = Answer),
        (status = 403, description = "Own question, or locked", body = Error),
        (status = 404, description = "No such question", body = Error)
    ),
    tags = ["answers"],
    operation_id = "postAnswer"
)]
#[post("/questions/{id}/answers")]
pub async fn post_answer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<AnswerRequest>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let payload = payload.into_inner();
    let answer = state
        .answers
        .post(
            &user_id,
            &question_id(*path),
            NewAnswer {
                body: payload.body,
                anonymous: payload
                    .anonymous
                    .as_ref()
                    .is_some_and(AnonymousFlag::as_bool),
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::test_http_app;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{json, Value};

    async fn register(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        username: &str,
    ) -> Cookie<'static> {
        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/register")
                .set_json(json!({
                    "username": username,
                    "email": format!("{username}@example.org"),
                    "password": "correct-horse",
                    "passwordConfirmation": "correct-horse",
                }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned()
    }

    async fn post_question(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        cookie: &Cookie<'static>,
        body: Value,
    ) -> Value {
        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/questions")
                .cookie(cookie.clone())
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        actix_test::read_body_json(res).await
    }

    #[rstest]
    #[case(json!(["rust", " borrowck "]), vec!["rust", "borrowck"])]
    #[case(json!("rust, borrowck, ,"), vec!["rust", "borrowck"])]
    #[actix_web::test]
    async fn tags_accept_lists_and_comma_strings(
        #[case] tags: Value,
        #[case] expected: Vec<&str>,
    ) {
        let app = actix_test::init_service(test_http_app()).await;
        let cookie = register(&app, "ada").await;
        let question = post_question(
            &app,
            &cookie,
            json!({ "title": "t", "body": "b", "tags": tags }),
        )
        .await;
        let got: Vec<&str> = question["tags"]
            .as_array()
            .expect("tags list")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(got, expected);
    }

    #[actix_web::test]
    async fn question_routes_require_a_session() {
        let app = actix_test::init_service(test_http_app()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/questions")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case("sideways")]
    #[case("Up")]
    #[case("")]
    #[actix_web::test]
    async fn vote_rejects_unknown_directions(#[case] vote_type: &str) {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        let question = post_question(&app, &ada, json!({ "title": "t", "body": "b" })).await;
        let id = question["id"].as_str().expect("question id");

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/vote"))
                .cookie(grace.clone())
                .set_json(json!({ "voteType": vote_type }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "voteType");
    }

    #[actix_web::test]
    async fn vote_toggles_membership() {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        let question = post_question(&app, &ada, json!({ "title": "t", "body": "b" })).await;
        let id = question["id"].as_str().expect("question id").to_owned();

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/vote"))
                .cookie(grace.clone())
                .set_json(json!({ "voteType": "up" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["votes"]["up"].as_array().expect("up set").len(), 1);

        // Self-votes are forbidden.
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/vote"))
                .cookie(ada.clone())
                .set_json(json!({ "voteType": "up" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn lock_blocks_answers_until_unlocked() {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        let question = post_question(&app, &ada, json!({ "title": "t", "body": "b" })).await;
        let id = question["id"].as_str().expect("question id").to_owned();

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/lock"))
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/answers"))
                .cookie(grace.clone())
                .set_json(json!({ "body": "too late" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/unlock"))
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/answers"))
                .cookie(grace.clone())
                .set_json(json!({ "body": "in time" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[case(json!(true), true)]
    #[case(json!("true"), true)]
    #[case(json!("yes"), false)]
    #[case(json!(false), false)]
    #[case(json!(1), false)]
    #[case(json!(["true"]), false)]
    #[case(json!({"value": true}), false)]
    #[actix_web::test]
    async fn anonymous_flag_coercion(#[case] flag: Value, #[case] expected: bool) {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        let question = post_question(&app, &ada, json!({ "title": "t", "body": "b" })).await;
        let id = question["id"].as_str().expect("question id").to_owned();

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{id}/answers"))
                .cookie(grace.clone())
                .set_json(json!({ "body": "a", "anonymous": flag }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["anonymous"], expected);
    }
}
