//! Notification inbox handlers.
//!
//! ```text
//! GET /api/v1/users/me/notifications
//! PUT /api/v1/users/me/notifications/read
//! ```

use actix_web::{get, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Notification, NotificationId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// Mark-read request body. Omitting the body, or sending an empty `ids`
/// list, marks every unread notification.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub ids: Option<Vec<NotificationId>>,
}

/// Count of notifications flipped to read.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users/me/notifications",
    responses(
        (status = 200, description = "Notifications", body = [Notification]),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications"
)]
#[get("/users/me/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Notification>>> {
    let user_id = session.require_user_id()?;
    let notifications = state.notifications.list(&user_id).await?;
    Ok(web::Json(notifications))
}

/// Mark notifications read, scoped to the caller.
#[utoipa::path(
    put,
    path = "/api/v1/users/me/notifications/read",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Notifications marked", body = MarkReadResponse),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["notifications"],
    operation_id = "markNotificationsRead"
)]
#[put("/users/me/notifications/read")]
pub async fn mark_notifications_read(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: Option<web::Json<MarkReadRequest>>,
) -> ApiResult<web::Json<MarkReadResponse>> {
    let user_id = session.require_user_id()?;
    let ids = payload.and_then(|payload| payload.into_inner().ids);
    let updated = state.notifications.mark_read(&user_id, ids).await?;
    Ok(web::Json(MarkReadResponse { updated }))
}

#[cfg(test)]
mod tests {
    use crate::inbound::http::test_utils::test_http_app;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
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

    /// Ada asks, Grace answers, so Ada has one unread notification.
    async fn seed_notification(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        asker: &Cookie<'static>,
        answerer: &Cookie<'static>,
    ) {
        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/questions")
                .cookie(asker.clone())
                .set_json(json!({ "title": "t", "body": "b" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let question: Value = actix_test::read_body_json(res).await;
        let question_id = question["id"].as_str().expect("question id");

        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/questions/{question_id}/answers"))
                .cookie(answerer.clone())
                .set_json(json!({ "body": "an answer" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn inbox_is_recipient_scoped() {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        seed_notification(&app, &ada, &grace).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me/notifications")
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let inbox: Value = actix_test::read_body_json(res).await;
        assert_eq!(inbox.as_array().expect("inbox").len(), 1);
        assert_eq!(inbox[0]["read"], false);

        // The answerer gets nothing.
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me/notifications")
                .cookie(grace.clone())
                .to_request(),
        )
        .await;
        let inbox: Value = actix_test::read_body_json(res).await;
        assert!(inbox.as_array().expect("inbox").is_empty());
    }

    #[actix_web::test]
    async fn mark_read_without_body_marks_everything() {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        seed_notification(&app, &ada, &grace).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/users/me/notifications/read")
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["updated"], 1);

        // Marking again finds nothing unread.
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/users/me/notifications/read")
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["updated"], 0);
    }

    #[actix_web::test]
    async fn mark_read_accepts_explicit_ids() {
        let app = actix_test::init_service(test_http_app()).await;
        let ada = register(&app, "ada").await;
        let grace = register(&app, "grace").await;
        seed_notification(&app, &ada, &grace).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me/notifications")
                .cookie(ada.clone())
                .to_request(),
        )
        .await;
        let inbox: Value = actix_test::read_body_json(res).await;
        let id = inbox[0]["id"].as_str().expect("notification id");

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/users/me/notifications/read")
                .cookie(ada.clone())
                .set_json(json!({ "ids": [id] }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["updated"], 1);
    }
}
