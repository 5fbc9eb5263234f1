//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{web, App};

use crate::inbound::http::state::HttpState;
use crate::outbound::persistence::MemoryForumStore;

/// Session middleware configured for tests: fresh key per invocation, cookie
/// named `session`, `Secure` disabled for plain-HTTP test clients.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Full `/api/v1` application over a fresh in-memory store.
pub fn test_http_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::from_store(Arc::new(MemoryForumStore::new()));
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api/v1")
            .wrap(test_session_middleware())
            .configure(crate::inbound::http::configure_api),
    )
}
