//! Backend entry-point: wires REST endpoints, health probes, and OpenAPI docs.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::{web, App, HttpResponse, HttpServer};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};
use utoipa::OpenApi;

use quorum_backend::inbound::http::configure_api;
use quorum_backend::inbound::http::health::{live, ready, HealthState};
use quorum_backend::inbound::http::state::HttpState;
use quorum_backend::outbound::persistence::{MemoryForumStore, SqliteForumStore};
use quorum_backend::{ApiDoc, Trace};

/// Command-line options, all overridable from the environment.
#[derive(Debug, Parser)]
#[command(name = "quorum-backend", about = "Q&A forum API server")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "QUORUM_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, env = "QUORUM_PORT", default_value_t = 8080)]
    port: u16,

    /// SQLite database file.
    #[arg(long, env = "QUORUM_DATABASE", default_value = "quorum.db")]
    database: PathBuf,

    /// Keep all data in memory instead of the database file. Dev only.
    #[arg(long, env = "QUORUM_EPHEMERAL")]
    ephemeral: bool,
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();

    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    let key = match std::fs::read(&key_path) {
        Ok(bytes) => Key::derive_from(&bytes),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Key::generate()
            } else {
                return Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )));
            }
        }
    };

    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);

    let state = if cli.ephemeral {
        warn!("running with an in-memory store; data is lost on shutdown");
        HttpState::from_store(Arc::new(MemoryForumStore::new()))
    } else {
        let store = SqliteForumStore::open(&cli.database).map_err(std::io::Error::other)?;
        HttpState::from_store(Arc::new(store))
    };

    let health_state = web::Data::new(HealthState::new());
    // Clone for the server factory so the readiness probe stays accessible.
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".into())
            .cookie_path("/".into())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(server_health_state.clone())
            .wrap(Trace)
            .service(
                web::scope("/api/v1")
                    .wrap(session)
                    .configure(configure_api),
            )
            .service(ready)
            .service(live)
            .route(
                "/api-docs/openapi.json",
                web::get().to(|| async { HttpResponse::Ok().json(ApiDoc::openapi()) }),
            )
    })
    .disable_signals()
    .bind((cli.bind.as_str(), cli.port))?
    .run();

    // Handle the interrupt ourselves: fail the liveness probe first so
    // orchestrators stop routing, then drain in-flight requests.
    let server_handle = server.handle();
    let drain_state = health_state.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                drain_state.mark_unhealthy();
                server_handle.stop(true).await;
            }
            Err(e) => warn!(error = %e, "shutdown signal listener failed"),
        }
    });

    health_state.mark_ready();
    server.await
}
