//! Backend library modules.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface served at `/api-docs/openapi.json`.
pub use doc::ApiDoc;
pub use middleware::Trace;
