//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: use cases over the store and image ports
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and multipart form parsing
//! - `errors.rs`: consistent error responses

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit, http::HeaderValue, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use petconnect_infra::{AppConfig, MediaConfig};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// HTTP-level knobs that are not part of the services.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
    /// Directory served under the given URL prefix (local image store).
    pub uploads: Option<(PathBuf, String)>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * 1024 * 1024,
            cors_allow_origin: None,
            uploads: None,
        }
    }
}

impl AppOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let uploads = match &config.media {
            MediaConfig::Local { root, url_prefix } => Some((root.clone(), route_prefix(url_prefix))),
            _ => None,
        };
        Self {
            max_upload_bytes: config.max_upload_bytes,
            cors_allow_origin: config.cors_allow_origin.clone(),
            uploads,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: &[u8], services: Arc<AppServices>, options: AppOptions) -> Router {
    let jwt = Arc::new(petconnect_auth::Hs256Jwt::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    let mut app = Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router(auth_state));

    if let Some((root, prefix)) = &options.uploads {
        app = if prefix == "/" {
            app.fallback_service(ServeDir::new(root))
        } else {
            app.nest_service(prefix, ServeDir::new(root))
        };
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(options.cors_allow_origin.as_deref()))
            .layer(DefaultBodyLimit::max(options.max_upload_bytes))
            .layer(Extension(services)),
    )
}

/// `uploads/` -> `/uploads`
fn route_prefix(raw: &str) -> String {
    format!("/{}", raw.trim_matches('/'))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        None => base.allow_origin(Any),
        Some(Ok(origin)) => base.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "invalid CORS_ALLOW_ORIGIN; allowing any origin");
            base.allow_origin(Any)
        }
    }
}
