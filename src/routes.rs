use axum::{
    Router,
    routing::{get, post},
};
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::state::AppState;

/// Router の構築
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health_check))
        .route("/api/users/register", post(handlers::register))
        .route("/api/users/login", post(handlers::login))
        .route(
            "/api/users/forgot-password",
            post(handlers::request_password_reset),
        )
        .route(
            "/api/users/reset-password/{token}",
            post(handlers::reset_password),
        )
        .route("/api/reset-password", post(handlers::request_password_reset))
        .route("/api/reset-password/{token}", post(handlers::reset_password))
        .route("/api/protected", get(handlers::protected))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS 設定（許可オリジン未設定なら全許可）
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = ?e, "無効な CORS オリジンを無視");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
