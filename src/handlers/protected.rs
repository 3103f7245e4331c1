use axum::Json;
use serde::Serialize;

use crate::extractors::AuthUser;

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub message: String,
}

/// GET /api/protected
pub async fn protected(user: AuthUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: format!("Welcome, user ID: {}", user.account_id),
    })
}
