use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Bearer トークンで認証済みのアカウント
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("invalid authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected bearer scheme".to_string()))?;

        let claims = state.token_issuer.verify(token.trim())?;

        Ok(Self {
            account_id: claims.sub,
        })
    }
}
