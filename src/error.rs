use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repositories::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("認証エラー: {0}")]
    Unauthorized(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("ストレージエラー: {0}")]
    Storage(String),

    #[error("メール送信エラー: {0}")]
    Delivery(String),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("アカウントが見つかりません")]
    AccountNotFound,

    #[error("無効または期限切れのリンクです")]
    InvalidOrExpiredToken,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::EmailAlreadyExists,
            StoreError::Database(e) => Self::Database(e),
            StoreError::Unavailable(msg) => Self::Storage(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "Invalid email or password".to_string(),
            ),
            Self::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, "Bearer トークン拒否");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "ストレージエラー");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            Self::Delivery(e) => {
                tracing::error!(error = %e, "メール送信エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to send email, please try again later".to_string(),
                )
            }
            Self::EmailAlreadyExists => {
                (StatusCode::BAD_REQUEST, "User already exists".to_string())
            }
            Self::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "Invalid or expired token".to_string(),
            ),
            // リセット要求では呼び出し側で握りつぶす。漏れても存在有無は明かさない
            Self::AccountNotFound => (StatusCode::BAD_REQUEST, "Invalid request".to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Delivery("timeout".into()), StatusCode::BAD_GATEWAY),
            (AppError::EmailAlreadyExists, StatusCode::BAD_REQUEST),
            (AppError::InvalidOrExpiredToken, StatusCode::BAD_REQUEST),
            (AppError::AccountNotFound, StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            AppError::from(StoreError::DuplicateEmail),
            AppError::EmailAlreadyExists
        ));
        assert!(matches!(
            AppError::from(StoreError::Unavailable("gone".into())),
            AppError::Storage(_)
        ));
    }
}
