use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// 存在有無に関わらず同じ文言を返す
const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
}

/// POST /api/users/forgot-password, POST /api/reset-password
///
/// # Security
/// 常に200を返す（ユーザー存在有無を漏洩しない）
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<ResetRequestResponse>, AppError> {
    validate_email(&request.email)?;

    match state
        .password_reset_service
        .request_reset(&request.email)
        .await
    {
        Ok(()) => {}
        Err(AppError::AccountNotFound) => {
            tracing::info!("パスワードリセット: ユーザー不在（成功レスポンス返却）");
        }
        Err(e) => return Err(e),
    }

    Ok(Json(ResetRequestResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(rename = "newPassword", alias = "new_password")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// POST /api/users/reset-password/{token}, POST /api/reset-password/{token}
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    validate_new_password(&request.new_password)?;

    state
        .password_reset_service
        .reset_password(&token, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: "Password reset successful".to_string(),
    }))
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_password(new_password: &str) -> Result<(), AppError> {
    if new_password.chars().count() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        assert!(validate_email("invalid-email").is_err());
    }

    #[test]
    fn test_validate_valid_email() {
        assert!(validate_email("test@example.com").is_ok());
    }

    #[test]
    fn test_validate_short_password() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("password123").is_ok());
    }

    #[test]
    fn test_new_password_field_names() {
        let camel: ResetPasswordRequest =
            serde_json::from_str(r#"{"newPassword":"password123"}"#).unwrap();
        let snake: ResetPasswordRequest =
            serde_json::from_str(r#"{"new_password":"password123"}"#).unwrap();
        assert_eq!(camel.new_password, snake.new_password);
    }
}
