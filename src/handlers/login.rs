use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::AccountView;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer トークン
    pub token: String,
    pub user: AccountView,
}

/// ログインハンドラー
///
/// POST /api/users/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（ストア照合）
/// 3. Bearer トークン発行
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&request)?;

    let account = state
        .auth_service
        .authenticate(&request.email, &request.password)
        .await?;

    let token = state.token_issuer.issue(account.id)?;

    Ok(Json(LoginResponse {
        token,
        user: account.view(),
    }))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let request = LoginRequest {
            email: "".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_ok());
    }
}
