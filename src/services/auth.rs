use std::sync::OnceLock;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::{Account, NewAccount, normalize_email};
use crate::repositories::SharedAccountStore;

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// ハッシュ計算をブロッキングスレッドで実行
pub async fn compute_password_hash(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(|| hash_password(&password)))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hash task failed: {e}")))?
}

/// 検証をブロッキングスレッドで実行
pub async fn verify_password_hash(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        current_span.in_scope(|| verify_password(&password, &hash))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("password verify task failed: {e}")))?
}

/// タイミング攻撃対策用のダミーハッシュ（初回のみ生成）
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("dummy-password-for-timing").ok())
        .as_deref()
}

/// 登録・認証サービス
#[derive(Clone)]
pub struct AuthService {
    store: SharedAccountStore,
}

impl AuthService {
    pub fn new(store: SharedAccountStore) -> Self {
        Self { store }
    }

    /// アカウントを登録
    ///
    /// # Errors
    /// - 既に登録済み: `AppError::EmailAlreadyExists`
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        let password_hash = compute_password_hash(password).await?;
        let account = self
            .store
            .insert(NewAccount::new(name, email, password_hash))
            .await?;

        tracing::info!(account_id = %account.id, "アカウント登録成功");
        Ok(account)
    }

    /// ユーザー認証を実行
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AppError> {
        let email = normalize_email(email);
        let account = self.store.find_by_email(&email).await?;

        match account {
            Some(account) => {
                if verify_password_hash(password, &account.password_hash).await? {
                    tracing::info!(account_id = %account.id, "認証成功");
                    Ok(account)
                } else {
                    tracing::warn!(account_id = %account.id, "認証失敗: パスワード不一致");
                    Err(AppError::InvalidCredentials)
                }
            }
            None => {
                let password = password.to_owned();
                let _ = tokio::task::spawn_blocking(move || {
                    if let Some(hash) = dummy_hash() {
                        let _ = verify_password(&password, hash);
                    }
                })
                .await;
                tracing::warn!("認証失敗: ユーザー不在");
                Err(AppError::InvalidCredentials)
            }
        }
    }
}
