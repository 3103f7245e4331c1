use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::models::normalize_email;
use crate::repositories::SharedAccountStore;
use crate::services::auth::compute_password_hash;
use crate::services::email::SharedNotificationSender;

/// トークンのバイト長（256bit）
const TOKEN_BYTES: usize = 32;

/// パスワードリセットサービス
///
/// トークンの発行・有効期限・1回限りの消費を扱う。
/// DB にはトークンの SHA256 ハッシュのみを保存する
#[derive(Clone)]
pub struct PasswordResetService {
    store: SharedAccountStore,
    sender: SharedNotificationSender,
    ttl: Duration,
    url_base: String,
}

impl PasswordResetService {
    pub fn new(
        store: SharedAccountStore,
        sender: SharedNotificationSender,
        ttl: Duration,
        url_base: String,
    ) -> Self {
        Self {
            store,
            sender,
            ttl,
            url_base,
        }
    }

    pub fn from_config(
        store: SharedAccountStore,
        sender: SharedNotificationSender,
        config: &Config,
    ) -> Self {
        Self::new(
            store,
            sender,
            config.password_reset_token_ttl(),
            config.password_reset_url_base(),
        )
    }

    /// パスワードリセットをリクエスト
    ///
    /// 保存してから送信する。保存に失敗した場合メールは送らない。
    ///
    /// # Errors
    /// - ユーザー不在: `AppError::AccountNotFound`（ハンドラー側で成功扱いにする）
    /// - 送信失敗: `AppError::Delivery`（トークンは保存済み、再リクエストで上書き可能）
    ///
    /// # Security
    /// - トークン（平文）はログに出力しない
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);

        let token = generate_token();
        let token_hash = hash_token(&token);
        let expires_at = OffsetDateTime::now_utc() + self.ttl;

        // トークンと期限を1回の更新で書き込む（既存トークンは無効化される）
        let account = self
            .store
            .set_reset_token(&email, &token_hash, expires_at)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        tracing::info!(account_id = %account.id, "リセットトークン発行");

        let reset_url = self.build_reset_url(&token);
        self.sender
            .send_password_reset(&account.email, &reset_url, self.ttl)
            .await?;

        tracing::info!(account_id = %account.id, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードをリセット
    ///
    /// 誤り・期限切れ・使用済みはすべて `AppError::InvalidOrExpiredToken` で区別しない
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        if token.is_empty() {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let token_hash = hash_token(token);
        let password_hash = compute_password_hash(new_password).await?;

        let account_id = self
            .store
            .redeem_reset_token(&token_hash, &password_hash, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| {
                tracing::warn!("無効・期限切れ・使用済みのリセットトークン");
                AppError::InvalidOrExpiredToken
            })?;

        tracing::info!(account_id = %account_id, "パスワードリセット完了");

        Ok(())
    }

    /// 期限切れトークンを掃除
    ///
    /// # Returns
    /// クリアした件数
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let cleared = self
            .store
            .clear_expired_reset_tokens(OffsetDateTime::now_utc())
            .await?;
        if cleared > 0 {
            tracing::info!(cleared, "期限切れリセットトークンを削除");
        }
        Ok(cleared)
    }

    /// リセットURLを構築
    fn build_reset_url(&self, token: &str) -> String {
        format!("{}/{}", self.url_base, token)
    }
}

/// 32バイトのランダムトークンを生成
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// トークンをSHA256でハッシュ化
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
