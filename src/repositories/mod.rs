pub mod account;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Account, NewAccount};

pub use account::PgAccountRepository;
pub use memory::InMemoryAccountStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("メールアドレスが重複しています")]
    DuplicateEmail,
    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),
    #[error("ストレージ利用不可: {0}")]
    Unavailable(String),
}

/// アカウント永続化ポート
///
/// リセット状態の書き込みと消費はいずれも単一のアトミックな条件付き更新で行う。
/// `email` 引数は正規化済み（[`crate::models::normalize_email`]）であること
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 疎通確認
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// リセットトークン（ハッシュ）と有効期限を同時に書き込む
    ///
    /// 既存のトークンは上書きされ無効になる。該当アカウントがなければ `None`
    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<Account>, StoreError>;

    /// トークンを消費してパスワードを更新する（compare-and-set）
    ///
    /// `token_hash` が一致し、かつ `expires_at > now` のアカウントのみ対象。
    /// パスワード更新とリセット状態のクリアは同時に反映される。
    /// 同じトークンで成功するのは高々1回
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, StoreError>;

    /// 期限切れのリセット状態をクリアし、件数を返す
    async fn clear_expired_reset_tokens(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}

pub type SharedAccountStore = Arc<dyn AccountStore>;
