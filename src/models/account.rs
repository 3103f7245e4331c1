use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// アカウント
///
/// リセット状態（`reset_token_hash` / `reset_token_expires_at`）は常に
/// 両方セットされているか両方 `None` のどちらか。
/// 平文トークンは保存しない（SHA256ハッシュのみ）
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Account {
    /// レスポンスに載せてよい公開情報のみ
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// 新規登録時の入力（パスワードはハッシュ化済み）
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewAccount {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// メールアドレスの正規化（前後空白除去・小文字化）
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
