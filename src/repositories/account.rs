use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Account, NewAccount};
use crate::repositories::{AccountStore, StoreError};

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, reset_token_hash, \
     reset_token_expires_at, created_at, updated_at";

/// PostgreSQL 実装
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// # Errors
    /// - UNIQUE制約違反時: `StoreError::DuplicateEmail`
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r#"
            INSERT INTO accounts (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.constraint() == Some("accounts_email_key")
                {
                    return StoreError::DuplicateEmail;
                }
                StoreError::Database(e)
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            r#"
            UPDATE accounts
            SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = NOW()
            WHERE email = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .bind(token_hash)
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// # Note
    /// 行ロックにより同一トークンの同時消費は片方しか成功しない
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE accounts
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE reset_token_hash = $1
              AND reset_token_expires_at > $3
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn clear_expired_reset_tokens(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET reset_token_hash = NULL, reset_token_expires_at = NULL
            WHERE reset_token_expires_at IS NOT NULL
              AND reset_token_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
