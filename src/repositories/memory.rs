use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Account, NewAccount};
use crate::repositories::{AccountStore, StoreError};

/// プロセス内ストア（テスト・ローカル開発用）
///
/// キーは正規化済みメールアドレス。
/// 条件判定と更新は同じ書き込みロック内で行う
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let created = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(email).cloned())
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(email) else {
            return Ok(None);
        };

        account.reset_token_hash = Some(token_hash.to_string());
        account.reset_token_expires_at = Some(expires_at);
        account.updated_at = OffsetDateTime::now_utc();
        Ok(Some(account.clone()))
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, StoreError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.values_mut().find(|a| {
            a.reset_token_hash.as_deref() == Some(token_hash)
                && a.reset_token_expires_at.is_some_and(|exp| exp > now)
        }) else {
            return Ok(None);
        };

        account.password_hash = new_password_hash.to_string();
        account.reset_token_hash = None;
        account.reset_token_expires_at = None;
        account.updated_at = now;
        Ok(Some(account.id))
    }

    async fn clear_expired_reset_tokens(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut accounts = self.accounts.write().await;
        let mut cleared = 0;
        for account in accounts.values_mut() {
            if account.reset_token_expires_at.is_some_and(|exp| exp <= now) {
                account.reset_token_hash = None;
                account.reset_token_expires_at = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    async fn store_with_alice() -> InMemoryAccountStore {
        let store = InMemoryAccountStore::new();
        store
            .insert(NewAccount::new("Alice", "alice@example.com", "hash-1".into()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = store_with_alice().await;
        let result = store
            .insert(NewAccount::new("Alice 2", "ALICE@example.com", "hash".into()))
            .await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_set_reset_token_unknown_email() {
        let store = store_with_alice().await;
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
        let result = store
            .set_reset_token("nobody@example.com", "digest", expires_at)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_redeem_clears_reset_state_with_password() {
        let store = store_with_alice().await;
        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token("alice@example.com", "digest", now + Duration::hours(1))
            .await
            .unwrap();

        let id = store.redeem_reset_token("digest", "hash-2", now).await.unwrap();
        assert!(id.is_some());

        let account = store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.password_hash, "hash-2");
        assert!(account.reset_token_hash.is_none());
        assert!(account.reset_token_expires_at.is_none());

        let again = store.redeem_reset_token("digest", "hash-3", now).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_redeem_at_exact_expiry_fails() {
        let store = store_with_alice().await;
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(5);
        store
            .set_reset_token("alice@example.com", "digest", expires_at)
            .await
            .unwrap();

        let id = store
            .redeem_reset_token("digest", "hash-2", expires_at)
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_clear_expired_only_touches_expired() {
        let store = store_with_alice().await;
        store
            .insert(NewAccount::new("Bob", "bob@example.com", "hash".into()))
            .await
            .unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token("alice@example.com", "old", now - Duration::minutes(1))
            .await
            .unwrap();
        store
            .set_reset_token("bob@example.com", "fresh", now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.clear_expired_reset_tokens(now).await.unwrap(), 1);

        let bob = store.find_by_email("bob@example.com").await.unwrap().unwrap();
        assert_eq!(bob.reset_token_hash.as_deref(), Some("fresh"));
    }
}
