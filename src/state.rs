use std::sync::Arc;

use crate::config::Config;
use crate::repositories::SharedAccountStore;
use crate::services::{
    AuthService, PasswordResetService, SharedNotificationSender, TokenIssuer,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// ストアとメール送信は起動時に構築して注入する
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// アカウントストア
    pub store: SharedAccountStore,
    /// 登録・認証サービス
    pub auth_service: AuthService,
    /// Bearer トークン発行
    pub token_issuer: TokenIssuer,
    /// パスワードリセットサービス
    pub password_reset_service: PasswordResetService,
}

impl AppState {
    pub fn new(
        store: SharedAccountStore,
        sender: SharedNotificationSender,
        config: Config,
    ) -> Self {
        let config = Arc::new(config);
        let auth_service = AuthService::new(store.clone());
        let token_issuer = TokenIssuer::from_config(&config);
        let password_reset_service =
            PasswordResetService::from_config(store.clone(), sender, &config);

        Self {
            config,
            store,
            auth_service,
            token_issuer,
            password_reset_service,
        }
    }
}
