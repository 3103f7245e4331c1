use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use eden_accounts::{
    config::Config, repositories::PgAccountRepository, routes::create_router,
    services::email::notification_sender_from_config, services::PasswordResetService,
    state::AppState,
};

/// 期限切れリセットトークンの掃除間隔
const RESET_TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env があれば読み込む（なくてもよい）
    let dotenv = dotenvy::dotenv();

    // ログ初期化（JSON形式、環境変数でレベル制御）
    init_tracing();

    if let Err(e) = &dotenv
        && !e.not_found()
    {
        tracing::warn!(error = ?e, ".env の読み込みに失敗");
    }

    tracing::info!("eden-accounts 起動中...");

    // 設定読み込み
    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(host = %config.host, port = %config.port, "設定読み込み完了");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    // データベース接続プール作成
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "マイグレーションに失敗");
            anyhow::anyhow!("Failed to run migrations: {}", e)
        })?;

    tracing::info!("データベース接続完了");

    let store = Arc::new(PgAccountRepository::new(db_pool.clone()));
    let sender = notification_sender_from_config(&config).map_err(|e| {
        tracing::error!(error = ?e, "メール送信の初期化に失敗");
        anyhow::anyhow!("Failed to create mailer: {}", e)
    })?;

    let state = AppState::new(store, sender, config);

    let purge_task = tokio::spawn(purge_expired_tokens(
        state.password_reset_service.clone(),
    ));

    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    // Graceful shutdown 対応
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    purge_task.abort();
    db_pool.close().await;

    tracing::info!("サーバー終了");

    Ok(())
}

/// tracing の初期化（JSON形式）
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eden_accounts=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// 期限切れリセットトークンを定期的にクリア
async fn purge_expired_tokens(service: PasswordResetService) {
    let mut interval = tokio::time::interval(RESET_TOKEN_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = service.purge_expired().await {
            tracing::warn!(error = ?e, "期限切れトークンの掃除に失敗");
        }
    }
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
