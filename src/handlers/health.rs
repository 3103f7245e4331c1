use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

/// ヘルスチェックハンドラー
///
/// GET /api/health
///
/// ストアに疎通できなければ `degraded` を返す（ステータスコードは 200 のまま）
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, store) = match state.store.ping().await {
        Ok(()) => ("ok", "up"),
        Err(e) => {
            tracing::warn!(error = %e, "ストア疎通確認に失敗");
            ("degraded", "down")
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store,
    })
}

/// GET /
pub async fn root() -> &'static str {
    "Eden backend is running"
}
