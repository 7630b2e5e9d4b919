//! 健康检查处理器

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "auth-service";

/// 存活探针：服务进程正常即返回 ok
///
/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查用户存储是否可用
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store_ok = match state.auth.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "就绪检查失败：存储不可用");
            false
        }
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if store_ok { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "checks": {
                "store": if store_ok { "ok" } else { "fail" }
            }
        })),
    )
}
