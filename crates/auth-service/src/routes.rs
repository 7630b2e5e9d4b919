//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};
use auth_shared::observability::middleware as obs_middleware;

use crate::{handlers, middleware::require_auth, middleware::security_headers, state::AppState};

/// 构建公开的认证路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
}

/// 构建需要 Bearer Token 的路由
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/logged_user", get(handlers::auth::logged_user))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// 构建探针路由
fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
}

/// 构建完整的应用路由
///
/// 包含安全头和请求追踪中间件；CORS 由调用方按部署配置叠加。
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(probe_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
