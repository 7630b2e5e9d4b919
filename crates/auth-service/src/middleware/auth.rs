//! 访问守卫中间件
//!
//! 验证请求中的 Bearer Token，解析出当前用户并注入请求扩展

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::error::AuthError;
use crate::models::User;
use crate::state::AppState;

/// 已通过认证的当前用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

/// 认证中间件
///
/// 缺少或格式错误的 Authorization 头、Token 无效或过期、用户已不存在，
/// 一律返回 401；存储故障返回 500。
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        debug!("缺少 Bearer Token");
        return unauthorized_response();
    };

    match state.auth.authenticate(token).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(e) if e.is_auth_failure() => {
            debug!(reason = e.error_code(), "访问被拒绝");
            unauthorized_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 从 Authorization 头提取 Bearer Token
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 生成 401 未授权响应
///
/// 不区分具体失败原因
fn unauthorized_response() -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": AuthError::Unauthorized.to_string(),
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
