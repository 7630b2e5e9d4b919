//! 认证相关的 HTTP 处理器
//!
//! 提供注册、登录和获取当前用户的 API

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use validator::Validate;

use crate::dto::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::UserView;
use crate::state::AppState;

/// 用户注册
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserView>>)> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state.auth.register(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(user, "注册成功")),
    ))
}

/// 用户登录
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    let issued = state.auth.login(&req.username, &req.password).await?;

    Ok(Json(ApiResponse::success(issued.into())))
}

/// 获取当前登录用户
///
/// GET /auth/logged_user
pub async fn logged_user(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserView>> {
    Json(ApiResponse::success(user.into()))
}
