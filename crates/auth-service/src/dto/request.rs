//! 认证服务请求 DTO 定义
//!
//! 这里只做格式与长度校验，密码强度由服务层的密码策略判定

use std::fmt;

use serde::Deserialize;
use validator::Validate;

use crate::models::NewAccount;

/// 注册请求
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "用户名长度必须在 1-50 之间"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "密码长度必须在 1-128 之间"))]
    pub password: String,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "显示名称不能超过 100 个字符"))]
    pub display_name: Option<String>,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
            email: req.email,
            display_name: req.display_name,
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// 登录请求
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(max = 50, message = "用户名长度不能超过 50"))]
    pub username: String,
    #[validate(length(max = 128, message = "密码长度不能超过 128"))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
