//! 认证服务错误类型定义
//!
//! 所有业务失败都是有类型的结果，由边界层翻译为客户端响应；
//! 存储层和内部故障统一以通用提示返回，细节只写日志。

use auth_shared::error::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::TokenError;

/// 认证服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // 注册错误
    #[error("密码强度不足：必须包含至少一个大写字母和一个数字，长度大于 {min_length} 个字符且不超过 72 字节")]
    WeakPassword { min_length: usize },
    #[error("用户名已被占用")]
    UsernameTaken,

    // 认证错误
    /// “用户不存在”与“密码错误”在此合并，避免用户名枚举
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("Token 已过期")]
    TokenExpired,
    #[error("无效的 Token")]
    TokenInvalid,
    #[error("Unauthorized access")]
    Unauthorized,

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 系统错误
    #[error("存储错误: {0}")]
    Store(#[source] StoreError),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AuthError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::WeakPassword { .. } | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UsernameTaken => StatusCode::CONFLICT,

            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,

            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WeakPassword { .. } => "WEAK_PASSWORD",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否属于令牌或身份解析失败（边界层统一折叠为 Unauthorized）
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenInvalid | Self::Unauthorized | Self::InvalidCredentials
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Store(e) => {
                tracing::error!(error = %e, code = e.code(), "存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 存储层唯一约束冲突即用户名冲突，其余为内部故障
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } => Self::UsernameTaken,
            other => Self::Store(other),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::TokenInvalid,
        }
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 请求体不是合法 JSON 或 Content-Type 不符时，按参数验证失败处理
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// 所有错误变体及其期望的 (StatusCode, error_code) 映射
    fn all_error_variants() -> Vec<(AuthError, StatusCode, &'static str)> {
        vec![
            (AuthError::WeakPassword { min_length: 8 }, StatusCode::BAD_REQUEST, "WEAK_PASSWORD"),
            (AuthError::UsernameTaken, StatusCode::CONFLICT, "USERNAME_TAKEN"),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            (AuthError::TokenInvalid, StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
            (AuthError::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AuthError::Validation("username".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                AuthError::Store(StoreError::Internal("pool exhausted".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
            ),
            (AuthError::Internal("join error".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_status_and_error_codes() {
        for (err, status, code) in all_error_variants() {
            assert_eq!(err.status_code(), status, "{:?}", err);
            assert_eq!(err.error_code(), code, "{:?}", err);
        }
    }

    #[test]
    fn test_already_exists_maps_to_username_taken() {
        let err: AuthError = StoreError::already_exists("User", "username", "alice").into();
        assert!(matches!(err, AuthError::UsernameTaken));

        let err: AuthError = StoreError::Internal("boom".into()).into();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[test]
    fn test_token_error_mapping() {
        assert!(matches!(AuthError::from(TokenError::Expired), AuthError::TokenExpired));
        assert!(matches!(AuthError::from(TokenError::Invalid), AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let response =
            AuthError::Store(StoreError::Internal("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "STORE_ERROR");
        assert!(!json["message"].as_str().unwrap().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_business_error_response_body() {
        let response = AuthError::UsernameTaken.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "USERNAME_TAKEN");
        assert_eq!(json["message"], "用户名已被占用");
        assert!(json["data"].is_null());
    }
}
