//! JWT Token 处理
//!
//! 提供访问令牌的签发和验证功能（HS256，无状态，不在服务端持久化）

use auth_shared::config::TokenConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::User;

/// JWT 配置
#[derive(Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expires_in_secs: i64, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_in_secs,
            issuer: issuer.into(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expires_in_secs", &self.expires_in_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TryFrom<&TokenConfig> for JwtConfig {
    type Error = AuthError;

    fn try_from(config: &TokenConfig) -> Result<Self, Self::Error> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AuthError::Internal("未配置 Token 签名密钥".to_string()))?;

        Ok(Self::new(secret, config.expires_in_secs, config.issuer.clone()))
    }
}

/// JWT Claims（Token 载荷）
///
/// 载荷只做完整性保护，不加密，因此不包含敏感字段
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 用户名
    pub username: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

/// 已签发的 Token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// 过期时间（Unix 秒）
    pub expires_at: i64,
}

/// Token 验证失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token 已过期")]
    Expired,
    /// 签名不匹配、结构错误、签发者或算法不符
    #[error("无效的 Token")]
    Invalid,
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.leeway = 0;

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// 为用户签发 Token
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, Utc::now())
    }

    /// 以指定签发时间签发 Token
    ///
    /// 相同用户与时间得到相同 Token
    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let exp = Duration::try_seconds(self.config.expires_in_secs)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Internal(format!(
                    "Token 有效期超出范围: {} 秒",
                    self.config.expires_in_secs
                ))
            })?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: issued_at.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: exp.timestamp(),
        })
    }

    /// 验证并解析 JWT Token
    ///
    /// 过期返回 `Expired`，其它任何失败返回 `Invalid`
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// 获取 Token 过期时间（秒）
    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn manager() -> JwtManager {
        JwtManager::new(JwtConfig::new("unit-test-secret", 86400, "auth-service"))
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "john_doe".to_string(),
            password_hash: "$2b$04$unused".to_string(),
            email: None,
            display_name: None,
            created_at: Utc::now(),
        }
    }

    /// 翻转签名段第一个字符
    fn tamper_signature(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_and_verify_token() {
        let manager = manager();
        let user = user();

        let issued = manager.issue(&user).unwrap();
        let claims = manager.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "john_doe");
        assert_eq!(claims.iss, "auth-service");
        assert_eq!(claims.exp - claims.iat, 86400);
        assert_eq!(issued.expires_at, claims.exp);
    }

    #[test]
    fn test_issue_is_deterministic_for_same_timestamp() {
        let manager = manager();
        let user = user();
        let now = Utc::now();

        let first = manager.issue_at(&user, now).unwrap();
        let second = manager.issue_at(&user, now).unwrap();
        assert_eq!(first.token, second.token);
    }

    #[test]
    fn test_expired_token() {
        let manager = manager();
        let issued_at = Utc::now() - Duration::seconds(86400 + 5);

        let issued = manager.issue_at(&user(), issued_at).unwrap();
        assert_eq!(manager.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_out_of_range_ttl_is_error() {
        for ttl in [i64::MAX / 100, i64::MAX] {
            let manager = JwtManager::new(JwtConfig::new("unit-test-secret", ttl, "auth-service"));
            assert!(matches!(manager.issue(&user()), Err(AuthError::Internal(_))));
        }
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let manager = manager();
        let issued = manager.issue(&user()).unwrap();

        let tampered = tamper_signature(&issued.token);
        assert_ne!(tampered, issued.token);
        assert_eq!(manager.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let manager = manager();
        let issued = manager.issue(&user()).unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let forged_claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "mallory".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
            iss: "auth-service".to_string(),
        };
        let forged_payload = {
            use base64::Engine;
            base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(serde_json::to_vec(&forged_claims).unwrap())
        };
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(manager.verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issued = manager().issue(&user()).unwrap();
        let other = JwtManager::new(JwtConfig::new("another-secret", 86400, "auth-service"));

        assert_eq!(other.verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let issued = manager().issue(&user()).unwrap();
        let other = JwtManager::new(JwtConfig::new("unit-test-secret", 86400, "someone-else"));

        assert_eq!(other.verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let manager = manager();
        for token in ["", "invalid.token.here", "a.b", "...", "not a token at all"] {
            assert_eq!(manager.verify(token), Err(TokenError::Invalid), "{:?}", token);
        }
    }

    #[test]
    fn test_config_requires_secret() {
        let config = TokenConfig::default();
        assert!(JwtConfig::try_from(&config).is_err());

        let config = TokenConfig {
            secret: Some("s3cret".to_string()),
            ..Default::default()
        };
        let jwt_config = JwtConfig::try_from(&config).unwrap();
        assert_eq!(jwt_config.expires_in_secs, 86400);
        assert!(!format!("{:?}", jwt_config).contains("s3cret"));
    }
}
