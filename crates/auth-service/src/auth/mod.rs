//! 认证模块
//!
//! 提供密码强度校验、密码哈希以及 JWT Token 签发和验证功能

mod jwt;
mod password;

pub use jwt::{Claims, IssuedToken, JwtConfig, JwtManager, TokenError};
pub use password::{PasswordHasher, PasswordPolicy};
