//! 中间件模块
//!
//! 提供访问守卫和安全头中间件

mod auth;
mod security;

pub use auth::{CurrentUser, require_auth};
pub use security::security_headers;
