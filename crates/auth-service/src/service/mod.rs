//! 服务层
//!
//! 实现认证业务规则，协调存储、密码哈希和 Token 签发。
//!
//! ## 模块结构
//!
//! - `auth_service`: 注册、凭证校验、登录与 Token 身份解析

pub mod auth_service;

pub use auth_service::AuthService;
