//! HTTP 请求处理器
//!
//! - `auth`: 注册、登录、当前用户
//! - `health`: 存活与就绪探针

pub mod auth;
pub mod health;
