//! 认证服务
//!
//! 提供用户名/密码注册、凭证校验和无状态访问令牌的签发与验证。
//!
//! ## 核心功能
//!
//! - **注册**：密码强度校验，bcrypt 哈希后写入用户存储，用户名全局唯一
//! - **登录**：校验凭证并签发 HS256 签名的访问令牌
//! - **访问守卫**：验证 Bearer Token 并解析当前用户
//!
//! ## 模块结构
//!
//! - `auth`: 密码策略、密码哈希与 JWT 处理
//! - `service`: 认证业务编排
//! - `repository`: 用户存储接口及 PostgreSQL/内存实现
//! - `models`: 用户记录与对外视图
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 访问守卫与安全头
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 密码哈希：bcrypt
//! - 令牌：jsonwebtoken
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

// 重新导出核心类型
pub use auth::{JwtConfig, JwtManager, PasswordHasher, PasswordPolicy};
pub use error::{AuthError, Result};
pub use models::{NewAccount, User, UserView};
pub use repository::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use service::AuthService;
pub use state::AppState;
