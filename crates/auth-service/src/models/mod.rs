//! 认证服务模型模块
//!
//! 包含用户记录及其对外视图

pub mod user;

pub use user::{NewAccount, NewUser, User, UserView};
