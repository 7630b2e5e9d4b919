//! 存储 Trait 定义
//!
//! 定义用户记录存储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use auth_shared::error::Result;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// 用户记录存储接口
///
/// `insert` 必须原子地检查用户名唯一性：冲突时返回
/// `StoreError::AlreadyExists`，且不得修改已有记录。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn insert(&self, user: NewUser) -> Result<User>;

    /// 存储可用性探测（就绪探针使用）
    async fn health_check(&self) -> Result<()>;
}
