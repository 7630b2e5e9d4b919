//! 内存用户存储
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试和本地开发环境。

use std::sync::Arc;

use async_trait::async_trait;
use auth_shared::error::{Result, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::traits::CredentialStore;
use crate::models::{NewUser, User};

/// 内存用户存储
///
/// 以用户名为主键保存记录，另维护 id -> 用户名索引。
/// 插入通过 entry API 在分片锁内完成“检查并插入”，并发注册同名用户时只有一个成功。
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    by_username: Arc<DashMap<String, User>>,
    username_by_id: Arc<DashMap<Uuid, String>>,
}

impl MemoryCredentialStore {
    /// 创建新的内存存储实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取记录总数
    pub fn count(&self) -> usize {
        self.by_username.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.by_username.get(username).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let Some(username) = self.username_by_id.get(&id).map(|u| u.clone()) else {
            return Ok(None);
        };
        Ok(self.by_username.get(&username).map(|u| u.clone()))
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        match self.by_username.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::already_exists(
                "User",
                "username",
                user.username,
            )),
            Entry::Vacant(slot) => {
                let record = User {
                    id: Uuid::new_v4(),
                    username: user.username,
                    password_hash: user.password_hash,
                    email: user.email,
                    display_name: user.display_name,
                    created_at: Utc::now(),
                };
                self.username_by_id
                    .insert(record.id, record.username.clone());
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
