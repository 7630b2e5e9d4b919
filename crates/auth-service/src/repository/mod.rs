//! 用户记录存储模块
//!
//! 服务层只依赖 `CredentialStore` 抽象；PostgreSQL 与内存两种实现
//! 都在插入时原子地保证用户名唯一。

mod memory_store;
mod pg_store;
mod traits;

pub use memory_store::MemoryCredentialStore;
pub use pg_store::PgCredentialStore;
pub use traits::CredentialStore;

#[cfg(test)]
pub use traits::MockCredentialStore;
