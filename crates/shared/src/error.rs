//! 存储层错误模块
//!
//! 定义用户记录存储共用的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// PostgreSQL 唯一约束冲突的 SQLSTATE
const PG_UNIQUE_VIOLATION: &str = "23505";

/// 存储层错误类型
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[source] sqlx::Error),

    /// 唯一约束冲突，调用方据此区分“记录已存在”与其它故障
    #[error("记录已存在: {entity} {field}={value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 存储结果类型别名
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// 构造唯一约束冲突错误
    pub fn already_exists(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

/// 判断数据库错误是否为唯一约束冲突
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION),
        _ => false,
    }
}
