//! 密码处理
//!
//! 提供密码强度校验、bcrypt 哈希和校验功能

use std::time::Instant;

use auth_shared::config::PasswordConfig;
use auth_shared::observability::metrics;
use bcrypt::{non_truncating_hash, non_truncating_verify};
use tracing::debug;

use crate::error::{AuthError, Result};

/// bcrypt 可处理的最大密码字节数
pub const MAX_PASSWORD_BYTES: usize = 72;

/// 密码强度策略
///
/// 必须同时满足：至少一个大写字母 `[A-Z]`、至少一个数字 `[0-9]`，
/// 字符数严格大于 `min_length`，且 UTF-8 编码不超过 72 字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn from_config(config: &PasswordConfig) -> Self {
        Self::new(config.min_length)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// 判断密码是否满足强度要求
    pub fn is_strong(&self, password: &str) -> bool {
        let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_length = password.chars().count() > self.min_length;
        let fits_bcrypt = password.len() <= MAX_PASSWORD_BYTES;

        has_uppercase && has_digit && has_length && fits_bcrypt
    }

    /// 校验密码强度，不满足时返回 `WeakPassword`
    pub fn check(&self, password: &str) -> Result<()> {
        if self.is_strong(password) {
            Ok(())
        } else {
            Err(AuthError::WeakPassword {
                min_length: self.min_length,
            })
        }
    }
}

/// bcrypt 密码哈希器
///
/// 同时持有一个按相同成本生成的诱饵哈希：用户不存在时仍对其执行一次校验，
/// 使“用户不存在”和“密码错误”两条路径耗时一致。
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: String,
}

impl PasswordHasher {
    /// 创建哈希器
    ///
    /// 成本因子超出 bcrypt 允许范围（4-31）时返回错误
    pub fn new(cost: u32) -> Result<Self> {
        let decoy_hash = non_truncating_hash("decoy-password-never-matches", cost)
            .map_err(|e| AuthError::Internal(format!("密码哈希器初始化失败: {}", e)))?;

        Ok(Self { cost, decoy_hash })
    }

    pub fn from_config(config: &PasswordConfig) -> Result<Self> {
        Self::new(config.hash_cost)
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// 对密码进行哈希处理
    ///
    /// 每次调用使用新的随机盐，相同输入得到不同摘要。
    /// 超过 72 字节的密码返回错误，不做截断
    pub fn hash(&self, password: &str) -> Result<String> {
        let start = Instant::now();
        let hashed = non_truncating_hash(password, self.cost)
            .map_err(|e| AuthError::Internal(format!("密码哈希失败: {}", e)))?;
        metrics::record_password_hash("hash", start.elapsed().as_secs_f64());
        Ok(hashed)
    }

    /// 验证密码
    ///
    /// 摘要格式错误或密码超过 72 字节时返回 false，不向调用方抛出错误
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let start = Instant::now();
        let matched = match non_truncating_verify(password, digest) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, "密码无法校验，按不匹配处理");
                false
            }
        };
        metrics::record_password_hash("verify", start.elapsed().as_secs_f64());
        matched
    }

    /// 对诱饵哈希执行一次校验，结果总是 false
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy_hash);
        false
    }

    /// 在阻塞线程池中哈希，避免占用异步工作线程
    pub async fn hash_blocking(&self, password: String) -> Result<String> {
        let hasher = self.clone();
        spawn_blocking_in_span(move || hasher.hash(&password)).await?
    }

    /// 在阻塞线程池中校验；`digest` 为 None 时校验诱饵哈希
    pub async fn verify_blocking(&self, password: String, digest: Option<String>) -> Result<bool> {
        let hasher = self.clone();
        spawn_blocking_in_span(move || match digest {
            Some(digest) => hasher.verify(&password, &digest),
            None => hasher.verify_decoy(&password),
        })
        .await
    }
}

/// 在阻塞线程池中执行任务，并沿用当前 span
async fn spawn_blocking_in_span<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
        .await
        .map_err(|e| AuthError::Internal(format!("阻塞任务执行失败: {}", e)))
}
