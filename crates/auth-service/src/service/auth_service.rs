//! 认证服务
//!
//! 编排注册、凭证校验、登录和 Token 身份解析，承载全部认证业务规则。
//!
//! ## 注册流程
//!
//! 1. 密码强度校验 -> 2. 密码哈希（阻塞线程池）-> 3. 用户名预检查
//!    -> 4. 插入记录（存储层唯一约束兜底并发注册）-> 5. 返回去除哈希的视图
//!
//! ## 登录流程
//!
//! 1. 按用户名查找 -> 2. 校验密码（用户不存在时校验诱饵哈希）-> 3. 签发 Token
//!
//! “用户不存在”与“密码错误”对调用方不可区分。

use std::sync::Arc;

use auth_shared::observability::metrics;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{IssuedToken, JwtManager, PasswordHasher, PasswordPolicy, TokenError};
use crate::error::{AuthError, Result};
use crate::models::{NewAccount, NewUser, User, UserView};
use crate::repository::CredentialStore;

/// 认证服务
///
/// 除协作者句柄外无可变状态，启动时构造后在请求间共享。
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    policy: PasswordPolicy,
    hasher: PasswordHasher,
    tokens: JwtManager,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        policy: PasswordPolicy,
        hasher: PasswordHasher,
        tokens: JwtManager,
    ) -> Self {
        Self {
            store,
            policy,
            hasher,
            tokens,
        }
    }

    /// 注册新用户
    ///
    /// 预检查只用于尽早给出明确错误；并发同名注册由存储层原子插入裁决，
    /// 落败方同样得到 `UsernameTaken`。
    #[instrument(skip(self, account), fields(username = %account.username))]
    pub async fn register(&self, account: NewAccount) -> Result<UserView> {
        if let Err(e) = self.policy.check(&account.password) {
            metrics::record_registration("weak_password");
            info!("密码强度不足，拒绝注册");
            return Err(e);
        }

        let NewAccount {
            username,
            password,
            email,
            display_name,
        } = account;

        let password_hash = self
            .hasher
            .hash_blocking(password)
            .await
            .inspect_err(|_| metrics::record_registration("error"))?;

        let existing = self
            .store
            .find_by_username(&username)
            .await
            .inspect_err(|_| metrics::record_registration("error"))?;
        if existing.is_some() {
            metrics::record_registration("username_taken");
            info!("用户名已存在，拒绝注册");
            return Err(AuthError::UsernameTaken);
        }

        let new_user = NewUser {
            username,
            password_hash,
            email,
            display_name,
        };

        match self.store.insert(new_user).await.map_err(AuthError::from) {
            Ok(user) => {
                metrics::record_registration("created");
                info!(user_id = %user.id, "用户注册成功");
                Ok(user.into())
            }
            Err(AuthError::UsernameTaken) => {
                metrics::record_registration("username_taken");
                warn!("并发注册冲突，存储层唯一约束拒绝插入");
                Err(AuthError::UsernameTaken)
            }
            Err(e) => {
                metrics::record_registration("error");
                Err(e)
            }
        }
    }

    /// 校验用户名和密码
    ///
    /// 仅在存储故障时返回错误；任何凭证不匹配（含空输入）都返回 `Ok(None)`，
    /// 且走相同的查找与校验路径。
    #[instrument(skip(self, password))]
    pub async fn validate_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = self.store.find_by_username(username).await?;
        let digest = user.as_ref().map(|u| u.password_hash.clone());

        let matched = self
            .hasher
            .verify_blocking(password.to_string(), digest)
            .await?;

        Ok(user.filter(|_| matched))
    }

    /// 按标识查找用户
    #[instrument(skip(self))]
    pub async fn validate_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// 登录并签发访问令牌
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let user = match self.validate_credentials(username, password).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                metrics::record_login("invalid_credentials");
                info!("登录失败：用户名或密码错误");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                metrics::record_login("error");
                return Err(e);
            }
        };

        let issued = self
            .issue_token(&user)
            .inspect_err(|_| metrics::record_login("error"))?;

        metrics::record_login("success");
        info!(user_id = %user.id, "登录成功");
        Ok(issued)
    }

    /// 为用户签发访问令牌
    pub fn issue_token(&self, user: &User) -> Result<IssuedToken> {
        self.tokens.issue(user)
    }

    /// 解析访问令牌对应的用户
    ///
    /// 校验签名与有效期后，按 `sub` 重新查找用户；
    /// 标识无法解析或用户已不存在时返回 `Unauthorized`。
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                let outcome = match e {
                    TokenError::Expired => "expired",
                    TokenError::Invalid => "invalid",
                };
                metrics::record_token_verification(outcome);
                info!(reason = outcome, "Token 校验失败");
                return Err(e.into());
            }
        };

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            metrics::record_token_verification("invalid");
            warn!(sub = %claims.sub, "Token 主体不是合法的用户标识");
            return Err(AuthError::TokenInvalid);
        };

        match self.validate_by_id(user_id).await? {
            Some(user) => {
                metrics::record_token_verification("valid");
                Ok(user)
            }
            None => {
                metrics::record_token_verification("unknown_subject");
                warn!(user_id = %user_id, "Token 对应的用户不存在");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// 存储可用性探测
    pub async fn health_check(&self) -> Result<()> {
        Ok(self.store.health_check().await?)
    }

    /// Token 有效期（秒）
    pub fn token_ttl_secs(&self) -> i64 {
        self.tokens.expires_in_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use crate::repository::MockCredentialStore;
    use auth_shared::error::StoreError;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    const SECRET: &str = "service-test-secret";

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    fn jwt() -> JwtManager {
        JwtManager::new(JwtConfig::new(SECRET, 3600, "auth-service"))
    }

    fn service(store: MockCredentialStore) -> AuthService {
        AuthService::new(Arc::new(store), PasswordPolicy::default(), hasher(), jwt())
    }

    fn stored_user(username: &str, password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hasher().hash(password).unwrap(),
            email: None,
            display_name: None,
            created_at: Utc::now(),
        }
    }

    fn created_from(new_user: NewUser) -> User {
        User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            email: new_user.email,
            display_name: new_user.display_name,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_register_success_stores_hash_not_plaintext() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .withf(|u| u == "alice")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_insert()
            .withf(|u| {
                u.username == "alice"
                    && u.password_hash != "Secret99x"
                    && bcrypt::verify("Secret99x", &u.password_hash).unwrap_or(false)
            })
            .times(1)
            .returning(|u| Ok(created_from(u)));

        let mut account = NewAccount::new("alice", "Secret99x");
        account.email = Some("alice@example.com".to_string());

        let view = service(store).register(account).await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_register_weak_password_never_touches_store() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().never();
        store.expect_insert().never();

        let err = service(store)
            .register(NewAccount::new("alice", "weak"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword { min_length: 8 }));
    }

    #[tokio::test]
    async fn test_register_taken_username() {
        let existing = stored_user("alice", "Original1x");
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(move |_| Ok(Some(existing.clone())));
        store.expect_insert().never();

        let err = service(store)
            .register(NewAccount::new("alice", "Secret99x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_register_insert_conflict_maps_to_username_taken() {
        // 预检查通过，但并发注册者先完成插入
        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));
        store.expect_insert().times(1).returning(|u| {
            Err(StoreError::already_exists("User", "username", u.username))
        });

        let err = service(store)
            .register(NewAccount::new("alice", "Secret99x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_register_store_failure_is_internal() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(|_| Err(StoreError::Internal("connection reset".to_string())));
        store.expect_insert().never();

        let err = service(store)
            .register(NewAccount::new("alice", "Secret99x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn test_validate_credentials_outcomes() {
        let alice = stored_user("alice", "Secret99x");
        let alice_id = alice.id;

        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().returning(move |username| {
            Ok((username == "alice").then(|| alice.clone()))
        });
        let service = service(store);

        let found = service
            .validate_credentials("alice", "Secret99x")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice_id));

        assert!(
            service
                .validate_credentials("alice", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            service
                .validate_credentials("nobody", "Secret99x")
                .await
                .unwrap()
                .is_none()
        );
        assert!(service.validate_credentials("", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate_by_id() {
        let alice = stored_user("alice", "Secret99x");
        let alice_id = alice.id;
        let missing = Uuid::new_v4();

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_id()
            .with(eq(alice_id))
            .returning(move |_| Ok(Some(alice.clone())));
        store
            .expect_find_by_id()
            .with(eq(missing))
            .returning(|_| Ok(None));
        let service = service(store);

        assert_eq!(
            service.validate_by_id(alice_id).await.unwrap().unwrap().username,
            "alice"
        );
        assert!(service.validate_by_id(missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_issues_token_for_user() {
        let alice = stored_user("alice", "Secret99x");
        let alice_id = alice.id;

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(move |_| Ok(Some(alice.clone())));
        let service = service(store);

        let issued = service.login("alice", "Secret99x").await.unwrap();
        let claims = jwt().verify(&issued.token).unwrap();
        assert_eq!(claims.sub, alice_id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(issued.expires_at - claims.iat, service.token_ttl_secs());

        let err = service.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_user_matches_wrong_password() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));

        let err = service(store).login("ghost", "Secret99x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), AuthError::InvalidCredentials.to_string());
    }

    #[tokio::test]
    async fn test_authenticate_resolves_principal() {
        let alice = stored_user("alice", "Secret99x");
        let token = jwt().issue(&alice).unwrap().token;
        let alice_id = alice.id;

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_id()
            .with(eq(alice_id))
            .times(1)
            .returning(move |_| Ok(Some(alice.clone())));

        let user = service(store).authenticate(&token).await.unwrap();
        assert_eq!(user.id, alice_id);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_tokens_without_lookup() {
        let alice = stored_user("alice", "Secret99x");
        let expired = jwt()
            .issue_at(&alice, Utc::now() - Duration::seconds(7200))
            .unwrap()
            .token;
        let foreign = JwtManager::new(JwtConfig::new("other-secret", 3600, "auth-service"))
            .issue(&alice)
            .unwrap()
            .token;

        let mut store = MockCredentialStore::new();
        store.expect_find_by_id().never();
        let service = service(store);

        assert!(matches!(
            service.authenticate(&expired).await,
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            service.authenticate(&foreign).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            service.authenticate("garbage").await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_principal_is_unauthorized() {
        let ghost = stored_user("ghost", "Secret99x");
        let token = jwt().issue(&ghost).unwrap().token;

        let mut store = MockCredentialStore::new();
        store.expect_find_by_id().times(1).returning(|_| Ok(None));

        let err = service(store).authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
