//! 认证服务
//!
//! 提供用户注册、登录和访问令牌验证的 REST API。

use std::sync::Arc;

use auth_service::{
    AppState, AuthService, CredentialStore, JwtConfig, JwtManager, MemoryCredentialStore,
    PasswordHasher, PasswordPolicy, PgCredentialStore, routes,
};
use auth_shared::{
    config::{AppConfig, StoreBackend},
    database::Database,
    observability,
};
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "auth-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置加载：config/ 目录下的 TOML 文件，AUTH_ 前缀环境变量覆盖
    let config = AppConfig::load(SERVICE_NAME)?;
    config.validate()?;

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        backend = ?config.store.backend,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    let (store, database) = build_store(&config).await?;

    let policy = PasswordPolicy::from_config(&config.password);
    let hasher = PasswordHasher::from_config(&config.password)?;
    let tokens = JwtManager::new(JwtConfig::try_from(&config.token)?);
    info!(
        min_length = policy.min_length(),
        hash_cost = hasher.cost(),
        token_ttl_secs = tokens.expires_in_secs(),
        "Auth service configured"
    );

    let state = AppState::new(AuthService::new(store, policy, hasher, tokens));

    let app = routes::app(state).layer(cors_layer(&config));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");

    Ok(())
}

/// 按配置构造用户存储
///
/// PostgreSQL 后端同时返回连接池，供关闭时释放
async fn build_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn CredentialStore>, Option<Database>)> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            let store = PgCredentialStore::new(db.pool().clone());
            if config.database.run_migrations {
                store.run_migrations().await?;
            }
            Ok((Arc::new(store), Some(db)))
        }
        StoreBackend::Memory => {
            if config.is_production() {
                warn!("生产环境使用内存存储，进程重启后用户数据将丢失");
            }
            Ok((Arc::new(MemoryCredentialStore::new()), None))
        }
    }
}

/// CORS 配置：`server.cors_origins` 为逗号分隔的来源列表，`*` 表示全部放行
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config.server.cors_origins.trim();

    if allowed_origins == "*" {
        if config.is_production() {
            warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 任一信号后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
