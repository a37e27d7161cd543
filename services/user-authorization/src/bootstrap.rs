//! 启动装配：配置 -> 连接池 -> 存储 -> 仓储

use std::sync::Arc;
use std::time::Duration;

use rbac_adapter_postgres::{
    IsolationLevel, MigrationManager, MigrationResult, PostgresAssociationStore, PostgresConfig,
    TransactionOptions, association_migrations, check_connection, create_pool,
};
use rbac_config::DatabaseConfig;
use rbac_errors::AppResult;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::DefaultUserAuthorizationRepository;

/// 数据库配置 -> 连接池配置
pub fn postgres_config(config: &DatabaseConfig) -> PostgresConfig {
    PostgresConfig::new(config.url.expose_secret().clone())
        .with_max_connections(config.max_connections)
        .with_min_connections(config.min_connections)
        .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .with_idle_timeout(Duration::from_secs(config.idle_timeout_secs))
}

/// 替换操作所用的事务选项
pub fn transaction_options(config: &DatabaseConfig) -> AppResult<TransactionOptions> {
    let level: IsolationLevel = config.isolation_level.parse()?;
    Ok(TransactionOptions::new().with_isolation_level(level))
}

/// 建立连接池并验证连通性
pub async fn connect(config: &DatabaseConfig) -> AppResult<PostgresAssociationStore> {
    let options = transaction_options(config)?;
    let pool = create_pool(&postgres_config(config)).await?;
    check_connection(&pool).await?;

    Ok(PostgresAssociationStore::new(pool).with_transaction_options(options))
}

/// 应用关联表迁移
pub async fn migrate(pool: &PgPool) -> AppResult<MigrationResult> {
    let result = MigrationManager::new(pool.clone())
        .migrate(&association_migrations())
        .await?;

    info!(
        applied = result.applied_count(),
        skipped = result.skipped.len(),
        "Association schema migrated"
    );
    Ok(result)
}

/// 基于 PostgreSQL 存储构建仓储
pub async fn build_repository(
    config: &DatabaseConfig,
) -> AppResult<DefaultUserAuthorizationRepository> {
    let store = connect(config).await?;
    Ok(DefaultUserAuthorizationRepository::new(Arc::new(store)))
}
