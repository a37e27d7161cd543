//! User Authorization - 关联表迁移入口
//!
//! 加载配置、初始化日志、连接数据库并应用迁移后退出

use anyhow::{Context, bail};
use rbac_adapter_postgres::DbMetrics;
use rbac_config::AppConfig;
use tracing::{debug, error, info};
use user_authorization::bootstrap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir).context("failed to load configuration")?;
    rbac_telemetry::init_from_config(&config.telemetry)?;
    let metrics = rbac_telemetry::init_metrics()?;

    info!(app = %config.app_name, env = %config.app_env, "Starting schema migration");

    let store = bootstrap::connect(&config.database).await?;
    let result = bootstrap::migrate(store.pool()).await?;
    DbMetrics::record_pool_state(store.pool(), "rbac");
    debug!(metrics = %metrics.render(), "Migration metrics");

    if !result.is_success() {
        for failure in &result.errors {
            error!(
                version = failure.version,
                name = %failure.name,
                error = %failure.error,
                "Migration failed"
            );
        }
        bail!("{} migration(s) failed", result.errors.len());
    }

    info!(applied = ?result.applied, "Schema is up to date");
    Ok(())
}
