//! PostgreSQL 关联表存储实现

use async_trait::async_trait;
use rbac_common::UserId;
use rbac_errors::AppResult;
use rbac_ports::{Association, AssociationStore, AssociationTable, AssociationTransaction};
use sqlx::{Executor, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error_mapper::map_sqlx_error;
use crate::metrics::QueryTimer;
use crate::transaction::{TransactionManager, TransactionOptions};

/// 拆成两列数组，配合 `UNNEST` 一条语句写入
fn split_columns(rows: &[Association]) -> (Vec<Uuid>, Vec<i64>) {
    rows.iter().map(|row| (row.user_id.0, row.target_id)).unzip()
}

/// 事务级咨询锁的键：同一用户的两张表互不阻塞
fn advisory_lock_key(table: AssociationTable, user_id: &UserId) -> String {
    format!("{}:{}", table.table_name(), user_id)
}

async fn insert_ignore_with<'e, E>(
    executor: E,
    table: AssociationTable,
    rows: &[Association],
) -> AppResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let (user_ids, target_ids) = split_columns(rows);
    let sql = format!(
        r#"
        INSERT INTO {table} (user_id, {column})
        SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[])
        ON CONFLICT DO NOTHING
        "#,
        table = table.table_name(),
        column = table.target_column(),
    );

    let timer = QueryTimer::new(table.table_name(), "insert_ignore");
    let result = sqlx::query(&sql)
        .bind(&user_ids)
        .bind(&target_ids)
        .execute(executor)
        .await;

    Ok(timer.observe(result).map_err(map_sqlx_error)?.rows_affected())
}

async fn delete_by_user_with<'e, E>(
    executor: E,
    table: AssociationTable,
    user_id: &UserId,
) -> AppResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("DELETE FROM {} WHERE user_id = $1", table.table_name());

    let timer = QueryTimer::new(table.table_name(), "delete_by_user");
    let result = sqlx::query(&sql).bind(user_id.0).execute(executor).await;

    Ok(timer.observe(result).map_err(map_sqlx_error)?.rows_affected())
}

/// PostgreSQL 关联表存储
#[derive(Clone)]
pub struct PostgresAssociationStore {
    manager: TransactionManager,
    tx_options: TransactionOptions,
}

impl PostgresAssociationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            manager: TransactionManager::new(pool),
            tx_options: TransactionOptions::default(),
        }
    }

    /// 设置 `begin` 使用的事务选项
    pub fn with_transaction_options(mut self, options: TransactionOptions) -> Self {
        self.tx_options = options;
        self
    }

    pub fn pool(&self) -> &PgPool {
        self.manager.pool()
    }
}

#[async_trait]
impl AssociationStore for PostgresAssociationStore {
    async fn insert_ignore(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64> {
        insert_ignore_with(self.pool(), table, rows).await
    }

    async fn delete_pairs(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let (user_ids, target_ids) = split_columns(rows);
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE (user_id, {column}) IN (SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[]))
            "#,
            table = table.table_name(),
            column = table.target_column(),
        );

        let timer = QueryTimer::new(table.table_name(), "delete_pairs");
        let result = sqlx::query(&sql)
            .bind(&user_ids)
            .bind(&target_ids)
            .execute(self.pool())
            .await;

        Ok(timer.observe(result).map_err(map_sqlx_error)?.rows_affected())
    }

    async fn delete_by_user(&self, table: AssociationTable, user_id: &UserId) -> AppResult<u64> {
        delete_by_user_with(self.pool(), table, user_id).await
    }

    async fn count_matching(
        &self,
        table: AssociationTable,
        user_id: &UserId,
        target_ids: &[i64],
    ) -> AppResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = $1 AND {} = ANY($2)",
            table.table_name(),
            table.target_column(),
        );

        let timer = QueryTimer::new(table.table_name(), "count_matching");
        let result = sqlx::query_scalar::<_, i64>(&sql)
            .bind(user_id.0)
            .bind(target_ids)
            .fetch_one(self.pool())
            .await;

        timer.observe(result).map_err(map_sqlx_error)
    }

    async fn list_targets(&self, table: AssociationTable, user_id: &UserId) -> AppResult<Vec<i64>> {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE user_id = $1 ORDER BY {column}",
            table = table.table_name(),
            column = table.target_column(),
        );

        let timer = QueryTimer::new(table.table_name(), "list_targets");
        let result = sqlx::query_scalar::<_, i64>(&sql)
            .bind(user_id.0)
            .fetch_all(self.pool())
            .await;

        timer.observe(result).map_err(map_sqlx_error)
    }

    async fn begin(&self) -> AppResult<Box<dyn AssociationTransaction>> {
        let tx = self.manager.begin_with_options(&self.tx_options).await?;
        Ok(Box::new(PostgresAssociationTransaction { tx }))
    }
}

/// PostgreSQL 关联表事务
///
/// 未提交即被丢弃时，sqlx 会在连接归还连接池前发出 ROLLBACK。
pub struct PostgresAssociationTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AssociationTransaction for PostgresAssociationTransaction {
    async fn lock_user(&mut self, table: AssociationTable, user_id: &UserId) -> AppResult<()> {
        let timer = QueryTimer::new(table.table_name(), "lock_user");
        let result = sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(advisory_lock_key(table, user_id))
            .execute(&mut *self.tx)
            .await;

        timer.observe(result).map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_ignore(
        &mut self,
        table: AssociationTable,
        rows: &[Association],
    ) -> AppResult<u64> {
        insert_ignore_with(&mut *self.tx, table, rows).await
    }

    async fn delete_by_user(
        &mut self,
        table: AssociationTable,
        user_id: &UserId,
    ) -> AppResult<u64> {
        delete_by_user_with(&mut *self.tx, table, user_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        debug!("Transaction rolled back");
        Ok(())
    }
}
