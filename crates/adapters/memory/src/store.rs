//! 内存存储实现
//!
//! 两张关联表各用一个 `BTreeSet<(UserId, i64)>` 表示，集合本身即主键约束。
//! 事务持有整张表的锁并在副本上修改，提交时整体写回，因此事务之间以及
//! 事务与普通语句之间都是串行的。

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use rbac_common::UserId;
use rbac_errors::{AppError, AppResult};
use rbac_ports::{Association, AssociationStore, AssociationTable, AssociationTransaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// 可注入故障的存储操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Insert,
    DeletePairs,
    DeleteByUser,
    Count,
    List,
    Begin,
    Commit,
}

type Rows = BTreeSet<(UserId, i64)>;

#[derive(Debug, Clone, Default)]
struct Tables {
    user_roles: Rows,
    user_permissions: Rows,
}

impl Tables {
    fn rows(&self, table: AssociationTable) -> &Rows {
        match table {
            AssociationTable::UserRoles => &self.user_roles,
            AssociationTable::UserPermissions => &self.user_permissions,
        }
    }

    fn rows_mut(&mut self, table: AssociationTable) -> &mut Rows {
        match table {
            AssociationTable::UserRoles => &mut self.user_roles,
            AssociationTable::UserPermissions => &mut self.user_permissions,
        }
    }

    fn insert_ignore(&mut self, table: AssociationTable, rows: &[Association]) -> u64 {
        let target = self.rows_mut(table);
        rows.iter()
            .filter(|row| target.insert((row.user_id, row.target_id)))
            .count() as u64
    }

    fn delete_pairs(&mut self, table: AssociationTable, rows: &[Association]) -> u64 {
        let target = self.rows_mut(table);
        rows.iter()
            .filter(|row| target.remove(&(row.user_id, row.target_id)))
            .count() as u64
    }

    fn delete_by_user(&mut self, table: AssociationTable, user_id: &UserId) -> u64 {
        let target = self.rows_mut(table);
        let before = target.len();
        target.retain(|(uid, _)| uid != user_id);
        (before - target.len()) as u64
    }

    fn count_matching(&self, table: AssociationTable, user_id: &UserId, target_ids: &[i64]) -> i64 {
        // 与 SQL 的 `IN (...)` 一致：重复的 id 不会让同一行被数两次
        let ids: BTreeSet<i64> = target_ids.iter().copied().collect();
        ids.into_iter()
            .filter(|id| self.rows(table).contains(&(*user_id, *id)))
            .count() as i64
    }

    fn list_targets(&self, table: AssociationTable, user_id: &UserId) -> Vec<i64> {
        self.rows(table)
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .map(|(_, id)| *id)
            .collect()
    }
}

/// 一次性故障注入
#[derive(Debug, Default)]
struct FailureInjector {
    pending: Mutex<Vec<(StoreOperation, AppError)>>,
}

impl FailureInjector {
    async fn arm(&self, operation: StoreOperation, error: AppError) {
        self.pending.lock().await.push((operation, error));
    }

    async fn check(&self, operation: StoreOperation) -> AppResult<()> {
        let mut pending = self.pending.lock().await;
        match pending.iter().position(|(op, _)| *op == operation) {
            Some(index) => {
                let (_, error) = pending.remove(index);
                debug!(?operation, error = %error, "Injected store failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

/// 内存关联表存储
///
/// `Clone` 得到的是同一份数据的句柄。
#[derive(Debug, Clone, Default)]
pub struct MemoryAssociationStore {
    tables: Arc<Mutex<Tables>>,
    failures: Arc<FailureInjector>,
}

impl MemoryAssociationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让下一次 `operation` 返回给定错误（事务内的同名操作同样生效）
    pub async fn fail_next(&self, operation: StoreOperation, error: AppError) {
        self.failures.arm(operation, error).await;
    }

    /// 表中的总行数
    pub async fn row_count(&self, table: AssociationTable) -> usize {
        self.tables.lock().await.rows(table).len()
    }
}

#[async_trait]
impl AssociationStore for MemoryAssociationStore {
    async fn insert_ignore(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64> {
        self.failures.check(StoreOperation::Insert).await?;
        Ok(self.tables.lock().await.insert_ignore(table, rows))
    }

    async fn delete_pairs(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64> {
        self.failures.check(StoreOperation::DeletePairs).await?;
        Ok(self.tables.lock().await.delete_pairs(table, rows))
    }

    async fn delete_by_user(&self, table: AssociationTable, user_id: &UserId) -> AppResult<u64> {
        self.failures.check(StoreOperation::DeleteByUser).await?;
        Ok(self.tables.lock().await.delete_by_user(table, user_id))
    }

    async fn count_matching(
        &self,
        table: AssociationTable,
        user_id: &UserId,
        target_ids: &[i64],
    ) -> AppResult<i64> {
        self.failures.check(StoreOperation::Count).await?;
        Ok(self
            .tables
            .lock()
            .await
            .count_matching(table, user_id, target_ids))
    }

    async fn list_targets(&self, table: AssociationTable, user_id: &UserId) -> AppResult<Vec<i64>> {
        self.failures.check(StoreOperation::List).await?;
        Ok(self.tables.lock().await.list_targets(table, user_id))
    }

    async fn begin(&self) -> AppResult<Box<dyn AssociationTransaction>> {
        self.failures.check(StoreOperation::Begin).await?;
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        debug!("Memory transaction started");

        Ok(Box::new(MemoryAssociationTransaction {
            guard,
            working,
            failures: self.failures.clone(),
        }))
    }
}

/// 内存事务：在副本上修改，提交时写回
pub struct MemoryAssociationTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    failures: Arc<FailureInjector>,
}

#[async_trait]
impl AssociationTransaction for MemoryAssociationTransaction {
    async fn lock_user(&mut self, _table: AssociationTable, _user_id: &UserId) -> AppResult<()> {
        // 事务已独占整张表
        Ok(())
    }

    async fn insert_ignore(
        &mut self,
        table: AssociationTable,
        rows: &[Association],
    ) -> AppResult<u64> {
        self.failures.check(StoreOperation::Insert).await?;
        Ok(self.working.insert_ignore(table, rows))
    }

    async fn delete_by_user(
        &mut self,
        table: AssociationTable,
        user_id: &UserId,
    ) -> AppResult<u64> {
        self.failures.check(StoreOperation::DeleteByUser).await?;
        Ok(self.working.delete_by_user(table, user_id))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.failures.check(StoreOperation::Commit).await?;
        let MemoryAssociationTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        debug!("Memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        debug!("Memory transaction rolled back");
        Ok(())
    }
}
