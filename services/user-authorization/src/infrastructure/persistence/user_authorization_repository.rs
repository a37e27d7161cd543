//! 用户授权仓储实现
//!
//! 所有语句都经由注入的 `AssociationStore` 执行，替换操作在同一事务内完成删除与插入。

use std::sync::Arc;

use async_trait::async_trait;
use rbac_common::{PermissionId, RoleId, UserId};
use rbac_errors::AppResult;
use rbac_ports::{Association, AssociationStore, AssociationTable, AssociationTransaction};
use tracing::{instrument, warn};

use crate::domain::{
    Permission, Permissions, Role, Roles, UserAuthorizationRepository, UserPermission, UserRole,
};

fn role_rows(user_id: &UserId, roles: &Roles) -> Vec<Association> {
    UserRole::for_roles(*user_id, roles)
        .into_iter()
        .map(Into::into)
        .collect()
}

fn permission_rows(user_id: &UserId, permissions: &Permissions) -> Vec<Association> {
    UserPermission::for_permissions(*user_id, permissions)
        .into_iter()
        .map(Into::into)
        .collect()
}

pub struct DefaultUserAuthorizationRepository {
    store: Arc<dyn AssociationStore>,
}

impl DefaultUserAuthorizationRepository {
    pub fn new(store: Arc<dyn AssociationStore>) -> Self {
        Self { store }
    }

    /// 锁定用户后删除 + 插入，任一步失败都回滚整个事务
    async fn replace(
        &self,
        table: AssociationTable,
        user_id: &UserId,
        rows: &[Association],
    ) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        if let Err(e) = Self::stage_replace(tx.as_mut(), table, user_id, rows).await {
            warn!(
                table = table.table_name(),
                user_id = %user_id,
                error = %e,
                "Replace failed, rolling back"
            );
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    table = table.table_name(),
                    error = %rollback_err,
                    "Rollback failed"
                );
            }
            return Err(e);
        }

        tx.commit().await
    }

    async fn stage_replace(
        tx: &mut dyn AssociationTransaction,
        table: AssociationTable,
        user_id: &UserId,
        rows: &[Association],
    ) -> AppResult<()> {
        tx.lock_user(table, user_id).await?;
        tx.delete_by_user(table, user_id).await?;
        tx.insert_ignore(table, rows).await?;
        Ok(())
    }

    async fn count(
        &self,
        table: AssociationTable,
        user_id: &UserId,
        ids: &[i64],
    ) -> AppResult<i64> {
        self.store.count_matching(table, user_id, ids).await
    }
}

#[async_trait]
impl UserAuthorizationRepository for DefaultUserAuthorizationRepository {
    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = permissions.len()))]
    async fn add_permissions(&self, user_id: &UserId, permissions: &Permissions) -> AppResult<()> {
        let rows = permission_rows(user_id, permissions);
        self.store
            .insert_ignore(UserPermission::TABLE, &rows)
            .await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = permissions.len()))]
    async fn replace_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<()> {
        let rows = permission_rows(user_id, permissions);
        self.replace(UserPermission::TABLE, user_id, &rows).await
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = permissions.len()))]
    async fn remove_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<()> {
        let rows = permission_rows(user_id, permissions);
        self.store.delete_pairs(UserPermission::TABLE, &rows).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id))]
    async fn clear_permissions(&self, user_id: &UserId) -> AppResult<()> {
        self.store
            .delete_by_user(UserPermission::TABLE, user_id)
            .await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = roles.len()))]
    async fn add_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()> {
        let rows = role_rows(user_id, roles);
        self.store.insert_ignore(UserRole::TABLE, &rows).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = roles.len()))]
    async fn replace_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()> {
        let rows = role_rows(user_id, roles);
        self.replace(UserRole::TABLE, user_id, &rows).await
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id, count = roles.len()))]
    async fn remove_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()> {
        let rows = role_rows(user_id, roles);
        self.store.delete_pairs(UserRole::TABLE, &rows).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %user_id))]
    async fn clear_roles(&self, user_id: &UserId) -> AppResult<()> {
        self.store.delete_by_user(UserRole::TABLE, user_id).await?;
        Ok(())
    }

    async fn has_role(&self, user_id: &UserId, role: &Role) -> AppResult<bool> {
        let count = self.count(UserRole::TABLE, user_id, &[role.id.0]).await?;
        Ok(count > 0)
    }

    async fn has_all_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<bool> {
        let ids: Vec<i64> = roles.ids().into_iter().map(|id| id.0).collect();
        let count = self.count(UserRole::TABLE, user_id, &ids).await?;
        Ok(count == ids.len() as i64)
    }

    async fn has_any_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<bool> {
        let ids: Vec<i64> = roles.ids().into_iter().map(|id| id.0).collect();
        let count = self.count(UserRole::TABLE, user_id, &ids).await?;
        Ok(count > 0)
    }

    async fn has_direct_permission(
        &self,
        user_id: &UserId,
        permission: &Permission,
    ) -> AppResult<bool> {
        let count = self
            .count(UserPermission::TABLE, user_id, &[permission.id.0])
            .await?;
        Ok(count > 0)
    }

    async fn has_all_direct_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<bool> {
        let ids: Vec<i64> = permissions.ids().into_iter().map(|id| id.0).collect();
        let count = self.count(UserPermission::TABLE, user_id, &ids).await?;
        Ok(count == ids.len() as i64)
    }

    async fn has_any_direct_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<bool> {
        let ids: Vec<i64> = permissions.ids().into_iter().map(|id| id.0).collect();
        let count = self.count(UserPermission::TABLE, user_id, &ids).await?;
        Ok(count > 0)
    }

    async fn role_ids(&self, user_id: &UserId) -> AppResult<Vec<RoleId>> {
        let ids = self.store.list_targets(UserRole::TABLE, user_id).await?;
        Ok(ids.into_iter().map(RoleId).collect())
    }

    async fn direct_permission_ids(&self, user_id: &UserId) -> AppResult<Vec<PermissionId>> {
        let ids = self
            .store
            .list_targets(UserPermission::TABLE, user_id)
            .await?;
        Ok(ids.into_iter().map(PermissionId).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_errors::AppError;
    use std::sync::Mutex;

    /// 记录调用序列的 Mock 存储，可在指定语句上失败
    #[derive(Default)]
    struct RecordingStore {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        count_result: i64,
    }

    impl RecordingStore {
        fn failing_on(op: &'static str) -> Self {
            Self {
                fail_on: Some(op),
                ..Default::default()
            }
        }

        fn with_count(count: i64) -> Self {
            Self {
                count_result: count,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn record(
        calls: &Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        op: &'static str,
        detail: String,
    ) -> AppResult<()> {
        calls.lock().unwrap().push(format!("{} {}", op, detail));
        if fail_on == Some(op) {
            return Err(AppError::transaction(format!("{} failed", op)));
        }
        Ok(())
    }

    #[async_trait]
    impl AssociationStore for RecordingStore {
        async fn insert_ignore(
            &self,
            table: AssociationTable,
            rows: &[Association],
        ) -> AppResult<u64> {
            let detail = format!("{} {}", table.table_name(), rows.len());
            record(&self.calls, self.fail_on, "insert", detail)?;
            Ok(rows.len() as u64)
        }

        async fn delete_pairs(
            &self,
            table: AssociationTable,
            rows: &[Association],
        ) -> AppResult<u64> {
            let detail = format!("{} {}", table.table_name(), rows.len());
            record(&self.calls, self.fail_on, "delete_pairs", detail)?;
            Ok(0)
        }

        async fn delete_by_user(
            &self,
            table: AssociationTable,
            _user_id: &UserId,
        ) -> AppResult<u64> {
            let detail = table.table_name().to_string();
            record(&self.calls, self.fail_on, "delete_by_user", detail)?;
            Ok(0)
        }

        async fn count_matching(
            &self,
            table: AssociationTable,
            _user_id: &UserId,
            target_ids: &[i64],
        ) -> AppResult<i64> {
            let detail = format!("{} {:?}", table.table_name(), target_ids);
            record(&self.calls, self.fail_on, "count", detail)?;
            Ok(self.count_result)
        }

        async fn list_targets(
            &self,
            table: AssociationTable,
            _user_id: &UserId,
        ) -> AppResult<Vec<i64>> {
            record(&self.calls, self.fail_on, "list", table.table_name().to_string())?;
            Ok(vec![2, 4])
        }

        async fn begin(&self) -> AppResult<Box<dyn AssociationTransaction>> {
            record(&self.calls, self.fail_on, "begin", String::new())?;
            Ok(Box::new(RecordingTx {
                calls: self.calls.clone(),
                fail_on: self.fail_on,
            }))
        }
    }

    struct RecordingTx {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl AssociationTransaction for RecordingTx {
        async fn lock_user(&mut self, table: AssociationTable, _user_id: &UserId) -> AppResult<()> {
            let detail = table.table_name().to_string();
            record(&self.calls, self.fail_on, "tx_lock_user", detail)
        }

        async fn insert_ignore(
            &mut self,
            table: AssociationTable,
            rows: &[Association],
        ) -> AppResult<u64> {
            let detail = format!("{} {}", table.table_name(), rows.len());
            record(&self.calls, self.fail_on, "tx_insert", detail)?;
            Ok(rows.len() as u64)
        }

        async fn delete_by_user(
            &mut self,
            table: AssociationTable,
            _user_id: &UserId,
        ) -> AppResult<u64> {
            let detail = table.table_name().to_string();
            record(&self.calls, self.fail_on, "tx_delete_by_user", detail)?;
            Ok(0)
        }

        async fn commit(self: Box<Self>) -> AppResult<()> {
            record(&self.calls, self.fail_on, "commit", String::new())
        }

        async fn rollback(self: Box<Self>) -> AppResult<()> {
            record(&self.calls, None, "rollback", String::new())
        }
    }

    fn roles(ids: &[i64]) -> Roles {
        ids.iter()
            .map(|id| Role::new(RoleId(*id), format!("role-{}", id)))
            .collect()
    }

    fn permissions(ids: &[i64]) -> Permissions {
        ids.iter()
            .map(|id| Permission::new(PermissionId(*id), format!("perm-{}", id)))
            .collect()
    }

    #[tokio::test]
    async fn test_replace_runs_delete_then_insert_then_commit() {
        let store = Arc::new(RecordingStore::default());
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        repo.replace_roles(&UserId::new(), &roles(&[1, 2]))
            .await
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![
                "begin ",
                "tx_lock_user user_roles",
                "tx_delete_by_user user_roles",
                "tx_insert user_roles 2",
                "commit ",
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_rolls_back_when_insert_fails() {
        let store = Arc::new(RecordingStore::failing_on("tx_insert"));
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        let err = repo
            .replace_permissions(&UserId::new(), &permissions(&[7]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transaction(_)));
        assert_eq!(
            store.calls(),
            vec![
                "begin ",
                "tx_lock_user user_permissions",
                "tx_delete_by_user user_permissions",
                "tx_insert user_permissions 1",
                "rollback ",
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_skips_insert_when_delete_fails() {
        let store = Arc::new(RecordingStore::failing_on("tx_delete_by_user"));
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        assert!(repo.replace_roles(&UserId::new(), &roles(&[1])).await.is_err());
        assert_eq!(
            store.calls(),
            vec![
                "begin ",
                "tx_lock_user user_roles",
                "tx_delete_by_user user_roles",
                "rollback ",
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_aborts_when_lock_fails() {
        let store = Arc::new(RecordingStore::failing_on("tx_lock_user"));
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        assert!(repo.replace_roles(&UserId::new(), &roles(&[1])).await.is_err());
        assert_eq!(
            store.calls(),
            vec!["begin ", "tx_lock_user user_roles", "rollback "]
        );
    }

    #[tokio::test]
    async fn test_begin_failure_is_surfaced() {
        let store = Arc::new(RecordingStore::failing_on("begin"));
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        let err = repo.replace_roles(&UserId::new(), &roles(&[1])).await;
        assert!(err.is_err());
        assert_eq!(store.calls(), vec!["begin "]);
    }

    #[tokio::test]
    async fn test_has_all_compares_against_distinct_ids() {
        let store = Arc::new(RecordingStore::with_count(2));
        let repo = DefaultUserAuthorizationRepository::new(store.clone());

        // [1, 1, 2] 只有两个不同的角色
        assert!(repo
            .has_all_roles(&UserId::new(), &roles(&[1, 1, 2]))
            .await
            .unwrap());
        assert_eq!(store.calls(), vec!["count user_roles [1, 2]"]);
    }

    #[tokio::test]
    async fn test_has_all_with_empty_set_is_true() {
        let store = Arc::new(RecordingStore::with_count(0));
        let repo = DefaultUserAuthorizationRepository::new(store);

        assert!(repo
            .has_all_direct_permissions(&UserId::new(), &Permissions::new())
            .await
            .unwrap());
        assert!(!repo
            .has_any_direct_permissions(&UserId::new(), &Permissions::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_query_error_is_not_swallowed() {
        let store = Arc::new(RecordingStore::failing_on("count"));
        let repo = DefaultUserAuthorizationRepository::new(store);

        let role = Role::new(RoleId(1), "admin");
        assert!(repo.has_role(&UserId::new(), &role).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_and_clear_target_the_right_table() {
        let store = Arc::new(RecordingStore::default());
        let repo = DefaultUserAuthorizationRepository::new(store.clone());
        let user_id = UserId::new();

        repo.remove_permissions(&user_id, &permissions(&[1, 2, 3]))
            .await
            .unwrap();
        repo.clear_roles(&user_id).await.unwrap();

        assert_eq!(
            store.calls(),
            vec!["delete_pairs user_permissions 3", "delete_by_user user_roles"]
        );
    }

    #[tokio::test]
    async fn test_listing_maps_ids() {
        let store = Arc::new(RecordingStore::default());
        let repo = DefaultUserAuthorizationRepository::new(store);

        let ids = repo.role_ids(&UserId::new()).await.unwrap();
        assert_eq!(ids, vec![RoleId(2), RoleId(4)]);
    }
}
