//! 关联表存储 trait 定义

use async_trait::async_trait;
use rbac_common::UserId;
use rbac_errors::AppResult;
use serde::{Deserialize, Serialize};

use crate::AssociationTransaction;

/// 关联表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationTable {
    /// user_roles (user_id, role_id)
    UserRoles,
    /// user_permissions (user_id, permission_id)
    UserPermissions,
}

impl AssociationTable {
    /// 表名
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::UserRoles => "user_roles",
            Self::UserPermissions => "user_permissions",
        }
    }

    /// 目标实体的外键列
    pub fn target_column(&self) -> &'static str {
        match self {
            Self::UserRoles => "role_id",
            Self::UserPermissions => "permission_id",
        }
    }
}

/// 一条关联记录：(user_id, target_id)，两列共同构成主键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Association {
    pub user_id: UserId,
    pub target_id: i64,
}

impl Association {
    pub fn new(user_id: UserId, target_id: i64) -> Self {
        Self { user_id, target_id }
    }
}

/// 关联表存储
///
/// 只暴露关联仓储需要的几种语句：冲突忽略插入、按条件删除、按条件计数，
/// 以及开启事务。实现方不做任何外键存在性校验。
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// 插入关联，主键冲突的行被静默跳过，返回实际插入的行数
    async fn insert_ignore(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64>;

    /// 删除与给定 (user_id, target_id) 完全匹配的行，不存在的行不报错
    async fn delete_pairs(&self, table: AssociationTable, rows: &[Association]) -> AppResult<u64>;

    /// 删除某用户在该表中的全部行
    async fn delete_by_user(&self, table: AssociationTable, user_id: &UserId) -> AppResult<u64>;

    /// 统计用户在 target_ids 范围内的行数
    async fn count_matching(
        &self,
        table: AssociationTable,
        user_id: &UserId,
        target_ids: &[i64],
    ) -> AppResult<i64>;

    /// 列出用户关联的全部 target_id（升序）
    async fn list_targets(&self, table: AssociationTable, user_id: &UserId) -> AppResult<Vec<i64>>;

    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn AssociationTransaction>>;
}
