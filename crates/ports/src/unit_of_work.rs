//! 事务 trait 定义

use async_trait::async_trait;
use rbac_common::UserId;
use rbac_errors::AppResult;

use crate::{Association, AssociationTable};

/// 关联表事务
///
/// 在提交前所做的修改对其他连接不可见；未提交即丢弃等同于回滚。
#[async_trait]
pub trait AssociationTransaction: Send {
    /// 锁定某用户在该表中的关联集合，直到事务结束
    ///
    /// 同一用户的并发替换在此排队，后者的删除能看到前者提交的行。
    async fn lock_user(&mut self, table: AssociationTable, user_id: &UserId) -> AppResult<()>;

    /// 在事务中插入关联（冲突忽略）
    async fn insert_ignore(
        &mut self,
        table: AssociationTable,
        rows: &[Association],
    ) -> AppResult<u64>;

    /// 在事务中删除某用户在该表中的全部行
    async fn delete_by_user(&mut self, table: AssociationTable, user_id: &UserId)
    -> AppResult<u64>;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
