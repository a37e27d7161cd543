//! 用户授权仓储接口

use async_trait::async_trait;
use rbac_common::{PermissionId, RoleId, UserId};
use rbac_errors::AppResult;

use super::{Permission, Permissions, Role, Roles};

/// 用户授权仓储接口
///
/// 维护用户与角色、用户与直接权限之间的扁平关联。不展开角色所带的权限，
/// 也不校验引用的用户、角色、权限是否存在。
#[async_trait]
pub trait UserAuthorizationRepository: Send + Sync {
    // ---------- 直接权限 ----------

    /// 为用户添加直接权限，已存在的关联被跳过
    async fn add_permissions(&self, user_id: &UserId, permissions: &Permissions) -> AppResult<()>;

    /// 在一个事务内替换用户的全部直接权限
    async fn replace_permissions(&self, user_id: &UserId, permissions: &Permissions)
    -> AppResult<()>;

    /// 移除用户的指定直接权限，不存在的关联不报错
    async fn remove_permissions(&self, user_id: &UserId, permissions: &Permissions)
    -> AppResult<()>;

    /// 清空用户的全部直接权限
    async fn clear_permissions(&self, user_id: &UserId) -> AppResult<()>;

    // ---------- 角色 ----------

    /// 为用户添加角色，已存在的关联被跳过
    async fn add_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()>;

    /// 在一个事务内替换用户的全部角色
    async fn replace_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()>;

    /// 移除用户的指定角色，不存在的关联不报错
    async fn remove_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<()>;

    /// 清空用户的全部角色
    async fn clear_roles(&self, user_id: &UserId) -> AppResult<()>;

    // ---------- 查询 ----------

    /// 用户是否拥有该角色
    async fn has_role(&self, user_id: &UserId, role: &Role) -> AppResult<bool>;

    /// 用户是否拥有全部给定角色；空集合恒为 true
    async fn has_all_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<bool>;

    /// 用户是否拥有任一给定角色；空集合恒为 false
    async fn has_any_roles(&self, user_id: &UserId, roles: &Roles) -> AppResult<bool>;

    /// 用户是否直接拥有该权限（不含角色带来的权限）
    async fn has_direct_permission(&self, user_id: &UserId, permission: &Permission)
    -> AppResult<bool>;

    /// 用户是否直接拥有全部给定权限
    async fn has_all_direct_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<bool>;

    /// 用户是否直接拥有任一给定权限
    async fn has_any_direct_permissions(
        &self,
        user_id: &UserId,
        permissions: &Permissions,
    ) -> AppResult<bool>;

    /// 用户当前的角色 ID（升序）
    async fn role_ids(&self, user_id: &UserId) -> AppResult<Vec<RoleId>>;

    /// 用户当前的直接权限 ID（升序）
    async fn direct_permission_ids(&self, user_id: &UserId) -> AppResult<Vec<PermissionId>>;
}
