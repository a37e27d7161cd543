//! 用户-角色、用户-权限关联行

use rbac_common::{PermissionId, RoleId, UserId};
use rbac_ports::{Association, AssociationTable};
use serde::{Deserialize, Serialize};

use super::{Permissions, Roles};

/// user_roles 表的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
}

impl UserRole {
    pub const TABLE: AssociationTable = AssociationTable::UserRoles;

    pub fn new(user_id: UserId, role_id: RoleId) -> Self {
        Self { user_id, role_id }
    }

    /// 为集合中的每个角色生成一行（重复项原样保留）
    pub fn for_roles(user_id: UserId, roles: &Roles) -> Vec<Self> {
        roles.iter().map(|role| Self::new(user_id, role.id)).collect()
    }

    pub fn table_name() -> &'static str {
        Self::TABLE.table_name()
    }
}

impl From<UserRole> for Association {
    fn from(row: UserRole) -> Self {
        Association::new(row.user_id, row.role_id.0)
    }
}

/// user_permissions 表的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

impl UserPermission {
    pub const TABLE: AssociationTable = AssociationTable::UserPermissions;

    pub fn new(user_id: UserId, permission_id: PermissionId) -> Self {
        Self {
            user_id,
            permission_id,
        }
    }

    pub fn for_permissions(user_id: UserId, permissions: &Permissions) -> Vec<Self> {
        permissions
            .iter()
            .map(|permission| Self::new(user_id, permission.id))
            .collect()
    }

    pub fn table_name() -> &'static str {
        Self::TABLE.table_name()
    }
}

impl From<UserPermission> for Association {
    fn from(row: UserPermission) -> Self {
        Association::new(row.user_id, row.permission_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Permission, Role};

    #[test]
    fn test_json_field_names() {
        let user_id = UserId::new();
        let json = serde_json::to_value(UserRole::new(user_id, RoleId(3))).unwrap();
        assert_eq!(json["user_id"], user_id.to_string());
        assert_eq!(json["role_id"], 3);

        let json = serde_json::to_value(UserPermission::new(user_id, PermissionId(9))).unwrap();
        assert_eq!(json["permission_id"], 9);
    }

    #[test]
    fn test_rows_keep_duplicates() {
        let user_id = UserId::new();
        let roles = Roles::from(vec![
            Role::new(RoleId(1), "admin"),
            Role::new(RoleId(1), "admin"),
        ]);
        assert_eq!(UserRole::for_roles(user_id, &roles).len(), 2);

        let permissions = Permissions::from(vec![Permission::new(PermissionId(5), "users.read")]);
        let rows: Vec<Association> = UserPermission::for_permissions(user_id, &permissions)
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(rows, vec![Association::new(user_id, 5)]);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(UserRole::table_name(), "user_roles");
        assert_eq!(UserPermission::table_name(), "user_permissions");
    }
}
