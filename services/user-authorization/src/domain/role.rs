//! 角色实体与角色集合

use std::collections::HashSet;

use rbac_common::RoleId;
use serde::{Deserialize, Serialize};

/// 角色
///
/// 关联操作只用到 `id`，其余属性由角色管理模块维护。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 角色集合
///
/// 保持插入顺序，不去重；重复项在写入时由冲突忽略吸收。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roles(Vec<Role>);

impl Roles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role) {
        self.0.push(role);
    }

    /// 元素个数（含重复项）
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.0.iter()
    }

    /// 原始元素
    pub fn origin(&self) -> &[Role] {
        &self.0
    }

    /// 去重后的 ID，按首次出现的顺序
    pub fn ids(&self) -> Vec<RoleId> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0
            .iter()
            .map(|role| role.id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl From<Vec<Role>> for Roles {
    fn from(roles: Vec<Role>) -> Self {
        Self(roles)
    }
}

impl FromIterator<Role> for Roles {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Roles {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Roles {
    type Item = Role;
    type IntoIter = std::vec::IntoIter<Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_in_first_seen_order() {
        let roles: Roles = [3, 1, 3, 2, 1]
            .into_iter()
            .map(|id| Role::new(RoleId(id), format!("role-{}", id)))
            .collect();

        assert_eq!(roles.len(), 5);
        assert_eq!(roles.ids(), vec![RoleId(3), RoleId(1), RoleId(2)]);
    }

    #[test]
    fn test_empty_collection() {
        let roles = Roles::new();
        assert!(roles.is_empty());
        assert!(roles.ids().is_empty());
    }

    #[test]
    fn test_origin_keeps_duplicates_and_order() {
        let mut roles = Roles::new();
        roles.push(Role::new(RoleId(2), "editor"));
        roles.push(Role::new(RoleId(1), "admin"));
        roles.push(Role::new(RoleId(2), "editor"));

        let ids: Vec<RoleId> = roles.origin().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RoleId(2), RoleId(1), RoleId(2)]);
    }

    #[test]
    fn test_serializes_as_array() {
        let roles = Roles::from(vec![
            Role::new(RoleId(1), "admin").with_description("Full access"),
            Role::new(RoleId(2), "viewer"),
        ]);
        let json = serde_json::to_value(&roles).unwrap();
        assert_eq!(json[0]["id"], 1);
        assert_eq!(json[0]["name"], "admin");
        assert_eq!(json[0]["description"], "Full access");
        assert!(json[1]["description"].is_null());
    }
}
