//! 权限实体与权限集合

use std::collections::HashSet;

use rbac_common::PermissionId;
use serde::{Deserialize, Serialize};

/// 权限
///
/// 关联操作只用到 `id`，其余属性由权限管理模块维护。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub description: Option<String>,
}

impl Permission {
    pub fn new(id: PermissionId, name: impl Into<String>) -> Self {
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

/// 权限集合
///
/// 保持插入顺序，不去重；重复项在写入时由冲突忽略吸收。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(Vec<Permission>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, permission: Permission) {
        self.0.push(permission);
    }

    /// 元素个数（含重复项）
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.0.iter()
    }

    /// 原始元素
    pub fn origin(&self) -> &[Permission] {
        &self.0
    }

    /// 去重后的 ID，按首次出现的顺序
    pub fn ids(&self) -> Vec<PermissionId> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0
            .iter()
            .map(|permission| permission.id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(permissions: Vec<Permission>) -> Self {
        Self(permissions)
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Permissions {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Permissions {
    type Item = Permission;
    type IntoIter = std::vec::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
