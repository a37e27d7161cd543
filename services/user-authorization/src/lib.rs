//! User Authorization - 用户角色与直接权限的关联管理
//!
//! 负责用户-角色、用户-权限两张关联表的增删改查与集合判断

pub mod bootstrap;
pub mod domain;
pub mod infrastructure;

pub use domain::{
    Permission, Permissions, Role, Roles, UserAuthorizationRepository, UserPermission, UserRole,
};
pub use infrastructure::persistence::DefaultUserAuthorizationRepository;
