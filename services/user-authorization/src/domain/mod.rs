//! 领域层

pub mod permission;
pub mod pivot;
pub mod repository;
pub mod role;

pub use permission::{Permission, Permissions};
pub use pivot::{UserPermission, UserRole};
pub use repository::UserAuthorizationRepository;
pub use role::{Role, Roles};
