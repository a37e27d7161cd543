//! 持久化层模块

pub mod user_authorization_repository;

pub use user_authorization_repository::DefaultUserAuthorizationRepository;
