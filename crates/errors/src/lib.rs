//! rbac-errors - 统一错误处理
//!
//! 存储层只有一类失败：连接、约束、事务中止都原样上抛给调用方，不做重试。

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Transaction aborted: {0}")]
    Transaction(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 错误类别，用于日志和指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Constraint(_) => "constraint",
            Self::Transaction(_) => "transaction",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }

    /// 是否属于存储层失败（除内部状态错误外均是）
    pub fn is_storage_failure(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_message() {
        let err = AppError::constraint("duplicate key value violates unique constraint");
        assert_eq!(
            err.to_string(),
            "Constraint violation: duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(AppError::connection("x").kind(), "connection");
        assert_eq!(AppError::transaction("x").kind(), "transaction");
        assert_eq!(AppError::database("x").kind(), "database");
    }

    #[test]
    fn test_storage_failure_classification() {
        assert!(AppError::connection("pool closed").is_storage_failure());
        assert!(AppError::constraint("fk").is_storage_failure());
        assert!(!AppError::internal("transaction consumed").is_storage_failure());
    }
}
