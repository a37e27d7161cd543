//! 数据库错误映射工具
//!
//! 按 SQLSTATE 类别把 sqlx 错误归入存储失败的三种形态，保留原始错误文本。

use rbac_errors::AppError;

/// 将 SQLx 错误转换为 AppError
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                // 23xxx: 完整性约束违规
                Some(code) if code.starts_with("23") => {
                    AppError::constraint(format!("{} ({})", db_err, code))
                }
                // 40xxx: 事务回滚（序列化失败、死锁）
                Some(code) if code.starts_with("40") => {
                    AppError::transaction(format!("{} ({})", db_err, code))
                }
                // 08xxx: 连接异常
                Some(code) if code.starts_with("08") => {
                    AppError::connection(format!("{} ({})", db_err, code))
                }
                Some(code) => AppError::database(format!("{} ({})", db_err, code)),
                None => AppError::database(db_err.to_string()),
            }
        }
        sqlx::Error::PoolTimedOut => AppError::connection("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::connection("Database connection pool is closed"),
        sqlx::Error::Io(io) => AppError::connection(format!("Database I/O error: {}", io)),
        sqlx::Error::Tls(tls) => AppError::connection(format!("Database TLS error: {}", tls)),
        sqlx::Error::Protocol(msg) => {
            AppError::database(format!("Database protocol error: {}", msg))
        }
        _ => AppError::database(e.to_string()),
    }
}
