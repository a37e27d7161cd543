//! 语句级监控

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// 慢查询阈值（毫秒）
const SLOW_QUERY_MS: u128 = 100;

/// 数据库监控工具
pub struct DbMetrics;

impl DbMetrics {
    /// 记录连接池状态
    pub fn record_pool_state(pool: &PgPool, pool_name: &str) {
        gauge!("db_pool_size", "pool" => pool_name.to_string()).set(pool.size() as f64);
        gauge!("db_pool_idle", "pool" => pool_name.to_string()).set(pool.num_idle() as f64);
    }

    /// 记录查询（计时）
    pub fn record_query(start: Instant, table: &'static str, operation: &'static str) {
        histogram!(
            "db_query_duration_ms",
            "table" => table,
            "operation" => operation
        )
        .record(start.elapsed().as_millis() as f64);

        counter!(
            "db_queries_total",
            "table" => table,
            "operation" => operation
        )
        .increment(1);
    }

    /// 记录查询错误
    pub fn record_error(table: &'static str, operation: &'static str) {
        counter!(
            "db_query_errors_total",
            "table" => table,
            "operation" => operation
        )
        .increment(1);
    }
}

/// 用于计时的守卫结构
pub struct QueryTimer {
    start: Instant,
    table: &'static str,
    operation: &'static str,
}

impl QueryTimer {
    pub fn new(table: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            table,
            operation,
        }
    }

    /// 按结果记录并原样返回
    pub fn observe<T>(self, result: Result<T, sqlx::Error>) -> Result<T, sqlx::Error> {
        match &result {
            Ok(_) => self.finish(),
            Err(_) => self.finish_with_error(),
        }
        result
    }

    pub fn finish(self) {
        let duration_ms = self.start.elapsed().as_millis();
        DbMetrics::record_query(self.start, self.table, self.operation);

        if duration_ms > SLOW_QUERY_MS {
            tracing::warn!(
                table = %self.table,
                operation = %self.operation,
                duration_ms = %duration_ms,
                "Slow query detected"
            );
            counter!(
                "db_slow_queries_total",
                "table" => self.table,
                "operation" => self.operation
            )
            .increment(1);
        }
    }

    pub fn finish_with_error(self) {
        let duration_ms = self.start.elapsed().as_millis();
        DbMetrics::record_query(self.start, self.table, self.operation);
        DbMetrics::record_error(self.table, self.operation);

        if duration_ms > SLOW_QUERY_MS {
            tracing::warn!(
                table = %self.table,
                operation = %self.operation,
                duration_ms = %duration_ms,
                "Slow query detected (with error)"
            );
        }
    }
}
