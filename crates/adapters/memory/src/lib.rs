//! rbac-adapter-memory - 内存关联表存储
//!
//! 与 PostgreSQL 适配器语义一致，用于测试和嵌入式场景。

mod store;

pub use store::*;
