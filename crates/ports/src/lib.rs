//! ports - 抽象 trait 层
//!
//! 定义关联表存储的抽象接口

mod association_store;
mod unit_of_work;

pub use association_store::*;
pub use unit_of_work::*;
