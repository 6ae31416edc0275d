// lib.rs
// 多任务数据集分区器入口，声明并导出各子模块。
pub mod accumulator;
pub mod config;
pub mod data_preparator;
pub mod error;
pub mod export;
pub mod loader;
pub mod matrix;
pub mod task;
pub mod task_splitter;
pub mod types;

pub use config::{ColdStartSplit, CountSchedule, PartitionConfig, StorageKind, TestCount, Variant};
pub use error::{Error, Result};
pub use task::{TaskCollection, TaskData};
pub use task_splitter::{partition, TaskSplitter};
pub use types::{LabeledTable, PartitionOutput};

pub use ndarray;
