// error.rs
// 定义分区器的错误类型（配置、形状、空输入、IO、序列化等）和Result类型。
use std::io;
use thiserror::Error;

/// 分区器通用错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误：请求的样本数超过可用样本数，或参数越界
    #[error("配置错误: {0}")]
    Configuration(String),
    /// 某个任务的特征宽度（或标签长度）与既定维度不一致
    #[error("形状不匹配: 任务 {task} 期望 {expected}，实际 {found}")]
    ShapeMismatch {
        task: usize,
        expected: usize,
        found: usize,
    },
    /// 任务集合为空，或需要抽样的任务没有样本
    #[error("输入为空: {0}")]
    EmptyInput(String),
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    /// JSON 解析/写入错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),
    /// 读取 .npy 文件失败
    #[error("读取npy失败: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),
    /// 写入 .npy 文件失败
    #[error("写入npy失败: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),
    /// 其他类型错误
    #[error("其他错误: {0}")]
    Other(String),
}

/// 通用结果类型
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 便捷构造配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}
