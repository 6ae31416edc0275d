// task.rs
// 多任务数据集的输入结构：每个任务包含一个特征矩阵和按行对齐的标签向量。
use crate::error::{Error, Result};
use crate::matrix::FeatureMatrix;
use ndarray::Array1;

/// 单个二分类任务的原始数据
#[derive(Debug, Clone)]
pub struct TaskData {
    /// 特征矩阵，行 = 样本，列 = 原始特征
    pub features: FeatureMatrix,
    /// 标签，每个样本一个，与特征矩阵的行一一对应
    pub labels: Array1<f64>,
}

impl TaskData {
    pub fn new(features: FeatureMatrix, labels: Array1<f64>) -> Self {
        Self { features, labels }
    }

    /// 样本数
    pub fn n_samples(&self) -> usize {
        self.features.n_rows()
    }
}

/// 有序的任务集合，下标即任务ID
#[derive(Debug, Clone, Default)]
pub struct TaskCollection {
    pub tasks: Vec<TaskData>,
}

impl TaskCollection {
    pub fn new(tasks: Vec<TaskData>) -> Self {
        Self { tasks }
    }

    /// 任务数 k
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskData> {
        self.tasks.iter()
    }

    /// 原始特征维度，取自第一个任务
    pub fn raw_dim(&self) -> Result<usize> {
        self.tasks
            .first()
            .map(|t| t.features.n_cols())
            .ok_or_else(|| Error::EmptyInput("任务集合中没有任何任务".to_string()))
    }

    /// 校验所有任务的特征宽度一致、标签长度与行数一致，返回原始特征维度
    ///
    /// 维度取自第一个有样本的任务；没有样本的任务不参与宽度比较（JSON 中的 `[]` 无法表达列数）。
    pub fn validate_shapes(&self) -> Result<usize> {
        let dim = match self.tasks.iter().find(|t| t.n_samples() > 0) {
            Some(task) => task.features.n_cols(),
            None => self.raw_dim()?,
        };
        for (n, task) in self.tasks.iter().enumerate() {
            let width = task.features.n_cols();
            if task.n_samples() > 0 && width != dim {
                return Err(Error::ShapeMismatch {
                    task: n,
                    expected: dim,
                    found: width,
                });
            }
            if task.labels.len() != task.n_samples() {
                return Err(Error::ShapeMismatch {
                    task: n,
                    expected: task.n_samples(),
                    found: task.labels.len(),
                });
            }
        }
        Ok(dim)
    }
}

impl From<Vec<TaskData>> for TaskCollection {
    fn from(tasks: Vec<TaskData>) -> Self {
        Self::new(tasks)
    }
}
