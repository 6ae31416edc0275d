// types.rs
// 通用类型：带任务ID标记的数据块、带标签的输出表、分区结果。
use crate::error::{Error, Result};
use crate::matrix::FeatureMatrix;
use ndarray::Array1;

/// 已前置任务ID列的一块样本
#[derive(Debug, Clone)]
pub struct TaggedBlock {
    pub task_id: usize,
    pub features: FeatureMatrix,
    pub labels: Array1<f64>,
}

impl TaggedBlock {
    pub fn n_rows(&self) -> usize {
        self.features.n_rows()
    }
}

/// 一个划分（训练/测试/warm/cold）的特征表及按行对齐的标签
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub features: FeatureMatrix,
    pub labels: Array1<f64>,
}

impl LabeledTable {
    /// 空表（0 行，n_cols 列）
    pub fn empty(n_cols: usize, sparse: bool) -> Self {
        Self {
            features: FeatureMatrix::empty(n_cols, sparse),
            labels: Array1::zeros(0),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.features.n_rows()
    }

    pub fn n_cols(&self) -> usize {
        self.features.n_cols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// 第 r 行的任务ID（首列）
    pub fn task_id_of(&self, r: usize) -> usize {
        self.features.get(r, 0) as usize
    }

    /// 对特征和标签施加同一个行置换，保持对应关系
    pub fn permute_rows(&self, permutation: &[usize]) -> Result<Self> {
        if permutation.len() != self.n_rows() {
            return Err(Error::Other(format!(
                "置换长度 {} 与表行数 {} 不一致",
                permutation.len(),
                self.n_rows()
            )));
        }
        Ok(Self {
            features: self.features.select_rows(permutation),
            labels: permutation.iter().map(|&i| self.labels[i]).collect(),
        })
    }
}

/// 分区结果：(train_X, train_Y, test_X, test_Y, k, feature_dim)
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionOutput {
    pub train: LabeledTable,
    pub test: LabeledTable,
    /// 任务数 k
    pub num_tasks: usize,
    /// 输出特征维度 = 原始维度 + 1
    pub feature_dim: usize,
    /// 启用冷启动时，训练表前 warm_rows 行属于 warm 分区，其余属于 cold
    pub warm_rows: Option<usize>,
}

impl PartitionOutput {
    /// 拆成六元组
    pub fn into_parts(self) -> (FeatureMatrix, Array1<f64>, FeatureMatrix, Array1<f64>, usize, usize) {
        (
            self.train.features,
            self.train.labels,
            self.test.features,
            self.test.labels,
            self.num_tasks,
            self.feature_dim,
        )
    }

    /// cold 分区行数
    pub fn cold_rows(&self) -> Option<usize> {
        self.warm_rows.map(|w| self.train.n_rows() - w)
    }
}
