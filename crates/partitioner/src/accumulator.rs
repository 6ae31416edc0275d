// accumulator.rs
// 表格累加器，负责把各任务的带标记数据块按行拼接成最终的特征表，稠密与稀疏两种存储共用一个接口。
use crate::config::StorageKind;
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, FeatureMatrix};
use crate::types::{LabeledTable, TaggedBlock};
use ndarray::{Array1, Array2};

/// 按行追加数据块并最终生成 LabeledTable
pub trait TableAccumulator {
    /// 追加一块样本，列数必须与累加器一致
    fn append_rows(&mut self, block: TaggedBlock) -> Result<()>;
    /// 当前已累计的行数
    fn n_rows(&self) -> usize;
    /// 输出特征表和标签
    fn finalize(self: Box<Self>) -> Result<LabeledTable>;

    /// 追加一张已完成的表（warm/cold 拼接时使用）
    fn append_table(&mut self, table: LabeledTable) -> Result<()> {
        self.append_rows(TaggedBlock {
            task_id: 0,
            features: table.features,
            labels: table.labels,
        })
    }
}

/// 按存储方式创建累加器
pub fn new_accumulator(storage: StorageKind, n_cols: usize) -> Box<dyn TableAccumulator> {
    match storage {
        StorageKind::Dense => Box::new(DenseAccumulator::new(n_cols)),
        StorageKind::Sparse => Box::new(SparseAccumulator::new(n_cols)),
    }
}

fn check_block(expected_cols: usize, block: &TaggedBlock) -> Result<()> {
    if block.features.n_cols() != expected_cols {
        return Err(Error::ShapeMismatch {
            task: block.task_id,
            expected: expected_cols,
            found: block.features.n_cols(),
        });
    }
    if block.labels.len() != block.n_rows() {
        return Err(Error::ShapeMismatch {
            task: block.task_id,
            expected: block.n_rows(),
            found: block.labels.len(),
        });
    }
    Ok(())
}

/// 稠密累加器，按行优先顺序缓存所有元素
pub struct DenseAccumulator {
    n_cols: usize,
    n_rows: usize,
    values: Vec<f64>,
    labels: Vec<f64>,
}

impl DenseAccumulator {
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            n_rows: 0,
            values: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl TableAccumulator for DenseAccumulator {
    fn append_rows(&mut self, block: TaggedBlock) -> Result<()> {
        if block.n_rows() == 0 && block.labels.is_empty() {
            return Ok(());
        }
        check_block(self.n_cols, &block)?;
        match &block.features {
            FeatureMatrix::Dense(a) => self.values.extend(a.iter().copied()),
            FeatureMatrix::Sparse(m) => self.values.extend(m.to_dense().iter().copied()),
        }
        self.n_rows += block.n_rows();
        self.labels.extend(block.labels.iter().copied());
        Ok(())
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn finalize(self: Box<Self>) -> Result<LabeledTable> {
        let features = Array2::from_shape_vec((self.n_rows, self.n_cols), self.values)
            .map_err(|e| Error::Other(format!("构建稠密特征表失败: {}", e)))?;
        Ok(LabeledTable {
            features: FeatureMatrix::Dense(features),
            labels: Array1::from(self.labels),
        })
    }
}

/// 稀疏累加器，直接在 CSR 上做纵向拼接
pub struct SparseAccumulator {
    matrix: CsrMatrix,
    labels: Vec<f64>,
}

impl SparseAccumulator {
    pub fn new(n_cols: usize) -> Self {
        Self {
            matrix: CsrMatrix::zeros(0, n_cols),
            labels: Vec::new(),
        }
    }
}

impl TableAccumulator for SparseAccumulator {
    fn append_rows(&mut self, block: TaggedBlock) -> Result<()> {
        if block.n_rows() == 0 && block.labels.is_empty() {
            return Ok(());
        }
        check_block(self.matrix.n_cols(), &block)?;
        match &block.features {
            FeatureMatrix::Sparse(m) => self.matrix.append_rows(m)?,
            FeatureMatrix::Dense(a) => self.matrix.append_rows(&CsrMatrix::from_dense(a))?,
        }
        self.labels.extend(block.labels.iter().copied());
        Ok(())
    }

    fn n_rows(&self) -> usize {
        self.matrix.n_rows()
    }

    fn finalize(self: Box<Self>) -> Result<LabeledTable> {
        Ok(LabeledTable {
            features: FeatureMatrix::Sparse(self.matrix),
            labels: Array1::from(self.labels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn block(task_id: usize, rows: Array2<f64>, labels: Array1<f64>) -> TaggedBlock {
        TaggedBlock {
            task_id,
            features: FeatureMatrix::Dense(rows),
            labels,
        }
    }

    #[test]
    fn test_dense_accumulator_concatenates() {
        let mut acc = new_accumulator(StorageKind::Dense, 2);
        acc.append_rows(block(0, array![[0.0, 1.0]], array![1.0])).unwrap();
        acc.append_rows(block(1, array![[1.0, 2.0], [1.0, 3.0]], array![0.0, 1.0]))
            .unwrap();
        assert_eq!(acc.n_rows(), 3);
        let table = acc.finalize().unwrap();
        assert_eq!(
            table.features,
            FeatureMatrix::Dense(array![[0.0, 1.0], [1.0, 2.0], [1.0, 3.0]])
        );
        assert_eq!(table.labels, array![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_block_is_ignored() {
        for storage in [StorageKind::Dense, StorageKind::Sparse] {
            let mut acc = new_accumulator(storage, 3);
            acc.append_rows(block(0, Array2::zeros((0, 1)), Array1::zeros(0)))
                .unwrap();
            acc.append_rows(block(1, array![[1.0, 2.0, 3.0]], array![1.0]))
                .unwrap();
            let table = acc.finalize().unwrap();
            assert_eq!(table.features.to_dense(), array![[1.0, 2.0, 3.0]]);
        }
    }

    #[test]
    fn test_sparse_accumulator_accepts_both_kinds() {
        let mut acc = new_accumulator(StorageKind::Sparse, 2);
        acc.append_rows(block(0, array![[0.0, 1.0]], array![1.0])).unwrap();
        acc.append_rows(TaggedBlock {
            task_id: 1,
            features: FeatureMatrix::Sparse(CsrMatrix::from_dense(&array![[1.0, 0.0]])),
            labels: array![0.0],
        })
        .unwrap();
        let table = acc.finalize().unwrap();
        assert!(table.features.is_sparse());
        assert_eq!(table.features.to_dense(), array![[0.0, 1.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_accumulator_rejects_wrong_width() {
        let mut acc = new_accumulator(StorageKind::Dense, 3);
        let err = acc
            .append_rows(block(4, array![[0.0, 1.0]], array![1.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { task: 4, expected: 3, found: 2 }
        ));
    }

    #[test]
    fn test_empty_accumulator_finalizes_to_empty_table() {
        for storage in [StorageKind::Dense, StorageKind::Sparse] {
            let table = new_accumulator(storage, 5).finalize().unwrap();
            assert!(table.is_empty());
            assert_eq!(table.n_cols(), 5);
        }
    }
}
