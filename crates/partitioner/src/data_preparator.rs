// data_preparator.rs
// 数据准备器，负责从任务中选出样本行并在最左侧前置任务ID列，生成带标记的数据块。
use crate::error::{Error, Result};
use crate::task::TaskData;
use crate::types::TaggedBlock;

/// 选出 task 的指定行，前置值为 task_id 的常数列，并取出对应标签
pub fn tag_rows(task_id: usize, task: &TaskData, rows: &[usize]) -> Result<TaggedBlock> {
    let n_samples = task.n_samples();
    if let Some(&bad) = rows.iter().find(|&&r| r >= n_samples) {
        return Err(Error::Other(format!(
            "任务 {} 的样本下标 {} 超出范围 [0, {})",
            task_id, bad, n_samples
        )));
    }
    let features = task
        .features
        .select_rows(rows)
        .prepend_constant_column(task_id as f64);
    let labels = rows.iter().map(|&r| task.labels[r]).collect();
    Ok(TaggedBlock {
        task_id,
        features,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{CsrMatrix, FeatureMatrix};
    use ndarray::array;

    fn task() -> TaskData {
        TaskData::new(
            FeatureMatrix::Dense(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]),
            array![0.0, 1.0, 0.0],
        )
    }

    #[test]
    fn test_tag_rows_dense() {
        let block = tag_rows(3, &task(), &[2, 1]).unwrap();
        assert_eq!(block.n_rows(), 2);
        assert_eq!(block.features.to_dense(), array![[3.0, 5.0, 6.0], [3.0, 3.0, 4.0]]);
        assert_eq!(block.labels, array![0.0, 1.0]);
    }

    #[test]
    fn test_tag_rows_sparse_matches_dense() {
        let dense = task();
        let sparse = TaskData::new(
            FeatureMatrix::Sparse(CsrMatrix::from_dense(&dense.features.to_dense())),
            dense.labels.clone(),
        );
        let a = tag_rows(0, &dense, &[0, 2]).unwrap();
        let b = tag_rows(0, &sparse, &[0, 2]).unwrap();
        assert!(b.features.is_sparse());
        assert_eq!(a.features.to_dense(), b.features.to_dense());
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_tag_rows_out_of_range() {
        assert!(tag_rows(0, &task(), &[3]).is_err());
    }

    #[test]
    fn test_tag_rows_empty_selection() {
        let block = tag_rows(1, &task(), &[]).unwrap();
        assert_eq!(block.n_rows(), 0);
        assert_eq!(block.features.n_cols(), 3);
    }
}
