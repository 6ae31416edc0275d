// matrix.rs
// 特征矩阵类型：稠密矩阵（ndarray）与压缩稀疏行矩阵（CSR），提供行选择、拼接、前置常数列等操作。
use crate::error::{Error, Result};
use ndarray::{s, Array2, Axis};

/// 压缩稀疏行（CSR）矩阵
///
/// 第 r 行的非零元素位于 `indices[indptr[r]..indptr[r + 1]]` 与
/// `data[indptr[r]..indptr[r + 1]]`，每行内列号严格递增。
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// 创建全零稀疏矩阵
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// 从原始 CSR 数组构建，并校验结构是否合法
    pub fn try_new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self> {
        if indptr.len() != n_rows + 1 {
            return Err(Error::Other(format!(
                "CSR indptr 长度 {} 与行数 {} 不符",
                indptr.len(),
                n_rows
            )));
        }
        if indptr[0] != 0 || indptr[n_rows] != indices.len() {
            return Err(Error::Other("CSR indptr 首尾不合法".to_string()));
        }
        if indices.len() != data.len() {
            return Err(Error::Other(format!(
                "CSR indices 长度 {} 与 data 长度 {} 不一致",
                indices.len(),
                data.len()
            )));
        }
        for r in 0..n_rows {
            let (start, end) = (indptr[r], indptr[r + 1]);
            if start > end {
                return Err(Error::Other(format!("CSR indptr 在第 {} 行递减", r)));
            }
            let row = &indices[start..end];
            if row.iter().any(|&c| c >= n_cols) {
                return Err(Error::Other(format!("CSR 第 {} 行列号越界", r)));
            }
            if row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::Other(format!("CSR 第 {} 行列号未严格递增", r)));
            }
        }
        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    /// 由稠密矩阵转换，零元素不存储
    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in dense.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for r in 0..self.n_rows {
            for (c, v) in self.row(r) {
                dense[[r, c]] = v;
            }
        }
        dense
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 已存储的非零元素个数
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// 遍历第 r 行的 (列号, 值)
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    /// 读取单个元素，未存储的位置返回 0
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        match self.indices[start..end].binary_search(&c) {
            Ok(pos) => self.data[start + pos],
            Err(_) => 0.0,
        }
    }

    /// 按给定行号顺序选出若干行（行号可重复）
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for &r in rows {
            let (start, end) = (self.indptr[r], self.indptr[r + 1]);
            indices.extend_from_slice(&self.indices[start..end]);
            data.extend_from_slice(&self.data[start..end]);
            indptr.push(indices.len());
        }
        Self {
            n_rows: rows.len(),
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// 在最左侧插入一列常数，原列号整体右移一位；常数为 0 时不存储
    pub fn prepend_constant_column(&self, value: f64) -> Self {
        let store = value != 0.0;
        let extra = if store { self.n_rows } else { 0 };
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::with_capacity(self.nnz() + extra);
        let mut data = Vec::with_capacity(self.nnz() + extra);
        indptr.push(0);
        for r in 0..self.n_rows {
            if store {
                indices.push(0);
                data.push(value);
            }
            for (c, v) in self.row(r) {
                indices.push(c + 1);
                data.push(v);
            }
            indptr.push(indices.len());
        }
        Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols + 1,
            indptr,
            indices,
            data,
        }
    }

    /// 纵向拼接：把 other 的所有行追加到末尾
    pub fn append_rows(&mut self, other: &CsrMatrix) -> Result<()> {
        if other.n_cols != self.n_cols {
            return Err(Error::Other(format!(
                "CSR 拼接列数不一致: {} 与 {}",
                self.n_cols, other.n_cols
            )));
        }
        let offset = self.indices.len();
        self.indices.extend_from_slice(&other.indices);
        self.data.extend_from_slice(&other.data);
        self.indptr
            .extend(other.indptr[1..].iter().map(|&p| p + offset));
        self.n_rows += other.n_rows;
        Ok(())
    }
}

/// 单个任务或输出表的特征矩阵，稠密或稀疏
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMatrix {
    Dense(Array2<f64>),
    Sparse(CsrMatrix),
}

impl FeatureMatrix {
    /// 指定存储方式的空矩阵（0 行）
    pub fn empty(n_cols: usize, sparse: bool) -> Self {
        if sparse {
            FeatureMatrix::Sparse(CsrMatrix::zeros(0, n_cols))
        } else {
            FeatureMatrix::Dense(Array2::zeros((0, n_cols)))
        }
    }

    pub fn n_rows(&self) -> usize {
        match self {
            FeatureMatrix::Dense(a) => a.nrows(),
            FeatureMatrix::Sparse(m) => m.n_rows(),
        }
    }

    pub fn n_cols(&self) -> usize {
        match self {
            FeatureMatrix::Dense(a) => a.ncols(),
            FeatureMatrix::Sparse(m) => m.n_cols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureMatrix::Sparse(_))
    }

    /// 读取单个元素
    pub fn get(&self, r: usize, c: usize) -> f64 {
        match self {
            FeatureMatrix::Dense(a) => a[[r, c]],
            FeatureMatrix::Sparse(m) => m.get(r, c),
        }
    }

    /// 按行号顺序选出若干行，保持原存储方式
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            FeatureMatrix::Dense(a) => FeatureMatrix::Dense(a.select(Axis(0), rows)),
            FeatureMatrix::Sparse(m) => FeatureMatrix::Sparse(m.select_rows(rows)),
        }
    }

    /// 在最左侧插入一列常数
    pub fn prepend_constant_column(&self, value: f64) -> Self {
        match self {
            FeatureMatrix::Dense(a) => {
                let mut out = Array2::from_elem((a.nrows(), a.ncols() + 1), value);
                out.slice_mut(s![.., 1..]).assign(a);
                FeatureMatrix::Dense(out)
            }
            FeatureMatrix::Sparse(m) => FeatureMatrix::Sparse(m.prepend_constant_column(value)),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            FeatureMatrix::Dense(a) => a.clone(),
            FeatureMatrix::Sparse(m) => m.to_dense(),
        }
    }

    pub fn to_sparse(&self) -> CsrMatrix {
        match self {
            FeatureMatrix::Dense(a) => CsrMatrix::from_dense(a),
            FeatureMatrix::Sparse(m) => m.clone(),
        }
    }
}
