// loader.rs
// 数据集加载器，支持从 JSON 文件或 NumPy (.npy) 目录读取多任务数据集。
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, FeatureMatrix};
use crate::task::{TaskCollection, TaskData};
use log::info;
use ndarray::{Array1, Array2};
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// JSON 中的稀疏矩阵（CSR 三数组 + 形状）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCsr {
    pub n_rows: usize,
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

/// JSON 中的特征矩阵：二维数组或 CSR
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFeatures {
    Dense(Vec<Vec<f64>>),
    Sparse(RawCsr),
}

/// JSON 中的单个任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTask {
    pub features: RawFeatures,
    pub labels: Vec<f64>,
}

/// JSON 数据集文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDataset {
    pub tasks: Vec<RawTask>,
}

impl RawTask {
    fn into_task(self, n: usize) -> Result<TaskData> {
        let features = match self.features {
            RawFeatures::Dense(rows) => {
                let n_rows = rows.len();
                let n_cols = rows.first().map_or(0, |r| r.len());
                let mut values = Vec::with_capacity(n_rows * n_cols);
                for row in rows {
                    if row.len() != n_cols {
                        return Err(Error::ShapeMismatch {
                            task: n,
                            expected: n_cols,
                            found: row.len(),
                        });
                    }
                    values.extend(row);
                }
                let dense = Array2::from_shape_vec((n_rows, n_cols), values)
                    .map_err(|e| Error::Other(format!("任务 {} 特征矩阵构建失败: {}", n, e)))?;
                FeatureMatrix::Dense(dense)
            }
            RawFeatures::Sparse(raw) => FeatureMatrix::Sparse(CsrMatrix::try_new(
                raw.n_rows,
                raw.n_cols,
                raw.indptr,
                raw.indices,
                raw.data,
            )?),
        };
        Ok(TaskData::new(features, Array1::from(self.labels)))
    }

    fn from_task(task: &TaskData) -> Self {
        let features = match &task.features {
            FeatureMatrix::Dense(a) => {
                RawFeatures::Dense(a.rows().into_iter().map(|r| r.to_vec()).collect())
            }
            FeatureMatrix::Sparse(m) => RawFeatures::Sparse(RawCsr {
                n_rows: m.n_rows(),
                n_cols: m.n_cols(),
                indptr: m.indptr().to_vec(),
                indices: m.indices().to_vec(),
                data: m.data().to_vec(),
            }),
        };
        Self {
            features,
            labels: task.labels.to_vec(),
        }
    }
}

/// 从 JSON 文件读取任务集合
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<TaskCollection> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let raw: RawDataset = serde_json::from_str(&contents)?;
    let tasks = raw
        .tasks
        .into_iter()
        .enumerate()
        .map(|(n, t)| t.into_task(n))
        .collect::<Result<Vec<_>>>()?;
    info!("从 {} 读取 {} 个任务", path.display(), tasks.len());
    Ok(TaskCollection::new(tasks))
}

/// 把任务集合写成 JSON 文件
pub fn save_json<P: AsRef<Path>>(tasks: &TaskCollection, path: P) -> Result<()> {
    let raw = RawDataset {
        tasks: tasks.iter().map(RawTask::from_task).collect(),
    };
    fs::write(path, serde_json::to_string(&raw)?)?;
    Ok(())
}

fn task_file(dir: &Path, n: usize, suffix: &str) -> PathBuf {
    dir.join(format!("task_{}_{}.npy", n, suffix))
}

/// 读取标签：一维数组，或 n×1 的列向量
fn read_labels(path: &Path) -> Result<Array1<f64>> {
    match Array1::<f64>::read_npy(File::open(path)?) {
        Ok(labels) => Ok(labels),
        Err(_) => {
            let column = Array2::<f64>::read_npy(File::open(path)?)?;
            if column.ncols() != 1 {
                return Err(Error::Other(format!(
                    "{} 不是一维标签或列向量，形状 {:?}",
                    path.display(),
                    column.dim()
                )));
            }
            Ok(column.column(0).to_owned())
        }
    }
}

/// 从目录读取 task_{n}_x.npy / task_{n}_y.npy，从 n = 0 开始直到第一个缺失的任务
pub fn load_npy_dir<P: AsRef<Path>>(dir: P) -> Result<TaskCollection> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Other(format!("{} 不是目录", dir.display())));
    }
    let mut tasks = Vec::new();
    loop {
        let n = tasks.len();
        let x_path = task_file(dir, n, "x");
        let y_path = task_file(dir, n, "y");
        if !x_path.exists() {
            break;
        }
        if !y_path.exists() {
            return Err(Error::Other(format!(
                "缺少必要文件: {}",
                y_path.display()
            )));
        }
        let features = Array2::<f64>::read_npy(File::open(&x_path)?)?;
        let labels = read_labels(&y_path)?;
        tasks.push(TaskData::new(FeatureMatrix::Dense(features), labels));
    }
    info!("从目录 {} 读取 {} 个任务", dir.display(), tasks.len());
    Ok(TaskCollection::new(tasks))
}

/// 根据路径类型自动选择：目录按 npy 读取，其余按 JSON 读取
pub fn load_tasks<P: AsRef<Path>>(path: P) -> Result<TaskCollection> {
    let path = path.as_ref();
    if path.is_dir() {
        load_npy_dir(path)
    } else {
        load_json(path)
    }
}
