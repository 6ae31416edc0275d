// export.rs
// 结果导出器，负责把分区结果写成 NumPy (.npy) 文件和 JSON 清单，并支持读回。
use crate::config::{StorageKind, Variant};
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, FeatureMatrix};
use crate::types::{LabeledTable, PartitionOutput};
use log::info;
use ndarray::{Array1, Array2};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.json";
const SPLITS: [&str; 2] = ["train", "test"];

/// 导出清单，与 .npy 文件一同写入 manifest.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    /// 本次运行的唯一ID
    pub run_id: String,
    /// 使用的数据集预设（自定义配置时为空）
    pub variant: Option<Variant>,
    /// 随机种子（未指定时为空）
    pub seed: Option<u64>,
    pub num_tasks: usize,
    pub feature_dim: usize,
    pub storage: StorageKind,
    pub train_rows: usize,
    pub test_rows: usize,
    /// 冷启动时训练表前 warm_rows 行属于 warm
    pub warm_rows: Option<usize>,
    /// 写出的文件名
    pub files: Vec<String>,
}

/// 导出时附带的运行信息
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInfo {
    pub variant: Option<Variant>,
    pub seed: Option<u64>,
}

/// 结果导出器
pub struct PartitionExporter {
    output_dir: PathBuf,
}

impl PartitionExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 导出六元组 (train_X, train_Y, test_X, test_Y, k, feature_dim)
    ///
    /// 稠密特征写为 {split}_x.npy；稀疏特征写为 {split}_x_indptr.npy、
    /// {split}_x_indices.npy、{split}_x_data.npy，形状记录在清单中。
    pub fn export(&self, output: &PartitionOutput, run: RunInfo) -> Result<ExportManifest> {
        fs::create_dir_all(&self.output_dir)?;

        let storage = if output.train.features.is_sparse() {
            StorageKind::Sparse
        } else {
            StorageKind::Dense
        };
        let mut files = Vec::new();
        for (split, table) in SPLITS.iter().zip([&output.train, &output.test]) {
            self.write_table(split, table, storage, &mut files)?;
        }

        let manifest = ExportManifest {
            run_id: Uuid::new_v4().to_string(),
            variant: run.variant,
            seed: run.seed,
            num_tasks: output.num_tasks,
            feature_dim: output.feature_dim,
            storage,
            train_rows: output.train.n_rows(),
            test_rows: output.test.n_rows(),
            warm_rows: output.warm_rows,
            files,
        };
        let manifest_path = self.output_dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        info!(
            "导出完成: {} (run_id {})",
            self.output_dir.display(),
            manifest.run_id
        );
        Ok(manifest)
    }

    fn write_table(
        &self,
        split: &str,
        table: &LabeledTable,
        storage: StorageKind,
        files: &mut Vec<String>,
    ) -> Result<()> {
        match storage {
            StorageKind::Dense => {
                let name = format!("{}_x.npy", split);
                self.write_npy(&name, &table.features.to_dense())?;
                files.push(name);
            }
            StorageKind::Sparse => {
                let csr = table.features.to_sparse();
                for (part, values) in [
                    ("indptr", to_u64(csr.indptr())),
                    ("indices", to_u64(csr.indices())),
                ] {
                    let name = format!("{}_x_{}.npy", split, part);
                    self.write_npy(&name, &values)?;
                    files.push(name);
                }
                let name = format!("{}_x_data.npy", split);
                self.write_npy(&name, &Array1::from(csr.data().to_vec()))?;
                files.push(name);
            }
        }
        let name = format!("{}_y.npy", split);
        self.write_npy(&name, &table.labels)?;
        files.push(name);
        Ok(())
    }

    fn write_npy<T: WriteNpyExt>(&self, name: &str, array: &T) -> Result<()> {
        let file = File::create(self.output_dir.join(name))?;
        array.write_npy(file)?;
        Ok(())
    }
}

fn to_u64(values: &[usize]) -> Array1<u64> {
    values.iter().map(|&v| v as u64).collect()
}

fn read_npy<T: ReadNpyExt>(dir: &Path, name: &str) -> Result<T> {
    Ok(T::read_npy(File::open(dir.join(name))?)?)
}

fn read_index(dir: &Path, name: &str) -> Result<Vec<usize>> {
    let values: Array1<u64> = read_npy(dir, name)?;
    Ok(values.iter().map(|&v| v as usize).collect())
}

fn read_table(dir: &Path, split: &str, rows: usize, manifest: &ExportManifest) -> Result<LabeledTable> {
    let features = match manifest.storage {
        StorageKind::Dense => {
            let dense: Array2<f64> = read_npy(dir, &format!("{}_x.npy", split))?;
            FeatureMatrix::Dense(dense)
        }
        StorageKind::Sparse => {
            let indptr = read_index(dir, &format!("{}_x_indptr.npy", split))?;
            let indices = read_index(dir, &format!("{}_x_indices.npy", split))?;
            let data: Array1<f64> = read_npy(dir, &format!("{}_x_data.npy", split))?;
            FeatureMatrix::Sparse(CsrMatrix::try_new(
                rows,
                manifest.feature_dim,
                indptr,
                indices,
                data.to_vec(),
            )?)
        }
    };
    let labels: Array1<f64> = read_npy(dir, &format!("{}_y.npy", split))?;
    if features.n_rows() != rows || labels.len() != rows {
        return Err(Error::Other(format!(
            "{} 划分的行数与清单不一致: 特征 {}，标签 {}，清单 {}",
            split,
            features.n_rows(),
            labels.len(),
            rows
        )));
    }
    Ok(LabeledTable { features, labels })
}

/// 读取导出目录中的清单
pub fn read_manifest<P: AsRef<Path>>(dir: P) -> Result<ExportManifest> {
    let contents = fs::read_to_string(dir.as_ref().join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&contents)?)
}

/// 读回导出的分区结果
pub fn load_exported<P: AsRef<Path>>(dir: P) -> Result<(ExportManifest, PartitionOutput)> {
    let dir = dir.as_ref();
    let manifest = read_manifest(dir)?;
    let train = read_table(dir, "train", manifest.train_rows, &manifest)?;
    let test = read_table(dir, "test", manifest.test_rows, &manifest)?;
    let output = PartitionOutput {
        train,
        test,
        num_tasks: manifest.num_tasks,
        feature_dim: manifest.feature_dim,
        warm_rows: manifest.warm_rows,
    };
    Ok((manifest, output))
}
