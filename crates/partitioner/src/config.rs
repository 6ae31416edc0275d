// config.rs
// 分区配置：每任务训练/测试样本数、冷启动划分、是否打乱、存储方式，以及各数据集的预设。
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

// 常量定义，避免硬编码
pub const LANDMINE_TRAIN_COUNT: usize = 160;
pub const LANDMINE_UNBALANCED_HEAD_COUNT: usize = 400;
pub const LANDMINE_UNBALANCED_TAIL_COUNT: usize = 20;
pub const EMAILS_TRAIN_COUNT: usize = 100;
pub const MUSIC_TRAIN_COUNT: usize = 200;
pub const MUSIC_TEST_COUNT: usize = 10;
pub const COLDSTART_WARM_PROBABILITY: f64 = 0.5;
pub const COLDSTART_TASK_FRACTION: f64 = 0.8;

/// 每个任务的训练样本数安排
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSchedule {
    /// 所有任务抽取相同数量
    Constant(usize),
    /// 按任务下标分段：n < boundary * k 的任务抽 below 个，其余抽 at_or_above 个
    Threshold {
        boundary: f64,
        below: usize,
        at_or_above: usize,
    },
}

impl CountSchedule {
    /// 第 n 个任务（共 k 个）的训练样本数
    pub fn count_for(&self, n: usize, k: usize) -> usize {
        match self {
            CountSchedule::Constant(c) => *c,
            CountSchedule::Threshold {
                boundary,
                below,
                at_or_above,
            } => {
                if (n as f64) < boundary * k as f64 {
                    *below
                } else {
                    *at_or_above
                }
            }
        }
    }
}

/// 每个任务的测试样本数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestCount {
    /// 训练抽样之后剩余的全部样本
    #[default]
    Remainder,
    /// 训练样本之后紧接着取固定数量
    Capped(usize),
    /// 不生成测试集
    Skip,
}

/// 冷启动划分：决定任务的训练块进入 warm 还是 cold 分区
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColdStartSplit {
    /// 每个任务一次伯努利试验的成功概率
    pub warm_probability: f64,
    /// 只有下标小于 task_fraction * k 的任务才可能进入 warm
    pub task_fraction: f64,
}

impl Default for ColdStartSplit {
    fn default() -> Self {
        Self {
            warm_probability: COLDSTART_WARM_PROBABILITY,
            task_fraction: COLDSTART_TASK_FRACTION,
        }
    }
}

impl ColdStartSplit {
    /// 第 n 个任务是否有资格进入 warm（还需要抛硬币成功）
    pub fn eligible(&self, n: usize, k: usize) -> bool {
        (n as f64) < self.task_fraction * k as f64
    }
}

/// 特征表的存储方式，只影响拼接方式，不影响算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Dense,
    Sparse,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Dense => write!(f, "dense"),
            StorageKind::Sparse => write!(f, "sparse"),
        }
    }
}

/// 分区器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// 每任务训练样本数
    pub train_count: CountSchedule,
    /// 每任务测试样本数
    #[serde(default)]
    pub test_count: TestCount,
    /// 冷启动划分，None 表示不划分
    #[serde(default)]
    pub cold_start: Option<ColdStartSplit>,
    /// 是否打乱训练集
    #[serde(default = "default_shuffle")]
    pub shuffle_output: bool,
    /// 稠密或稀疏存储
    #[serde(default)]
    pub storage: StorageKind,
}

fn default_shuffle() -> bool {
    true
}

impl Default for PartitionConfig {
    /// 默认配置：每任务 160 个训练样本，其余作测试，打乱，稠密存储
    fn default() -> Self {
        Self {
            train_count: CountSchedule::Constant(LANDMINE_TRAIN_COUNT),
            test_count: TestCount::Remainder,
            cold_start: None,
            shuffle_output: true,
            storage: StorageKind::Dense,
        }
    }
}

impl PartitionConfig {
    /// 从 JSON 配置文件读取并校验
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("读取配置文件 {} 失败: {}", path.display(), e))
        })?;
        let config: PartitionConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验概率与比例参数是否落在 [0, 1] 内
    pub fn validate(&self) -> Result<()> {
        if let CountSchedule::Threshold { boundary, .. } = self.train_count {
            if !(0.0..=1.0).contains(&boundary) {
                return Err(Error::config(format!(
                    "训练样本数分段边界 {} 不在 [0, 1] 内",
                    boundary
                )));
            }
        }
        if let Some(split) = &self.cold_start {
            if !(0.0..=1.0).contains(&split.warm_probability) {
                return Err(Error::config(format!(
                    "冷启动概率 {} 不在 [0, 1] 内",
                    split.warm_probability
                )));
            }
            if !(0.0..=1.0).contains(&split.task_fraction) {
                return Err(Error::config(format!(
                    "冷启动任务比例 {} 不在 [0, 1] 内",
                    split.task_fraction
                )));
            }
        }
        Ok(())
    }
}

/// 内置的数据集预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    Landmine,
    LandmineUnbalanced,
    LandmineColdstart,
    Emails,
    Music,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Landmine,
        Variant::LandmineUnbalanced,
        Variant::LandmineColdstart,
        Variant::Emails,
        Variant::Music,
    ];

    /// 预设对应的分区配置
    pub fn config(&self) -> PartitionConfig {
        match self {
            Variant::Landmine => PartitionConfig::default(),
            Variant::LandmineUnbalanced => PartitionConfig {
                train_count: CountSchedule::Threshold {
                    boundary: 0.5,
                    below: LANDMINE_UNBALANCED_HEAD_COUNT,
                    at_or_above: LANDMINE_UNBALANCED_TAIL_COUNT,
                },
                test_count: TestCount::Skip,
                ..PartitionConfig::default()
            },
            Variant::LandmineColdstart => PartitionConfig {
                cold_start: Some(ColdStartSplit::default()),
                ..PartitionConfig::default()
            },
            Variant::Emails => PartitionConfig {
                train_count: CountSchedule::Constant(EMAILS_TRAIN_COUNT),
                storage: StorageKind::Sparse,
                ..PartitionConfig::default()
            },
            Variant::Music => PartitionConfig {
                train_count: CountSchedule::Constant(MUSIC_TRAIN_COUNT),
                test_count: TestCount::Capped(MUSIC_TEST_COUNT),
                shuffle_output: false,
                storage: StorageKind::Sparse,
                cold_start: None,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Landmine => "landmine",
            Variant::LandmineUnbalanced => "landmine-unbalanced",
            Variant::LandmineColdstart => "landmine-coldstart",
            Variant::Emails => "emails",
            Variant::Music => "music",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Variant::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
                Error::config(format!("未知数据集预设 '{}'，可选: {}", s, names.join(", ")))
            })
    }
}
