// task_splitter.rs
// 任务拆分器，负责对每个任务随机抽取训练/测试样本、前置任务ID、按需划分 warm/cold 并打乱训练集。
use crate::accumulator::{new_accumulator, TableAccumulator};
use crate::config::{PartitionConfig, TestCount, Variant};
use crate::data_preparator::tag_rows;
use crate::error::{Error, Result};
use crate::task::TaskCollection;
use crate::types::{LabeledTable, PartitionOutput};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

/// 单个任务的抽样结果：训练与测试样本下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePlan {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// 对 [0, n_samples) 做一次均匀随机置换，前 train_count 个作训练，其后按 test_count 取测试
///
/// 调用前需保证 train_count（以及 Capped 时的测试数）不超过 n_samples。
pub fn draw_sample_plan<R: Rng>(
    n_samples: usize,
    train_count: usize,
    test_count: TestCount,
    rng: &mut R,
) -> SamplePlan {
    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(rng);
    let test_end = match test_count {
        TestCount::Remainder => n_samples,
        TestCount::Capped(c) => train_count.saturating_add(c).min(n_samples),
        TestCount::Skip => train_count,
    };
    let test = order[train_count..test_end].to_vec();
    order.truncate(train_count);
    SamplePlan { train: order, test }
}

/// 对整张表做一次随机行置换
pub fn shuffle_table<R: Rng>(table: LabeledTable, rng: &mut R) -> Result<LabeledTable> {
    let mut permutation: Vec<usize> = (0..table.n_rows()).collect();
    permutation.shuffle(rng);
    table.permute_rows(&permutation)
}

/// 任务拆分器，把多任务数据集展开成带任务ID的训练/测试表
pub struct TaskSplitter {
    /// 分区配置
    config: PartitionConfig,
}

/// 任务拆分器实现
impl TaskSplitter {
    /// 创建新的任务拆分器，先校验配置
    pub fn new(config: PartitionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 使用内置数据集预设
    pub fn from_variant(variant: Variant) -> Self {
        Self {
            config: variant.config(),
        }
    }

    /// 当前使用的分区配置
    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// 执行分区
    pub fn split<R: Rng>(&self, tasks: &TaskCollection, rng: &mut R) -> Result<PartitionOutput> {
        self.config.validate()?;
        let k = tasks.len();
        if k == 0 {
            return Err(Error::EmptyInput("任务集合中没有任何任务".to_string()));
        }
        let dim = tasks.validate_shapes()?;
        // 抽样之前检查所有任务的样本数，失败时不产生任何部分结果
        self.check_sample_counts(tasks)?;

        let out_cols = dim + 1;
        let storage = self.config.storage;
        let mut train_acc = new_accumulator(storage, out_cols);
        let mut cold_acc = self
            .config
            .cold_start
            .map(|_| new_accumulator(storage, out_cols));
        let mut test_acc = new_accumulator(storage, out_cols);

        for (n, task) in tasks.iter().enumerate() {
            let train_count = self.config.train_count.count_for(n, k);
            let plan = draw_sample_plan(task.n_samples(), train_count, self.config.test_count, rng);
            let train_block = tag_rows(n, task, &plan.train)?;

            match (&self.config.cold_start, cold_acc.as_mut()) {
                (Some(split), Some(cold)) => {
                    let flip = rng.gen_bool(split.warm_probability);
                    if split.eligible(n, k) && flip {
                        debug!("任务 {} 的 {} 个训练样本进入 warm", n, plan.train.len());
                        train_acc.append_rows(train_block)?;
                    } else {
                        debug!("任务 {} 的 {} 个训练样本进入 cold", n, plan.train.len());
                        cold.append_rows(train_block)?;
                    }
                }
                _ => train_acc.append_rows(train_block)?,
            }

            if !plan.test.is_empty() {
                test_acc.append_rows(tag_rows(n, task, &plan.test)?)?;
            }
            debug!(
                "任务 {}: 样本 {}，训练 {}，测试 {}",
                n,
                task.n_samples(),
                plan.train.len(),
                plan.test.len()
            );
        }

        let (train, warm_rows) = match cold_acc {
            Some(cold_acc) => self.merge_warm_cold(train_acc, cold_acc, out_cols, rng)?,
            None => {
                let mut train = train_acc.finalize()?;
                if self.config.shuffle_output {
                    train = shuffle_table(train, rng)?;
                }
                (train, None)
            }
        };
        let test = test_acc.finalize()?;

        info!(
            "分区完成: {} 个任务，训练 {} 行，测试 {} 行，特征维度 {}",
            k,
            train.n_rows(),
            test.n_rows(),
            out_cols
        );
        Ok(PartitionOutput {
            train,
            test,
            num_tasks: k,
            feature_dim: out_cols,
            warm_rows,
        })
    }

    /// warm 与 cold 各自打乱后按 warm 在前、cold 在后拼接
    fn merge_warm_cold<R: Rng>(
        &self,
        warm_acc: Box<dyn TableAccumulator>,
        cold_acc: Box<dyn TableAccumulator>,
        out_cols: usize,
        rng: &mut R,
    ) -> Result<(LabeledTable, Option<usize>)> {
        let mut warm = warm_acc.finalize()?;
        let mut cold = cold_acc.finalize()?;
        if self.config.shuffle_output {
            warm = shuffle_table(warm, rng)?;
            cold = shuffle_table(cold, rng)?;
        }
        let warm_rows = warm.n_rows();
        info!("冷启动划分: warm {} 行，cold {} 行", warm_rows, cold.n_rows());

        let mut merged = new_accumulator(self.config.storage, out_cols);
        merged.append_table(warm)?;
        merged.append_table(cold)?;
        Ok((merged.finalize()?, Some(warm_rows)))
    }

    /// 检查每个任务是否有足够样本满足训练（及限定数量的测试）抽样
    fn check_sample_counts(&self, tasks: &TaskCollection) -> Result<()> {
        let k = tasks.len();
        for (n, task) in tasks.iter().enumerate() {
            let n_samples = task.n_samples();
            let train_count = self.config.train_count.count_for(n, k);
            let test_cap = match self.config.test_count {
                TestCount::Capped(c) => c,
                TestCount::Remainder | TestCount::Skip => 0,
            };
            let needed = train_count.checked_add(test_cap).ok_or_else(|| {
                Error::config(format!(
                    "任务 {} 的训练 {} + 测试 {} 超出可表示范围",
                    n, train_count, test_cap
                ))
            })?;
            if n_samples == 0 && needed > 0 {
                return Err(Error::EmptyInput(format!(
                    "任务 {} 没有样本，但需要抽取 {} 个",
                    n, needed
                )));
            }
            if n_samples < train_count {
                return Err(Error::config(format!(
                    "任务 {} 只有 {} 个样本，少于训练样本数 {}",
                    n, n_samples, train_count
                )));
            }
            if n_samples < needed {
                return Err(Error::config(format!(
                    "任务 {} 只有 {} 个样本，少于训练 {} + 测试 {}",
                    n, n_samples, train_count, test_cap
                )));
            }
        }
        Ok(())
    }
}

/// 便捷入口：按配置对任务集合做一次分区
pub fn partition<R: Rng>(
    tasks: &TaskCollection,
    config: &PartitionConfig,
    rng: &mut R,
) -> Result<PartitionOutput> {
    TaskSplitter::new(config.clone())?.split(tasks, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColdStartSplit, CountSchedule, StorageKind};
    use crate::matrix::FeatureMatrix;
    use crate::task::TaskData;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// 第 n 个任务的第 i 个样本：特征 [n * 1000 + i, i]，标签 i
    fn synthetic_tasks(sizes: &[usize]) -> TaskCollection {
        let tasks = sizes
            .iter()
            .enumerate()
            .map(|(n, &size)| {
                let features = Array2::from_shape_fn((size, 2), |(i, c)| {
                    if c == 0 {
                        (n * 1000 + i) as f64
                    } else {
                        i as f64
                    }
                });
                let labels = Array1::from_shape_fn(size, |i| i as f64);
                TaskData::new(FeatureMatrix::Dense(features), labels)
            })
            .collect::<Vec<_>>();
        TaskCollection::new(tasks)
    }

    fn config(train: usize) -> PartitionConfig {
        PartitionConfig {
            train_count: CountSchedule::Constant(train),
            ..PartitionConfig::default()
        }
    }

    /// 每行的 (任务ID, 样本下标)
    fn row_keys(table: &LabeledTable) -> Vec<(usize, usize)> {
        (0..table.n_rows())
            .map(|r| {
                let task = table.task_id_of(r);
                let sample = table.features.get(r, 2) as usize;
                (task, sample)
            })
            .collect()
    }

    fn assert_aligned(table: &LabeledTable) {
        for r in 0..table.n_rows() {
            let task = table.task_id_of(r) as f64;
            let raw = table.features.get(r, 1);
            let sample = table.features.get(r, 2);
            assert_eq!(raw, task * 1000.0 + sample, "第 {} 行的任务ID与内容不符", r);
            assert_eq!(table.labels[r], sample, "第 {} 行的标签与特征错位", r);
        }
    }

    #[test]
    fn test_sample_plan_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = draw_sample_plan(10, 4, TestCount::Remainder, &mut rng);
        assert_eq!(plan.train.len(), 4);
        assert_eq!(plan.test.len(), 6);
        let train: HashSet<_> = plan.train.iter().copied().collect();
        let test: HashSet<_> = plan.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        let all: HashSet<_> = train.union(&test).copied().collect();
        assert_eq!(all, (0..10).collect());

        let capped = draw_sample_plan(10, 4, TestCount::Capped(3), &mut rng);
        assert_eq!(capped.test.len(), 3);
        assert!(capped.train.iter().all(|i| !capped.test.contains(i)));

        let skipped = draw_sample_plan(10, 4, TestCount::Skip, &mut rng);
        assert!(skipped.test.is_empty());
    }

    #[test]
    fn test_two_task_scenario() {
        let tasks = synthetic_tasks(&[5, 5]);
        let mut rng = StdRng::seed_from_u64(42);
        let out = partition(&tasks, &config(3), &mut rng).unwrap();

        assert_eq!(out.num_tasks, 2);
        assert_eq!(out.feature_dim, 3);
        assert_eq!(out.train.n_rows(), 6);
        assert_eq!(out.test.n_rows(), 4);
        assert!(out.warm_rows.is_none());

        for n in 0..2 {
            let train_n = row_keys(&out.train).iter().filter(|(t, _)| *t == n).count();
            let test_n = row_keys(&out.test).iter().filter(|(t, _)| *t == n).count();
            assert_eq!((train_n, test_n), (3, 2));
        }

        // 每个任务的训练与测试样本不重叠，且合起来覆盖全部样本
        let train_keys: HashSet<_> = row_keys(&out.train).into_iter().collect();
        let test_keys: HashSet<_> = row_keys(&out.test).into_iter().collect();
        assert!(train_keys.is_disjoint(&test_keys));
        assert_eq!(train_keys.len() + test_keys.len(), 10);

        assert_aligned(&out.train);
        assert_aligned(&out.test);
    }

    #[test]
    fn test_test_table_stays_in_task_order() {
        let tasks = synthetic_tasks(&[6, 6, 6]);
        let mut rng = StdRng::seed_from_u64(3);
        let out = partition(&tasks, &config(2), &mut rng).unwrap();
        let ids: Vec<usize> = (0..out.test.n_rows()).map(|r| out.test.task_id_of(r)).collect();
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let tasks = synthetic_tasks(&[8, 8, 8]);
        let shuffled = partition(&tasks, &config(5), &mut StdRng::seed_from_u64(11)).unwrap();
        let plain = partition(
            &tasks,
            &PartitionConfig {
                shuffle_output: false,
                ..config(5)
            },
            &mut StdRng::seed_from_u64(11),
        )
        .unwrap();

        let mut a = row_keys(&shuffled.train);
        let mut b = row_keys(&plain.train);
        assert_ne!(a, b, "打乱后顺序应当改变");
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_aligned(&shuffled.train);
        // 测试集不受打乱影响
        assert_eq!(shuffled.test, plain.test);
    }

    #[test]
    fn test_coldstart_sections_are_shuffled() {
        let tasks = synthetic_tasks(&[6; 10]);
        let split = Some(ColdStartSplit {
            warm_probability: 1.0,
            task_fraction: 0.5,
        });
        let shuffled_cfg = PartitionConfig {
            cold_start: split,
            ..config(3)
        };
        let plain_cfg = PartitionConfig {
            shuffle_output: false,
            ..shuffled_cfg.clone()
        };
        let shuffled = partition(&tasks, &shuffled_cfg, &mut StdRng::seed_from_u64(13)).unwrap();
        let plain = partition(&tasks, &plain_cfg, &mut StdRng::seed_from_u64(13)).unwrap();
        assert_eq!(shuffled.warm_rows, Some(15));
        assert_eq!(plain.warm_rows, Some(15));

        let shuffled_keys = row_keys(&shuffled.train);
        let plain_keys = row_keys(&plain.train);
        for (start, end) in [(0, 15), (15, 30)] {
            let mut a = shuffled_keys[start..end].to_vec();
            let mut b = plain_keys[start..end].to_vec();
            assert!(b.windows(2).all(|w| w[0].0 <= w[1].0), "不打乱时应按任务顺序排列");
            assert_ne!(a, b, "打乱后分区内部顺序应当改变");
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
        assert_aligned(&shuffled.train);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let tasks = synthetic_tasks(&[9, 7, 12]);
        let a = partition(&tasks, &config(4), &mut StdRng::seed_from_u64(99)).unwrap();
        let b = partition(&tasks, &config(4), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sparse_storage_matches_dense() {
        let tasks = synthetic_tasks(&[9, 7, 12]);
        let dense = partition(&tasks, &config(4), &mut StdRng::seed_from_u64(5)).unwrap();
        let sparse_config = PartitionConfig {
            storage: StorageKind::Sparse,
            ..config(4)
        };
        let sparse = partition(&tasks, &sparse_config, &mut StdRng::seed_from_u64(5)).unwrap();
        assert!(sparse.train.features.is_sparse());
        assert_eq!(sparse.train.features.to_dense(), dense.train.features.to_dense());
        assert_eq!(sparse.test.features.to_dense(), dense.test.features.to_dense());
        assert_eq!(sparse.train.labels, dense.train.labels);
        assert_eq!(sparse.feature_dim, dense.feature_dim);
    }

    #[test]
    fn test_unbalanced_scenario() {
        let tasks = synthetic_tasks(&[450, 450, 450, 450]);
        let splitter = TaskSplitter::from_variant(Variant::LandmineUnbalanced);
        let out = splitter.split(&tasks, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(out.train.n_rows(), 840);
        assert!(out.test.is_empty());
        assert_eq!(out.test.n_cols(), 3);
        let keys = row_keys(&out.train);
        let per_task: Vec<usize> = (0..4)
            .map(|n| keys.iter().filter(|(t, _)| *t == n).count())
            .collect();
        assert_eq!(per_task, vec![400, 400, 20, 20]);
        assert_aligned(&out.train);
    }

    #[test]
    fn test_capped_test_count() {
        let tasks = synthetic_tasks(&[20, 30]);
        let cfg = PartitionConfig {
            test_count: TestCount::Capped(4),
            shuffle_output: false,
            ..config(10)
        };
        let out = partition(&tasks, &cfg, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(out.train.n_rows(), 20);
        assert_eq!(out.test.n_rows(), 8);
        // 不打乱时训练集按任务顺序排列
        assert!((0..10).all(|r| out.train.task_id_of(r) == 0));
        assert!((10..20).all(|r| out.train.task_id_of(r) == 1));
    }

    #[test]
    fn test_coldstart_routing() {
        let tasks = synthetic_tasks(&[6; 5]);
        let always_warm = PartitionConfig {
            cold_start: Some(ColdStartSplit {
                warm_probability: 1.0,
                task_fraction: 0.8,
            }),
            ..config(3)
        };
        let out = partition(&tasks, &always_warm, &mut StdRng::seed_from_u64(8)).unwrap();
        // 前 80% 的任务（0..4）全部进入 warm，任务 4 无论抛硬币结果如何都进入 cold
        assert_eq!(out.warm_rows, Some(12));
        assert_eq!(out.cold_rows(), Some(3));
        assert!((0..12).all(|r| out.train.task_id_of(r) < 4));
        assert!((12..15).all(|r| out.train.task_id_of(r) == 4));
        assert_aligned(&out.train);

        let never_warm = PartitionConfig {
            cold_start: Some(ColdStartSplit {
                warm_probability: 0.0,
                task_fraction: 0.8,
            }),
            ..config(3)
        };
        let out = partition(&tasks, &never_warm, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(out.warm_rows, Some(0));
        assert_eq!(out.train.n_rows(), 15);
    }

    #[test]
    fn test_coldstart_keeps_tasks_whole() {
        let tasks = synthetic_tasks(&[10; 10]);
        let splitter = TaskSplitter::from_variant(Variant::LandmineColdstart);
        let cfg = PartitionConfig {
            train_count: CountSchedule::Constant(4),
            ..splitter.config().clone()
        };
        let out = partition(&tasks, &cfg, &mut StdRng::seed_from_u64(2024)).unwrap();
        let warm_rows = out.warm_rows.unwrap();
        assert_eq!(out.train.n_rows(), 40);
        assert_eq!(warm_rows % 4, 0);

        let warm: HashSet<usize> = (0..warm_rows).map(|r| out.train.task_id_of(r)).collect();
        let cold: HashSet<usize> = (warm_rows..40).map(|r| out.train.task_id_of(r)).collect();
        assert!(warm.is_disjoint(&cold), "同一任务的训练块不应被拆开");
        assert!(warm.iter().all(|&n| n < 8));
        assert!(cold.contains(&8) && cold.contains(&9));
        assert_eq!(out.test.n_rows(), 60);
    }

    #[test]
    fn test_feature_dim_for_every_variant() {
        let tasks = synthetic_tasks(&[500; 4]);
        for variant in Variant::ALL {
            let out = TaskSplitter::from_variant(variant)
                .split(&tasks, &mut StdRng::seed_from_u64(0))
                .unwrap();
            assert_eq!(out.feature_dim, 3, "{}", variant);
            assert_eq!(out.train.n_cols(), 3);
            assert_eq!(out.test.n_cols(), 3);
        }
    }

    #[test]
    fn test_too_few_samples_is_configuration_error() {
        let tasks = synthetic_tasks(&[5, 2]);
        let err = partition(&tasks, &config(3), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let tasks = synthetic_tasks(&[12]);
        let capped = PartitionConfig {
            test_count: TestCount::Capped(5),
            ..config(10)
        };
        let err = partition(&tasks, &capped, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_huge_test_cap_is_configuration_error() {
        let tasks = synthetic_tasks(&[6]);
        let cfg = PartitionConfig {
            test_count: TestCount::Capped(usize::MAX),
            ..config(5)
        };
        let err = partition(&tasks, &cfg, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        // 直接调用抽样时，测试数被截断在样本范围内
        let plan = draw_sample_plan(6, 5, TestCount::Capped(usize::MAX), &mut StdRng::seed_from_u64(0));
        assert_eq!((plan.train.len(), plan.test.len()), (5, 1));
    }

    #[test]
    fn test_empty_inputs() {
        let err = partition(
            &TaskCollection::default(),
            &config(1),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));

        let tasks = synthetic_tasks(&[4, 0]);
        let err = partition(&tasks, &config(1), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_zero_width_empty_task_with_zero_train() {
        let mut tasks = synthetic_tasks(&[4, 4]);
        tasks.tasks.insert(
            1,
            TaskData::new(FeatureMatrix::Dense(Array2::zeros((0, 0))), Array1::zeros(0)),
        );
        let out = partition(&tasks, &config(0), &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(out.feature_dim, 3);
        assert_eq!(out.train.n_rows(), 0);
        assert_eq!(out.test.n_rows(), 8);

        let err = partition(&tasks, &config(1), &mut StdRng::seed_from_u64(2)).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut tasks = synthetic_tasks(&[4, 4]);
        tasks.tasks[1].features = FeatureMatrix::Dense(Array2::zeros((4, 3)));
        let err = partition(&tasks, &config(2), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { task: 1, expected: 2, found: 3 }
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_split() {
        let cfg = PartitionConfig {
            cold_start: Some(ColdStartSplit {
                warm_probability: 0.5,
                task_fraction: -0.1,
            }),
            ..config(1)
        };
        assert!(matches!(TaskSplitter::new(cfg), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_split_revalidates_config() {
        let tasks = synthetic_tasks(&[200, 200]);
        let mut splitter = TaskSplitter::from_variant(Variant::LandmineColdstart);
        splitter.config.cold_start = Some(ColdStartSplit {
            warm_probability: 2.0,
            task_fraction: 0.8,
        });
        let err = splitter
            .split(&tasks, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(splitter.config().train_count, CountSchedule::Constant(160));
    }
}
