//! partition_synthetic.rs
//!
//! 在合成数据上跑一遍全部预设，打印每个预设的训练/测试规模。
//! 每个任务 500 个样本、4 维特征，足够满足所有预设的抽样数量。

use partitioner::error::Result;
use partitioner::matrix::FeatureMatrix;
use partitioner::ndarray::{Array1, Array2};
use partitioner::{TaskCollection, TaskData, TaskSplitter, Variant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_tasks(k: usize, n_samples: usize, dim: usize, rng: &mut StdRng) -> TaskCollection {
    let tasks = (0..k)
        .map(|_| {
            let features = Array2::from_shape_fn((n_samples, dim), |_| rng.gen_range(-1.0..1.0));
            let labels = Array1::from_shape_fn(n_samples, |_| if rng.gen_bool(0.3) { 1.0 } else { 0.0 });
            TaskData::new(FeatureMatrix::Dense(features), labels)
        })
        .collect();
    TaskCollection::new(tasks)
}

fn main() -> Result<()> {
    println!("=== 合成数据分区示例 ===");

    let mut data_rng = StdRng::seed_from_u64(2024);
    let tasks = synthetic_tasks(6, 500, 4, &mut data_rng);
    println!("生成 {} 个任务，每个 500 个样本", tasks.len());

    for variant in Variant::ALL {
        let mut rng = StdRng::seed_from_u64(7);
        let output = TaskSplitter::from_variant(variant).split(&tasks, &mut rng)?;
        println!(
            "{:<20} 训练 {:>5} 行  测试 {:>5} 行  特征维度 {}",
            variant.name(),
            output.train.n_rows(),
            output.test.n_rows(),
            output.feature_dim
        );
    }

    Ok(())
}
