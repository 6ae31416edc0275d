//! coldstart_routing.rs
//!
//! 展示冷启动划分：前 80% 的任务抛硬币决定进入 warm 或 cold，其余任务一律进入 cold。
//! 打印每个任务在训练表中所在的分区。

use partitioner::error::Result;
use partitioner::matrix::FeatureMatrix;
use partitioner::ndarray::{Array1, Array2};
use partitioner::{CountSchedule, PartitionConfig, TaskCollection, TaskData, TaskSplitter, Variant};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

fn main() -> Result<()> {
    println!("=== 冷启动划分示例 ===");

    let k = 10;
    let tasks = TaskCollection::new(
        (0..k)
            .map(|n| {
                let features = Array2::from_elem((20, 3), n as f64);
                TaskData::new(FeatureMatrix::Dense(features), Array1::zeros(20))
            })
            .collect(),
    );

    let config = PartitionConfig {
        train_count: CountSchedule::Constant(8),
        ..Variant::LandmineColdstart.config()
    };
    let splitter = TaskSplitter::new(config)?;
    let output = splitter.split(&tasks, &mut StdRng::seed_from_u64(42))?;

    let warm_rows = output.warm_rows.unwrap_or(0);
    let mut placement: BTreeMap<usize, &str> = BTreeMap::new();
    for r in 0..output.train.n_rows() {
        let section = if r < warm_rows { "warm" } else { "cold" };
        placement.insert(output.train.task_id_of(r), section);
    }
    for (task, section) in &placement {
        println!("任务 {:>2} -> {}", task, section);
    }
    println!(
        "warm {} 行，cold {} 行，测试 {} 行",
        warm_rows,
        output.cold_rows().unwrap_or(0),
        output.test.n_rows()
    );

    Ok(())
}
