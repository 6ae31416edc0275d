// main.rs
// 命令行入口：读取多任务数据集，按预设或配置文件分区，打印摘要并导出结果。
use anyhow::{bail, Context, Result};
use log::info;
use partitioner::export::{PartitionExporter, RunInfo};
use partitioner::loader::load_tasks;
use partitioner::{PartitionConfig, PartitionOutput, TaskSplitter, Variant};
use prettytable::{row, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;

const USAGE: &str = "用法:
  mtl-prep <预设> <输入> <输出目录> [种子]
  mtl-prep --config <配置.json> <输入> <输出目录> [种子]

预设: landmine | landmine-unbalanced | landmine-coldstart | emails | music
输入: JSON 数据集文件，或包含 task_{n}_x.npy / task_{n}_y.npy 的目录";

/// 解析后的命令行参数
struct CliArgs {
    variant: Option<Variant>,
    config: PartitionConfig,
    input: String,
    output_dir: String,
    seed: Option<u64>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let (variant, config, rest) = match args {
        [flag, path, rest @ ..] if flag == "--config" => {
            let config = PartitionConfig::from_json_file(path)
                .with_context(|| format!("无法加载配置文件 {}", path))?;
            (None, config, rest)
        }
        [name, rest @ ..] => {
            let variant: Variant = name.parse()?;
            (Some(variant), variant.config(), rest)
        }
        [] => bail!("缺少参数\n{}", USAGE),
    };
    let (input, output_dir, seed) = match rest {
        [input, output_dir] => (input, output_dir, None),
        [input, output_dir, seed] => {
            let seed = seed
                .parse::<u64>()
                .with_context(|| format!("种子 '{}' 不是合法的非负整数", seed))?;
            (input, output_dir, Some(seed))
        }
        _ => bail!("参数数量错误\n{}", USAGE),
    };
    Ok(CliArgs {
        variant,
        config,
        input: input.clone(),
        output_dir: output_dir.clone(),
        seed,
    })
}

fn print_summary(args: &CliArgs, output: &PartitionOutput) {
    let mut table = Table::new();
    table.add_row(row!["项目", "值"]);
    let variant = args
        .variant
        .map(|v| v.to_string())
        .unwrap_or_else(|| "自定义配置".to_string());
    table.add_row(row!["预设", variant]);
    table.add_row(row!["任务数 k", output.num_tasks]);
    table.add_row(row!["特征维度", output.feature_dim]);
    table.add_row(row!["存储方式", args.config.storage]);
    table.add_row(row!["训练行数", output.train.n_rows()]);
    table.add_row(row!["测试行数", output.test.n_rows()]);
    if let (Some(warm), Some(cold)) = (output.warm_rows, output.cold_rows()) {
        table.add_row(row!["warm / cold", format!("{} / {}", warm, cold)]);
    }
    table.printstd();
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let tasks = load_tasks(&cli.input).with_context(|| format!("无法读取数据集 {}", cli.input))?;
    let splitter = TaskSplitter::new(cli.config.clone())?;
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!("开始分区: {} 个任务", tasks.len());
    let output = splitter.split(&tasks, &mut rng)?;

    print_summary(&cli, &output);

    let exporter = PartitionExporter::new(&cli.output_dir);
    let manifest = exporter
        .export(
            &output,
            RunInfo {
                variant: cli.variant,
                seed: cli.seed,
            },
        )
        .with_context(|| format!("无法导出到 {}", cli.output_dir))?;
    println!("已导出到 {} (run_id {})", cli.output_dir, manifest.run_id);
    Ok(())
}
