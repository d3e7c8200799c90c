// 该文件是 Luwang （路网） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use luwang::{
  checkpoint::CheckpointSweep,
  input::ImageDirectoryInput,
  model::ModelRegistry,
  output::MaskDirectoryOutput,
  scale::ScaleList,
  task::{SegmentTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  run(&args, &ModelRegistry::road_extraction())
}

fn run(args: &args::Args, registry: &ModelRegistry) -> Result<()> {
  info!("模型架构: {}", args.model);
  info!("权重名称: {}", args.name);
  info!("测试图像目录: {}", args.source.display());
  info!("缩放比例: {:?}", args.scales);
  info!("推理后端: {:?}", args.backend);

  let architecture = registry.get(&args.model)?;
  let task = SegmentTask::new(ScaleList::try_from(args.scales.clone())?);

  match &args.ckpts_dir {
    Some(ckpts_dir) => {
      if args.target.is_some() {
        warn!("遍历检查点时忽略 --target, 结果写入 {}/Results", ckpts_dir.display());
      }
      let sweep = CheckpointSweep::new(ckpts_dir, &args.source, task);
      let report = sweep.run(|checkpoint| architecture.load(args.backend, &checkpoint.weights))?;
      for entry in &report {
        info!(
          "检查点 {}: {} 个掩码 -> {}",
          entry.checkpoint.name,
          entry.masks_written,
          entry.checkpoint.results.display()
        );
      }
      info!("全部完成，共处理 {} 个检查点", report.len());
    }
    None => {
      let model = architecture.load(args.backend, &args.weights_path())?;
      let output = MaskDirectoryOutput::create(args.target_dir())?;
      let input = ImageDirectoryInput::open(&args.source)?;
      let written = task.run_task(input, model, output)?;
      info!("全部完成，共写出 {} 个掩码到 {}", written, args.target_dir().display());
    }
  }

  Ok(())
}
