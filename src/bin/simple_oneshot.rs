// 该文件是 Luwang （路网） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像推理
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use luwang::{
  frame::mask_to_rgb,
  input::SourceImage,
  model::{Backend, ModelRegistry},
  scale::ScaleList,
  task::SegmentTask,
};

/// 单张图像道路提取
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型架构名称
  #[arg(long, value_name = "MODEL")]
  pub model: String,
  /// 权重文件路径
  #[arg(long, value_name = "FILE")]
  pub weights: PathBuf,
  /// 输入图像
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,
  /// 输出掩码路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,
  /// 多尺度测试的缩放比例
  #[arg(long, num_args = 0.., default_values_t = [1.0], value_name = "SCALE")]
  pub scales: Vec<f64>,
  /// 推理后端
  #[arg(long, value_enum, default_value_t = Backend::Onnx)]
  pub backend: Backend,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型架构: {}", args.model);
  info!("权重文件: {}", args.weights.display());
  info!("输入图像: {}", args.input.display());
  info!("输出路径: {}", args.output.display());

  let registry = ModelRegistry::road_extraction();
  let model = registry.get(&args.model)?.load(args.backend, &args.weights)?;
  let task = SegmentTask::new(ScaleList::try_from(args.scales)?);
  let source = SourceImage::open(&args.input)?;

  info!("开始推理...");
  let now = std::time::Instant::now();
  let mask = task.segment(&source.image, &model)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  if let Some(parent) = args.output.parent()
    && !parent.as_os_str().is_empty()
  {
    luwang::utils::ensure_dir(parent)?;
  }
  mask_to_rgb(&mask).save(&args.output)?;
  info!("保存掩码到文件: {}", args.output.display());

  Ok(())
}
