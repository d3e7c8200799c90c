// 该文件是 Luwang （路网） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use luwang::model::Backend;

/// 道路提取批量推理（TTA + 多尺度测试）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型架构名称，如 DLinkNet、NL34_LinkNet
  #[arg(long, value_name = "MODEL")]
  pub model: String,

  /// 权重文件名（不含扩展名），默认权重为 weights/<NAME>.th
  #[arg(long, value_name = "NAME")]
  pub name: String,

  /// 测试图像目录
  #[arg(long, default_value = "/mnt/Dataset/DeepGlobe/Road/train/", value_name = "DIR")]
  pub source: PathBuf,

  /// 多尺度测试的缩放比例
  #[arg(long, num_args = 0.., default_values_t = [1.0], value_name = "SCALE")]
  pub scales: Vec<f64>,

  /// 掩码输出目录，默认 submits/<NAME>/；遍历检查点时忽略
  #[arg(long, value_name = "DIR")]
  pub target: Option<PathBuf>,

  /// 检查点目录，设置后遍历其中编号能被 5 整除的检查点
  #[arg(long = "ckpts-dir", value_name = "DIR")]
  pub ckpts_dir: Option<PathBuf>,

  /// 显式指定权重文件，优先于 --name 推导的路径
  #[arg(long, value_name = "FILE")]
  pub weights: Option<PathBuf>,

  /// 推理后端
  #[arg(long, value_enum, default_value_t = Backend::Onnx)]
  pub backend: Backend,
}

impl Args {
  pub fn weights_path(&self) -> PathBuf {
    self
      .weights
      .clone()
      .unwrap_or_else(|| PathBuf::from("weights").join(format!("{}.th", self.name)))
  }

  pub fn target_dir(&self) -> PathBuf {
    self
      .target
      .clone()
      .unwrap_or_else(|| PathBuf::from("submits").join(&self.name))
  }
}
