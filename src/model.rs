// 该文件是 Luwang （路网） 项目的一部分。
// src/model.rs - 预测模型与架构注册表
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

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::frame::ConfidenceMap;

#[cfg(not(any(feature = "onnx", feature = "rknn")))]
compile_error!("至少需要启用一个推理后端特性: `onnx` 或 `rknn`");

/// 分割模型的统一推理接口
///
/// 输入任意尺寸的 RGB 图像，输出同尺寸的逐像素置信图。
pub trait Predictor {
  type Error: std::error::Error + Send + Sync + 'static;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error>;
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxPredictor, OnnxPredictorError};

#[cfg(feature = "rknn")]
mod rknn;
#[cfg(feature = "rknn")]
pub use self::rknn::{RknnPredictor, RknnPredictorError};

/// 输入归一化方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
  /// 原样输入 [0, 255]
  None,
  /// x / 255 * scale + offset
  Affine { scale: f32, offset: f32 },
}

impl Normalization {
  /// D-LinkNet 系列训练时使用的归一化：x / 255 * 3.2 - 1.6
  pub const LINKNET: Normalization = Normalization::Affine {
    scale: 3.2,
    offset: -1.6,
  };

  pub fn apply(&self, value: u8) -> f32 {
    match *self {
      Normalization::None => value as f32,
      Normalization::Affine { scale, offset } => value as f32 / 255.0 * scale + offset,
    }
  }
}

/// 网络输入的通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
  Rgb,
  /// LinkNet 系列以 OpenCV 读图训练，输入为 BGR
  Bgr,
}

impl ChannelOrder {
  /// 第 `plane` 个输入通道对应的 RGB 像素下标
  pub fn source_channel(&self, plane: usize) -> usize {
    match self {
      ChannelOrder::Rgb => plane,
      ChannelOrder::Bgr => 2 - plane,
    }
  }
}

/// 推理后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
  /// ONNX 模型，使用 tract 在 CPU 上推理
  Onnx,
  /// RKNN 模型，使用 Rockchip NPU 推理
  Rknn,
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("未知模型: {0}")]
  UnknownModel(String),
  #[error("权重文件不存在: {0}")]
  MissingWeights(PathBuf),
  #[error("推理后端未编译: {0:?}")]
  BackendUnavailable(Backend),
  #[cfg(feature = "onnx")]
  #[error("ONNX 模型错误: {0}")]
  Onnx(#[from] OnnxPredictorError),
  #[cfg(feature = "rknn")]
  #[error("RKNN 模型错误: {0}")]
  Rknn(#[from] RknnPredictorError),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{model} 不支持输入尺寸 {width}x{height}: 宽高须为 {multiple} 的倍数")]
pub struct UnsupportedSize {
  pub model: &'static str,
  pub width: u32,
  pub height: u32,
  pub multiple: u32,
}

/// 网络架构描述
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
  pub name: &'static str,
  /// 训练切片尺寸 (宽, 高)，静态形状的后端（RKNN）按此尺寸导出
  pub input_size: (u32, u32),
  /// 全卷积网络的下采样倍数，动态形状输入的宽高必须是它的整数倍
  pub size_multiple: u32,
  pub normalization: Normalization,
  pub channel_order: ChannelOrder,
}

impl Architecture {
  pub const fn linknet_family(name: &'static str) -> Self {
    Architecture {
      name,
      input_size: (1024, 1024),
      size_multiple: 32,
      normalization: Normalization::LINKNET,
      channel_order: ChannelOrder::Bgr,
    }
  }

  /// 检查动态形状输入的尺寸是否可被网络接受
  pub fn check_input_size(&self, width: u32, height: u32) -> Result<(), UnsupportedSize> {
    let multiple = self.size_multiple.max(1);
    if width == 0 || height == 0 || width % multiple != 0 || height % multiple != 0 {
      return Err(UnsupportedSize {
        model: self.name,
        width,
        height,
        multiple,
      });
    }
    Ok(())
  }

  /// 从权重文件加载预测器
  pub fn load(&self, backend: Backend, weights: &Path) -> Result<PredictorWrapper, ModelError> {
    if !weights.is_file() {
      return Err(ModelError::MissingWeights(weights.to_path_buf()));
    }
    info!("加载 {} 权重: {}", self.name, weights.display());

    match backend {
      #[cfg(feature = "onnx")]
      Backend::Onnx => Ok(PredictorWrapper::Onnx(OnnxPredictor::load(self, weights)?)),
      #[cfg(feature = "rknn")]
      Backend::Rknn => Ok(PredictorWrapper::Rknn(RknnPredictor::load(self, weights)?)),
      #[allow(unreachable_patterns)]
      other => Err(ModelError::BackendUnavailable(other)),
    }
  }
}

/// 架构注册表：模型名称到架构描述的映射
///
/// 在启动时显式构建并传入，不使用全局表。
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
  entries: BTreeMap<&'static str, Architecture>,
}

impl ModelRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// 道路提取任务使用的全部架构
  pub fn road_extraction() -> Self {
    [
      "NL3_LinkNet",
      "NL4_LinkNet",
      "NL34_LinkNet",
      "Baseline",
      "NL_LinkNet_DotProduct",
      "NL_LinkNet_Gaussian",
      "NL_LinkNet_EGaussian",
      "UNet",
      "LinkNet",
      "DLinkNet",
    ]
    .into_iter()
    .map(Architecture::linknet_family)
    .fold(Self::new(), Self::with)
  }

  pub fn with(mut self, architecture: Architecture) -> Self {
    debug!("注册架构: {}", architecture.name);
    self.entries.insert(architecture.name, architecture);
    self
  }

  pub fn get(&self, name: &str) -> Result<&Architecture, ModelError> {
    self
      .entries
      .get(name)
      .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
  }

  pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.entries.keys().copied()
  }
}

/// 已编译后端的预测器封装
pub enum PredictorWrapper {
  #[cfg(feature = "onnx")]
  Onnx(OnnxPredictor),
  #[cfg(feature = "rknn")]
  Rknn(RknnPredictor),
}

impl Predictor for PredictorWrapper {
  type Error = ModelError;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error> {
    match self {
      #[cfg(feature = "onnx")]
      PredictorWrapper::Onnx(model) => model.predict(image).map_err(ModelError::from),
      #[cfg(feature = "rknn")]
      PredictorWrapper::Rknn(model) => model.predict(image).map_err(ModelError::from),
    }
  }
}
