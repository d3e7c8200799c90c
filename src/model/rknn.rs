// 该文件是 Luwang （路网） 项目的一部分。
// src/model/rknn.rs - RKNN 分割模型（Rockchip NPU 推理）
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

use std::path::Path;

use image::{Luma, RgbImage};
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::{self, ConfidenceMap},
  model::{Architecture, ChannelOrder, Predictor},
};

const RKNN_NUM_INPUTS: u32 = 1;
const RKNN_NUM_OUTPUTS: u32 = 1;

#[derive(Error, Debug)]
pub enum RknnPredictorError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型输出尺寸错误: 期望 {expected} 个元素, 实际 {actual} 个")]
  OutputShape { expected: usize, actual: usize },
}

impl RknnPredictorError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknnPredictorError::ModelInvalid(msg.to_string(), e)
  }
}

/// NHWC u8 输入、单通道 f32 输出的 RKNN 模型
///
/// 归一化已在模型转换时写入 RKNN 文件，这里直接输入原始像素。
/// RKNN 模型是静态形状，任意尺寸的输入都会先缩放到导出尺寸再推理。
pub struct RknnPredictor {
  context: Context,
  input_size: (u32, u32),
  channel_order: ChannelOrder,
}

impl RknnPredictor {
  pub fn load(architecture: &Architecture, path: &Path) -> Result<Self, RknnPredictorError> {
    let model_data = std::fs::read(path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, InitFlags::default())?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknnPredictorError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknnPredictorError::invalid("无法获取输出数量", e))?;

    if num_inputs != RKNN_NUM_INPUTS || num_outputs != RKNN_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        RKNN_NUM_INPUTS, RKNN_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(RknnPredictorError::invalid(
        &msg,
        rknpu::Error::InvalidModel,
      ));
    }

    Ok(RknnPredictor {
      context,
      input_size: architecture.input_size,
      channel_order: architecture.channel_order,
    })
  }
}

impl Predictor for RknnPredictor {
  type Error = RknnPredictorError;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error> {
    let (width, height) = self.input_size;
    let resized = frame::resize_image(image, width, height);
    let pixels: Vec<u8> = resized
      .pixels()
      .flat_map(|p| (0..3).map(|plane| p[self.channel_order.source_channel(plane)]))
      .collect();

    self
      .context
      .set_input(0, &pixels, TensorFormat::NHWC, TensorType::UInt8)?;
    self.context.run()?;
    let output = self.context.get_outputs()?;
    let values = output.get_f32(0)?;

    let expected = (width * height) as usize;
    if values.len() != expected {
      return Err(RknnPredictorError::OutputShape {
        expected,
        actual: values.len(),
      });
    }

    let map = ConfidenceMap::from_fn(width, height, |x, y| {
      Luma([values[(y * width + x) as usize]])
    });

    Ok(frame::resize_confidence(
      &map,
      image.width(),
      image.height(),
    ))
  }
}
