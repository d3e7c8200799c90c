// 该文件是 Luwang （路网） 项目的一部分。
// src/model/onnx.rs - ONNX 分割模型（tract 推理）
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

use std::cell::RefCell;
use std::collections::{HashMap, hash_map::Entry};
use std::path::Path;

use image::{Luma, RgbImage};
use thiserror::Error;
use tracing::debug;
use tract_onnx::prelude::*;

use crate::{
  frame::ConfidenceMap,
  model::{Architecture, ChannelOrder, Normalization, Predictor, UnsupportedSize},
};

#[derive(Error, Debug)]
pub enum OnnxPredictorError {
  #[error(transparent)]
  Tract(#[from] TractError),
  #[error(transparent)]
  UnsupportedSize(#[from] UnsupportedSize),
  #[error("模型输出尺寸错误: 期望 {expected} 个元素, 实际形状 {shape:?}")]
  OutputShape { expected: usize, shape: Vec<usize> },
}

type Plan = TypedRunnableModel<TypedModel>;

/// 以 NCHW 浮点张量为输入、单通道置信图为输出的全卷积 ONNX 模型
///
/// 输入按图像自身尺寸推理，多尺度测试时网络看到的就是缩放后的分辨率。
/// 每种输入尺寸只优化一次推理图并缓存。
pub struct OnnxPredictor {
  model: InferenceModel,
  plans: RefCell<HashMap<(u32, u32), Plan>>,
  architecture: Architecture,
}

impl OnnxPredictor {
  pub fn load(architecture: &Architecture, path: &Path) -> Result<Self, OnnxPredictorError> {
    let model = tract_onnx::onnx().model_for_path(path)?;

    Ok(OnnxPredictor {
      model,
      plans: RefCell::new(HashMap::new()),
      architecture: architecture.clone(),
    })
  }

  fn build_plan(&self, width: u32, height: u32) -> Result<Plan, OnnxPredictorError> {
    debug!("创建 tract 推理图, 输入 1x3x{}x{}", height, width);
    let plan = self
      .model
      .clone()
      .with_input_fact(
        0,
        f32::fact([1, 3, height as usize, width as usize]).into(),
      )?
      .into_optimized()?
      .into_runnable()?;
    Ok(plan)
  }
}

/// RGB 图像转为 1x3xHxW 张量，平面顺序由 `order` 决定
pub fn image_to_tensor(
  image: &RgbImage,
  normalization: Normalization,
  order: ChannelOrder,
) -> Result<Tensor, OnnxPredictorError> {
  let (w, h) = (image.width() as usize, image.height() as usize);
  let mut data = vec![0f32; 3 * w * h];
  for (x, y, pixel) in image.enumerate_pixels() {
    let (x, y) = (x as usize, y as usize);
    for plane in 0..3 {
      data[plane * w * h + y * w + x] = normalization.apply(pixel[order.source_channel(plane)]);
    }
  }
  let array = tract_ndarray::Array4::from_shape_vec((1, 3, h, w), data)
    .map_err(|e| OnnxPredictorError::Tract(e.into()))?;
  Ok(array.into())
}

impl Predictor for OnnxPredictor {
  type Error = OnnxPredictorError;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error> {
    let (width, height) = image.dimensions();
    self.architecture.check_input_size(width, height)?;

    let input = image_to_tensor(
      image,
      self.architecture.normalization,
      self.architecture.channel_order,
    )?;

    let mut plans = self.plans.borrow_mut();
    let plan = match plans.entry((width, height)) {
      Entry::Occupied(entry) => entry.into_mut(),
      Entry::Vacant(entry) => entry.insert(self.build_plan(width, height)?),
    };
    let outputs = plan.run(tvec!(input.into()))?;
    let view = outputs[0].to_array_view::<f32>()?;

    let expected = (width * height) as usize;
    if view.len() != expected {
      return Err(OnnxPredictorError::OutputShape {
        expected,
        shape: view.shape().to_vec(),
      });
    }

    // 输出形状为 [1, 1, H, W] 或 [1, H, W]，按行优先展开即可
    let values: Vec<f32> = view.iter().copied().collect();
    Ok(ConfidenceMap::from_fn(width, height, |x, y| {
      Luma([values[(y * width + x) as usize]])
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn bgr_tensor_puts_blue_in_first_plane() {
    let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
    let tensor = image_to_tensor(&image, Normalization::None, ChannelOrder::Bgr).unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
    let data = tensor.as_slice::<f32>().unwrap();
    assert_eq!(data, &[30.0, 30.0, 20.0, 20.0, 10.0, 10.0]);
  }

  #[test]
  fn tensor_follows_image_size() {
    let image = RgbImage::new(64, 32);
    let tensor = image_to_tensor(&image, Normalization::LINKNET, ChannelOrder::Rgb).unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 32, 64]);
    let data = tensor.as_slice::<f32>().unwrap();
    assert!(data.iter().all(|v| (*v + 1.6).abs() < 1e-6));
  }
}
