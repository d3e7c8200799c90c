// 该文件是 Luwang （路网） 项目的一部分。
// src/scale.rs - 多尺度测试
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

use std::fmt;

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{self, ConfidenceMap},
  model::Predictor,
  tta::{SegmentError, TtaEngine},
};

/// 阈值为 4.0 × S，S 超过 63 时 255 不再大于阈值，掩码无法再次阈值化
pub const MAX_SCALES: usize = 63;

/// 缩放后单边的最大像素数
pub const MAX_SCALED_SIDE: u32 = 16384;

#[derive(Error, Debug, PartialEq)]
pub enum ScaleError {
  #[error("缩放列表为空")]
  Empty,
  #[error("无效的缩放比例: {0}")]
  Invalid(f64),
  #[error("缩放比例过多: {0} 个，最多 {MAX_SCALES} 个")]
  TooMany(usize),
  #[error("缩放比例 {scale} 作用于 {width}x{height} 后超过 {MAX_SCALED_SIDE} 像素")]
  TooLarge { scale: f64, width: u32, height: u32 },
}

/// 非空且全为正有限数的缩放列表
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleList(Vec<f64>);

impl Default for ScaleList {
  fn default() -> Self {
    ScaleList(vec![1.0])
  }
}

impl TryFrom<Vec<f64>> for ScaleList {
  type Error = ScaleError;

  fn try_from(scales: Vec<f64>) -> Result<Self, Self::Error> {
    if scales.is_empty() {
      return Err(ScaleError::Empty);
    }
    if scales.len() > MAX_SCALES {
      return Err(ScaleError::TooMany(scales.len()));
    }
    if let Some(&bad) = scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
      return Err(ScaleError::Invalid(bad));
    }
    Ok(ScaleList(scales))
  }
}

impl fmt::Display for ScaleList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self.0)
  }
}

impl ScaleList {
  pub fn as_slice(&self) -> &[f64] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn is_multi_scale(&self) -> bool {
    self.0.len() > 1
  }
}

/// 按比例缩放后的尺寸，至少为 1 像素
///
/// 在转换为整数之前检查上界，超出 [`MAX_SCALED_SIDE`] 时返回错误。
pub fn scaled_size(width: u32, height: u32, scale: f64) -> Result<(u32, u32), ScaleError> {
  let too_large = ScaleError::TooLarge {
    scale,
    width,
    height,
  };
  let scale_dim = |d: u32| {
    let side = (d as f64 * scale).round();
    (side <= MAX_SCALED_SIDE as f64).then(|| (side as u32).max(1))
  };
  match (scale_dim(width), scale_dim(height)) {
    (Some(w), Some(h)) => Ok((w, h)),
    _ => Err(too_large),
  }
}

/// 多尺度聚合：每个尺度上执行 TTA，结果缩放回原尺寸后求和
#[derive(Debug, Clone, Default)]
pub struct ScaleAggregator {
  scales: ScaleList,
  engine: TtaEngine,
}

impl ScaleAggregator {
  pub fn new(scales: ScaleList, engine: TtaEngine) -> Self {
    ScaleAggregator { scales, engine }
  }

  pub fn scales(&self) -> &ScaleList {
    &self.scales
  }

  pub fn engine(&self) -> &TtaEngine {
    &self.engine
  }

  pub fn aggregate<M: Predictor>(
    &self,
    image: &RgbImage,
    model: &M,
  ) -> Result<ConfidenceMap, SegmentError> {
    let (width, height) = image.dimensions();
    let sizes = self
      .scales
      .as_slice()
      .iter()
      .map(|&scale| scaled_size(width, height, scale).map(|size| (scale, size)))
      .collect::<Result<Vec<_>, _>>()?;
    let mut acc = frame::zeros(width, height);

    for (scale, (w, h)) in sizes {
      debug!("尺度 {}: {}x{} -> {}x{}", scale, width, height, w, h);

      let map = if (w, h) == (width, height) {
        self.engine.aggregate(image, model)?
      } else {
        let resized = frame::resize_image(image, w, h);
        let map = self.engine.aggregate(&resized, model)?;
        frame::resize_confidence(&map, width, height)
      };
      frame::accumulate(&mut acc, &map);
    }

    Ok(acc)
  }
}
