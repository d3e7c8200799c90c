// 该文件是 Luwang （路网） 项目的一部分。
// src/threshold.rs - 置信图二值化
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

use image::Luma;

use crate::frame::{ConfidenceMap, MASK_OFF, MASK_ON, Mask};

/// 每个尺度对应的阈值
///
/// 按 8 种 TTA 变换、单次输出约在 [0, 1] 标定，取 8 次累加的中点。
/// 阈值只随尺度数量变化，不随变换数量变化。
pub const THRESHOLD_PER_SCALE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholder {
  threshold: f32,
}

impl Default for Thresholder {
  fn default() -> Self {
    Thresholder::new(1)
  }
}

impl Thresholder {
  pub fn new(scale_count: usize) -> Self {
    Thresholder {
      threshold: THRESHOLD_PER_SCALE * scale_count as f32,
    }
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 严格大于阈值的像素为 255，其余为 0
  pub fn apply(&self, map: &ConfidenceMap) -> Mask {
    Mask::from_fn(map.width(), map.height(), |x, y| {
      if map.get_pixel(x, y)[0] > self.threshold {
        Luma([MASK_ON])
      } else {
        Luma([MASK_OFF])
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::mask_to_confidence, scale::MAX_SCALES};

  #[test]
  fn boundary_value_maps_to_zero() {
    for scales in 1..4 {
      let t = Thresholder::new(scales);
      let at = ConfidenceMap::from_pixel(2, 2, Luma([4.0 * scales as f32]));
      assert!(t.apply(&at).iter().all(|v| *v == MASK_OFF));

      let above = ConfidenceMap::from_pixel(2, 2, Luma([4.0 * scales as f32 + 1e-3]));
      assert!(t.apply(&above).iter().all(|v| *v == MASK_ON));
    }
  }

  #[test]
  fn output_is_binary() {
    let map = ConfidenceMap::from_fn(10, 1, |x, _| Luma([x as f32]));
    let mask = Thresholder::new(1).apply(&map);
    let values: Vec<u8> = mask.iter().copied().collect();
    assert_eq!(values, vec![0, 0, 0, 0, 0, 255, 255, 255, 255, 255]);
  }

  #[test]
  fn thresholding_is_idempotent() {
    let map = ConfidenceMap::from_fn(6, 3, |x, y| Luma([(x * y) as f32 * 30.0]));
    for scales in [1, 2, 5, MAX_SCALES] {
      let t = Thresholder::new(scales);
      let once = t.apply(&map);
      assert!(once.iter().any(|v| *v == MASK_ON), "S = {}", scales);
      let twice = t.apply(&mask_to_confidence(&once));
      assert_eq!(once, twice, "S = {}", scales);
    }
    assert!(Thresholder::new(MAX_SCALES).threshold() < MASK_ON as f32);
  }

  #[test]
  fn threshold_ignores_augmentation_count() {
    assert_eq!(Thresholder::new(1).threshold(), 4.0);
    assert_eq!(Thresholder::new(3).threshold(), 12.0);
  }
}
