// 该文件是 Luwang （路网） 项目的一部分。
// src/tta.rs - 测试时增强（TTA）
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

use image::{GenericImageView, ImageBuffer, Pixel, RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{self, ConfidenceMap},
  model::Predictor,
  scale::ScaleError,
};

#[derive(Error, Debug)]
pub enum SegmentError {
  #[error("模型推理错误: {0}")]
  Predictor(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("置信图尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error(transparent)]
  Scale(#[from] ScaleError),
}

impl SegmentError {
  pub fn predictor<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    SegmentError::Predictor(Box::new(err))
  }
}

/// 二面体群中的一个几何变换
///
/// 正向依次为：顺时针旋转 90°、上下翻转、左右翻转；逆变换顺序相反。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Augmentation {
  pub rotate: bool,
  pub flip_vertical: bool,
  pub flip_horizontal: bool,
}

impl Augmentation {
  pub const IDENTITY: Augmentation = Augmentation::new(false, false, false);

  /// 旋转 × 上下翻转 × 左右翻转，共 8 种
  pub const DIHEDRAL: [Augmentation; 8] = [
    Augmentation::new(false, false, false),
    Augmentation::new(true, false, false),
    Augmentation::new(false, true, false),
    Augmentation::new(true, true, false),
    Augmentation::new(false, false, true),
    Augmentation::new(true, false, true),
    Augmentation::new(false, true, true),
    Augmentation::new(true, true, true),
  ];

  pub const IDENTITY_ONLY: [Augmentation; 1] = [Augmentation::IDENTITY];

  pub const fn new(rotate: bool, flip_vertical: bool, flip_horizontal: bool) -> Self {
    Augmentation {
      rotate,
      flip_vertical,
      flip_horizontal,
    }
  }

  pub fn apply<I, P>(&self, image: &I) -> ImageBuffer<P, Vec<P::Subpixel>>
  where
    I: GenericImageView<Pixel = P>,
    P: Pixel + 'static,
  {
    let mut out = if self.rotate {
      imageops::rotate90(image)
    } else {
      copy(image)
    };
    if self.flip_vertical {
      imageops::flip_vertical_in_place(&mut out);
    }
    if self.flip_horizontal {
      imageops::flip_horizontal_in_place(&mut out);
    }
    out
  }

  pub fn invert<I, P>(&self, image: &I) -> ImageBuffer<P, Vec<P::Subpixel>>
  where
    I: GenericImageView<Pixel = P>,
    P: Pixel + 'static,
  {
    let mut out = copy(image);
    if self.flip_horizontal {
      imageops::flip_horizontal_in_place(&mut out);
    }
    if self.flip_vertical {
      imageops::flip_vertical_in_place(&mut out);
    }
    if self.rotate {
      out = imageops::rotate270(&out);
    }
    out
  }
}

fn copy<I, P>(image: &I) -> ImageBuffer<P, Vec<P::Subpixel>>
where
  I: GenericImageView<Pixel = P>,
  P: Pixel + 'static,
{
  ImageBuffer::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y))
}

/// TTA 引擎：对固定的变换集合逐一推理，并把逆变换后的置信图求和
#[derive(Debug, Clone, Copy)]
pub struct TtaEngine {
  augmentations: &'static [Augmentation],
}

impl Default for TtaEngine {
  fn default() -> Self {
    TtaEngine {
      augmentations: &Augmentation::DIHEDRAL,
    }
  }
}

impl TtaEngine {
  pub fn identity_only() -> Self {
    TtaEngine {
      augmentations: &Augmentation::IDENTITY_ONLY,
    }
  }

  pub fn augmentations(&self) -> &'static [Augmentation] {
    self.augmentations
  }

  pub fn len(&self) -> usize {
    self.augmentations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.augmentations.is_empty()
  }

  pub fn aggregate<M: Predictor>(
    &self,
    image: &RgbImage,
    model: &M,
  ) -> Result<ConfidenceMap, SegmentError> {
    let (width, height) = image.dimensions();
    let mut acc = frame::zeros(width, height);

    for aug in self.augmentations {
      let input = aug.apply(image);
      let output = model.predict(&input).map_err(SegmentError::predictor)?;
      if output.dimensions() != input.dimensions() {
        return Err(SegmentError::ShapeMismatch {
          expected: input.dimensions(),
          actual: output.dimensions(),
        });
      }
      debug!("TTA 变换 {:?} 完成", aug);
      frame::accumulate(&mut acc, &aug.invert(&output));
    }

    Ok(acc)
  }
}
