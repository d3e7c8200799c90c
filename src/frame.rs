// 该文件是 Luwang （路网） 项目的一部分。
// src/frame.rs - 图像、置信图与掩码定义
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

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

/// 单通道浮点置信图，逐像素累加模型输出
pub type ConfidenceMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 二值掩码，取值仅为 0 或 255
pub type Mask = GrayImage;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// 全零置信图
pub fn zeros(width: u32, height: u32) -> ConfidenceMap {
  ConfidenceMap::new(width, height)
}

/// 将 `other` 逐像素加到 `acc` 上，两者尺寸必须一致
pub fn accumulate(acc: &mut ConfidenceMap, other: &ConfidenceMap) {
  debug_assert_eq!(acc.dimensions(), other.dimensions());
  for (a, b) in acc.iter_mut().zip(other.iter()) {
    *a += *b;
  }
}

/// 双线性缩放 RGB 图像
///
/// 与 [`resize_confidence`] 使用同一套采样坐标（逐点双线性，不做面积加权），
/// 结果四舍五入回 8 位。
pub fn resize_image(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  let (src_w, src_h) = image.dimensions();
  if (src_w, src_h) == (width, height) {
    return image.clone();
  }
  if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
    return RgbImage::new(width, height);
  }

  let xs = sample_coords(width, src_w);
  let ys = sample_coords(height, src_h);

  RgbImage::from_fn(width, height, |x, y| {
    let (x0, x1, fx) = xs[x as usize];
    let (y0, y1, fy) = ys[y as usize];
    let (p00, p10) = (image.get_pixel(x0, y0), image.get_pixel(x1, y0));
    let (p01, p11) = (image.get_pixel(x0, y1), image.get_pixel(x1, y1));
    Rgb(std::array::from_fn(|c| {
      let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
      let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
      (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }))
  })
}

/// 双线性缩放置信图
///
/// `image::imageops::resize` 会把浮点像素截断到 [0, 1]，而累加后的置信图
/// 远大于 1，因此这里单独实现，采样方式与像素中心对齐（半像素偏移）。
pub fn resize_confidence(map: &ConfidenceMap, width: u32, height: u32) -> ConfidenceMap {
  let (src_w, src_h) = map.dimensions();
  if (src_w, src_h) == (width, height) {
    return map.clone();
  }
  if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
    return zeros(width, height);
  }

  let xs = sample_coords(width, src_w);
  let ys = sample_coords(height, src_h);

  ConfidenceMap::from_fn(width, height, |x, y| {
    let (x0, x1, fx) = xs[x as usize];
    let (y0, y1, fy) = ys[y as usize];
    let top = map.get_pixel(x0, y0)[0] * (1.0 - fx) + map.get_pixel(x1, y0)[0] * fx;
    let bottom = map.get_pixel(x0, y1)[0] * (1.0 - fx) + map.get_pixel(x1, y1)[0] * fx;
    Luma([top * (1.0 - fy) + bottom * fy])
  })
}

fn sample_coords(dst: u32, src: u32) -> Vec<(u32, u32, f32)> {
  let ratio = src as f32 / dst as f32;
  let last = (src - 1) as f32;
  (0..dst)
    .map(|d| {
      let s = ((d as f32 + 0.5) * ratio - 0.5).clamp(0.0, last);
      let i0 = s.floor() as u32;
      let i1 = (i0 + 1).min(src - 1);
      (i0, i1, s - i0 as f32)
    })
    .collect()
}

/// 单通道掩码扩展为三通道图像，便于与 RGB 工具链兼容
pub fn mask_to_rgb(mask: &Mask) -> RgbImage {
  RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
    let v = mask.get_pixel(x, y)[0];
    Rgb([v, v, v])
  })
}

/// 掩码转回置信图
pub fn mask_to_confidence(mask: &Mask) -> ConfidenceMap {
  ConfidenceMap::from_fn(mask.width(), mask.height(), |x, y| {
    Luma([mask.get_pixel(x, y)[0] as f32])
  })
}
