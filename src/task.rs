// 该文件是 Luwang （路网） 项目的一部分。
// src/task.rs - 逐图分割任务
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

use anyhow::Context;
use image::RgbImage;
use tracing::info;

use crate::{
  frame::Mask,
  input::{InputError, SourceImage},
  model::Predictor,
  output::Render,
  scale::{ScaleAggregator, ScaleList},
  threshold::Thresholder,
  tta::{SegmentError, TtaEngine},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 多尺度 TTA 聚合 → 二值化 → 写出掩码
#[derive(Debug, Clone, Default)]
pub struct SegmentTask {
  aggregator: ScaleAggregator,
  thresholder: Thresholder,
}

impl SegmentTask {
  pub fn new(scales: ScaleList) -> Self {
    Self::with_engine(scales, TtaEngine::default())
  }

  pub fn with_engine(scales: ScaleList, engine: TtaEngine) -> Self {
    let thresholder = Thresholder::new(scales.len());
    SegmentTask {
      aggregator: ScaleAggregator::new(scales, engine),
      thresholder,
    }
  }

  pub fn scales(&self) -> &ScaleList {
    self.aggregator.scales()
  }

  /// 单张图像的完整分割流程
  pub fn segment<M: Predictor>(&self, image: &RgbImage, model: &M) -> Result<Mask, SegmentError> {
    let confidence = self.aggregator.aggregate(image, model)?;
    Ok(self.thresholder.apply(&confidence))
  }
}

impl<I, M, O, RE> Task<I, M, O> for SegmentTask
where
  I: Iterator<Item = Result<SourceImage, InputError>>,
  M: Predictor,
  O: Render<SourceImage, Mask, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = usize;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    if self.scales().is_multi_scale() {
      info!("多尺度测试: {}", self.scales());
    }
    info!(
      "开始分割, TTA 变换 {} 种, 阈值 {}",
      self.aggregator.engine().len(),
      self.thresholder.threshold()
    );

    let mut written = 0usize;
    for frame in input {
      let frame = frame?;
      let now = std::time::Instant::now();
      let mask = self
        .segment(&frame.image, &model)
        .with_context(|| format!("图像 {} 分割失败", frame.name))?;
      output
        .render_result(&frame, &mask)
        .with_context(|| format!("图像 {} 掩码写入失败", frame.name))?;
      written += 1;
      info!("({}) {} 完成，耗时: {:.2?}", written, frame.name, now.elapsed());
    }

    info!("任务完成，共写出 {} 个掩码", written);
    Ok(written)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::MASK_ON;
  use crate::tta::tests::Constant;
  use image::Rgb;
  use std::cell::RefCell;

  #[derive(Default)]
  struct Collect(RefCell<Vec<(String, Mask)>>);

  impl Render<SourceImage, Mask> for &Collect {
    type Error = std::io::Error;

    fn render_result(&self, frame: &SourceImage, result: &Mask) -> Result<(), Self::Error> {
      self.0.borrow_mut().push((frame.name.clone(), result.clone()));
      Ok(())
    }
  }

  fn source(name: &str) -> Result<SourceImage, InputError> {
    Ok(SourceImage {
      name: name.to_string(),
      image: RgbImage::from_pixel(5, 3, Rgb([9, 9, 9])),
    })
  }

  #[test]
  fn constant_five_with_identity_only_is_all_foreground() {
    let task = SegmentTask::with_engine(ScaleList::default(), TtaEngine::identity_only());
    let sink = Collect::default();
    let written = task
      .run_task(vec![source("1_sat.jpg")].into_iter(), Constant(5.0), &sink)
      .unwrap();

    assert_eq!(written, 1);
    let collected = sink.0.borrow();
    let (name, mask) = &collected[0];
    assert_eq!(name, "1_sat.jpg");
    assert_eq!(mask.dimensions(), (5, 3));
    assert!(mask.iter().all(|v| *v == MASK_ON));
  }

  #[test]
  fn low_confidence_is_background() {
    let task = SegmentTask::new(ScaleList::default());
    let mask = task
      .segment(&RgbImage::new(4, 4), &Constant(0.5))
      .unwrap();
    assert!(mask.iter().all(|v| *v == 0));
  }

  #[test]
  fn input_error_stops_the_task() {
    let task = SegmentTask::new(ScaleList::default());
    let sink = Collect::default();
    let bad = Err(InputError::IoError {
      path: "missing.jpg".into(),
      source: std::io::Error::other("gone"),
    });
    let images = vec![source("a_sat.jpg"), bad, source("c_sat.jpg")];
    assert!(task.run_task(images.into_iter(), Constant(1.0), &sink).is_err());
    assert_eq!(sink.0.borrow().len(), 1);
  }
}
