// 该文件是 Luwang （路网） 项目的一部分。
// tests/sweep.rs - 检查点遍历端到端测试
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

use image::{Luma, Rgb, RgbImage};

use luwang::{
  checkpoint::{Checkpoint, CheckpointSweep},
  frame::ConfidenceMap,
  model::Predictor,
  scale::ScaleList,
  task::SegmentTask,
  tta::TtaEngine,
};

struct Constant(f32);

impl Predictor for Constant {
  type Error = std::io::Error;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error> {
    Ok(ConfidenceMap::from_pixel(
      image.width(),
      image.height(),
      Luma([self.0]),
    ))
  }
}

/// 左半边亮、右半边暗，置信度取亮度
struct Brightness;

impl Predictor for Brightness {
  type Error = std::io::Error;

  fn predict(&self, image: &RgbImage) -> Result<ConfidenceMap, Self::Error> {
    Ok(ConfidenceMap::from_fn(image.width(), image.height(), |x, y| {
      Luma([image.get_pixel(x, y)[0] as f32 / 255.0])
    }))
  }
}

fn setup(root: &Path, checkpoints: &[&str], images: &[&str]) -> (std::path::PathBuf, std::path::PathBuf) {
  let ckpts = root.join("ckpts");
  let source = root.join("valid");
  std::fs::create_dir_all(&ckpts).unwrap();
  std::fs::create_dir_all(&source).unwrap();
  for name in checkpoints {
    std::fs::write(ckpts.join(name), b"weights").unwrap();
  }
  for name in images {
    let image = RgbImage::from_fn(8, 6, |x, _| {
      if x < 4 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
    });
    image
      .save_with_format(source.join(name), image::ImageFormat::Png)
      .unwrap();
  }
  (ckpts, source)
}

fn read_mask(path: &Path) -> RgbImage {
  image::open(path).unwrap().into_rgb8()
}

#[test]
fn sweep_processes_only_selected_checkpoints() {
  let root = tempfile::tempdir().unwrap();
  let (ckpts, source) = setup(root.path(), &["5", "7", "10", "abc"], &["1_sat.jpg", "2_sat.jpg"]);

  let task = SegmentTask::with_engine(ScaleList::default(), TtaEngine::identity_only());
  let mut loaded = Vec::new();
  let report = CheckpointSweep::new(&ckpts, &source, task)
    .run(|checkpoint: &Checkpoint| {
      loaded.push(checkpoint.name.clone());
      Ok::<_, std::io::Error>(Constant(5.0))
    })
    .unwrap();

  assert_eq!(loaded, vec!["5", "10"]);
  assert_eq!(report.len(), 2);
  assert!(report.iter().all(|entry| entry.masks_written == 2));

  for ckpt in ["5", "10"] {
    for mask in ["1_mask.png", "2_mask.png"] {
      let written = read_mask(&ckpts.join("Results").join(ckpt).join(mask));
      assert_eq!(written.dimensions(), (8, 6));
      assert!(written.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }
  }
  assert!(!ckpts.join("Results").join("7").exists());
}

#[test]
fn multi_scale_dihedral_sweep_segments_bright_half() {
  let root = tempfile::tempdir().unwrap();
  let (ckpts, source) = setup(root.path(), &["15"], &["road_sat.png"]);

  let scales = ScaleList::try_from(vec![1.0, 0.5]).unwrap();
  let report = CheckpointSweep::new(&ckpts, &source, SegmentTask::new(scales))
    .run(|_: &Checkpoint| Ok::<_, std::io::Error>(Brightness))
    .unwrap();
  assert_eq!(report[0].masks_written, 1);

  let mask = read_mask(&ckpts.join("Results/15/road_mask.png"));
  assert_eq!(mask.get_pixel(0, 0), &Rgb([255, 255, 255]));
  assert_eq!(mask.get_pixel(7, 5), &Rgb([0, 0, 0]));
}

#[test]
fn loader_failure_aborts_the_sweep() {
  let root = tempfile::tempdir().unwrap();
  let (ckpts, source) = setup(root.path(), &["5", "10"], &["1_sat.jpg"]);

  let result = CheckpointSweep::new(&ckpts, &source, SegmentTask::default()).run(
    |checkpoint: &Checkpoint| {
      if checkpoint.name == "5" {
        Err(std::io::Error::other("corrupt checkpoint"))
      } else {
        Ok(Constant(1.0))
      }
    },
  );

  assert!(result.is_err());
  assert!(!ckpts.join("Results").join("10").exists());
}

#[test]
fn unreadable_image_aborts_the_sweep() {
  let root = tempfile::tempdir().unwrap();
  let (ckpts, source) = setup(root.path(), &["5"], &["1_sat.jpg"]);
  std::fs::write(source.join("0_sat.jpg"), b"garbage").unwrap();

  let result = CheckpointSweep::new(&ckpts, &source, SegmentTask::default())
    .run(|_: &Checkpoint| Ok::<_, std::io::Error>(Constant(5.0)));

  assert!(result.is_err());
  assert!(!ckpts.join("Results/5/1_mask.png").exists());
}

#[test]
fn empty_checkpoint_directory_is_not_an_error() {
  let root = tempfile::tempdir().unwrap();
  let (ckpts, source) = setup(root.path(), &["3", "notes"], &["1_sat.jpg"]);

  let report = CheckpointSweep::new(&ckpts, &source, SegmentTask::default())
    .run(|_: &Checkpoint| Ok::<_, std::io::Error>(Constant(5.0)))
    .unwrap();
  assert!(report.is_empty());
}
