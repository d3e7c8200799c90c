// 该文件是 Luwang （路网） 项目的一部分。
// src/checkpoint.rs - 检查点遍历
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

use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  input::ImageDirectoryInput,
  model::Predictor,
  output::MaskDirectoryOutput,
  task::{SegmentTask, Task},
};

/// 检查点目录下存放结果的子目录
pub const RESULTS_DIR: &str = "Results";

#[derive(Error, Debug)]
pub enum CheckpointError {
  #[error("无法读取检查点目录 {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 文件名全为十进制数字且能被 5 整除
///
/// 只看末位数字，任意长度的名字都不会溢出。
pub fn is_sweep_checkpoint(name: &str) -> bool {
  !name.is_empty()
    && name.bytes().all(|b| b.is_ascii_digit())
    && matches!(name.as_bytes()[name.len() - 1], b'0' | b'5')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
  pub name: String,
  pub weights: PathBuf,
  pub results: PathBuf,
}

impl Checkpoint {
  fn new(directory: &Path, name: String) -> Self {
    Checkpoint {
      weights: directory.join(&name),
      results: directory.join(RESULTS_DIR).join(&name),
      name,
    }
  }

  fn numeric_key(&self) -> (usize, &str, &str) {
    let digits = self.name.trim_start_matches('0');
    (digits.len(), digits, &self.name)
  }
}

/// 列出目录中参与遍历的检查点，按数值升序
pub fn list_checkpoints(directory: &Path) -> Result<Vec<Checkpoint>, CheckpointError> {
  let read_err = |source| CheckpointError::ReadDir {
    path: directory.to_path_buf(),
    source,
  };

  let mut checkpoints = Vec::new();
  for entry in std::fs::read_dir(directory).map_err(read_err)? {
    let entry = entry.map_err(read_err)?;
    if !entry.file_type().map_err(read_err)?.is_file() {
      continue;
    }
    let Some(name) = entry.file_name().to_str().map(str::to_string) else {
      continue;
    };
    if is_sweep_checkpoint(&name) {
      checkpoints.push(Checkpoint::new(directory, name));
    }
  }
  checkpoints.sort_by(|a, b| a.numeric_key().cmp(&b.numeric_key()));

  Ok(checkpoints)
}

/// 单个检查点的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
  pub checkpoint: Checkpoint,
  pub masks_written: usize,
}

/// 对检查点目录中的每个检查点执行完整的分割流程
pub struct CheckpointSweep {
  checkpoints_dir: PathBuf,
  source_dir: PathBuf,
  task: SegmentTask,
}

impl CheckpointSweep {
  pub fn new(
    checkpoints_dir: impl Into<PathBuf>,
    source_dir: impl Into<PathBuf>,
    task: SegmentTask,
  ) -> Self {
    CheckpointSweep {
      checkpoints_dir: checkpoints_dir.into(),
      source_dir: source_dir.into(),
      task,
    }
  }

  /// 依次加载每个检查点并处理全部源图像，遇到任何错误立即终止
  pub fn run<L, M, E>(&self, mut loader: L) -> anyhow::Result<Vec<SweepEntry>>
  where
    L: FnMut(&Checkpoint) -> Result<M, E>,
    M: Predictor,
    E: std::error::Error + Send + Sync + 'static,
  {
    let checkpoints = list_checkpoints(&self.checkpoints_dir)?;
    if checkpoints.is_empty() {
      warn!(
        "检查点目录中没有可用的检查点: {}",
        self.checkpoints_dir.display()
      );
    }
    info!("共 {} 个检查点待处理", checkpoints.len());

    let mut report = Vec::with_capacity(checkpoints.len());
    for checkpoint in checkpoints {
      info!("处理检查点 {}", checkpoint.name);
      let output = MaskDirectoryOutput::create(&checkpoint.results)?;
      let model = loader(&checkpoint)
        .with_context(|| format!("检查点 {} 加载失败", checkpoint.name))?;
      let input = ImageDirectoryInput::open(&self.source_dir)?;

      let masks_written = self
        .task
        .clone()
        .run_task(input, model, output)
        .with_context(|| format!("检查点 {} 处理失败", checkpoint.name))?;

      report.push(SweepEntry {
        checkpoint,
        masks_written,
      });
    }

    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"weights").unwrap();
  }

  #[test]
  fn name_filter() {
    assert!(is_sweep_checkpoint("5"));
    assert!(is_sweep_checkpoint("10"));
    assert!(is_sweep_checkpoint("0"));
    assert!(is_sweep_checkpoint("123456789012345678901234567890"));
    assert!(!is_sweep_checkpoint("7"));
    assert!(!is_sweep_checkpoint("abc"));
    assert!(!is_sweep_checkpoint(""));
    assert!(!is_sweep_checkpoint("15.th"));
    assert!(!is_sweep_checkpoint("-5"));
    assert!(!is_sweep_checkpoint("٥"));
  }

  #[test]
  fn lists_only_numeric_multiples_of_five() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["5", "7", "10", "abc"] {
      touch(dir.path(), name);
    }
    let names: Vec<String> = list_checkpoints(dir.path())
      .unwrap()
      .into_iter()
      .map(|c| c.name)
      .collect();
    assert_eq!(names, vec!["5", "10"]);
  }

  #[test]
  fn directories_are_not_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "20");
    std::fs::create_dir(dir.path().join("25")).unwrap();
    std::fs::create_dir(dir.path().join(RESULTS_DIR)).unwrap();
    let checkpoints = list_checkpoints(dir.path()).unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].weights, dir.path().join("20"));
    assert_eq!(checkpoints[0].results, dir.path().join("Results").join("20"));
  }

  #[test]
  fn ordered_numerically() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["100", "15", "005", "20"] {
      touch(dir.path(), name);
    }
    let names: Vec<String> = list_checkpoints(dir.path())
      .unwrap()
      .into_iter()
      .map(|c| c.name)
      .collect();
    assert_eq!(names, vec!["005", "15", "20", "100"]);
  }
}
