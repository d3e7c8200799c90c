// 该文件是 Luwang （路网） 项目的一部分。
// src/output.rs - 掩码输出
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

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  frame::{Mask, mask_to_rgb},
  input::SourceImage,
  utils::ensure_dir,
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 源文件名末尾被替换的固定长度，如 `_sat.jpg` 中的 `sat.jpg`
pub const SOURCE_SUFFIX_LEN: usize = 7;
pub const MASK_SUFFIX: &str = "mask.png";

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像保存错误: {path}: {source}")]
  ImageError {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

/// 由源文件名得到掩码文件名：去掉末尾 7 个字符后追加 `mask.png`
pub fn mask_file_name(source_name: &str) -> String {
  let count = source_name.chars().count();
  if count < SOURCE_SUFFIX_LEN {
    warn!("源文件名过短, 无法去除后缀: {}", source_name);
  }
  let stem: String = source_name
    .chars()
    .take(count.saturating_sub(SOURCE_SUFFIX_LEN))
    .collect();
  format!("{}{}", stem, MASK_SUFFIX)
}

/// 将掩码以三通道 PNG 写入目录
#[derive(Debug, Clone)]
pub struct MaskDirectoryOutput {
  directory: PathBuf,
}

impl MaskDirectoryOutput {
  pub fn create(directory: impl Into<PathBuf>) -> Result<Self, OutputError> {
    let directory = directory.into();
    ensure_dir(&directory)?;
    Ok(MaskDirectoryOutput { directory })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn mask_path(&self, source_name: &str) -> PathBuf {
    self.directory.join(mask_file_name(source_name))
  }
}

impl Render<SourceImage, Mask> for MaskDirectoryOutput {
  type Error = OutputError;

  fn render_result(&self, frame: &SourceImage, result: &Mask) -> Result<(), Self::Error> {
    let path = self.mask_path(&frame.name);
    mask_to_rgb(result)
      .save_with_format(&path, image::ImageFormat::Png)
      .map_err(|source| OutputError::ImageError {
        path: path.clone(),
        source,
      })?;
    debug!("保存掩码到文件: {}", path.display());
    Ok(())
  }
}
