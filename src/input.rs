// 该文件是 Luwang （路网） 项目的一部分。
// src/input.rs - 源图像目录输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("图像加载错误: {path}: {source}")]
  ImageLoadError {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

/// 待分割的源图像
#[derive(Debug, Clone)]
pub struct SourceImage {
  /// 源目录中的文件名
  pub name: String,
  pub image: RgbImage,
}

impl SourceImage {
  pub fn open(path: &Path) -> Result<Self, InputError> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let image = ImageReader::open(path)
      .and_then(|reader| reader.with_guessed_format())
      .map_err(|source| InputError::IoError {
        path: path.to_path_buf(),
        source,
      })?
      .decode()
      .map_err(|source| InputError::ImageLoadError {
        path: path.to_path_buf(),
        source,
      })?;

    Ok(SourceImage {
      name,
      image: image.into_rgb8(),
    })
  }
}

/// 按文件名排序遍历目录中的全部普通文件，逐个解码为 RGB 图像
pub struct ImageDirectoryInput {
  files: std::vec::IntoIter<PathBuf>,
}

impl ImageDirectoryInput {
  pub fn open(directory: &Path) -> Result<Self, InputError> {
    let io_err = |source| InputError::IoError {
      path: directory.to_path_buf(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_err)? {
      let entry = entry.map_err(io_err)?;
      if entry.file_type().map_err(io_err)?.is_file() {
        files.push(entry.path());
      }
    }
    files.sort();
    debug!("源目录 {} 中共 {} 个文件", directory.display(), files.len());

    Ok(ImageDirectoryInput {
      files: files.into_iter(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl Iterator for ImageDirectoryInput {
  type Item = Result<SourceImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.files.next().map(|path| SourceImage::open(&path))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.files.size_hint()
  }
}
