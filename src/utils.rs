// 该文件是 Luwang （路网） 项目的一部分。
// src/utils.rs - 文件系统工具
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

use std::io::{self, ErrorKind};
use std::path::Path;

use tracing::debug;

/// 确保目录存在
///
/// 幂等：目录已存在（包括并发创建）时直接返回成功；
/// 路径被普通文件占用或其它系统错误则返回错误。
pub fn ensure_dir(path: &Path) -> io::Result<()> {
  match std::fs::create_dir_all(path) {
    Ok(()) => {
      debug!("目录就绪: {}", path.display());
      Ok(())
    }
    Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ensure_dir_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let nested = root.path().join("Results").join("15");
    ensure_dir(&nested).unwrap();
    ensure_dir(&nested).unwrap();
    assert!(nested.is_dir());
  }

  #[test]
  fn ensure_dir_rejects_file_in_the_way() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("occupied");
    std::fs::write(&file, b"x").unwrap();
    assert!(ensure_dir(&file).is_err());
  }
}
