// 该文件是 Beifeng （北风） 项目的一部分。
// src/input/tensor_file.rs - 张量文件输入
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
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  tensor::{TensorError, TensorShape},
  utils::query_value,
};

const TENSOR_FILE_EXTENSIONS: [&str; 2] = ["bin", "f32"];

#[derive(Error, Debug)]
pub enum TensorFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("missing tensor shape, expected `?shape=1x84x8400`")]
  MissingShape,
  #[error("no tensor file found in {0}")]
  NoTensorFile(String),
  #[error("I/O error on {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("{path}: file size {bytes} is not {expected} bytes")]
  SizeMismatch {
    path: PathBuf,
    bytes: usize,
    expected: usize,
  },
  #[error("tensor error: {0}")]
  TensorError(#[from] TensorError),
}

/// 从磁盘读取推理输出张量（小端 f32 原始数据），每个文件一帧
///
/// 路径为目录时按文件名排序读取其中的 `*.bin` / `*.f32` 文件。
#[derive(Debug)]
pub struct TensorFileInput {
  files: Vec<PathBuf>,
  shape: TensorShape,
}

impl FromUrlWithScheme for TensorFileInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorFileInput {
  type Error = TensorFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(TensorFileInputError::SchemaMismatch);
    }

    let shape: TensorShape = query_value(url, "shape")
      .ok_or(TensorFileInputError::MissingShape)?
      .parse()?;

    Self::open(url.path(), shape)
  }
}

impl TensorFileInput {
  pub fn open(path: impl AsRef<Path>, shape: TensorShape) -> Result<Self, TensorFileInputError> {
    let path = path.as_ref();
    byte_len(shape)?;
    let io_error = |source| TensorFileInputError::IoError {
      path: path.to_path_buf(),
      source,
    };

    let files = if path.is_dir() {
      let mut files = Vec::new();
      for entry in std::fs::read_dir(path).map_err(io_error)? {
        let file = entry.map_err(io_error)?.path();
        let matched = file
          .extension()
          .and_then(|e| e.to_str())
          .is_some_and(|e| TENSOR_FILE_EXTENSIONS.contains(&e));
        if matched && file.is_file() {
          files.push(file);
        }
      }
      files.sort();
      files
    } else {
      vec![path.to_path_buf()]
    };

    if files.is_empty() {
      return Err(TensorFileInputError::NoTensorFile(path.display().to_string()));
    }

    info!("张量输入: {} 个文件, 形状 {}", files.len(), shape);
    Ok(Self { files, shape })
  }

  pub fn shape(&self) -> TensorShape {
    self.shape
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn into_frames(self) -> TensorFileFrames {
    TensorFileFrames {
      files: self.files.into_iter().enumerate(),
      shape: self.shape,
    }
  }
}

pub struct TensorFileFrames {
  files: std::iter::Enumerate<std::vec::IntoIter<PathBuf>>,
  shape: TensorShape,
}

impl Iterator for TensorFileFrames {
  type Item = Result<TensorFrame, TensorFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let (index, path) = self.files.next()?;
    Some(read_tensor_file(index, &path, self.shape))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.files.size_hint()
  }
}

/// 一帧张量文件应有的字节数
fn byte_len(shape: TensorShape) -> Result<usize, TensorError> {
  shape
    .num_elements()
    .and_then(|n| n.checked_mul(size_of::<f32>()))
    .ok_or_else(|| TensorError::InvalidShape(format!("{} 字节数溢出", shape)))
}

fn read_tensor_file(
  index: usize,
  path: &Path,
  shape: TensorShape,
) -> Result<TensorFrame, TensorFileInputError> {
  let bytes = std::fs::read(path).map_err(|source| TensorFileInputError::IoError {
    path: path.to_path_buf(),
    source,
  })?;

  let expected = byte_len(shape)?;
  if bytes.len() != expected {
    return Err(TensorFileInputError::SizeMismatch {
      path: path.to_path_buf(),
      bytes: bytes.len(),
      expected,
    });
  }

  let data: Vec<f32> = bytes
    .chunks_exact(size_of::<f32>())
    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    .collect();
  debug!("读取张量文件 {}: {} 个元素", path.display(), data.len());

  Ok(TensorFrame::new(index, shape, data)?)
}
