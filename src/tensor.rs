// 该文件是 Beifeng （北风） 项目的一部分。
// src/tensor.rs - 模型输出张量视图
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

//! 检测头输出张量。
//!
//! 模型输出的逻辑形状为 `[1, C, N]`，按通道优先排列：
//! 通道 `c`、锚点 `n` 的元素位于偏移 `c * N + n`。
//! [`TensorView`] 持有缓冲区与形状，所有访问都经过边界检查。

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
  #[error("张量形状解析失败: {0}")]
  InvalidShape(String),
  #[error("仅支持 batch = 1, 实际为 {0}")]
  UnsupportedBatch(usize),
  #[error("缓冲区长度不匹配: 期望 {expected}, 实际 {got}")]
  LengthMismatch { expected: usize, got: usize },
}

/// 检测头输出形状 `[batch, channels, anchors]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape {
  pub batch: usize,
  pub channels: usize,
  pub anchors: usize,
}

impl TensorShape {
  pub fn new(channels: usize, anchors: usize) -> Self {
    Self {
      batch: 1,
      channels,
      anchors,
    }
  }

  /// 从维度切片构造，必须正好三维
  pub fn from_dims(dims: &[usize]) -> Result<Self, TensorError> {
    match *dims {
      [batch, channels, anchors] => Ok(Self {
        batch,
        channels,
        anchors,
      }),
      _ => Err(TensorError::InvalidShape(format!("{:?}", dims))),
    }
  }

  /// 元素总数，乘积溢出 `usize` 时为 `None`
  pub fn num_elements(&self) -> Option<usize> {
    self
      .batch
      .checked_mul(self.channels)?
      .checked_mul(self.anchors)
  }

  /// 类别数，通道数不足 4 时为 `None`
  pub fn num_classes(&self) -> Option<usize> {
    self.channels.checked_sub(4)
  }
}

impl fmt::Display for TensorShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}x{}", self.batch, self.channels, self.anchors)
  }
}

impl FromStr for TensorShape {
  type Err = TensorError;

  /// 解析 `1x84x8400` 或 `1,84,8400`
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let dims = s
      .split(['x', 'X', ','])
      .map(|d| d.trim().parse::<usize>())
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| TensorError::InvalidShape(s.to_string()))?;
    Self::from_dims(&dims)
  }
}

/// 带形状信息的只读张量视图
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
  data: &'a [f32],
  shape: TensorShape,
}

impl<'a> TensorView<'a> {
  pub fn new(data: &'a [f32], shape: TensorShape) -> Result<Self, TensorError> {
    if shape.batch != 1 {
      return Err(TensorError::UnsupportedBatch(shape.batch));
    }
    let expected = shape
      .num_elements()
      .ok_or_else(|| TensorError::InvalidShape(format!("{} 元素个数溢出", shape)))?;
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        expected,
        got: data.len(),
      });
    }
    Ok(Self { data, shape })
  }

  /// 调用方已保证 `data.len() == shape.num_elements()` 且 batch 为 1
  pub(crate) fn new_unchecked(data: &'a [f32], shape: TensorShape) -> Self {
    debug_assert_eq!(Some(data.len()), shape.num_elements());
    Self { data, shape }
  }

  pub fn shape(&self) -> TensorShape {
    self.shape
  }

  pub fn as_slice(&self) -> &'a [f32] {
    self.data
  }

  /// 通道 `channel`、锚点 `anchor` 处的值
  pub fn get(&self, channel: usize, anchor: usize) -> Option<f32> {
    if channel >= self.shape.channels || anchor >= self.shape.anchors {
      return None;
    }
    self.data.get(channel * self.shape.anchors + anchor).copied()
  }

  /// 某一通道在所有锚点上的取值
  pub fn channel(&self, channel: usize) -> Option<&'a [f32]> {
    if channel >= self.shape.channels {
      return None;
    }
    let start = channel * self.shape.anchors;
    self.data.get(start..start + self.shape.anchors)
  }

  /// 转置为锚点优先排列，逐锚点访问时内存连续
  pub fn to_anchor_major(&self) -> AnchorMajor {
    let data = transpose_unchecked(self.data, self.shape.channels, self.shape.anchors);
    AnchorMajor {
      data,
      channels: self.shape.channels,
      anchors: self.shape.anchors,
    }
  }
}

/// 锚点优先排列的张量，第 `n` 行是锚点 `n` 的全部 `C` 个属性
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMajor {
  data: Vec<f32>,
  channels: usize,
  anchors: usize,
}

impl AnchorMajor {
  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn anchors(&self) -> usize {
    self.anchors
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn row(&self, anchor: usize) -> Option<&[f32]> {
    if anchor >= self.anchors {
      return None;
    }
    let start = anchor * self.channels;
    self.data.get(start..start + self.channels)
  }

  pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
    (0..self.anchors).map(move |n| {
      let start = n * self.channels;
      &self.data[start..start + self.channels]
    })
  }

  /// 还原为通道优先排列
  pub fn to_channel_major(&self) -> Vec<f32> {
    transpose_unchecked(&self.data, self.anchors, self.channels)
  }
}

/// 将 `rows x cols` 行优先矩阵转置为 `cols x rows`
pub fn transpose(data: &[f32], rows: usize, cols: usize) -> Result<Vec<f32>, TensorError> {
  let expected = rows
    .checked_mul(cols)
    .ok_or_else(|| TensorError::InvalidShape(format!("{}x{} 元素个数溢出", rows, cols)))?;
  if data.len() != expected {
    return Err(TensorError::LengthMismatch {
      expected,
      got: data.len(),
    });
  }
  Ok(transpose_unchecked(data, rows, cols))
}

fn transpose_unchecked(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
  let mut transposed = vec![0.0f32; data.len()];
  if rows == 0 || cols == 0 {
    return transposed;
  }
  for (r, row) in data.chunks_exact(cols).enumerate() {
    for (c, &value) in row.iter().enumerate() {
      transposed[c * rows + r] = value;
    }
  }
  transposed
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transpose_small_matrix() {
    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let t = transpose(&data, 2, 3).unwrap();
    assert_eq!(t, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
  }

  #[test]
  fn transpose_rejects_wrong_length() {
    let err = transpose(&[0.0; 5], 2, 3).unwrap_err();
    assert_eq!(err, TensorError::LengthMismatch { expected: 6, got: 5 });
  }

  #[test]
  fn transpose_empty_dimensions() {
    assert!(transpose(&[], 0, 7).unwrap().is_empty());
    assert!(transpose(&[], 7, 0).unwrap().is_empty());
  }

  #[test]
  fn shape_parses_separators() {
    let shape: TensorShape = "1x84x8400".parse().unwrap();
    assert_eq!(shape, TensorShape::new(84, 8400));
    let shape: TensorShape = "1,7,3".parse().unwrap();
    assert_eq!(shape.num_classes(), Some(3));
    assert!("1x84".parse::<TensorShape>().is_err());
    assert!("ax84x1".parse::<TensorShape>().is_err());
  }

  #[test]
  fn element_count_overflow() {
    assert_eq!(TensorShape::new(84, 8400).num_elements(), Some(84 * 8400));
    assert_eq!(TensorShape::new(usize::MAX, 2).num_elements(), None);
    assert!(matches!(
      transpose(&[], usize::MAX, 2),
      Err(TensorError::InvalidShape(_))
    ));
  }
}
