// 该文件是 Beifeng （北风） 项目的一部分。
// src/frame.rs - 张量帧定义
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

use crate::tensor::{TensorError, TensorShape, TensorView};

/// 一帧推理输出：检测头张量及其形状
#[derive(Debug, Clone)]
pub struct TensorFrame {
  index: usize,
  shape: TensorShape,
  data: Box<[f32]>,
}

impl TensorFrame {
  pub fn new(index: usize, shape: TensorShape, data: Vec<f32>) -> Result<Self, TensorError> {
    // 构造时校验，之后的视图访问无需再处理错误
    TensorView::new(&data, shape)?;
    Ok(Self {
      index,
      shape,
      data: data.into_boxed_slice(),
    })
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn shape(&self) -> TensorShape {
    self.shape
  }

  pub fn view(&self) -> TensorView<'_> {
    TensorView::new_unchecked(&self.data, self.shape)
  }
}

impl AsRef<[f32]> for TensorFrame {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}
