// 该文件是 Beifeng （北风） 项目的一部分。
// src/model.rs - 模型
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

use std::sync::Arc;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: usize,
  pub label: Arc<str>,
  pub confidence: f32,
  pub bbox: BBox, // 图像像素坐标，左上角 + 宽高
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}

impl<'a> IntoIterator for &'a DetectResult {
  type Item = &'a DetectItem;
  type IntoIter = std::slice::Iter<'a, DetectItem>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

/// 原图尺寸与模型输入尺寸之比，x/宽 与 y/高 分别缩放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
  pub sx: f32,
  pub sy: f32,
}

impl ScaleFactor {
  pub fn new(sx: f32, sy: f32) -> Self {
    Self { sx, sy }
  }

  pub fn identity() -> Self {
    Self::new(1.0, 1.0)
  }

  /// `source` 为采集帧尺寸，`input` 为模型输入尺寸，均为 (宽, 高)
  pub fn from_sizes(source: (u32, u32), input: (u32, u32)) -> Self {
    Self::new(
      source.0 as f32 / input.0 as f32,
      source.1 as f32 / input.1 as f32,
    )
  }
}

impl Default for ScaleFactor {
  fn default() -> Self {
    Self::identity()
  }
}

mod bbox;
mod decode;
mod label;
mod suppress;
mod yolov8;

pub use self::bbox::BBox;
pub use self::decode::{DecodeError, decode, decode_raw};
pub use self::label::{COCO_CLASSES, LabelError, LabelTable};
pub use self::suppress::{
  DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD, PostprocessConfig, SuppressionScope, suppress,
  suppress_with_scope,
};
pub use self::yolov8::{Yolov8Builder, Yolov8Error, Yolov8Postprocess};
