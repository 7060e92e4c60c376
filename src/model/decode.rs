// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/decode.rs - 检测头张量解码
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

use thiserror::Error;
use tracing::{debug, error};

use crate::{
  model::{BBox, DetectItem, DetectResult, LabelTable, ScaleFactor},
  tensor::{TensorError, TensorShape, TensorView},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("张量错误: {0}")]
  Tensor(#[from] TensorError),
  #[error("形状不匹配: 通道数 {channels} 需等于 4 + 标签数 {labels}")]
  ShapeMismatch { channels: usize, labels: usize },
}

/// 解码原始缓冲区，先按 `shape` 建立视图再调用 [`decode`]
pub fn decode_raw(
  data: &[f32],
  shape: TensorShape,
  scale: ScaleFactor,
  labels: &LabelTable,
) -> Result<DetectResult, DecodeError> {
  let view = TensorView::new(data, shape)?;
  decode(view, scale, labels)
}

/// 将 `[1, 4 + K, N]` 的检测头输出解码为 N 个检测结果
///
/// 每个锚点的前 4 个值为模型输入坐标系下的 `(cx, cy, w, h)`，其余为各类别得分。
/// 取得分最高的类别（并列时取编号最小者）作为该锚点的类别与置信度，
/// 再按 `scale` 把边界框换算到原图坐标。结果保持锚点顺序，不做任何过滤。
pub fn decode(
  view: TensorView<'_>,
  scale: ScaleFactor,
  labels: &LabelTable,
) -> Result<DetectResult, DecodeError> {
  let shape = view.shape();
  let mismatch = || DecodeError::ShapeMismatch {
    channels: shape.channels,
    labels: labels.len(),
  };
  if shape.num_classes() != Some(labels.len()) {
    error!(
      "形状不匹配: 张量 {}, 标签数 {}",
      shape,
      labels.len()
    );
    return Err(mismatch());
  }

  let anchor_major = view.to_anchor_major();
  debug!("张量已转置为锚点优先: {} x {}", shape.anchors, shape.channels);

  let mut items = Vec::with_capacity(shape.anchors);
  for row in anchor_major.rows() {
    // 上面已校验 C = 4 + 标签数且标签数非零，以下分支不会命中
    let [cx, cy, w, h, scores @ ..] = row else {
      return Err(mismatch());
    };
    let (class_id, confidence) = argmax(scores).ok_or_else(mismatch)?;
    let label = labels.get(class_id).ok_or_else(mismatch)?;

    let bbox = BBox::from_center(cx * scale.sx, cy * scale.sy, w * scale.sx, h * scale.sy);

    items.push(DetectItem {
      class_id,
      label: label.clone(),
      confidence,
      bbox,
    });
  }

  Ok(DetectResult::from(items))
}

/// 最大值下标，只有严格更大才替换，并列时保留最先出现者
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let (&first, rest) = scores.split_first()?;
  let mut best = (0, first);
  for (i, &score) in rest.iter().enumerate() {
    if score > best.1 {
      best = (i + 1, score);
    }
  }
  Some(best)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn argmax_prefers_first_on_ties() {
    assert_eq!(argmax(&[0.2, 0.7, 0.7, 0.1]), Some((1, 0.7)));
    assert_eq!(argmax(&[0.5, 0.5, 0.5]), Some((0, 0.5)));
  }

  #[test]
  fn argmax_single_and_empty() {
    assert_eq!(argmax(&[0.3]), Some((0, 0.3)));
    assert_eq!(argmax(&[]), None);
  }

  #[test]
  fn nan_scores_still_yield_one_detection_per_anchor() {
    let labels = LabelTable::new(["a", "b"]).unwrap();
    // 2 个锚点，6 个通道
    let mut data = vec![1.0f32; 12];
    data[8..].fill(f32::NAN);
    let view = TensorView::new(&data, TensorShape::new(6, 2)).unwrap();

    let result = decode(view, ScaleFactor::identity(), &labels).unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|d| d.class_id == 0));
  }

  #[test]
  fn argmax_picks_last_when_largest() {
    assert_eq!(argmax(&[0.1, 0.2, 0.9]), Some((2, 0.9)));
  }
}
