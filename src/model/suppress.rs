// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/suppress.rs - 非极大值抑制
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

use std::{cmp::Ordering, str::FromStr};

use tracing::debug;

use crate::model::{DetectItem, DetectResult};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// 抑制范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuppressionScope {
  /// 不区分类别，任意类别的框都可以相互抑制
  #[default]
  ClassAgnostic,
  /// 只在同一类别内抑制
  PerClass,
}

impl FromStr for SuppressionScope {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "agnostic" | "class-agnostic" => Ok(Self::ClassAgnostic),
      "per-class" | "class" => Ok(Self::PerClass),
      other => Err(format!("未知的抑制范围: {}", other)),
    }
  }
}

/// 后处理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessConfig {
  pub score_threshold: f32,
  pub iou_threshold: f32,
  pub scope: SuppressionScope,
}

impl Default for PostprocessConfig {
  fn default() -> Self {
    Self {
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      scope: SuppressionScope::default(),
    }
  }
}

impl PostprocessConfig {
  pub fn suppress(&self, detections: DetectResult) -> DetectResult {
    suppress_with_scope(
      detections,
      self.score_threshold,
      self.iou_threshold,
      self.scope,
    )
  }
}

/// 不区分类别的非极大值抑制
pub fn suppress(detections: DetectResult, score_threshold: f32, iou_threshold: f32) -> DetectResult {
  suppress_with_scope(
    detections,
    score_threshold,
    iou_threshold,
    SuppressionScope::ClassAgnostic,
  )
}

/// 贪心非极大值抑制
///
/// 先丢弃置信度低于 `score_threshold` 的结果，再按置信度稳定降序排列，
/// 依次保留当前最高者并标记与其交并比大于 `iou_threshold` 的其余结果。
/// 返回顺序即保留顺序（置信度从高到低，并列时保持锚点顺序）。
pub fn suppress_with_scope(
  detections: DetectResult,
  score_threshold: f32,
  iou_threshold: f32,
  scope: SuppressionScope,
) -> DetectResult {
  let total = detections.len();
  // NaN 在这里被过滤掉，后续比较是全序的
  let mut candidates: Vec<DetectItem> = detections
    .items
    .into_vec()
    .into_iter()
    .filter(|d| d.confidence >= score_threshold)
    .collect();

  candidates.sort_by(|a, b| {
    b.confidence
      .partial_cmp(&a.confidence)
      .unwrap_or(Ordering::Equal)
  });

  let mut suppressed = vec![false; candidates.len()];
  for i in 0..candidates.len() {
    if suppressed[i] {
      continue;
    }
    let picked = &candidates[i];
    if picked.bbox.is_degenerate() {
      continue;
    }

    for j in (i + 1)..candidates.len() {
      if suppressed[j] {
        continue;
      }
      let other = &candidates[j];
      if other.bbox.is_degenerate() {
        continue;
      }
      if scope == SuppressionScope::PerClass && other.class_id != picked.class_id {
        continue;
      }
      if picked.bbox.iou(&other.bbox) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  let above = candidates.len();
  let kept: DetectResult = candidates
    .into_iter()
    .zip(suppressed)
    .filter_map(|(item, dropped)| (!dropped).then_some(item))
    .collect();

  debug!(
    "NMS: 输入 {}, 过阈值 {}, 保留 {}",
    total,
    above,
    kept.len()
  );

  kept
}
