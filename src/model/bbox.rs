// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/bbox.rs - 边界框
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

/// 轴对齐矩形，(x, y) 为左上角
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由中心点与宽高构造
  pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
    Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  /// 宽或高不为正（含 NaN）
  pub fn is_degenerate(&self) -> bool {
    !(self.width > 0.0 && self.height > 0.0)
  }

  pub fn area(&self) -> f32 {
    if self.is_degenerate() {
      0.0
    } else {
      self.width * self.height
    }
  }

  pub fn intersection(&self, other: &BBox) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = self.right().min(other.right());
    let y2 = self.bottom().min(other.bottom());
    (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
  }

  /// 交并比；退化矩形与任何矩形的交并比均为 0
  pub fn iou(&self, other: &BBox) -> f32 {
    if self.is_degenerate() || other.is_degenerate() {
      return 0.0;
    }

    let intersection = self.intersection(other);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_boxes_have_unit_iou() {
    let a = BBox::new(10.0, 10.0, 20.0, 30.0);
    assert_eq!(a.iou(&a), 1.0);
  }

  #[test]
  fn disjoint_and_touching_boxes_have_zero_iou() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(20.0, 20.0, 10.0, 10.0);
    let c = BBox::new(10.0, 0.0, 10.0, 10.0);
    assert_eq!(a.iou(&b), 0.0);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn half_overlap() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(5.0, 0.0, 10.0, 10.0);
    // 交 50，并 150
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(a.iou(&b), b.iou(&a));
  }

  #[test]
  fn degenerate_box_never_overlaps() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let flat = BBox::new(2.0, 2.0, 0.0, 5.0);
    let negative = BBox::new(2.0, 2.0, -4.0, 5.0);
    assert_eq!(a.iou(&flat), 0.0);
    assert_eq!(negative.iou(&a), 0.0);
    assert_eq!(flat.iou(&flat), 0.0);
    assert_eq!(negative.area(), 0.0);
  }

  #[test]
  fn from_center_is_top_left() {
    let b = BBox::from_center(50.0, 40.0, 20.0, 10.0);
    assert_eq!(b, BBox::new(40.0, 35.0, 20.0, 10.0));
  }
}
