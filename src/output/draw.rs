// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::debug;

use crate::{
  model::{BBox, DetectResult},
  output::label_text,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 检测框绘制器；未提供字体时只画框不写字
pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
  label_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      label_color: LABEL_COLOR,
      font: None,
    }
  }
}

impl Draw {
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    self.font = Some(FontVec::try_from_vec(data)?);
    debug!("加载字体: {}", path.as_ref().display());
    Ok(self)
  }

  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.label_color = color;
    self
  }

  /// 像素坐标裁剪到图像内，退化或完全在图像外时返回 `None`
  fn clip_to_image(bbox: &BBox, width: u32, height: u32) -> Option<Rect> {
    if bbox.is_degenerate() || width == 0 || height == 0 {
      return None;
    }
    let (w, h) = (width as f32, height as f32);

    let x_min = bbox.x.floor().clamp(0.0, w - 1.0) as i32;
    let y_min = bbox.y.floor().clamp(0.0, h - 1.0) as i32;
    let x_max = bbox.right().ceil().clamp(0.0, w - 1.0) as i32;
    let y_max = bbox.bottom().ceil().clamp(0.0, h - 1.0) as i32;

    if x_min >= x_max || y_min >= y_max {
      return None;
    }

    Some(Rect::at(x_min, y_min).of_size((x_max - x_min + 1) as u32, (y_max - y_min + 1) as u32))
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &BBox, label: &str) {
    let Some(rect) = Self::clip_to_image(bbox, image.width(), image.height()) else {
      return;
    };
    let color = Rgb(self.label_color);

    // 绘制边框（加粗）
    for t in 0..BOX_THICKNESS {
      let (w, h) = (rect.width(), rect.height());
      if w <= 2 * t || h <= 2 * t {
        break;
      }
      let inner = Rect::at(rect.left() + t as i32, rect.top() + t as i32).of_size(w - 2 * t, h - 2 * t);
      draw_hollow_rect_mut(image, inner, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    // 估算文本大小（粗略估计）
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签背景在边框上方
    let label_x = rect.left();
    let label_y = (rect.top() - text_height).max(0);

    let max_width = (image.width() as i32 - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let background = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, background, color);

      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        label,
      );
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result {
      self.draw_bbox_with_label(image, &item.bbox, &label_text(item));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clip_skips_degenerate_and_outside_boxes() {
    assert!(Draw::clip_to_image(&BBox::new(5.0, 5.0, 0.0, 10.0), 64, 64).is_none());
    assert!(Draw::clip_to_image(&BBox::new(5.0, 5.0, -3.0, 10.0), 64, 64).is_none());
    assert!(Draw::clip_to_image(&BBox::new(100.0, 100.0, 10.0, 10.0), 64, 64).is_none());
  }

  #[test]
  fn clip_limits_to_image_bounds() {
    let rect = Draw::clip_to_image(&BBox::new(-10.0, 10.0, 30.0, 100.0), 64, 64).unwrap();
    assert_eq!(rect.left(), 0);
    assert_eq!(rect.top(), 10);
    assert_eq!(rect.right(), 20);
    assert_eq!(rect.bottom(), 63);
  }

  #[test]
  fn draws_box_edges_without_font() {
    let mut image = RgbImage::new(32, 32);
    let result = DetectResult::from(vec![crate::model::DetectItem {
      class_id: 0,
      label: "person".into(),
      confidence: 0.9,
      bbox: BBox::new(4.0, 4.0, 10.0, 10.0),
    }]);
    Draw::default().draw_detections_on_image(&mut image, &result);
    assert_eq!(image.get_pixel(4, 4), &Rgb(LABEL_COLOR));
    assert_eq!(image.get_pixel(5, 8), &Rgb(LABEL_COLOR));
    assert_eq!(image.get_pixel(8, 8), &Rgb([0, 0, 0]));
  }
}
