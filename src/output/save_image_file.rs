// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
  utils::{parse_size, query_flag, query_value},
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("绘制器错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("需要 background 图像或 size=WxH 画布尺寸")]
  MissingCanvas,
}

/// 在背景图（或空白画布）上绘制检测框并保存
///
/// `image:///out/result.png?background=/path/frame.jpg&font=/path/font.ttf&size=1280x720&per-frame`
pub struct SaveImageFileOutput {
  path: PathBuf,
  canvas: RgbImage,
  draw: Draw,
  per_frame: bool,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let canvas = match (query_value(uri, "background"), query_value(uri, "size")) {
      (Some(background), _) => ImageReader::open(&background)?.decode()?.into_rgb8(),
      (None, Some(size)) => {
        let (w, h) = parse_size(&size)
          .filter(|&(w, h)| w > 0 && h > 0)
          .ok_or(SaveImageFileError::MissingCanvas)?;
        RgbImage::new(w, h)
      }
      (None, None) => return Err(SaveImageFileError::MissingCanvas),
    };

    let draw = match query_value(uri, "font") {
      Some(font) => Draw::default().with_font_file(font)?,
      None => Draw::default(),
    };

    Ok(SaveImageFileOutput {
      path: PathBuf::from(uri.path()),
      canvas,
      draw,
      per_frame: query_flag(uri, "per-frame"),
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>, canvas: RgbImage, draw: Draw) -> Self {
    Self {
      path: path.into(),
      canvas,
      draw,
      per_frame: false,
    }
  }

  pub fn per_frame(mut self, per_frame: bool) -> Self {
    self.per_frame = per_frame;
    self
  }

  /// 输出路径；逐帧保存时在文件名后追加帧号
  fn frame_path(&self, index: usize) -> PathBuf {
    if !self.per_frame {
      return self.path.clone();
    }
    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}-{:06}.{}", stem, index, ext.to_string_lossy()),
      None => format!("{}-{:06}", stem, index),
    };
    self.path.with_file_name(name)
  }

  fn save_image(&self, image: RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(path)?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<TensorFrame, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let mut image = self.canvas.clone();
    self.draw.draw_detections_on_image(&mut image, result);
    self.save_image(image, &self.frame_path(frame.index()))
  }
}
