// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 检测头后处理
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

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{
    DecodeError, DetectResult, LabelError, LabelTable, Model, PostprocessConfig, ScaleFactor,
    SuppressionScope, decode,
  },
  utils::{parse_size, query_value},
};

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("解码错误: {0}")]
  DecodeError(#[from] DecodeError),
  #[error("标签错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数 {key} 取值无效: {value}")]
  InvalidParameter { key: String, value: String },
}

impl Yolov8Error {
  fn invalid(key: &str, value: &str) -> Self {
    Yolov8Error::InvalidParameter {
      key: key.to_string(),
      value: value.to_string(),
    }
  }
}

/// 解码与抑制的上下文，模型配置确定后创建一次，每帧复用
#[derive(Debug, Clone)]
pub struct Yolov8Postprocess {
  labels: LabelTable,
  scale: ScaleFactor,
  config: PostprocessConfig,
}

impl Yolov8Postprocess {
  pub fn new(labels: LabelTable, scale: ScaleFactor, config: PostprocessConfig) -> Self {
    Self {
      labels,
      scale,
      config,
    }
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn scale(&self) -> ScaleFactor {
    self.scale
  }

  pub fn config(&self) -> &PostprocessConfig {
    &self.config
  }
}

impl Model for Yolov8Postprocess {
  type Input = TensorFrame;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("解码第 {} 帧, 张量形状 {}", input.index(), input.shape());

    let now = Instant::now();
    let decoded = decode(input.view(), self.scale, &self.labels)?;
    let decode_elapsed = now.elapsed();

    let now = Instant::now();
    let result = self.config.suppress(decoded);
    let suppress_elapsed = now.elapsed();

    info!(
      "第 {} 帧后处理完成: 解码 {:.2?}, NMS {:.2?}, 检测到 {} 个物体",
      input.index(),
      decode_elapsed,
      suppress_elapsed,
      result.len()
    );

    Ok(result)
  }
}

pub struct Yolov8Builder {
  labels: Option<LabelTable>,
  label_path: Option<String>,
  scale: ScaleFactor,
  config: PostprocessConfig,
}

impl Default for Yolov8Builder {
  fn default() -> Self {
    Self {
      labels: None,
      label_path: None,
      scale: ScaleFactor::identity(),
      config: PostprocessConfig::default(),
    }
  }
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for Yolov8Builder {
  type Error = Yolov8Error;

  /// `yolov8:///path/labels.txt?score=0.5&iou=0.5&scope=agnostic&input=640x640&source=1280x720`
  ///
  /// 路径为空时使用 COCO 标签。
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = Yolov8Builder::default();

    let path = url.path();
    if !path.is_empty() && path != "/" {
      builder.label_path = Some(path.to_string());
    }

    if let Some(v) = query_value(url, "score") {
      let score = v.parse().map_err(|_| Yolov8Error::invalid("score", &v))?;
      builder = builder.score_threshold(score);
    }
    if let Some(v) = query_value(url, "iou") {
      let iou = v.parse().map_err(|_| Yolov8Error::invalid("iou", &v))?;
      builder = builder.iou_threshold(iou);
    }
    if let Some(v) = query_value(url, "scope") {
      let scope = v.parse().map_err(|_| Yolov8Error::invalid("scope", &v))?;
      builder = builder.scope(scope);
    }

    let input = query_value(url, "input")
      .map(|v| parse_size(&v).ok_or_else(|| Yolov8Error::invalid("input", &v)))
      .transpose()?;
    let source = query_value(url, "source")
      .map(|v| parse_size(&v).ok_or_else(|| Yolov8Error::invalid("source", &v)))
      .transpose()?;
    match (source, input) {
      (Some(source), Some(input)) if input.0 > 0 && input.1 > 0 => {
        builder = builder.scale(ScaleFactor::from_sizes(source, input));
      }
      (None, None) => {}
      _ => {
        return Err(Yolov8Error::invalid(
          "input/source",
          "需要同时给出非零的 input 与 source 尺寸",
        ));
      }
    }

    Ok(builder)
  }
}

impl Yolov8Builder {
  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = Some(labels);
    self.label_path = None;
    self
  }

  pub fn scale(mut self, scale: ScaleFactor) -> Self {
    self.scale = scale;
    self
  }

  pub fn score_threshold(mut self, threshold: f32) -> Self {
    self.config.score_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.config.iou_threshold = threshold;
    self
  }

  pub fn scope(mut self, scope: SuppressionScope) -> Self {
    self.config.scope = scope;
    self
  }

  pub fn build(self) -> Result<Yolov8Postprocess, Yolov8Error> {
    let labels = match (self.labels, self.label_path) {
      (Some(labels), _) => labels,
      (None, Some(path)) => {
        info!("加载标签文件: {}", path);
        LabelTable::from_file(&path)?
      }
      (None, None) => {
        debug!("未指定标签文件，使用 COCO 类别");
        LabelTable::coco()
      }
    };

    info!(
      "后处理配置: {} 个类别, 缩放 ({:.4}, {:.4}), 置信度阈值 {}, IoU 阈值 {}, 抑制范围 {:?}",
      labels.len(),
      self.scale.sx,
      self.scale.sy,
      self.config.score_threshold,
      self.config.iou_threshold,
      self.config.scope
    );

    Ok(Yolov8Postprocess::new(labels, self.scale, self.config))
  }
}
