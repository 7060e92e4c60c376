// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme, frame::TensorFrame, model::DetectResult, output::Render,
  utils::{query_flag, query_value},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("未知的记录格式: {0}，可选 id、name、json")]
  InvalidRecordKind(String),
}

/// 记录格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordKind {
  /// `类别编号, 置信度, x, y, w, h`
  Id,
  /// `类别名, 置信度, x, y, w, h`
  #[default]
  Name,
  /// 每帧一个 JSON 文档
  Json,
}

impl FromStr for RecordKind {
  type Err = DirectoryRecordOutputError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "id" => Ok(RecordKind::Id),
      "name" => Ok(RecordKind::Name),
      "json" => Ok(RecordKind::Json),
      other => Err(DirectoryRecordOutputError::InvalidRecordKind(other.to_string())),
    }
  }
}

impl RecordKind {
  pub fn extension(&self) -> &'static str {
    match self {
      RecordKind::Id | RecordKind::Name => "txt",
      RecordKind::Json => "json",
    }
  }

  pub fn format(&self, frame: &TensorFrame, result: &DetectResult) -> Result<String, serde_json::Error> {
    match self {
      RecordKind::Id | RecordKind::Name => {
        let lines: Vec<String> = result
          .iter()
          .map(|item| {
            let name = if *self == RecordKind::Name {
              item.label.to_string()
            } else {
              item.class_id.to_string()
            };
            format!(
              "{}, {:.4}, {:.2}, {:.2}, {:.2}, {:.2}",
              name, item.confidence, item.bbox.x, item.bbox.y, item.bbox.width, item.bbox.height
            )
          })
          .collect();
        Ok(lines.join("\n"))
      }
      RecordKind::Json => {
        let detections: Vec<_> = result
          .iter()
          .map(|item| {
            json!({
              "class_id": item.class_id,
              "label": &*item.label,
              "confidence": item.confidence,
              "bbox": [item.bbox.x, item.bbox.y, item.bbox.width, item.bbox.height],
            })
          })
          .collect();
        serde_json::to_string_pretty(&json!({
          "frame": frame.index(),
          "detections": detections,
        }))
      }
    }
  }
}

/// 按日期分目录保存每帧的检测记录
///
/// `folder:///path/to/dir?record=id|name|json&always`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  kind: RecordKind,
  frame_counter: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = query_value(uri, "record")
      .map(|v| v.parse::<RecordKind>())
      .transpose()?
      .unwrap_or_default();

    Ok(DirectoryRecordOutput::new(uri.path(), kind).always(query_flag(uri, "always")))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, kind: RecordKind) -> Self {
    Self {
      directory: directory.into(),
      kind,
      frame_counter: Mutex::new(0),
      always: false,
    }
  }

  /// 无检测结果时也写入记录
  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    let filename = format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.frame_id(),
      self.kind.extension()
    );

    Ok(directory.join(filename))
  }
}

impl Render<TensorFrame, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    std::fs::write(&path, self.kind.format(frame, result)?)?;
    debug!("记录第 {} 帧到 {}", frame.index(), path.display());
    Ok(())
  }
}
