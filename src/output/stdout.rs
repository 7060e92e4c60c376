// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/stdout.rs - 日志输出检测结果
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::DetectResult,
  output::{Render, label_text},
};

#[derive(Error, Debug)]
pub enum StdoutOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 把每帧检测结果写入日志
#[derive(Debug, Default)]
pub struct StdoutOutput;

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = StdoutOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StdoutOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(StdoutOutput)
  }
}

impl Render<TensorFrame, DetectResult> for StdoutOutput {
  type Error = StdoutOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if result.is_empty() {
      return Ok(());
    }

    info!("帧 {}: 检测到 {} 个对象", frame.index(), result.len());
    for item in result {
      info!(
        "  - {} at ({:.0}, {:.0}, {:.0}x{:.0})",
        label_text(item),
        item.bbox.x,
        item.bbox.y,
        item.bbox.width,
        item.bbox.height
      );
    }
    Ok(())
  }
}
