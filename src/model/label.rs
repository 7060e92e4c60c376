// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/label.rs - 类别标签表
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::debug;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签表为空")]
  Empty,
  #[error("读取标签文件失败: {0}")]
  IoError(#[from] std::io::Error),
}

/// 类别标签表，下标即类别编号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  labels: Box<[Arc<str>]>,
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let labels: Box<[Arc<str>]> = labels.into_iter().map(|s| Arc::from(s.as_ref())).collect();
    if labels.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(Self { labels })
  }

  pub fn coco() -> Self {
    Self {
      labels: COCO_CLASSES.iter().map(|&s| Arc::from(s)).collect(),
    }
  }

  /// 解析模型元数据中以空格分隔的标签字符串
  ///
  /// 导出的 YOLOv8 模型把类别名写成一行，例如 `person bicycle car`，
  /// 多个连续空白视为一个分隔符。
  pub fn from_metadata(value: &str) -> Result<Self, LabelError> {
    Self::new(value.split_whitespace())
  }

  /// 从文件加载，每行一个标签，标签内部可以含空格
  ///
  /// 以空格分隔的元数据字符串请用 [`LabelTable::from_metadata`]。
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let table = Self::new(content.lines().map(str::trim).filter(|l| !l.is_empty()))?;
    debug!("从 {} 加载 {} 个类别标签", path.display(), table.len());
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&Arc<str>> {
    self.labels.get(class_id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(|s| s.as_ref())
  }
}
