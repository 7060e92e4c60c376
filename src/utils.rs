// 该文件是 Beifeng （北风） 项目的一部分。
// src/utils.rs - 通用工具
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

use url::Url;

/// 解析 `WIDTHxHEIGHT` 形式的尺寸
pub fn parse_size(s: &str) -> Option<(u32, u32)> {
  let (w, h) = s.split_once(['x', 'X'])?;
  let w = w.trim().parse().ok()?;
  let h = h.trim().parse().ok()?;
  Some((w, h))
}

/// 取 URL 查询参数中第一个名为 `key` 的值
pub fn query_value(url: &Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

/// URL 查询参数中是否存在 `key`（不论取值）
pub fn query_flag(url: &Url, key: &str) -> bool {
  url.query_pairs().any(|(k, _)| k == key)
}
