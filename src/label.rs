// 该文件是 Bahan （食材识别） 项目的一部分。
// src/label.rs - 类别标签目录
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 内置食材类别，顺序与模型输出一致
pub const INGREDIENT_LABELS: [&str; 35] = [
  "Bawang Bombai",
  "Bawang Merah",
  "Bawang Putih",
  "Brokoli",
  "Cabai Hijau",
  "Cabai Merah",
  "Daging Sapi",
  "Daging Unggas",
  "Ikan",
  "Jagung",
  "Jahe",
  "Jamur",
  "Kacang Hijau",
  "Kacang Merah",
  "Kacang Panjang",
  "Kacang Tanah",
  "Kembang Kol",
  "Kentang",
  "Kikil",
  "Kol",
  "Labu Siam",
  "Mie",
  "Nasi",
  "Petai",
  "Sawi",
  "Selada",
  "Seledri",
  "Telur Ayam",
  "Telur Bebek",
  "Tempe",
  "Terong",
  "Timun",
  "Tomat",
  "Usus",
  "Wortel",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Label JSON error: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("Label catalog is empty")]
  Empty,
}

/// 有序的类别名称目录，下标 i 对应分类器输出的第 i 个分数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
  labels: Box<[String]>,
}

impl LabelCatalog {
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  /// 内置的 35 类食材目录
  pub fn ingredients() -> Self {
    Self::new(INGREDIENT_LABELS)
  }

  /// 从文件加载目录。`.json` 文件为字符串数组，其余按行读取，忽略空行。
  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let is_json = path
      .extension()
      .map(|ext| ext.eq_ignore_ascii_case("json"))
      .unwrap_or(false);
    let catalog = if is_json {
      Self::new(serde_json::from_str::<Vec<String>>(&content)?)
    } else {
      Self::new(
        content
          .lines()
          .map(str::trim)
          .filter(|line| !line.is_empty()),
      )
    };

    if catalog.is_empty() {
      return Err(LabelError::Empty);
    }
    info!("从 {} 加载 {} 个类别标签", path.display(), catalog.len());
    Ok(catalog)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.labels.get(index).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl Default for LabelCatalog {
  fn default() -> Self {
    Self::ingredients()
  }
}

impl FromUrlWithScheme for LabelCatalog {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelCatalog {
  type Error = LabelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LabelError::SchemeMismatch(format!(
        "expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::from_path(url.path())
  }
}
