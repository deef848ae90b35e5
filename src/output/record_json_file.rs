// 该文件是 Bahan （食材识别） 项目的一部分。
// src/output/record_json_file.rs - JSON Lines 结果记录
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

use std::{
  fs::{File, OpenOptions},
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::InputImage,
  output::{DetectedIngredient, Render},
  postprocess::Prediction,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录文件锁已失效")]
  Poisoned,
}

/// 每张图像一行 JSON 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub timestamp: DateTime<Utc>,
  pub image: String,
  pub bahan_terdeteksi: Vec<DetectedIngredient>,
}

/// 将识别结果以 JSON Lines 追加到文件，`json:///path/to/result.jsonl`
pub struct JsonRecordOutput {
  path: PathBuf,
  file: Mutex<File>,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    let path = PathBuf::from(uri.path());
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(JsonRecordOutput {
      path,
      file: Mutex::new(file),
    })
  }
}

impl JsonRecordOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<InputImage, [Prediction]> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, frame: &InputImage, result: &[Prediction]) -> Result<(), Self::Error> {
    let record = Record {
      timestamp: Utc::now(),
      image: frame.name.clone(),
      bahan_terdeteksi: result.iter().map(DetectedIngredient::from).collect(),
    };

    let mut line = serde_json::to_vec(&record)?;
    line.push(b'\n');

    let mut file = self
      .file
      .lock()
      .map_err(|_| JsonRecordOutputError::Poisoned)?;
    file.write_all(&line)?;
    debug!("记录 {} 的结果到 {}", frame.name, self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn records_are_appended_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("result.jsonl");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonRecordOutput::from_url(&url).unwrap();

    let image = InputImage {
      name: "dapur.jpg".to_string(),
      bytes: Vec::new(),
    };
    let predictions = vec![Prediction {
      label: "Jahe".to_string(),
      confidence: 0.875,
    }];
    output.render_result(&image, &predictions).unwrap();
    output.render_result(&image, &[]).unwrap();

    let content = std::fs::read_to_string(output.path()).unwrap();
    let records: Vec<Record> = content
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].image, "dapur.jpg");
    assert_eq!(
      records[0].bahan_terdeteksi,
      vec![DetectedIngredient {
        bahan: "Jahe".to_string(),
        confidence: 0.875
      }]
    );
    assert!(records[1].bahan_terdeteksi.is_empty());
  }
}
