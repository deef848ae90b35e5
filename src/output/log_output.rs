// 该文件是 Bahan （食材识别） 项目的一部分。
// src/output/log_output.rs - 日志输出
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
  FromUrl, FromUrlWithScheme, input::InputImage, output::Render, postprocess::Prediction,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将识别结果写入日志，`log:`
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(LogOutput)
  }
}

impl Render<InputImage, [Prediction]> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &InputImage, result: &[Prediction]) -> Result<(), Self::Error> {
    if result.is_empty() {
      info!("{}: 未识别到食材", frame.name);
      return Ok(());
    }

    info!("{}: 识别到 {} 种食材", frame.name, result.len());
    for prediction in result {
      info!(
        "  - {}: {:.2}%",
        prediction.label,
        prediction.confidence * 100.0
      );
    }
    Ok(())
  }
}
