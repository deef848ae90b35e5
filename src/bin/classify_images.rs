// 该文件是 Bahan （食材识别） 项目的一部分。
// src/bin/classify_images.rs - 批量识别图像文件
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use bahan::{
  FromUrl,
  input::InputWrapper,
  label::LabelCatalog,
  model::{InferenceAdapter, OnnxClassifierBuilder},
  output::OutputWrapper,
  pipeline::ClassifyPipeline,
  postprocess::RankingConfig,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// 批量识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径
  #[arg(long, env = "BAHAN_MODEL", value_name = "MODEL")]
  pub model: Url,
  /// 标签文件路径
  #[arg(long, env = "BAHAN_LABELS", value_name = "LABELS")]
  pub labels: Option<Url>,
  /// 输入来源，image:///a.jpg 或 folder:///photos
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，log: 或 json:///result.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  #[arg(long, default_value_t = bahan::postprocess::DEFAULT_TOP_K)]
  pub top_k: usize,
  #[arg(long, default_value_t = bahan::postprocess::DEFAULT_CONFIDENCE_THRESHOLD)]
  pub confidence: f32,

  #[arg(long, value_name = "COUNT")]
  pub max_images: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let labels = match &args.labels {
    Some(url) => LabelCatalog::from_url(url)?,
    None => LabelCatalog::ingredients(),
  };
  let model = OnnxClassifierBuilder::from_url(&args.model)?.build()?;
  let ranking = RankingConfig::default()
    .with_top_k(args.top_k)
    .with_threshold(args.confidence);
  let pipeline = ClassifyPipeline::new(InferenceAdapter::new(model), labels, ranking)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_image_limit(args.max_images)
    .run_task(input.into_iter(), &pipeline, output)?;

  Ok(())
}
