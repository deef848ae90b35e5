// 该文件是 Bahan （食材识别） 项目的一部分。
// src/pipeline.rs - 识别流水线
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
use tracing::{debug, error, info};

use crate::{
  frame::InputShape,
  input::{DecodeError, decode_to_tensor},
  label::LabelCatalog,
  model::{Classifier, InferenceAdapter, InferenceError},
  postprocess::{LabelMappingError, Prediction, RankingConfig, rank},
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  Inference(#[from] InferenceError),
  #[error(transparent)]
  LabelMapping(#[from] LabelMappingError),
  #[error("Unexpected error: {0}")]
  Unexpected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Decode,
  Inference,
  LabelMapping,
  Unexpected,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::Decode => "decode",
      ErrorKind::Inference => "inference",
      ErrorKind::LabelMapping => "label_mapping",
      ErrorKind::Unexpected => "unexpected",
    }
  }
}

impl PipelineError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      PipelineError::Decode(_) => ErrorKind::Decode,
      PipelineError::Inference(_) => ErrorKind::Inference,
      PipelineError::LabelMapping(_) => ErrorKind::LabelMapping,
      PipelineError::Unexpected(_) => ErrorKind::Unexpected,
    }
  }
}

/// 食材识别流水线：解码归一化 -> 推理 -> 排序过滤
pub struct ClassifyPipeline<C> {
  adapter: InferenceAdapter<C>,
  labels: LabelCatalog,
  ranking: RankingConfig,
}

impl<C: Classifier> ClassifyPipeline<C> {
  /// 创建流水线，并在启动时校验标签目录与分类器输出宽度一致
  pub fn new(
    adapter: InferenceAdapter<C>,
    labels: LabelCatalog,
    ranking: RankingConfig,
  ) -> Result<Self, PipelineError> {
    if labels.len() != adapter.output_len() {
      error!(
        "标签数量 {} 与分类器输出宽度 {} 不一致",
        labels.len(),
        adapter.output_len()
      );
      return Err(
        LabelMappingError::SizeMismatch {
          catalog_len: labels.len(),
          output_len: adapter.output_len(),
        }
        .into(),
      );
    }

    info!(
      "流水线就绪: 输入 {:?}, {} 个类别, top-k {}, 阈值 {}",
      adapter.input_shape().dims(),
      labels.len(),
      ranking.top_k,
      ranking.threshold
    );
    Ok(Self {
      adapter,
      labels,
      ranking,
    })
  }

  pub fn input_shape(&self) -> InputShape {
    self.adapter.input_shape()
  }

  pub fn pool_size(&self) -> usize {
    self.adapter.pool_size()
  }

  pub fn labels(&self) -> &LabelCatalog {
    &self.labels
  }

  pub fn ranking(&self) -> &RankingConfig {
    &self.ranking
  }

  pub fn classify(&self, image: &[u8]) -> Result<Vec<Prediction>, PipelineError> {
    let shape = self.adapter.input_shape();
    let (Ok(width), Ok(height)) = (u32::try_from(shape.width), u32::try_from(shape.height)) else {
      return Err(
        DecodeError::InvalidTargetSize {
          width: shape.width,
          height: shape.height,
        }
        .into(),
      );
    };

    let now = Instant::now();
    let tensor = decode_to_tensor(image, width, height)?;
    let preprocess = now.elapsed();

    let now = Instant::now();
    let scores = self.adapter.invoke(tensor)?;
    let inference = now.elapsed();

    let now = Instant::now();
    let predictions = rank(&scores, &self.labels, &self.ranking)?;
    let postprocess = now.elapsed();

    debug!(
      "预处理 {:.2?}, 推理 {:.2?}, 后处理 {:.2?}",
      preprocess, inference, postprocess
    );
    Ok(predictions)
  }
}
