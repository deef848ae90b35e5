// 该文件是 Bahan （食材识别） 项目的一部分。
// src/model.rs - 分类器接口
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

use crate::frame::{InputShape, NhwcTensor};

/// 不透明的图像分类器。
///
/// 实现者在加载时声明输入形状 `[1, H, W, 3]` 与输出宽度 C，
/// `invoke` 接收一个符合声明形状的张量并返回长度为 C 的分数。
/// `invoke` 需要 `&mut self`，共享实例的互斥由 [`InferenceAdapter`] 负责。
pub trait Classifier: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_shape(&self) -> InputShape;
  fn output_len(&self) -> usize;
  fn invoke(&mut self, input: NhwcTensor) -> Result<Vec<f32>, Self::Error>;
}

/// 分类器输出的分数向量，分数越高越可信
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
  scores: Box<[f32]>,
}

impl ScoreVector {
  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.scores
  }
}

impl From<Vec<f32>> for ScoreVector {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("Classifier execution failed: {0}")]
  Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("Input tensor shape mismatch: expected {expected:?}, got {actual:?}")]
  InputShapeMismatch {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("Classifier output length mismatch: expected {expected}, got {actual}")]
  OutputShapeMismatch { expected: usize, actual: usize },
  #[error("Classifier pool is empty")]
  EmptyPool,
  #[error("Classifier instances declare different shapes")]
  InconsistentPool,
}

mod adapter;
pub use self::adapter::InferenceAdapter;

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};
