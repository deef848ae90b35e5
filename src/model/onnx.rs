// 该文件是 Bahan （食材识别） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 分类器
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

use ort::{session::Session, value::Tensor};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{InputShape, NhwcTensor},
  model::Classifier,
};

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_NUM_OUTPUTS: usize = 1;

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("Model I/O error: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("Model invalid: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime error: {0}")]
  OrtError(#[from] ort::Error),
  #[error("Model path error: {0}")]
  ModelPathError(String),
}

pub struct OnnxClassifier {
  session: Session,
  input_shape: InputShape,
  output_len: usize,
}

pub struct OnnxClassifierBuilder {
  model_path: String,
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "model URL must use the '{}' scheme, found '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut intra_threads = None;
    for (k, v) in url.query_pairs() {
      if k == "threads" {
        let threads = v.parse::<usize>().map_err(|_| {
          OnnxClassifierError::ModelPathError(format!("invalid thread count '{}'", v))
        })?;
        intra_threads = Some(threads);
      }
    }

    Ok(OnnxClassifierBuilder {
      model_path: url.path().to_string(),
      intra_threads,
    })
  }
}

impl OnnxClassifierBuilder {
  pub fn build(&self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let mut builder = Session::builder()?;
    if let Some(threads) = self.intra_threads {
      builder = builder.with_intra_threads(threads)?;
    }
    let session = builder.commit_from_memory(&model_data)?;

    if session.inputs.len() != ONNX_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS,
        session.inputs.len()
      );
      return Err(OnnxClassifierError::ModelInvalid(format!(
        "expected {} input, found {}",
        ONNX_NUM_INPUTS,
        session.inputs.len()
      )));
    }
    if session.outputs.len() != ONNX_NUM_OUTPUTS {
      error!(
        "预期模型输出数量为 {}, 实际为 {}",
        ONNX_NUM_OUTPUTS,
        session.outputs.len()
      );
      return Err(OnnxClassifierError::ModelInvalid(format!(
        "expected {} output, found {}",
        ONNX_NUM_OUTPUTS,
        session.outputs.len()
      )));
    }

    let input_dims = session.inputs[0]
      .input_type
      .tensor_dimensions()
      .ok_or_else(|| OnnxClassifierError::ModelInvalid("input is not a tensor".to_string()))?
      .clone();
    let input_shape = InputShape::from_dims(&input_dims).ok_or_else(|| {
      OnnxClassifierError::ModelInvalid(format!(
        "expected input shape [1, H, W, 3], found {:?}",
        input_dims
      ))
    })?;

    let output_dims = session.outputs[0]
      .output_type
      .tensor_dimensions()
      .ok_or_else(|| OnnxClassifierError::ModelInvalid("output is not a tensor".to_string()))?
      .clone();
    let output_len = output_len_from_dims(&output_dims).ok_or_else(|| {
      OnnxClassifierError::ModelInvalid(format!(
        "expected output shape [1, C], found {:?}",
        output_dims
      ))
    })?;

    debug!("模型输入形状: {:?}", input_dims);
    debug!("模型输出形状: {:?}", output_dims);
    info!("模型加载完成");

    Ok(OnnxClassifier {
      session,
      input_shape,
      output_len,
    })
  }
}

/// 输出形状为 `[C]` 或 `[1, C]`（批次维可为动态）时返回类别数 C
fn output_len_from_dims(dims: &[i64]) -> Option<usize> {
  match dims {
    [classes] => usize::try_from(*classes).ok().filter(|&c| c > 0),
    [batch, classes] if *batch == 1 || *batch < 0 => {
      usize::try_from(*classes).ok().filter(|&c| c > 0)
    }
    _ => None,
  }
}

impl Classifier for OnnxClassifier {
  type Error = OnnxClassifierError;

  fn input_shape(&self) -> InputShape {
    self.input_shape
  }

  fn output_len(&self) -> usize {
    self.output_len
  }

  fn invoke(&mut self, input: NhwcTensor) -> Result<Vec<f32>, Self::Error> {
    debug!("设置模型输入");
    let shape = input.shape();
    let tensor = Tensor::from_array((shape, input.into_vec()))?;

    debug!("执行模型推理");
    let outputs = self.session.run(ort::inputs![tensor]?)?;

    debug!("获取模型输出");
    let (_, scores) = outputs[0].try_extract_raw_tensor::<f32>()?;
    Ok(scores.to_vec())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn builder(url: &str) -> Result<OnnxClassifierBuilder, OnnxClassifierError> {
    OnnxClassifierBuilder::from_url(&Url::parse(url).unwrap())
  }

  #[test]
  fn url_path_and_threads_are_read() {
    let builder = builder("onnx:///models/bahan.onnx?threads=4").unwrap();
    assert_eq!(builder.model_path, "/models/bahan.onnx");
    assert_eq!(builder.intra_threads, Some(4));

    let builder = self::builder("onnx:///models/bahan.onnx").unwrap();
    assert_eq!(builder.intra_threads, None);
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    assert!(matches!(
      builder("rknn:///models/bahan.rknn"),
      Err(OnnxClassifierError::ModelPathError(_))
    ));
  }

  #[test]
  fn invalid_thread_count_is_rejected() {
    let err = builder("onnx:///models/bahan.onnx?threads=banyak")
      .err()
      .unwrap();
    assert!(err.to_string().contains("banyak"));
  }

  #[test]
  fn missing_model_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("onnx://{}", dir.path().join("missing.onnx").display());
    assert!(matches!(
      builder(&url).unwrap().build(),
      Err(OnnxClassifierError::ModelLoadError(_))
    ));
  }

  #[test]
  fn output_dims_give_class_count() {
    assert_eq!(output_len_from_dims(&[35]), Some(35));
    assert_eq!(output_len_from_dims(&[1, 35]), Some(35));
    assert_eq!(output_len_from_dims(&[-1, 35]), Some(35));
    assert_eq!(output_len_from_dims(&[1, 0]), None);
    assert_eq!(output_len_from_dims(&[1, -1]), None);
    assert_eq!(output_len_from_dims(&[4, 35]), None);
    assert_eq!(output_len_from_dims(&[1, 35, 1]), None);
  }
}
