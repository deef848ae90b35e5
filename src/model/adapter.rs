// 该文件是 Bahan （食材识别） 项目的一部分。
// src/model/adapter.rs - 推理适配器与分类器实例池
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

use std::sync::{
  Mutex, MutexGuard, TryLockError,
  atomic::{AtomicUsize, Ordering},
};

use tracing::{debug, info, warn};

use crate::{
  frame::{InputShape, NhwcTensor},
  model::{Classifier, InferenceError, ScoreVector},
};

/// 推理适配器。
///
/// 持有一个或多个分类器实例，每个实例由独立的互斥锁保护，
/// "设置输入 -> 推理 -> 读取输出" 始终在持锁期间完成。
/// 只有一个实例时所有请求串行执行；多个实例时按轮询分配，优先选择空闲实例。
/// 每次推理互不依赖，某次推理 panic 后实例仍可继续使用。
pub struct InferenceAdapter<C> {
  instances: Box<[Mutex<C>]>,
  cursor: AtomicUsize,
  input_shape: InputShape,
  output_len: usize,
}

impl<C: Classifier> InferenceAdapter<C> {
  pub fn new(classifier: C) -> Self {
    let input_shape = classifier.input_shape();
    let output_len = classifier.output_len();
    info!(
      "分类器输入形状: {:?}, 输出类别数: {}",
      input_shape.dims(),
      output_len
    );
    Self {
      instances: vec![Mutex::new(classifier)].into_boxed_slice(),
      cursor: AtomicUsize::new(0),
      input_shape,
      output_len,
    }
  }

  /// 由多个相互独立的实例组成实例池，所有实例必须声明相同的形状
  pub fn with_pool(instances: Vec<C>) -> Result<Self, InferenceError> {
    let first = instances.first().ok_or(InferenceError::EmptyPool)?;
    let input_shape = first.input_shape();
    let output_len = first.output_len();

    if instances
      .iter()
      .any(|c| c.input_shape() != input_shape || c.output_len() != output_len)
    {
      return Err(InferenceError::InconsistentPool);
    }

    info!(
      "分类器实例池大小: {}, 输入形状: {:?}, 输出类别数: {}",
      instances.len(),
      input_shape.dims(),
      output_len
    );
    Ok(Self {
      instances: instances.into_iter().map(Mutex::new).collect(),
      cursor: AtomicUsize::new(0),
      input_shape,
      output_len,
    })
  }

  pub fn input_shape(&self) -> InputShape {
    self.input_shape
  }

  pub fn output_len(&self) -> usize {
    self.output_len
  }

  pub fn pool_size(&self) -> usize {
    self.instances.len()
  }

  pub fn invoke(&self, input: NhwcTensor) -> Result<ScoreVector, InferenceError> {
    let expected = self.input_shape.dims();
    let actual = input.shape();
    if expected != actual {
      return Err(InferenceError::InputShapeMismatch { expected, actual });
    }

    let scores = {
      let mut classifier = self.acquire();
      classifier
        .invoke(input)
        .map_err(|e| InferenceError::Execution(Box::new(e)))?
    };

    if scores.len() != self.output_len {
      return Err(InferenceError::OutputShapeMismatch {
        expected: self.output_len,
        actual: scores.len(),
      });
    }
    Ok(ScoreVector::from(scores))
  }

  fn acquire(&self) -> MutexGuard<'_, C> {
    let size = self.instances.len();
    let start = self.cursor.fetch_add(1, Ordering::Relaxed) % size;

    for offset in 0..size {
      let index = (start + offset) % size;
      match self.instances[index].try_lock() {
        Ok(guard) => {
          debug!("使用分类器实例 {}", index);
          return guard;
        }
        Err(TryLockError::WouldBlock) => continue,
        Err(TryLockError::Poisoned(poisoned)) => {
          warn!("分类器实例 {} 曾在推理中 panic，继续使用", index);
          self.instances[index].clear_poison();
          return poisoned.into_inner();
        }
      }
    }

    debug!("所有分类器实例繁忙，等待实例 {}", start);
    let guard = self.instances[start].lock().unwrap_or_else(|poisoned| {
      warn!("分类器实例 {} 曾在推理中 panic，继续使用", start);
      poisoned.into_inner()
    });
    self.instances[start].clear_poison();
    guard
  }
}
