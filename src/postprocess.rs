// 该文件是 Bahan （食材识别） 项目的一部分。
// src/postprocess.rs - 排序与置信度过滤
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

use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use crate::{label::LabelCatalog, model::ScoreVector};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
  /// 最多保留的候选数
  pub top_k: usize,
  /// 置信度阈值，分数必须严格大于该值
  pub threshold: f32,
}

impl Default for RankingConfig {
  fn default() -> Self {
    Self {
      top_k: DEFAULT_TOP_K,
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }
}

impl RankingConfig {
  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub label: String,
  pub confidence: f32,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelMappingError {
  #[error("Class index {index} has no label (catalog holds {catalog_len} labels)")]
  IndexOutOfRange { index: usize, catalog_len: usize },
  #[error("Label catalog holds {catalog_len} labels but classifier emits {output_len} scores")]
  SizeMismatch {
    catalog_len: usize,
    output_len: usize,
  },
}

/// NaN 视为最低分
fn score_key(score: f32) -> f32 {
  if score.is_nan() {
    f32::NEG_INFINITY
  } else {
    score
  }
}

/// 按分数降序排列的下标，分数相同时下标小者在前
pub fn rank_indices(scores: &[f32]) -> Vec<usize> {
  let mut indices: Vec<usize> = (0..scores.len()).collect();
  indices.sort_by(|&a, &b| {
    score_key(scores[b])
      .partial_cmp(&score_key(scores[a]))
      .unwrap_or(Ordering::Equal)
      .then(a.cmp(&b))
  });
  indices
}

pub fn rank(
  scores: &ScoreVector,
  labels: &LabelCatalog,
  config: &RankingConfig,
) -> Result<Vec<Prediction>, LabelMappingError> {
  let scores = scores.as_slice();
  let mut predictions = Vec::with_capacity(config.top_k.min(scores.len()));

  for index in rank_indices(scores).into_iter().take(config.top_k) {
    let confidence = scores[index];
    let passes = confidence > config.threshold;
    if !passes {
      continue;
    }

    let label = labels
      .get(index)
      .ok_or(LabelMappingError::IndexOutOfRange {
        index,
        catalog_len: labels.len(),
      })?;
    predictions.push(Prediction {
      label: label.to_string(),
      confidence,
    });
  }

  debug!("保留 {} 个预测结果: {:?}", predictions.len(), predictions);
  Ok(predictions)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels(names: &[&str]) -> LabelCatalog {
    LabelCatalog::new(names.iter().copied())
  }

  fn prediction(label: &str, confidence: f32) -> Prediction {
    Prediction {
      label: label.to_string(),
      confidence,
    }
  }

  #[test]
  fn top_k_cuts_before_threshold() {
    let scores = ScoreVector::from(vec![0.9, 0.8, 0.7, 0.6]);
    let result = rank(&scores, &labels(&["A", "B", "C", "D"]), &RankingConfig::default()).unwrap();
    assert_eq!(
      result,
      vec![
        prediction("A", 0.9),
        prediction("B", 0.8),
        prediction("C", 0.7)
      ]
    );
  }

  #[test]
  fn scores_at_or_below_threshold_are_dropped() {
    let scores = ScoreVector::from(vec![0.5, 0.2, 0.49, 0.0]);
    let result = rank(&scores, &labels(&["A", "B", "C", "D"]), &RankingConfig::default()).unwrap();
    assert!(result.is_empty());
  }

  #[test]
  fn result_is_not_padded_to_top_k() {
    let scores = ScoreVector::from(vec![0.1, 0.95, 0.3, 0.6]);
    let result = rank(&scores, &labels(&["A", "B", "C", "D"]), &RankingConfig::default()).unwrap();
    assert_eq!(result, vec![prediction("B", 0.95), prediction("D", 0.6)]);
  }

  #[test]
  fn ties_are_broken_by_index() {
    let scores = [0.7, 0.9, 0.7, 0.9, 0.7];
    assert_eq!(rank_indices(&scores), vec![1, 3, 0, 2, 4]);

    let scores = ScoreVector::from(scores.to_vec());
    let catalog = labels(&["A", "B", "C", "D", "E"]);
    let first = rank(&scores, &catalog, &RankingConfig::default()).unwrap();
    let second = rank(&scores, &catalog, &RankingConfig::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
      first,
      vec![
        prediction("B", 0.9),
        prediction("D", 0.9),
        prediction("A", 0.7)
      ]
    );
  }

  #[test]
  fn nan_scores_rank_last_and_never_pass() {
    let scores = [f32::NAN, 0.6, 0.8];
    assert_eq!(rank_indices(&scores), vec![2, 1, 0]);

    let scores = ScoreVector::from(scores.to_vec());
    let result = rank(&scores, &labels(&["A", "B", "C"]), &RankingConfig::default()).unwrap();
    assert_eq!(result, vec![prediction("C", 0.8), prediction("B", 0.6)]);
  }

  #[test]
  fn configured_top_k_and_threshold_apply() {
    let scores = ScoreVector::from(vec![0.3, 0.25, 0.4, 0.1]);
    let config = RankingConfig::default().with_top_k(2).with_threshold(0.2);
    let result = rank(&scores, &labels(&["A", "B", "C", "D"]), &config).unwrap();
    assert_eq!(result, vec![prediction("C", 0.4), prediction("A", 0.3)]);
  }

  #[test]
  fn short_catalog_fails_instead_of_blank_label() {
    let scores = ScoreVector::from(vec![0.1, 0.2, 0.9]);
    let result = rank(&scores, &labels(&["A", "B"]), &RankingConfig::default());
    assert_eq!(
      result,
      Err(LabelMappingError::IndexOutOfRange {
        index: 2,
        catalog_len: 2
      })
    );
  }

  #[test]
  fn short_catalog_is_fine_when_missing_index_is_filtered() {
    let scores = ScoreVector::from(vec![0.9, 0.2, 0.1]);
    let result = rank(&scores, &labels(&["A", "B"]), &RankingConfig::default()).unwrap();
    assert_eq!(result, vec![prediction("A", 0.9)]);
  }
}
