// 该文件是 Bahan （食材识别） 项目的一部分。
// src/server/routes.rs - HTTP 路由处理
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

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartError},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
  model::Classifier,
  output::{ClassifyResponse, ErrorResponse},
  pipeline::PipelineError,
  server::AppState,
};

const FILE_FIELD: &str = "file";

pub(super) enum ApiError {
  MissingFile,
  EmptyFileName,
  EmptyFile,
  Multipart(MultipartError),
  Pipeline(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::MissingFile => (StatusCode::BAD_REQUEST, "Tidak ada file gambar".to_string()),
      ApiError::EmptyFileName => (StatusCode::BAD_REQUEST, "File belum dipilih".to_string()),
      ApiError::EmptyFile => (StatusCode::BAD_REQUEST, "File gambar kosong".to_string()),
      ApiError::Multipart(e) => (e.status(), e.body_text()),
      ApiError::Pipeline(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
    };
    (status, Json(ErrorResponse { error: message })).into_response()
  }
}

impl From<MultipartError> for ApiError {
  fn from(err: MultipartError) -> Self {
    ApiError::Multipart(err)
  }
}

pub(super) async fn classify_image<C: Classifier + 'static>(
  State(state): State<Arc<AppState<C>>>,
  mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, ApiError> {
  let mut upload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() != Some(FILE_FIELD) {
      continue;
    }
    let Some(file_name) = field.file_name().map(str::to_string) else {
      continue;
    };
    let data = field.bytes().await?;
    upload = Some((file_name, data));
    break;
  }

  let (file_name, data) = upload.ok_or(ApiError::MissingFile)?;
  if file_name.is_empty() {
    return Err(ApiError::EmptyFileName);
  }
  if data.is_empty() {
    return Err(ApiError::EmptyFile);
  }
  debug!("收到图像 {} ({} 字节)", file_name, data.len());

  let pipeline = state.pipeline.clone();
  let result = tokio::task::spawn_blocking(move || pipeline.classify(&data))
    .await
    .unwrap_or_else(|e| Err(PipelineError::Unexpected(e.to_string())));

  match result {
    Ok(predictions) => {
      info!("{}: 识别到 {} 种食材", file_name, predictions.len());
      Ok(Json(ClassifyResponse::from(predictions.as_slice())))
    }
    Err(e) => {
      error!("{} 识别失败 ({}): {}", file_name, e.kind().as_str(), e);
      Err(ApiError::Pipeline(state.config.error_exposure.message(&e)))
    }
  }
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
  status: &'static str,
  input_shape: [usize; 4],
  classes: usize,
  pool_size: usize,
  top_k: usize,
  threshold: f32,
}

pub(super) async fn health<C: Classifier + 'static>(
  State(state): State<Arc<AppState<C>>>,
) -> Json<HealthResponse> {
  let pipeline = &state.pipeline;
  Json(HealthResponse {
    status: "ok",
    input_shape: pipeline.input_shape().dims(),
    classes: pipeline.labels().len(),
    pool_size: pipeline.pool_size(),
    top_k: pipeline.ranking().top_k,
    threshold: pipeline.ranking().threshold,
  })
}
