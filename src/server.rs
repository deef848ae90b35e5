// 该文件是 Bahan （食材识别） 项目的一部分。
// src/server.rs - HTTP 服务
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
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{
  model::Classifier,
  pipeline::{ClassifyPipeline, PipelineError},
};

mod routes;

pub const CLASSIFY_ROUTE: &str = "/klasifikasi_gambar";
pub const HEALTH_ROUTE: &str = "/health";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const GENERIC_ERROR_MESSAGE: &str = "Gagal memproses gambar";

/// 流水线错误对外暴露的程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ErrorExposure {
  /// 只返回固定的提示信息
  #[default]
  Generic,
  /// 返回流水线错误的描述信息
  Detailed,
}

impl ErrorExposure {
  pub fn message(&self, error: &PipelineError) -> String {
    match self {
      ErrorExposure::Generic => GENERIC_ERROR_MESSAGE.to_string(),
      ErrorExposure::Detailed => error.to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub error_exposure: ErrorExposure,
  pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      error_exposure: ErrorExposure::default(),
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
  }
}

/// 将 MiB 转换为字节数，溢出时返回 `None`
pub fn upload_limit_bytes(mib: usize) -> Option<usize> {
  mib.checked_mul(1024 * 1024)
}

pub struct AppState<C> {
  pub pipeline: Arc<ClassifyPipeline<C>>,
  pub config: ServerConfig,
}

impl<C> AppState<C> {
  pub fn new(pipeline: ClassifyPipeline<C>, config: ServerConfig) -> Self {
    Self {
      pipeline: Arc::new(pipeline),
      config,
    }
  }
}

pub fn router<C: Classifier + 'static>(state: AppState<C>) -> Router {
  let max_upload_bytes = state.config.max_upload_bytes;

  Router::new()
    .route(CLASSIFY_ROUTE, post(routes::classify_image::<C>))
    .route(HEALTH_ROUTE, get(routes::health::<C>))
    .with_state(Arc::new(state))
    .layer(DefaultBodyLimit::max(max_upload_bytes))
    .layer(TraceLayer::new_for_http())
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
}
