// 该文件是 Bahan （食材识别） 项目的一部分。
// src/main.rs - 食材识别 HTTP 服务
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bahan::{
  FromUrl,
  label::LabelCatalog,
  model::{InferenceAdapter, OnnxClassifierBuilder},
  pipeline::ClassifyPipeline,
  postprocess::RankingConfig,
  server::{AppState, ServerConfig, router, upload_limit_bytes},
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("分类器实例数量: {}", args.pool_size);

  if args.pool_size == 0 {
    anyhow::bail!("分类器实例数量必须大于 0");
  }

  let labels = match &args.labels {
    Some(url) => LabelCatalog::from_url(url)?,
    None => {
      info!("未指定标签文件，使用内置食材列表");
      LabelCatalog::ingredients()
    }
  };

  let builder = OnnxClassifierBuilder::from_url(&args.model)?;
  let instances = (0..args.pool_size)
    .map(|_| builder.build())
    .collect::<Result<Vec<_>, _>>()?;
  let adapter = InferenceAdapter::with_pool(instances)?;

  let ranking = RankingConfig::default()
    .with_top_k(args.top_k)
    .with_threshold(args.confidence);
  let pipeline = ClassifyPipeline::new(adapter, labels, ranking)?;

  let Some(max_upload_bytes) = upload_limit_bytes(args.max_upload_mb) else {
    anyhow::bail!("上传大小上限 {} MiB 过大", args.max_upload_mb);
  };
  let config = ServerConfig {
    error_exposure: args.error_detail,
    max_upload_bytes,
  };
  let app = router(AppState::new(pipeline, config));

  let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
  info!("服务监听于 {}", listener.local_addr()?);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("服务已退出");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("无法监听退出信号: {}", e);
    std::future::pending::<()>().await;
  }
  info!("收到退出信号，正在关闭服务...");
}
