// 该文件是 Bahan （食材识别） 项目的一部分。
// src/args.rs - 服务参数配置
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

use bahan::server::ErrorExposure;
use clap::Parser;
use url::Url;

/// Bahan 食材识别服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///models/bahan.onnx?threads=2
  #[arg(long, env = "BAHAN_MODEL", value_name = "MODEL")]
  pub model: Url,

  /// 标签文件路径，例如 labels:///models/labels.txt；缺省时使用内置的 35 种食材
  #[arg(long, env = "BAHAN_LABELS", value_name = "LABELS")]
  pub labels: Option<Url>,

  /// 监听地址
  #[arg(long, env = "BAHAN_HOST", default_value = "0.0.0.0")]
  pub host: String,

  /// 监听端口
  #[arg(long, env = "BAHAN_PORT", default_value_t = 5001)]
  pub port: u16,

  /// 最多返回的食材数量
  #[arg(long, env = "BAHAN_TOP_K", default_value_t = bahan::postprocess::DEFAULT_TOP_K)]
  pub top_k: usize,

  /// 置信度阈值 (0.0 - 1.0)，只保留严格大于阈值的结果
  #[arg(
    long,
    env = "BAHAN_CONFIDENCE",
    default_value_t = bahan::postprocess::DEFAULT_CONFIDENCE_THRESHOLD,
    value_name = "THRESHOLD"
  )]
  pub confidence: f32,

  /// 分类器实例数量，大于 1 时请求可并行推理
  #[arg(long, env = "BAHAN_POOL_SIZE", default_value_t = 1, value_name = "COUNT")]
  pub pool_size: usize,

  /// 出错时返回给客户端的信息
  #[arg(long, env = "BAHAN_ERROR_DETAIL", value_enum, default_value_t = ErrorExposure::Generic)]
  pub error_detail: ErrorExposure,

  /// 上传文件大小上限 (MiB)
  #[arg(long, env = "BAHAN_MAX_UPLOAD_MB", default_value_t = 16, value_name = "MIB")]
  pub max_upload_mb: usize,
}
