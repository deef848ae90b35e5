// 该文件是 Bahan （食材识别） 项目的一部分。
// tests/server.rs - HTTP 服务测试
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

use std::{io::Cursor, net::SocketAddr};

use bahan::{
  frame::{InputShape, NhwcTensor},
  label::LabelCatalog,
  model::{Classifier, InferenceAdapter},
  output::{ClassifyResponse, DetectedIngredient, ErrorResponse},
  pipeline::ClassifyPipeline,
  postprocess::RankingConfig,
  server::{AppState, CLASSIFY_ROUTE, ErrorExposure, HEALTH_ROUTE, ServerConfig, router},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::{
  StatusCode,
  multipart::{Form, Part},
};

#[derive(Debug, thiserror::Error)]
#[error("never")]
struct Never;

struct Fixed;

impl Classifier for Fixed {
  type Error = Never;

  fn input_shape(&self) -> InputShape {
    InputShape::new(16, 16)
  }

  fn output_len(&self) -> usize {
    3
  }

  fn invoke(&mut self, _input: NhwcTensor) -> Result<Vec<f32>, Self::Error> {
    Ok(vec![0.25, 0.875, 0.625])
  }
}

async fn spawn_server(error_exposure: ErrorExposure, pool_size: usize) -> SocketAddr {
  let config = ServerConfig {
    error_exposure,
    ..ServerConfig::default()
  };
  spawn_server_with(config, pool_size).await
}

async fn spawn_server_with(config: ServerConfig, pool_size: usize) -> SocketAddr {
  let adapter = InferenceAdapter::with_pool((0..pool_size).map(|_| Fixed).collect()).unwrap();
  let pipeline = ClassifyPipeline::new(
    adapter,
    LabelCatalog::new(["Tahu", "Tempe", "Telur"]),
    RankingConfig::default(),
  )
  .unwrap();
  let app = router(AppState::new(pipeline, config));

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  addr
}

fn png() -> Vec<u8> {
  let mut bytes = Vec::new();
  DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 160, 90])))
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    .unwrap();
  bytes
}

fn upload(bytes: Vec<u8>, file_name: &str) -> Form {
  Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()))
}

async fn post(addr: SocketAddr, form: Form) -> reqwest::Response {
  reqwest::Client::new()
    .post(format!("http://{}{}", addr, CLASSIFY_ROUTE))
    .multipart(form)
    .send()
    .await
    .unwrap()
}

#[tokio::test]
async fn upload_returns_detected_ingredients() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, upload(png(), "piring.png")).await;
  assert_eq!(response.status(), StatusCode::OK);
  let body: ClassifyResponse = response.json().await.unwrap();
  assert_eq!(
    body.bahan_terdeteksi,
    vec![
      DetectedIngredient {
        bahan: "Tempe".to_string(),
        confidence: 0.875
      },
      DetectedIngredient {
        bahan: "Telur".to_string(),
        confidence: 0.625
      },
    ]
  );
}

#[tokio::test]
async fn missing_file_field_is_a_bad_request() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, Form::new().text("catatan", "tanpa gambar")).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: ErrorResponse = response.json().await.unwrap();
  assert_eq!(body.error, "Tidak ada file gambar");
}

#[tokio::test]
async fn empty_file_is_a_bad_request() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, upload(Vec::new(), "kosong.png")).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: ErrorResponse = response.json().await.unwrap();
  assert_eq!(body.error, "File gambar kosong");
}

#[tokio::test]
async fn file_part_without_file_name_counts_as_missing() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, Form::new().part("file", Part::bytes(png()))).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: ErrorResponse = response.json().await.unwrap();
  assert_eq!(body.error, "Tidak ada file gambar");
}

#[tokio::test]
async fn empty_file_name_is_a_bad_request() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, upload(png(), "")).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: ErrorResponse = response.json().await.unwrap();
  assert_eq!(body.error, "File belum dipilih");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
  let config = ServerConfig {
    max_upload_bytes: 1024,
    ..ServerConfig::default()
  };
  let addr = spawn_server_with(config, 1).await;

  let response = post(addr, upload(vec![0u8; 8 * 1024], "besar.png")).await;
  assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn corrupt_image_hides_details_by_default() {
  let addr = spawn_server(ErrorExposure::Generic, 1).await;

  let response = post(addr, upload(b"bukan gambar".to_vec(), "rusak.png")).await;
  assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: ErrorResponse = response.json().await.unwrap();
  assert_eq!(body.error, "Gagal memproses gambar");
}

#[tokio::test]
async fn corrupt_image_reports_details_when_enabled() {
  let addr = spawn_server(ErrorExposure::Detailed, 1).await;

  let response = post(addr, upload(b"bukan gambar".to_vec(), "rusak.png")).await;
  assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: ErrorResponse = response.json().await.unwrap();
  assert!(body.error.starts_with("Unsupported or corrupt image"));
}

#[tokio::test]
async fn concurrent_uploads_share_the_pool() {
  let addr = spawn_server(ErrorExposure::Generic, 2).await;

  let requests = (0..8).map(|i| post(addr, upload(png(), &format!("{}.png", i))));
  for response in join_all(requests).await {
    assert_eq!(response.status(), StatusCode::OK);
  }
}

async fn join_all<F: std::future::Future<Output = reqwest::Response> + Send + 'static>(
  requests: impl Iterator<Item = F>,
) -> Vec<reqwest::Response> {
  let handles: Vec<_> = requests.map(tokio::spawn).collect();
  let mut responses = Vec::with_capacity(handles.len());
  for handle in handles {
    responses.push(handle.await.unwrap());
  }
  responses
}

#[tokio::test]
async fn health_reports_model_shape() {
  let addr = spawn_server(ErrorExposure::Generic, 2).await;

  let body: serde_json::Value = reqwest::get(format!("http://{}{}", addr, HEALTH_ROUTE))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
  assert_eq!(
    body,
    serde_json::json!({
      "status": "ok",
      "input_shape": [1, 16, 16, 3],
      "classes": 3,
      "pool_size": 2,
      "top_k": 3,
      "threshold": 0.5
    })
  );
}
