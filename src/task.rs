// 该文件是 Bahan （食材识别） 项目的一部分。
// src/task.rs - 批量识别与基准任务
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

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{
  input::InputImage,
  model::Classifier,
  output::Render,
  pipeline::ClassifyPipeline,
  postprocess::Prediction,
};

const REPEAT_WARMUP: usize = 2;

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: P, output: O) -> Result<(), Self::Error>;
}

/// 对输入中的每张图像依次识别；单张图像失败只记录日志，不终止任务
#[derive(Default, Debug)]
pub struct ContinuousTask {
  image_limit: Option<usize>,
}

impl ContinuousTask {
  pub fn with_image_limit(mut self, image_limit: Option<usize>) -> Self {
    self.image_limit = image_limit;
    self
  }
}

impl<
  'p,
  C: Classifier,
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<InputImage, IE>>,
  O: Render<InputImage, [Prediction], Error = RE>,
> Task<I, &'p ClassifyPipeline<C>, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: &'p ClassifyPipeline<C>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut detections = 0usize;

    for image in input {
      if self.image_limit.map(|n| processed + failed >= n).unwrap_or(false) {
        info!("达到指定图像数 {}, 退出任务循环", processed + failed);
        break;
      }

      let image = match image {
        Ok(image) => image,
        Err(e) => {
          warn!("读取图像失败: {}", e);
          failed += 1;
          continue;
        }
      };

      let now = Instant::now();
      match pipeline.classify(&image.bytes) {
        Ok(predictions) => {
          info!("{} 识别完成，耗时: {:.2?}", image.name, now.elapsed());
          detections += predictions.len();
          output.render_result(&image, &predictions)?;
          processed += 1;
        }
        Err(e) => {
          warn!("{} 识别失败 ({}): {}", image.name, e.kind().as_str(), e);
          failed += 1;
        }
      }
    }

    info!(
      "任务完成: 成功 {} 张, 失败 {} 张, 共识别 {} 个食材",
      processed, failed, detections
    );
    Ok(())
  }
}

/// 对同一张图像重复识别，统计平均耗时（排除前两次预热）
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 100 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

fn average_after_warmup(times: &[Duration]) -> Duration {
  let skip = if times.len() > REPEAT_WARMUP {
    REPEAT_WARMUP
  } else {
    0
  };
  let measured = &times[skip..];
  if measured.is_empty() {
    return Duration::ZERO;
  }
  measured.iter().sum::<Duration>() / measured.len() as u32
}

impl<
  'p,
  C: Classifier,
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<InputImage, IE>>,
  O: Render<InputImage, [Prediction], Error = RE>,
> Task<I, &'p ClassifyPipeline<C>, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: &'p ClassifyPipeline<C>, output: O) -> Result<(), Self::Error> {
    if self.repeat_times == 0 {
      anyhow::bail!("重复次数必须大于 0");
    }

    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))??;
    info!("输入图像获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = Vec::new();
    for i in 0..self.repeat_times {
      let now = Instant::now();
      last = pipeline.classify(&image.bytes)?;
      let elapsed = now.elapsed();
      info!("({})识别完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
    }
    output.render_result(&image, &last)?;

    warn!("平均识别时间: {:.2?}", average_after_warmup(&times));
    Ok(())
  }
}
