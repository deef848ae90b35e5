// 该文件是 Bahan （食材识别） 项目的一部分。
// src/frame.rs - NHWC 张量定义
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

use image::RgbImage;

pub const RGB_CHANNELS: usize = 3;
pub const BATCH_SIZE: usize = 1;

const PIXEL_SCALE: f32 = 255.0;

/// 分类器声明的输入形状 `[1, H, W, 3]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
  pub height: usize,
  pub width: usize,
}

impl InputShape {
  pub fn new(height: usize, width: usize) -> Self {
    Self { height, width }
  }

  pub fn dims(&self) -> [usize; 4] {
    [BATCH_SIZE, self.height, self.width, RGB_CHANNELS]
  }

  /// 从模型元数据中的维度解析输入形状。
  ///
  /// 批次维允许为动态（负数），高、宽必须为正且不超过 `u32::MAX`，通道必须为 3。
  pub fn from_dims(dims: &[i64]) -> Option<Self> {
    let [batch, height, width, channels] = dims else {
      return None;
    };
    if *batch >= 0 && *batch as usize != BATCH_SIZE {
      return None;
    }
    if *channels != RGB_CHANNELS as i64 {
      return None;
    }
    let height = u32::try_from(*height).ok().filter(|&h| h > 0)?;
    let width = u32::try_from(*width).ok().filter(|&w| w > 0)?;
    Some(Self::new(height as usize, width as usize))
  }
}

/// 归一化后的 NHWC 浮点张量，形状固定为 `[1, H, W, 3]`，取值范围 `[0.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor {
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl NhwcTensor {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let data = vec![0.0f32; height * width * RGB_CHANNELS].into_boxed_slice();
    Self {
      height,
      width,
      data,
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn shape(&self) -> [usize; 4] {
    [BATCH_SIZE, self.height, self.width, RGB_CHANNELS]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<f32> {
    self.data.into_vec()
  }
}

impl AsMut<[f32]> for NhwcTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl From<&RgbImage> for NhwcTensor {
  fn from(image: &RgbImage) -> Self {
    let mut tensor = {
      let (width, height) = image.dimensions();
      NhwcTensor::with_shape(height as usize, width as usize)
    };

    let channels = tensor.channels();
    let width = tensor.width();
    let slice = tensor.as_mut();

    for (w, h, pixel) in image.enumerate_pixels() {
      let base = (h as usize) * width * channels + (w as usize) * channels;
      for c in 0..channels {
        slice[base + c] = f32::from(pixel[c]) / PIXEL_SCALE;
      }
    }
    tensor
  }
}
