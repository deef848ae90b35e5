// 该文件是 Bahan （食材识别） 项目的一部分。
// src/input.rs - 图像输入与预处理
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

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::debug;

use crate::FromUrl;
use crate::frame::NhwcTensor;

/// 缩放滤波器，固定以保证相同输入得到相同输出
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("Image data is empty")]
  Empty,
  #[error("Unsupported or corrupt image: {0}")]
  Image(#[from] image::ImageError),
  #[error("Invalid target size {width}x{height}")]
  InvalidTargetSize { width: usize, height: usize },
}

/// 将编码后的图像字节解码为 `[1, height, width, 3]` 的归一化张量。
///
/// 任意颜色模式都会被转换为 RGB（丢弃 alpha，灰度扩展为三通道），
/// 之后直接缩放（不裁剪）到目标尺寸，并将像素值除以 255。
pub fn decode_to_tensor(bytes: &[u8], width: u32, height: u32) -> Result<NhwcTensor, DecodeError> {
  if width == 0 || height == 0 {
    return Err(DecodeError::InvalidTargetSize {
      width: width as usize,
      height: height as usize,
    });
  }
  if bytes.is_empty() {
    return Err(DecodeError::Empty);
  }

  let image = image::load_from_memory(bytes)?;
  debug!(
    "解码图像: {}x{} {:?}",
    image.width(),
    image.height(),
    image.color()
  );

  let rgb = image.to_rgb8();
  let rgb = if rgb.dimensions() == (width, height) {
    rgb
  } else {
    imageops::resize(&rgb, width, height, RESIZE_FILTER)
  };

  Ok(NhwcTensor::from(&rgb))
}

/// 待分类的原始图像
#[derive(Debug, Clone)]
pub struct InputImage {
  /// 图像来源名称（通常为文件名）
  pub name: String,
  /// 编码后的图像数据
  pub bytes: Vec<u8>,
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{
  DirectoryInput, DirectoryInputIter, ImageFileInput, ImageFileInputError,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "read_image_file")]
  ReadDirectory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
      if url.scheme() == DirectoryInput::SCHEME {
        let input = DirectoryInput::from_url(url)?;
        return Ok(InputWrapper::ReadDirectory(input));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

impl IntoIterator for InputWrapper {
  type Item = Result<InputImage, InputError>;
  type IntoIter = InputWrapperIter;

  fn into_iter(self) -> Self::IntoIter {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => InputWrapperIter::ReadImageFile(input.into_iter()),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadDirectory(input) => InputWrapperIter::ReadDirectory(input.into_iter()),
    }
  }
}

pub enum InputWrapperIter {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(std::option::IntoIter<InputImage>),
  #[cfg(feature = "read_image_file")]
  ReadDirectory(DirectoryInputIter),
}

impl Iterator for InputWrapperIter {
  type Item = Result<InputImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapperIter::ReadImageFile(input) => input.next().map(Ok),
      #[cfg(feature = "read_image_file")]
      InputWrapperIter::ReadDirectory(input) => {
        input.next().map(|item| item.map_err(InputError::from))
      }
      #[allow(unreachable_patterns)]
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
  use std::io::Cursor;

  fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
  }

  #[test]
  fn decoded_tensor_has_target_shape_and_unit_range() {
    let image = RgbaImage::from_fn(37, 19, |x, y| {
      Rgba([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8, 128])
    });
    let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);

    let tensor = decode_to_tensor(&bytes, 32, 24).unwrap();
    assert_eq!(tensor.shape(), [1, 24, 32, 3]);
    assert_eq!(tensor.as_slice().len(), 24 * 32 * 3);
    assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn grayscale_is_expanded_to_three_channels() {
    let image = GrayImage::from_pixel(8, 8, Luma([255]));
    let bytes = encode(DynamicImage::ImageLuma8(image), ImageFormat::Png);

    let tensor = decode_to_tensor(&bytes, 4, 4).unwrap();
    assert_eq!(tensor.shape(), [1, 4, 4, 3]);
    assert!(tensor.as_slice().iter().all(|v| *v == 1.0));
  }

  #[test]
  fn decoding_is_deterministic() {
    let image = RgbaImage::from_fn(50, 30, |x, y| Rgba([x as u8, y as u8, 200, 255]));
    let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);

    let first = decode_to_tensor(&bytes, 16, 16).unwrap();
    let second = decode_to_tensor(&bytes, 16, 16).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn empty_bytes_fail_to_decode() {
    assert!(matches!(
      decode_to_tensor(&[], 224, 224),
      Err(DecodeError::Empty)
    ));
  }

  #[test]
  fn non_image_bytes_fail_to_decode() {
    let result = decode_to_tensor(b"definitely not an image", 224, 224);
    assert!(matches!(result, Err(DecodeError::Image(_))));
  }

  #[test]
  fn truncated_png_fails_to_decode() {
    let image = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
    let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);

    let result = decode_to_tensor(&bytes[..bytes.len() / 2], 32, 32);
    assert!(matches!(result, Err(DecodeError::Image(_))));
  }

  #[test]
  fn zero_target_size_is_rejected() {
    let image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
    let bytes = encode(DynamicImage::ImageRgba8(image), ImageFormat::Png);

    assert!(matches!(
      decode_to_tensor(&bytes, 0, 4),
      Err(DecodeError::InvalidTargetSize { width: 0, height: 4 })
    ));
  }
}
