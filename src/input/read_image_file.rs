// 该文件是 Bahan （食材识别） 项目的一部分。
// src/input/read_image_file.rs - 图像文件与目录输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::InputImage};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error on {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ImageFileInputError {
  fn io(path: &Path, source: std::io::Error) -> Self {
    ImageFileInputError::IoError {
      path: path.to_path_buf(),
      source,
    }
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

fn has_image_extension(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// 单个图像文件输入，`image:///path/to/photo.jpg`
pub struct ImageFileInput {
  image: Option<InputImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = PathBuf::from(url.path());
    let bytes = std::fs::read(&path).map_err(|e| ImageFileInputError::io(&path, e))?;
    info!("读取图像文件: {} ({} 字节)", path.display(), bytes.len());

    Ok(ImageFileInput {
      image: Some(InputImage {
        name: file_name(&path),
        bytes,
      }),
    })
  }
}

impl IntoIterator for ImageFileInput {
  type Item = InputImage;
  type IntoIter = std::option::IntoIter<InputImage>;

  fn into_iter(self) -> Self::IntoIter {
    self.image.into_iter()
  }
}

/// 目录输入，按文件名顺序逐个读取目录中的图像，`folder:///path/to/dir`
pub struct DirectoryInput {
  files: Vec<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let directory = PathBuf::from(url.path());
    let entries =
      std::fs::read_dir(&directory).map_err(|e| ImageFileInputError::io(&directory, e))?;

    let mut files = Vec::new();
    for entry in entries {
      let path = entry
        .map_err(|e| ImageFileInputError::io(&directory, e))?
        .path();
      if path.is_file() && has_image_extension(&path) {
        files.push(path);
      } else {
        debug!("跳过非图像文件: {}", path.display());
      }
    }
    files.sort();

    info!("目录 {} 中找到 {} 张图像", directory.display(), files.len());
    Ok(DirectoryInput { files })
  }
}

impl DirectoryInput {
  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl IntoIterator for DirectoryInput {
  type Item = Result<InputImage, ImageFileInputError>;
  type IntoIter = DirectoryInputIter;

  fn into_iter(self) -> Self::IntoIter {
    DirectoryInputIter {
      files: self.files.into_iter(),
    }
  }
}

pub struct DirectoryInputIter {
  files: std::vec::IntoIter<PathBuf>,
}

impl Iterator for DirectoryInputIter {
  type Item = Result<InputImage, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let image = std::fs::read(&path)
      .map(|bytes| InputImage {
        name: file_name(&path),
        bytes,
      })
      .map_err(|e| ImageFileInputError::io(&path, e));
    Some(image)
  }
}
