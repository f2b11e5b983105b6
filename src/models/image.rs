//! 图片来源
//!
//! 试卷图片由外部渲染流程生成，这里只负责把它读进来，
//! 并包装成整批共享的只读数据。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use tracing::info;

use crate::error::{AppError, AppResult, FileError};

/// 整批共享的图片字节
///
/// 内部是 `Arc<[u8]>`，clone 只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleImage {
    bytes: Arc<[u8]>,
}

impl SampleImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 根据文件头判断 MIME 类型，识别不了时按 PNG 处理
    pub fn mime_type(&self) -> &'static str {
        let b = self.as_bytes();
        if b.starts_with(&[0x89, b'P', b'N', b'G']) {
            "image/png"
        } else if b.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else if b.starts_with(b"GIF8") {
            "image/gif"
        } else if b.len() >= 12 && &b[0..4] == b"RIFF" && &b[8..12] == b"WEBP" {
            "image/webp"
        } else {
            "image/png"
        }
    }

    /// `data:<mime>;base64,<payload>` 形式的 URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            general_purpose::STANDARD.encode(self.as_bytes())
        )
    }
}

impl From<Vec<u8>> for SampleImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// 图片生产者
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self) -> AppResult<SampleImage>;
}

/// 从磁盘读取已经渲染好的图片
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn load(&self) -> AppResult<SampleImage> {
        let path_str = self.path.display().to_string();

        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| AppError::file_read_failed(path_str.clone(), e))?;
        if !exists {
            return Err(FileError::NotFound { path: path_str }.into());
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::file_read_failed(path_str.clone(), e))?;

        if bytes.is_empty() {
            return Err(FileError::Empty { path: path_str }.into());
        }

        info!("🖼️ 已读取图片: {} ({} 字节)", path_str, bytes.len());
        Ok(SampleImage::from(bytes))
    }
}
