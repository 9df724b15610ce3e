//! 媒体源解析服务 - 业务能力层
//!
//! 只负责"把用户输入变成类型化媒体引用"这一能力，不关心流程。
//! 字符串分类纯语法判断，无任何网络 I/O。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::models::source::{MediaReference, StreamingPlatform};

/// YouTube 视频 ID 的固定长度
const YOUTUBE_ID_LEN: usize = 11;

/// 媒体源解析服务
///
/// 职责：
/// - 识别 YouTube / Vimeo / 一般 URL / 本地文件
/// - 为本地文件铸造临时句柄（blob），并负责显式释放
/// - 不出现 Vec<ExamPart>
/// - 不关心流程顺序
pub struct SourceResolver {
    youtube_re: Regex,
    blob_counter: AtomicU64,
}

impl SourceResolver {
    /// 创建新的解析服务
    pub fn new() -> Self {
        // 与生成侧共用的 YouTube URL 形状匹配
        let youtube_re =
            Regex::new(r"(youtu\.be/|v/|u/\w/|embed/|watch\?v=|shorts/|&v=)([^#&?]*)")
                .expect("YouTube 正则编译失败");
        Self {
            youtube_re,
            blob_counter: AtomicU64::new(0),
        }
    }

    /// 解析用户输入的字符串源
    ///
    /// 每次输入变化都会调用，失败返回 None 而不是错误。
    pub fn resolve(&self, input: &str) -> Option<MediaReference> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(id) = self.extract_youtube_id(trimmed) {
            debug!("识别为 YouTube 源，视频 ID: {}", id);
            return Some(MediaReference::Streaming {
                platform: StreamingPlatform::Youtube,
                locator: trimmed.to_string(),
            });
        }

        if trimmed.contains("vimeo.com") {
            return Some(MediaReference::Streaming {
                platform: StreamingPlatform::Vimeo,
                locator: trimmed.to_string(),
            });
        }

        // 其余只要是合法的绝对 URL 就按一般远程源接受
        if reqwest::Url::parse(trimmed).is_ok() {
            return Some(MediaReference::Remote {
                locator: trimmed.to_string(),
            });
        }

        None
    }

    /// 解析本地媒体文件
    ///
    /// 总是成功（文件可读的前提下）：把文件内容复制为一个临时
    /// blob 句柄，保留原文件名用于展示。
    pub fn resolve_file(&self, path: &Path) -> Result<MediaReference> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let locator = self.mint_blob(path, &display_name)?;
        debug!("本地文件已铸造 blob 句柄: {}", locator);

        Ok(MediaReference::Local {
            locator,
            display_name,
        })
    }

    /// 释放媒体引用持有的临时资源
    ///
    /// 槽位被覆盖或会话结束时必须调用，不依赖隐式回收。
    /// 非本地引用无资源可释放，调用是空操作。
    pub fn release(&self, media: &MediaReference) {
        if let MediaReference::Local { locator, .. } = media {
            if let Some(path) = locator.strip_prefix("blob:") {
                if let Err(e) = std::fs::remove_file(path) {
                    debug!("释放 blob 失败 {}: {}", path, e);
                } else {
                    debug!("已释放 blob: {}", path);
                }
            }
        }
    }

    /// 从 URL 中提取 YouTube 视频 ID（生成侧也会用到）
    pub fn extract_youtube_id(&self, url: &str) -> Option<String> {
        let caps = self.youtube_re.captures(url.trim())?;
        let id = caps.get(2)?.as_str();
        if id.len() == YOUTUBE_ID_LEN {
            Some(id.to_string())
        } else {
            None
        }
    }

    /// 把文件复制到临时目录并返回 blob 定位串
    fn mint_blob(&self, path: &Path, display_name: &str) -> Result<String> {
        let seq = self.blob_counter.fetch_add(1, Ordering::Relaxed);
        let target: PathBuf = std::env::temp_dir().join(format!(
            "listening_mock_exam_blob_{}_{}_{}",
            std::process::id(),
            seq,
            display_name
        ));
        std::fs::copy(path, &target)
            .with_context(|| format!("无法读取本地文件: {}", path.display()))?;
        Ok(format!("blob:{}", target.display()))
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new()
    }
}
