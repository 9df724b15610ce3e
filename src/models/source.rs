//! 媒体源引用模型
//!
//! 用户输入（URL / 本地文件）解析后的类型化媒体引用。
//! 一旦创建即不可变；输入变化时整体替换，不做字段级修改。

use serde::{Deserialize, Serialize};

/// 流媒体平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingPlatform {
    Youtube,
    Vimeo,
}

/// 类型化媒体引用（和类型，消费方必须穷举处理所有变体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaReference {
    /// 已识别的流媒体平台源
    Streaming {
        platform: StreamingPlatform,
        locator: String,
    },
    /// 其他合法的绝对 URL
    Remote { locator: String },
    /// 本地上传文件（locator 为临时句柄，需显式释放）
    Local {
        locator: String,
        display_name: String,
    },
}

impl MediaReference {
    /// 媒体定位串（交给播放器或生成网关）
    pub fn locator(&self) -> &str {
        match self {
            MediaReference::Streaming { locator, .. } => locator,
            MediaReference::Remote { locator } => locator,
            MediaReference::Local { locator, .. } => locator,
        }
    }

    /// 展示名称
    pub fn display_name(&self) -> &str {
        match self {
            MediaReference::Streaming { locator, .. } => locator,
            MediaReference::Remote { locator } => locator,
            MediaReference::Local { display_name, .. } => display_name,
        }
    }

    /// 是否为本地上传源
    pub fn is_local(&self) -> bool {
        matches!(self, MediaReference::Local { .. })
    }

    /// 源类型标签（用于日志显示）
    pub fn type_label(&self) -> &'static str {
        match self {
            MediaReference::Streaming {
                platform: StreamingPlatform::Youtube,
                ..
            } => "youtube",
            MediaReference::Streaming {
                platform: StreamingPlatform::Vimeo,
                ..
            } => "vimeo",
            MediaReference::Remote { .. } => "other",
            MediaReference::Local { .. } => "local",
        }
    }
}
