//! 错误归一化模块
//!
//! 将生成网关、播放器等处抛出的各种异构错误，统一归类为一个封闭的
//! 错误分类（taxonomy），并附带固定的用户提示文案（日语，面向考生）。
//! 原始错误信息原样保留，供用户复制导出诊断。

use std::fmt;

use tracing::error;

/// 错误分类（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 超时（timeout / deadline）
    Timeout,
    /// 频率限制 / 配额耗尽（429 / quota / exhausted）
    RateLimit,
    /// JSON 解析失败
    Parsing,
    /// URL 或 ID 无效
    InvalidInput,
    /// 网络连接错误
    Network,
    /// 播放器错误
    Playback,
    /// 未知错误（兜底）
    Unknown,
}

impl ErrorKind {
    /// 分类标签（用于日志和导出）
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::RateLimit => "API_ERROR",
            ErrorKind::Parsing => "PARSING_ERROR",
            ErrorKind::InvalidInput => "INVALID_URL",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Playback => "VIDEO_PLAYBACK_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// 固定的用户提示文案
    ///
    /// 文案与分类一一对应，不受原始错误内容影响。
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Timeout => {
                "AIの処理がタイムアウトしました。動画が長すぎるか、サーバーが混雑しています。別の動画を試すか、数分後に再試行してください。"
            }
            ErrorKind::RateLimit => "AIの利用制限に達しました。数分待ってから再度お試しください。",
            ErrorKind::Parsing => {
                "AIからの回答データの解析に失敗しました。AIが正しくJSONを生成できなかった可能性があります。"
            }
            ErrorKind::InvalidInput => {
                "YouTubeのURLまたはIDが正しくありません。入力内容を確認してください。"
            }
            ErrorKind::Network => {
                "ネットワーク接続エラーが発生しました。インターネット接続を確認してください。"
            }
            ErrorKind::Playback => {
                "再生エラーが発生しました。動画設定または通信環境を確認してください。"
            }
            ErrorKind::Unknown => "予期せぬエラーが発生しました。",
        }
    }
}

/// 错误发生的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStep {
    /// 源解析阶段
    Extract,
    /// 生成 API 调用阶段
    Api,
    /// 响应解析阶段
    Parse,
    /// 媒体播放阶段
    Playback,
}

impl fmt::Display for ErrorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStep::Extract => "extract",
            ErrorStep::Api => "api",
            ErrorStep::Parse => "parse",
            ErrorStep::Playback => "playback",
        };
        write!(f, "{}", s)
    }
}

/// 归一化后的应用错误
///
/// 创建后不可变；`raw_detail` 保留原始错误信息原文。
#[derive(Debug, Clone)]
pub struct AppError {
    /// 错误分类
    pub kind: ErrorKind,
    /// 用户提示文案（固定，与分类对应）
    pub user_message: String,
    /// 原始错误信息（诊断用）
    pub raw_detail: String,
    /// 所属 Part 标签（如 "A"）
    pub part_label: Option<String>,
    /// 发生阶段
    pub step: Option<ErrorStep>,
    /// 创建时间
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl AppError {
    /// 直接以播放器错误分类构造
    ///
    /// 播放器错误在事件回调处就已知分类，不经过关键词扫描。
    pub fn playback(raw_detail: impl Into<String>, part_label: Option<&str>) -> Self {
        Self {
            kind: ErrorKind::Playback,
            user_message: ErrorKind::Playback.user_message().to_string(),
            raw_detail: raw_detail.into(),
            part_label: part_label.map(str::to_string),
            step: Some(ErrorStep::Playback),
            timestamp: chrono::Local::now(),
        }
    }

    /// 输出分组错误日志
    pub fn log(&self) {
        error!(
            "❌ 错误 [{}] - Part {}",
            self.kind.label(),
            self.part_label.as_deref().unwrap_or("N/A")
        );
        error!("  用户提示: {}", self.user_message);
        error!("  原始信息: {}", self.raw_detail);
        if let Some(step) = self.step {
            error!("  发生阶段: {}", step);
        }
        error!("  时间: {}", self.timestamp.to_rfc3339());
    }

    /// 导出可复制的诊断文本
    pub fn export_text(&self) -> String {
        format!(
            "Error Type: {}\nMessage: {}\nDetail: {}\nPart: {}\nStep: {}\nTimestamp: {}",
            self.kind.label(),
            self.user_message,
            self.raw_detail,
            self.part_label.as_deref().unwrap_or("N/A"),
            self.step
                .map(|s| s.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            self.timestamp.to_rfc3339(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.user_message)
    }
}

impl std::error::Error for AppError {}

/// 归一化任意错误
///
/// 按固定优先级对小写后的错误信息做有序子串扫描，命中即停：
/// 超时 → 频率限制 → JSON 解析 → URL/ID 无效 → 网络 → 未知。
/// 优先级顺序不可调换（含多个关键词的信息按先命中的分类处理）。
pub fn normalize(
    raw: &(impl fmt::Display + ?Sized),
    part_label: Option<&str>,
    step: Option<ErrorStep>,
) -> AppError {
    let raw_detail = raw.to_string();
    let message = raw_detail.to_lowercase();

    // 1. 先判超时
    let kind = if message.contains("timeout") || message.contains("deadline") {
        ErrorKind::Timeout
    }
    // 2. 配额耗尽
    else if message.contains("429") || message.contains("quota") || message.contains("exhausted")
    {
        ErrorKind::RateLimit
    }
    // 3. 解析失败
    else if message.contains("json")
        || message.contains("parse")
        || message.contains("unexpected token")
    {
        ErrorKind::Parsing
    }
    // 4. URL/ID 无效（仅当不是超时等更高优先级时）
    else if message.contains("invalid") && (message.contains("url") || message.contains("id")) {
        ErrorKind::InvalidInput
    }
    // 5. 一般网络错误
    else if message.contains("fetch")
        || message.contains("network")
        || message.contains("connection")
    {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    };

    AppError {
        kind,
        user_message: kind.user_message().to_string(),
        raw_detail,
        part_label: part_label.map(str::to_string),
        step,
        timestamp: chrono::Local::now(),
    }
}
