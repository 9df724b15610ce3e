//! 播报服务 - 业务能力层
//!
//! "说完一句话再继续"的顺序播报原语。对调用方永远成功返回——
//! 内部有自己的超时兜底，新播报会取消进行中的播报。
//! 编排层在每个播放阶段之前 await 这里。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 播报网关契约
///
/// `speak` 的失败由编排层吞掉（只记日志），播报不可用绝不能
/// 阻塞考试推进。
pub trait NarrationGate: Send + Sync {
    /// 播报一段文字，说完（或内部超时放弃）后返回
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>>;

    /// 与考试暂停联动：暂停期间播报不得继续
    fn set_paused(&self, paused: bool);
}

/// 控制台播报器
///
/// 无头环境下的播报实现：把文案打到日志，并按字数模拟朗读
/// 耗时。行为契约与真实 TTS 相同：
/// - 永远成功返回
/// - 整体受内部超时约束
/// - 新播报取消进行中的播报
pub struct ConsoleNarrator {
    /// 单次播报的内部超时
    timeout: Duration,
    /// 每个字符的模拟朗读耗时
    per_char: Duration,
    paused: AtomicBool,
    /// 播报序号，新播报递增以取消旧播报
    utterance_seq: AtomicU64,
}

impl ConsoleNarrator {
    /// 创建播报器
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            per_char: Duration::from_millis(50),
            paused: AtomicBool::new(false),
            utterance_seq: AtomicU64::new(0),
        }
    }

    /// 调整每字符朗读耗时（测试用快进）
    pub fn with_per_char(mut self, per_char: Duration) -> Self {
        self.per_char = per_char;
        self
    }
}

impl NarrationGate for ConsoleNarrator {
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // 取消进行中的播报
            let my_seq = self.utterance_seq.fetch_add(1, Ordering::SeqCst) + 1;

            let text = text.trim();
            if text.is_empty() {
                return Ok(());
            }

            info!("🔊 播报: {}", text);

            let total = self.per_char * text.chars().count() as u32;
            let total = total.min(self.timeout);
            let slice = Duration::from_millis(100);
            let mut spoken = Duration::ZERO;

            while spoken < total {
                sleep(slice.min(total - spoken)).await;

                if self.utterance_seq.load(Ordering::SeqCst) != my_seq {
                    debug!("播报被新的播报取消");
                    return Ok(());
                }
                // 暂停期间不推进朗读进度
                if !self.paused.load(Ordering::SeqCst) {
                    spoken += slice;
                }
            }

            Ok(())
        })
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        if paused {
            warn!("⏸️ 播报已暂停");
        } else {
            debug!("播报已恢复");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_speak_resolves() {
        let narrator =
            ConsoleNarrator::new(Duration::from_secs(1)).with_per_char(Duration::from_millis(1));
        narrator.speak("テスト").await.expect("播报不应失败");
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let narrator = ConsoleNarrator::new(Duration::from_secs(1));
        narrator.speak("   ").await.expect("空文案直接返回");
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_bounded_by_timeout() {
        // 1000 字符 × 50ms 远超 200ms 超时，也必须按时返回
        let narrator = ConsoleNarrator::new(Duration::from_millis(200));
        let long_text = "あ".repeat(1000);
        tokio::time::timeout(Duration::from_secs(5), narrator.speak(&long_text))
            .await
            .expect("播报必须受内部超时约束")
            .expect("播报不应失败");
    }
}
