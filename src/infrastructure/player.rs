//! 媒体播放器 - 基础设施层
//!
//! 播放器契约与无头实现。播放器由编排层独占指挥，其他组件一律
//! 不得直接操作播放状态。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::source::MediaReference;

/// 播放器回传事件
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// 媒体就绪，可以播放
    Ready,
    /// 播放进度（已播放秒数）
    Progress(f64),
    /// 播放错误（原始信息）
    Error(String),
}

/// 媒体播放器契约
///
/// 定位 / 跳转 / 启停均为命令式接口；进度与就绪通过事件通道
/// 回传。切换媒体源不要求重建播放器。
pub trait MediaPlayer: Send {
    /// 装载（或重定向到）一个媒体源
    fn load(&mut self, media: &MediaReference);

    /// 跳转到指定秒
    fn seek(&mut self, seconds: f64);

    /// 设置播放 / 暂停
    fn set_playing(&mut self, playing: bool);
}

#[derive(Debug, Default)]
struct ClockState {
    position: f64,
    playing: bool,
    loaded: bool,
    /// load 之后待发送的就绪事件
    pending_ready: bool,
}

/// 时钟播放器
///
/// 无头环境下的播放器实现：装载后按挂钟每秒推进一次播放位置，
/// 并把进度打到事件通道。seek / 启停语义与嵌入式播放器一致。
pub struct ClockPlayer {
    state: Arc<Mutex<ClockState>>,
    ticker: JoinHandle<()>,
}

impl ClockPlayer {
    /// 创建播放器，进度事件写入 `events`
    pub fn new(events: mpsc::Sender<PlayerEvent>) -> Self {
        let state = Arc::new(Mutex::new(ClockState::default()));

        let ticker_state = state.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;

                // 不跨 await 持锁
                let (event, progress) = {
                    let mut st = ticker_state.lock().expect("播放器状态锁中毒");
                    if st.pending_ready {
                        st.pending_ready = false;
                        (Some(PlayerEvent::Ready), None)
                    } else if st.loaded && st.playing {
                        st.position += 1.0;
                        (None, Some(st.position))
                    } else {
                        (None, None)
                    }
                };

                if let Some(ev) = event {
                    if events.send(ev).await.is_err() {
                        return;
                    }
                }
                if let Some(pos) = progress {
                    if events.send(PlayerEvent::Progress(pos)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Self { state, ticker }
    }
}

impl MediaPlayer for ClockPlayer {
    fn load(&mut self, media: &MediaReference) {
        debug!("装载媒体源 [{}]: {}", media.type_label(), media.display_name());
        let mut st = self.state.lock().expect("播放器状态锁中毒");
        st.loaded = true;
        st.playing = false;
        st.position = 0.0;
        st.pending_ready = true;
    }

    fn seek(&mut self, seconds: f64) {
        debug!("跳转到 {:.0} 秒", seconds);
        let mut st = self.state.lock().expect("播放器状态锁中毒");
        st.position = seconds;
    }

    fn set_playing(&mut self, playing: bool) {
        let mut st = self.state.lock().expect("播放器状态锁中毒");
        st.playing = playing;
    }
}

impl Drop for ClockPlayer {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
