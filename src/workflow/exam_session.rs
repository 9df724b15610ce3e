//! 考试进行流程 - 流程层
//!
//! 核心职责：驱动"播报 → 放送 → 等待 → 第二遍 → 换 Part → 收卷"
//! 的考试状态机。
//!
//! 流程顺序（每个 Part 放送两遍）：
//! 1. 开场播报 → Part 播报 → 第一遍放送
//! 2. 到达终点 → 30 秒等待（可暂停）
//! 3. 第二遍播报 → 第二遍放送
//! 4. 到达终点 → 下一个 Part，或收卷
//!
//! 播报失败一律吞掉只记日志，绝不阻塞考试推进。

use tracing::{info, warn};

use crate::error::AppError;
use crate::infrastructure::player::MediaPlayer;
use crate::models::exam::{AnswerSheet, ExamData};
use crate::narrations;
use crate::services::narration::NarrationGate;

/// 考试状态机的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    /// 待开始
    Ready,
    /// 播报中
    Narrating,
    /// 放送中
    Playing,
    /// 两遍之间的等待
    WaitingBetweenLaps,
    /// 收卷中
    Finishing,
}

/// 收卷回调：答题卡的唯一交接点
pub type FinishHandler = Box<dyn FnOnce(AnswerSheet) + Send>;

/// 考试会话
///
/// - 独占指挥播放器与播报通道，其他组件不得直接操作
/// - 进度事件 / 秒级计时由编排层喂入（handle_progress / tick_countdown）
/// - 暂停标志是计时器与终点检测动作前唯一要查询的仲裁者
pub struct ExamSession<N: NarrationGate, P: MediaPlayer> {
    data: ExamData,
    narrator: N,
    player: P,
    state: ExamState,
    /// 当前遍数（1 或 2）
    lap: u8,
    part_index: usize,
    paused: bool,
    wait_total: u32,
    wait_remaining: u32,
    player_ready: bool,
    answers: AnswerSheet,
    player_error: Option<AppError>,
    on_finish: Option<FinishHandler>,
    finished: bool,
}

impl<N: NarrationGate, P: MediaPlayer> ExamSession<N, P> {
    /// 创建考试会话
    pub fn new(
        data: ExamData,
        narrator: N,
        player: P,
        wait_between_laps_secs: u32,
        on_finish: FinishHandler,
    ) -> Self {
        Self {
            data,
            narrator,
            player,
            state: ExamState::Ready,
            lap: 1,
            part_index: 0,
            paused: false,
            wait_total: wait_between_laps_secs,
            wait_remaining: wait_between_laps_secs,
            player_ready: false,
            answers: AnswerSheet::new(),
            player_error: None,
            on_finish: Some(on_finish),
            finished: false,
        }
    }

    // ========== 查询接口 ==========

    pub fn state(&self) -> ExamState {
        self.state
    }

    pub fn lap(&self) -> u8 {
        self.lap
    }

    pub fn part_index(&self) -> usize {
        self.part_index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn wait_remaining(&self) -> u32 {
        self.wait_remaining
    }

    pub fn is_player_ready(&self) -> bool {
        self.player_ready
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 是否处于两遍之间的等待（编排层据此启停秒级计时）
    pub fn in_waiting(&self) -> bool {
        self.state == ExamState::WaitingBetweenLaps
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn player_error(&self) -> Option<&AppError> {
        self.player_error.as_ref()
    }

    fn current_label(&self) -> &str {
        self.data
            .sections
            .get(self.part_index)
            .map(|s| s.label.as_str())
            .unwrap_or("N/A")
    }

    // ========== 状态推进 ==========

    /// 开始考试：开场播报后进入第一个 Part
    pub async fn start(&mut self) {
        if self.state != ExamState::Ready {
            return;
        }
        if self.data.sections.is_empty() {
            warn!("⚠️ 考卷没有任何 Part，直接收卷");
            self.finish().await;
            return;
        }

        self.state = ExamState::Narrating;
        self.speak_swallowing(narrations::OPENING).await;
        self.speak_swallowing(narrations::INTRO).await;

        self.begin_lap().await;
    }

    /// 进入当前 Part 的当前遍：播报 → 定位 → 开播
    async fn begin_lap(&mut self) {
        let section = &self.data.sections[self.part_index];
        let label = section.label.clone();
        let start_time = section.start_time;
        let narration = if self.lap == 1 {
            section.narration.clone()
        } else {
            narrations::SECOND_LAP.to_string()
        };

        info!(
            "📻 Part {} - 第 {} 遍 ({}/{})",
            label,
            self.lap,
            self.part_index + 1,
            self.data.sections.len()
        );

        // 换 Part / 换遍时必须清掉旧的就绪状态
        self.state = ExamState::Narrating;
        self.player_ready = false;
        self.player.set_playing(false);

        if self.lap == 1 {
            let media = self.data.sections[self.part_index].media.clone();
            self.player.load(&media);
            self.log_questions();
        }

        self.speak_swallowing(&narration).await;

        self.player.seek(start_time);
        self.state = ExamState::Playing;
        self.paused = false;
        self.player.set_playing(true);
    }

    /// 播放进度回调：到达终点时触发换遍 / 换 Part / 收卷
    ///
    /// 终点非正数的 Part 不做自动截止；同一次越线只触发一次
    /// （触发后状态离开 Playing，后续进度自然被忽略）。
    pub async fn handle_progress(&mut self, played_seconds: f64) {
        if self.state != ExamState::Playing || self.paused {
            return;
        }
        let end_time = self.data.sections[self.part_index].end_time;
        if end_time <= 0.0 || played_seconds < end_time {
            return;
        }

        self.player.set_playing(false);

        if self.lap == 1 {
            info!(
                "⏱️ Part {} 第一遍结束，{} 秒后开始第二遍",
                self.current_label(),
                self.wait_total
            );
            self.wait_remaining = self.wait_total;
            self.state = ExamState::WaitingBetweenLaps;
        } else if self.part_index + 1 < self.data.sections.len() {
            self.part_index += 1;
            self.lap = 1;
            self.begin_lap().await;
        } else {
            self.finish().await;
        }
    }

    /// 秒级倒计时回调（仅等待状态且未暂停时生效）
    pub async fn tick_countdown(&mut self) {
        if self.state != ExamState::WaitingBetweenLaps || self.paused {
            return;
        }
        self.wait_remaining = self.wait_remaining.saturating_sub(1);
        if self.wait_remaining == 0 {
            self.lap = 2;
            self.begin_lap().await;
        }
    }

    /// 播放器就绪回调
    pub fn handle_ready(&mut self) {
        self.player_ready = true;
    }

    /// 播放器错误回调：归一化后留存，提示用户手动恢复
    pub fn handle_player_error(&mut self, raw: &str) {
        let err = AppError::playback(raw, Some(self.current_label()));
        err.log();
        warn!("⚠️ {}（アプリを再読み込みしてください）", err.user_message);
        self.player_error = Some(err);
    }

    /// 手动暂停 / 恢复
    ///
    /// 暂停期间：倒计时不减、终点检测不触发、播报同步暂停。
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.narrator.set_paused(self.paused);
        if self.state == ExamState::Playing {
            self.player.set_playing(!self.paused);
        }
        info!(
            "{} (Part {})",
            if self.paused { "⏸️ 已暂停" } else { "▶️ 已恢复" },
            self.current_label()
        );
    }

    /// 记录一次作答（同键覆盖，不改变考试状态）
    pub fn record_answer(&mut self, part_label: &str, question_id: u32, choice: &str) {
        self.answers.record(part_label, question_id, choice);
    }

    /// 收卷：停止放送、结束播报，然后无条件交接答题卡
    ///
    /// 交接恰好发生一次；播报成败不影响是否交接。用户随时可以
    /// 强制提前收卷。
    pub async fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.player.set_playing(false);
        self.state = ExamState::Finishing;

        self.speak_swallowing(narrations::OUTRO).await;

        if let Some(handler) = self.on_finish.take() {
            info!("📝 收卷，共 {} 条作答记录", self.answers.len());
            handler(self.answers.clone());
        }
    }

    // ========== 辅助 ==========

    /// 播报并吞掉失败（只记日志）
    async fn speak_swallowing(&mut self, text: &str) {
        if let Err(e) = self.narrator.speak(text).await {
            warn!("播报失败，跳过继续: {}", e);
        }
    }

    /// 把当前 Part 的题目打到屏幕上
    fn log_questions(&self) {
        let section = &self.data.sections[self.part_index];
        for q in &section.questions {
            info!("  Q{}. {}", q.id, q.text);
            for (i, choice) in q.choices.iter().enumerate() {
                info!("     {}. {}", char::from(b'A' + (i as u8 % 26)), choice);
            }
        }
    }
}
