//! 考试应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整考试会话的调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：加载配置、创建生成网关与源解析器
//! 2. **源解析**：把设置文件里的槽位变成类型化媒体引用
//! 3. **生成扇出**：委托 generation_fanout 并发出题
//! 4. **考试驱动**：跑事件循环，把播放器事件与秒级计时喂给状态机
//! 5. **资源回收**：会话结束时释放本地上传的临时句柄
//! 6. **结果编算**：评分并输出最终报告
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个 Part 的细节
//! - **资源所有者**：唯一持有播放器与播报通道的模块
//! - **向下委托**：委托 workflow::ExamSession 驱动考试状态

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{normalize, ErrorStep};
use crate::infrastructure::player::{ClockPlayer, MediaPlayer, PlayerEvent};
use crate::models::exam::{AnswerSheet, ExamData, ExamPart, PartKind};
use crate::models::setup::{load_or_sample, ExamSetup};
use crate::narrations::PROCESSING_STEPS;
use crate::orchestrator::generation_fanout::{self, new_status_board, GenerationOutcome};
use crate::services::generation::{GenerationGate, LlmGenerationGate};
use crate::services::narration::{ConsoleNarrator, NarrationGate};
use crate::services::scoring::{self, ExamResult};
use crate::services::source_resolver::SourceResolver;
use crate::workflow::exam_session::{ExamSession, FinishHandler};

/// 应用主结构
pub struct App {
    config: Config,
    resolver: SourceResolver,
    gate: Arc<dyn GenerationGate>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let gate: Arc<dyn GenerationGate> = Arc::new(LlmGenerationGate::new(&config));

        Ok(Self {
            config,
            resolver: SourceResolver::new(),
            gate,
        })
    }

    /// 运行一次完整的考试会话
    pub async fn run(&self) -> Result<()> {
        // 加载槽位设置
        let setup = load_or_sample(
            Path::new(&self.config.setup_file),
            self.config.default_num_parts,
        )
        .await?;

        let parts = self.resolve_parts(&setup)?;
        info!("✓ 共 {} 个 Part 待出题", parts.len());

        // 生成扇出（全败时留在生成阶段，直接报错退出供重试）
        let outcome = self.generate(&parts).await;
        self.log_generation_outcome(&outcome);

        let exam = match outcome.exam {
            Some(exam) => exam,
            None => {
                // 释放本地句柄后再退出
                self.release_parts(&parts);
                anyhow::bail!("すべてのパートで生成に失敗しました。詳細を確認してください。");
            }
        };

        // 驱动考试状态机直到收卷
        let answers = self.run_exam(exam.clone()).await?;

        // 会话结束，释放本地上传的临时资源
        self.release_parts(&parts);

        // 评分并输出报告
        let result = scoring::compile(&exam, &answers);
        print_final_report(&exam, &result, &outcome.provenance);

        Ok(())
    }

    /// 把设置槽位解析为类型化的 Part 列表
    fn resolve_parts(&self, setup: &ExamSetup) -> Result<Vec<ExamPart>> {
        let mut parts = Vec::with_capacity(setup.parts.len());

        for (i, slot) in setup.parts.iter().enumerate() {
            let label = ExamSetup::label_for(i);

            let media = if let Some(file) = &slot.file {
                self.resolver
                    .resolve_file(Path::new(file))
                    .with_context(|| format!("Part {} 的本地文件无法解析", label))?
            } else {
                match self.resolver.resolve(&slot.source) {
                    Some(media) => media,
                    None => {
                        let err = normalize(
                            &format!("invalid url or id: {}", slot.source),
                            Some(&label),
                            Some(ErrorStep::Extract),
                        );
                        err.log();
                        anyhow::bail!("{}", err.user_message);
                    }
                }
            };

            info!(
                "PART {} [{}]: {}",
                label,
                media.type_label(),
                media.display_name()
            );
            parts.push(ExamPart {
                label,
                kind: PartKind::for_slot(i),
                media,
            });
        }

        Ok(parts)
    }

    /// 带状态轮播的生成扇出
    async fn generate(&self, parts: &[ExamPart]) -> GenerationOutcome {
        log_generation_start(parts.len());

        let board = new_status_board(parts.len());

        // 生成期间每 7 秒轮播一次进度文案与槽位状态
        let steps_board = board.clone();
        let steps_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(7));
            let mut i = 0usize;
            loop {
                interval.tick().await;
                info!("⏳ {}", PROCESSING_STEPS[i % PROCESSING_STEPS.len()]);
                {
                    let statuses = steps_board.lock().expect("状态板锁中毒");
                    for (idx, status) in statuses.iter().enumerate() {
                        info!("  PART {}: {}", ExamSetup::label_for(idx), status.label());
                    }
                }
                i += 1;
            }
        });

        let outcome = generation_fanout::generate_all(
            self.gate.clone(),
            parts,
            Duration::from_secs(self.config.generation_timeout_secs),
            board,
        )
        .await;

        // 轮播只在生成阶段存在，出结果立即停掉
        steps_task.abort();

        outcome
    }

    fn log_generation_outcome(&self, outcome: &GenerationOutcome) {
        info!("\n{}", "─".repeat(60));
        info!(
            "✓ 出题完成: 成功 {}/{}",
            outcome.success_count(),
            outcome.statuses.len()
        );
        for (idx, err) in outcome.errors.iter().enumerate() {
            if let Some(err) = err {
                warn!("  PART {}: {}", ExamSetup::label_for(idx), err.user_message);
                if self.config.verbose_logging {
                    warn!("{}", err.export_text());
                }
            }
        }
        info!("{}", "─".repeat(60));
    }

    /// 跑考试事件循环直到收卷
    ///
    /// 播放器进度与秒级倒计时都在这里喂给状态机；倒计时分支仅在
    /// 等待状态启用，离开等待即停。
    async fn run_exam(&self, exam: ExamData) -> Result<AnswerSheet> {
        info!("\n{}", "=".repeat(60));
        info!("🎧 試験を開始する ({} Sections)", exam.sections.len());
        info!("{}", "=".repeat(60));

        let (event_tx, mut event_rx) = mpsc::channel::<PlayerEvent>(32);
        let player = ClockPlayer::new(event_tx);
        let narrator =
            ConsoleNarrator::new(Duration::from_secs(self.config.narration_timeout_secs));

        let (finish_tx, finish_rx) = oneshot::channel::<AnswerSheet>();
        let handler: FinishHandler = Box::new(move |answers| {
            let _ = finish_tx.send(answers);
        });

        let mut session = ExamSession::new(
            exam,
            narrator,
            player,
            self.config.wait_between_laps_secs,
            handler,
        );

        session.start().await;
        drive_session(&mut session, &mut event_rx).await;
        drop(session);
        let answers = finish_rx.await.context("收卷回调未被触发")?;
        Ok(answers)
    }

    /// 释放槽位持有的本地临时资源
    fn release_parts(&self, parts: &[ExamPart]) {
        for part in parts {
            self.resolver.release(&part.media);
        }
    }
}

/// 驱动考试事件循环直到收卷
///
/// 播放器进度与秒级倒计时都在这里喂给状态机。倒计时分支仅在
/// 等待状态启用；进入等待的瞬间重置计时器，保证第一次递减发生
/// 在整整一秒之后（计时器在循环外长期闲置，不重置的话积压的
/// tick 会在入场时立即触发，整段等待少一秒）。
async fn drive_session<N: NarrationGate, P: MediaPlayer>(
    session: &mut ExamSession<N, P>,
    event_rx: &mut mpsc::Receiver<PlayerEvent>,
) {
    let mut countdown = tokio::time::interval(Duration::from_secs(1));
    countdown.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut in_wait = false;

    while !session.is_finished() {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(PlayerEvent::Ready) => session.handle_ready(),
                Some(PlayerEvent::Progress(seconds)) => session.handle_progress(seconds).await,
                Some(PlayerEvent::Error(raw)) => session.handle_player_error(&raw),
                None => break,
            },
            _ = countdown.tick(), if in_wait => {
                session.tick_countdown().await;
            }
        }

        // 等待状态的进出沿
        if session.in_waiting() != in_wait {
            in_wait = session.in_waiting();
            if in_wait {
                countdown.reset();
            }
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 听力模拟考试模式");
    info!("📋 设置文件: {}", config.setup_file);
    info!("⏱️ 单 Part 生成超时: {} 秒", config.generation_timeout_secs);
    info!("{}", "=".repeat(60));
}

fn log_generation_start(num_parts: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始并发出题，共 {} 个 Part", num_parts);
    info!("{}", "=".repeat(60));
}

/// 输出最终成绩报告
fn print_final_report(
    exam: &ExamData,
    result: &ExamResult,
    provenance: &[crate::models::exam::Provenance],
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 {} - 成绩报告", exam.title);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "✅ 得分: {}/{} ({:.1}%)",
        result.total_score, result.max_score, result.percentage
    );

    for outcome in &result.per_question {
        info!(
            "  {} Part {} Q{}: {}",
            if outcome.is_correct { "✓" } else { "✗" },
            outcome.part_label,
            outcome.question_id,
            outcome.text
        );
        info!(
            "     正解: {} / 作答: {}",
            outcome.correct_choice,
            outcome.selected_choice.as_deref().unwrap_or("（未作答）")
        );
        if !outcome.rationale.is_empty() {
            info!("     💡 {}", outcome.rationale);
        }
    }

    for section in &exam.sections {
        if !section.transcript.is_empty() {
            info!(
                "\n📄 Part {} 放送概要: {}",
                section.label,
                crate::utils::logging::truncate_text(&section.transcript, 200)
            );
        }
    }

    if !provenance.is_empty() {
        info!("\n🔗 引用来源:");
        for p in provenance {
            info!(
                "  - {} {}",
                p.title.as_deref().unwrap_or("(無題)"),
                p.uri.as_deref().unwrap_or("")
            );
        }
    }

    info!("{}", "=".repeat(60));
}
