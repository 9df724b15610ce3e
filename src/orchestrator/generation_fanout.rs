//! 生成扇出 - 编排层
//!
//! ## 职责
//!
//! 对配置好的 Part 槽位（1-3 个）并发调用生成网关，逐槽位施加
//! 240 秒硬超时竞速，把成功的结果按槽位原始顺序组装成整卷数据。
//!
//! ## 设计特点
//!
//! - **失败隔离**：单个 Part 失败不取消、不拖延其他 Part
//! - **竞速弃赛**：超时竞速的败者只被放弃，不会被主动中止
//!   （网关调用跑在独立任务上，丢弃句柄后任务继续自行跑完）
//! - **顺序保证**：整卷按配置顺序组装，与完成先后无关
//! - **全败可重试**：所有 Part 都失败时不组卷，会话停留在生成阶段

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{error, info};

use crate::error::{normalize, AppError, ErrorStep};
use crate::models::exam::{ExamData, ExamPart, GeneratedPart, PartStatus, Provenance};
use crate::narrations;
use crate::services::generation::GenerationGate;

/// 整卷标题
const EXAM_TITLE: &str = "東大英語リスニング模試";

/// 共享的槽位状态板
pub type StatusBoard = Arc<Mutex<Vec<PartStatus>>>;

/// 创建初始状态板（全部 Waiting）
pub fn new_status_board(num_parts: usize) -> StatusBoard {
    Arc::new(Mutex::new(vec![PartStatus::Waiting; num_parts]))
}

/// 扇出结果
#[derive(Debug)]
pub struct GenerationOutcome {
    /// 至少一个 Part 成功时组装的整卷；全败为 None
    pub exam: Option<ExamData>,
    /// 逐槽位的归一化错误（成功槽位为 None）
    pub errors: Vec<Option<AppError>>,
    /// 逐槽位终态
    pub statuses: Vec<PartStatus>,
    /// 所有成功 Part 的引用来源并集
    pub provenance: Vec<Provenance>,
}

impl GenerationOutcome {
    /// 成功的 Part 数量
    pub fn success_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == PartStatus::Completed)
            .count()
    }
}

/// 并发生成所有 Part
///
/// `statuses` 由调用方创建（`new_status_board`），扇出过程中实时
/// 更新，供生成中的状态轮播读取。
pub async fn generate_all(
    gate: Arc<dyn GenerationGate>,
    parts: &[ExamPart],
    hard_timeout: Duration,
    statuses: StatusBoard,
) -> GenerationOutcome {
    let part_futures = parts.iter().enumerate().map(|(idx, part)| {
        let gate = gate.clone();
        let part = part.clone();
        let statuses = statuses.clone();
        async move {
            set_status(&statuses, idx, PartStatus::Analyzing);
            info!("[Part {}] 🔍 开始分析媒体源: {}", part.label, part.media.display_name());

            let result = generate_one(gate, &part, hard_timeout).await;

            match &result {
                Ok(generated) => {
                    set_status(&statuses, idx, PartStatus::Completed);
                    info!(
                        "[Part {}] ✓ 生成完成: {} 道题",
                        part.label,
                        generated.questions.len()
                    );
                }
                Err(app_err) => {
                    set_status(&statuses, idx, PartStatus::Error);
                    app_err.log();
                }
            }
            result
        }
    });

    // 等所有 Part 落定，无论各自成败
    let results = join_all(part_futures).await;

    let mut sections = Vec::new();
    let mut errors = Vec::with_capacity(results.len());
    let mut provenance = Vec::new();

    for result in results {
        match result {
            Ok(generated) => {
                provenance.extend(generated.provenance.iter().cloned());
                sections.push(generated);
                errors.push(None);
            }
            Err(app_err) => errors.push(Some(app_err)),
        }
    }

    let exam = if sections.is_empty() {
        error!("❌ すべてのパートで生成に失敗しました。詳細を確認してください。");
        None
    } else {
        Some(ExamData {
            exam_id: format!("EXAM_{}", chrono::Local::now().timestamp_millis()),
            title: EXAM_TITLE.to_string(),
            sections,
        })
    };

    let statuses = statuses.lock().expect("状态板锁中毒").clone();
    GenerationOutcome {
        exam,
        errors,
        statuses,
        provenance,
    }
}

/// 生成单个 Part：网关调用与硬超时竞速，先落定者胜
///
/// 网关调用跑在独立任务里，超时后只丢弃句柄（放弃，不中止——
/// 底层调用未必支持取消）。
async fn generate_one(
    gate: Arc<dyn GenerationGate>,
    part: &ExamPart,
    hard_timeout: Duration,
) -> Result<GeneratedPart, AppError> {
    let call = {
        let gate = gate.clone();
        let label = part.label.clone();
        let kind = part.kind;
        let media = part.media.clone();
        tokio::spawn(async move { gate.generate(&label, kind, &media).await })
    };

    let content = match timeout(hard_timeout, call).await {
        Err(_) => {
            return Err(normalize(
                "TIMEOUT_ERROR: Analysis took too long.",
                Some(&part.label),
                Some(ErrorStep::Api),
            ))
        }
        Ok(Err(join_err)) => {
            return Err(normalize(&join_err, Some(&part.label), Some(ErrorStep::Api)))
        }
        Ok(Ok(Err(gate_err))) => {
            return Err(normalize(&gate_err, Some(&part.label), Some(ErrorStep::Api)))
        }
        Ok(Ok(Ok(content))) => content,
    };

    Ok(GeneratedPart {
        label: part.label.clone(),
        kind: part.kind,
        narration: narrations::part_narration(&part.label, part.kind),
        media: part.media.clone(),
        start_time: content.start_time,
        end_time: content.end_time,
        transcript: content.transcript,
        questions: content.questions,
        provenance: content.provenance,
    })
}

/// 单调推进槽位状态（终态后不再变化）
fn set_status(board: &StatusBoard, idx: usize, next: PartStatus) {
    let mut statuses = board.lock().expect("状态板锁中毒");
    if let Some(current) = statuses.get_mut(idx) {
        if !current.is_terminal() {
            *current = next;
        }
    }
}
