//! 考试数据模型
//!
//! 生成网关产出的题目、Part、整卷数据，以及考生答题记录。
//! 除答题记录外，全部在生成阶段完成后只读。

use serde::{Deserialize, Serialize};

use crate::models::source::MediaReference;

/// 题目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FactualMultipleChoice,
    OpinionMultipleChoice,
    MainIdeaMultipleChoice,
    /// 生成侧返回了未知类型时的兜底
    #[serde(other)]
    Other,
}

/// 单道选择题（生成后不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question_id")]
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(rename = "question_text")]
    pub text: String,
    /// 固定顺序的选项列表（不假设去重）
    pub choices: Vec<String>,
    #[serde(rename = "correct_answer")]
    pub correct_choice: String,
    /// 解题要点（日语）
    #[serde(rename = "listening_point")]
    pub rationale: String,
    #[serde(rename = "score")]
    pub points: u32,
}

/// Part 内容类型（按槽位序号交替：偶数讲义、奇数讨论）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Lecture,
    Discussion,
}

impl PartKind {
    /// 按槽位序号决定类型
    pub fn for_slot(index: usize) -> Self {
        if index % 2 == 0 {
            PartKind::Lecture
        } else {
            PartKind::Discussion
        }
    }
}

/// 待生成的 Part 槽位（setup 阶段创建）
#[derive(Debug, Clone)]
pub struct ExamPart {
    pub label: String,
    pub kind: PartKind,
    pub media: MediaReference,
}

/// 引用来源记录（生成网关返回，供用户核对）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// 单个 Part 的生成结果（不可变）
#[derive(Debug, Clone)]
pub struct GeneratedPart {
    pub label: String,
    pub kind: PartKind,
    /// 该 Part 的开场播报文案
    pub narration: String,
    pub media: MediaReference,
    /// 播放起点（秒）
    pub start_time: f64,
    /// 播放终点（秒）；非正数表示不做自动截止
    pub end_time: f64,
    /// 放送内容概要（日语）
    pub transcript: String,
    pub questions: Vec<Question>,
    pub provenance: Vec<Provenance>,
}

/// 整卷数据
///
/// 仅由生成成功的 Part 组成，保持槽位配置顺序；会话期间只读。
#[derive(Debug, Clone)]
pub struct ExamData {
    pub exam_id: String,
    pub title: String,
    pub sections: Vec<GeneratedPart>,
}

impl ExamData {
    /// 全卷题目总数
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// 单条答题记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAnswer {
    pub part_label: String,
    pub question_id: u32,
    pub selected_choice: String,
}

/// 答题卡
///
/// 以 (part_label, question_id) 为键，同键后写覆盖先写，
/// 任何时刻每键至多一条记录。
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerSheet {
    entries: Vec<UserAnswer>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次选择（同键覆盖）
    pub fn record(&mut self, part_label: &str, question_id: u32, choice: &str) {
        self.entries
            .retain(|a| !(a.part_label == part_label && a.question_id == question_id));
        self.entries.push(UserAnswer {
            part_label: part_label.to_string(),
            question_id,
            selected_choice: choice.to_string(),
        });
    }

    /// 查询某题已选的选项
    pub fn selected(&self, part_label: &str, question_id: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.part_label == part_label && a.question_id == question_id)
            .map(|a| a.selected_choice.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserAnswer> {
        self.entries.iter()
    }
}

/// Part 的生成期运行状态
///
/// 单调推进：Waiting → Analyzing → Completed | Error，之后不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    Waiting,
    Analyzing,
    Completed,
    Error,
}

impl PartStatus {
    /// 是否已到终态
    pub fn is_terminal(self) -> bool {
        matches!(self, PartStatus::Completed | PartStatus::Error)
    }

    /// 状态显示标签
    pub fn label(self) -> &'static str {
        match self {
            PartStatus::Waiting => "WAITING",
            PartStatus::Analyzing => "PROCESSING",
            PartStatus::Completed => "READY",
            PartStatus::Error => "ERROR",
        }
    }
}
