//! 评分服务 - 业务能力层
//!
//! 纯函数：答题卡 + 考试数据 → 总分与逐题对错明细。
//! 判分为精确字符串比较（区分大小写），未作答按答错计。

use crate::models::exam::{AnswerSheet, ExamData};

/// 单题评分明细
#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub part_label: String,
    pub question_id: u32,
    pub text: String,
    pub selected_choice: Option<String>,
    pub correct_choice: String,
    pub rationale: String,
    pub points: u32,
    pub is_correct: bool,
}

/// 整卷评分结果
#[derive(Debug, Clone)]
pub struct ExamResult {
    pub total_score: u32,
    pub max_score: u32,
    /// 得分率（%）；满分为 0 时定义为 0.0
    pub percentage: f64,
    pub per_question: Vec<QuestionOutcome>,
}

/// 编算评分结果
pub fn compile(data: &ExamData, answers: &AnswerSheet) -> ExamResult {
    let mut total_score = 0u32;
    let mut max_score = 0u32;
    let mut per_question = Vec::with_capacity(data.question_count());

    for section in &data.sections {
        for question in &section.questions {
            max_score += question.points;

            let selected = answers
                .selected(&section.label, question.id)
                .map(str::to_string);
            let is_correct = selected.as_deref() == Some(question.correct_choice.as_str());
            if is_correct {
                total_score += question.points;
            }

            per_question.push(QuestionOutcome {
                part_label: section.label.clone(),
                question_id: question.id,
                text: question.text.clone(),
                selected_choice: selected,
                correct_choice: question.correct_choice.clone(),
                rationale: question.rationale.clone(),
                points: question.points,
                is_correct,
            });
        }
    }

    // 一道题都没有时得分率按 0% 处理，避免除零
    let percentage = if max_score == 0 {
        0.0
    } else {
        f64::from(total_score) / f64::from(max_score) * 100.0
    };

    ExamResult {
        total_score,
        max_score,
        percentage,
        per_question,
    }
}
