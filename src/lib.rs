//! # Listening Mock Exam
//!
//! 一个从视频/音频源生成并主持两遍制听力模拟考试的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（播放器），只暴露能力
//! - `MediaPlayer` - 定位/跳转/启停命令 + 进度事件通道
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Part
//! - `SourceResolver` - 用户输入 → 类型化媒体引用
//! - `GenerationGate` / `LlmGenerationGate` - 媒体引用 → 考题
//! - `NarrationGate` / `ConsoleNarrator` - 顺序播报能力
//! - `scoring` - 答题卡 → 成绩编算
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一场考试"的完整推进流程
//! - `ExamSession` - 播报 → 放送 → 等待 → 第二遍 → 收卷 的状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/generation_fanout` - 并发出题，管理超时竞速
//! - `orchestrator/app` - 应用生命周期、事件循环、成绩报告
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod narrations;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{normalize, AppError, ErrorKind, ErrorStep};
pub use infrastructure::{ClockPlayer, MediaPlayer, PlayerEvent};
pub use models::{AnswerSheet, ExamData, ExamPart, MediaReference, PartStatus, Question};
pub use orchestrator::App;
pub use services::{ConsoleNarrator, GenerationGate, LlmGenerationGate, NarrationGate, SourceResolver};
pub use workflow::{ExamSession, ExamState};
