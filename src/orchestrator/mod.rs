//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整场考试的调度，是系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `generation_fanout` - 生成扇出
//! - 并发调用生成网关（每槽位一次）
//! - 逐槽位 240 秒硬超时竞速
//! - 按配置顺序组装整卷数据
//!
//! ### `app` - 考试应用
//! - 管理应用生命周期（初始化、运行、回收）
//! - 持有播放器与播报通道
//! - 驱动考试事件循环
//! - 输出最终成绩报告
//!
//! ## 层次关系
//!
//! ```text
//! app (一场考试)
//!     ↓
//! generation_fanout (Vec<ExamPart> → ExamData)
//!     ↓
//! workflow::ExamSession (状态机，单场考试推进)
//!     ↓
//! services (能力层：resolve / generate / narrate / score)
//!     ↓
//! infrastructure (基础设施：MediaPlayer)
//! ```

pub mod app;
pub mod generation_fanout;

pub use app::App;
pub use generation_fanout::{generate_all, new_status_board, GenerationOutcome, StatusBoard};
