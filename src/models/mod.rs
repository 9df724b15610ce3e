pub mod exam;
pub mod setup;
pub mod source;

pub use exam::{
    AnswerSheet, ExamData, ExamPart, GeneratedPart, PartKind, PartStatus, Provenance, Question,
    QuestionKind, UserAnswer,
};
pub use setup::{ExamSetup, SlotConfig};
pub use source::{MediaReference, StreamingPlatform};
