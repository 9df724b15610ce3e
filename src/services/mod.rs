pub mod generation;
pub mod narration;
pub mod scoring;
pub mod source_resolver;

pub use generation::{GeneratedContent, GenerationGate, LlmGenerationGate};
pub use narration::{ConsoleNarrator, NarrationGate};
pub use scoring::{compile, ExamResult, QuestionOutcome};
pub use source_resolver::SourceResolver;
