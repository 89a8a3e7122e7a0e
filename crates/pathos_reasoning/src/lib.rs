pub mod engine;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use engine::{ConversationEngine, TurnResult};
pub use llm::{CompletionParams, GenerationError, LlmClient};
pub use prompts::{Prompt, PromptBuilder};
