pub mod ollama;
pub mod prompt;
pub mod provider;

pub use ollama::OllamaGenerator;
pub use prompt::{ResponseStyle, build_grounded_block, select_system_prompt};
pub use provider::{ChatMessage, GenerationError, GenerationOptions, GenerationProvider, TokenStream};
