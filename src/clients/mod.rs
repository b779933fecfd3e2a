pub mod generation;
pub mod llm_client;

pub use generation::GenerationClient;
pub use llm_client::LlmClient;
