pub mod ai_provider;
pub mod error;
pub mod providers;
pub mod relevance;

pub use ai_provider::{create_provider, AiConfig, AiProviderTrait};
pub use error::AiError;
pub use relevance::{build_relevance_prompt, AiRelevanceService, RelevanceJudge};
