//! Writing assistant backed by a remote text-generation service.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

const MAX_INPUT_CHARS: usize = 20_000;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("invalid assistant input: {0}")]
    InvalidInput(&'static str),
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("upstream returned no completion")]
    EmptyResponse,
    #[error("transport error: {0}")]
    Transport(String),
}

/// A single system + user prompt exchange.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AssistantError>;
}

/// Stand-in used when no credentials are configured.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct AssistantService {
    generator: Arc<dyn TextGenerator>,
}

impl AssistantService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate_ideas(&self, topic: &str) -> Result<String, AssistantError> {
        let topic = checked_input(topic, "topic must not be empty")?;
        info!(target: "plume::assistant", chars = topic.len(), "Generating post ideas");
        self.generator
            .complete(
                "You are a helpful assistant that generates blog ideas.",
                &format!("Generate blog ideas about: {topic}"),
            )
            .await
    }

    pub async fn suggest_improvements(&self, content: &str) -> Result<String, AssistantError> {
        let content = checked_input(content, "content must not be empty")?;
        info!(target: "plume::assistant", chars = content.len(), "Suggesting improvements");
        self.generator
            .complete(
                "You are an editor who suggests concrete improvements to blog posts.",
                &format!("Suggest improvements for this blog post:\n\n{content}"),
            )
            .await
    }
}

fn checked_input<'a>(raw: &'a str, empty: &'static str) -> Result<&'a str, AssistantError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AssistantError::InvalidInput(empty));
    }
    if value.chars().count() > MAX_INPUT_CHARS {
        return Err(AssistantError::InvalidInput("input is too long"));
    }
    Ok(value)
}
