mod anthropic;
mod chat_completions;

pub use anthropic::AnthropicCollaborator;
pub use chat_completions::ChatCompletionsCollaborator;

use async_trait::async_trait;
use common::models::IssueType;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What the tutor hands to the language model for one submission.
#[derive(Debug, Clone, Copy)]
pub struct GuidanceRequest<'a> {
    pub code: &'a str,
    pub issue_type: IssueType,
    pub context: &'a str,
}

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("guidance service is disabled")]
    Disabled,
    #[error("error while sending llm request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected code {0}: {1}")]
    Status(StatusCode, String),
    #[error("llm response is missing {0}")]
    MalformedResponse(&'static str),
    #[error("failed to render system prompt: {0}")]
    Prompt(#[from] askama::Error),
    #[error("llm request timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm returned an empty message")]
    Empty,
    #[error("guidance service is shutting down")]
    Closed,
}

/// Produces a guiding message for a submission.
///
/// Implementations only report failures; turning them into something a
/// learner can see is up to the dialogue policy.
#[async_trait]
pub trait GuidanceCollaborator: Send + Sync {
    async fn generate(&self, request: &GuidanceRequest<'_>) -> Result<String, CollaboratorError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stands in when no API key is configured.
#[derive(Debug, Default)]
pub struct DisabledCollaborator;

#[async_trait]
impl GuidanceCollaborator for DisabledCollaborator {
    async fn generate(&self, _request: &GuidanceRequest<'_>) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    Openai,
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Openai => "openai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

pub fn build_collaborator(
    settings: &LlmSettings,
) -> Result<Arc<dyn GuidanceCollaborator>, CollaboratorError> {
    let Some(api_key) = settings.api_key.as_deref().filter(|key| !key.trim().is_empty()) else {
        return Ok(Arc::new(DisabledCollaborator));
    };

    let client = reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()?;

    Ok(match settings.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicCollaborator::new(
            client,
            settings.base_url.as_deref(),
            api_key.to_string(),
            settings.model.clone(),
            settings.max_tokens,
            settings.temperature,
        )),
        LlmProvider::Openai => Arc::new(ChatCompletionsCollaborator::new(
            client,
            settings.base_url.as_deref(),
            api_key.to_string(),
            settings.model.clone(),
            settings.max_tokens,
            settings.temperature,
        )),
    })
}
