use crate::llm::{CollaboratorError, GuidanceCollaborator, GuidanceRequest};
use crate::prompt::render_system_prompt;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{Value, json};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicCollaborator {
    client: Client,
    messages_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicCollaborator {
    pub fn new(
        client: Client,
        base_url: Option<&str>,
        api_key: String,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        AnthropicCollaborator {
            client,
            messages_url: format!(
                "{}/messages",
                base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
            ),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl GuidanceCollaborator for AnthropicCollaborator {
    async fn generate(&self, request: &GuidanceRequest<'_>) -> Result<String, CollaboratorError> {
        let system = render_system_prompt(request)?;

        info!(
            "sending guidance request to {} (issue type {})",
            self.model,
            request.issue_type.as_str()
        );
        debug!("guidance input: {}", request.code);

        let res = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": system,
                "messages": vec![json!({"role": "user", "content": request.code})],
            }))
            .send()
            .await?;

        if res.error_for_status_ref().is_err() {
            return Err(CollaboratorError::Status(res.status(), res.text().await?));
        }

        let body = res.json::<Value>().await?;
        let message = message_text(&body).ok_or(CollaboratorError::MalformedResponse("content"))?;
        debug!("guidance response: {message}");
        Ok(message)
    }
}

/// Concatenates the text blocks of a Messages API response.
fn message_text(body: &Value) -> Option<String> {
    let blocks = body["content"].as_array()?;
    Some(
        blocks
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect(),
    )
}
