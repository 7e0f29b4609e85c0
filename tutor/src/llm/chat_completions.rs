use crate::llm::{CollaboratorError, GuidanceCollaborator, GuidanceRequest};
use crate::prompt::render_system_prompt;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{Value, json};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client for OpenAI compatible `chat/completions` endpoints.
#[derive(Debug)]
pub struct ChatCompletionsCollaborator {
    client: Client,
    completions_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsCollaborator {
    pub fn new(
        client: Client,
        base_url: Option<&str>,
        api_key: String,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        ChatCompletionsCollaborator {
            client,
            completions_url: format!(
                "{}/chat/completions",
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
impl GuidanceCollaborator for ChatCompletionsCollaborator {
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
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": vec![
                    json!({"role": "system", "content": system}),
                    json!({"role": "user", "content": request.code}),
                ],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            }))
            .send()
            .await?;

        if res.error_for_status_ref().is_err() {
            return Err(CollaboratorError::Status(res.status(), res.text().await?));
        }

        let body = res.json::<Value>().await?;
        let message = message_text(&body)
            .ok_or(CollaboratorError::MalformedResponse("choices[0].message.content"))?;
        debug!("guidance response: {message}");
        Ok(message.to_string())
    }
}

fn message_text(body: &Value) -> Option<&str> {
    body["choices"][0]["message"]["content"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "What type does input() return?"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        assert_eq!(message_text(&body), Some("What type does input() return?"));
    }

    #[test]
    fn missing_choice_is_malformed() {
        assert_eq!(message_text(&json!({"choices": []})), None);
        assert_eq!(message_text(&json!({"choices": [{"message": {"content": null}}]})), None);
    }

    #[test]
    fn builds_completions_url_from_base() {
        let collaborator = ChatCompletionsCollaborator::new(
            Client::new(),
            Some("http://localhost:11434/v1"),
            "key".to_string(),
            None,
            500,
            0.7,
        );
        assert_eq!(
            collaborator.completions_url,
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(collaborator.model, DEFAULT_MODEL);
    }
}
