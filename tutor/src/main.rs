mod llm;
mod policy;
mod prompt;
mod routes;

use crate::llm::{LlmProvider, LlmSettings};
use crate::policy::{PolicySettings, TutorPolicy};
use axum::Router;
use code_analyzer::{AnalyzerOptions, CodeAnalyzer, Language};
use env_logger::Env;
use log::{error, info, warn};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_redoc::Redoc;
use utoipa_redoc::Servable;

fn get_default_port() -> u16 {
    8000
}

fn get_default_llm_provider() -> LlmProvider {
    LlmProvider::Anthropic
}

fn get_default_max_tokens() -> u32 {
    500
}

fn get_default_temperature() -> f32 {
    0.7
}

fn get_default_llm_timeout_secs() -> u64 {
    30
}

fn get_default_llm_max_concurrent() -> NonZeroUsize {
    NonZeroUsize::MIN.saturating_add(4)
}

fn get_default_language() -> Language {
    Language::Python
}

fn get_default_max_code_bytes() -> usize {
    64 * 1024
}

fn get_default_flag_iteration_pattern() -> bool {
    true
}

fn get_default_agent_id() -> String {
    "tutor_agent".to_string()
}

fn get_default_fallback_question() -> String {
    "I'm here to help you learn! What can I help you with today?".to_string()
}

fn get_default_agent_fallback_question() -> String {
    "What do you think this code is trying to accomplish?".to_string()
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "get_default_port")]
    port: u16,
    #[serde(default = "get_default_llm_provider")]
    llm_provider: LlmProvider,
    anthropic_api_key: Option<String>,
    openai_api_key: Option<String>,
    llm_base_url: Option<String>,
    model: Option<String>,
    #[serde(default = "get_default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "get_default_temperature")]
    temperature: f32,
    #[serde(default = "get_default_llm_timeout_secs")]
    llm_timeout_secs: u64,
    #[serde(default = "get_default_llm_max_concurrent")]
    llm_max_concurrent: NonZeroUsize,
    #[serde(default = "get_default_language")]
    default_language: Language,
    #[serde(default = "get_default_max_code_bytes")]
    max_code_bytes: usize,
    #[serde(default = "get_default_flag_iteration_pattern")]
    flag_iteration_pattern: bool,
    #[serde(default = "get_default_agent_id")]
    agent_id: String,
    #[serde(default = "get_default_fallback_question")]
    fallback_question: String,
    #[serde(default = "get_default_agent_fallback_question")]
    agent_fallback_question: String,
}

impl Config {
    fn llm_settings(&self) -> LlmSettings {
        let api_key = match self.llm_provider {
            LlmProvider::Anthropic => self.anthropic_api_key.clone(),
            LlmProvider::Openai => self.openai_api_key.clone(),
        };
        LlmSettings {
            provider: self.llm_provider,
            api_key,
            base_url: self.llm_base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            default_language: self.default_language,
            flag_iteration_pattern: self.flag_iteration_pattern,
            max_code_bytes: self.max_code_bytes,
        }
    }

    fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            fallback_question: self.fallback_question.clone(),
            gated_fallback_question: self.agent_fallback_question.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
            max_concurrent: self.llm_max_concurrent,
        }
    }
}

#[derive(Clone)]
struct AppState {
    analyzer: Arc<CodeAnalyzer>,
    policy: Arc<TutorPolicy>,
    agent_id: Arc<str>,
}

#[derive(OpenApi)]
#[openapi(info(description = "API for Socratic tutoring on code submissions"))]
struct ApiDoc;

fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(routes::root))
        .routes(routes!(routes::health))
        .routes(routes!(routes::code_update))
        .routes(routes!(routes::agent_analyze))
        .split_for_parts();

    router
        .merge(Redoc::with_url("/redoc", api))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn run() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = envy::from_env::<Config>()?;

    let collaborator = llm::build_collaborator(&config.llm_settings())?;
    if collaborator.is_enabled() {
        info!("guidance service uses {}", config.llm_provider.name());
    } else {
        warn!(
            "no API key set for {}, guidance requests will get the fallback question",
            config.llm_provider.name()
        );
    }

    let state = AppState {
        analyzer: Arc::new(CodeAnalyzer::new(config.analyzer_options())),
        policy: Arc::new(TutorPolicy::new(collaborator, config.policy_settings())),
        agent_id: Arc::from(config.agent_id.as_str()),
    };

    info!("Starting on port {}", config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

fn main() {
    let rt = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");

    if let Err(err) = rt.block_on(run()) {
        error!("{}", err);
        exit(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        envy::from_iter(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
        .expect("config")
    }

    #[test]
    fn defaults_match_reference_service() {
        let config = config(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm_provider, LlmProvider::Anthropic);
        assert_eq!(config.default_language, Language::Python);
        assert!(config.flag_iteration_pattern);
        assert_eq!(config.agent_id, "tutor_agent");

        let llm = config.llm_settings();
        assert_eq!(llm.api_key, None);
        assert_eq!(llm.max_tokens, 500);
        assert_eq!(llm.timeout, Duration::from_secs(30));
        let policy = config.policy_settings();
        assert_eq!(policy.max_concurrent.get(), 5);
        assert_eq!(
            policy.gated_fallback_question,
            "What do you think this code is trying to accomplish?"
        );
    }

    #[test]
    fn zero_llm_concurrency_is_rejected() {
        let result = envy::from_iter::<_, Config>(vec![(
            "LLM_MAX_CONCURRENT".to_string(),
            "0".to_string(),
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn picks_key_for_selected_provider() {
        let config = config(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-anthropic"),
            ("LLM_BASE_URL", "http://localhost:11434/v1"),
        ]);
        let llm = config.llm_settings();
        assert_eq!(llm.provider, LlmProvider::Openai);
        assert_eq!(llm.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(llm.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }

    #[test]
    fn analyzer_options_come_from_env() {
        let options = config(&[
            ("DEFAULT_LANGUAGE", "javascript"),
            ("FLAG_ITERATION_PATTERN", "false"),
            ("MAX_CODE_BYTES", "1024"),
        ])
        .analyzer_options();
        assert_eq!(options.default_language, Language::JavaScript);
        assert!(!options.flag_iteration_pattern);
        assert_eq!(options.max_code_bytes, 1024);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = envy::from_iter::<_, Config>(vec![(
            "LLM_PROVIDER".to_string(),
            "mystery".to_string(),
        )]);
        assert!(result.is_err());
    }
}
