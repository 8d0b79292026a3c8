//! Translation backends.
//!
//! The orchestrator talks to a [`TranslationBackend`]: one request in, one
//! translated string out. Two implementations ship with the crate:
//!
//! * [`LlmBackend`] wraps any `edgequake_llm` provider (OpenAI, Anthropic,
//!   Gemini, Ollama, ...) resolved from the environment.
//! * [`OpenAiBackend`] calls an OpenAI-compatible `/chat/completions`
//!   endpoint directly with an explicit API key. The key lives on the
//!   backend instance; nothing is written to the process environment.
//!
//! ## Retry Strategy
//!
//! [`RetryPolicy`] retries transient failures with exponential backoff
//! (`backoff_ms * 2^(attempt-1)`). Authentication failures are returned
//! immediately. A rate-limit response carrying `Retry-After` waits at least
//! that long.

use crate::config::TranslationConfig;
use crate::error::{BackendError, TranslateError};
use crate::prompts::{render_system_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// User message: either the bare segment or a full instruction that
    /// embeds it.
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub temperature: f32,
}

/// Something that turns one request into translated text.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Short label used in logs and reports.
    fn name(&self) -> &str;

    /// Translate a single request. Implementations do not retry.
    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError>;
}

// ── Retry ────────────────────────────────────────────────────────────────

/// Upper bound on a single retry wait.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Retry settings applied around every backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Wait before retry `attempt` (1-based): `backoff_ms * 2^(attempt-1)`,
    /// raised to the server's Retry-After, capped at [`MAX_BACKOFF_MS`].
    pub fn delay_ms(&self, attempt: u32, error: &BackendError) -> u64 {
        let factor = 2u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let mut backoff = self.backoff_ms.saturating_mul(factor);
        if let BackendError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = error
        {
            backoff = backoff.max(secs.saturating_mul(1000));
        }
        backoff.min(MAX_BACKOFF_MS)
    }

    /// Call `backend`, retrying transient errors.
    pub async fn call(
        &self,
        backend: &dyn TranslationBackend,
        request: &TranslationRequest,
    ) -> Result<String, BackendError> {
        let mut attempt = 0u32;
        loop {
            match backend.translate(request).await {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_retryable() || attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let backoff = self.delay_ms(attempt, &e);
                    warn!(
                        "{}: attempt {} failed ({}); retry {}/{} after {}ms",
                        backend.name(),
                        attempt,
                        e,
                        attempt,
                        self.max_retries,
                        backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }
}

// ── edgequake-llm backend ────────────────────────────────────────────────

/// Backend over an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
    system_prompt: String,
    max_tokens: usize,
}

impl LlmBackend {
    /// Wrap a provider; `label` is what logs and reports show.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 4096,
        }
    }

    /// Replace the system prompt template (`{source}` / `{target}` are
    /// substituted per request).
    pub fn with_system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = template.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl TranslationBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        let system = render_system_prompt(
            &self.system_prompt,
            &request.source_lang,
            &request.target_lang,
        );
        let messages = vec![ChatMessage::system(system), ChatMessage::user(&request.text)];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Api(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(BackendError::EmptyResponse {
                provider: self.label.clone(),
            });
        }
        Ok(response.content)
    }
}

// ── OpenAI-compatible HTTP backend ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Direct client for an OpenAI-compatible chat completions API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
    max_tokens: usize,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 4096,
            timeout_secs,
        })
    }

    /// Replace the system prompt template.
    pub fn with_system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = template.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        let system = render_system_prompt(
            &self.system_prompt,
            &request.source_lang,
            &request.target_lang,
        );
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &system,
                },
                WireMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            temperature: request.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    BackendError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(classify_status(status.as_u16(), retry_after_secs, detail));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| BackendError::EmptyResponse {
                provider: "openai".to_string(),
            })
    }
}

fn classify_status(status: u16, retry_after_secs: Option<u64>, detail: String) -> BackendError {
    match status {
        401 | 403 => BackendError::Auth {
            provider: "openai".to_string(),
            detail,
        },
        429 => BackendError::RateLimited {
            provider: "openai".to_string(),
            retry_after_secs,
        },
        _ => BackendError::Api(format!("HTTP {status}: {detail}")),
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

fn configure_llm_backend(backend: LlmBackend, config: &TranslationConfig) -> LlmBackend {
    let backend = backend.with_max_tokens(config.max_tokens);
    match config.system_prompt {
        Some(ref template) => backend.with_system_prompt(template),
        None => backend,
    }
}

fn create_llm_backend(
    provider_name: &str,
    model: &str,
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationBackend>, TranslateError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(configure_llm_backend(
        LlmBackend::new(provider, format!("{provider_name}/{model}")),
        config,
    )))
}

/// Resolve the backend, from most-specific to least-specific:
///
/// 1. **Pre-built backend** (`config.backend`) used as-is.
/// 2. **Explicit API key** (`config.api_key`): an [`OpenAiBackend`] holding
///    the key, pointed at `config.api_base_url` when set.
/// 3. **Named provider** (`config.provider_name`) via `ProviderFactory`,
///    which reads that provider's key from the environment.
/// 4. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 5. **`OPENAI_API_KEY`** present: OpenAI through `ProviderFactory`.
/// 6. **Auto-detect** with `ProviderFactory::from_env()`.
pub fn resolve_backend(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationBackend>, TranslateError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref key) = config.api_key {
        if key.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "API key must not be empty".into(),
            ));
        }
        let mut backend = OpenAiBackend::new(key.trim(), model, config.api_timeout_secs)?
            .with_max_tokens(config.max_tokens);
        if let Some(ref template) = config.system_prompt {
            backend = backend.with_system_prompt(template);
        }
        if let Some(ref url) = config.api_base_url {
            backend = backend.with_base_url(url);
        }
        info!("Using OpenAI-compatible backend at {}", backend.base_url);
        return Ok(Arc::new(backend));
    }

    if let Some(ref name) = config.provider_name {
        return create_llm_backend(name, model, config);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_llm_backend(&prov, &env_model, config);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_llm_backend("openai", model, config);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, pass --api-key, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(Arc::new(configure_llm_backend(
        LlmBackend::new(llm_provider, "auto"),
        config,
    )))
}
