use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CaptionError, ServiceError};
use crate::llm::types::{ChatCompletionService, ChatRequest, ChatResponse};
use crate::utils::http::build_client;

const ERROR_DETAIL_CHARS: usize = 600;

fn clip_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{} [+{} bytes]", &text[..cut], text.len() - cut),
        None => text.to_string(),
    }
}

fn describe_request(request: &ChatRequest) -> String {
    format!(
        "model={} messages={} seed={} temperature={} top_p={} max_completion_tokens={}",
        request.model,
        request.messages.len(),
        request.seed,
        request.temperature,
        request.top_p,
        request.max_completion_tokens
    )
}

/// Human-readable detail for a failed call: the remote `error.message` when
/// the body carries one, otherwise the clipped body itself.
fn error_detail(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "no response body".to_string();
    }
    let remote_message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    remote_message.unwrap_or_else(|| clip_for_log(body, ERROR_DETAIL_CHARS))
}

fn status_error(status: StatusCode, body: Result<String, String>) -> ServiceError {
    let detail = match body {
        Ok(body) => error_detail(&body),
        Err(read_error) => format!("error body could not be read: {read_error}"),
    };
    warn!("Groq API error: status={} detail={}", status, detail);
    ServiceError::Status {
        status: status.as_u16(),
        detail,
    }
}

fn parse_completion_body(body: &str) -> Result<ChatResponse, ServiceError> {
    serde_json::from_str::<ChatResponse>(body).map_err(|err| {
        ServiceError::MalformedResponse(format!(
            "{err} (body: {})",
            clip_for_log(body.trim(), ERROR_DETAIL_CHARS)
        ))
    })
}

/// Groq's OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, CaptionError> {
        if api_key.trim().is_empty() {
            return Err(CaptionError::Precondition(
                "Groq API key is required".to_string(),
            ));
        }
        let http = build_client().map_err(ServiceError::from)?;
        Ok(GroqClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CaptionError> {
        GroqClient::new(&config.api_key, &config.base_url, config.request_timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn http_request(&self, request: &ChatRequest) -> RequestBuilder {
        self.http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
    }
}

#[async_trait]
impl ChatCompletionService for GroqClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        debug!("Groq request: {}", describe_request(request));

        let response = self.http_request(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|err| err.to_string());
            return Err(status_error(status, body));
        }

        let parsed = parse_completion_body(&response.text().await?)?;
        if parsed.choices.is_empty() {
            warn!("Groq response for model={} had no choices", request.model);
        }
        debug!(
            "Groq response received for model={} choices={}",
            request.model,
            parsed.choices.len()
        );
        Ok(parsed)
    }
}
