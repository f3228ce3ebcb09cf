use serde_json::json;
use tracing::{debug, info};

use crate::config::{
    DEFAULT_RECAPTION_MODEL, RECAPTION_SYSTEM_TEMPLATE, REPLACEMENT_RULES_PLACEHOLDER,
    STUDIO_STYLE_SUFFIX,
};
use crate::error::ServiceError;
use crate::llm::types::{ChatCompletionService, ChatMessage, ChatRequest};
use crate::utils::timing::log_llm_timing;

pub fn build_recaption_instruction(rules: &str) -> String {
    RECAPTION_SYSTEM_TEMPLATE.replacen(REPLACEMENT_RULES_PLACEHOLDER, rules, 1)
}

pub fn append_style_suffix(text: &str) -> String {
    let mut caption = String::with_capacity(text.len() + STUDIO_STYLE_SUFFIX.len());
    caption.push_str(text);
    caption.push_str(STUDIO_STYLE_SUFFIX);
    caption
}

/// Rewrites a description so the subject is built from construction materials.
#[derive(Debug, Clone)]
pub struct Recaptioner {
    model: String,
}

impl Default for Recaptioner {
    fn default() -> Self {
        Recaptioner::new(DEFAULT_RECAPTION_MODEL)
    }
}

impl Recaptioner {
    pub fn new(model: &str) -> Self {
        Recaptioner {
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, description: &str, rules: &str, seed: i64) -> ChatRequest {
        let messages = vec![
            ChatMessage::system(build_recaption_instruction(rules)),
            ChatMessage::user(description),
        ];
        ChatRequest::new(&self.model, messages, seed)
    }

    /// The style suffix is appended even when the model returns nothing.
    pub async fn recaption(
        &self,
        service: &dyn ChatCompletionService,
        description: &str,
        rules: &str,
        seed: i64,
    ) -> Result<String, ServiceError> {
        let request = self.build_request(description, rules, seed);
        let rewritten = log_llm_timing(
            "groq",
            &self.model,
            "recaption",
            Some(json!({ "seed": seed })),
            move || async move { service.complete(&request).await?.into_text() },
        )
        .await?;

        info!(
            "Recaptioned description with model={} seed={} ({} words)",
            self.model,
            seed,
            rewritten.split_whitespace().count()
        );
        debug!("Rewritten description: {}", rewritten);
        Ok(append_style_suffix(&rewritten))
    }
}
