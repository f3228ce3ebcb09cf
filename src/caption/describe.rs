use serde_json::json;
use tracing::{debug, info};

use crate::config::{DEFAULT_DESCRIBE_MODEL, DESCRIBE_PROMPT};
use crate::error::ServiceError;
use crate::llm::media::ImagePayload;
use crate::llm::types::{ChatCompletionService, ChatMessage, ChatRequest, ContentPart, ImageUrl};
use crate::utils::timing::log_llm_timing;

/// Asks a vision model for a long description of the person in a portrait.
#[derive(Debug, Clone)]
pub struct Describer {
    model: String,
}

impl Default for Describer {
    fn default() -> Self {
        Describer::new(DEFAULT_DESCRIBE_MODEL)
    }
}

impl Describer {
    pub fn new(model: &str) -> Self {
        Describer {
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, image: &ImagePayload, seed: i64) -> ChatRequest {
        let message = ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: DESCRIBE_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ]);
        ChatRequest::new(&self.model, vec![message], seed)
    }

    pub async fn describe(
        &self,
        service: &dyn ChatCompletionService,
        image: &ImagePayload,
        seed: i64,
    ) -> Result<String, ServiceError> {
        let request = self.build_request(image, seed);
        let description = log_llm_timing(
            "groq",
            &self.model,
            "describe",
            Some(json!({ "seed": seed, "mime_type": image.mime_type })),
            move || async move { service.complete(&request).await?.into_text() },
        )
        .await?;

        info!(
            "Described image with model={} seed={} ({} words)",
            self.model,
            seed,
            description.split_whitespace().count()
        );
        debug!("Description: {}", description);
        Ok(description)
    }
}
