use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_COMPLETION_TOKENS, SAMPLING_TEMPERATURE, SAMPLING_TOP_P};
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// Text of a plain message, or the concatenated text parts of a multi-part one.
    #[cfg(test)]
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Body of an OpenAI-compatible `/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
    pub seed: i64,
}

impl ChatRequest {
    /// Builds a non-streaming request with the fixed caption sampling settings.
    pub fn new(model: &str, messages: Vec<ChatMessage>, seed: i64) -> Self {
        ChatRequest {
            model: model.to_string(),
            messages,
            temperature: SAMPLING_TEMPERATURE,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            top_p: SAMPLING_TOP_P,
            stream: false,
            seed,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        ChatResponse {
            choices: vec![ChatChoice {
                message: ResponseMessage {
                    content: Some(text.into()),
                },
            }],
        }
    }

    /// Content of the first choice. Later choices are ignored.
    pub fn into_text(self) -> Result<String, ServiceError> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            ServiceError::MalformedResponse("response contained no choices".to_string())
        })?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// A remote chat-completion back end.
#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_serializes_in_wire_format() {
        let request = ChatRequest::new(
            "llama",
            vec![
                ChatMessage::system("rules"),
                ChatMessage::user_parts(vec![
                    ContentPart::Text {
                        text: "describe".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/jpeg;base64,AAAA".to_string(),
                        },
                    },
                ]),
            ],
            -7,
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama",
                "messages": [
                    { "role": "system", "content": "rules" },
                    {
                        "role": "user",
                        "content": [
                            { "type": "text", "text": "describe" },
                            { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAAA" } }
                        ]
                    }
                ],
                "temperature": 0.25,
                "max_completion_tokens": 1024,
                "top_p": 1.0,
                "stream": false,
                "seed": -7
            })
        );
    }

    #[test]
    fn first_choice_wins_and_null_content_is_empty() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "role": "assistant", "content": null } },
                { "message": { "role": "assistant", "content": "second" } }
            ]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "");
    }

    #[test]
    fn missing_choices_is_malformed() {
        let response: ChatResponse = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(ServiceError::MalformedResponse(_))
        ));
    }
}
