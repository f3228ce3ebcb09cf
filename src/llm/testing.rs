use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::llm::types::{ChatCompletionService, ChatRequest, ChatResponse};

type Responder = Box<dyn Fn(&ChatRequest) -> Result<ChatResponse, ServiceError> + Send + Sync>;

/// In-memory stand-in for the remote service that records every request.
pub struct RecordingService {
    responder: Responder,
    calls: Arc<Mutex<Vec<ChatRequest>>>,
}

impl RecordingService {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ChatResponse, ServiceError> + Send + Sync + 'static,
    {
        RecordingService {
            responder: Box::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        RecordingService::new(move |_| Ok(ChatResponse::from_text(text.clone())))
    }

    /// Answers with the text of the last message in the request.
    pub fn echo() -> Self {
        RecordingService::new(|request| {
            let text = request
                .messages
                .last()
                .map(|message| message.text())
                .unwrap_or_default();
            Ok(ChatResponse::from_text(text))
        })
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ChatCompletionService for RecordingService {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.calls.lock().push(request.clone());
        (self.responder)(request)
    }
}
