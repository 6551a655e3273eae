//! services/api/src/adapters/answer_llm.rs
//!
//! This module contains the adapter for the main question-answering LLM.
//! It implements the `AnswerService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use pintarai_core::domain::AnswerRequest;
use pintarai_core::ports::{AnswerService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = "You are an AI assistant that helps Indonesian students answer \
homework questions. Answer in Bahasa Indonesia, at a depth appropriate for the student's class \
level. Be patient and explain the reasoning step by step, not just the final result. If a file is \
attached, treat it as the primary context for the question.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnswerAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnswerAdapter {
    /// Creates a new `OpenAiAnswerAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Renders the structured input into the user turn's text block.
    fn build_question_text(request: &AnswerRequest) -> String {
        let mut text = format!(
            "The student is in {} and is asking a question about {}.\n\nQuestion: {}",
            request.class_level, request.subject, request.question_text
        );
        // Non-image attachments cannot be passed as vision input; reference
        // them by name so the model knows context is missing.
        if request.uploaded_file_uri.is_some() && !Self::is_image_attachment(request) {
            if let Some(name) = &request.file_name {
                text.push_str(&format!(
                    "\n\nThe student attached a file named '{}' that could not be displayed.",
                    name
                ));
            }
        }
        text
    }

    fn is_image_attachment(request: &AnswerRequest) -> bool {
        request
            .uploaded_file_uri
            .as_deref()
            .map(|uri| uri.starts_with("data:image"))
            .unwrap_or(false)
    }
}

//=========================================================================================
// `AnswerService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerService for OpenAiAnswerAdapter {
    /// Answers a student's question given its class-level/subject context and
    /// optional attached file.
    async fn answer_question(&self, request: &AnswerRequest) -> PortResult<String> {
        let question_text = Self::build_question_text(request);

        let mut parts = vec![ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(question_text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        // Image data URIs are sent as vision input alongside the question.
        if Self::is_image_attachment(request) {
            if let Some(uri) = &request.uploaded_file_uri {
                parts.push(
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(
                            ImageUrlArgs::default()
                                .url(uri.clone())
                                .build()
                                .map_err(|e| PortError::Unexpected(e.to_string()))?,
                        )
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?
                        .into(),
                );
            }
        }

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No answer generated".to_string()))?;

        Ok(answer.trim().to_string())
    }
}
