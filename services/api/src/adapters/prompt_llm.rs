//! services/api/src/adapters/prompt_llm.rs
//!
//! This module contains the adapter for the example-prompt generator LLM.
//! It implements the `PromptSuggestionService` port from the `core` crate.
//!
//! The model output is only accepted when it matches the expected shape:
//! exactly two prompts, each with an icon from the known icon list. The call
//! is retried up to three times with no backoff; this path only fills the
//! suggestion cards on the home screen, so a flat retry budget is enough.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use pintarai_core::constants::{is_known_icon, ICONS};
use pintarai_core::domain::ExamplePrompt;
use pintarai_core::ports::{PortError, PortResult, PromptSuggestionService};
use tracing::warn;

const MAX_ATTEMPTS: usize = 3;

const SYSTEM_INSTRUCTIONS: &str = "You are an expert curriculum developer for the Indonesian \
education system. Your task is to generate two highly specific and relevant example questions \
that a student might ask. Respond with ONLY a JSON array of exactly two objects, each with the \
keys \"icon\", \"title\" and \"prompt\". No prose, no code fences.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PromptSuggestionService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiPromptAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiPromptAdapter {
    /// Creates a new `OpenAiPromptAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn build_user_input(class_level: &str, subject: &str) -> String {
        format!(
            "The student is in: {class_level}\nThe subject is: {subject}\n\n\
             Instructions:\n\
             1. Generate exactly TWO distinct example questions.\n\
             2. The questions must be appropriate for the student's class level and subject \
             based on the current Indonesian curriculum. Avoid generic questions.\n\
             3. The question prompt text must be short and to the point (max 10 words), \
             in Bahasa Indonesia.\n\
             4. For each question, provide a short, catchy title in Bahasa Indonesia.\n\
             5. For each question, select the most appropriate icon from this list: {}.",
            ICONS.join(", ")
        )
    }

    async fn request_once(&self, class_level: &str, subject: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(Self::build_user_input(class_level, subject))
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(256u32)
            .temperature(0.9)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No prompts generated".to_string()))
    }
}

/// Parses and shape-checks a raw model response: a JSON array of exactly two
/// prompts, each with a known icon and non-empty text.
fn parse_prompts(raw: &str) -> Result<Vec<ExamplePrompt>, String> {
    // Models occasionally wrap the array in a code fence despite the
    // instructions; strip it before parsing.
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let prompts: Vec<ExamplePrompt> =
        serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON: {e}"))?;

    if prompts.len() != 2 {
        return Err(format!("expected exactly 2 prompts, got {}", prompts.len()));
    }
    for prompt in &prompts {
        if !is_known_icon(&prompt.icon) {
            return Err(format!("unknown icon '{}'", prompt.icon));
        }
        if prompt.title.trim().is_empty() || prompt.prompt.trim().is_empty() {
            return Err("empty title or prompt text".to_string());
        }
    }
    Ok(prompts)
}

//=========================================================================================
// `PromptSuggestionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PromptSuggestionService for OpenAiPromptAdapter {
    async fn generate_prompts(
        &self,
        class_level: &str,
        subject: &str,
    ) -> PortResult<Vec<ExamplePrompt>> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_once(class_level, subject).await {
                Ok(raw) => match parse_prompts(&raw) {
                    Ok(prompts) => return Ok(prompts),
                    Err(reason) => {
                        warn!("Prompt generation attempt {attempt} produced a bad shape: {reason}");
                    }
                },
                Err(e) => {
                    warn!("Prompt generation attempt {attempt} failed: {e}");
                }
            }
        }
        Err(PortError::Unexpected(
            "Failed to generate prompts after multiple attempts".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::parse_prompts;

    const GOOD: &str = r#"[
        {"icon": "Book", "title": "Soal cerita perkalian", "prompt": "Buatkan 5 soal cerita tentang perkalian."},
        {"icon": "FlaskConical", "title": "Jelaskan pecahan", "prompt": "Jelaskan apa itu bilangan pecahan."}
    ]"#;

    #[test]
    fn accepts_a_well_shaped_response() {
        let prompts = parse_prompts(GOOD).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].icon, "Book");
    }

    #[test]
    fn accepts_a_code_fenced_response() {
        let fenced = format!("```json\n{GOOD}\n```");
        assert_eq!(parse_prompts(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn rejects_the_wrong_prompt_count() {
        let one = r#"[{"icon": "Book", "title": "t", "prompt": "p"}]"#;
        assert!(parse_prompts(one).unwrap_err().contains("exactly 2"));
    }

    #[test]
    fn rejects_unknown_icons() {
        let bad = r#"[
            {"icon": "Rocket", "title": "t", "prompt": "p"},
            {"icon": "Book", "title": "t", "prompt": "p"}
        ]"#;
        assert!(parse_prompts(bad).unwrap_err().contains("unknown icon"));
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(parse_prompts("Here are two questions: ...").is_err());
    }
}
