//! Language-model summaries of individual messages
//!
//! Talks to an OpenAI-compatible chat completions endpoint with ureq.

use log::debug;
use serde::{Deserialize, Serialize};

/// Default OpenAI API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// The parts of a message the summary is based on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub subject: String,
    pub body: String,
    pub from: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("summary request failed: {0}")]
    Request(#[from] ureq::Error),
    #[error("summary response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for message summaries
#[derive(Debug, Clone)]
pub struct Summarizer {
    base_url: String,
    api_key: String,
    model: String,
}

impl Summarizer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a summary of one message
    pub fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
        };

        debug!("Requesting summary from {} ({})", self.base_url, self.model);
        let mut response = ureq::post(&format!("{}/chat/completions", self.base_url))
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)?;

        let chat: ChatResponse = response.body_mut().read_json()?;
        first_choice_text(chat)
    }
}

/// Single user prompt sent for a summary
pub fn build_prompt(request: &SummaryRequest) -> String {
    format!(
        "Please provide a clear, concise summary of the following email:\n\n\
         Subject: {}\n\
         From: {}\n\
         Content:\n\
         {}\n\n\
         Please summarize the key points and any required actions in a clear, professional manner.",
        request.subject, request.from, request.body
    )
}

fn first_choice_text(response: ChatResponse) -> Result<String, SummaryError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(SummaryError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SummaryRequest {
        SummaryRequest {
            subject: "Quarterly numbers".to_string(),
            body: "Revenue is up.\nPlease review by Friday.".to_string(),
            from: "cfo@example.com".to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_fields() {
        let prompt = build_prompt(&request());
        assert!(prompt.starts_with("Please provide a clear, concise summary"));
        assert!(prompt.contains("Subject: Quarterly numbers\n"));
        assert!(prompt.contains("From: cfo@example.com\n"));
        assert!(prompt.contains("Content:\nRevenue is up.\nPlease review by Friday.\n\n"));
        assert!(prompt.ends_with("clear, professional manner."));
    }

    #[test]
    fn test_first_choice_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{ "choices": [
                { "message": { "role": "assistant", "content": "Revenue is up." } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ] }"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "Revenue is up.");
    }

    #[test]
    fn test_empty_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        assert!(matches!(
            first_choice_text(response),
            Err(SummaryError::EmptyResponse)
        ));

        let response: ChatResponse =
            serde_json::from_str(r#"{ "choices": [ { "message": { "content": null } } ] }"#)
                .unwrap();
        assert!(matches!(
            first_choice_text(response),
            Err(SummaryError::EmptyResponse)
        ));
    }

    #[test]
    fn test_request_serialization() {
        let body = ChatRequest {
            model: DEFAULT_MODEL,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_builder() {
        let summarizer = Summarizer::new("sk-test")
            .with_base_url("http://localhost:11434/v1/")
            .with_model("llama3");
        assert_eq!(summarizer.base_url, "http://localhost:11434/v1");
        assert_eq!(summarizer.model(), "llama3");
    }
}
