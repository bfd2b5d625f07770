//! Wire types for the OpenAI-compatible chat completions endpoint.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`. Always non-streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// The subset of the response envelope we read.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if any.
    pub fn into_first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_correctly() {
        let request = CompletionRequest {
            model: "sonar-pro".into(),
            messages: vec![ChatMessage::system("be terse"), ChatMessage::user("hi")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "sonar-pro",
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn response_first_content() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{}"}}],"citations":[]}"#;
        let response: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_first_content().as_deref(), Some("{}"));
    }

    #[test]
    fn response_without_choices() {
        let response: CompletionResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(response.into_first_content().is_none());
    }
}
