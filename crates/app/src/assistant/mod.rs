//! Assistant collaborator
//!
//! The chat view talks to an [`Assistant`]. Failures never reach the user as
//! errors: [`ask`] turns them into a fixed apology reply.

mod classify;
mod gemini;

use async_trait::async_trait;
use hydra_core::{Error, Result};
use serde::Serialize;
use tracing::{error, instrument};

pub use classify::RequestKind;
pub use gemini::GeminiAssistant;

/// Shown in place of a reply when the assistant fails
pub const CORE_FAILURE_REPLY: &str =
    "Critical core error. Check that your API key is valid or try again in a moment.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantRequest {
    pub prompt: String,
    /// Optional image as a `data:` URI
    pub attachment: Option<String>,
    pub kind: RequestKind,
}

impl AssistantRequest {
    pub fn new(prompt: impl Into<String>, attachment: Option<String>) -> Self {
        let prompt = prompt.into();
        let kind = RequestKind::classify(&prompt);
        Self {
            prompt,
            attachment,
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub image: Option<String>,
    pub video: Option<String>,
    /// The "video" is a generated still standing in for a clip
    pub is_simulated_video: bool,
}

impl AssistantReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Assistant: Send + Sync {
    async fn generate(&self, request: &AssistantRequest) -> Result<AssistantReply>;
}

/// Ask the assistant; any error becomes [`CORE_FAILURE_REPLY`]
#[instrument(skip_all, fields(kind = ?request.kind))]
pub async fn ask(assistant: &dyn Assistant, request: &AssistantRequest) -> AssistantReply {
    match assistant.generate(request).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "Assistant request failed");
            AssistantReply::text(CORE_FAILURE_REPLY)
        }
    }
}

/// Used when no API key is configured
pub struct Unconfigured;

#[async_trait]
impl Assistant for Unconfigured {
    async fn generate(&self, _request: &AssistantRequest) -> Result<AssistantReply> {
        Err(Error::ExternalService("no assistant API key configured".into()))
    }
}

/// Split a `data:<mime>;base64,<payload>` URI. Mime defaults to `image/jpeg`.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64").unwrap_or(header);
    let mime = if mime.is_empty() { "image/jpeg" } else { mime };
    Some((mime, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Assistant for Echo {
        async fn generate(&self, request: &AssistantRequest) -> Result<AssistantReply> {
            Ok(AssistantReply::text(format!("echo: {}", request.prompt)))
        }
    }

    #[tokio::test]
    async fn ask_passes_replies_through() {
        let reply = ask(&Echo, &AssistantRequest::new("hi", None)).await;
        assert_eq!(reply.text, "echo: hi");
    }

    #[tokio::test]
    async fn ask_degrades_errors_to_apology() {
        let reply = ask(&Unconfigured, &AssistantRequest::new("hi", None)).await;
        assert_eq!(reply, AssistantReply::text(CORE_FAILURE_REPLY));
    }

    #[test]
    fn request_is_classified_on_construction() {
        assert_eq!(AssistantRequest::new("desenhe um gato", None).kind, RequestKind::Image);
        assert_eq!(AssistantRequest::new("explain rust", None).kind, RequestKind::Text);
    }

    #[test]
    fn data_uri_parts() {
        assert_eq!(split_data_uri("data:image/png;base64,AAAA"), Some(("image/png", "AAAA")));
        assert_eq!(split_data_uri("data:;base64,BB"), Some(("image/jpeg", "BB")));
        assert_eq!(split_data_uri("https://x/y.png"), None);
    }
}
