//! Gemini `generateContent` client

use std::time::Duration;

use async_trait::async_trait;
use hydra_core::config::AssistantConfig;
use hydra_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{split_data_uri, Assistant, AssistantReply, AssistantRequest, RequestKind};

const VIDEO_STYLE_SUFFIX: &str = " (cinematic style, 16:9, high fidelity)";
const EMPTY_TEXT_REPLY: &str = "No response from the core.";
const IMAGE_DONE_TEXT: &str = "Media generated successfully.";
const VIDEO_DONE_TEXT: &str = "Cinematic simulation complete.";

pub struct GeminiAssistant {
    client: reqwest::Client,
    base_url: String,
    text_model: String,
    image_model: String,
    system_instruction: String,
}

impl GeminiAssistant {
    /// Build a client. Fails when no API key is configured.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::ExternalService("no assistant API key configured".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| Error::ExternalService(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::ExternalService(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            system_instruction: config.system_instruction.clone(),
        })
    }

    async fn generate_content(&self, model: &str, body: &GenerateRequest<'_>) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        debug!(%status, model, "Assistant response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!("API returned {status}: {body}")));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| Error::ExternalService(format!("failed to parse API response: {e}")))
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    async fn generate(&self, request: &AssistantRequest) -> Result<AssistantReply> {
        let mut parts = Vec::new();
        if let Some((mime_type, data)) = request.attachment.as_deref().and_then(split_data_uri) {
            parts.push(Part::inline(mime_type, data));
        }

        match request.kind {
            RequestKind::Text => {
                parts.push(Part::text(request.prompt.clone()));
                let body = GenerateRequest {
                    contents: vec![Content::user(parts)],
                    system_instruction: Some(Content {
                        role: None,
                        parts: vec![Part::text(self.system_instruction.clone())],
                    }),
                };
                let response = self.generate_content(&self.text_model, &body).await?;
                let text = response.text();
                Ok(AssistantReply::text(if text.is_empty() {
                    EMPTY_TEXT_REPLY.to_string()
                } else {
                    text
                }))
            }
            kind => {
                let mut prompt = request.prompt.clone();
                if kind == RequestKind::Video {
                    prompt.push_str(VIDEO_STYLE_SUFFIX);
                }
                parts.push(Part::text(prompt));
                let body = GenerateRequest {
                    contents: vec![Content::user(parts)],
                    system_instruction: None,
                };
                let response = self.generate_content(&self.image_model, &body).await?;
                let media = response
                    .last_inline_data()
                    .ok_or_else(|| Error::ExternalService("no media in response".into()))?;

                Ok(if kind == RequestKind::Video {
                    AssistantReply {
                        text: VIDEO_DONE_TEXT.to_string(),
                        video: Some(media),
                        is_simulated_video: true,
                        ..Default::default()
                    }
                } else {
                    AssistantReply {
                        text: IMAGE_DONE_TEXT.to_string(),
                        image: Some(media),
                        ..Default::default()
                    }
                })
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn user(parts: Vec<Part<'a>>) -> Self {
        Self {
            role: Some("user"),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataRef<'a>,
    },
}

impl<'a> Part<'a> {
    fn text(text: String) -> Self {
        Part::Text { text }
    }

    fn inline(mime_type: &'a str, data: &'a str) -> Self {
        Part::Inline {
            inline_data: InlineDataRef { mime_type, data },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    fn text(&self) -> String {
        self.parts().filter_map(|p| p.text.as_deref()).collect()
    }

    fn last_inline_data(&self) -> Option<String> {
        self.parts().filter_map(|p| p.inline_data.as_ref()).last().map(|d| {
            format!(
                "data:{};base64,{}",
                d.mime_type.as_deref().unwrap_or("image/png"),
                d.data
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ask, CORE_FAILURE_REPLY};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiAssistant {
        let config = AssistantConfig {
            api_key: Some("test-key".into()),
            base_url: server.uri(),
            ..Default::default()
        };
        GeminiAssistant::from_config(&config).unwrap()
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(GeminiAssistant::from_config(&AssistantConfig::default()).is_err());
    }

    #[tokio::test]
    async fn text_prompt_uses_text_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-3-flash-preview:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Hello" }, { "text": " there" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate(&AssistantRequest::new("hi", None))
            .await
            .unwrap();
        assert_eq!(reply, AssistantReply::text("Hello there"));
    }

    #[tokio::test]
    async fn empty_text_gets_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate(&AssistantRequest::new("hi", None))
            .await
            .unwrap();
        assert_eq!(reply.text, EMPTY_TEXT_REPLY);
    }

    #[tokio::test]
    async fn image_prompt_returns_data_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "text": "here" },
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                ] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate(&AssistantRequest::new("desenhe um gato", None))
            .await
            .unwrap();
        assert_eq!(reply.image.as_deref(), Some("data:image/png;base64,QUJD"));
        assert!(!reply.is_simulated_video);
    }

    #[tokio::test]
    async fn video_prompt_is_a_simulated_still() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "WFla" } }
                ] } }]
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate(&AssistantRequest::new("criar video de uma praia", None))
            .await
            .unwrap();
        assert!(reply.is_simulated_video);
        assert_eq!(reply.video.as_deref(), Some("data:image/png;base64,WFla"));
        assert_eq!(reply.text, VIDEO_DONE_TEXT);
    }

    #[tokio::test]
    async fn server_error_degrades_to_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = AssistantRequest::new("hi", None);
        assert!(client.generate(&request).await.is_err());
        assert_eq!(ask(&client, &request).await.text, CORE_FAILURE_REPLY);
    }
}
