//! HTTP adapter for OpenAI-compatible chat completion backends
//!
//! Routes each request to the endpoint configured for its backend id and
//! enforces the request deadline at the HTTP layer. Structured replies are
//! extracted from the raw text, so backends that wrap their JSON in prose
//! still decode.

use async_trait::async_trait;
use foreman_application::ports::inference_gateway::{
    GatewayError, InferenceGateway, InferenceRequest,
};
use foreman_domain::BackendId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Where one backend id resolves to
#[derive(Debug, Clone)]
pub struct BackendEndpoint {
    /// Base URL up to but not including `/chat/completions`
    pub base_url: String,
    pub model: String,
    /// Bearer token, already resolved from the environment
    pub api_key: Option<String>,
}

impl BackendEndpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// Inference gateway over OpenAI-compatible `/chat/completions` endpoints
pub struct HttpInferenceGateway {
    client: reqwest::Client,
    endpoints: HashMap<BackendId, BackendEndpoint>,
}

impl HttpInferenceGateway {
    pub fn new(endpoints: HashMap<BackendId, BackendEndpoint>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    fn endpoint(&self, backend: &BackendId) -> Result<&BackendEndpoint, GatewayError> {
        self.endpoints.get(backend).ok_or_else(|| {
            GatewayError::BackendUnavailable(format!("no endpoint configured for {backend}"))
        })
    }

    async fn chat(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        let endpoint = self.endpoint(&request.backend)?;
        let body = ChatRequest {
            model: &endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.2,
            stream: false,
        };

        debug!(
            backend = %request.backend,
            url = %endpoint.completions_url(),
            deadline_ms = request.deadline.as_millis() as u64,
            "dispatching completion"
        );

        let mut http = self
            .client
            .post(endpoint.completions_url())
            .timeout(request.deadline)
            .json(&body);
        if let Some(key) = &endpoint.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() >= 500 {
                GatewayError::BackendUnavailable(format!("{status}: {detail}"))
            } else {
                GatewayError::RequestFailed(format!("{status}: {detail}"))
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(format!("malformed response body: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::RequestFailed("reply carried no content".to_string()))
    }
}

fn classify_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::BackendUnavailable(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

/// Extract the first balanced JSON object embedded in free text.
///
/// Models frequently wrap their JSON in prose or fences; the caller only
/// cares about the object itself.
fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + ch.len_utf8()];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait]
impl InferenceGateway for HttpInferenceGateway {
    async fn complete_text(&self, request: InferenceRequest) -> Result<String, GatewayError> {
        self.chat(&request).await
    }

    async fn complete_structured(
        &self,
        request: InferenceRequest,
    ) -> Result<serde_json::Value, GatewayError> {
        let text = self.chat(&request).await?;
        extract_json_object(&text).ok_or_else(|| {
            GatewayError::SchemaInvalid(format!(
                "no JSON object in reply: {}",
                text.chars().take(120).collect::<String>()
            ))
        })
    }
}
