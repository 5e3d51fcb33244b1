//! Blocking client for the Gemini `generateContent` REST endpoint.

use serde::{Deserialize, Serialize};

use crate::service::{ChatContext, LanguageModel, ServiceError, SpeechToText};
use crate::tutor::prompt;
use crate::tutor::transcript::Role;

#[derive(Clone, Debug)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    /// Used for `generate`: scripts, judging, translation.
    pub script_model: String,
    pub transcription_model: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone)]
pub struct GeminiClient {
    settings: GeminiSettings,
    #[cfg(feature = "network")]
    http: reqwest::blocking::Client,
}

#[cfg(feature = "network")]
impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ServiceError> {
        let mut builder = reqwest::blocking::Client::builder();
        // reqwest's blocking client defaults to 30s; None means wait indefinitely
        builder = builder.timeout(settings.timeout_secs.map(std::time::Duration::from_secs));
        let http = builder
            .build()
            .map_err(|e| ServiceError::Request(e.to_string()))?;
        Ok(Self { settings, http })
    }

    fn call(&self, model: &str, body: &GenerateContentRequest) -> Result<String, ServiceError> {
        let url = format!("{}/{model}:generateContent", self.settings.base_url);
        log::debug!("POST {url} ({} contents)", body.contents.len());
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(body)
            .send()
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(map_http_error(status.as_u16(), &text));
        }
        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ServiceError::Response(format!("malformed body: {e}")))?;
        extract_text(parsed)
    }
}

#[cfg(not(feature = "network"))]
impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ServiceError> {
        Ok(Self { settings })
    }

    fn call(&self, _model: &str, _body: &GenerateContentRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Offline)
    }
}

impl LanguageModel for GeminiClient {
    fn send(&self, context: &ChatContext, message: &str) -> Result<String, ServiceError> {
        let body = GenerateContentRequest {
            contents: chat_contents(&context.history, message),
            system_instruction: Some(Content::system(&context.system_instruction)),
        };
        self.call(&context.model, &body)
    }

    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text("user", prompt)],
            system_instruction: None,
        };
        self.call(&self.settings.script_model, &body)
    }
}

impl SpeechToText for GeminiClient {
    fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, ServiceError> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt::transcription().to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime.to_string(),
                            data: STANDARD.encode(audio),
                        },
                    },
                ],
            }],
            system_instruction: None,
        };
        let text = self.call(&self.settings.transcription_model, &body)?;
        Ok(text.trim().to_string())
    }
}

/// History plus the new message as API contents. The API rejects two
/// consecutive turns from one role, so such runs are merged.
fn chat_contents(history: &[(Role, String)], message: &str) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::with_capacity(history.len() + 1);
    let all = history
        .iter()
        .map(|(role, text)| (*role, text.as_str()))
        .chain(std::iter::once((Role::User, message)));
    for (role, text) in all {
        let role = match role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        match contents.last_mut() {
            Some(last) if last.role == role => last.parts.push(Part::Text {
                text: text.to_string(),
            }),
            _ => contents.push(Content::text(role, text)),
        }
    }
    contents
}

fn map_http_error(status: u16, body: &str) -> ServiceError {
    let parsed = serde_json::from_str::<ErrorWrapper>(body).ok();
    let api_status = parsed
        .as_ref()
        .and_then(|w| w.error.status.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|w| w.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        ServiceError::Quota(message)
    } else {
        ServiceError::Request(format!("HTTP {status}: {message}"))
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ServiceError> {
    let text: String = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .ok_or_else(|| ServiceError::Response("no candidates in response".to_string()))?;
    Ok(text)
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }

    fn system(text: &str) -> Self {
        Self::text("system", text)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}
