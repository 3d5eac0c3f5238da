//! Gemini-backed quest provider.
//!
//! Calls the `generateContent` endpoint with a strict JSON response schema
//! and maps the returned object onto a [`GeneratedQuest`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::provider::{
    GeneratedQuest, GenerationRequest, ProviderError, QuestProvider, TimeTheme,
};

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 20,
        }
    }
}

impl GeminiConfig {
    /// Defaults plus the key from `GEMINI_API_KEY`, or `API_KEY`.
    pub fn from_env() -> Self {
        let api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty());
        Self {
            api_key,
            ..Self::default()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// The object the model is constrained to return.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestPayload {
    title: String,
    instruction: String,
    encouragement: String,
    tag: String,
    quest_type: String,
    #[serde(default)]
    rationale: Option<String>,
}

const REQUIRED_FIELDS: [&str; 6] = [
    "title",
    "instruction",
    "encouragement",
    "tag",
    "questType",
    "rationale",
];

fn response_schema() -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = REQUIRED_FIELDS
        .iter()
        .map(|field| (field.to_string(), serde_json::json!({ "type": "STRING" })))
        .collect();
    serde_json::json!({
        "type": "OBJECT",
        "properties": properties,
        "required": REQUIRED_FIELDS,
    })
}

pub(crate) fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let theme = TimeTheme::for_hour(request.local_hour);
    format!(
        "You are a leading positive psychologist. Design a one-minute micro-quest for a user \
         with personality type {code}, currently at: {situation}, feeling: {mood}.\n\
         \n\
         Guidelines:\n\
         1. Immediacy: it must be doable right now, where they are.\n\
         2. Senses: engage sight, hearing, touch or another sense.\n\
         3. Rationale: give the scientific or psychological reason the action shifts mood.\n\
         4. Theme: match the time of day, which calls for {theme}.\n\
         \n\
         Respond with JSON: {{ title, instruction, encouragement, tag, questType, rationale }}",
        code = request.profile.code(),
        situation = request.situation.label(),
        mood = request.mood_label,
        theme = theme.description(),
    )
}

/// Pull the quest out of a `generateContent` response body.
fn parse_response(body: GenerateResponse) -> Result<GeneratedQuest, ProviderError> {
    let text = body
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
        .ok_or_else(|| ProviderError::Malformed("empty response".to_string()))?;

    let payload: QuestPayload = serde_json::from_str(&text)
        .map_err(|e| ProviderError::Malformed(format!("schema violation: {}", e)))?;

    for (name, value) in [
        ("title", &payload.title),
        ("instruction", &payload.instruction),
    ] {
        if value.trim().is_empty() {
            return Err(ProviderError::Malformed(format!("empty {}", name)));
        }
    }

    Ok(GeneratedQuest {
        title: payload.title,
        instruction: payload.instruction,
        encouragement: payload.encouragement,
        tag: payload.tag,
        quest_type: payload.quest_type,
        rationale: payload.rationale,
        is_default: false,
    })
}

#[async_trait]
impl QuestProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedQuest, ProviderError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(ProviderError::MissingCredential),
        };

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(request)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("failed to parse response: {}", e)))?;

        parse_response(parsed)
    }
}
