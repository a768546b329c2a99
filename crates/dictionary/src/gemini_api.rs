// https://ai.google.dev/api/generate-content - request and response bodies of models/*:generateContent

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::{definition_prompt, definition_schema};
use crate::{DictionaryConfig, DictionaryError, Model, StudentLevel, WordDefinition};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: String, generation_config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_owned()),
                parts: vec![Part {
                    text: Some(prompt),
                    inline_data: None,
                }],
            }],
            generation_config: Some(generation_config),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    /// Base64 encoded payload.
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Concatenated text of the first candidate, `None` when there is nothing but whitespace.
    pub fn text(&self) -> Option<String> {
        let text = self
            .parts()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|part| part.inline_data.as_ref())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub(crate) fn check_status(status: StatusCode, body: &str) -> Result<(), DictionaryError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(DictionaryError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DictionaryError::Authentication),
        status => {
            let message = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| body.trim().chars().take(200).collect());
            Err(DictionaryError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

pub(crate) async fn generate_content(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    model: &str,
    request: &GenerateContentRequest,
) -> Result<GenerateContentResponse, DictionaryError> {
    let url = format!(
        "{}/models/{model}:generateContent",
        config.api_url.trim_end_matches('/')
    );
    let res = client
        .post(url)
        .header("x-goog-api-key", &config.api_key)
        .json(request)
        .send()
        .await
        .map_err(DictionaryError::Network)?;
    let status = res.status();
    let body = res.text().await.map_err(DictionaryError::Network)?;
    check_status(status, &body)?;
    if body.trim().is_empty() {
        return Err(DictionaryError::EmptyResponse);
    }
    serde_json::from_str(&body).map_err(DictionaryError::Decode)
}

/// Removes a surrounding ```json ... ``` fence if the model added one.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) if rest[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &rest[newline + 1..]
        }
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

pub(crate) fn parse_definition(text: &str, requested: &str) -> Result<WordDefinition, DictionaryError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(DictionaryError::EmptyResponse);
    }
    let value: Value = serde_json::from_str(body).map_err(DictionaryError::Decode)?;
    if !value.is_object() {
        return Err(DictionaryError::Decode(serde::de::Error::custom(
            "expected a JSON object",
        )));
    }
    let definition: WordDefinition = serde_json::from_value(value).map_err(DictionaryError::Decode)?;
    Ok(definition.sanitize(requested))
}

pub(crate) async fn get_definition(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    word: &str,
    level: StudentLevel,
    model: Model,
) -> Result<WordDefinition, DictionaryError> {
    let request = GenerateContentRequest::from_prompt(
        definition_prompt(word, level),
        GenerationConfig {
            response_mime_type: Some("application/json".to_owned()),
            response_schema: Some(definition_schema()),
            ..GenerationConfig::default()
        },
    );
    let response = generate_content(client, config, model.id(), &request).await?;
    let text = response.text().ok_or(DictionaryError::EmptyResponse)?;
    parse_definition(&text, word)
}
