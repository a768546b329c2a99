use std::time::Duration;

use tracing::info;

mod dictionary;
mod gemini_api;
mod media;
mod prompt;

pub use dictionary::{
    Classification, Idiom, Meaning, Model, RelatedWord, StudentLevel, UnknownLevel, UnknownModel,
    WordDefinition,
};
pub use media::{GeneratedImage, SpeechClip, SPEECH_SAMPLE_RATE};

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("no word was given")]
    EmptyWord,

    #[error("the service returned an empty response")]
    EmptyResponse,

    #[error("failed to decode the service response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("the API key was rejected")]
    Authentication,

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl DictionaryError {
    /// Message shown to the learner.
    pub fn user_message(&self) -> String {
        match self {
            DictionaryError::MissingApiKey => {
                "API 키가 설정되지 않았습니다. GEMINI_API_KEY 환경 변수를 확인해주세요.".to_owned()
            }
            DictionaryError::EmptyWord => "단어를 입력해주세요.".to_owned(),
            DictionaryError::EmptyResponse | DictionaryError::Decode(_) => {
                "단어 정보를 불러오지 못했습니다. 다시 시도해주세요.".to_owned()
            }
            DictionaryError::RateLimited => {
                "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.".to_owned()
            }
            DictionaryError::Authentication => {
                "API 키가 올바르지 않거나 권한이 없습니다.".to_owned()
            }
            DictionaryError::Api { .. } | DictionaryError::Network(_) => {
                "오류가 발생했습니다.".to_owned()
            }
        }
    }
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

#[derive(Debug, Clone)]
pub struct DictionaryConfig {
    pub api_key: String,
    pub api_url: String,
    pub image_model: String,
    pub speech_model: String,
    pub voice: String,
    pub timeout_seconds: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            voice: default_voice(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

pub struct Dictionary {
    client: reqwest::Client,
    config: DictionaryConfig,
}

impl Dictionary {
    /// Fails with [`DictionaryError::MissingApiKey`] when no credential is configured.
    pub fn new(config: DictionaryConfig) -> Result<Self, DictionaryError> {
        if config.api_key.trim().is_empty() {
            return Err(DictionaryError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// One request, no retries.
    pub async fn get_definition(
        &self,
        word: &str,
        level: StudentLevel,
        model: Model,
    ) -> Result<WordDefinition, DictionaryError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(DictionaryError::EmptyWord);
        }
        info!("requesting definition of {word:?} ({}, {})", level.key(), model.id());
        gemini_api::get_definition(&self.client, &self.config, word, level, model).await
    }

    /// Best effort: failures are logged and yield `None`.
    pub async fn generate_image(
        &self,
        word: &str,
        meaning: &Meaning,
        level: StudentLevel,
    ) -> Option<GeneratedImage> {
        media::generate_image(&self.client, &self.config, word, meaning, level).await
    }

    /// Best effort: failures are logged and yield `None`.
    pub async fn synthesize_speech(&self, text: &str) -> Option<SpeechClip> {
        media::synthesize_speech(&self.client, &self.config, text).await
    }
}
