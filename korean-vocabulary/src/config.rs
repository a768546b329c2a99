use std::env;
use std::path::PathBuf;

use clap::Parser;
use dictionary::{DictionaryConfig, Model, StudentLevel};

#[derive(Parser, Debug)]
#[command(version, about = "맞춤 단어 사전: Korean word definitions tuned to a student level")]
pub struct Args {
    /// SQLite database holding search history and settings
    #[arg(long, env = "VOCAB_DB_URL", default_value = "sqlite://vocabulary.db")]
    pub db: String,

    /// Directory generated images and speech are written to
    #[arg(long, env = "VOCAB_MEDIA_DIR", default_value = "media")]
    pub media_dir: PathBuf,

    /// Starting level: elementary, middle, high or academic
    #[arg(long, default_value = "elementary")]
    pub level: StudentLevel,

    /// basic or pro
    #[arg(long, default_value = "basic")]
    pub model: Model,

    /// Word to look up right away
    pub word: Option<String>,
}

pub struct Config {
    pub dictionary: DictionaryConfig,
    pub db_url: String,
    pub media_dir: PathBuf,
    pub level: StudentLevel,
    pub model: Model,
    pub word: Option<String>,
}

impl Config {
    pub fn new(args: Args) -> Self {
        Self {
            dictionary: dictionary_config(|key| env::var(key).ok()),
            db_url: args.db,
            media_dir: args.media_dir,
            level: args.level,
            model: args.model,
            word: args.word,
        }
    }
}

fn dictionary_config(var: impl Fn(&str) -> Option<String>) -> DictionaryConfig {
    let defaults = DictionaryConfig::default();
    let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());

    DictionaryConfig {
        api_key: non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .unwrap_or_default(),
        api_url: non_empty("GEMINI_API_URL").unwrap_or(defaults.api_url),
        image_model: non_empty("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
        speech_model: non_empty("GEMINI_SPEECH_MODEL").unwrap_or(defaults.speech_model),
        voice: non_empty("GEMINI_VOICE").unwrap_or(defaults.voice),
        timeout_seconds: non_empty("GEMINI_TIMEOUT_SECONDS")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(defaults.timeout_seconds), // 60 seconds default
    }
}
