use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Audience tier that controls tone and vocabulary of the generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StudentLevel {
    #[default]
    Elementary,
    Middle,
    High,
    Academic,
}

impl StudentLevel {
    pub const ALL: [StudentLevel; 4] = [
        StudentLevel::Elementary,
        StudentLevel::Middle,
        StudentLevel::High,
        StudentLevel::Academic,
    ];

    /// Stable key used for persistence.
    pub fn key(&self) -> &'static str {
        match self {
            StudentLevel::Elementary => "elementary",
            StudentLevel::Middle => "middle",
            StudentLevel::High => "high",
            StudentLevel::Academic => "academic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StudentLevel::Elementary => "초등학생",
            StudentLevel::Middle => "중학생",
            StudentLevel::High => "고등학생",
            StudentLevel::Academic => "학술(전문가)",
        }
    }
}

impl fmt::Display for StudentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("알 수 없는 학년입니다: {0:?}")]
pub struct UnknownLevel(pub String);

impl FromStr for StudentLevel {
    type Err = UnknownLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "elementary" | "e" | "초등" | "초등학생" => Ok(StudentLevel::Elementary),
            "middle" | "m" | "중등" | "중학생" => Ok(StudentLevel::Middle),
            "high" | "h" | "고등" | "고등학생" => Ok(StudentLevel::High),
            "academic" | "a" | "학술" | "전문가" | "학술(전문가)" => Ok(StudentLevel::Academic),
            _ => Err(UnknownLevel(value.to_owned())),
        }
    }
}

/// Text-generation model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Model {
    #[default]
    Basic,
    Pro,
}

impl Model {
    pub fn id(&self) -> &'static str {
        match self {
            Model::Basic => "gemini-3-flash-preview",
            Model::Pro => "gemini-3-pro-preview",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Model::Basic => "기본 (Fast)",
            Model::Pro => "고성능 (Pro)",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("알 수 없는 AI 모델입니다: {0:?}")]
pub struct UnknownModel(pub String);

impl FromStr for Model {
    type Err = UnknownModel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "basic" | "fast" | "flash" | "기본" => Ok(Model::Basic),
            "pro" | "advanced" | "고성능" => Ok(Model::Pro),
            _ => Err(UnknownModel(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WordDefinition {
    #[serde(deserialize_with = "null_as_default")]
    pub word: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emoji: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pronunciation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meanings: Vec<Meaning>,
    #[serde(deserialize_with = "null_as_default")]
    pub literacy_improvement: String,
    #[serde(deserialize_with = "null_as_default")]
    pub idioms: Vec<Idiom>,
    #[serde(deserialize_with = "null_as_default")]
    pub related_words: Vec<RelatedWord>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meaning {
    #[serde(deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emoji: String,
    #[serde(deserialize_with = "null_as_default")]
    pub definition: String,
    #[serde(deserialize_with = "null_as_default")]
    pub english_translation: String,
    /// Origin marker: the Hanja spelling for Sino-Korean meanings, absent for native words.
    pub hanja: Option<String>,
    pub pronunciation: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub example_sentence: String,
    #[serde(deserialize_with = "null_as_default")]
    pub synonyms: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub antonyms: Vec<String>,
    pub etymology: Option<String>,
    pub word_structure: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelatedWord {
    #[serde(deserialize_with = "null_as_default")]
    pub word: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emoji: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Idiom {
    #[serde(deserialize_with = "null_as_default")]
    pub expression: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meaning: String,
}

/// Display label for a word with several meanings. Best effort: derived from
/// optional origin markers, not a verified linguistic fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Single,
    Homonym,
    Polysemous,
}

impl Classification {
    pub fn badge(&self) -> Option<&'static str> {
        match self {
            Classification::Single => None,
            Classification::Homonym => Some("동음이의어"),
            Classification::Polysemous => Some("다의어"),
        }
    }
}

const NATIVE_ORIGIN: &str = "native";

impl Meaning {
    /// Meanings without a Hanja marker all share the native origin.
    pub fn origin_key(&self) -> &str {
        match self.hanja.as_deref().map(str::trim) {
            Some(hanja) if !hanja.is_empty() => hanja,
            _ => NATIVE_ORIGIN,
        }
    }

    pub fn has_etymology_notes(&self) -> bool {
        let long_enough = |text: &Option<String>| {
            text.as_deref()
                .map(|text| text.chars().count() > 2)
                .unwrap_or(false)
        };
        long_enough(&self.etymology) || long_enough(&self.word_structure)
    }

    /// What gets read aloud for this meaning.
    pub fn speech_text(&self, word: &str) -> String {
        if self.example_sentence.is_empty() {
            format!("{word}. {}", self.definition)
        } else {
            format!("{word}. {}", self.example_sentence)
        }
    }

    fn sanitize(mut self) -> Self {
        trim_in_place(&mut self.context);
        trim_in_place(&mut self.emoji);
        trim_in_place(&mut self.definition);
        trim_in_place(&mut self.english_translation);
        trim_in_place(&mut self.example_sentence);
        self.hanja = non_blank(self.hanja);
        self.pronunciation = non_blank(self.pronunciation);
        self.etymology = non_blank(self.etymology);
        self.word_structure = non_blank(self.word_structure);
        clean_list(&mut self.synonyms);
        clean_list(&mut self.antonyms);
        self
    }
}

impl WordDefinition {
    pub fn classification(&self) -> Classification {
        if self.meanings.len() <= 1 {
            return Classification::Single;
        }
        let origins = self
            .meanings
            .iter()
            .map(Meaning::origin_key)
            .collect::<HashSet<&str>>();
        if origins.len() > 1 {
            Classification::Homonym
        } else {
            Classification::Polysemous
        }
    }

    /// Normalizes a freshly decoded service response. Blank entries are
    /// dropped and a missing headword falls back to the word that was asked for.
    pub(crate) fn sanitize(mut self, requested: &str) -> Self {
        trim_in_place(&mut self.word);
        if self.word.is_empty() {
            self.word = requested.trim().to_owned();
        }
        trim_in_place(&mut self.emoji);
        trim_in_place(&mut self.pronunciation);
        trim_in_place(&mut self.literacy_improvement);
        self.meanings = self
            .meanings
            .into_iter()
            .map(Meaning::sanitize)
            .filter(|meaning| !meaning.context.is_empty() || !meaning.definition.is_empty())
            .collect();
        self.idioms = self
            .idioms
            .into_iter()
            .map(|mut idiom| {
                trim_in_place(&mut idiom.expression);
                trim_in_place(&mut idiom.meaning);
                idiom
            })
            .filter(|idiom| !idiom.expression.is_empty())
            .collect();
        self.related_words = self
            .related_words
            .into_iter()
            .map(|mut related| {
                trim_in_place(&mut related.word);
                trim_in_place(&mut related.emoji);
                related
            })
            .filter(|related| !related.word.is_empty())
            .collect();
        clean_list(&mut self.tags);
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn trim_in_place(text: &mut String) {
    let trimmed = text.trim();
    if trimmed.len() != text.len() {
        *text = trimmed.to_owned();
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn clean_list(items: &mut Vec<String>) {
    items.iter_mut().for_each(trim_in_place);
    items.retain(|item| !item.is_empty());
}
