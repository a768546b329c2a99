use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dictionary::{
    Dictionary, DictionaryError, GeneratedImage, Meaning, Model, SpeechClip, StudentLevel,
    WordDefinition,
};
use tracing::{debug, info, warn};

use crate::history::{History, HistoryEntry};
use crate::storage::Storage;
use crate::theme::ThemeColor;

/// Where definitions and media come from.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn define(
        &self,
        word: &str,
        level: StudentLevel,
        model: Model,
    ) -> Result<WordDefinition, DictionaryError>;

    async fn illustrate(
        &self,
        word: &str,
        meaning: &Meaning,
        level: StudentLevel,
    ) -> Option<GeneratedImage>;

    async fn speak(&self, text: &str) -> Option<SpeechClip>;
}

#[async_trait]
impl DefinitionSource for Dictionary {
    async fn define(
        &self,
        word: &str,
        level: StudentLevel,
        model: Model,
    ) -> Result<WordDefinition, DictionaryError> {
        self.get_definition(word, level, model).await
    }

    async fn illustrate(
        &self,
        word: &str,
        meaning: &Meaning,
        level: StudentLevel,
    ) -> Option<GeneratedImage> {
        self.generate_image(word, meaning, level).await
    }

    async fn speak(&self, text: &str) -> Option<SpeechClip> {
        self.synthesize_speech(text).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("먼저 단어를 검색해주세요.")]
    NothingDisplayed,
    #[error("{}번 항목이 없어요.", .0 + 1)]
    NoSuchItem(usize),
    #[error("검색 기록을 저장하지 못했습니다: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Loading { word: String },
    Ready,
    Failed(String),
}

/// Issued for every lookup. Only the most recently issued ticket may update the session.
#[derive(Debug)]
pub struct LookupTicket {
    seq: u64,
    word: String,
    level: StudentLevel,
    model: Model,
}

#[derive(Debug)]
pub enum MediaState<T> {
    Ready(Arc<T>),
    /// Last attempt produced nothing; asking again retries.
    Failed,
}

impl<T> Clone for MediaState<T> {
    fn clone(&self) -> Self {
        match self {
            MediaState::Ready(media) => MediaState::Ready(Arc::clone(media)),
            MediaState::Failed => MediaState::Failed,
        }
    }
}

#[derive(Debug, Default)]
struct MediaMemo {
    images: HashMap<usize, MediaState<GeneratedImage>>,
    speech: HashMap<usize, MediaState<SpeechClip>>,
}

/// The definition on screen together with the media fetched for it.
#[derive(Debug)]
pub struct Displayed {
    pub definition: WordDefinition,
    pub level: StudentLevel,
    media: MediaMemo,
}

impl Displayed {
    pub(crate) fn new(definition: WordDefinition, level: StudentLevel) -> Self {
        Self {
            definition,
            level,
            media: MediaMemo::default(),
        }
    }

    pub fn image_state(&self, index: usize) -> Option<&MediaState<GeneratedImage>> {
        self.media.images.get(&index)
    }

    pub fn speech_state(&self, index: usize) -> Option<&MediaState<SpeechClip>> {
        self.media.speech.get(&index)
    }
}

pub struct Session<S> {
    source: S,
    storage: Storage,
    history: History,
    history_filter: String,
    theme: ThemeColor,
    level: StudentLevel,
    model: Model,
    status: Status,
    displayed: Option<Displayed>,
    latest_seq: u64,
}

impl<S: DefinitionSource> Session<S> {
    /// Reads history and theme once; afterwards the store is only written to.
    pub async fn load(source: S, storage: Storage) -> sqlx::Result<Self> {
        let history = storage.load_history().await?;
        let theme = storage.load_theme().await?;
        info!("loaded {} history entries, theme {theme}", history.len());
        Ok(Self {
            source,
            storage,
            history,
            history_filter: String::new(),
            theme,
            level: StudentLevel::default(),
            model: Model::default(),
            status: Status::Idle,
            displayed: None,
            latest_seq: 0,
        })
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn displayed(&self) -> Option<&Displayed> {
        self.displayed.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn filtered_history(&self) -> Vec<&HistoryEntry> {
        self.history.filter(&self.history_filter)
    }

    pub fn history_filter(&self) -> &str {
        &self.history_filter
    }

    pub fn set_history_filter(&mut self, filter: &str) {
        self.history_filter = filter.trim().to_owned();
    }

    pub fn theme(&self) -> ThemeColor {
        self.theme
    }

    pub async fn set_theme(&mut self, theme: ThemeColor) -> sqlx::Result<()> {
        self.theme = theme;
        self.storage.save_theme(theme).await
    }

    pub fn level(&self) -> StudentLevel {
        self.level
    }

    pub fn set_level(&mut self, level: StudentLevel) {
        self.level = level;
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Back to the empty screen. History is kept.
    pub fn reset(&mut self) {
        self.status = Status::Idle;
        self.displayed = None;
    }

    /// Returns `None` for blank input, which leaves the session untouched.
    pub fn begin_lookup(&mut self, word: &str, level: StudentLevel) -> Option<LookupTicket> {
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        self.latest_seq += 1;
        self.status = Status::Loading {
            word: word.to_owned(),
        };
        Some(LookupTicket {
            seq: self.latest_seq,
            word: word.to_owned(),
            level,
            model: self.model,
        })
    }

    pub async fn fetch(&self, ticket: &LookupTicket) -> Result<WordDefinition, DictionaryError> {
        self.source
            .define(&ticket.word, ticket.level, ticket.model)
            .await
    }

    /// Applies a finished lookup. Returns `false` when a newer lookup was started
    /// in the meantime and the result was dropped.
    pub async fn finish_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<WordDefinition, DictionaryError>,
    ) -> Result<bool, SessionError> {
        if ticket.seq != self.latest_seq {
            debug!(
                "discarding response for {:?} (request {}, latest {})",
                ticket.word, ticket.seq, self.latest_seq
            );
            return Ok(false);
        }
        match result {
            Ok(definition) => {
                info!(
                    "showing {:?} with {} meanings",
                    definition.word,
                    definition.meanings.len()
                );
                self.history.record(&definition.word, ticket.level);
                self.displayed = Some(Displayed::new(definition, ticket.level));
                self.status = Status::Ready;
                self.storage.save_history(&self.history).await?;
            }
            Err(error) => {
                warn!("lookup of {:?} failed: {error}", ticket.word);
                self.status = Status::Failed(error.user_message());
            }
        }
        Ok(true)
    }

    pub async fn lookup(&mut self, word: &str, level: StudentLevel) -> Result<bool, SessionError> {
        let Some(ticket) = self.begin_lookup(word, level) else {
            return Ok(false);
        };
        let result = self.fetch(&ticket).await;
        self.finish_lookup(ticket, result).await
    }

    /// Looks up `word` at the selected level.
    pub async fn search(&mut self, word: &str) -> Result<bool, SessionError> {
        self.lookup(word, self.level).await
    }

    pub async fn select_related(&mut self, index: usize) -> Result<bool, SessionError> {
        let word = self
            .displayed
            .as_ref()
            .ok_or(SessionError::NothingDisplayed)?
            .definition
            .related_words
            .get(index)
            .ok_or(SessionError::NoSuchItem(index))?
            .word
            .clone();
        self.search(&word).await
    }

    /// Index into the filtered history. The item's level becomes the selected level.
    pub async fn select_history(&mut self, index: usize) -> Result<bool, SessionError> {
        let (word, level) = self
            .filtered_history()
            .get(index)
            .map(|entry| (entry.word.clone(), entry.level))
            .ok_or(SessionError::NoSuchItem(index))?;
        self.level = level;
        self.lookup(&word, level).await
    }

    pub async fn meaning_image(
        &mut self,
        index: usize,
    ) -> Result<MediaState<GeneratedImage>, SessionError> {
        let displayed = self
            .displayed
            .as_mut()
            .ok_or(SessionError::NothingDisplayed)?;
        let meaning = displayed
            .definition
            .meanings
            .get(index)
            .ok_or(SessionError::NoSuchItem(index))?;
        if let Some(MediaState::Ready(image)) = displayed.media.images.get(&index) {
            return Ok(MediaState::Ready(Arc::clone(image)));
        }
        let state = match self
            .source
            .illustrate(&displayed.definition.word, meaning, displayed.level)
            .await
        {
            Some(image) => MediaState::Ready(Arc::new(image)),
            None => MediaState::Failed,
        };
        displayed.media.images.insert(index, state.clone());
        Ok(state)
    }

    pub async fn meaning_speech(
        &mut self,
        index: usize,
    ) -> Result<MediaState<SpeechClip>, SessionError> {
        let displayed = self
            .displayed
            .as_mut()
            .ok_or(SessionError::NothingDisplayed)?;
        let meaning = displayed
            .definition
            .meanings
            .get(index)
            .ok_or(SessionError::NoSuchItem(index))?;
        if let Some(MediaState::Ready(clip)) = displayed.media.speech.get(&index) {
            return Ok(MediaState::Ready(Arc::clone(clip)));
        }
        let text = meaning.speech_text(&displayed.definition.word);
        let state = match self.source.speak(&text).await {
            Some(clip) => MediaState::Ready(Arc::new(clip)),
            None => MediaState::Failed,
        };
        displayed.media.speech.insert(index, state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dictionary::{Classification, RelatedWord};

    use super::*;

    #[derive(Clone)]
    enum Reply {
        Definition(WordDefinition),
        Malformed,
        RateLimited,
    }

    #[derive(Default)]
    struct FakeSource {
        replies: HashMap<String, Reply>,
        image_calls: AtomicUsize,
        speech_calls: AtomicUsize,
    }

    impl FakeSource {
        fn with(mut self, word: &str, reply: Reply) -> Self {
            self.replies.insert(word.to_owned(), reply);
            self
        }
    }

    #[async_trait]
    impl DefinitionSource for FakeSource {
        async fn define(
            &self,
            word: &str,
            _level: StudentLevel,
            _model: Model,
        ) -> Result<WordDefinition, DictionaryError> {
            match self.replies.get(word).cloned() {
                Some(Reply::Definition(definition)) => Ok(definition),
                Some(Reply::Malformed) => Err(DictionaryError::Decode(
                    serde_json::from_str::<serde_json::Value>("definitely not json").unwrap_err(),
                )),
                Some(Reply::RateLimited) => Err(DictionaryError::RateLimited),
                None => Err(DictionaryError::EmptyResponse),
            }
        }

        async fn illustrate(
            &self,
            _word: &str,
            _meaning: &Meaning,
            _level: StudentLevel,
        ) -> Option<GeneratedImage> {
            // the first attempt fails so retries can be observed
            if self.image_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return None;
            }
            Some(GeneratedImage {
                mime_type: "image/png".to_owned(),
                bytes: vec![1, 2, 3],
            })
        }

        async fn speak(&self, text: &str) -> Option<SpeechClip> {
            self.speech_calls.fetch_add(1, Ordering::SeqCst);
            Some(SpeechClip {
                sample_rate: dictionary::SPEECH_SAMPLE_RATE,
                samples: vec![0; text.len()],
            })
        }
    }

    fn meaning(context: &str, hanja: Option<&str>) -> Meaning {
        Meaning {
            context: context.to_owned(),
            definition: format!("{context}의 뜻"),
            example_sentence: format!("{context} 예문"),
            hanja: hanja.map(str::to_owned),
            ..Meaning::default()
        }
    }

    fn word(word: &str, meanings: Vec<Meaning>) -> WordDefinition {
        WordDefinition {
            word: word.to_owned(),
            meanings,
            literacy_improvement: format!("{word}에 대한 글"),
            related_words: vec![RelatedWord {
                word: "사과".to_owned(),
                emoji: "🍎".to_owned(),
            }],
            ..WordDefinition::default()
        }
    }

    fn pear() -> WordDefinition {
        word(
            "배",
            vec![
                meaning("과일", None),
                meaning("탈것", Some("舟")),
                meaning("신체", Some("腹")),
            ],
        )
    }

    fn source() -> FakeSource {
        FakeSource::default()
            .with("배", Reply::Definition(pear()))
            .with("사과", Reply::Definition(word("사과", vec![meaning("과일", None)])))
            .with("사랑", Reply::Definition(word("사랑", vec![meaning("마음", None)])))
            .with("깨짐", Reply::Malformed)
            .with("많이", Reply::RateLimited)
    }

    async fn session() -> Session<FakeSource> {
        let storage = Storage::in_memory().await.unwrap();
        Session::load(source(), storage).await.unwrap()
    }

    fn history_words<S: DefinitionSource>(session: &Session<S>) -> Vec<&str> {
        session
            .history()
            .entries()
            .iter()
            .map(|entry| &entry.word[..])
            .collect()
    }

    #[tokio::test]
    async fn homonym_lookup_at_elementary_level() {
        let mut session = session().await;
        assert!(session.lookup("배", StudentLevel::Elementary).await.unwrap());
        assert_eq!(session.status(), &Status::Ready);
        let displayed = session.displayed().unwrap();
        assert!(displayed.definition.meanings.len() >= 2);
        assert_eq!(displayed.definition.classification(), Classification::Homonym);
    }

    #[tokio::test]
    async fn single_meaning_lookup_records_one_entry() {
        let mut session = session().await;
        session.lookup("사랑", StudentLevel::High).await.unwrap();
        let displayed = session.displayed().unwrap();
        assert_eq!(displayed.definition.meanings.len(), 1);
        assert!(!displayed.definition.literacy_improvement.is_empty());
        let entries = session.history().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word, "사랑");
        assert_eq!(entries[0].level, StudentLevel::High);
    }

    #[tokio::test]
    async fn repeated_searches_are_deduplicated_and_persisted() {
        let mut session = session().await;
        for word in ["사과", "배", "사과"] {
            session.search(word).await.unwrap();
        }
        assert_eq!(history_words(&session), vec!["사과", "배"]);

        let stored = session.storage.load_history().await.unwrap();
        let stored = stored
            .entries()
            .iter()
            .map(|entry| entry.word.clone())
            .collect::<Vec<_>>();
        assert_eq!(stored, vec!["사과".to_owned(), "배".to_owned()]);
    }

    #[tokio::test]
    async fn failed_lookups_keep_the_previous_result_and_history() {
        let mut session = session().await;
        session.search("배").await.unwrap();

        session.search("깨짐").await.unwrap();
        assert_eq!(
            session.status(),
            &Status::Failed(DictionaryError::EmptyResponse.user_message())
        );
        assert_eq!(session.displayed().unwrap().definition.word, "배");
        assert_eq!(history_words(&session), vec!["배"]);

        session.search("많이").await.unwrap();
        assert_eq!(
            session.status(),
            &Status::Failed(DictionaryError::RateLimited.user_message())
        );
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn blank_input_does_nothing() {
        let mut session = session().await;
        assert!(!session.search("   ").await.unwrap());
        assert_eq!(session.status(), &Status::Idle);
    }

    #[tokio::test]
    async fn stale_responses_are_discarded() {
        let mut session = session().await;
        let first = session.begin_lookup("사과", StudentLevel::Middle).unwrap();
        let second = session.begin_lookup("배", StudentLevel::Middle).unwrap();

        let result = session.fetch(&second).await;
        assert!(session.finish_lookup(second, result).await.unwrap());
        let result = session.fetch(&first).await;
        assert!(!session.finish_lookup(first, result).await.unwrap());

        assert_eq!(session.displayed().unwrap().definition.word, "배");
        assert_eq!(history_words(&session), vec!["배"]);
    }

    #[tokio::test]
    async fn history_selection_restores_the_level() {
        let mut session = session().await;
        session.lookup("사랑", StudentLevel::High).await.unwrap();
        session.lookup("배", StudentLevel::Elementary).await.unwrap();

        session.set_history_filter("사");
        assert_eq!(session.filtered_history().len(), 1);
        session.select_history(0).await.unwrap();
        assert_eq!(session.level(), StudentLevel::High);
        assert_eq!(session.displayed().unwrap().definition.word, "사랑");
        assert_eq!(history_words(&session), vec!["사랑", "배"]);

        assert!(matches!(
            session.select_history(5).await,
            Err(SessionError::NoSuchItem(5))
        ));
    }

    #[tokio::test]
    async fn related_words_use_the_selected_level() {
        let mut session = session().await;
        assert!(matches!(
            session.select_related(0).await,
            Err(SessionError::NothingDisplayed)
        ));
        session.set_level(StudentLevel::Middle);
        session.search("배").await.unwrap();
        session.select_related(0).await.unwrap();
        assert_eq!(session.displayed().unwrap().definition.word, "사과");
        assert_eq!(session.history().entries()[0].level, StudentLevel::Middle);
    }

    #[tokio::test]
    async fn media_is_memoized_per_meaning_and_retried_after_failure() {
        let mut session = session().await;
        session.search("배").await.unwrap();

        assert!(matches!(session.meaning_image(1).await.unwrap(), MediaState::Failed));
        assert!(matches!(
            session.displayed().unwrap().image_state(1),
            Some(MediaState::Failed)
        ));
        assert!(matches!(session.meaning_image(1).await.unwrap(), MediaState::Ready(_)));
        assert!(matches!(session.meaning_image(1).await.unwrap(), MediaState::Ready(_)));
        assert_eq!(session.source.image_calls.load(Ordering::SeqCst), 2);

        session.meaning_speech(0).await.unwrap();
        session.meaning_speech(0).await.unwrap();
        assert_eq!(session.source.speech_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            session.meaning_image(7).await,
            Err(SessionError::NoSuchItem(7))
        ));
    }

    #[tokio::test]
    async fn navigating_discards_the_media_memo() {
        let mut session = session().await;
        session.search("배").await.unwrap();
        session.meaning_speech(0).await.unwrap();
        assert!(session.displayed().unwrap().speech_state(0).is_some());

        session.search("사과").await.unwrap();
        assert!(session.displayed().unwrap().speech_state(0).is_none());
        session.meaning_speech(0).await.unwrap();
        assert_eq!(session.source.speech_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reset_clears_the_screen_but_not_history() {
        let mut session = session().await;
        session.search("배").await.unwrap();
        session.reset();
        assert_eq!(session.status(), &Status::Idle);
        assert!(session.displayed().is_none());
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn theme_changes_are_written_through() {
        let mut session = session().await;
        assert_eq!(session.theme(), ThemeColor::Indigo);
        session.set_theme(ThemeColor::Violet).await.unwrap();
        assert_eq!(session.storage.load_theme().await.unwrap(), ThemeColor::Violet);
    }

    #[test]
    fn errors_read_in_korean_with_one_based_numbers() {
        assert_eq!(SessionError::NoSuchItem(4).to_string(), "5번 항목이 없어요.");
        assert_eq!(SessionError::NothingDisplayed.to_string(), "먼저 단어를 검색해주세요.");
    }
}
