use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Reads one line from stdin. `None` once stdin is closed.
pub fn input(prompt: &str) -> io::Result<Option<String>> {
    let mut line = String::new();
    print!("{prompt}");
    io::stdout().flush()?;
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Closest known command, if the typo is close enough to guess.
pub fn suggest<'a>(typed: &str, known: &[&'a str]) -> Option<&'a str> {
    let typed = typed.to_lowercase();
    known
        .iter()
        .map(|candidate| (*candidate, strsim::jaro(candidate, &typed)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate)
}

/// What to do with input that is not a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Fallback<'a> {
    Search,
    Suggest(&'a str),
}

/// Near misses of a command get a suggestion, anything else is a word to look up.
pub fn fallback<'a>(typed: &str, known: &[&'a str]) -> Fallback<'a> {
    if !typed.is_ascii() {
        return Fallback::Search;
    }
    match suggest(typed, known) {
        Some(command) => Fallback::Suggest(command),
        None => Fallback::Search,
    }
}

/// 1-based list position typed by the user, as an index.
pub fn parse_position(text: &str) -> Option<usize> {
    text.trim()
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
}

/// Reduces a headword to something safe to use as a file name.
pub fn file_stem(word: &str) -> String {
    let stem = word
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    if stem.chars().all(|c| c == '_') {
        "word".to_owned()
    } else {
        stem
    }
}

pub fn media_path(media_dir: &Path, word: &str, position: usize, extension: &str) -> PathBuf {
    media_dir.join(format!("{}-{position}.{extension}", file_stem(word)))
}

pub async fn write_media(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await
}
