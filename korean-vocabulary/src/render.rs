use std::fmt::Write;

use dictionary::{Classification, Meaning, StudentLevel, WordDefinition};

use crate::history::HistoryEntry;
use crate::session::{Displayed, MediaState};
use crate::theme::ThemeColor;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

pub fn render_definition(displayed: &Displayed, theme: ThemeColor) -> String {
    let word = &displayed.definition;
    let accent = theme.ansi();
    let mut out = String::new();

    render_header(&mut out, word, accent);
    for (index, meaning) in word.meanings.iter().enumerate() {
        out.push('\n');
        render_meaning(&mut out, index, meaning, displayed, accent);
    }
    render_footer(&mut out, word, displayed.level, accent);
    out
}

fn render_header(out: &mut String, word: &WordDefinition, accent: &str) {
    let classification = word.classification();
    // homonyms carry one emoji per meaning instead
    if classification != Classification::Homonym && !word.emoji.is_empty() {
        let _ = write!(out, "{} ", word.emoji);
    }
    let _ = write!(out, "{BOLD}{accent}{}{RESET}", word.word);
    if !word.pronunciation.is_empty() {
        let _ = write!(out, " [{}]", word.pronunciation);
    }
    if let Some(badge) = classification.badge() {
        let _ = write!(out, "  <{badge}>");
    }
    out.push('\n');
    if !word.tags.is_empty() {
        let tags = word
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "{DIM}{tags}{RESET}");
    }
}

fn render_meaning(
    out: &mut String,
    index: usize,
    meaning: &Meaning,
    displayed: &Displayed,
    accent: &str,
) {
    let number = index + 1;
    let _ = write!(out, "{accent}{BOLD}{number}.{RESET} ");
    if !meaning.emoji.is_empty() {
        let _ = write!(out, "{} ", meaning.emoji);
    }
    let _ = write!(out, "{BOLD}{}{RESET}", meaning.context);
    if let Some(hanja) = &meaning.hanja {
        let _ = write!(out, " ({hanja})");
    }
    out.push('\n');

    if meaning.english_translation.is_empty() {
        let _ = writeln!(out, "    뜻: {}", meaning.definition);
    } else {
        let _ = writeln!(
            out,
            "    뜻 ({}): {}",
            meaning.english_translation, meaning.definition
        );
    }
    if !meaning.example_sentence.is_empty() {
        let _ = writeln!(out, "    \"{}\"", meaning.example_sentence);
    }
    if !meaning.synonyms.is_empty() {
        let _ = writeln!(out, "    유의어: {}", meaning.synonyms.join(", "));
    }
    if !meaning.antonyms.is_empty() {
        let _ = writeln!(out, "    반의어: {}", meaning.antonyms.join(", "));
    }
    if meaning.has_etymology_notes() {
        let heading = if displayed.level == StudentLevel::Elementary {
            "단어의 비밀"
        } else {
            "어원 풀이"
        };
        let _ = writeln!(out, "    {accent}{heading}{RESET}");
        let notes = [&meaning.etymology, &meaning.word_structure];
        for note in notes.into_iter().flatten() {
            for line in note.lines() {
                let _ = writeln!(out, "      {line}");
            }
        }
    }
    match displayed.image_state(index) {
        Some(MediaState::Ready(_)) => {
            let _ = writeln!(out, "    {DIM}[그림 준비됨]{RESET}");
        }
        Some(MediaState::Failed) => {
            let _ = writeln!(
                out,
                "    {DIM}[그림을 불러오지 못했어요 - 'image {number}'로 다시 시도]{RESET}"
            );
        }
        None => {}
    }
    if let Some(MediaState::Failed) = displayed.speech_state(index) {
        let _ = writeln!(
            out,
            "    {DIM}[소리를 불러오지 못했어요 - 'speak {number}'로 다시 시도]{RESET}"
        );
    }
}

fn render_footer(out: &mut String, word: &WordDefinition, level: StudentLevel, accent: &str) {
    if !word.idioms.is_empty() {
        let _ = writeln!(out, "\n{accent}관용 표현{RESET}");
        for idiom in &word.idioms {
            let _ = writeln!(out, "  - {}: {}", idiom.expression, idiom.meaning);
        }
    }
    if !word.related_words.is_empty() {
        let _ = writeln!(out, "\n{accent}함께 배우면 좋은 단어{RESET}");
        let related = word
            .related_words
            .iter()
            .enumerate()
            .map(|(index, related)| format!("[{}] {} {}", index + 1, related.emoji, related.word))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "  {related}");
    }
    if !word.literacy_improvement.is_empty() {
        let _ = writeln!(out, "\n{accent}문해력 쑥쑥{RESET} {DIM}({level}){RESET}");
        for line in word.literacy_improvement.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
}

/// Numbered history listing; the numbers are what `open` expects.
pub fn render_history(entries: &[&HistoryEntry], filter: &str, total: usize) -> String {
    let mut out = String::new();
    if total == 0 {
        out.push_str("궁금한 단어를 검색해보세요!\n학년에 맞춰 쉽게 설명해드립니다.\n");
        return out;
    }
    if filter.is_empty() {
        out.push_str("최근 검색한 단어\n");
    } else {
        let _ = writeln!(out, "최근 검색한 단어 ('{filter}' 포함)");
    }
    if entries.is_empty() {
        out.push_str("  검색 결과가 없습니다.\n");
        return out;
    }
    for (index, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {} ({}) {DIM}{}{RESET}",
            index + 1,
            entry.word,
            entry.level,
            entry.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    out
}

pub fn render_help() -> &'static str {
    "명령어:
  <단어> | define <단어>     선택한 학년에 맞춰 단어를 찾아요
  level <학년>              elementary, middle, high, academic
  model <basic|pro>         AI 모델을 골라요
  theme <색상>              indigo, rose, emerald, amber, violet, sky
  history [검색어]          최근 검색한 단어 (검색어 없이 입력하면 전체 보기)
  open <번호>               기록에 있는 단어를 그때의 학년으로 다시 찾아요
  related <번호>            함께 배우면 좋은 단어를 찾아요
  image <번호>              그 뜻을 그림으로 그려요
  speak <번호>              그 뜻을 소리로 읽어 wav 파일로 저장해요
  show                      지금 결과를 다시 보여 줘요
  reset                     지금 결과를 지워요
  exit                      끝내기"
}
