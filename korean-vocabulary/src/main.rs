use std::path::Path;

use clap::Parser;
use config::{Args, Config};
use dictionary::{Dictionary, Model, StudentLevel};
use render::{render_definition, render_help, render_history};
use session::{DefinitionSource, MediaState, Session, SessionError, Status};
use storage::Storage;
use theme::ThemeColor;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use utilities::{fallback, input, media_path, parse_position, write_media, Fallback};

mod config;
mod history;
mod render;
mod session;
mod storage;
mod theme;
mod utilities;

const COMMANDS: &[&str] = &[
    "define", "find", "search", "level", "model", "theme", "history", "open", "related", "image",
    "speak", "show", "reset", "help", "exit", "quit",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new(Args::parse());
    let dict = match Dictionary::new(config.dictionary.clone()) {
        Ok(dict) => dict,
        Err(error) => {
            eprintln!("{}", error.user_message());
            return Err(error.into());
        }
    };
    let storage = Storage::initialize(&config.db_url).await?;
    let mut session = Session::load(dict, storage).await?;
    session.set_level(config.level);
    session.set_model(config.model);

    println!(
        "맞춤 단어 사전 - {} / {} (명령어 안내: help)",
        session.level(),
        session.model()
    );
    if let Some(word) = &config.word {
        define_word(&mut session, word).await?;
    } else {
        print_history(&session);
    }

    loop {
        let Some(line) = input(">> ")? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "" => {}
            "exit" | "leave" | "quit" | "e" | "q" | "l" => {
                break;
            }
            "define" | "find" | "search" => {
                define_word(&mut session, rest).await?;
            }
            "level" => change_level(&mut session, rest),
            "model" => change_model(&mut session, rest),
            "theme" => change_theme(&mut session, rest).await?,
            "history" => {
                session.set_history_filter(rest);
                print_history(&session);
            }
            "open" => match parse_position(rest) {
                Some(index) => {
                    let result = session.select_history(index).await;
                    report_lookup(&session, result)?;
                }
                None => println!("사용법: open <기록 번호>"),
            },
            "related" => match parse_position(rest) {
                Some(index) => {
                    let result = session.select_related(index).await;
                    report_lookup(&session, result)?;
                }
                None => println!("사용법: related <단어 번호>"),
            },
            "image" => save_image(&mut session, rest, &config.media_dir).await,
            "speak" => save_speech(&mut session, rest, &config.media_dir).await,
            "show" => match session.displayed() {
                Some(displayed) => println!("{}", render_definition(displayed, session.theme())),
                None => print_history(&session),
            },
            "reset" => {
                session.reset();
                print_history(&session);
            }
            "help" => println!("{}", render_help()),
            other => match fallback(other, COMMANDS) {
                Fallback::Search => define_word(&mut session, line).await?,
                Fallback::Suggest(command) => {
                    println!("'{other}'은(는) 명령어가 아니에요. '{command}'을(를) 입력하려던 건가요?")
                }
            },
        }
    }
    Ok(())
}

async fn define_word<S: DefinitionSource>(
    session: &mut Session<S>,
    word: &str,
) -> anyhow::Result<()> {
    if word.trim().is_empty() {
        println!("사용법: define <단어>");
        return Ok(());
    }
    println!("'{}' 찾는 중... ({})", word.trim(), session.level());
    let result = session.search(word).await;
    report_lookup(session, result)
}

/// Prints the outcome of a lookup; only storage failures are fatal.
fn report_lookup<S: DefinitionSource>(
    session: &Session<S>,
    result: Result<bool, SessionError>,
) -> anyhow::Result<()> {
    match result {
        Ok(_) => {}
        Err(SessionError::Storage(error)) => return Err(error.into()),
        Err(error) => {
            println!("{error}");
            return Ok(());
        }
    }
    match session.status() {
        Status::Failed(message) => println!("{message}"),
        Status::Ready => {
            if let Some(displayed) = session.displayed() {
                println!("{}", render_definition(displayed, session.theme()));
            }
        }
        Status::Idle | Status::Loading { .. } => {}
    }
    Ok(())
}

fn print_history<S: DefinitionSource>(session: &Session<S>) {
    print!(
        "{}",
        render_history(
            &session.filtered_history(),
            session.history_filter(),
            session.history().len()
        )
    );
}

fn change_level<S: DefinitionSource>(session: &mut Session<S>, value: &str) {
    match value.parse::<StudentLevel>() {
        Ok(level) => {
            session.set_level(level);
            println!("학년: {level}");
        }
        Err(error) => {
            let levels = StudentLevel::ALL.map(|level| level.key()).join(", ");
            println!("{error} 다음 중에서 고르세요: {levels}");
        }
    }
}

fn change_model<S: DefinitionSource>(session: &mut Session<S>, value: &str) {
    match value.parse::<Model>() {
        Ok(model) => {
            session.set_model(model);
            println!("AI 모델: {model}");
        }
        Err(error) => println!("{error} basic 또는 pro 중에서 고르세요."),
    }
}

async fn change_theme<S: DefinitionSource>(
    session: &mut Session<S>,
    value: &str,
) -> anyhow::Result<()> {
    match value.parse::<ThemeColor>() {
        Ok(theme) => {
            session.set_theme(theme).await?;
            println!("{}테마 색상: {theme}\x1b[0m", theme.ansi());
        }
        Err(error) => {
            let colors = ThemeColor::ALL.map(|theme| theme.name()).join(", ");
            println!("{error} 다음 중에서 고르세요: {colors}");
        }
    }
    Ok(())
}

async fn save_image<S: DefinitionSource>(session: &mut Session<S>, value: &str, media_dir: &Path) {
    let Some(index) = parse_position(value) else {
        println!("사용법: image <뜻 번호>");
        return;
    };
    let image = match session.meaning_image(index).await {
        Ok(MediaState::Ready(image)) => image,
        Ok(MediaState::Failed) => {
            println!("그림을 불러오지 못했어요. 다시 시도하려면 'image {}'를 입력하세요.", index + 1);
            return;
        }
        Err(error) => {
            println!("{error}");
            return;
        }
    };
    let path = media_path(media_dir, &displayed_word(session), index + 1, image.extension());
    match write_media(&path, &image.bytes).await {
        Ok(()) => println!("그림을 저장했어요: {}", path.display()),
        Err(error) => {
            warn!("writing {} failed: {error}", path.display());
            println!("그림을 파일로 저장하지 못했어요: {error}");
        }
    }
}

async fn save_speech<S: DefinitionSource>(session: &mut Session<S>, value: &str, media_dir: &Path) {
    let Some(index) = parse_position(value) else {
        println!("사용법: speak <뜻 번호>");
        return;
    };
    let clip = match session.meaning_speech(index).await {
        Ok(MediaState::Ready(clip)) => clip,
        Ok(MediaState::Failed) => {
            println!("소리를 불러오지 못했어요. 다시 시도하려면 'speak {}'를 입력하세요.", index + 1);
            return;
        }
        Err(error) => {
            println!("{error}");
            return;
        }
    };
    let path = media_path(media_dir, &displayed_word(session), index + 1, "wav");
    let written = match clip.to_wav() {
        Ok(wav) => write_media(&path, &wav).await.map_err(|error| error.to_string()),
        Err(error) => Err(error.to_string()),
    };
    match written {
        Ok(()) => println!(
            "소리를 저장했어요: {} ({:.1}초)",
            path.display(),
            clip.duration().as_secs_f32()
        ),
        Err(error) => {
            warn!("writing {} failed: {error}", path.display());
            println!("소리를 파일로 저장하지 못했어요: {error}");
        }
    }
}

fn displayed_word<S: DefinitionSource>(session: &Session<S>) -> String {
    session
        .displayed()
        .map(|displayed| displayed.definition.word.clone())
        .unwrap_or_default()
}
