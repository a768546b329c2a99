use chrono::{DateTime, Utc};
use dictionary::StudentLevel;
use sqlx::{migrate::MigrateDatabase, query, query_as, FromRow, Pool, Sqlite, SqlitePool};
use tracing::warn;

use crate::history::{History, HistoryEntry};
use crate::theme::ThemeColor;

const THEME_KEY: &str = "theme";

#[derive(Debug, FromRow)]
struct HistoryRow {
    word: String,
    level: String,
    searched_at: DateTime<Utc>,
}

/// Durable home of the search history and the theme preference.
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn initialize(db_url: &str) -> sqlx::Result<Self> {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }
        let pool = SqlitePool::connect(db_url).await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    /// A private database that lives as long as the storage.
    #[cfg(test)]
    pub async fn in_memory() -> sqlx::Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;
        use std::time::Duration;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }
}

impl Storage {
    /// Rows that no longer parse are skipped.
    pub async fn load_history(&self) -> sqlx::Result<History> {
        let rows: Vec<HistoryRow> =
            query_as("SELECT word, level, searched_at FROM search_history ORDER BY position")
                .fetch_all(&self.pool)
                .await?;
        let entries = rows.into_iter().filter_map(|row| match row.level.parse::<StudentLevel>() {
            Ok(level) => Some(HistoryEntry {
                word: row.word,
                level,
                timestamp: row.searched_at,
            }),
            Err(error) => {
                warn!("skipping history entry {:?}: {error}", row.word);
                None
            }
        });
        Ok(History::from_entries(entries))
    }

    /// Replaces the stored list with `history`.
    pub async fn save_history(&self, history: &History) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;
        query("DELETE FROM search_history")
            .execute(&mut *tx)
            .await?;
        for (position, entry) in history.entries().iter().enumerate() {
            query("INSERT INTO search_history(position, word, level, searched_at) VALUES(?, ?, ?, ?)")
                .bind(position as i64)
                .bind(&entry.word)
                .bind(entry.level.key())
                .bind(entry.timestamp)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    /// Falls back to the default theme when nothing valid is stored.
    pub async fn load_theme(&self) -> sqlx::Result<ThemeColor> {
        let value: Option<(String,)> = query_as("SELECT value FROM settings WHERE key = ?")
            .bind(THEME_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match value {
            Some((value,)) => value.parse::<ThemeColor>().unwrap_or_else(|error| {
                warn!("ignoring stored theme: {error}");
                ThemeColor::default()
            }),
            None => ThemeColor::default(),
        })
    }

    pub async fn save_theme(&self, theme: ThemeColor) -> sqlx::Result<()> {
        query(
            "INSERT INTO settings(key, value) VALUES(?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(THEME_KEY)
        .bind(theme.name())
        .execute(&self.pool)
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_survives_a_round_trip_in_order() {
        let storage = Storage::in_memory().await.unwrap();
        assert!(storage.load_history().await.unwrap().entries().is_empty());

        let mut history = History::default();
        history.record("사과", StudentLevel::Elementary);
        history.record("배", StudentLevel::Middle);
        history.record("사랑", StudentLevel::High);
        storage.save_history(&history).await.unwrap();

        let loaded = storage.load_history().await.unwrap();
        let words = loaded
            .entries()
            .iter()
            .map(|entry| (&entry.word[..], entry.level))
            .collect::<Vec<_>>();
        assert_eq!(
            words,
            vec![
                ("사랑", StudentLevel::High),
                ("배", StudentLevel::Middle),
                ("사과", StudentLevel::Elementary),
            ]
        );
    }

    #[tokio::test]
    async fn saving_replaces_the_previous_list() {
        let storage = Storage::in_memory().await.unwrap();
        let mut history = History::default();
        history.record("사과", StudentLevel::Elementary);
        history.record("배", StudentLevel::Elementary);
        storage.save_history(&history).await.unwrap();

        history.record("사과", StudentLevel::High);
        storage.save_history(&history).await.unwrap();

        let loaded = storage.load_history().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries()[0].word, "사과");
        assert_eq!(loaded.entries()[0].level, StudentLevel::High);
    }

    #[tokio::test]
    async fn unknown_levels_are_skipped_on_load() {
        let storage = Storage::in_memory().await.unwrap();
        query("INSERT INTO search_history(position, word, level, searched_at) VALUES(0, '눈', 'kindergarten', ?)")
            .bind(Utc::now())
            .execute(&storage.pool)
            .await
            .unwrap();
        assert!(storage.load_history().await.unwrap().entries().is_empty());
    }

    #[tokio::test]
    async fn theme_defaults_and_persists() {
        let storage = Storage::in_memory().await.unwrap();
        assert_eq!(storage.load_theme().await.unwrap(), ThemeColor::Indigo);

        storage.save_theme(ThemeColor::Emerald).await.unwrap();
        storage.save_theme(ThemeColor::Sky).await.unwrap();
        assert_eq!(storage.load_theme().await.unwrap(), ThemeColor::Sky);

        query("UPDATE settings SET value = 'neon' WHERE key = ?")
            .bind(THEME_KEY)
            .execute(&storage.pool)
            .await
            .unwrap();
        assert_eq!(storage.load_theme().await.unwrap(), ThemeColor::Indigo);
    }
}
