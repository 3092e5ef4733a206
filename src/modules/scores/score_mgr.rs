use anyhow::Error;
#[cfg(test)]
use rusqlite::OptionalExtension;
use teloxide::types::{ChatId, UserId};

use crate::database::DatabaseManager;

/// A row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreEntry {
    pub user_id: UserId,
    pub name: String,
    pub score: u64,
}

/// Win counters per user per chat.
#[derive(Clone)]
pub(crate) struct ScoreManager {
    db_mgr: DatabaseManager,
}

impl ScoreManager {
    pub async fn with_db_manager(db_mgr: DatabaseManager) -> Result<Self, Error> {
        // Initialize the database table before returning.
        db_mgr
            .query(|conn| {
                let sql = "CREATE TABLE IF NOT EXISTS scores (userid INTEGER NOT NULL, chatid INTEGER NOT NULL, name TEXT, score INTEGER DEFAULT 0, PRIMARY KEY (userid, chatid));";
                conn.execute(sql, ()).map(|_| ())
            })
            .await?
            .map_err(|err| anyhow!("Failed to initialize database table: {}", err))?;

        Ok(Self { db_mgr })
    }

    /// Adds one win and returns the updated score.
    ///
    /// The increment happens inside a single upsert statement, so it is
    /// always relative to the stored value.
    pub async fn record_win(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        name: String,
    ) -> Result<u64, Error> {
        let score = self
            .db_mgr
            .query(move |conn| {
                let sql = "INSERT INTO scores (userid, chatid, name, score) VALUES (?1, ?2, ?3, 1) ON CONFLICT (userid, chatid) DO UPDATE SET score = score + 1, name = excluded.name;";
                conn.execute(sql, (user_id.0 as i64, chat_id.0, &name))?;

                let sql = "SELECT score FROM scores WHERE userid = ?1 AND chatid = ?2;";
                conn.query_row(sql, (user_id.0 as i64, chat_id.0), |row| row.get::<_, i64>(0))
            })
            .await??;

        info!("User {} now has {} wins in chat {}", user_id, score, chat_id);
        Ok(score as u64)
    }

    #[cfg(test)]
    pub async fn score_of(&self, user_id: UserId, chat_id: ChatId) -> Result<Option<u64>, Error> {
        let score = self
            .db_mgr
            .query(move |conn| {
                let sql = "SELECT score FROM scores WHERE userid = ?1 AND chatid = ?2;";
                conn.query_row(sql, (user_id.0 as i64, chat_id.0), |row| row.get::<_, i64>(0))
                    .optional()
            })
            .await??;

        Ok(score.map(|s| s as u64))
    }

    /// All scores of the chat, highest first.
    pub async fn leaderboard(&self, chat_id: ChatId) -> Result<Vec<ScoreEntry>, Error> {
        let entries = self
            .db_mgr
            .query(move |conn| {
                let sql = "SELECT userid, name, score FROM scores WHERE chatid = ?1 ORDER BY score DESC, userid ASC;";
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt.query_map((chat_id.0,), |row| {
                    Ok(ScoreEntry {
                        user_id: UserId(row.get::<_, i64>(0)? as u64),
                        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        score: row.get::<_, i64>(2)? as u64,
                    })
                })?;
                let entries = rows.collect::<Result<Vec<_>, _>>();
                entries
            })
            .await??;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemDatabaseProvider;

    async fn score_mgr() -> ScoreManager {
        let db_mgr = DatabaseManager::with_db_provider(InMemDatabaseProvider).unwrap();
        ScoreManager::with_db_manager(db_mgr).await.unwrap()
    }

    #[tokio::test]
    async fn test_sequential_wins_accumulate() {
        let score_mgr = score_mgr().await;
        let (user, chat) = (UserId(42), ChatId(-1001));

        assert_eq!(score_mgr.score_of(user, chat).await.unwrap(), None);
        assert_eq!(score_mgr.record_win(user, chat, "Li Bai".to_owned()).await.unwrap(), 1);
        assert_eq!(score_mgr.record_win(user, chat, "Li Bai".to_owned()).await.unwrap(), 2);
        assert_eq!(score_mgr.score_of(user, chat).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_wins_are_not_lost() {
        let score_mgr = score_mgr().await;
        let (user, chat) = (UserId(7), ChatId(-1002));
        score_mgr.record_win(user, chat, "Du Fu".to_owned()).await.unwrap();

        let (a, b) = tokio::join!(
            score_mgr.record_win(user, chat, "Du Fu".to_owned()),
            score_mgr.record_win(user, chat, "Du Fu".to_owned()),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(score_mgr.score_of(user, chat).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_scores_are_per_chat() {
        let score_mgr = score_mgr().await;
        let user = UserId(1);
        score_mgr.record_win(user, ChatId(-1), "Wang Wei".to_owned()).await.unwrap();
        score_mgr.record_win(user, ChatId(-1), "Wang Wei".to_owned()).await.unwrap();
        score_mgr.record_win(user, ChatId(-2), "Wang Wei".to_owned()).await.unwrap();

        assert_eq!(score_mgr.score_of(user, ChatId(-1)).await.unwrap(), Some(2));
        assert_eq!(score_mgr.score_of(user, ChatId(-2)).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let score_mgr = score_mgr().await;
        let chat = ChatId(-100);
        score_mgr.record_win(UserId(1), chat, "Su Shi".to_owned()).await.unwrap();
        score_mgr.record_win(UserId(2), chat, "Li Qingzhao".to_owned()).await.unwrap();
        score_mgr.record_win(UserId(2), chat, "Li Qingzhao (易安)".to_owned()).await.unwrap();
        score_mgr.record_win(UserId(3), ChatId(-200), "Bai Juyi".to_owned()).await.unwrap();

        let board = score_mgr.leaderboard(chat).await.unwrap();
        assert_eq!(
            board,
            vec![
                ScoreEntry {
                    user_id: UserId(2),
                    name: "Li Qingzhao (易安)".to_owned(),
                    score: 2,
                },
                ScoreEntry {
                    user_id: UserId(1),
                    name: "Su Shi".to_owned(),
                    score: 1,
                },
            ]
        );
        assert!(score_mgr.leaderboard(ChatId(-300)).await.unwrap().is_empty());
    }
}
