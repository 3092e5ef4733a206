mod score_mgr;

use anyhow::Error;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use teloxide::utils::markdown;

use crate::{
    config::SharedConfig,
    database::DatabaseManager,
    module_mgr::Module,
    modules::games::chat_allowed,
    types::{HandlerResult, TeloxideHandler},
    utils::dptree_ext::{command_filter, report_failures},
};
pub(crate) use score_mgr::{ScoreEntry, ScoreManager};

fn render_leaderboard(title: &str, board: &[ScoreEntry]) -> String {
    let lines: Vec<String> = board
        .iter()
        .map(|entry| format!("{}: {}", markdown::escape(&entry.name), entry.score))
        .collect();
    format!("{}\n{}", markdown::escape(title), lines.join("\n"))
}

async fn show_score(
    bot: Bot,
    msg: Message,
    score_mgr: ScoreManager,
    config: SharedConfig,
) -> HandlerResult {
    let board = score_mgr.leaderboard(msg.chat.id).await?;
    if board.is_empty() {
        bot.send_message(msg.chat.id, &config.i18n.empty_leaderboard_prompt)
            .reply_to_message_id(msg.id)
            .await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        render_leaderboard(&config.i18n.leaderboard_title, &board),
    )
    .reply_to_message_id(msg.id)
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    Ok(())
}

pub(crate) struct Scores {
    db_mgr: DatabaseManager,
}

impl Scores {
    pub(crate) fn new(db_mgr: DatabaseManager) -> Self {
        Self { db_mgr }
    }
}

#[async_trait]
impl Module for Scores {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let score_mgr = ScoreManager::with_db_manager(self.db_mgr.clone()).await?;
        dep_map.insert(score_mgr);
        Ok(())
    }

    fn handler_chain(&self) -> TeloxideHandler {
        report_failures(
            dptree::filter(chat_allowed)
                .filter_map(command_filter("score"))
                .endpoint(show_score),
        )
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![BotCommand::new("score", "Show the leaderboard of this chat")]
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::UserId;

    use super::*;

    #[test]
    fn test_render_leaderboard() {
        let board = vec![
            ScoreEntry {
                user_id: UserId(2),
                name: "Li_Bai".to_owned(),
                score: 3,
            },
            ScoreEntry {
                user_id: UserId(1),
                name: "杜甫".to_owned(),
                score: 1,
            },
        ];
        assert_eq!(
            render_leaderboard("Leaderboard:", &board),
            "Leaderboard:\nLi\\_Bai: 3\n杜甫: 1"
        );
    }
}
