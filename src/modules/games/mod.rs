mod content;
mod error;
mod evaluator;
mod figure;
mod idiom;
mod manager;
mod poem;
mod state;
mod variant;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Error;
use teloxide::dptree::di::DependencySupplier;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, InputFile, Me, MessageId, ParseMode};
use teloxide::utils::markdown;

use crate::{
    config::{fill_remaining, I18nStrings, SharedConfig},
    module_mgr::Module,
    modules::openai::{ImageClient, ImageError},
    modules::scores::ScoreManager,
    types::{HandlerResult, TeloxideHandler},
    utils::dptree_ext::{parse_command, report_failures, CommandArgs},
};
use error::ContentError;
use figure::{FigureGame, QuizClient};
use idiom::IdiomGame;
pub(crate) use manager::{GameManager, GuessOutcome, Submission};
use poem::PoemGame;
use state::GameState;
use variant::{GuessGame, Presentation};

/// The games that can be started, by command name.
#[derive(Clone)]
pub(crate) struct GameCatalog {
    games: Arc<HashMap<String, Arc<dyn GuessGame>>>,
}

impl GameCatalog {
    fn new(games: Vec<Arc<dyn GuessGame>>) -> Self {
        let games = games
            .into_iter()
            .map(|game| (game.command().command, game))
            .collect();
        Self {
            games: Arc::new(games),
        }
    }

    fn get(&self, command: &str) -> Option<Arc<dyn GuessGame>> {
        self.games.get(command).cloned()
    }
}

#[derive(Clone)]
struct SelectedGame {
    game: Arc<dyn GuessGame>,
    args: CommandArgs,
}

/// Games are only served in supergroups unless private chats are allowed.
pub(crate) fn chat_allowed(msg: Message, config: SharedConfig) -> bool {
    config.allow_private_chats || msg.chat.is_supergroup()
}

fn select_game(msg: Message, me: Me, catalog: GameCatalog) -> Option<SelectedGame> {
    let username = me.username.clone().unwrap_or_default();
    let (name, args) = parse_command(msg.text()?, &username)?;
    catalog.get(name).map(|game| SelectedGame { game, args })
}

/// Only replies to the bot's own messages are read as submissions.
fn is_submission(msg: Message, me: Me) -> bool {
    let replies_to_bot = msg
        .reply_to_message()
        .and_then(|m| m.from())
        .map(|u| u.id == me.id)
        .unwrap_or(false);
    let is_command = msg.text().map(|t| t.starts_with('/')).unwrap_or(true);
    replies_to_bot && !is_command
}

async fn delete_quietly(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(err) = bot.delete_message(chat_id, message_id).await {
        warn!("Failed to delete message ({}): {}", message_id, err);
    }
}

async fn start_game(
    bot: Bot,
    msg: Message,
    selected: SelectedGame,
    game_mgr: GameManager,
    image_client: ImageClient,
    config: SharedConfig,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    if game_mgr.is_running(chat_id) {
        bot.send_message(chat_id, &config.i18n.already_running_prompt)
            .reply_to_message_id(msg.id)
            .await?;
        return Ok(());
    }

    let prepare_msg = bot
        .send_message(chat_id, &config.i18n.preparing_prompt)
        .reply_to_message_id(msg.id)
        .await?;

    debug!(
        "Opening a {:?} game in chat {}",
        selected.game.variant(),
        chat_id
    );
    let opening = match selected.game.open(&selected.args).await {
        Ok(opening) => opening,
        Err(ContentError::Rejected(reason)) => {
            warn!("Content source refused to start a game: {}", reason);
            delete_quietly(&bot, chat_id, prepare_msg.id).await;
            bot.send_message(chat_id, reason)
                .reply_to_message_id(msg.id)
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let presentation = opening.presentation;
    let started = finish_start(&game_mgr, chat_id, opening.state, || {
        present(&bot, &msg, &image_client, presentation)
    })
    .await?;
    delete_quietly(&bot, chat_id, prepare_msg.id).await;

    let prompt = match started {
        StartOutcome::Started => return Ok(()),
        StartOutcome::AlreadyRunning => &config.i18n.already_running_prompt,
        StartOutcome::PictureRefused => &config.i18n.content_policy_prompt,
    };
    bot.send_message(chat_id, prompt)
        .reply_to_message_id(msg.id)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartOutcome {
    Started,
    AlreadyRunning,
    PictureRefused,
}

/// Registers the game, then presents it. A game whose presentation fails
/// is cleared again, so the chat can start another one.
async fn finish_start<F, Fut>(
    game_mgr: &GameManager,
    chat_id: ChatId,
    state: GameState,
    present: F,
) -> Result<StartOutcome, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), Error>>,
{
    // Another start may have won the race while the content was fetched.
    if game_mgr.start_game(chat_id, state).is_err() {
        return Ok(StartOutcome::AlreadyRunning);
    }

    match present().await {
        Ok(()) => Ok(StartOutcome::Started),
        Err(err) => {
            game_mgr.clear_state(chat_id);
            if let Some(ImageError::ContentPolicy) = err.downcast_ref::<ImageError>() {
                warn!("Picture of the game in chat {} was refused", chat_id);
                return Ok(StartOutcome::PictureRefused);
            }
            Err(err)
        }
    }
}

async fn present(
    bot: &Bot,
    msg: &Message,
    image_client: &ImageClient,
    presentation: Presentation,
) -> Result<(), Error> {
    match presentation {
        Presentation::Picture { request, caption } => {
            let url = image_client.paint(&request).await?;
            debug!("Painted {}", url);
            bot.send_photo(msg.chat.id, InputFile::url(url.parse()?))
                .caption(caption)
                .await?;
        }
        Presentation::Text(text) => {
            bot.send_message(msg.chat.id, text)
                .reply_to_message_id(msg.id)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
    }
    Ok(())
}

fn render_outcome(outcome: &GuessOutcome, i18n: &I18nStrings) -> String {
    match outcome {
        GuessOutcome::NoGame => markdown::escape(&i18n.no_game_prompt),
        GuessOutcome::Hint(hint) => markdown::escape(hint),
        GuessOutcome::HintRefused => markdown::escape(&i18n.no_more_hints_prompt),
        GuessOutcome::Revealed { answer } => {
            format!("{} {}", markdown::escape(&i18n.reveal_prompt), answer)
        }
        GuessOutcome::Correct { feedback, answer } => format!(
            "{}\n{} {}",
            feedback,
            markdown::escape(&i18n.correct_prompt),
            answer
        ),
        GuessOutcome::Wrong {
            feedback,
            clue: Some(clue),
            ..
        } => format!(
            "{}\n\n{}",
            feedback,
            markdown::bold(&markdown::escape(&format!(
                "{} {}/{}: {}",
                i18n.clue_label, clue.index, clue.total, clue.text
            )))
        ),
        GuessOutcome::Wrong {
            feedback,
            remaining,
            clue: None,
        } => format!(
            "{}\n{}",
            feedback,
            markdown::escape(&fill_remaining(&i18n.wrong_guess_prompt, *remaining))
        ),
        GuessOutcome::Lost { feedback, answer } => format!(
            "{}\n{} {}",
            feedback,
            markdown::escape(&i18n.lost_prompt),
            answer
        ),
    }
}

async fn handle_submission(
    bot: Bot,
    msg: Message,
    game_mgr: GameManager,
    score_mgr: ScoreManager,
    config: SharedConfig,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let submission = Submission::parse(text, &config.hint_keyword, &config.answer_keyword);
    let outcome = game_mgr.submit(msg.chat.id, &submission, &mut rand::thread_rng());

    if let (GuessOutcome::Correct { .. }, Some(user)) = (&outcome, msg.from()) {
        score_mgr
            .record_win(user.id, msg.chat.id, user.full_name())
            .await?;
    }

    bot.send_message(msg.chat.id, render_outcome(&outcome, &config.i18n))
        .reply_to_message_id(msg.id)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    Ok(())
}

pub(crate) struct Games;

#[async_trait]
impl Module for Games {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let config: Arc<SharedConfig> = dep_map.get();
        let config = config.as_ref().clone();

        let http = content::http_client(&config)?;
        let idiom_game = IdiomGame::load(&http, config.clone()).await?;
        let poem_game = PoemGame::load(&http, config.clone()).await?;
        let figure_game = FigureGame::new(
            QuizClient::new(http, &config.quiz_api_base),
            config.clone(),
        );

        dep_map.insert(GameCatalog::new(vec![
            Arc::new(idiom_game),
            Arc::new(poem_game),
            Arc::new(figure_game),
        ]));
        dep_map.insert(GameManager::new());
        Ok(())
    }

    fn handler_chain(&self) -> TeloxideHandler {
        report_failures(
            dptree::filter(chat_allowed)
                .branch(dptree::filter_map(select_game).endpoint(start_game))
                .branch(dptree::filter(is_submission).endpoint(handle_submission)),
        )
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![
            BotCommand::new(idiom::COMMAND, idiom::DESCRIPTION),
            BotCommand::new(poem::COMMAND, poem::DESCRIPTION),
            BotCommand::new(figure::COMMAND, figure::DESCRIPTION),
        ]
    }
}
