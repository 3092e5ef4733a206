use rand::seq::SliceRandom;
use teloxide::types::BotCommand;
use teloxide::utils::markdown;

use super::content;
use super::error::ContentError;
use super::evaluator::{evaluate_guess, Feedback};
use super::state::{AnswerContext, GameState};
use super::variant::{GuessGame, Opening, Presentation, Variant, Verdict};
use crate::config::{fill_remaining, SharedConfig};
use crate::modules::openai::PaintRequest;
use crate::utils::dptree_ext::CommandArgs;

pub(crate) const COMMAND: &str = "guess";
pub(crate) const DESCRIPTION: &str = "Guess the idiom";

/// Idioms are the first word of each non-blank line of the THUOCL list.
pub(crate) fn parse_idioms(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|idiom| idiom.to_owned())
        .collect()
}

pub(super) fn check_answer(guess: &str, state: &GameState) -> Verdict {
    let guess = guess.trim();
    let feedback = Feedback::from(evaluate_guess(guess, &state.answer));
    Verdict {
        correct: guess == state.answer,
        feedback: markdown::escape(&feedback.to_string()),
    }
}

pub(super) fn render_answer(state: &GameState) -> String {
    markdown::bold(&markdown::escape(&state.answer))
}

pub(crate) struct IdiomGame {
    idioms: Vec<String>,
    config: SharedConfig,
}

impl IdiomGame {
    pub(crate) fn new(idioms: Vec<String>, config: SharedConfig) -> Self {
        Self { idioms, config }
    }

    pub(crate) async fn load(
        http: &reqwest::Client,
        config: SharedConfig,
    ) -> Result<Self, ContentError> {
        let path = config.data_dir.join("idioms.txt");
        content::ensure_cached(http, &config.idiom_database_url, &path).await?;
        let idioms = parse_idioms(&tokio::fs::read_to_string(&path).await?);
        if idioms.is_empty() {
            return Err(ContentError::Malformed(format!(
                "no idioms in {}",
                path.display()
            )));
        }
        info!("Loaded {} idioms", idioms.len());

        Ok(Self::new(idioms, config))
    }
}

#[async_trait]
impl GuessGame for IdiomGame {
    fn variant(&self) -> Variant {
        Variant::Idiom
    }

    fn command(&self) -> BotCommand {
        BotCommand::new(COMMAND, DESCRIPTION)
    }

    async fn open(&self, _args: &CommandArgs) -> Result<Opening, ContentError> {
        let idiom = {
            let mut rng = rand::thread_rng();
            self.idioms.choose(&mut rng).cloned()
        }
        .ok_or_else(|| ContentError::Malformed("the idiom list is empty".to_owned()))?;
        debug!("Selected idiom {}", idiom);

        let state = GameState::new(
            Variant::Idiom,
            idiom.clone(),
            self.config.max_guesses,
            self.config.idiom_min_unrevealed,
            AnswerContext::Plain,
        );
        let caption = fill_remaining(&self.config.i18n.idiom_caption, state.remaining_guesses);
        let request = PaintRequest {
            description_prompt: format!("Explain the chinese idiom {} to plain text", idiom),
            style: None,
        };

        Ok(Opening {
            state,
            presentation: Presentation::Picture { request, caption },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> SharedConfig {
        SharedConfig::new(
            serde_json::from_str::<Config>(r#"{ "botToken": "t", "openaiAPIKey": "k" }"#)
                .unwrap(),
        )
    }

    #[test]
    fn test_parse_idioms() {
        let text = "一心一意\t12345\n\n  \n画蛇添足 678\r\n守株待兔\n";
        assert_eq!(parse_idioms(text), vec!["一心一意", "画蛇添足", "守株待兔"]);
    }

    #[test]
    fn test_check_answer() {
        let mut state = GameState::new(
            Variant::Idiom,
            "画蛇添足".to_owned(),
            5,
            1,
            AnswerContext::Plain,
        );
        let verdict = Variant::Idiom.check_answer("画龙点睛", &mut state);
        assert!(!verdict.correct);
        assert_eq!(verdict.feedback, "🟩⬛⬛⬛");

        let verdict = Variant::Idiom.check_answer(" 画蛇添足 ", &mut state);
        assert!(verdict.correct);
        assert_eq!(verdict.feedback, "🟩🟩🟩🟩");
    }

    #[tokio::test]
    async fn test_open() {
        let game = IdiomGame::new(vec!["守株待兔".to_owned()], config());
        let opening = game.open(&CommandArgs(String::new())).await.unwrap();

        assert_eq!(opening.state.answer, "守株待兔");
        assert_eq!(opening.state.remaining_guesses, 5);
        assert_eq!(opening.state.min_unrevealed, 1);
        match opening.presentation {
            Presentation::Picture { request, caption } => {
                assert!(request.description_prompt.contains("守株待兔"));
                assert_eq!(caption, "Which idiom is this? You have 5 guesses.");
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }
}
