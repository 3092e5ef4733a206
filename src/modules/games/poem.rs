use std::ops::Range;

use rand::Rng;
use serde::Deserialize;
use teloxide::types::BotCommand;
use teloxide::utils::markdown;

use super::content;
use super::error::ContentError;
use super::evaluator::{evaluate_guess, Feedback};
use super::state::{AnswerContext, GameState, PoemSource};
use super::variant::{GuessGame, Opening, Presentation, Variant, Verdict};
use crate::config::{fill_remaining, SharedConfig};
use crate::modules::openai::PaintRequest;
use crate::utils::dptree_ext::CommandArgs;

pub(crate) const COMMAND: &str = "guess_p";
pub(crate) const DESCRIPTION: &str = "Guess the line of poetry, add \"hard\" for a harder one";

const PUNCTUATION: &[char] = &['，', '。', '！', '？', ',', '.', '!', '?', '；', ';'];

pub(crate) fn is_punctuation(ch: char) -> bool {
    PUNCTUATION.contains(&ch)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Poem {
    pub sentence: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub url: String,
}

/// The poem database. Poems before `sep` are the well known ones.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PoemCollection {
    #[serde(rename = "data")]
    pub poems: Vec<Poem>,
    pub sep: usize,
}

impl PoemCollection {
    fn range(&self, hard: bool) -> Range<usize> {
        let sep = self.sep.min(self.poems.len());
        if hard {
            sep..self.poems.len()
        } else {
            0..sep
        }
    }
}

/// Turns every punctuation or whitespace run into a single space.
///
/// Each punctuation mark starts its own run, so "，。" becomes two spaces
/// and positions stay aligned with the raw line.
pub(crate) fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if is_punctuation(ch) || ch.is_whitespace() {
            normalized.push(' ');
            while chars.next_if(|next| next.is_whitespace()).is_some() {}
        } else {
            normalized.push(ch);
        }
    }
    normalized.trim().to_owned()
}

/// Punctuation is never guessed: its positions always show the answer's
/// marks, whatever the evaluation says.
pub(super) fn check_answer(guess: &str, state: &GameState) -> Verdict {
    let guess = normalize(guess);
    let golden = normalize(&state.answer);

    let mut feedback = Feedback::from(evaluate_guess(&guess, &golden));
    for (i, ch) in state.answer.chars().enumerate() {
        if is_punctuation(ch) {
            feedback.force_literal(i, ch);
        }
    }

    Verdict {
        correct: guess == golden,
        feedback: markdown::escape(&feedback.to_string()),
    }
}

pub(super) fn render_answer(state: &GameState) -> String {
    let answer = markdown::bold(&markdown::escape(&state.answer));
    match &state.context {
        AnswerContext::Poem(source) if !source.url.is_empty() => format!(
            "{}\n📖 {}",
            answer,
            markdown::link(&source.url, &markdown::escape(&source.origin))
        ),
        AnswerContext::Poem(source) if !source.origin.is_empty() => {
            format!("{}\n📖 {}", answer, markdown::escape(&source.origin))
        }
        _ => answer,
    }
}

pub(crate) struct PoemGame {
    collection: PoemCollection,
    config: SharedConfig,
}

impl PoemGame {
    pub(crate) fn new(collection: PoemCollection, config: SharedConfig) -> Self {
        Self { collection, config }
    }

    pub(crate) async fn load(
        http: &reqwest::Client,
        config: SharedConfig,
    ) -> Result<Self, ContentError> {
        let path = config.data_dir.join("gushiwen.json");
        content::ensure_cached(http, &config.poem_database_url, &path).await?;
        let collection: PoemCollection =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await?)?;
        info!(
            "Loaded {} poems ({} well known)",
            collection.poems.len(),
            collection.sep
        );

        Ok(Self::new(collection, config))
    }
}

#[async_trait]
impl GuessGame for PoemGame {
    fn variant(&self) -> Variant {
        Variant::Poem
    }

    fn command(&self) -> BotCommand {
        BotCommand::new(COMMAND, DESCRIPTION)
    }

    async fn open(&self, args: &CommandArgs) -> Result<Opening, ContentError> {
        let hard = args.0.to_lowercase().contains("hard");
        let range = self.collection.range(hard);
        if range.is_empty() {
            return Err(ContentError::Malformed(format!(
                "no poems to pick from (hard: {})",
                hard
            )));
        }
        let idx = rand::thread_rng().gen_range(range);
        debug!("Selected poem {}", idx);
        let poem = &self.collection.poems[idx];

        let state = GameState::new(
            Variant::Poem,
            poem.sentence.clone(),
            self.config.max_guesses,
            self.config.poem_min_unrevealed,
            AnswerContext::Poem(PoemSource {
                origin: poem.origin.clone(),
                url: poem.url.clone(),
            }),
        );
        let caption = fill_remaining(&self.config.i18n.poem_caption, state.remaining_guesses);
        let request = PaintRequest {
            description_prompt: format!(
                "Describe this sentence from chinese poem in plain text, it should be fit as a Dall-E image generate prompt: {}",
                poem.sentence
            ),
            style: Some(" in Chinese comic style"),
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

    const LINE: &str = "床前明月光，疑是地上霜。";

    fn state() -> GameState {
        GameState::new(
            Variant::Poem,
            LINE.to_owned(),
            5,
            5,
            AnswerContext::Poem(PoemSource {
                origin: "李白《静夜思》".to_owned(),
                url: "https://example.com/jingyesi".to_owned(),
            }),
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(LINE), "床前明月光 疑是地上霜");
        assert_eq!(normalize("床前明月光, 疑是地上霜"), "床前明月光 疑是地上霜");
        assert_eq!(normalize("  床前明月光  疑是地上霜 "), "床前明月光 疑是地上霜");
        assert_eq!(normalize("春眠不觉晓，。处处闻啼鸟"), "春眠不觉晓  处处闻啼鸟");
    }

    #[test]
    fn test_correct_without_punctuation() {
        let mut state = state();
        let verdict = Variant::Poem.check_answer("床前明月光 疑是地上霜", &mut state);
        assert!(verdict.correct);
        assert_eq!(verdict.feedback, "🟩🟩🟩🟩🟩，🟩🟩🟩🟩🟩。");
    }

    #[test]
    fn test_punctuation_is_forced() {
        let mut state = state();
        let verdict = Variant::Poem.check_answer("床前明月光", &mut state);
        assert!(!verdict.correct);
        assert_eq!(verdict.feedback, "🟩🟩🟩🟩🟩，⬛⬛⬛⬛⬛。");

        let verdict = Variant::Poem.check_answer("疑是地上霜，床前明月光", &mut state);
        assert!(!verdict.correct);
        assert_eq!(verdict.feedback, "🟨🟨🟨🟨🟨，🟨🟨🟨🟨🟨。");
    }

    #[test]
    fn test_ascii_punctuation_is_escaped() {
        let mut state = GameState::new(
            Variant::Poem,
            "Ab.Cd!".to_owned(),
            5,
            1,
            AnswerContext::Plain,
        );
        let verdict = Variant::Poem.check_answer("Ab Cd", &mut state);
        assert!(verdict.correct);
        assert_eq!(verdict.feedback, "🟩🟩\\.🟩🟩\\!");
    }

    #[test]
    fn test_render_answer() {
        assert_eq!(
            render_answer(&state()),
            "*床前明月光，疑是地上霜。*\n📖 [李白《静夜思》](https://example.com/jingyesi)"
        );
    }

    #[tokio::test]
    async fn test_open_respects_difficulty() {
        let config: Config =
            serde_json::from_str(r#"{ "botToken": "t", "openaiAPIKey": "k" }"#).unwrap();
        let collection: PoemCollection = serde_json::from_str(
            r#"{
                "data": [
                    { "sentence": "床前明月光，疑是地上霜。", "origin": "静夜思", "url": "https://a" },
                    { "sentence": "僵卧孤村不自哀，尚思为国戍轮台。", "origin": "十一月四日风雨大作", "url": "https://b" }
                ],
                "sep": 1
            }"#,
        )
        .unwrap();
        let game = PoemGame::new(collection, SharedConfig::new(config));

        let easy = game.open(&CommandArgs(String::new())).await.unwrap();
        assert_eq!(easy.state.answer, "床前明月光，疑是地上霜。");
        assert_eq!(easy.state.min_unrevealed, 5);
        assert_eq!(easy.state.unrevealed_positions().len(), 10);

        let hard = game.open(&CommandArgs("HARD".to_owned())).await.unwrap();
        assert_eq!(hard.state.answer, "僵卧孤村不自哀，尚思为国戍轮台。");
        match hard.presentation {
            Presentation::Picture { request, .. } => {
                assert_eq!(request.style, Some(" in Chinese comic style"));
                assert!(request.description_prompt.ends_with("僵卧孤村不自哀，尚思为国戍轮台。"));
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }
}
