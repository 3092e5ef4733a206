//! Configuration-related types.
//!
//! The configuration can be represented in and deserialized from JSON,
//! here is an example:
//!
//! ```json
//! {
//!   "botToken": "8888888888:XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX",
//!   "openaiAPIKey": "sk-xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
//!   "dataDir": "./data",
//!   "databasePath": "./data/game.db",
//!   "maxGuesses": 5,
//!   "i18n": {
//!     "correctPrompt": "太棒了，你是怎么知道的？"
//!   }
//! }
//! ```
//!
//! See [`Config`] for more detailed descriptions.

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use paste::paste;
use serde::Deserialize;

/// A thread-safe reference-counting object that represents
/// a [`Config`] instance.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    config: Arc<Config>,
}

impl SharedConfig {
    /// Constructs a new `SharedConfig`.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Deref for SharedConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        self.config.as_ref()
    }
}

/// Top-level config type for the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The token of your Telegram bot.
    /// JSON key: `botToken`
    #[serde(rename = "botToken")]
    pub telegram_bot_token: String,

    /// The API key of your OpenAI account, used to paint the pictures.
    /// JSON key: `openaiAPIKey`
    #[serde(rename = "openaiAPIKey")]
    pub openai_api_key: String,

    /// A custom base URL of the OpenAI compatible service.
    /// JSON key: `openaiAPIBase`
    #[serde(default, rename = "openaiAPIBase")]
    pub openai_api_base: Option<String>,

    /// The chat model used to turn an answer into a picture description.
    /// Value is default to "gpt-3.5-turbo".
    /// JSON key: `openaiGptModel`
    #[serde(default = "default_openai_gpt_model", rename = "openaiGptModel")]
    pub openai_gpt_model: String,

    /// Sampling temperature of the chat model.
    /// JSON key: `openaiTemperature`
    #[serde(default = "default_openai_temperature", rename = "openaiTemperature")]
    pub openai_temperature: f32,

    /// A timeout in seconds for each request to the OpenAI server.
    /// JSON key: `openaiAPITimeout`
    #[serde(default = "default_openai_api_timeout", rename = "openaiAPITimeout")]
    pub openai_api_timeout: u64,

    /// A timeout in seconds for quiz lookups and data downloads.
    /// JSON key: `httpTimeout`
    #[serde(default = "default_http_timeout", rename = "httpTimeout")]
    pub http_timeout: u64,

    /// A directory for the downloaded idiom and poem databases.
    /// JSON key: `dataDir`
    #[serde(default = "default_data_dir", rename = "dataDir")]
    pub data_dir: PathBuf,

    /// A path for storing the score database, `game.db` inside
    /// [`data_dir`](Self::data_dir) when omitted.
    /// JSON key: `databasePath`
    #[serde(default, rename = "databasePath")]
    pub database_path: Option<PathBuf>,

    /// Number of wrong guesses allowed in idiom and poem games.
    /// JSON key: `maxGuesses`
    #[serde(default = "default_max_guesses", rename = "maxGuesses")]
    pub max_guesses: u32,

    /// Hints are refused once this many idiom characters are left hidden.
    /// JSON key: `idiomMinUnrevealed`
    #[serde(default = "default_idiom_min_unrevealed", rename = "idiomMinUnrevealed")]
    pub idiom_min_unrevealed: usize,

    /// Hints are refused once this many poem characters are left hidden.
    /// JSON key: `poemMinUnrevealed`
    #[serde(default = "default_poem_min_unrevealed", rename = "poemMinUnrevealed")]
    pub poem_min_unrevealed: usize,

    /// Number of historical figure quizzes published on the quiz website.
    /// JSON key: `figureTotal`
    #[serde(default = "default_figure_total", rename = "figureTotal")]
    pub figure_total: usize,

    /// Base URL of the quiz website API.
    /// JSON key: `quizAPIBase`
    #[serde(default = "default_quiz_api_base", rename = "quizAPIBase")]
    pub quiz_api_base: String,

    /// Where to download the idiom database from.
    /// JSON key: `idiomDatabaseURL`
    #[serde(default = "default_idiom_database_url", rename = "idiomDatabaseURL")]
    pub idiom_database_url: String,

    /// Where to download the poem database from.
    /// JSON key: `poemDatabaseURL`
    #[serde(default = "default_poem_database_url", rename = "poemDatabaseURL")]
    pub poem_database_url: String,

    /// Games are only served in supergroups unless this is set.
    /// JSON key: `allowPrivateChats`
    #[serde(default, rename = "allowPrivateChats")]
    pub allow_private_chats: bool,

    /// A reply with exactly this text reveals one more character.
    /// JSON key: `hintKeyword`
    #[serde(default = "default_hint_keyword", rename = "hintKeyword")]
    pub hint_keyword: String,

    /// A reply with exactly this text gives up and shows the answer.
    /// JSON key: `answerKeyword`
    #[serde(default = "default_answer_keyword", rename = "answerKeyword")]
    pub answer_keyword: String,

    /// Strings for I18N.
    /// JSON key: `i18n`
    #[serde(default)]
    pub i18n: I18nStrings,
}

impl Config {
    /// The score database location.
    pub fn score_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("game.db"))
    }
}

/// Strings for I18N.
///
/// `{remaining}` in a prompt is replaced with the number of guesses left.
#[derive(Debug, Clone, Deserialize)]
pub struct I18nStrings {
    /// A text to display when a handler failed unexpectedly.
    /// JSON key: `errorPrompt`
    #[serde(default = "default_error_prompt", rename = "errorPrompt")]
    pub error_prompt: String,
    /// JSON key: `preparingPrompt`
    #[serde(default = "default_preparing_prompt", rename = "preparingPrompt")]
    pub preparing_prompt: String,
    /// JSON key: `alreadyRunningPrompt`
    #[serde(default = "default_already_running_prompt", rename = "alreadyRunningPrompt")]
    pub already_running_prompt: String,
    /// JSON key: `noGamePrompt`
    #[serde(default = "default_no_game_prompt", rename = "noGamePrompt")]
    pub no_game_prompt: String,
    /// A text to display when the image service rejected the prompt.
    /// JSON key: `contentPolicyPrompt`
    #[serde(default = "default_content_policy_prompt", rename = "contentPolicyPrompt")]
    pub content_policy_prompt: String,
    /// JSON key: `idiomCaption`
    #[serde(default = "default_idiom_caption", rename = "idiomCaption")]
    pub idiom_caption: String,
    /// JSON key: `poemCaption`
    #[serde(default = "default_poem_caption", rename = "poemCaption")]
    pub poem_caption: String,
    /// JSON key: `noMoreHintsPrompt`
    #[serde(default = "default_no_more_hints_prompt", rename = "noMoreHintsPrompt")]
    pub no_more_hints_prompt: String,
    /// JSON key: `wrongGuessPrompt`
    #[serde(default = "default_wrong_guess_prompt", rename = "wrongGuessPrompt")]
    pub wrong_guess_prompt: String,
    /// JSON key: `correctPrompt`
    #[serde(default = "default_correct_prompt", rename = "correctPrompt")]
    pub correct_prompt: String,
    /// JSON key: `lostPrompt`
    #[serde(default = "default_lost_prompt", rename = "lostPrompt")]
    pub lost_prompt: String,
    /// JSON key: `revealPrompt`
    #[serde(default = "default_reveal_prompt", rename = "revealPrompt")]
    pub reveal_prompt: String,
    /// JSON key: `clueLabel`
    #[serde(default = "default_clue_label", rename = "clueLabel")]
    pub clue_label: String,
    /// JSON key: `leaderboardTitle`
    #[serde(default = "default_leaderboard_title", rename = "leaderboardTitle")]
    pub leaderboard_title: String,
    /// JSON key: `emptyLeaderboardPrompt`
    #[serde(default = "default_empty_leaderboard_prompt", rename = "emptyLeaderboardPrompt")]
    pub empty_leaderboard_prompt: String,
}

/// Replaces the `{remaining}` placeholder of a prompt.
pub(crate) fn fill_remaining(template: &str, remaining: u32) -> String {
    template.replace("{remaining}", &remaining.to_string())
}

macro_rules! define_defaults {
    ($ty_name:ident { $($name:ident: $ty:ty = $default:expr,)* }) => {
        define_defaults! { $($name: $ty = $default,)* }
        paste! {
            impl Default for $ty_name {
                fn default() -> Self {
                    Self {
                        $($name: [<default_ $name>](),)*
                    }
                }
            }
        }
    };
    ($($name:ident: $ty:ty = $default:expr,)*) => {
        paste! {
            $(
                fn [<default_ $name>]() -> $ty {
                    $default
                }
            )*
        }
    };
}

define_defaults! {
    openai_gpt_model: String = "gpt-3.5-turbo".to_owned(),
    openai_temperature: f32 = 0.5,
    openai_api_timeout: u64 = 60,
    http_timeout: u64 = 30,
    data_dir: PathBuf = PathBuf::from("data"),
    max_guesses: u32 = 5,
    idiom_min_unrevealed: usize = 1,
    poem_min_unrevealed: usize = 5,
    figure_total: usize = 1019,
    quiz_api_base: String = "https://xiaoce.fun/api/v0".to_owned(),
    idiom_database_url: String =
        "https://cdn.jsdelivr.net/gh/cheeaun/chengyu-wordle/data/THUOCL_chengyu.txt".to_owned(),
    poem_database_url: String = "https://gist.githubusercontent.com/frostming/a7e46994c40a348808a9b3fc28297e2e/raw/gushiwen.json".to_owned(),
    hint_keyword: String = "提示".to_owned(),
    answer_keyword: String = "答案".to_owned(),
}

define_defaults!(I18nStrings {
    error_prompt: String = "Something went wrong, please check the server logs.".to_owned(),
    preparing_prompt: String = "Preparing the game, please wait...".to_owned(),
    already_running_prompt: String = "A game is already in progress.".to_owned(),
    no_game_prompt: String =
        "No game is in progress, start one with /guess, /guess_p or /guess_emperor.".to_owned(),
    content_policy_prompt: String =
        "Failed to paint the picture, probably because of the content policy. Please try again."
            .to_owned(),
    idiom_caption: String =
        "Which idiom is this? You have {remaining} guesses.".to_owned(),
    poem_caption: String =
        "Which line of poetry is this? You have {remaining} guesses.".to_owned(),
    no_more_hints_prompt: String = "No more hints.".to_owned(),
    wrong_guess_prompt: String = "Wrong! {remaining} guesses left.".to_owned(),
    correct_prompt: String = "Awesome, how did you know?".to_owned(),
    lost_prompt: String = "Out of guesses! The answer is".to_owned(),
    reveal_prompt: String = "The answer is".to_owned(),
    clue_label: String = "Clue".to_owned(),
    leaderboard_title: String = "Leaderboard:".to_owned(),
    empty_leaderboard_prompt: String = "No records yet.".to_owned(),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config =
            serde_json::from_str(r#"{ "botToken": "123:abc", "openaiAPIKey": "sk-test" }"#)
                .unwrap();
        assert_eq!(config.max_guesses, 5);
        assert_eq!(config.idiom_min_unrevealed, 1);
        assert_eq!(config.poem_min_unrevealed, 5);
        assert_eq!(config.hint_keyword, "提示");
        assert_eq!(config.answer_keyword, "答案");
        assert!(!config.allow_private_chats);
        assert_eq!(config.score_database_path(), PathBuf::from("data/game.db"));
        assert_eq!(config.i18n.clue_label, "Clue");
    }

    #[test]
    fn test_partial_i18n() {
        let config: Config = serde_json::from_str(
            r#"{
                "botToken": "123:abc",
                "openaiAPIKey": "sk-test",
                "databasePath": "/tmp/scores.sqlite",
                "i18n": { "correctPrompt": "太棒了" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.i18n.correct_prompt, "太棒了");
        assert_eq!(config.i18n.reveal_prompt, "The answer is");
        assert_eq!(
            config.score_database_path(),
            PathBuf::from("/tmp/scores.sqlite")
        );
    }

    #[test]
    fn test_fill_remaining() {
        assert_eq!(
            fill_remaining("Wrong! {remaining} guesses left.", 3),
            "Wrong! 3 guesses left."
        );
    }
}
