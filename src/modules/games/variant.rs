use teloxide::types::BotCommand;

use super::error::ContentError;
use super::state::GameState;
use super::{figure, idiom, poem};
use crate::modules::openai::PaintRequest;
use crate::utils::dptree_ext::CommandArgs;

/// The kinds of guessing games.
///
/// A running game refers to its kind by this tag, the tag decides how
/// guesses are checked and how the answer is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Variant {
    Idiom,
    Poem,
    Figure,
}

/// Result of checking one guess. Texts are MarkdownV2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub correct: bool,
    pub feedback: String,
}

/// The next clue of a figure quiz, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Clue {
    pub index: usize,
    pub total: usize,
    pub text: String,
}

impl Variant {
    /// Characters shown from the start and never counted as hidden.
    pub(crate) fn is_prefilled(self, ch: char) -> bool {
        match self {
            Variant::Poem => poem::is_punctuation(ch),
            Variant::Idiom | Variant::Figure => false,
        }
    }

    /// Checks a guess. Figures also record it in their attempt log.
    pub(crate) fn check_answer(self, guess: &str, state: &mut GameState) -> Verdict {
        match self {
            Variant::Idiom => idiom::check_answer(guess, state),
            Variant::Poem => poem::check_answer(guess, state),
            Variant::Figure => figure::check_answer(guess, state),
        }
    }

    /// The answer as MarkdownV2, shown when the game ends.
    pub(crate) fn render_answer(self, state: &GameState) -> String {
        match self {
            Variant::Idiom => idiom::render_answer(state),
            Variant::Poem => poem::render_answer(state),
            Variant::Figure => figure::render_answer(state),
        }
    }

    /// What to show after a wrong guess instead of the remaining count.
    pub(crate) fn next_clue(self, state: &GameState) -> Option<Clue> {
        match self {
            Variant::Figure => figure::next_clue(state),
            Variant::Idiom | Variant::Poem => None,
        }
    }
}

/// How a new game is shown to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Presentation {
    /// A generated picture with a plain text caption.
    Picture {
        request: PaintRequest,
        caption: String,
    },
    /// A MarkdownV2 message.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Opening {
    pub state: GameState,
    pub presentation: Presentation,
}

/// A game that can be started with a bot command.
#[async_trait]
pub(crate) trait GuessGame: Send + Sync {
    fn variant(&self) -> Variant;

    fn command(&self) -> BotCommand;

    /// Picks the content of a new game.
    async fn open(&self, args: &CommandArgs) -> Result<Opening, ContentError>;
}
