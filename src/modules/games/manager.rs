use std::collections::hash_map::Entry as HashMapEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use teloxide::types::ChatId;

use super::error::GameError;
use super::state::GameState;
use super::variant::Clue;

/// A reply to the bot while a game may be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Submission {
    Hint,
    Reveal,
    Guess(String),
}

impl Submission {
    pub(crate) fn parse(text: &str, hint_keyword: &str, answer_keyword: &str) -> Self {
        let text = text.trim();
        if text == hint_keyword {
            Self::Hint
        } else if text == answer_keyword {
            Self::Reveal
        } else {
            Self::Guess(text.to_owned())
        }
    }
}

/// What happened to a submission. Texts are MarkdownV2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GuessOutcome {
    NoGame,
    Hint(String),
    HintRefused,
    Revealed {
        answer: String,
    },
    Correct {
        feedback: String,
        answer: String,
    },
    Wrong {
        feedback: String,
        remaining: u32,
        clue: Option<Clue>,
    },
    Lost {
        feedback: String,
        answer: String,
    },
}

/// The running games, at most one per chat.
///
/// Every operation takes the lock once, so a submission is checked and
/// applied atomically even when chats are served concurrently.
#[derive(Clone, Default)]
pub(crate) struct GameManager {
    inner: Arc<Mutex<GameManagerInner>>,
}

#[derive(Default)]
struct GameManagerInner {
    states: HashMap<ChatId, GameState>,
}

impl GameManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts the state of a new game, unless one is already running.
    pub fn start_game(&self, chat_id: ChatId, state: GameState) -> Result<GameState, GameError> {
        self.with_mut_inner(|inner| match inner.states.entry(chat_id) {
            HashMapEntry::Occupied(_) => Err(GameError::AlreadyRunning(chat_id)),
            HashMapEntry::Vacant(vacant) => {
                info!("Starting a new {:?} game in chat {}", state.variant, chat_id);
                Ok(vacant.insert(state).clone())
            }
        })
    }

    pub fn get_state(&self, chat_id: ChatId) -> Option<GameState> {
        self.with_mut_inner(|inner| inner.states.get(&chat_id).cloned())
    }

    pub fn is_running(&self, chat_id: ChatId) -> bool {
        self.with_mut_inner(|inner| inner.states.contains_key(&chat_id))
    }

    pub fn clear_state(&self, chat_id: ChatId) {
        self.with_mut_inner(|inner| {
            if inner.states.remove(&chat_id).is_some() {
                info!("Game in chat {} is cleared", chat_id);
            }
        });
    }

    pub fn submit<R>(&self, chat_id: ChatId, submission: &Submission, rng: &mut R) -> GuessOutcome
    where
        R: Rng + ?Sized,
    {
        self.with_mut_inner(|inner| {
            let HashMapEntry::Occupied(mut entry) = inner.states.entry(chat_id) else {
                return GuessOutcome::NoGame;
            };

            match submission {
                Submission::Hint => match entry.get_mut().reveal_hint(rng) {
                    Some(hint) => GuessOutcome::Hint(hint),
                    None => GuessOutcome::HintRefused,
                },
                Submission::Reveal => {
                    let state = entry.remove();
                    info!("Answer of the game in chat {} is revealed", chat_id);
                    GuessOutcome::Revealed {
                        answer: state.variant.render_answer(&state),
                    }
                }
                Submission::Guess(guess) => {
                    let state = entry.get_mut();
                    let variant = state.variant;
                    let verdict = variant.check_answer(guess, state);
                    if verdict.correct {
                        let state = entry.remove();
                        info!("Game in chat {} is won", chat_id);
                        return GuessOutcome::Correct {
                            feedback: verdict.feedback,
                            answer: variant.render_answer(&state),
                        };
                    }

                    state.remaining_guesses = state.remaining_guesses.saturating_sub(1);
                    if state.remaining_guesses > 0 {
                        return GuessOutcome::Wrong {
                            feedback: verdict.feedback,
                            remaining: state.remaining_guesses,
                            clue: variant.next_clue(state),
                        };
                    }

                    let state = entry.remove();
                    info!("Game in chat {} is lost", chat_id);
                    GuessOutcome::Lost {
                        feedback: verdict.feedback,
                        answer: variant.render_answer(&state),
                    }
                }
            }
        })
    }

    fn with_mut_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut GameManagerInner) -> R,
    {
        let mut inner_mut: MutexGuard<'_, GameManagerInner> =
            self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner_mut)
    }
}
