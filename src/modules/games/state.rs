use rand::seq::SliceRandom;
use rand::Rng;

use super::evaluator::Mark;
use super::variant::Variant;

/// Where a poem line comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PoemSource {
    pub origin: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub correct: bool,
    pub text: String,
}

/// A historical figure quiz in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FigureQuiz {
    pub name: String,
    pub desc: String,
    pub clues: Vec<String>,
    /// Every accepted spelling of the answer.
    pub alternatives: Vec<String>,
    /// Newest first.
    pub attempts: Vec<Attempt>,
}

/// Variant specific data used to check and show the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnswerContext {
    Plain,
    Poem(PoemSource),
    Figure(FigureQuiz),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GameState {
    pub answer: String,
    pub remaining_guesses: u32,
    /// One slot per answer character, `Some` once it's shown to players.
    pub revealed: Vec<Option<char>>,
    /// Hints are refused once no more than this many slots are hidden.
    pub min_unrevealed: usize,
    pub variant: Variant,
    pub context: AnswerContext,
}

impl GameState {
    pub(crate) fn new(
        variant: Variant,
        answer: String,
        remaining_guesses: u32,
        min_unrevealed: usize,
        context: AnswerContext,
    ) -> Self {
        let revealed = answer
            .chars()
            .map(|ch| variant.is_prefilled(ch).then_some(ch))
            .collect();
        Self {
            answer,
            remaining_guesses,
            revealed,
            min_unrevealed,
            variant,
            context,
        }
    }

    pub(crate) fn unrevealed_positions(&self) -> Vec<usize> {
        self.revealed
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Shows one more hidden character picked uniformly at random, and
    /// returns the updated hint line.
    ///
    /// Returns `None` without touching the state once hiding any fewer
    /// characters would go below the floor.
    pub(crate) fn reveal_hint<R>(&mut self, rng: &mut R) -> Option<String>
    where
        R: Rng + ?Sized,
    {
        let hidden = self.unrevealed_positions();
        if hidden.len() <= self.min_unrevealed {
            return None;
        }

        let pos = *hidden.choose(rng)?;
        self.revealed[pos] = self.answer.chars().nth(pos);
        Some(self.render_revealed())
    }

    pub(crate) fn render_revealed(&self) -> String {
        self.revealed
            .iter()
            .map(|slot| slot.unwrap_or_else(|| Mark::Absent.symbol()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn poem_state() -> GameState {
        GameState::new(
            Variant::Poem,
            "床前明月光，疑是地上霜。".to_owned(),
            5,
            5,
            AnswerContext::Plain,
        )
    }

    #[test]
    fn test_punctuation_is_prefilled() {
        let state = poem_state();
        assert_eq!(state.revealed[5], Some('，'));
        assert_eq!(state.revealed[11], Some('。'));
        assert_eq!(state.unrevealed_positions().len(), 10);
        assert_eq!(state.render_revealed(), "⬛⬛⬛⬛⬛，⬛⬛⬛⬛⬛。");

        let idiom = GameState::new(
            Variant::Idiom,
            "画蛇添足".to_owned(),
            5,
            1,
            AnswerContext::Plain,
        );
        assert_eq!(idiom.unrevealed_positions(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reveal_until_floor() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = poem_state();

        for expected_hidden in (5..10).rev() {
            let hint = state.reveal_hint(&mut rng).unwrap();
            assert_eq!(state.unrevealed_positions().len(), expected_hidden);
            assert_eq!(hint, state.render_revealed());
        }
        for (slot, ch) in state.revealed.iter().zip(state.answer.chars()) {
            if let Some(shown) = slot {
                assert_eq!(*shown, ch);
            }
        }

        let frozen = state.clone();
        for _ in 0..3 {
            assert_eq!(state.reveal_hint(&mut rng), None);
            assert_eq!(state, frozen);
        }
    }

    #[test]
    fn test_reveal_refused_at_floor() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = GameState::new(
            Variant::Idiom,
            "一".to_owned(),
            5,
            1,
            AnswerContext::Plain,
        );
        assert_eq!(state.reveal_hint(&mut rng), None);
        assert_eq!(state.revealed, vec![None]);
    }
}
