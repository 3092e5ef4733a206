//! Wordle-style guess evaluation.

use std::collections::HashMap;
use std::fmt;

/// Per-position verdict of a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    /// Right character at the right position.
    Exact,
    /// The character occurs elsewhere in the answer.
    Present,
    /// The character is not in the answer, or all its occurrences are taken.
    Absent,
}

impl Mark {
    pub(crate) fn symbol(self) -> char {
        match self {
            Mark::Exact => '🟩',
            Mark::Present => '🟨',
            Mark::Absent => '⬛',
        }
    }
}

/// Compares `guess` with `answer` character by character.
///
/// The result always has one mark per answer character. Answer positions
/// the guess doesn't reach are absent and guess characters past the end of
/// the answer are ignored. A repeated character is credited at most as many
/// times as it occurs in the answer, exact matches first.
pub(crate) fn evaluate_guess(guess: &str, answer: &str) -> Vec<Mark> {
    let guess: Vec<char> = guess.chars().collect();
    let answer: Vec<char> = answer.chars().collect();

    let mut available: HashMap<char, usize> = HashMap::new();
    for &ch in &answer {
        *available.entry(ch).or_default() += 1;
    }

    let mut marks: Vec<Option<Mark>> = vec![None; answer.len()];
    for (i, &ch) in answer.iter().enumerate() {
        if guess.get(i) == Some(&ch) {
            marks[i] = Some(Mark::Exact);
            if let Some(count) = available.get_mut(&ch) {
                *count -= 1;
            }
        }
    }

    marks
        .into_iter()
        .enumerate()
        .map(|(i, mark)| {
            if let Some(mark) = mark {
                return mark;
            }
            let Some(ch) = guess.get(i) else {
                return Mark::Absent;
            };
            match available.get_mut(ch) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    Mark::Present
                }
                _ => Mark::Absent,
            }
        })
        .collect()
}

/// One rendered position of a feedback line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cell {
    Mark(Mark),
    /// A character copied verbatim from the answer.
    Literal(char),
}

/// A rendered evaluation, e.g. "🟩🟨⬛⬛".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Feedback(pub Vec<Cell>);

impl Feedback {
    /// Overwrites position `index` with a literal, appending it if the
    /// feedback is shorter than that.
    pub(crate) fn force_literal(&mut self, index: usize, ch: char) {
        if index < self.0.len() {
            self.0[index] = Cell::Literal(ch);
        } else {
            self.0.push(Cell::Literal(ch));
        }
    }
}

impl From<Vec<Mark>> for Feedback {
    fn from(marks: Vec<Mark>) -> Self {
        Self(marks.into_iter().map(Cell::Mark).collect())
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.0 {
            let ch = match cell {
                Cell::Mark(mark) => mark.symbol(),
                Cell::Literal(ch) => *ch,
            };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Mark::{Absent, Exact, Present};
    use super::*;

    #[test]
    fn test_distinct_letters() {
        assert_eq!(
            evaluate_guess("crane", "slate"),
            vec![Absent, Absent, Exact, Absent, Exact]
        );
        assert_eq!(
            evaluate_guess("tales", "slate"),
            vec![Present, Present, Present, Present, Present]
        );
        assert_eq!(
            evaluate_guess("一心一意", "一心一意"),
            vec![Exact, Exact, Exact, Exact]
        );
    }

    #[test]
    fn test_distinct_letters_rule() {
        let answer = "画龙点睛";
        for guess in ["点睛画龙", "画蛇添足", "龙飞凤舞", "睛龙画点"] {
            let marks = evaluate_guess(guess, answer);
            for ((g, a), mark) in guess.chars().zip(answer.chars()).zip(marks) {
                let expected = if g == a {
                    Exact
                } else if answer.contains(g) {
                    Present
                } else {
                    Absent
                };
                assert_eq!(mark, expected, "guess {} at {}", guess, g);
            }
        }
    }

    #[test]
    fn test_repeated_letters() {
        assert_eq!(evaluate_guess("aaa", "aab"), vec![Exact, Exact, Absent]);
        assert_eq!(evaluate_guess("aab", "bba"), vec![Present, Absent, Present]);
        assert_eq!(
            evaluate_guess("llama", "hello"),
            vec![Present, Present, Absent, Absent, Absent]
        );
        // Exact matches consume both "l"s before any present credit.
        assert_eq!(
            evaluate_guess("lolly", "hello"),
            vec![Absent, Present, Exact, Exact, Absent]
        );
        assert_eq!(
            evaluate_guess("一一一一", "一心一意"),
            vec![Exact, Absent, Exact, Absent]
        );
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(evaluate_guess("ab", "abcd"), vec![Exact, Exact, Absent, Absent]);
        assert_eq!(evaluate_guess("abcdef", "abcd"), vec![Exact, Exact, Exact, Exact]);
        assert_eq!(evaluate_guess("", "abc"), vec![Absent, Absent, Absent]);
        assert!(evaluate_guess("abc", "").is_empty());
    }

    #[test]
    fn test_feedback_display() {
        let mut feedback = Feedback::from(evaluate_guess("一心二意", "一心一意"));
        assert_eq!(feedback.to_string(), "🟩🟩⬛🟩");
        feedback.force_literal(2, '，');
        feedback.force_literal(10, '。');
        assert_eq!(feedback.to_string(), "🟩🟩，🟩。");
    }
}
