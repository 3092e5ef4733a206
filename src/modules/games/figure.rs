//! Historical figure quizzes from the xiaoce.fun "scratch" games.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use teloxide::types::BotCommand;
use teloxide::utils::markdown;

use super::error::ContentError;
use super::state::{AnswerContext, Attempt, FigureQuiz, GameState};
use super::variant::{Clue, GuessGame, Opening, Presentation, Variant, Verdict};
use crate::config::SharedConfig;
use crate::utils::dptree_ext::CommandArgs;

pub(crate) const COMMAND: &str = "guess_emperor";
pub(crate) const DESCRIPTION: &str = "Guess the emperor, optionally by quiz id";

const SEARCH_KEYWORD: &str = "猜皇帝";
const PAGE_SIZE: usize = 20;

/// The response envelope of the quiz API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ContentError> {
        if !self.success {
            return Err(ContentError::Rejected(
                self.error_message
                    .unwrap_or_else(|| "Request failed".to_owned()),
            ));
        }
        self.data
            .ok_or_else(|| ContentError::Malformed("response without data".to_owned()))
    }
}

#[derive(Debug, Deserialize)]
struct QuizSummary {
    id: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Quiz {
    name: String,
    #[serde(default)]
    desc: String,
    data: QuizBody,
}

#[derive(Debug, Deserialize)]
struct QuizBody {
    data: Vec<QuizHint>,
    alternatives: Vec<QuizAlternative>,
}

#[derive(Debug, Deserialize)]
struct QuizHint {
    hint: String,
}

#[derive(Debug, Deserialize)]
struct QuizAlternative {
    answer: String,
}

impl Quiz {
    fn into_figure_quiz(self) -> Result<FigureQuiz, ContentError> {
        let clues: Vec<String> = self.data.data.into_iter().map(|h| h.hint).collect();
        let alternatives: Vec<String> = self
            .data
            .alternatives
            .into_iter()
            .map(|a| a.answer.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();
        if clues.is_empty() || alternatives.is_empty() {
            return Err(ContentError::Malformed(format!(
                "quiz \"{}\" has no clues or answers",
                self.name
            )));
        }

        Ok(FigureQuiz {
            name: self.name,
            desc: self.desc,
            clues,
            alternatives,
            attempts: vec![],
        })
    }
}

/// A read-only client of the quiz website.
#[derive(Clone)]
pub(crate) struct QuizClient {
    http: reqwest::Client,
    api_base: String,
}

impl QuizClient {
    pub(crate) fn new(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
        }
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ContentError>
    where
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        info!("Fetched {}", resp.url());
        let envelope: Envelope<T> = resp.json().await?;
        envelope.into_data()
    }

    pub(crate) async fn quiz(&self, id: &str) -> Result<Quiz, ContentError> {
        self.get("/scratch/game/get", &[("id", id.to_owned())])
            .await
    }

    /// Finds the id of the quiz at `position` in the newest-first listing.
    async fn quiz_id_at(&self, position: usize) -> Result<String, ContentError> {
        let page = position / PAGE_SIZE + 1;
        let offset = position % PAGE_SIZE;
        let summaries: Vec<QuizSummary> = self
            .get(
                "/scratch/game/searchV2",
                &[
                    ("keyword", SEARCH_KEYWORD.to_owned()),
                    ("order", "new".to_owned()),
                    ("pageNum", page.to_string()),
                    ("pageSize", PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        let summary = summaries
            .get(offset)
            .or_else(|| summaries.last())
            .ok_or_else(|| ContentError::Malformed(format!("page {} is empty", page)))?;
        Ok(match &summary.id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        })
    }
}

/// Correct iff the trimmed guess is one of the accepted answers. The
/// feedback is the attempt log, newest first.
pub(super) fn check_answer(guess: &str, state: &mut GameState) -> Verdict {
    let guess = guess.trim();
    let AnswerContext::Figure(quiz) = &mut state.context else {
        return Verdict {
            correct: guess == state.answer,
            feedback: String::new(),
        };
    };

    let correct = quiz.alternatives.iter().any(|a| a == guess);
    quiz.attempts.insert(
        0,
        Attempt {
            correct,
            text: guess.to_owned(),
        },
    );
    let feedback = quiz
        .attempts
        .iter()
        .map(|attempt| {
            let sign = if attempt.correct { '✅' } else { '❌' };
            format!("{} {}", sign, markdown::escape(&attempt.text))
        })
        .collect::<Vec<_>>()
        .join("\n");

    Verdict { correct, feedback }
}

pub(super) fn render_answer(state: &GameState) -> String {
    let AnswerContext::Figure(quiz) = &state.context else {
        return markdown::bold(&markdown::escape(&state.answer));
    };

    let answers = markdown::bold(&markdown::escape(&quiz.alternatives.join("/")));
    let clues = quiz
        .clues
        .iter()
        .enumerate()
        .map(|(i, clue)| markdown::escape(&format!("{}. {}", i + 1, clue)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{}", answers, clues)
}

/// After `n` wrong guesses the `n + 1`-th clue is shown.
pub(super) fn next_clue(state: &GameState) -> Option<Clue> {
    let AnswerContext::Figure(quiz) = &state.context else {
        return None;
    };
    let total = quiz.clues.len();
    let index = total.checked_sub(state.remaining_guesses as usize)?;
    quiz.clues.get(index).map(|text| Clue {
        index: index + 1,
        total,
        text: text.clone(),
    })
}

pub(crate) fn open_quiz(quiz: FigureQuiz, clue_label: &str) -> Result<Opening, ContentError> {
    let (Some(first_clue), Some(answer)) = (quiz.clues.first(), quiz.alternatives.first()) else {
        return Err(ContentError::Malformed(format!("quiz \"{}\" is empty", quiz.name)));
    };
    let total = quiz.clues.len();
    let text = format!(
        "{}\n\n{}\n\n{}",
        markdown::bold(&markdown::escape(&quiz.name)),
        markdown::escape(&quiz.desc),
        markdown::escape(&format!("{} 1/{}: {}", clue_label, total, first_clue)),
    );
    let answer = answer.clone();
    let state = GameState::new(
        Variant::Figure,
        answer,
        total as u32,
        1,
        AnswerContext::Figure(quiz),
    );

    Ok(Opening {
        state,
        presentation: Presentation::Text(text),
    })
}

pub(crate) struct FigureGame {
    client: QuizClient,
    config: SharedConfig,
}

impl FigureGame {
    pub(crate) fn new(client: QuizClient, config: SharedConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl GuessGame for FigureGame {
    fn variant(&self) -> Variant {
        Variant::Figure
    }

    fn command(&self) -> BotCommand {
        BotCommand::new(COMMAND, DESCRIPTION)
    }

    async fn open(&self, args: &CommandArgs) -> Result<Opening, ContentError> {
        let id = if args.0.is_empty() {
            let position = rand::thread_rng().gen_range(0..self.config.figure_total.max(1));
            self.client.quiz_id_at(position).await?
        } else {
            args.0.clone()
        };
        debug!("Selected quiz {}", id);

        let quiz = self.client.quiz(&id).await?.into_figure_quiz()?;
        open_quiz(quiz, &self.config.i18n.clue_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ: &str = r#"{
        "success": true,
        "data": {
            "name": "猜皇帝 #42",
            "desc": "He unified the six states.",
            "data": {
                "data": [
                    { "hint": "Born in Handan" },
                    { "hint": "Built a great wall" },
                    { "hint": "First emperor" }
                ],
                "alternatives": [{ "answer": "秦始皇" }, { "answer": "嬴政 " }]
            }
        }
    }"#;

    fn quiz() -> FigureQuiz {
        serde_json::from_str::<Envelope<Quiz>>(QUIZ)
            .unwrap()
            .into_data()
            .unwrap()
            .into_figure_quiz()
            .unwrap()
    }

    #[test]
    fn test_parse_quiz() {
        let quiz = quiz();
        assert_eq!(quiz.name, "猜皇帝 #42");
        assert_eq!(quiz.clues.len(), 3);
        assert_eq!(quiz.alternatives, vec!["秦始皇", "嬴政"]);
    }

    #[test]
    fn test_rejected_envelope() {
        let envelope: Envelope<Quiz> =
            serde_json::from_str(r#"{ "success": false, "errorMessage": "游戏不存在" }"#).unwrap();
        match envelope.into_data() {
            Err(ContentError::Rejected(reason)) => assert_eq!(reason, "游戏不存在"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_search_ids() {
        let envelope: Envelope<Vec<QuizSummary>> =
            serde_json::from_str(r#"{ "success": true, "data": [{ "id": 17 }, { "id": "abc" }] }"#)
                .unwrap();
        let summaries = envelope.into_data().unwrap();
        assert_eq!(summaries[0].id.to_string(), "17");
        assert_eq!(summaries[1].id, Value::String("abc".to_owned()));
    }

    #[test]
    fn test_opening() {
        let opening = open_quiz(quiz(), "Clue").unwrap();
        assert_eq!(opening.state.remaining_guesses, 3);
        assert_eq!(opening.state.answer, "秦始皇");
        assert_eq!(
            opening.presentation,
            Presentation::Text(
                "*猜皇帝 \\#42*\n\nHe unified the six states\\.\n\nClue 1/3: Born in Handan"
                    .to_owned()
            )
        );
    }

    #[test]
    fn test_attempt_log_and_clues() {
        let mut state = open_quiz(quiz(), "Clue").unwrap().state;

        let verdict = Variant::Figure.check_answer("汉武帝", &mut state);
        assert!(!verdict.correct);
        assert_eq!(verdict.feedback, "❌ 汉武帝");
        state.remaining_guesses -= 1;
        assert_eq!(
            Variant::Figure.next_clue(&state),
            Some(Clue {
                index: 2,
                total: 3,
                text: "Built a great wall".to_owned(),
            })
        );

        let verdict = Variant::Figure.check_answer(" 嬴政", &mut state);
        assert!(verdict.correct);
        assert_eq!(verdict.feedback, "✅ 嬴政\n❌ 汉武帝");
        assert_eq!(
            Variant::Figure.render_answer(&state),
            "*秦始皇/嬴政*\n\n1\\. Born in Handan\n2\\. Built a great wall\n3\\. First emperor"
        );
    }
}
