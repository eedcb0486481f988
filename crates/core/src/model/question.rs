use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a question bank is rejected. Positions are 1-based bank positions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("question #{position} has no options")]
    NoOptions { position: usize },

    #[error("question #{position} has no correct option")]
    NoCorrectOption { position: usize },

    #[error("question #{position} has {count} correct options, expected exactly one")]
    MultipleCorrectOptions { position: usize, count: usize },

    #[error("question #{position} has an empty prompt")]
    EmptyPrompt { position: usize },

    #[error("question id {id} appears more than once")]
    DuplicateId { id: QuestionId },
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }

    #[must_use]
    pub fn correct(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    #[must_use]
    pub fn wrong(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }
}

//
// ─── RAW RECORD ────────────────────────────────────────────────────────────────
//

/// Unvalidated question record as supplied by the content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct RawQuestion {
    pub id: Option<QuestionId>,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

impl RawQuestion {
    #[must_use]
    pub fn new(prompt: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            options,
        }
    }

    /// Builds a record from option texts plus the text of the correct answer.
    ///
    /// Every option whose text equals `correct` is flagged, so duplicated texts end up
    /// with several correct options and are rejected by [`Question::validate`].
    #[must_use]
    pub fn with_correct_text<I, S>(prompt: impl Into<String>, options: I, correct: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options
            .into_iter()
            .map(|text| {
                let text = text.into();
                let is_correct = text == correct;
                AnswerOption { text, is_correct }
            })
            .collect();
        Self::new(prompt, options)
    }

    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Accepted wire shapes for a raw record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Flagged {
        #[serde(default)]
        id: Option<QuestionId>,
        prompt: String,
        options: Vec<AnswerOption>,
    },
    Keyed {
        #[serde(default)]
        id: Option<QuestionId>,
        prompt: String,
        options: Vec<String>,
        correct: String,
    },
}

impl From<RawRecord> for RawQuestion {
    fn from(record: RawRecord) -> Self {
        match record {
            RawRecord::Flagged {
                id,
                prompt,
                options,
            } => Self {
                id,
                prompt,
                options,
            },
            RawRecord::Keyed {
                id,
                prompt,
                options,
                correct,
            } => {
                let mut raw = Self::with_correct_text(prompt, options, &correct);
                raw.id = id;
                raw
            }
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_index: usize,
}

impl Question {
    /// Validate a raw record found at `position` (1-based) in the bank.
    ///
    /// The record's own id wins; otherwise the position becomes the id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if the prompt is blank, there are no options, or the
    /// number of correct options is not exactly one.
    pub fn validate(raw: RawQuestion, position: usize) -> Result<Self, QuestionBankError> {
        let prompt = raw.prompt.trim();
        if prompt.is_empty() {
            return Err(QuestionBankError::EmptyPrompt { position });
        }
        if raw.options.is_empty() {
            return Err(QuestionBankError::NoOptions { position });
        }

        let mut correct = raw
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.is_correct)
            .map(|(idx, _)| idx);
        let Some(correct_index) = correct.next() else {
            return Err(QuestionBankError::NoCorrectOption { position });
        };
        let extra = correct.count();
        if extra > 0 {
            return Err(QuestionBankError::MultipleCorrectOptions {
                position,
                count: extra + 1,
            });
        }

        let id = raw
            .id
            .unwrap_or_else(|| QuestionId::new(u64::try_from(position).unwrap_or(u64::MAX)));

        Ok(Self {
            id,
            prompt: prompt.to_owned(),
            options: raw.options,
            correct_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Whether `index` names the correct option. `None` if out of range.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> Option<bool> {
        self.options.get(index).map(|option| option.is_correct)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
