use std::collections::HashSet;

use crate::model::question::{Question, QuestionBankError, RawQuestion};

/// Immutable, validated question bank in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Validate every record of the bank.
    ///
    /// An empty bank builds an empty set; it is up to the session to treat that as
    /// "no questions available".
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionBankError` found, in bank order.
    pub fn build(bank: impl IntoIterator<Item = RawQuestion>) -> Result<Self, QuestionBankError> {
        let mut seen = HashSet::new();
        let mut questions = Vec::new();

        for (idx, raw) in bank.into_iter().enumerate() {
            let question = Question::validate(raw, idx + 1)?;
            if !seen.insert(question.id()) {
                return Err(QuestionBankError::DuplicateId { id: question.id() });
            }
            questions.push(question);
        }

        Ok(Self { questions })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
