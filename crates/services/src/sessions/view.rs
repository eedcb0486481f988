use serde::Serialize;

use quiz_core::model::{Question, QuestionId, SessionStatus, Tier};

/// Question as shown to the player. The correct option is only disclosed once locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
}

impl QuestionView {
    #[must_use]
    pub fn from_question(question: &Question, reveal: bool) -> Self {
        Self {
            id: question.id(),
            prompt: question.prompt().to_owned(),
            options: question
                .options()
                .iter()
                .map(|option| option.text.clone())
                .collect(),
            correct_index: reveal.then(|| question.correct_index()),
        }
    }
}

/// Everything a rendering layer needs, refreshed on every transition and tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub question: Option<QuestionView>,
    pub remaining_secs: u32,
    pub selected: Option<usize>,
    pub score: u32,
    pub index: usize,
    pub total: usize,
    pub tier: Tier,
}

impl SessionSnapshot {
    /// "3/5"-style progress label; the index is clamped once the session is finished.
    #[must_use]
    pub fn progress_label(&self) -> String {
        let shown = (self.index + 1).min(self.total);
        format!("{shown}/{}", self.total)
    }
}
