mod ids;
mod question;
mod question_set;
mod session;
mod settings;
mod tier;

pub use ids::{QuestionId, ScoreKey};

pub use question::{AnswerOption, Question, QuestionBankError, RawQuestion};
pub use question_set::QuestionSet;
pub use session::{AnswerReview, SessionOutcome, SessionOutcomeError, SessionStatus};
pub use settings::{QuizSettings, QuizSettingsError};
pub use tier::{DEFAULT_MAX_TIER, Tier, TierClassifier};
