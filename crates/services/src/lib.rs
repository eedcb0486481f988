#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod score_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use bank::{load_bank, parse_bank};
pub use error::{BankLoadError, ScoreServiceError, SessionError};
pub use score_service::TierBadgeService;

pub use sessions::{
    AnswerResult, Countdown, CountdownEvent, QuestionView, QuizCommand, QuizEvent, QuizHandle,
    QuizLoopService, QuizRunner, QuizSession, SessionSnapshot, Transition,
};
