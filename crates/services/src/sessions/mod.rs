mod countdown;
mod runner;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use countdown::{Countdown, CountdownEvent};
pub use runner::{QuizCommand, QuizEvent, QuizHandle, QuizRunner};
pub use service::{AnswerResult, QuizSession, Transition};
pub use view::{QuestionView, SessionSnapshot};
pub use workflow::QuizLoopService;
