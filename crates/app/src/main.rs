use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use quiz_core::Clock;
use quiz_core::model::{DEFAULT_MAX_TIER, QuizSettings, ScoreKey, SessionStatus, TierClassifier};
use services::{
    QuizEvent, QuizHandle, QuizLoopService, QuizRunner, SessionSnapshot, TierBadgeService,
    load_bank, parse_bank,
};
use storage::repository::Storage;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE_BANK: &str = include_str!("../assets/sample_bank.json");
const INPUT_BUFFER: usize = 8;

/// Timed multiple-choice quiz in the terminal.
#[derive(Debug, Parser)]
#[command(name = "quiz", version)]
struct Cli {
    /// Question bank (JSON array). Uses the bundled sample bank when omitted.
    #[arg(long, env = "QUIZ_BANK")]
    bank: Option<PathBuf>,

    /// SQLite database holding the last score.
    #[arg(long, env = "QUIZ_DB_URL", default_value = "sqlite:quiz.sqlite3")]
    db: String,

    /// Key the final score is stored under.
    #[arg(long, env = "QUIZ_SCORE_KEY", default_value = ScoreKey::DEFAULT)]
    score_key: String,

    /// Seconds per question.
    #[arg(long, env = "QUIZ_QUESTION_SECS", default_value_t = QuizSettings::DEFAULT_QUESTION_SECS)]
    question_secs: u32,

    /// Pause after each answer, in milliseconds.
    #[arg(long, default_value_t = QuizSettings::DEFAULT_REVEAL_DELAY_MS)]
    reveal_ms: u32,

    /// Highest badge tier.
    #[arg(long, default_value_t = DEFAULT_MAX_TIER)]
    max_tier: u32,

    /// Fixed shuffle seed, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Answer(usize),
    Retry,
    Quit,
    Unknown,
}

impl Input {
    /// Options are shown 1-based.
    fn parse(line: &str) -> Self {
        match line.trim() {
            "q" | "quit" => Self::Quit,
            "r" | "retry" => Self::Retry,
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Self::Answer(n - 1),
                _ => Self::Unknown,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = QuizSettings::new(cli.question_secs, cli.reveal_ms, cli.max_tier)?;
    let bank = match &cli.bank {
        Some(path) => load_bank(path)?,
        None => parse_bank(SAMPLE_BANK)?,
    };

    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("failed to open {db_url}"))?;
    info!(db = %db_url, "score store ready");

    let key = ScoreKey::new(cli.score_key);
    let badge = TierBadgeService::new(
        Arc::clone(&storage.scores),
        TierClassifier::new(settings.max_tier()),
    );
    println!(
        "Last score: {} (tier {})",
        badge.last_score(&key).await?,
        badge.current_tier(&key).await?
    );

    let service = QuizLoopService::new(Clock::default(), settings, Arc::clone(&storage.scores))
        .with_score_key(key)
        .with_seed(cli.seed);
    let handle = QuizRunner::spawn(service, bank)?;

    run(handle).await
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut handle: QuizHandle) -> Result<()> {
    let mut snapshots = handle.subscribe();
    let mut input = spawn_input_reader();
    let mut screen = Screen::default();
    screen.render(&snapshots.borrow_and_update().clone());

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                screen.render(&snapshot);
            }
            event = handle.next_event() => match event {
                Some(QuizEvent::Finished(outcome)) => {
                    println!(
                        "Finished: {}/{} correct, {} timed out. Tier {}.",
                        outcome.score(),
                        outcome.total(),
                        outcome.timed_out(),
                        outcome.tier()
                    );
                    println!("Type r to play again or q to quit.");
                }
                Some(QuizEvent::PersistenceFailed { score, message }) => {
                    eprintln!("Could not save score {score}: {message}");
                }
                Some(QuizEvent::Rejected { message }) => println!("{message}"),
                None => break,
            },
            line = input.recv() => {
                let Some(line) = line else { break };
                match Input::parse(&line) {
                    Input::Answer(idx) => handle.answer(idx).await?,
                    Input::Retry => handle.retry().await?,
                    Input::Quit => break,
                    Input::Unknown => println!("Enter an option number, r to retry or q to quit."),
                }
            }
        }
    }

    handle.close().await;
    Ok(())
}

/// Reads stdin on a plain thread; a blocking read must not hold up runtime shutdown.
fn spawn_input_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Default)]
struct Screen {
    shown: Option<(SessionStatus, usize)>,
}

impl Screen {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        for line in self.lines(snapshot) {
            println!("{line}");
        }
    }

    /// Output for `snapshot`. Terminal states are redrawn every time so input there
    /// always gets a reply.
    fn lines(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let key = (snapshot.status, snapshot.index);
        if self.shown == Some(key) && !snapshot.status.is_terminal() {
            if snapshot.status == SessionStatus::AwaitingAnswer
                && matches!(snapshot.remaining_secs, 1..=3 | 10)
            {
                return vec![format!("  {}s left", snapshot.remaining_secs)];
            }
            return Vec::new();
        }
        self.shown = Some(key);

        let mut lines = Vec::new();
        match snapshot.status {
            SessionStatus::Loading => lines.push("Loading questions...".to_owned()),
            SessionStatus::Empty => {
                lines.push("No questions available. Type r to retry or q to quit.".to_owned());
            }
            SessionStatus::AwaitingAnswer => {
                if let Some(question) = &snapshot.question {
                    lines.push(String::new());
                    lines.push(format!("[{}] {}", snapshot.progress_label(), question.prompt));
                    for (idx, option) in question.options.iter().enumerate() {
                        lines.push(format!("  {}) {option}", idx + 1));
                    }
                    lines.push(format!(
                        "  ({}s, score {})",
                        snapshot.remaining_secs, snapshot.score
                    ));
                }
            }
            SessionStatus::AnswerLocked => {
                if let Some(question) = &snapshot.question {
                    let correct = question.correct_index;
                    lines.push(
                        match snapshot.selected {
                            None => "Time's up!",
                            Some(selected) if Some(selected) == correct => "Correct!",
                            Some(_) => "Wrong.",
                        }
                        .to_owned(),
                    );
                    if let Some(text) = correct.and_then(|idx| question.options.get(idx)) {
                        lines.push(format!("Answer: {text}"));
                    }
                }
            }
            // The finish event carries the summary.
            SessionStatus::Finished => {}
        }
        lines
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }

    Ok(())
}
