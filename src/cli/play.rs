//! Console game command.

use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::factory::build_assembler;
use crate::config::TruthpediaConfig;
use crate::models::{Category, Round, random_categories};
use crate::services::{AnswerOutcome, GameSession, RoundAssembler};
use crate::{Error, Result};

const CANCEL_POLL: Duration = Duration::from_millis(100);

const RULES: &str = "This game is about guessing the imposter summary.\n\
    You will choose a category and get 3 summaries of random pages.\n\
    1 out of the 3 is an imposter.\n\
    Are you smart enough to identify it?";

#[derive(Debug, Clone, Copy)]
enum Tone {
    Heading,
    Title,
    Good,
    Bad,
    Dim,
}

/// Line-oriented console over any reader and writer.
pub struct Console<R, W> {
    input: R,
    output: W,
    width: usize,
    color: bool,
    prompting: Arc<AtomicBool>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Wrap width for article text.
    pub const DEFAULT_WIDTH: usize = 80;

    /// Creates a console without colour.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            width: Self::DEFAULT_WIDTH,
            color: false,
            prompting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables or disables ANSI colour.
    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Sets the wrap width.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(20);
        self
    }

    /// Shares a flag that is `true` while the console waits for input.
    #[must_use]
    pub fn with_prompt_flag(mut self, prompting: Arc<AtomicBool>) -> Self {
        self.prompting = prompting;
        self
    }

    /// Consumes the console, returning the writer.
    pub fn into_output(self) -> W {
        self.output
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Heading => text.cyan().bold().to_string(),
            Tone::Title => text.bold().to_string(),
            Tone::Good => text.green().bold().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Dim => text.dimmed().to_string(),
        }
    }

    fn say(&mut self, text: &str) -> Result<()> {
        self.say_styled(text, None)
    }

    fn say_styled(&mut self, text: &str, tone: Option<Tone>) -> Result<()> {
        for line in text.lines() {
            for wrapped in textwrap::wrap(line, self.width) {
                let painted = match tone {
                    Some(tone) => self.paint(&wrapped, tone),
                    None => wrapped.into_owned(),
                };
                writeln!(self.output, "{painted}")?;
            }
        }
        Ok(())
    }

    fn blank(&mut self) -> Result<()> {
        writeln!(self.output)?;
        Ok(())
    }

    /// Prints an indented, wrapped paragraph.
    fn paragraph(&mut self, text: &str, indent: &str) -> Result<()> {
        let options = textwrap::Options::new(self.width)
            .initial_indent(indent)
            .subsequent_indent(indent);
        for line in textwrap::wrap(text, &options) {
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }

    /// Asks a question and returns the trimmed answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when input is closed.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.prompting.store(true, Ordering::SeqCst);
        let read = self.input.read_line(&mut answer);
        self.prompting.store(false, Ordering::SeqCst);
        if read? == 0 {
            writeln!(self.output)?;
            return Err(Error::Cancelled);
        }
        Ok(answer.trim().to_string())
    }

    /// Asks until the answer is a number in `1..=count`; returns it zero-based.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when input is closed.
    pub fn ask_choice(&mut self, question: &str, count: usize) -> Result<usize> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<usize>() {
                Ok(choice) if (1..=count).contains(&choice) => return Ok(choice - 1),
                _ => {
                    let hint = format!("Please enter a number between 1 and {count}.");
                    self.say_styled(&hint, Some(Tone::Bad))?;
                },
            }
        }
    }
}

/// Settings for one game.
#[derive(Debug, Clone, Copy)]
pub struct PlayOptions {
    /// Rounds to win.
    pub rounds: u32,
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    /// Player name.
    pub player: String,
    /// Chosen category.
    pub category: String,
    /// Rounds answered correctly.
    pub rounds_won: u32,
    /// Whether every round was answered correctly.
    pub won: bool,
}

/// Runs one game on `console`, asking `next_round` for each round.
///
/// # Errors
///
/// Returns [`Error::RoundBuild`] when a round cannot be assembled,
/// [`Error::Cancelled`] when input closes or the player interrupts, and
/// [`Error::Io`] on console failure.
pub fn play<R, W, F>(
    console: &mut Console<R, W>,
    options: PlayOptions,
    categories: &[Category],
    mut next_round: F,
) -> Result<GameSummary>
where
    R: BufRead,
    W: Write,
    F: FnMut(&Category) -> Result<Round>,
{
    if categories.is_empty() {
        return Err(Error::InvalidInput("no categories to choose from".to_string()));
    }

    console.say_styled("Welcome to TruthPedia!", Some(Tone::Heading))?;
    console.blank()?;
    console.say(RULES)?;
    console.blank()?;

    let name = console.ask("So tell me, what's your name? ")?;
    let mut session = GameSession::new(name, options.rounds);
    let greeting = format!("Hello {}!", session.player());
    console.say(&greeting)?;
    console.blank()?;

    console.say("Here you have your choices:")?;
    for (index, category) in categories.iter().enumerate() {
        console.say(&format!("{}) {}", index + 1, category.display_name()))?;
    }
    let choice = console.ask_choice(
        "In which category do you wanna test your wits? Choose wisely... ",
        categories.len(),
    )?;
    let category = categories[choice].clone();
    console.say(&format!(
        "So you chose {}... Indeed a wise choice!",
        category.display_name()
    ))?;
    session.choose_category(category.clone());

    loop {
        console.blank()?;
        let heading = format!(
            "Round {} of {}",
            session.current_round(),
            session.target_rounds()
        );
        console.say_styled(&heading, Some(Tone::Heading))?;
        console.say_styled("Fetching articles...", Some(Tone::Dim))?;

        let round = next_round(&category)?;
        for (index, article) in round.articles().iter().enumerate() {
            console.blank()?;
            let title = format!("{}) {}", index + 1, article.title);
            console.say_styled(&title, Some(Tone::Title))?;
            console.paragraph(&article.summary, "   ")?;
        }
        console.blank()?;

        let answer = console.ask_choice("Choose the Fakenews! Your answer: ", round.articles().len())?;
        match session.answer(&round, answer)? {
            AnswerOutcome::Correct { .. } => {
                let message = format!("Correct! Well spotted, {}.", session.player());
                console.say_styled(&message, Some(Tone::Good))?;
            },
            AnswerOutcome::Won { rounds_won } => {
                let message = format!(
                    "Congratulations {}, you spotted all {rounds_won} fakes. You won!",
                    session.player()
                );
                console.say_styled(&message, Some(Tone::Good))?;
                break;
            },
            AnswerOutcome::Lost { fabricated_index } => {
                let fake = &round.articles()[fabricated_index];
                let reveal = format!("Wrong! The imposter was {}) {}.", fabricated_index + 1, fake.title);
                console.say_styled(&reveal, Some(Tone::Bad))?;
                let verdict = format!(
                    "Well {}, you are pretty brainwashed...\nYou lost!",
                    session.player()
                );
                console.say_styled(&verdict, Some(Tone::Bad))?;
                break;
            },
        }
    }

    Ok(GameSummary {
        player: session.player().to_string(),
        category: category.to_string(),
        rounds_won: session.rounds_won(),
        won: session.rounds_won() >= session.target_rounds(),
    })
}

/// Builds a round on a worker thread so that cancellation is noticed
/// even while a request is stalled.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] once `cancel` trips, otherwise the
/// assembler's result.
pub fn build_round_interruptible(
    assembler: &Arc<RoundAssembler>,
    category: &Category,
    cancel: &CancellationToken,
) -> Result<Round> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(assembler);
    let worker_category = category.clone();
    let worker_cancel = cancel.clone();
    std::thread::Builder::new()
        .name("round-builder".to_string())
        .spawn(move || {
            tx.send(worker.build_round(&worker_category, &worker_cancel)).ok();
        })?;

    loop {
        match rx.recv_timeout(CANCEL_POLL) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            },
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::RoundBuild {
                    category: category.to_string(),
                    slot: "any",
                    cause: "round builder stopped unexpectedly".to_string(),
                });
            },
        }
    }
}

/// Whether stdout should get ANSI colour.
#[must_use]
pub fn stdout_supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Play command: runs an interactive game on stdin/stdout.
///
/// # Errors
///
/// See [`play`] and [`build_assembler`].
pub fn cmd_play(
    config: &TruthpediaConfig,
    cancel: &CancellationToken,
    prompting: Arc<AtomicBool>,
) -> Result<GameSummary> {
    let assembler = Arc::new(build_assembler(config, cancel)?);
    let categories = random_categories(&mut rand::rng(), config.game.displayed_categories);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock())
        .with_color(stdout_supports_color())
        .with_prompt_flag(prompting);

    let summary = play(
        &mut console,
        PlayOptions {
            rounds: config.game.rounds,
        },
        &categories,
        |category| build_round_interruptible(&assembler, category, cancel),
    )?;
    tracing::info!(
        player = %summary.player,
        category = %summary.category,
        rounds_won = summary.rounds_won,
        won = summary.won,
        "Game finished"
    );
    Ok(summary)
}
