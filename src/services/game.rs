//! Game session state.

use crate::models::{Category, Round};
use crate::{Error, Result};

/// Result of answering one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Fabrication spotted; more rounds to go.
    Correct {
        /// Rounds answered correctly so far.
        rounds_won: u32,
    },
    /// Fabrication spotted in the final round.
    Won {
        /// Rounds answered correctly.
        rounds_won: u32,
    },
    /// A genuine article was picked; the game is over.
    Lost {
        /// Zero-based position of the fabricated article.
        fabricated_index: usize,
    },
}

/// One player's run: a single category and a round counter.
///
/// A wrong answer ends the game immediately. Answering every round
/// correctly wins it.
#[derive(Debug, Clone)]
pub struct GameSession {
    player: String,
    category: Option<Category>,
    target_rounds: u32,
    rounds_won: u32,
    finished: bool,
}

impl GameSession {
    /// Starts a session for `player` needing `target_rounds` correct answers.
    #[must_use]
    pub fn new(player: impl Into<String>, target_rounds: u32) -> Self {
        let player = player.into();
        let player = match player.trim() {
            "" => "Player".to_string(),
            name => name.to_string(),
        };
        Self {
            player,
            category: None,
            target_rounds: target_rounds.max(1),
            rounds_won: 0,
            finished: false,
        }
    }

    /// Player name.
    #[must_use]
    pub fn player(&self) -> &str {
        &self.player
    }

    /// Sets the category every round is built for.
    pub fn choose_category(&mut self, category: Category) {
        self.category = Some(category);
    }

    /// The chosen category, if any.
    #[must_use]
    pub const fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    /// One-based number of the round being played.
    #[must_use]
    pub const fn current_round(&self) -> u32 {
        self.rounds_won + 1
    }

    /// Correct answers needed to win.
    #[must_use]
    pub const fn target_rounds(&self) -> u32 {
        self.target_rounds
    }

    /// Correct answers so far.
    #[must_use]
    pub const fn rounds_won(&self) -> u32 {
        self.rounds_won
    }

    /// Whether the game has been won or lost.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.finished
    }

    /// Records the player's zero-based answer for `round`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the game is already over or the
    /// index is out of range; the session is unchanged in that case.
    pub fn answer(&mut self, round: &Round, index: usize) -> Result<AnswerOutcome> {
        if self.finished {
            return Err(Error::InvalidInput("the game is already over".to_string()));
        }

        if !round.check(index)? {
            self.finished = true;
            tracing::info!(player = %self.player, rounds_won = self.rounds_won, "Game lost");
            return Ok(AnswerOutcome::Lost {
                fabricated_index: round.fabricated_index(),
            });
        }

        self.rounds_won += 1;
        if self.rounds_won >= self.target_rounds {
            self.finished = true;
            tracing::info!(player = %self.player, rounds_won = self.rounds_won, "Game won");
            Ok(AnswerOutcome::Won {
                rounds_won: self.rounds_won,
            })
        } else {
            Ok(AnswerOutcome::Correct {
                rounds_won: self.rounds_won,
            })
        }
    }
}
