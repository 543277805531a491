//! Game services.
//!
//! Services compose the article sources into rounds and sessions.

mod game;
mod policy;
mod populate;
mod round;

pub use game::{AnswerOutcome, GameSession};
pub use policy::FallbackPolicy;
pub use populate::{
    CategoryReport, DatasetPopulator, PopulateConfig, PopulateReport, load_dataset_file,
    save_dataset_file,
};
pub use round::{RoundAssembler, RoundPhase, shuffle_articles};
