//! CLI command implementations.
//!
//! Each submodule implements one command of the `truthpedia` binary.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `play` | Play a game in the terminal (default) |
//! | `populate` | Fill the fallback dataset from the live sources |
//! | `categories` | List the category catalog |
//!
//! # Example Usage
//!
//! ```bash
//! # Play three rounds
//! truthpedia
//!
//! # Play without network access
//! truthpedia --offline play
//!
//! # Top up the dataset to 8 genuine and 4 fabricated entries per category
//! truthpedia populate --real 8 --fake 4
//! ```
//!
//! # Factory
//!
//! The `factory` submodule wires configuration into the article sources and
//! the round assembler.

mod categories;
mod factory;
mod play;
mod populate;

pub use categories::{CategoryInfo, cmd_categories, get_all_categories};
pub use factory::{
    build_assembler, build_fabrication_source, build_llm_provider, build_store, build_wiki_source,
};
pub use play::{
    Console, GameSummary, PlayOptions, build_round_interruptible, cmd_play, play,
    stdout_supports_color,
};
pub use populate::{
    DEFAULT_DATASET_PATH, PopulateArgs, cmd_populate, populate_with, resolve_output,
    write_category_line,
};
