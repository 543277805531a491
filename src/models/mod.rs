//! Data models for truthpedia.
//!
//! This module contains the content types passed between the article
//! sources, the round assembler, and the console.

mod article;
mod category;
mod round;

pub use article::{Article, check_answer};
pub use category::{CATALOG, Category, random_categories};
pub use round::Round;
