//! Topic categories.

use crate::{Error, Result};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;

/// The fixed category catalog, named as knowledge-base category pages.
pub const CATALOG: [&str; 20] = [
    "Urban_legends",
    "Conspiracy_theories",
    "Hoaxes",
    "Internet_memes",
    "Cryptids",
    "Secret_societies",
    "Paranormal",
    "UFO_sightings",
    "Alien_abduction",
    "Occult",
    "Alternative_medicine",
    "Pseudoscience",
    "Fringe_theories",
    "Mass_psychogenic_illness",
    "April_Fools'_Day",
    "Basketball",
    "New_religious_movements",
    "Doomsday_scenarios",
    "Fake_news",
    "Prophecy",
];

/// A named topic a round is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    /// Creates a category, rejecting blank names.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "category name must be a non-empty string".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the category name as used by the knowledge base.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name with underscores replaced for display.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.0.replace('_', " ")
    }

    /// Returns every catalog category.
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        CATALOG.iter().map(|name| Self((*name).to_string())).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Samples `count` distinct categories from the catalog.
///
/// Returns fewer than `count` only when the catalog is smaller.
pub fn random_categories<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Category> {
    CATALOG
        .choose_multiple(rng, count)
        .map(|name| Category((*name).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test_case("" ; "empty")]
    #[test_case("   " ; "whitespace")]
    fn test_blank_category_rejected(name: &str) {
        assert!(matches!(Category::new(name), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_category_trims_name() {
        let category = Category::new("  Cryptids ").unwrap();
        assert_eq!(category.as_str(), "Cryptids");
    }

    #[test]
    fn test_display_name() {
        let category = Category::new("UFO_sightings").unwrap();
        assert_eq!(category.display_name(), "UFO sightings");
        assert_eq!(category.to_string(), "UFO_sightings");
    }

    #[test]
    fn test_random_categories_are_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let picked = random_categories(&mut rng, 3);
            assert_eq!(picked.len(), 3);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 3);
            assert!(picked.iter().all(|c| CATALOG.contains(&c.as_str())));
        }
    }

    #[test]
    fn test_random_categories_capped_by_catalog() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_categories(&mut rng, 100).len(), CATALOG.len());
    }

    #[test]
    fn test_catalog() {
        let catalog = Category::catalog();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog[0].as_str(), "Urban_legends");
    }
}
