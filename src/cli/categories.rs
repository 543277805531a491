//! CLI command for listing the category catalog.

use crate::Result;
use crate::models::Category;
use serde::Serialize;
use std::io::Write;

/// One catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    /// Knowledge-base category name.
    pub name: String,
    /// Name shown to the player.
    pub display_name: String,
}

/// Returns every catalog category.
#[must_use]
pub fn get_all_categories() -> Vec<CategoryInfo> {
    Category::catalog()
        .into_iter()
        .map(|category| CategoryInfo {
            display_name: category.display_name(),
            name: category.to_string(),
        })
        .collect()
}

/// Writes categories as a table.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<W: Write>(writer: &mut W, categories: &[CategoryInfo]) -> std::io::Result<()> {
    writeln!(writer, "{:<28}DISPLAY NAME", "CATEGORY")?;
    for category in categories {
        writeln!(writer, "{:<28}{}", category.name, category.display_name)?;
    }
    Ok(())
}

/// Writes categories as JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, categories: &[CategoryInfo]) -> Result<()> {
    let json = serde_json::to_string_pretty(categories)
        .map_err(|e| crate::Error::InvalidInput(format!("cannot serialize categories: {e}")))?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Executes the categories command.
///
/// # Errors
///
/// Returns an error if output fails.
pub fn cmd_categories<W: Write>(writer: &mut W, json: bool) -> Result<()> {
    let categories = get_all_categories();
    if json {
        write_json(writer, &categories)
    } else {
        write_table(writer, &categories)?;
        Ok(())
    }
}
