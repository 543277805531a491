//! Dataset population command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::factory::{build_fabrication_source, build_wiki_source};
use crate::Result;
use crate::config::TruthpediaConfig;
use crate::models::Category;
use crate::services::{CategoryReport, DatasetPopulator, PopulateConfig, PopulateReport};

/// Dataset path used when neither a flag nor the config names one.
pub const DEFAULT_DATASET_PATH: &str = "data/responses.json";

/// Arguments for the populate command.
#[derive(Debug, Clone)]
pub struct PopulateArgs {
    /// Output file; falls back to the configured dataset.
    pub output: Option<PathBuf>,
    /// Genuine articles wanted per category.
    pub real: usize,
    /// Fabricated articles wanted per category.
    pub fake: usize,
}

/// Resolves the file to populate.
#[must_use]
pub fn resolve_output(args: &PopulateArgs, config: &TruthpediaConfig) -> PathBuf {
    args.output
        .clone()
        .or_else(|| config.dataset.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH))
}

/// Writes one progress line for a category.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_category_line<W: Write>(writer: &mut W, report: &CategoryReport) -> std::io::Result<()> {
    let note = if report.failed {
        " (gave up after repeated failures)"
    } else if report.exhausted {
        " (no new articles left)"
    } else {
        ""
    };
    writeln!(
        writer,
        "{:<28}real {:>2} -> {:>2}   fake {:>2} -> {:>2}{note}",
        report.category,
        report.real_before,
        report.real_before + report.real_added,
        report.fake_before,
        report.fake_before + report.fake_added,
    )
}

/// Runs `populator` over the whole catalog, reporting progress to `writer`.
///
/// # Errors
///
/// Returns the populator's error, or an I/O error from `writer`.
pub fn populate_with<W: Write>(
    populator: &DatasetPopulator,
    path: &Path,
    writer: &mut W,
) -> Result<PopulateReport> {
    writeln!(writer, "Populating {}", path.display())?;

    let mut write_error = None;
    let report = populator.run_with(path, &Category::catalog(), |category| {
        if write_error.is_none() {
            write_error = write_category_line(writer, category).err();
        }
    })?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    writeln!(
        writer,
        "Added {} articles; {} in total.",
        report.categories.iter().map(CategoryReport::added).sum::<usize>(),
        report.total
    )?;
    Ok(report)
}

/// Populate command: fills the dataset from the live sources.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read or written, the run is
/// interrupted, or the generative service is not configured.
pub fn cmd_populate<W: Write>(
    config: &TruthpediaConfig,
    args: &PopulateArgs,
    cancel: &CancellationToken,
    writer: &mut W,
) -> Result<PopulateReport> {
    let path = resolve_output(args, config);
    let populator = DatasetPopulator::new(
        Arc::new(build_wiki_source(config, cancel)),
        Arc::new(build_fabrication_source(config, cancel)),
        PopulateConfig::default().with_targets(args.real, args.fake),
    )
    .with_cancellation(cancel.clone());

    populate_with(&populator, &path, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use crate::sources::ArticleSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Numbered {
        calls: AtomicUsize,
    }

    impl ArticleSource for Numbered {
        fn name(&self) -> &'static str {
            "numbered"
        }

        fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Article {
                title: format!("Entry {n} ({})", if is_truth { "real" } else { "fake" }),
                summary: "Body.".to_string(),
                category: category.to_string(),
                is_truth,
            })
        }
    }

    fn numbered() -> Arc<Numbered> {
        Arc::new(Numbered {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_resolve_output_precedence() {
        let mut args = PopulateArgs {
            output: None,
            real: 1,
            fake: 1,
        };
        let config = TruthpediaConfig::default();
        assert_eq!(resolve_output(&args, &config), PathBuf::from(DEFAULT_DATASET_PATH));

        let config = config.with_dataset("/tmp/configured.json");
        assert_eq!(resolve_output(&args, &config), PathBuf::from("/tmp/configured.json"));

        args.output = Some(PathBuf::from("/tmp/flag.json"));
        assert_eq!(resolve_output(&args, &config), PathBuf::from("/tmp/flag.json"));
    }

    #[test]
    fn test_populate_reports_every_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.json");
        let populator = DatasetPopulator::new(
            numbered(),
            numbered(),
            PopulateConfig::default().with_targets(1, 1).without_delays(),
        );

        let mut output = Vec::new();
        let report = populate_with(&populator, &path, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_eq!(report.categories.len(), Category::catalog().len());
        assert_eq!(report.total, Category::catalog().len() * 2);
        assert!(output.contains("Cryptids"));
        assert!(output.contains("real  0 ->  1"));
        assert!(output.contains(&format!("Added {} articles", report.total)));
    }

    #[test]
    fn test_category_line_notes() {
        let mut out = Vec::new();
        let report = CategoryReport {
            category: "Hoaxes".to_string(),
            failed: true,
            ..CategoryReport::default()
        };
        write_category_line(&mut out, &report).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("gave up"));
    }
}
