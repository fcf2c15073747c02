// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! First-match-wins dispatch over a source directory
//!
//! Every regular file in the source directory is tested against the rules in
//! order. The first rule whose condition matches has its action applied and
//! no further rules are tried for that file. Progress is reported through
//! [`OrganizeEvent`]s so each frontend can render it its own way.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::{apply, Applied};
use crate::rules::matcher::file_name;
use crate::rules::{matches, Action, Rule, RuleSet};
use crate::template::TemplateVars;
use crate::{Result, StufferError};

/// Label used in log lines for files no rule matched
pub const NO_MATCH: &str = "No Match";

/// What happened to a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Moved { destination: PathBuf },
    Deleted,
    Skipped,
    Failed { error: String },
}

/// Result record for one processed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub filename: String,
    /// Name of the rule that matched, if any
    pub rule: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Events emitted while organizing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrganizeEvent {
    Started {
        source: PathBuf,
        destination: PathBuf,
        dry_run: bool,
    },
    FileProcessed(FileResult),
    Finished { processed: usize },
    /// Stopped between files by the cancel flag
    Cancelled { processed: usize },
}

/// Summary of one organize run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub results: Vec<FileResult>,
    /// Files attempted, whatever their outcome
    pub processed: usize,
    pub cancelled: bool,
}

impl From<Applied> for Outcome {
    fn from(applied: Applied) -> Self {
        match applied {
            Applied::Moved(destination) => Self::Moved { destination },
            Applied::Deleted => Self::Deleted,
        }
    }
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved { destination } => write!(f, "Moved to {}", destination.display()),
            Self::Deleted => write!(f, "Deleted"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Failed { error } => write!(f, "Failed: {}", error),
        }
    }
}

impl fmt::Display for FileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] '{}' -> {}",
            self.rule.as_deref().unwrap_or(NO_MATCH),
            self.filename,
            self.outcome
        )
    }
}

impl fmt::Display for OrganizeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { source, destination, dry_run } => {
                if *dry_run {
                    writeln!(f, "--- Starting organization (DRY RUN) ---")?;
                } else {
                    // blank where the dry-run marker would go
                    writeln!(f, "--- Starting organization  ---")?;
                }
                writeln!(f, "Source: {}", source.display())?;
                writeln!(f, "Destination: {}", destination.display())
            }
            Self::FileProcessed(result) => write!(f, "{}", result),
            Self::Finished { processed } => {
                write!(f, "\n--- Finished. Processed {} files. ---", processed)
            }
            Self::Cancelled { processed } => {
                write!(f, "\n--- Cancelled. Processed {} files. ---", processed)
            }
        }
    }
}

impl Report {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn moved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Moved { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Deleted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }
}

/// Runs a rule set over a directory
pub struct Organizer<'a> {
    rules: &'a RuleSet,
    dry_run: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Organizer<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            dry_run: false,
            cancel: None,
        }
    }

    /// Compute and report outcomes without touching the filesystem
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop before the next file once `flag` is set.
    ///
    /// A file that is already being processed always runs to completion.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Organize every regular file in `source` into `dest`
    pub fn run<F>(&self, source: &Path, dest: &Path, mut on_event: F) -> Result<Report>
    where
        F: FnMut(&OrganizeEvent),
    {
        let files = list_files(source)?;

        on_event(&OrganizeEvent::Started {
            source: source.to_path_buf(),
            destination: dest.to_path_buf(),
            dry_run: self.dry_run,
        });

        let mut report = Report::default();

        for path in files {
            if self.is_cancelled() {
                info!("Organization cancelled after {} files", report.processed);
                report.cancelled = true;
                on_event(&OrganizeEvent::Cancelled { processed: report.processed });
                return Ok(report);
            }

            let result = process_file(&path, self.rules, dest, self.dry_run);
            report.processed += 1;

            on_event(&OrganizeEvent::FileProcessed(result.clone()));
            report.results.push(result);
        }

        on_event(&OrganizeEvent::Finished { processed: report.processed });
        Ok(report)
    }
}

/// Organize `source` into `dest` with `rules`
pub fn organize<F>(
    source: &Path,
    dest: &Path,
    rules: &RuleSet,
    dry_run: bool,
    on_event: F,
) -> Result<Report>
where
    F: FnMut(&OrganizeEvent),
{
    Organizer::new(rules).dry_run(dry_run).run(source, dest, on_event)
}

/// Run the first matching rule against a single file.
///
/// Errors never escape: a failing match or action is reported as a
/// [`Outcome::Failed`] result for this file only.
pub fn process_file(path: &Path, rules: &RuleSet, dest: &Path, dry_run: bool) -> FileResult {
    let filename = file_name(path);

    for rule in rules.rules() {
        let outcome = match matches(path, &rule.condition) {
            Ok(false) => continue,
            Ok(true) => {
                debug!("{:?} matched rule '{}'", filename, rule.name);
                apply_rule(path, rule, dest, dry_run).map(Outcome::from)
            }
            Err(e) => Err(e),
        };

        let outcome = outcome.unwrap_or_else(|e| {
            warn!("Rule '{}' failed for {:?}: {}", rule.name, filename, e);
            Outcome::Failed { error: e.to_string() }
        });

        return FileResult {
            filename,
            rule: Some(rule.name.clone()),
            outcome,
        };
    }

    debug!("No rule matched {:?}", filename);
    FileResult {
        filename,
        rule: None,
        outcome: Outcome::Skipped,
    }
}

fn apply_rule(path: &Path, rule: &Rule, dest: &Path, dry_run: bool) -> Result<Applied> {
    let vars = match rule.action {
        Action::Move { .. } => TemplateVars::resolve(path, &rule.condition)?,
        Action::Delete => TemplateVars::default(),
    };
    apply(path, &rule.action, dest, &vars, dry_run)
}

/// Regular files directly inside `source`, sorted by name
pub fn list_files(source: &Path) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        return Err(StufferError::SourceDirectory(source.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(source)? {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => warn!("Skipping unreadable entry in {:?}: {}", source, e),
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
