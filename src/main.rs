// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Folder Stuffer: rule-based file organizer
//!
//! Command-line frontend for the organizing engine.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use folder_stuffer::organizer::process_file;
use folder_stuffer::watcher::{ready_for_rules, FileWatcher, WatchEvent};
use folder_stuffer::{OrganizeEvent, Organizer, Report, Result, RuleSet};

/// Folder Stuffer CLI - Automatic File Organizer
#[derive(Parser, Debug)]
#[command(name = "folder-stuffer")]
#[command(version)]
#[command(about = "Organize files into folders using ordered rules", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the rules file (JSON format)
    #[arg(short, long, default_value = "rules.json", global = true)]
    rules: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize the files currently in a folder
    Organize {
        /// The source folder to organize
        source: PathBuf,

        /// The destination folder (defaults to source)
        destination: Option<PathBuf>,

        /// Preview changes without moving or deleting files
        #[arg(long)]
        dry_run: bool,
    },

    /// Watch a folder and organize files as they arrive
    Watch {
        /// The source folder to watch
        source: PathBuf,

        /// The destination folder (defaults to source)
        destination: Option<PathBuf>,

        /// Preview changes without moving or deleting files
        #[arg(long)]
        dry_run: bool,

        /// Organize files already in the folder before watching
        #[arg(long)]
        process_existing: bool,
    },

    /// Rules file management
    Rules {
        #[command(subcommand)]
        action: RulesCommands,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommands {
    /// Show the decoded rules
    Show,

    /// Validate the rules file
    Validate,

    /// Write a starter rules file
    Generate {
        /// Output file path (defaults to --rules)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Organize { source, destination, dry_run } => {
            run_organize(&cli.rules, source, destination, dry_run, &cli.format).await
        }
        Commands::Watch { source, destination, dry_run, process_existing } => {
            run_watch(&cli.rules, source, destination, dry_run, process_existing, &cli.format).await
        }
        Commands::Rules { action } => run_rules_command(&cli.rules, action),
    }
}

/// Load rules, reporting but tolerating a missing or broken rules file
fn load_rules(path: &Path) -> RuleSet {
    let (rules, err) = RuleSet::load_or_empty(path);
    match err {
        Some(e) => eprintln!("Error: {}", e),
        None => info!("Loaded {} rules: {:?}", rules.len(), rules.names()),
    }
    rules
}

/// Print one organize event in the requested format
fn render_event(event: &OrganizeEvent, format: &str) {
    match format {
        "jsonl" => match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize event: {}", e),
        },
        // the whole report is printed once the run ends
        "json" => {}
        _ => println!("{}", event),
    }
}

/// A flag that Ctrl+C sets, stopping an organize pass between files
fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_on_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current file...");
            cancel_on_signal.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

/// Run one organize pass on the blocking pool
async fn organize_in_background(
    rules: RuleSet,
    source: PathBuf,
    dest: PathBuf,
    dry_run: bool,
    cancel: Arc<AtomicBool>,
    format: &str,
) -> Result<Report> {
    let event_format = format.to_string();
    tokio::task::spawn_blocking(move || {
        Organizer::new(&rules)
            .dry_run(dry_run)
            .with_cancel_flag(cancel)
            .run(&source, &dest, |event| render_event(event, &event_format))
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Run a single organize pass
async fn run_organize(
    rules_path: &Path,
    source: PathBuf,
    destination: Option<PathBuf>,
    dry_run: bool,
    format: &str,
) -> Result<()> {
    let dest = destination.unwrap_or_else(|| source.clone());
    let rules = load_rules(rules_path);

    if dry_run {
        warn!("DRY RUN MODE - no files will be moved or deleted");
    }

    let report = organize_in_background(rules, source, dest, dry_run, cancel_on_ctrl_c(), format).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    debug!(
        "moved: {}, deleted: {}, skipped: {}, failed: {}",
        report.moved(),
        report.deleted(),
        report.skipped(),
        report.failed()
    );

    Ok(())
}

/// Watch the source folder and organize arriving files
async fn run_watch(
    rules_path: &Path,
    source: PathBuf,
    destination: Option<PathBuf>,
    dry_run: bool,
    process_existing: bool,
    format: &str,
) -> Result<()> {
    let dest = destination.unwrap_or_else(|| source.clone());
    let rules = load_rules(rules_path);

    if rules.is_empty() {
        warn!("No rules loaded, every file will be skipped");
    }
    if dry_run {
        warn!("DRY RUN MODE - no files will be moved or deleted");
    }

    let mut watcher = FileWatcher::new()?;
    watcher.watch(&source)?;

    if process_existing {
        info!("Processing existing files...");
        let report = organize_in_background(
            rules.clone(),
            source.clone(),
            dest.clone(),
            dry_run,
            cancel_on_ctrl_c(),
            format,
        )
        .await?;
        if format == "json" {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        if report.cancelled {
            return Ok(());
        }
    }

    // Setup graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        let _ = shutdown_tx.send(true);
    });

    info!("Watching {:?}. Press Ctrl+C to stop.", source);

    let mut processed = 0usize;
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match watcher.next_event(Duration::from_millis(100)) {
            Some(WatchEvent::FileArrived(path)) => {
                if !ready_for_rules(&path, Duration::from_millis(500), Duration::from_secs(10)).await {
                    debug!("Not a settled regular file, ignoring: {:?}", path);
                    continue;
                }

                let result = process_file(&path, &rules, &dest, dry_run);
                processed += 1;
                let event = OrganizeEvent::FileProcessed(result);
                match format {
                    "json" => println!("{}", serde_json::to_string_pretty(&event)?),
                    _ => render_event(&event, format),
                }
            }
            Some(WatchEvent::Error(e)) => warn!("Watch error: {}", e),
            None => {}
        }
    }

    render_event(&OrganizeEvent::Finished { processed }, format);
    Ok(())
}

/// Run rules file commands
fn run_rules_command(rules_path: &Path, action: RulesCommands) -> Result<()> {
    match action {
        RulesCommands::Show => {
            let rules = RuleSet::load(rules_path)?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
        RulesCommands::Validate => {
            let rules = RuleSet::load(rules_path)?;
            println!("Rules at {:?} are valid", rules_path);
            for (i, rule) in rules.rules().iter().enumerate() {
                println!("  {}. {}", i + 1, rule.name);
            }
        }
        RulesCommands::Generate { output, force } => {
            let output = output.unwrap_or_else(|| rules_path.to_path_buf());
            if output.exists() && !force {
                eprintln!("{:?} already exists. Use --force to overwrite", output);
                return Ok(());
            }
            RuleSet::sample()?.save(&output)?;
            println!("Generated rules at {:?}", output);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_organize_command() {
        let cli = Cli::try_parse_from([
            "folder-stuffer", "organize", "/tmp/in", "/tmp/out", "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.rules, PathBuf::from("rules.json"));
        match cli.command {
            Commands::Organize { source, destination, dry_run } => {
                assert!(dry_run);
                assert_eq!(source, PathBuf::from("/tmp/in"));
                assert_eq!(destination, Some(PathBuf::from("/tmp/out")));
            }
            _ => panic!("Expected Organize command"),
        }
    }

    #[test]
    fn test_cli_destination_is_optional() {
        let cli = Cli::try_parse_from([
            "folder-stuffer", "--rules", "my.json", "organize", "/tmp/in",
        ])
        .unwrap();

        assert_eq!(cli.rules, PathBuf::from("my.json"));
        match cli.command {
            Commands::Organize { destination, dry_run, .. } => {
                assert!(!dry_run);
                assert_eq!(destination, None);
            }
            _ => panic!("Expected Organize command"),
        }
    }

    #[test]
    fn test_cli_watch_command() {
        let cli = Cli::try_parse_from([
            "folder-stuffer", "watch", "/tmp/in", "--process-existing", "--format", "jsonl",
        ])
        .unwrap();

        assert_eq!(cli.format, "jsonl");
        match cli.command {
            Commands::Watch { process_existing, dry_run, .. } => {
                assert!(process_existing);
                assert!(!dry_run);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["folder-stuffer", "--format", "xml", "rules", "show"]).is_err());
    }

    #[tokio::test]
    async fn test_organize_in_background() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.log"), b"x").unwrap();
        let rules = RuleSet::from_json(
            r#"{"rules": [{"name": "Logs", "condition": {"extension": ".log"}, "action": {"type": "delete"}}]}"#,
        )
        .unwrap();

        let cancelled = Arc::new(AtomicBool::new(true));
        let report = organize_in_background(
            rules.clone(),
            src.path().to_path_buf(),
            src.path().to_path_buf(),
            false,
            cancelled,
            "jsonl",
        )
        .await
        .unwrap();
        assert!(report.cancelled);
        assert!(src.path().join("a.log").exists());

        let report = organize_in_background(
            rules,
            src.path().to_path_buf(),
            src.path().to_path_buf(),
            false,
            Arc::new(AtomicBool::new(false)),
            "jsonl",
        )
        .await
        .unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.deleted(), 1);
        assert!(!src.path().join("a.log").exists());
    }

    #[test]
    fn test_rules_generate_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{}").unwrap();

        run_rules_command(&path, RulesCommands::Generate { output: None, force: false }).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        run_rules_command(&path, RulesCommands::Generate { output: None, force: true }).unwrap();
        assert_eq!(RuleSet::load(&path).unwrap().len(), 4);
    }
}
