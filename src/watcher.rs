// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Source directory watcher for continuous organizing

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Result, StufferError};

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file was created in, or renamed into, the watched directory
    FileArrived(PathBuf),
    /// Watcher error
    Error(String),
}

/// Watches one source directory, non-recursively
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    source: Option<PathBuf>,
    event_rx: Receiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new() -> Result<Self> {
        let (tx, rx) = channel();

        let config = Config::default().with_poll_interval(Duration::from_secs(2));
        let watcher = RecommendedWatcher::new(tx, config)?;

        Ok(Self {
            watcher,
            source: None,
            event_rx: rx,
        })
    }

    /// Start watching `source`, which must already exist
    pub fn watch(&mut self, source: &Path) -> Result<()> {
        if !source.is_dir() {
            return Err(StufferError::SourceDirectory(source.to_path_buf()));
        }

        self.watcher.watch(source, RecursiveMode::NonRecursive)?;
        self.source = Some(source.to_path_buf());
        info!("Watching: {:?}", source);
        Ok(())
    }

    /// Get the next event (blocking with timeout)
    pub fn next_event(&self, timeout: Duration) -> Option<WatchEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(Ok(event)) => Self::convert_event(event),
            Ok(Err(e)) => Some(WatchEvent::Error(e.to_string())),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(WatchEvent::Error("Watcher disconnected".to_string()))
            }
        }
    }

    fn convert_event(event: Event) -> Option<WatchEvent> {
        match event.kind {
            EventKind::Create(_) => event.paths.first().cloned().map(WatchEvent::FileArrived),
            // for a two-sided rename the new name comes last
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
                event.paths.last().cloned().map(WatchEvent::FileArrived)
            }
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Whether an arrived path should be handed to the rules.
///
/// Only regular files that have stopped growing qualify. Which files get
/// moved or deleted is left entirely to the rule set.
pub async fn ready_for_rules(path: &Path, check_interval: Duration, max_wait: Duration) -> bool {
    path.is_file() && wait_for_stable(path, check_interval, max_wait).await
}

/// Wait until a file stops growing.
///
/// Returns false if the file disappears while waiting. Gives up waiting
/// after `max_wait` and reports the file as stable.
pub async fn wait_for_stable(path: &Path, check_interval: Duration, max_wait: Duration) -> bool {
    let start = std::time::Instant::now();

    let mut last_size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return false,
    };

    loop {
        tokio::time::sleep(check_interval).await;

        let current_size = match std::fs::metadata(path) {
            Ok(m) => m.len(),
            Err(_) => return false,
        };

        if current_size == last_size {
            return true;
        }

        if start.elapsed() > max_wait {
            warn!("File stability check timed out for {:?}", path);
            return true;
        }

        last_size = current_size;
        debug!("File {:?} still being written, size: {}", path, current_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_create_and_rename() {
        let created = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/in/a.txt"));
        assert_eq!(
            FileWatcher::convert_event(created),
            Some(WatchEvent::FileArrived(PathBuf::from("/in/a.txt")))
        );

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/in/a.txt.part"))
            .add_path(PathBuf::from("/in/a.txt"));
        assert_eq!(
            FileWatcher::convert_event(renamed),
            Some(WatchEvent::FileArrived(PathBuf::from("/in/a.txt")))
        );

        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/in/a.txt"));
        assert_eq!(FileWatcher::convert_event(removed), None);
    }

    #[test]
    fn test_watch_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = FileWatcher::new().unwrap();
        let err = watcher.watch(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, StufferError::SourceDirectory(_)));
        assert!(watcher.source().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.bin");
        std::fs::write(&path, b"complete").unwrap();

        let interval = Duration::from_millis(10);
        assert!(wait_for_stable(&path, interval, Duration::from_secs(1)).await);
        assert!(!wait_for_stable(&dir.path().join("gone.bin"), interval, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_partial_and_hidden_files_reach_the_rules() {
        let dir = tempfile::tempdir().unwrap();
        let interval = Duration::from_millis(10);
        let max_wait = Duration::from_secs(1);

        for name in ["movie.mkv.part", "setup.exe.crdownload", "scratch.tmp", ".hidden"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"x").unwrap();
            assert!(ready_for_rules(&path, interval, max_wait).await, "{name}");
        }

        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(!ready_for_rules(&dir.path().join("nested"), interval, max_wait).await);
        assert!(!ready_for_rules(&dir.path().join("gone.bin"), interval, max_wait).await);
    }
}
