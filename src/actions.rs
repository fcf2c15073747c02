// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Applying a matched rule's action to a file

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::rules::matcher::file_name;
use crate::rules::Action;
use crate::template::TemplateVars;
use crate::Result;

/// What an action did (or would do, in a dry run)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// File moved into this directory
    Moved(PathBuf),
    /// File removed
    Deleted,
}

/// Apply `action` to the file at `path`.
///
/// Move destinations are rendered from `vars` and joined under `dest_root`.
/// In a dry run the outcome is computed and reported but the filesystem is
/// left untouched.
pub fn apply(
    path: &Path,
    action: &Action,
    dest_root: &Path,
    vars: &TemplateVars,
    dry_run: bool,
) -> Result<Applied> {
    match action {
        Action::Delete => {
            if dry_run {
                debug!("DRY RUN: would delete {:?}", path);
            } else {
                fs::remove_file(path)?;
                info!("Deleted {:?}", path);
            }
            Ok(Applied::Deleted)
        }
        Action::Move { destination } => {
            let dest_dir = destination_dir(dest_root, destination, vars)?;
            if dry_run {
                debug!("DRY RUN: would move {:?} to {:?}", path, dest_dir);
            } else {
                // create_dir_all treats an existing directory as success
                fs::create_dir_all(&dest_dir)?;
                let target = dest_dir.join(file_name(path));
                move_file(path, &target)?;
                info!("Moved {:?} to {:?}", path, target);
            }
            Ok(Applied::Moved(dest_dir))
        }
    }
}

/// Render a destination template and place it under `dest_root`
pub fn destination_dir(dest_root: &Path, template: &str, vars: &TemplateVars) -> Result<PathBuf> {
    let relative = vars.render(template)?;
    Ok(dest_root.join(relative))
}

/// Move a file, replacing any existing file at `target`.
///
/// Only a rename across filesystems falls back to copy and remove; every
/// other rename failure is returned as is.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    if source == target {
        return Ok(());
    }

    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!("{:?} is on another filesystem, copying instead", target);
            copy_then_remove(source, target)
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy `source` to `target`, then remove `source`.
///
/// If the source cannot be removed the copy is deleted again, so the file
/// never ends up in both places.
fn copy_then_remove(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)?;

    if let Err(remove_err) = fs::remove_file(source) {
        if let Err(e) = fs::remove_file(target) {
            warn!("Could not remove copy {:?} after failed move: {}", target, e);
        }
        return Err(remove_err.into());
    }
    Ok(())
}

/// EXDEV on Unix, ERROR_NOT_SAME_DEVICE on Windows
fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(unix)]
    const CROSS_DEVICE: i32 = 18;
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17;
    #[cfg(not(any(unix, windows)))]
    const CROSS_DEVICE: i32 = -1;

    err.raw_os_error() == Some(CROSS_DEVICE)
}
