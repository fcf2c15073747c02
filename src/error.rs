// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Folder Stuffer

use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

/// Result type alias for Folder Stuffer operations
pub type Result<T> = std::result::Result<T, StufferError>;

/// Folder Stuffer error types
#[derive(Error, Debug)]
pub enum StufferError {
    #[error("Rules file not found at {0:?}")]
    RulesNotFound(PathBuf),

    #[error("Could not parse rules from {path:?}: {message}")]
    RulesParse { path: PathBuf, message: String },

    #[error("Source directory {0:?} not found")]
    SourceDirectory(PathBuf),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl StufferError {
    /// Whether the error belongs to the rule configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::RulesNotFound(_) | Self::RulesParse { .. })
    }
}
