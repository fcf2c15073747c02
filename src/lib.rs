// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Folder Stuffer: rule-based file organizer
//!
//! Files in a source directory are checked against an ordered list of rules
//! (extension, name pattern, size). The first matching rule moves the file
//! under a templated destination directory or deletes it. Dry runs report
//! the same outcomes without touching the filesystem.

pub mod actions;
pub mod error;
pub mod organizer;
pub mod rules;
pub mod template;
pub mod watcher;

pub use error::{Result, StufferError};
pub use organizer::{organize, FileResult, OrganizeEvent, Organizer, Outcome, Report};
pub use rules::{Action, Condition, Rule, RuleSet, SizeRange};
pub use template::{TemplateError, TemplateVars};
