// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Destination template variables and rendering
//!
//! Templates use `{name}` placeholders; `{{` and `}}` stand for literal
//! braces. Available variables are `year`, `month`, `day` (from the file's
//! modification time in local time), `filename`, and `group1`..`groupN` for
//! the capture groups of the matched rule's name pattern.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::rules::matcher::file_name;
use crate::rules::Condition;
use crate::Result;

/// Template rendering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("undefined template variable '{{{0}}}'")]
    UndefinedVariable(String),

    #[error("malformed template {template:?}: {reason}")]
    Malformed { template: String, reason: &'static str },
}

/// Variables available to a destination template for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    vars: HashMap<String, String>,
}

impl TemplateVars {
    /// Build the variables for a file that matched `condition`
    pub fn resolve(path: &Path, condition: &Condition) -> Result<Self> {
        let modified: DateTime<Local> = std::fs::metadata(path)?.modified()?.into();
        let filename = file_name(path);

        let mut vars = Self::from_date(modified, &filename);

        if let Some(ref pattern) = condition.name_pattern {
            if let Some(caps) = pattern.captures(&filename) {
                // skip group 0, the whole match
                for (i, group) in caps.iter().enumerate().skip(1) {
                    if let Some(m) = group {
                        vars.insert(format!("group{i}"), m.as_str());
                    }
                }
            }
        }

        Ok(vars)
    }

    /// Date and filename variables without capture groups
    pub fn from_date(date: DateTime<Local>, filename: &str) -> Self {
        let mut vars = Self::default();
        vars.insert("year", date.format("%Y").to_string());
        vars.insert("month", date.format("%m").to_string());
        vars.insert("day", date.format("%d").to_string());
        vars.insert("filename", filename);
        vars
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Substitute every placeholder in `template`
    pub fn render(&self, template: &str) -> std::result::Result<String, TemplateError> {
        let malformed = |reason: &'static str| TemplateError::Malformed {
            template: template.to_string(),
            reason,
        };

        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(malformed("nested '{'")),
                            Some(ch) => name.push(ch),
                            None => return Err(malformed("unclosed '{'")),
                        }
                    }
                    let value = self
                        .get(&name)
                        .ok_or_else(|| TemplateError::UndefinedVariable(name.clone()))?;
                    out.push_str(value);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => return Err(malformed("single '}'")),
                _ => out.push(c),
            }
        }

        Ok(out)
    }
}
