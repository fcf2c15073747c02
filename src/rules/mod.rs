// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rule definitions and rule set loading

pub mod matcher;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Result, StufferError};

pub use matcher::matches;

/// Ordered list of rules, evaluated first-match-wins
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A named pairing of a condition and an action
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub condition: Condition,
    pub action: Action,
}

/// Predicate over a file's extension, name and size.
///
/// Every present clause must hold. A condition without clauses matches
/// every file.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Extensions including the leading dot, compared case-insensitively
    #[serde(
        default,
        deserialize_with = "extensions::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub extension: Option<Vec<String>>,

    /// Case-insensitive pattern searched in the base filename
    #[serde(
        default,
        alias = "name_pattern",
        with = "pattern",
        skip_serializing_if = "Option::is_none"
    )]
    pub name_pattern: Option<Regex>,

    /// Exclusive size bounds in mebibytes
    #[serde(default, alias = "size_mb", skip_serializing_if = "Option::is_none")]
    pub size_mb: Option<SizeRange>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeRange {
    #[serde(default, alias = "greater_than", skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<f64>,
    #[serde(default, alias = "less_than", skip_serializing_if = "Option::is_none")]
    pub less_than: Option<f64>,
}

/// Effect applied to a matched file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Move into the directory produced by the destination template
    Move {
        #[serde(alias = "destinationTemplate")]
        destination: String,
    },
    /// Remove the file
    Delete,
}

impl Condition {
    /// True when no clause is present
    pub fn is_empty(&self) -> bool {
        self.extension.is_none() && self.name_pattern.is_none() && self.size_mb.is_none()
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Decode a rule document from JSON text
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Load rules from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StufferError::RulesNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let rule_set = Self::from_json(&content).map_err(|e| StufferError::RulesParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::debug!("Loaded {} rules from {:?}", rule_set.len(), path);
        Ok(rule_set)
    }

    /// Load rules, degrading to an empty rule set on failure.
    ///
    /// The error is handed back so the caller can report it; with zero rules
    /// every file is skipped.
    pub fn load_or_empty(path: &Path) -> (Self, Option<StufferError>) {
        match Self::load(path) {
            Ok(rule_set) => (rule_set, None),
            Err(e) => {
                tracing::warn!("{}", e);
                (Self::default(), Some(e))
            }
        }
    }

    /// Save rules to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Starter rules written by `rules generate`
    pub fn sample() -> serde_json::Result<Self> {
        let document = r#"{
            "rules": [
                {
                    "name": "Invoices",
                    "condition": { "extension": ".pdf", "namePattern": "invoice[_-](\\d+)" },
                    "action": { "type": "move", "destination": "Finance/Invoices/{group1}" }
                },
                {
                    "name": "Photos",
                    "condition": { "extension": [".jpg", ".jpeg", ".png", ".heic"] },
                    "action": { "type": "move", "destination": "Photos/{year}/{month}" }
                },
                {
                    "name": "Large Videos",
                    "condition": { "extension": [".mp4", ".mkv", ".mov"], "sizeMb": { "greaterThan": 100 } },
                    "action": { "type": "move", "destination": "Videos/Large" }
                },
                {
                    "name": "Partial Downloads",
                    "condition": { "extension": [".crdownload", ".part"], "sizeMb": { "lessThan": 1 } },
                    "action": { "type": "delete" }
                }
            ]
        }"#;

        Self::from_json(document)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

/// `extension` accepts a single string or a list of strings
mod extensions {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
        // an empty list is the same as no extension clause
        Ok(value.and_then(|v| match v {
            OneOrMany::One(ext) => Some(vec![ext]),
            OneOrMany::Many(exts) if exts.is_empty() => None,
            OneOrMany::Many(exts) => Some(exts),
        }))
    }
}

/// Name patterns are compiled case-insensitively while decoding
mod pattern {
    use regex::{Regex, RegexBuilder};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Regex>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source: Option<String> = Option::deserialize(deserializer)?;
        source
            .map(|s| {
                RegexBuilder::new(&s)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| D::Error::custom(format!("invalid namePattern {s:?}: {e}")))
            })
            .transpose()
    }

    pub fn serialize<S>(value: &Option<Regex>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(re) => serializer.serialize_some(re.as_str()),
            None => serializer.serialize_none(),
        }
    }
}
