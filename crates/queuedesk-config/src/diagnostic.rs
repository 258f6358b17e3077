// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! miette diagnostics for configuration errors.
//!
//! Figment reports unknown keys, missing keys, and type mismatches with a key
//! path but no position. [`figment_to_config_errors`] finds the offending line
//! in the TOML text that was loaded and adds a "did you mean" hint for
//! misspelt keys (Jaro-Winkler similarity via `strsim`).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum similarity for a suggestion. `debounce_sm` -> `debounce_ms` clears it.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error ready for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(queuedesk::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table path, empty for the top level.
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the section.
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(queuedesk::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Full dotted path of the key.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(queuedesk::config::missing_key),
        help("add `{key} = <value>` under {}", section_label(section))
    )]
    MissingKey { key: String, section: String },

    /// A value that parsed but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(queuedesk::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(queuedesk::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error inside a `figment::Error` into a [`ConfigError`].
///
/// `toml_sources` holds `(name, content)` for each TOML document that was
/// merged. Spans are attached when the offending key can be found in one.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = Sources(toml_sources);
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let section = table_path(&path);
                    let (span, src) = sources.locate(&error, &section, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        section,
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                    section: table_path(&path),
                },
                Kind::InvalidType(actual, expected) => {
                    let (key, section) = match path.split_last() {
                        Some((key, parent)) => (key.clone(), table_path(parent)),
                        None => (String::new(), String::new()),
                    };
                    let (span, src) = sources.locate(&error, &section, &key);
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// TOML documents that fed the figment.
struct Sources<'a>(&'a [(String, String)]);

impl Sources<'_> {
    /// The document an error came from. A lone document is assumed.
    fn origin(&self, error: &figment::Error) -> Option<&(String, String)> {
        let file = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        match file {
            Some(file) => self.0.iter().find(|(name, _)| *name == file),
            None if self.0.len() == 1 => self.0.first(),
            None => None,
        }
    }

    fn locate(
        &self,
        error: &figment::Error,
        section: &str,
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((name, content)) = self.origin(error) else {
            return (None, None);
        };
        match key_offset(content, section, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Dotted table path with array indices dropped: `locations.0.services.1`
/// becomes `locations.services`.
fn table_path(path: &[String]) -> String {
    path.iter()
        .filter(|p| p.parse::<usize>().is_err())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// `server` for `[server]`, `locations.services` for `[[locations.services]]`.
fn table_header(line: &str) -> Option<&str> {
    let inner = line
        .strip_prefix("[[")
        .and_then(|l| l.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|l| l.strip_suffix(']')))?;
    Some(inner.trim())
}

/// Byte offset of the first `key = ...` line inside tables named `section`.
///
/// Repeated array tables are all searched, so a typo in the third
/// `[[locations]]` entry is still found. `section` is empty for top-level keys.
pub fn key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = "";
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        if let Some(header) = table_header(body.trim_end()) {
            current = header;
        } else if current == section {
            if let Some(rest) = body.strip_prefix(key) {
                if rest.trim_start().starts_with('=') {
                    return Some(offset + line.len() - body.len());
                }
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Renders every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    let _ = writeln!(out, "{} configuration error(s)", errors.len());
    eprint!("{out}");
}
