//! Transform units: the pluggable rewriting seam evaluated by workers
//!
//! A transform unit sees one work item's content plus a validated argument
//! record and decides whether to rewrite it. The rewriting logic itself is
//! opaque to the rest of the system; the built-in engines in [`engines`]
//! are deliberately small.

pub mod engines;

use crate::source::WorkItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Which engine evaluates a step's transform unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Plain substring find/replace
    Literal,
    /// Regular-expression find/replace
    Regex,
}

/// A scalar argument value. Recipe arguments are flat name → scalar maps;
/// nested structures are rejected when the recipe is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::String(value) => write!(f, "{value}"),
        }
    }
}

/// Validated name → scalar map handed to every transform invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentRecord(BTreeMap<String, ScalarValue>);

impl ArgumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.0.get(name)
    }

    /// String value of an argument, or an error naming what is missing.
    pub fn require_str(&self, name: &'static str) -> Result<&str, TransformError> {
        match self.get(name) {
            Some(ScalarValue::String(value)) => Ok(value),
            Some(_) => Err(TransformError::WrongArgumentType { name }),
            None => Err(TransformError::MissingArgument(name)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScalarValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ScalarValue)> for ArgumentRecord {
    fn from_iter<I: IntoIterator<Item = (String, ScalarValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What evaluating one work item produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Replace the item's content with this string
    Rewritten(String),
    /// Leave the item untouched
    Unchanged,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("argument '{name}' must be a string")]
    WrongArgumentType { name: &'static str },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("{0}")]
    Failed(String),
}

/// Console output captured during one evaluation and reported with the
/// item's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub kind: ConsoleKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleKind {
    Stdout,
    Stderr,
}

/// Per-evaluation console sink handed to the transform unit.
#[derive(Debug, Default)]
pub struct Console {
    lines: Vec<ConsoleLine>,
}

impl Console {
    pub fn log(&mut self, text: impl Into<String>) {
        self.lines.push(ConsoleLine {
            kind: ConsoleKind::Stdout,
            text: text.into(),
        });
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.lines.push(ConsoleLine {
            kind: ConsoleKind::Stderr,
            text: text.into(),
        });
    }

    pub fn into_lines(self) -> Vec<ConsoleLine> {
        self.lines
    }
}

/// One rewriting unit. Implementations see content and arguments, never the
/// filesystem; an `Err` is the item's fault and isolates to that dispatch.
pub trait TransformUnit: Send + Sync {
    fn apply(
        &self,
        item: &WorkItem,
        args: &ArgumentRecord,
        console: &mut Console,
    ) -> Result<TransformOutcome, TransformError>;
}

/// One loaded recipe step.
#[derive(Clone)]
pub struct Step {
    /// Step name, used for logging and the case header
    pub name: String,
    pub engine: EngineKind,
    pub transform: Arc<dyn TransformUnit>,
    pub args: ArgumentRecord,
    /// Pass rewritten content through the formatter before applying
    pub format: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_display_is_plain() {
        assert_eq!(ScalarValue::Int(1).to_string(), "1");
        assert_eq!(ScalarValue::Bool(true).to_string(), "true");
        assert_eq!(ScalarValue::String("x".into()).to_string(), "x");
    }

    #[test]
    fn require_str_distinguishes_missing_from_mistyped() {
        let mut args = ArgumentRecord::new();
        args.insert("count", ScalarValue::Int(3));
        assert!(matches!(
            args.require_str("count"),
            Err(TransformError::WrongArgumentType { name: "count" })
        ));
        assert!(matches!(
            args.require_str("absent"),
            Err(TransformError::MissingArgument("absent"))
        ));
    }

    #[test]
    fn argument_record_round_trips_as_flat_json() {
        let args: ArgumentRecord = [
            ("a".to_string(), ScalarValue::Int(1)),
            ("b".to_string(), ScalarValue::String("two".into())),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"a":1,"b":"two"}"#);
        let back: ArgumentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, args);
    }
}
