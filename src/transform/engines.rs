//! Built-in transform engines
//!
//! Two small engines ship with the runner: literal substring replacement and
//! regex replacement. Anything smarter plugs in through [`TransformUnit`].

use super::{
    ArgumentRecord, Console, EngineKind, Step, TransformError, TransformOutcome, TransformUnit,
};
use crate::source::WorkItem;
use regex::Regex;
use std::sync::Arc;

/// Substring find/replace over the whole item.
///
/// Arguments: `find` (string), `replace` (string).
pub struct LiteralEngine;

impl TransformUnit for LiteralEngine {
    fn apply(
        &self,
        item: &WorkItem,
        args: &ArgumentRecord,
        _console: &mut Console,
    ) -> Result<TransformOutcome, TransformError> {
        let find = args.require_str("find")?;
        let replace = args.require_str("replace")?;
        if !item.content.contains(find) {
            return Ok(TransformOutcome::Unchanged);
        }
        Ok(TransformOutcome::Rewritten(
            item.content.replace(find, replace),
        ))
    }
}

/// Regex find/replace over the whole item.
///
/// Arguments: `pattern` (string, compiled once at load), `replace` (string,
/// `$name`/`$1` expansions supported).
pub struct RegexEngine {
    pattern: Regex,
}

impl RegexEngine {
    pub fn from_args(args: &ArgumentRecord) -> Result<Self, TransformError> {
        let pattern = Regex::new(args.require_str("pattern")?)?;
        Ok(Self { pattern })
    }
}

impl TransformUnit for RegexEngine {
    fn apply(
        &self,
        item: &WorkItem,
        args: &ArgumentRecord,
        _console: &mut Console,
    ) -> Result<TransformOutcome, TransformError> {
        let replace = args.require_str("replace")?;
        if !self.pattern.is_match(&item.content) {
            return Ok(TransformOutcome::Unchanged);
        }
        Ok(TransformOutcome::Rewritten(
            self.pattern.replace_all(&item.content, replace).into_owned(),
        ))
    }
}

/// Resolve an engine kind plus arguments into a loaded step. Argument
/// problems surface here, before any worker starts.
pub fn load_step(
    name: impl Into<String>,
    engine: EngineKind,
    args: ArgumentRecord,
    format: bool,
) -> Result<Step, TransformError> {
    let transform: Arc<dyn TransformUnit> = match engine {
        EngineKind::Literal => {
            args.require_str("find")?;
            args.require_str("replace")?;
            Arc::new(LiteralEngine)
        }
        EngineKind::Regex => {
            args.require_str("replace")?;
            Arc::new(RegexEngine::from_args(&args)?)
        }
    };
    Ok(Step {
        name: name.into(),
        engine,
        transform,
        args,
        format,
    })
}
