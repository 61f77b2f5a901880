//! Test support: in-memory stores and canned transforms
//!
//! Used by the crate's own integration tests; kept in the library so
//! downstream consumers can drive the runner hermetically too.

use crate::command::{CommandStore, ContentSource, FileCommand, StoreError};
use crate::source::WorkItem;
use crate::transform::{
    ArgumentRecord, Console, EngineKind, ScalarValue, Step, TransformError, TransformOutcome,
    TransformUnit,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory file tree implementing both the content source and the command
/// store, with the same semantics as the filesystem store.
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryStore {
    pub fn new<P, S>(files: impl IntoIterator<Item = (P, S)>) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self {
            files: Mutex::new(
                files
                    .into_iter()
                    .map(|(path, content)| (path.into(), content.into()))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .expect("memory store lock")
            .get(path.as_ref())
            .cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.files.lock().expect("memory store lock").clone()
    }
}

#[async_trait]
impl ContentSource for MemoryStore {
    async fn read(&self, path: &Path) -> std::io::Result<String> {
        self.get(path)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
    }
}

#[async_trait]
impl CommandStore for MemoryStore {
    async fn apply(&self, command: FileCommand) -> Result<(), StoreError> {
        let mut files = self.files.lock().expect("memory store lock");
        let missing = |path: &Path| StoreError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        match command {
            FileCommand::Create { new_path, new_data } => {
                files.insert(new_path, new_data);
            }
            FileCommand::Update {
                old_path,
                old_data,
                new_data,
            } => {
                let current = files.get(&old_path).ok_or_else(|| missing(&old_path))?;
                if *current != old_data {
                    return Err(StoreError::StaleUpdate { path: old_path });
                }
                files.insert(old_path, new_data);
            }
            FileCommand::Delete { old_path } => {
                files.remove(&old_path).ok_or_else(|| missing(&old_path))?;
            }
            FileCommand::Move { old_path, new_path } => {
                let data = files.remove(&old_path).ok_or_else(|| missing(&old_path))?;
                files.insert(new_path, data);
            }
            FileCommand::Copy { old_path, new_path } => {
                let data = files.get(&old_path).ok_or_else(|| missing(&old_path))?.clone();
                files.insert(new_path, data);
            }
        }
        Ok(())
    }
}

/// Rewrites matching files to `"{label} {path} {argA} {argB}"`. With
/// `only_path` set, every other file is left unchanged.
pub struct LabelTransform {
    pub label: &'static str,
    pub only_path: Option<PathBuf>,
}

impl TransformUnit for LabelTransform {
    fn apply(
        &self,
        item: &WorkItem,
        args: &ArgumentRecord,
        _console: &mut Console,
    ) -> Result<TransformOutcome, TransformError> {
        if let Some(only) = &self.only_path {
            if &item.path != only {
                return Ok(TransformOutcome::Unchanged);
            }
        }
        let arg_a = args
            .get("argA")
            .ok_or(TransformError::MissingArgument("argA"))?;
        let arg_b = args
            .get("argB")
            .ok_or(TransformError::MissingArgument("argB"))?;
        Ok(TransformOutcome::Rewritten(format!(
            "{} {} {} {}",
            self.label,
            item.path.display(),
            arg_a,
            arg_b
        )))
    }
}

/// Fails one specific path and leaves everything else untouched.
pub struct FaultingTransform {
    pub fail_path: PathBuf,
}

impl TransformUnit for FaultingTransform {
    fn apply(
        &self,
        item: &WorkItem,
        _args: &ArgumentRecord,
        _console: &mut Console,
    ) -> Result<TransformOutcome, TransformError> {
        if item.path == self.fail_path {
            return Err(TransformError::Failed("injected fault".to_string()));
        }
        Ok(TransformOutcome::Rewritten(format!(
            "touched {}",
            item.content
        )))
    }
}

/// Emits one console line per evaluation and changes nothing.
pub struct ChattyTransform;

impl TransformUnit for ChattyTransform {
    fn apply(
        &self,
        item: &WorkItem,
        _args: &ArgumentRecord,
        console: &mut Console,
    ) -> Result<TransformOutcome, TransformError> {
        console.log(format!("inspected {}", item.path.display()));
        Ok(TransformOutcome::Unchanged)
    }
}

/// Build a step around an arbitrary transform, for tests.
pub fn step_with(
    name: &str,
    transform: Arc<dyn TransformUnit>,
    args: &[(&str, ScalarValue)],
) -> Step {
    Step {
        name: name.to_string(),
        engine: EngineKind::Literal,
        transform,
        args: args
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        format: false,
    }
}
