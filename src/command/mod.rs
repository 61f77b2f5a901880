//! File command model: the mutation vocabulary and apply-or-record routing
//!
//! Transform units describe effects as [`FileCommand`]s; a command is
//! produced once and consumed exactly once, either applied through the real
//! filesystem store or recorded into a case log with no side effect on the
//! target tree.

mod store;

pub use store::FsStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One file-level effect produced by a transform unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileCommand {
    Create {
        new_path: PathBuf,
        new_data: String,
    },
    /// `old_data` must still match the content at `old_path` when applied;
    /// a mismatch means the item was mutated out from under its worker.
    Update {
        old_path: PathBuf,
        old_data: String,
        new_data: String,
    },
    Delete {
        old_path: PathBuf,
    },
    Move {
        old_path: PathBuf,
        new_path: PathBuf,
    },
    Copy {
        old_path: PathBuf,
        new_path: PathBuf,
    },
}

impl FileCommand {
    /// The path this command is keyed on: the source path where one exists,
    /// otherwise the path being created.
    pub fn primary_path(&self) -> &Path {
        match self {
            FileCommand::Create { new_path, .. } => new_path,
            FileCommand::Update { old_path, .. }
            | FileCommand::Delete { old_path }
            | FileCommand::Move { old_path, .. }
            | FileCommand::Copy { old_path, .. } => old_path,
        }
    }
}

impl fmt::Display for FileCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCommand::Create { new_path, new_data } => {
                write!(f, "create {} ({} bytes)", new_path.display(), new_data.len())
            }
            FileCommand::Update {
                old_path,
                old_data,
                new_data,
            } => write!(
                f,
                "update {} ({} -> {} bytes)",
                old_path.display(),
                old_data.len(),
                new_data.len()
            ),
            FileCommand::Delete { old_path } => write!(f, "delete {}", old_path.display()),
            FileCommand::Move { old_path, new_path } => {
                write!(f, "move {} -> {}", old_path.display(), new_path.display())
            }
            FileCommand::Copy { old_path, new_path } => {
                write!(f, "copy {} -> {}", old_path.display(), new_path.display())
            }
        }
    }
}

/// Where applied commands land: the real tree or a case recording.
#[async_trait]
pub trait CommandStore: Send + Sync {
    async fn apply(&self, command: FileCommand) -> Result<(), StoreError>;
}

/// Fresh content reads for the runner's per-step fetch.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Formats content before the store sees it. Real formatters are external
/// collaborators; the default passes content through untouched.
pub trait Formatter: Send + Sync {
    fn format(&self, path: &Path, content: &str) -> String;
}

pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, _path: &Path, content: &str) -> String {
        content.to_string()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stale update for {path}: content changed since dispatch")]
    StaleUpdate { path: PathBuf },

    #[error("store I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Recording failures are fatal for the run, unlike the per-item
    /// variants above.
    #[error("case recording failed")]
    Recording(#[from] crate::errors::CaseError),
}

/// Apply one command to a store. Content-bearing commands pass through the
/// formatter first when the step enables formatting; delete/move/copy pass
/// through unchanged.
pub async fn apply(
    command: FileCommand,
    store: &dyn CommandStore,
    formatter: &dyn Formatter,
    format: bool,
) -> Result<(), StoreError> {
    let command = if format {
        format_command(command, formatter)
    } else {
        command
    };
    store.apply(command).await
}

fn format_command(command: FileCommand, formatter: &dyn Formatter) -> FileCommand {
    match command {
        FileCommand::Create { new_path, new_data } => {
            let new_data = formatter.format(&new_path, &new_data);
            FileCommand::Create { new_path, new_data }
        }
        FileCommand::Update {
            old_path,
            old_data,
            new_data,
        } => {
            let new_data = formatter.format(&old_path, &new_data);
            FileCommand::Update {
                old_path,
                old_data,
                new_data,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShoutFormatter;

    impl Formatter for ShoutFormatter {
        fn format(&self, _path: &Path, content: &str) -> String {
            content.to_uppercase()
        }
    }

    #[test]
    fn formatting_touches_only_content_bearing_commands() {
        let update = FileCommand::Update {
            old_path: "/a".into(),
            old_data: "old".into(),
            new_data: "new".into(),
        };
        let formatted = format_command(update, &ShoutFormatter);
        assert_eq!(
            formatted,
            FileCommand::Update {
                old_path: "/a".into(),
                old_data: "old".into(),
                new_data: "NEW".into(),
            }
        );

        let rename = FileCommand::Move {
            old_path: "/a".into(),
            new_path: "/b".into(),
        };
        assert_eq!(format_command(rename.clone(), &ShoutFormatter), rename);
    }

    #[test]
    fn command_serialization_is_tagged() {
        let command = FileCommand::Delete {
            old_path: "/code/a.ts".into(),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["kind"], "delete");
        assert_eq!(json["old_path"], "/code/a.ts");
    }
}
