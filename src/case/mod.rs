//! Case recording: replayable transcripts of a dry run
//!
//! A case log is a single appendable stream of length-prefixed frames. Frame
//! 0 carries the case header; every later frame is one job record, one per
//! mutation the run would have applied. The framing lets a separate replay
//! tool stream-parse the log without random access or loading it whole.

pub mod reader;
pub mod ring;
pub mod writer;

pub use reader::CaseReader;
pub use ring::RingByteBuffer;
pub use writer::{CaseWriter, RecordingStore};

use crate::command::FileCommand;
use crate::transform::ArgumentRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Frame 0 of every case log. Written exactly once, first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseHeader {
    pub case_id: Uuid,
    /// The recipe step this case was recorded for
    pub step_id: String,
    pub created_at: DateTime<Utc>,
    pub target_root: PathBuf,
    pub args: ArgumentRecord,
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub command: FileCommand,
    /// Hex SHA-256 over the content the command carries, or over the source
    /// path bytes for commands that carry none
    pub path_content_hash: String,
}

/// Discriminated frame payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum CaseRecord {
    Case(CaseHeader),
    Job(JobRecord),
}

/// Content hash stored alongside a recorded command, letting a replay tool
/// detect drift on content-bearing commands.
pub fn path_content_hash(command: &FileCommand) -> String {
    let digest = match command {
        FileCommand::Create { new_data, .. } => Sha256::digest(new_data.as_bytes()),
        FileCommand::Update { new_data, .. } => Sha256::digest(new_data.as_bytes()),
        FileCommand::Delete { old_path }
        | FileCommand::Move { old_path, .. }
        | FileCommand::Copy { old_path, .. } => {
            Sha256::digest(old_path.as_os_str().as_encoded_bytes())
        }
    };
    format!("{digest:x}")
}

/// Deterministic staging path for a dry-run mutation: derived from the case
/// id and a 160-bit prefix of the path digest, so concurrent dry runs and
/// distinct paths never collide.
pub fn staging_path(staging_root: &Path, case_id: &Uuid, path: &Path) -> PathBuf {
    let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
    let hex = format!("{digest:x}");
    staging_root.join(case_id.to_string()).join(&hex[..40])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_paths_are_deterministic_and_disjoint() {
        let root = Path::new("/tmp/cases");
        let case_a = Uuid::new_v4();
        let case_b = Uuid::new_v4();
        let p1 = Path::new("/code/a.ts");
        let p2 = Path::new("/code/b.ts");

        assert_eq!(
            staging_path(root, &case_a, p1),
            staging_path(root, &case_a, p1)
        );
        assert_ne!(
            staging_path(root, &case_a, p1),
            staging_path(root, &case_a, p2)
        );
        assert_ne!(
            staging_path(root, &case_a, p1),
            staging_path(root, &case_b, p1)
        );
    }

    #[test]
    fn content_hash_tracks_carried_content() {
        let update = FileCommand::Update {
            old_path: "/a".into(),
            old_data: "x".into(),
            new_data: "y".into(),
        };
        let create = FileCommand::Create {
            new_path: "/b".into(),
            new_data: "y".into(),
        };
        // same carried content, same hash, regardless of command kind
        assert_eq!(path_content_hash(&update), path_content_hash(&create));

        let delete = FileCommand::Delete { old_path: "/a".into() };
        assert_ne!(path_content_hash(&update), path_content_hash(&delete));
    }
}
