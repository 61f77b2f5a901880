//! Streaming case log writer
//!
//! Records are serialized into `[u32 LE length][payload]` frames and pushed
//! through the ring buffer; a frame parser on the other side of the delivery
//! channel requests the fixed-size length first, then the payload, and
//! appends each delivered chunk to the log file. The ring bounds how much
//! serialized data is staged between the two at any point.

use super::ring::RingByteBuffer;
use super::{path_content_hash, staging_path, CaseHeader, CaseRecord, JobRecord};
use crate::command::{CommandStore, FileCommand, StoreError};
use crate::errors::CaseError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const LEN_PREFIX: usize = 4;
const DEFAULT_RING_CAPACITY: usize = 4 * 1024 * 1024;

/// What the frame parser expects to be delivered next.
enum Expect {
    Length,
    Payload,
}

pub struct CaseWriter {
    ring: RingByteBuffer,
    delivery: mpsc::UnboundedReceiver<Vec<u8>>,
    expect: Expect,
    file: BufWriter<File>,
    wrote_header: bool,
    frames: usize,
}

impl CaseWriter {
    /// Create a case log at `path`, truncating anything already there.
    pub async fn create(path: &Path) -> Result<Self, CaseError> {
        Self::with_ring_capacity(path, DEFAULT_RING_CAPACITY).await
    }

    /// Create a writer with a custom ring capacity. Every frame's payload
    /// must fit within it.
    pub async fn with_ring_capacity(path: &Path, capacity: usize) -> Result<Self, CaseError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .await?;
        let (mut ring, delivery) = RingByteBuffer::new(capacity);
        // the parser always has exactly one request outstanding
        ring.require_byte_length(LEN_PREFIX)?;
        Ok(Self {
            ring,
            delivery,
            expect: Expect::Length,
            file: BufWriter::new(file),
            wrote_header: false,
            frames: 0,
        })
    }

    /// Write the case header. Must be the first record and appear once.
    pub async fn write_case(&mut self, header: CaseHeader) -> Result<(), CaseError> {
        debug_assert!(!self.wrote_header, "case header written twice");
        self.write_record(&CaseRecord::Case(header)).await?;
        self.wrote_header = true;
        Ok(())
    }

    /// Write one job record. The header must already be in place.
    pub async fn write_job(&mut self, job: JobRecord) -> Result<(), CaseError> {
        debug_assert!(self.wrote_header, "job record before case header");
        self.write_record(&CaseRecord::Job(job)).await
    }

    async fn write_record(&mut self, record: &CaseRecord) -> Result<(), CaseError> {
        let payload = serde_json::to_vec(record)?;
        let prefix = (payload.len() as u32).to_le_bytes();
        self.feed(&prefix).await?;
        self.feed(&payload).await?;
        self.frames += 1;
        Ok(())
    }

    /// Push bytes into the ring, bounded by its free space, pumping the
    /// parser between writes so the ring drains as it fills.
    async fn feed(&mut self, bytes: &[u8]) -> Result<(), CaseError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            self.pump().await?;
            let free = self.ring.free_byte_length();
            if free == 0 {
                // cannot happen while the parser's request is bounded by
                // capacity; fail loudly instead of spinning
                return Err(CaseError::RingOverflow {
                    requested: rest.len(),
                    free: 0,
                });
            }
            let take = rest.len().min(free);
            let (head, tail) = rest.split_at(take);
            self.ring.write(head)?;
            rest = tail;
        }
        self.pump().await
    }

    /// Drain delivered chunks into the file, alternating a fixed-size length
    /// request with a payload-size request.
    async fn pump(&mut self) -> Result<(), CaseError> {
        while let Ok(chunk) = self.delivery.try_recv() {
            self.file.write_all(&chunk).await?;
            match self.expect {
                Expect::Length => {
                    let len = u32::from_le_bytes(
                        chunk
                            .as_slice()
                            .try_into()
                            .map_err(|_| CaseError::TruncatedFrame { offset: 0 })?,
                    );
                    self.expect = Expect::Payload;
                    self.ring.require_byte_length(len as usize)?;
                }
                Expect::Payload => {
                    self.expect = Expect::Length;
                    self.ring.require_byte_length(LEN_PREFIX)?;
                }
            }
        }
        Ok(())
    }

    /// Drain whatever is left and flush the file. The ring is fully empty
    /// when this returns.
    pub async fn finish(mut self) -> Result<(), CaseError> {
        self.pump().await?;
        debug_assert_eq!(self.ring.byte_length(), 0, "undrained case frames");
        self.file.flush().await?;
        debug!(frames = self.frames, "case log finished");
        Ok(())
    }
}

/// The recording command store: every applied command becomes a job record
/// and a staged preview copy; the real file set is never touched.
pub struct RecordingStore {
    case_id: Uuid,
    staging_root: PathBuf,
    writer: Mutex<CaseWriter>,
}

impl RecordingStore {
    pub fn new(case_id: Uuid, staging_root: impl Into<PathBuf>, writer: CaseWriter) -> Self {
        Self {
            case_id,
            staging_root: staging_root.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Record the case header. Call once, before any command is applied.
    pub async fn record_header(&self, header: CaseHeader) -> Result<(), CaseError> {
        self.writer.lock().await.write_case(header).await
    }

    /// Close the underlying case log.
    pub async fn finish(self) -> Result<(), CaseError> {
        self.writer.into_inner().finish().await
    }

    /// Stage a preview copy of content-bearing commands under the derived
    /// staging path; other command kinds carry nothing to stage.
    async fn stage(&self, command: &FileCommand) -> Result<(), StoreError> {
        let data = match command {
            FileCommand::Create { new_data, .. } | FileCommand::Update { new_data, .. } => new_data,
            _ => return Ok(()),
        };
        let staged = staging_path(&self.staging_root, &self.case_id, command.primary_path());
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&staged, data).await.map_err(|source| StoreError::Io {
            path: staged.clone(),
            source,
        })
    }
}

#[async_trait]
impl CommandStore for RecordingStore {
    async fn apply(&self, command: FileCommand) -> Result<(), StoreError> {
        self.stage(&command).await?;
        let job = JobRecord {
            job_id: Uuid::new_v4(),
            path_content_hash: path_content_hash(&command),
            command,
        };
        debug!(job = %job.job_id, command = %job.command, "recorded");
        self.writer
            .lock()
            .await
            .write_job(job)
            .await
            .map_err(StoreError::from)
    }
}
