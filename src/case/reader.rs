//! Streaming case log reader
//!
//! Parses the length-prefixed frame stream back into records without ever
//! holding more than one frame in memory. This is what a replay tool builds
//! on; the crate itself uses it for `case show` and round-trip tests.

use super::{CaseHeader, CaseRecord, JobRecord};
use crate::errors::CaseError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

const LEN_PREFIX: usize = 4;

pub struct CaseReader {
    file: BufReader<File>,
    offset: u64,
}

impl CaseReader {
    pub async fn open(path: &Path) -> Result<Self, CaseError> {
        let file = File::open(path).await?;
        Ok(Self {
            file: BufReader::new(file),
            offset: 0,
        })
    }

    /// Read frame 0. Fails if the log does not start with a case header.
    pub async fn read_header(&mut self) -> Result<CaseHeader, CaseError> {
        match self.next_record().await? {
            Some(CaseRecord::Case(header)) => Ok(header),
            _ => Err(CaseError::MissingHeader),
        }
    }

    /// Next job record, or `None` at a clean end of stream.
    pub async fn next_job(&mut self) -> Result<Option<JobRecord>, CaseError> {
        match self.next_record().await? {
            Some(CaseRecord::Job(job)) => Ok(Some(job)),
            Some(CaseRecord::Case(_)) => Err(CaseError::MissingHeader),
            None => Ok(None),
        }
    }

    async fn next_record(&mut self) -> Result<Option<CaseRecord>, CaseError> {
        let Some(len) = self.read_prefix().await? else {
            return Ok(None);
        };
        let mut payload = vec![0u8; len as usize];
        self.file.read_exact(&mut payload).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                CaseError::TruncatedFrame { offset: self.offset }
            } else {
                CaseError::Io(err)
            }
        })?;
        self.offset += len as u64;
        Ok(Some(serde_json::from_slice(&payload)?))
    }

    /// Length prefix of the next frame; `None` only at a frame boundary.
    async fn read_prefix(&mut self) -> Result<Option<u32>, CaseError> {
        let mut buf = [0u8; LEN_PREFIX];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(CaseError::TruncatedFrame { offset: self.offset });
            }
            filled += n;
        }
        self.offset += LEN_PREFIX as u64;
        Ok(Some(u32::from_le_bytes(buf)))
    }
}

/// Convenience for small logs: the header plus every job record.
pub async fn read_all(path: &Path) -> Result<(CaseHeader, Vec<JobRecord>), CaseError> {
    let mut reader = CaseReader::open(path).await?;
    let header = reader.read_header().await?;
    let mut jobs = Vec::new();
    while let Some(job) = reader.next_job().await? {
        jobs.push(job);
    }
    Ok((header, jobs))
}
