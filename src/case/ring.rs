//! Fixed-capacity ring byte buffer with deferred fixed-size delivery
//!
//! The buffer decouples variable-size writes from fixed-size, on-demand
//! reads: producers copy frames in as they are serialized, consumers ask for
//! exactly the next `n` contiguous bytes. Extractions are handed out through
//! an unbounded channel rather than a callback, so a delivery is observed on
//! a later scheduling tick and can never re-enter the write path
//! synchronously.

use crate::errors::CaseError;
use std::collections::VecDeque;
use tokio::sync::mpsc;

pub struct RingByteBuffer {
    store: Box<[u8]>,
    read_cursor: usize,
    write_cursor: usize,
    fill: usize,
    /// FIFO of registered byte-length requests, front is next to fulfil
    pending: VecDeque<usize>,
    delivery: mpsc::UnboundedSender<Vec<u8>>,
}

impl RingByteBuffer {
    /// Create a buffer of `capacity` bytes plus the receiving half of its
    /// delivery channel. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let (delivery, receiver) = mpsc::unbounded_channel();
        (
            Self {
                store: vec![0; capacity].into_boxed_slice(),
                read_cursor: 0,
                write_cursor: 0,
                fill: 0,
                pending: VecDeque::new(),
                delivery,
            },
            receiver,
        )
    }

    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Bytes currently buffered and not yet extracted.
    pub fn byte_length(&self) -> usize {
        self.fill
    }

    /// Room left for writes. Callers must bound writes by this; `write`
    /// fails fast rather than blocking.
    pub fn free_byte_length(&self) -> usize {
        self.capacity() - self.fill
    }

    /// Copy `data` in, wrapping at capacity. A write that does not fit is
    /// rejected outright and the buffer is left untouched.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaseError> {
        if data.len() > self.free_byte_length() {
            return Err(CaseError::RingOverflow {
                requested: data.len(),
                free: self.free_byte_length(),
            });
        }
        let tail = self.capacity() - self.write_cursor;
        if data.len() <= tail {
            self.store[self.write_cursor..self.write_cursor + data.len()].copy_from_slice(data);
        } else {
            self.store[self.write_cursor..].copy_from_slice(&data[..tail]);
            self.store[..data.len() - tail].copy_from_slice(&data[tail..]);
        }
        self.write_cursor = (self.write_cursor + data.len()) % self.capacity();
        self.fill += data.len();
        self.fulfil();
        Ok(())
    }

    /// Register interest in the next `n` contiguous bytes. Once at least `n`
    /// bytes are buffered, exactly `n` are extracted and sent down the
    /// delivery channel. Requests fulfil strictly in registration order.
    pub fn require_byte_length(&mut self, n: usize) -> Result<(), CaseError> {
        if n > self.capacity() {
            return Err(CaseError::RequestTooLarge {
                requested: n,
                capacity: self.capacity(),
            });
        }
        self.pending.push_back(n);
        self.fulfil();
        Ok(())
    }

    fn fulfil(&mut self) {
        while let Some(&n) = self.pending.front() {
            if n > self.fill {
                break;
            }
            self.pending.pop_front();
            let chunk = self.extract(n);
            // receiver gone: the consumer stopped listening, drop the bytes
            let _ = self.delivery.send(chunk);
        }
    }

    /// Take exactly `n` bytes off the read cursor, handling the wrap seam
    /// as at most two copies.
    fn extract(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        let tail = self.capacity() - self.read_cursor;
        if n <= tail {
            out.copy_from_slice(&self.store[self.read_cursor..self.read_cursor + n]);
        } else {
            out[..tail].copy_from_slice(&self.store[self.read_cursor..]);
            out[tail..].copy_from_slice(&self.store[..n - tail]);
        }
        self.read_cursor = (self.read_cursor + n) % self.capacity();
        self.fill -= n;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_byte_exactness_across_wrap() {
        let (mut ring, mut rx) = RingByteBuffer::new(8);

        // fill 6, extract 6, then a 5-byte write straddles the seam
        ring.write(b"abcdef").unwrap();
        ring.require_byte_length(6).unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"abcdef");

        ring.write(b"ghijk").unwrap();
        ring.require_byte_length(2).unwrap();
        ring.require_byte_length(3).unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"gh");
        assert_eq!(rx.try_recv().unwrap(), b"ijk");
        assert_eq!(ring.byte_length(), 0);
    }

    #[test]
    fn request_waits_until_enough_bytes_arrive() {
        let (mut ring, mut rx) = RingByteBuffer::new(16);
        ring.require_byte_length(4).unwrap();
        ring.write(b"ab").unwrap();
        assert!(rx.try_recv().is_err());
        ring.write(b"cd").unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"abcd");
    }

    #[test]
    fn requests_fulfil_in_registration_order() {
        let (mut ring, mut rx) = RingByteBuffer::new(16);
        ring.require_byte_length(3).unwrap();
        ring.require_byte_length(1).unwrap();
        ring.write(b"wxyz").unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"wxy");
        assert_eq!(rx.try_recv().unwrap(), b"z");
    }

    #[test]
    fn oversized_write_fails_without_mutation() {
        let (mut ring, mut rx) = RingByteBuffer::new(4);
        ring.write(b"ab").unwrap();

        let err = ring.write(b"cde").unwrap_err();
        assert!(matches!(
            err,
            CaseError::RingOverflow {
                requested: 3,
                free: 2
            }
        ));
        assert_eq!(ring.byte_length(), 2);

        // the earlier bytes are intact and extractable
        ring.require_byte_length(2).unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"ab");
    }

    #[test]
    fn request_larger_than_capacity_is_rejected() {
        let (mut ring, _rx) = RingByteBuffer::new(4);
        assert!(matches!(
            ring.require_byte_length(5),
            Err(CaseError::RequestTooLarge { .. })
        ));
    }

    #[test]
    fn interleaved_writes_and_requests_stay_byte_exact() {
        // drive a long stream through a tiny ring; every extraction must
        // equal the earliest not-yet-delivered written bytes
        let (mut ring, mut rx) = RingByteBuffer::new(7);
        let stream: Vec<u8> = (0u16..200).map(|b| (b % 251) as u8).collect();
        let mut written = 0;
        let mut delivered = 0;

        while delivered < stream.len() {
            while written < stream.len() && ring.free_byte_length() > 0 {
                let take = (stream.len() - written).min(ring.free_byte_length()).min(3);
                ring.write(&stream[written..written + take]).unwrap();
                written += take;
            }
            let want = (stream.len() - delivered).min(4);
            ring.require_byte_length(want).unwrap();
            let chunk = rx.try_recv().unwrap();
            assert_eq!(&chunk, &stream[delivered..delivered + want]);
            delivered += want;
        }
        assert_eq!(ring.byte_length(), 0);
    }
}
