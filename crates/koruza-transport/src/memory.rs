use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory duplex byte channel.
///
/// Bytes written on one end are read on the other. Useful for tests and for
/// loopback diagnostics without hardware.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Queue,
    outbound: Queue,
    closed: Arc<AtomicBool>,
    chunk_size: usize,
    fail_writes: bool,
}

impl MemoryTransport {
    /// Create a connected pair of transports.
    pub fn pair() -> (Self, Self) {
        let a: Queue = Arc::default();
        let b: Queue = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));

        let left = Self {
            inbound: Arc::clone(&a),
            outbound: Arc::clone(&b),
            closed: Arc::clone(&closed),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fail_writes: false,
        };
        let right = Self {
            inbound: b,
            outbound: a,
            closed,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fail_writes: false,
        };
        (left, right)
    }

    /// Limit how many bytes a single `read` returns.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Make subsequent writes on this end fail with an I/O error.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Close both ends of the channel.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        lock(&self.inbound).len()
    }
}

impl SerialTransport for MemoryTransport {
    fn read(&mut self) -> Result<Option<Bytes>> {
        let mut queue = lock(&self.inbound);
        if queue.is_empty() {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            return Ok(None);
        }

        let n = queue.len().min(self.chunk_size);
        let chunk: Vec<u8> = queue.drain(..n).collect();
        Ok(Some(Bytes::from(chunk)))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }

        lock(&self.outbound).extend(data.iter().copied());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn lock(queue: &Queue) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
    // A poisoned queue still holds valid bytes.
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_flow_both_ways() {
        let (mut left, mut right) = MemoryTransport::pair();

        left.write(b"ping").unwrap();
        right.write(b"pong").unwrap();

        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"ping");
        assert_eq!(left.read().unwrap().unwrap().as_ref(), b"pong");
    }

    #[test]
    fn empty_read_would_block() {
        let (mut left, _right) = MemoryTransport::pair();
        assert!(left.read().unwrap().is_none());
    }

    #[test]
    fn chunk_size_limits_reads() {
        let (mut left, right) = MemoryTransport::pair();
        let mut right = right.with_chunk_size(1);

        left.write(b"abc").unwrap();
        assert_eq!(right.pending(), 3);
        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"a");
        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"b");
        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"c");
        assert!(right.read().unwrap().is_none());
    }

    #[test]
    fn closed_channel_drains_then_errors() {
        let (mut left, mut right) = MemoryTransport::pair();
        left.write(b"last").unwrap();
        left.close();

        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"last");
        assert!(matches!(right.read(), Err(TransportError::Closed)));
        assert!(matches!(right.write(b"x"), Err(TransportError::Closed)));
    }

    #[test]
    fn simulated_write_failure() {
        let (mut left, mut right) = MemoryTransport::pair();
        left.set_fail_writes(true);

        assert!(matches!(left.write(b"x"), Err(TransportError::Io(_))));
        assert!(right.read().unwrap().is_none());
    }
}
