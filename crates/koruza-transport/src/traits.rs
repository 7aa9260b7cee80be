use bytes::Bytes;

use crate::error::Result;

/// A raw byte channel to one logical peer.
///
/// Reads never block: a transport with nothing buffered returns `Ok(None)`
/// and the caller re-checks on the next loop iteration. Writes are expected
/// to complete within a bounded time (serial devices are opened with a short
/// timeout).
pub trait SerialTransport {
    /// Read whatever bytes are currently available.
    ///
    /// Returns `Ok(None)` when the read would block.
    fn read(&mut self) -> Result<Option<Bytes>>;

    /// Write all of `data` to the transport.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Name used in diagnostics (device path or a fixed label).
    fn name(&self) -> &str;
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn read(&mut self) -> Result<Option<Bytes>> {
        (**self).read()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    #[test]
    fn boxed_transport_delegates() {
        let (left, mut right) = MemoryTransport::pair();
        let mut boxed: Box<dyn SerialTransport> = Box::new(left);

        boxed.write(b"abc").unwrap();
        assert_eq!(right.read().unwrap().unwrap().as_ref(), b"abc");
        assert_eq!(boxed.name(), "memory");
        assert!(boxed.read().unwrap().is_none());
    }
}
