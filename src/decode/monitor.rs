//! Byte-counting reader with a hard read budget

use crate::liveness::Liveness;
use std::io::{self, Read};

/// Wraps a body reader, counting bytes and feeding liveness on every read
///
/// Once `limit` bytes have been handed out, any further data makes the read
/// fail with [`io::ErrorKind::OutOfMemory`] and marks the monitor exhausted.
pub struct MonitoredReader<'a, R> {
    inner: R,
    liveness: &'a dyn Liveness,
    limit: usize,
    bytes_read: usize,
    exhausted: bool,
}

impl<'a, R: Read> MonitoredReader<'a, R> {
    /// Create a monitor allowing at most `limit` bytes
    pub fn new(inner: R, limit: usize, liveness: &'a dyn Liveness) -> Self {
        Self {
            inner,
            liveness,
            limit,
            bytes_read: 0,
            exhausted: false,
        }
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// True once the body turned out larger than the budget
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Read budget in bytes
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<R: Read> Read for MonitoredReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.liveness.feed();
        if buf.is_empty() {
            return Ok(0);
        }

        let remaining = self.limit - self.bytes_read;
        if remaining == 0 {
            let mut probe = [0u8; 1];
            return match self.inner.read(&mut probe)? {
                0 => Ok(0),
                _ => {
                    self.exhausted = true;
                    Err(io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        format!("parse buffer of {} bytes exhausted", self.limit),
                    ))
                }
            };
        }

        let window = buf.len().min(remaining);
        let n = self.inner.read(&mut buf[..window])?;
        self.bytes_read += n;
        Ok(n)
    }
}

impl<R> std::fmt::Debug for MonitoredReader<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredReader")
            .field("limit", &self.limit)
            .field("bytes_read", &self.bytes_read)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
