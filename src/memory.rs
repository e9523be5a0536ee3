//! Bounded memory accounting for transient buffers
//!
//! Parse buffers are sized against the largest contiguous block the host can
//! still hand out. `ValueAllocator` is the injectable strategy; a reservation
//! returns its bytes to the allocator when dropped.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Allocation strategy used to size and account transient buffers
pub trait ValueAllocator: Send + Sync + std::fmt::Debug {
    /// Largest block that a single `allocate` call could currently satisfy
    fn max_free_block(&self) -> usize;

    /// Reserve `size` bytes
    fn allocate(&self, size: usize) -> Result<()>;

    /// Return `size` bytes previously reserved with `allocate`
    fn deallocate(&self, size: usize);
}

/// Reserve `size` bytes and hold them until the returned guard is dropped
pub fn reserve(allocator: &Arc<dyn ValueAllocator>, size: usize) -> Result<Reservation> {
    allocator.allocate(size)?;
    Ok(Reservation {
        allocator: Arc::clone(allocator),
        size,
    })
}

/// RAII guard for bytes reserved from a [`ValueAllocator`]
#[derive(Debug)]
pub struct Reservation {
    allocator: Arc<dyn ValueAllocator>,
    size: usize,
}

impl Reservation {
    /// Number of bytes held
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.allocator.deallocate(self.size);
    }
}

// ============================================================================
// System Allocator
// ============================================================================

/// Unconstrained allocator for hosts with ordinary heap memory
///
/// Reports a fixed free-block size so that buffer sizing is driven by the
/// configured maximum and the response length.
#[derive(Debug, Clone)]
pub struct SystemAllocator {
    free_block: usize,
}

impl SystemAllocator {
    /// Create an allocator that reports `usize::MAX` free bytes
    pub fn new() -> Self {
        Self {
            free_block: usize::MAX,
        }
    }

    /// Create an allocator that reports a fixed free-block size
    pub fn with_free_block(free_block: usize) -> Self {
        Self { free_block }
    }
}

impl Default for SystemAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueAllocator for SystemAllocator {
    fn max_free_block(&self) -> usize {
        self.free_block
    }

    fn allocate(&self, _size: usize) -> Result<()> {
        Ok(())
    }

    fn deallocate(&self, _size: usize) {}
}

// ============================================================================
// Bounded Arena
// ============================================================================

/// Fixed-capacity pool that tracks outstanding reservations
#[derive(Debug)]
pub struct BoundedArena {
    capacity: usize,
    used: AtomicUsize,
}

impl BoundedArena {
    /// Create an arena with `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently reserved
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}

impl ValueAllocator for BoundedArena {
    fn max_free_block(&self) -> usize {
        self.capacity.saturating_sub(self.used())
    }

    fn allocate(&self, size: usize) -> Result<()> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(size)?;
                (next <= self.capacity).then_some(next)
            })
            .map(|_| ())
            .map_err(|used| Error::Allocation {
                requested: size,
                available: self.capacity.saturating_sub(used),
            })
    }

    fn deallocate(&self, size: usize) {
        // Saturate so a mismatched release cannot wrap the counter.
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(size))
            });
    }
}
