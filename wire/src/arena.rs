//! Scratch budget for data reconstructed during deserialization.
//!
//! Native records own their variable-length content (`Vec`, `String`), so the
//! arena does not hand out memory itself. It accounts for every region the
//! deserializer is about to materialize and refuses once its capacity is
//! spent, which bounds how much a single command can make the receiver
//! allocate no matter what counts the peer declares.

use std::mem::size_of;

use bytemuck::Pod;

use crate::error::{WireError, WireResult};

/// Supplier of space for reconstructed variable-length content.
pub trait DeserializeAllocator {
    /// Claims `size` bytes. Returns `false` when the arena is exhausted.
    fn get_space(&mut self, size: usize) -> bool;
}

/// Capacity-bounded arena, reset between commands.
#[derive(Debug, Clone)]
pub struct WireDeserializeAllocator {
    capacity: usize,
    used: usize,
    peak: usize,
}

impl WireDeserializeAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            peak: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes claimed since the last reset.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Largest `used()` observed over the arena's lifetime.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Releases everything claimed by the previous command.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl DeserializeAllocator for WireDeserializeAllocator {
    fn get_space(&mut self, size: usize) -> bool {
        match self.used.checked_add(size) {
            Some(total) if total <= self.capacity => {
                self.used = total;
                self.peak = self.peak.max(total);
                true
            }
            _ => false,
        }
    }
}

fn claim(allocator: &mut dyn DeserializeAllocator, size: usize) -> WireResult<()> {
    if allocator.get_space(size) {
        Ok(())
    } else {
        Err(WireError::AllocationFailed { requested: size })
    }
}

/// Claims room for `count` native `T`s and returns an empty vector with that
/// capacity.
pub fn alloc_vec<T>(allocator: &mut dyn DeserializeAllocator, count: usize) -> WireResult<Vec<T>> {
    let size = count
        .checked_mul(size_of::<T>())
        .ok_or(WireError::SizeOverflow)?;
    claim(allocator, size)?;

    let mut values = Vec::new();
    values
        .try_reserve_exact(count)
        .map_err(|_| WireError::AllocationFailed { requested: size })?;
    Ok(values)
}

/// Claims room for `count` `T`s and returns them zero-initialized.
pub fn alloc_zeroed<T: Pod>(
    allocator: &mut dyn DeserializeAllocator,
    count: usize,
) -> WireResult<Vec<T>> {
    let mut values = alloc_vec(allocator, count)?;
    values.resize(count, T::zeroed());
    Ok(values)
}

/// Claims room for one native `T` that will be built by the caller.
pub fn alloc_node<T>(allocator: &mut dyn DeserializeAllocator) -> WireResult<()> {
    claim(allocator, size_of::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_accumulate_until_capacity() {
        let mut arena = WireDeserializeAllocator::new(32);
        assert!(arena.get_space(16));
        assert!(arena.get_space(16));
        assert!(!arena.get_space(1));
        assert_eq!(arena.used(), 32);

        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.peak(), 32);
        assert!(arena.get_space(8));
    }

    #[test]
    fn overflowing_claim_is_refused() {
        let mut arena = WireDeserializeAllocator::new(usize::MAX);
        assert!(arena.get_space(8));
        assert!(!arena.get_space(usize::MAX));
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn alloc_zeroed_returns_zeroes() {
        let mut arena = WireDeserializeAllocator::new(64);
        let values: Vec<u32> = alloc_zeroed(&mut arena, 4).unwrap();
        assert_eq!(values, vec![0; 4]);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn alloc_vec_reports_exhaustion() {
        let mut arena = WireDeserializeAllocator::new(15);
        let err = alloc_vec::<u64>(&mut arena, 2).unwrap_err();
        assert_eq!(err, WireError::AllocationFailed { requested: 16 });
    }

    #[test]
    fn alloc_vec_rejects_overflowing_counts() {
        let mut arena = WireDeserializeAllocator::new(usize::MAX);
        let err = alloc_vec::<u64>(&mut arena, usize::MAX).unwrap_err();
        assert_eq!(err, WireError::SizeOverflow);
        assert_eq!(arena.used(), 0);
    }
}
