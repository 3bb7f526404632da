//! Bump-pointer cursors over serialized command memory.
//!
//! Every reservation is rounded up to [`WIRE_ALIGNMENT`] so that each section
//! of a command starts on an aligned offset. Padding bytes are always zeroed
//! on the write side.
//!
//! The read side never hands out references into the source bytes. The
//! source may be memory the peer can still write to, so each value is copied
//! out exactly once and all validation happens on that copy.

use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::error::{WireError, WireResult};

/// Alignment of every section on the wire.
pub const WIRE_ALIGNMENT: usize = 8;

/// Rounds `size` up to the wire alignment, or `None` on overflow.
pub const fn align_size(size: usize) -> Option<usize> {
    match size.checked_add(WIRE_ALIGNMENT - 1) {
        Some(padded) => Some(padded & !(WIRE_ALIGNMENT - 1)),
        None => None,
    }
}

/// Aligned wire size of one `T`.
pub const fn wire_align_sizeof<T>() -> usize {
    (size_of::<T>() + WIRE_ALIGNMENT - 1) & !(WIRE_ALIGNMENT - 1)
}

/// Aligned wire size of `count` contiguous `T`s.
pub fn wire_align_sizeof_n<T>(count: usize) -> WireResult<usize> {
    count
        .checked_mul(size_of::<T>())
        .and_then(align_size)
        .ok_or(WireError::SizeOverflow)
}

/// A reserved, not yet filled, `T` inside a [`SerializeBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct Slot<T> {
    offset: usize,
    _marker: PhantomData<fn() -> T>,
}

/// `len` contiguous reserved `T`s inside a [`SerializeBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct SlotRange<T> {
    offset: usize,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotRange<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Write cursor over a caller-provided reservation.
#[derive(Debug)]
pub struct SerializeBuffer<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> SerializeBuffer<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes still available for reservations.
    pub fn available_size(&self) -> usize {
        self.data.len() - self.position
    }

    /// Bytes reserved so far.
    pub fn position(&self) -> usize {
        self.position
    }

    fn reserve(&mut self, size: usize) -> WireResult<usize> {
        let aligned = align_size(size).ok_or(WireError::SizeOverflow)?;
        let available = self.available_size();
        if aligned > available {
            return Err(WireError::BufferExhausted {
                requested: aligned,
                available,
            });
        }

        let start = self.position;
        self.data[start + size..start + aligned].fill(0);
        self.position += aligned;
        Ok(start)
    }

    /// Reserves space for one `T`; fill it later with [`Self::fill`].
    pub fn next<T: Pod>(&mut self) -> WireResult<Slot<T>> {
        let offset = self.reserve(size_of::<T>())?;
        Ok(Slot {
            offset,
            _marker: PhantomData,
        })
    }

    /// Reserves space for `count` contiguous `T`s.
    pub fn next_n<T: Pod>(&mut self, count: usize) -> WireResult<SlotRange<T>> {
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or(WireError::SizeOverflow)?;
        let offset = self.reserve(size)?;
        Ok(SlotRange {
            offset,
            len: count,
            _marker: PhantomData,
        })
    }

    /// Writes `value` into a slot previously reserved from this buffer.
    pub fn fill<T: Pod>(&mut self, slot: Slot<T>, value: &T) {
        let end = slot.offset + size_of::<T>();
        self.data[slot.offset..end].copy_from_slice(bytemuck::bytes_of(value));
    }

    /// Writes element `index` of a reserved range.
    pub fn fill_at<T: Pod>(&mut self, slots: SlotRange<T>, index: usize, value: &T) {
        debug_assert!(index < slots.len, "slot index {index} out of {}", slots.len);
        let start = slots.offset + index * size_of::<T>();
        self.data[start..start + size_of::<T>()].copy_from_slice(bytemuck::bytes_of(value));
    }

    /// Reserves and fills one `T`.
    pub fn write<T: Pod>(&mut self, value: &T) -> WireResult<()> {
        let slot = self.next::<T>()?;
        self.fill(slot, value);
        Ok(())
    }

    /// Reserves and fills `values.len()` contiguous `T`s.
    pub fn write_slice<T: Pod>(&mut self, values: &[T]) -> WireResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let start = self.reserve(bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Carves a nested cursor of exactly `size` bytes out of this one.
    pub fn next_buffer(&mut self, size: usize) -> WireResult<SerializeBuffer<'_>> {
        let start = self.reserve(size)?;
        Ok(SerializeBuffer::new(&mut self.data[start..start + size]))
    }
}

/// Read cursor over untrusted command bytes.
#[derive(Debug, Clone)]
pub struct DeserializeBuffer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> DeserializeBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not consumed yet.
    pub fn available_size(&self) -> usize {
        self.data.len() - self.position
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.position
    }

    fn take(&mut self, size: usize) -> WireResult<&'a [u8]> {
        let aligned = align_size(size).ok_or(WireError::SizeOverflow)?;
        let available = self.available_size();
        if aligned > available {
            return Err(WireError::BufferExhausted {
                requested: aligned,
                available,
            });
        }

        let data: &'a [u8] = self.data;
        let start = self.position;
        self.position += aligned;
        Ok(&data[start..start + size])
    }

    /// Consumes one `T` and returns a copy of it.
    pub fn read<T: Pod>(&mut self) -> WireResult<T> {
        let bytes = self.take(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Returns a copy of the next `T` without consuming it.
    pub fn peek<T: Pod>(&self) -> WireResult<T> {
        let size = size_of::<T>();
        let available = self.available_size();
        if size > available {
            return Err(WireError::BufferExhausted {
                requested: size,
                available,
            });
        }
        Ok(bytemuck::pod_read_unaligned(
            &self.data[self.position..self.position + size],
        ))
    }

    /// Consumes `count` contiguous `T`s.
    pub fn read_n<T: Pod>(&mut self, count: usize) -> WireResult<WireSlice<'a, T>> {
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or(WireError::SizeOverflow)?;
        let bytes = self.take(size)?;
        Ok(WireSlice {
            bytes,
            len: count,
            _marker: PhantomData,
        })
    }

    /// Consumes `size` bytes and returns a cursor restricted to them.
    pub fn split(&mut self, size: usize) -> WireResult<DeserializeBuffer<'a>> {
        self.take(size).map(DeserializeBuffer::new)
    }
}

/// Typed view of consumed bytes that only yields copies.
#[derive(Debug, Clone, Copy)]
pub struct WireSlice<'a, T> {
    bytes: &'a [u8],
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Pod> WireSlice<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let size = size_of::<T>();
        let start = index * size;
        Some(bytemuck::pod_read_unaligned(&self.bytes[start..start + size]))
    }

    /// Copies every element into `out`, whose length must equal [`Self::len`].
    pub fn copy_to_slice(&self, out: &mut [T]) {
        bytemuck::cast_slice_mut::<T, u8>(out).copy_from_slice(self.bytes);
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let bytes = self.bytes;
        let size = size_of::<T>();
        (0..self.len).map(move |index| {
            let start = index * size;
            bytemuck::pod_read_unaligned(&bytes[start..start + size])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_eight() {
        assert_eq!(align_size(0), Some(0));
        assert_eq!(align_size(1), Some(8));
        assert_eq!(align_size(8), Some(8));
        assert_eq!(align_size(13), Some(16));
        assert_eq!(align_size(usize::MAX), None);
        assert_eq!(wire_align_sizeof::<u32>(), 8);
        assert_eq!(wire_align_sizeof::<[u64; 3]>(), 24);
    }

    #[test]
    fn wire_align_sizeof_n_rejects_overflow() {
        assert_eq!(wire_align_sizeof_n::<u32>(3), Ok(16));
        assert_eq!(wire_align_sizeof_n::<u64>(0), Ok(0));
        assert_eq!(
            wire_align_sizeof_n::<u64>(usize::MAX / 4),
            Err(WireError::SizeOverflow)
        );
    }

    #[test]
    fn reservations_are_padded_with_zeroes() {
        let mut bytes = [0xAAu8; 16];
        let mut buffer = SerializeBuffer::new(&mut bytes);
        buffer.write(&0x0102_0304u32).unwrap();
        assert_eq!(buffer.position(), 8);
        assert_eq!(buffer.available_size(), 8);
        assert_eq!(&bytes[..8], &[4, 3, 2, 1, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..], &[0xAA; 8]);
    }

    #[test]
    fn slots_are_filled_after_later_reservations() {
        let mut bytes = [0u8; 24];
        let mut buffer = SerializeBuffer::new(&mut bytes);
        let head = buffer.next::<u64>().unwrap();
        let body = buffer.next_n::<u32>(3).unwrap();
        for (index, value) in [7u32, 8, 9].iter().enumerate() {
            buffer.fill_at(body, index, value);
        }
        buffer.fill(head, &42u64);
        assert_eq!(buffer.available_size(), 0);

        let mut reader = DeserializeBuffer::new(&bytes);
        assert_eq!(reader.read::<u64>().unwrap(), 42);
        let values: Vec<u32> = reader.read_n::<u32>(3).unwrap().iter().collect();
        assert_eq!(values, vec![7, 8, 9]);
        assert_eq!(reader.available_size(), 0);
    }

    #[test]
    fn exhausted_write_is_an_error() {
        let mut bytes = [0u8; 8];
        let mut buffer = SerializeBuffer::new(&mut bytes);
        buffer.write(&1u64).unwrap();
        let err = buffer.write(&2u8).unwrap_err();
        assert_eq!(
            err,
            WireError::BufferExhausted {
                requested: 8,
                available: 0
            }
        );
    }

    #[test]
    fn next_n_rejects_overflowing_counts() {
        let mut bytes = [0u8; 8];
        let mut buffer = SerializeBuffer::new(&mut bytes);
        let err = buffer.next_n::<u64>(usize::MAX / 2).unwrap_err();
        assert_eq!(err, WireError::SizeOverflow);
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn peek_does_not_consume() {
        let bytes = 5u64.to_le_bytes();
        let mut reader = DeserializeBuffer::new(&bytes);
        assert_eq!(reader.peek::<u32>().unwrap(), 5);
        assert_eq!(reader.consumed(), 0);
        assert_eq!(reader.read::<u64>().unwrap(), 5);
        assert!(reader.peek::<u32>().is_err());
    }

    #[test]
    fn read_n_checks_capacity_before_returning() {
        let bytes = [0u8; 16];
        let mut reader = DeserializeBuffer::new(&bytes);
        assert!(matches!(
            reader.read_n::<u32>(5),
            Err(WireError::BufferExhausted { .. })
        ));
        assert_eq!(
            reader.read_n::<u64>(usize::MAX).unwrap_err(),
            WireError::SizeOverflow
        );
        assert_eq!(reader.consumed(), 0);
    }

    #[test]
    fn split_restricts_the_nested_cursor() {
        let bytes = [1u8; 24];
        let mut reader = DeserializeBuffer::new(&bytes);
        let mut nested = reader.split(16).unwrap();
        assert_eq!(reader.available_size(), 8);
        nested.read::<u64>().unwrap();
        nested.read::<u64>().unwrap();
        assert!(nested.read::<u8>().is_err());
    }

    #[test]
    fn wire_slice_copies_out() {
        let source: Vec<u8> = (0u8..12).collect();
        let mut padded = source.clone();
        padded.resize(16, 0);
        let mut reader = DeserializeBuffer::new(&padded);
        let slice = reader.read_n::<u8>(12).unwrap();
        assert_eq!(slice.len(), 12);
        assert_eq!(slice.get(11), Some(11));
        assert_eq!(slice.get(12), None);

        let mut out = vec![0u8; 12];
        slice.copy_to_slice(&mut out);
        assert_eq!(out, source);
        assert_eq!(reader.available_size(), 0);
    }
}
