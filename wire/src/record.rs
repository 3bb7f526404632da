//! The two-phase record protocol and the field helpers records are built from.
//!
//! A record has a fixed [`WireRecord::Transfer`] layout followed by trailing
//! sections (strings, arrays, nested records, the extension chain) in field
//! declaration order. Sizing, serializing and deserializing must walk the
//! fields in the same order; the helpers here keep each field kind
//! consistent across the three passes.

use bytemuck::{Pod, Zeroable};

use crate::arena::{DeserializeAllocator, alloc_node, alloc_vec, alloc_zeroed};
use crate::buffer::{DeserializeBuffer, SerializeBuffer, wire_align_sizeof, wire_align_sizeof_n};
use crate::error::{WireError, WireResult};
use crate::object::{ObjectId, ObjectIdProvider, ObjectIdResolver, WireObject};

/// A record with a fixed transfer layout and optional trailing sections.
pub trait WireRecord: Sized {
    type Transfer: Pod;

    /// Bytes the trailing sections will occupy. Must match what
    /// [`WireRecord::serialize`] writes after the transfer.
    fn extra_required_size(&self) -> WireResult<usize>;

    /// Fills `transfer` and writes the trailing sections to `buffer`.
    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()>;

    /// Rebuilds the record from its transfer and trailing sections.
    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self>;
}

/// Lossless conversion from a native field to its transfer field.
///
/// Only widening (or same-width) conversions exist, so a transfer field that
/// is narrower than its native field does not compile:
///
/// ```compile_fail
/// use wire::WidenInto;
///
/// let native: u64 = 7;
/// let transfer: u32 = native.widen();
/// ```
///
/// ```
/// use wire::WidenInto;
///
/// let native: u32 = 7;
/// let transfer: u64 = native.widen();
/// assert_eq!(transfer, 7);
/// ```
pub trait WidenInto<T> {
    fn widen(self) -> T;
}

macro_rules! widen {
    ($from:ty => $($to:ty),+) => {
        $(
            impl WidenInto<$to> for $from {
                #[inline]
                fn widen(self) -> $to {
                    <$to>::from(self)
                }
            }
        )+
    };
}

widen!(u8 => u8, u16, u32, u64);
widen!(u16 => u16, u32, u64);
widen!(u32 => u32, u64);
widen!(u64 => u64);
widen!(i32 => i32, i64);
widen!(i64 => i64);
widen!(f32 => f32, f64);
widen!(f64 => f64);

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl WidenInto<u64> for usize {
    #[inline]
    fn widen(self) -> u64 {
        self as u64
    }
}

/// Converts a wire count or length into a native size.
pub fn narrow_len(value: u64) -> WireResult<usize> {
    usize::try_from(value).map_err(|_| WireError::ValueOutOfRange { value })
}

/// Boolean as it travels on the wire. Only 0 and 1 are accepted back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct WireBool(u32);

impl WireBool {
    pub const FALSE: WireBool = WireBool(0);
    pub const TRUE: WireBool = WireBool(1);

    pub fn get(self) -> WireResult<bool> {
        match self.0 {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(WireError::InvalidBool { value }),
        }
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<bool> for WireBool {
    fn from(value: bool) -> Self {
        WireBool(u32::from(value))
    }
}

/// Adds up section sizes, failing on overflow.
pub fn sum_sizes<I>(sizes: I) -> WireResult<usize>
where
    I: IntoIterator<Item = WireResult<usize>>,
{
    sizes.into_iter().try_fold(0usize, |total, size| {
        total.checked_add(size?).ok_or(WireError::SizeOverflow)
    })
}

// ---------------------------------------------------------------- records

/// Transfer plus trailing sections of `record`.
pub fn required_size<R: WireRecord>(record: &R) -> WireResult<usize> {
    wire_align_sizeof::<R::Transfer>()
        .checked_add(record.extra_required_size()?)
        .ok_or(WireError::SizeOverflow)
}

/// Reserves the transfer of `record`, writes its trailing sections, then
/// fills the transfer.
pub fn serialize_record<R: WireRecord>(
    record: &R,
    buffer: &mut SerializeBuffer<'_>,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()> {
    let slot = buffer.next::<R::Transfer>()?;
    let mut transfer = R::Transfer::zeroed();
    record.serialize(&mut transfer, buffer, provider)?;
    buffer.fill(slot, &transfer);
    Ok(())
}

pub fn deserialize_record<R: WireRecord>(
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
    resolver: &dyn ObjectIdResolver,
) -> WireResult<R> {
    let transfer = buffer.read::<R::Transfer>()?;
    R::deserialize(&transfer, buffer, allocator, resolver)
}

pub fn optional_record_extra_size<R: WireRecord>(record: Option<&R>) -> WireResult<usize> {
    record.map_or(Ok(0), required_size)
}

pub fn serialize_optional_record<R: WireRecord>(
    record: Option<&R>,
    buffer: &mut SerializeBuffer<'_>,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()> {
    match record {
        Some(record) => serialize_record(record, buffer, provider),
        None => Ok(()),
    }
}

pub fn deserialize_optional_record<R: WireRecord>(
    present: WireBool,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
    resolver: &dyn ObjectIdResolver,
) -> WireResult<Option<R>> {
    if !present.get()? {
        return Ok(None);
    }
    alloc_node::<R>(allocator)?;
    deserialize_record(buffer, allocator, resolver).map(Some)
}

/// Contiguous transfers of `records` followed by each element's extras.
pub fn records_extra_size<R: WireRecord>(records: &[R]) -> WireResult<usize> {
    let transfers = wire_align_sizeof_n::<R::Transfer>(records.len())?;
    records.iter().try_fold(transfers, |total, record| {
        total
            .checked_add(record.extra_required_size()?)
            .ok_or(WireError::SizeOverflow)
    })
}

pub fn serialize_records<R: WireRecord>(
    records: &[R],
    buffer: &mut SerializeBuffer<'_>,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()> {
    let slots = buffer.next_n::<R::Transfer>(records.len())?;
    for (index, record) in records.iter().enumerate() {
        let mut transfer = R::Transfer::zeroed();
        record.serialize(&mut transfer, buffer, provider)?;
        buffer.fill_at(slots, index, &transfer);
    }
    Ok(())
}

pub fn deserialize_records<R: WireRecord>(
    count: u64,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
    resolver: &dyn ObjectIdResolver,
) -> WireResult<Vec<R>> {
    let count = narrow_len(count)?;
    let transfers = buffer.read_n::<R::Transfer>(count)?;
    let mut records = alloc_vec::<R>(allocator, count)?;
    for transfer in transfers.iter() {
        records.push(R::deserialize(&transfer, buffer, allocator, resolver)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------- strings

pub fn string_extra_size(value: &str) -> WireResult<usize> {
    wire_align_sizeof_n::<u8>(value.len())
}

pub fn optional_string_extra_size(value: Option<&str>) -> WireResult<usize> {
    value.map_or(Ok(0), string_extra_size)
}

pub fn serialize_string(value: &str, buffer: &mut SerializeBuffer<'_>) -> WireResult<()> {
    buffer.write_slice(value.as_bytes())
}

pub fn serialize_optional_string(
    value: Option<&str>,
    buffer: &mut SerializeBuffer<'_>,
) -> WireResult<()> {
    match value {
        Some(value) => serialize_string(value, buffer),
        None => Ok(()),
    }
}

pub fn deserialize_string(
    strlen: u64,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
) -> WireResult<String> {
    let bytes = deserialize_slice::<u8>(strlen, buffer, allocator)?;
    String::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
}

pub fn deserialize_optional_string(
    present: WireBool,
    strlen: u64,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
) -> WireResult<Option<String>> {
    if !present.get()? {
        return Ok(None);
    }
    deserialize_string(strlen, buffer, allocator).map(Some)
}

/// Length and presence flag of an optional string, as stored in a transfer.
pub fn optional_string_header(value: Option<&str>) -> (u64, WireBool) {
    match value {
        Some(value) => (value.len().widen(), WireBool::TRUE),
        None => (0, WireBool::FALSE),
    }
}

// ---------------------------------------------------------------- arrays

pub fn slice_extra_size<T: Pod>(values: &[T]) -> WireResult<usize> {
    wire_align_sizeof_n::<T>(values.len())
}

pub fn serialize_slice<T: Pod>(values: &[T], buffer: &mut SerializeBuffer<'_>) -> WireResult<()> {
    buffer.write_slice(values)
}

/// Reads `count` elements, checking the source holds them before claiming
/// any arena space.
pub fn deserialize_slice<T: Pod>(
    count: u64,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
) -> WireResult<Vec<T>> {
    let count = narrow_len(count)?;
    let source = buffer.read_n::<T>(count)?;
    let mut values = alloc_zeroed::<T>(allocator, count)?;
    source.copy_to_slice(&mut values);
    Ok(values)
}

pub fn object_array_extra_size<T: WireObject>(objects: &[T]) -> WireResult<usize> {
    wire_align_sizeof_n::<ObjectId>(objects.len())
}

pub fn serialize_object_array<T: WireObject>(
    objects: &[T],
    buffer: &mut SerializeBuffer<'_>,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()> {
    let slots = buffer.next_n::<ObjectId>(objects.len())?;
    for (index, object) in objects.iter().enumerate() {
        let id = provider.get_id(*object)?;
        buffer.fill_at(slots, index, &id);
    }
    Ok(())
}

pub fn deserialize_object_array<T: WireObject>(
    count: u64,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
    resolver: &dyn ObjectIdResolver,
) -> WireResult<Vec<T>> {
    let count = narrow_len(count)?;
    let ids = buffer.read_n::<ObjectId>(count)?;
    let mut objects = alloc_vec::<T>(allocator, count)?;
    for id in ids.iter() {
        objects.push(resolver.get_from_id(id)?);
    }
    Ok(objects)
}
