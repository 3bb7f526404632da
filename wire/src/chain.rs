//! Chained extension structs.
//!
//! An extensible record may carry a chain of extension nodes. On the wire
//! every node starts with a [`ChainedStructTransfer`] header, followed by the
//! node's own transfer and trailing sections. The set of known node types is
//! declared once with [`chained_structs!`], which generates the enum the
//! chain is made of and the tag dispatch for all three passes.
//!
//! A node whose tag the receiver does not know becomes
//! [`UnknownChainedStruct`]: only its header is consumed and a warning is
//! logged. Such a node must not carry a body, since the receiver cannot know
//! how long it is.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::arena::{DeserializeAllocator, alloc_node};
use crate::buffer::{DeserializeBuffer, SerializeBuffer, wire_align_sizeof};
use crate::error::{WireError, WireResult};
use crate::object::{ObjectIdProvider, ObjectIdResolver};
use crate::record::{WireBool, WireRecord};

/// Type tag of a chained struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct SType(pub u32);

/// Header at offset zero of every chain node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ChainedStructTransfer {
    pub s_type: SType,
    pub has_next: WireBool,
}

/// A record that can appear in an extension chain.
pub trait ChainedRecord: WireRecord {
    const S_TYPE: SType;
}

/// Placeholder for a node whose tag is not registered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownChainedStruct {
    pub s_type: SType,
}

/// One entry of an extension chain. Implemented by [`chained_structs!`].
pub trait ChainNode: Sized {
    fn s_type(&self) -> SType;

    /// Transfer plus trailing sections of the node body, header excluded.
    fn body_required_size(&self) -> WireResult<usize>;

    fn serialize_body(
        &self,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()>;

    /// Deserializes the body of a node tagged `s_type`, or returns `None`
    /// when the tag is not registered.
    fn deserialize_body(
        s_type: SType,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Option<Self>>;

    fn unknown(s_type: SType) -> Self;
}

/// Bytes the whole chain occupies after its owner's other sections.
pub fn chain_extra_size<N: ChainNode>(chain: &[N]) -> WireResult<usize> {
    chain.iter().try_fold(0usize, |total, node| {
        let node_size = wire_align_sizeof::<ChainedStructTransfer>()
            .checked_add(node.body_required_size()?)
            .ok_or(WireError::SizeOverflow)?;
        total.checked_add(node_size).ok_or(WireError::SizeOverflow)
    })
}

/// Writes every node of `chain`, linking them through the header flags.
pub fn serialize_chain<N: ChainNode>(
    chain: &[N],
    buffer: &mut SerializeBuffer<'_>,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()> {
    for (index, node) in chain.iter().enumerate() {
        buffer.write(&ChainedStructTransfer {
            s_type: node.s_type(),
            has_next: WireBool::from(index + 1 < chain.len()),
        })?;
        node.serialize_body(buffer, provider)?;
    }
    Ok(())
}

/// Reads a chain if `present` says the owner has one.
pub fn deserialize_chain<N: ChainNode>(
    present: WireBool,
    buffer: &mut DeserializeBuffer<'_>,
    allocator: &mut dyn DeserializeAllocator,
    resolver: &dyn ObjectIdResolver,
) -> WireResult<Vec<N>> {
    let mut chain = Vec::new();
    if !present.get()? {
        return Ok(chain);
    }

    loop {
        let header = buffer.read::<ChainedStructTransfer>()?;
        let has_next = header.has_next.get()?;

        alloc_node::<N>(allocator)?;
        let node = match N::deserialize_body(header.s_type, buffer, allocator, resolver)? {
            Some(node) => node,
            None => {
                log::warn!(
                    "skipping unrecognized chained struct with s_type {:#x}",
                    header.s_type.0
                );
                N::unknown(header.s_type)
            }
        };

        chain
            .try_reserve(1)
            .map_err(|_| WireError::AllocationFailed {
                requested: size_of::<N>(),
            })?;
        chain.push(node);

        if !has_next {
            return Ok(chain);
        }
    }
}

/// Declares the node types an extension chain can hold.
///
/// Generates an enum with one variant per node type plus `Unknown`, its
/// [`ChainNode`] impl and a `From` impl per node type.
macro_rules! chained_structs {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident($record:ty)),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $($variant($record),)*
            Unknown($crate::chain::UnknownChainedStruct),
        }

        impl $crate::chain::ChainNode for $name {
            fn s_type(&self) -> $crate::chain::SType {
                match self {
                    $(Self::$variant(_) => <$record as $crate::chain::ChainedRecord>::S_TYPE,)*
                    Self::Unknown(unknown) => unknown.s_type,
                }
            }

            fn body_required_size(&self) -> $crate::WireResult<usize> {
                match self {
                    $(Self::$variant(record) => $crate::record::required_size(record),)*
                    Self::Unknown(_) => Ok(0),
                }
            }

            fn serialize_body(
                &self,
                buffer: &mut $crate::buffer::SerializeBuffer<'_>,
                provider: &dyn $crate::object::ObjectIdProvider,
            ) -> $crate::WireResult<()> {
                match self {
                    $(Self::$variant(record) => {
                        $crate::record::serialize_record(record, buffer, provider)
                    })*
                    Self::Unknown(_) => Ok(()),
                }
            }

            fn deserialize_body(
                s_type: $crate::chain::SType,
                buffer: &mut $crate::buffer::DeserializeBuffer<'_>,
                allocator: &mut dyn $crate::arena::DeserializeAllocator,
                resolver: &dyn $crate::object::ObjectIdResolver,
            ) -> $crate::WireResult<Option<Self>> {
                $(
                    if s_type == <$record as $crate::chain::ChainedRecord>::S_TYPE {
                        return $crate::record::deserialize_record::<$record>(
                            buffer, allocator, resolver,
                        )
                        .map(|record| Some(Self::$variant(record)));
                    }
                )*
                Ok(None)
            }

            fn unknown(s_type: $crate::chain::SType) -> Self {
                Self::Unknown($crate::chain::UnknownChainedStruct { s_type })
            }
        }

        $(
            impl From<$record> for $name {
                fn from(record: $record) -> Self {
                    Self::$variant(record)
                }
            }
        )*
    };
}

pub(crate) use chained_structs;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_one_aligned_word() {
        assert_eq!(size_of::<ChainedStructTransfer>(), 8);
        assert_eq!(wire_align_sizeof::<ChainedStructTransfer>(), 8);
    }
}
