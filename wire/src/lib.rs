//! Wire codec for a remoted GPU command protocol.
//!
//! A client serializes API calls into a flat byte stream of 8-byte aligned
//! commands, and a server in another process deserializes and executes them.
//! Return commands travel the other way with the same framing. Every command
//! goes through two phases: [`WireCommand::required_size`] computes the exact
//! byte count, then [`WireCommand::serialize_command`] fills that reservation.
//!
//! The receiving side treats its input as hostile. Every length is checked
//! against the remaining bytes, every size computation is overflow checked,
//! and every object reference is resolved through the local handle table.
//! Any failure is fatal for the session.

pub mod arena;
pub mod buffer;
pub mod chain;
pub mod codec;
pub mod command;
pub mod error;
pub mod object;
pub mod record;
pub mod schema;
pub mod transport;

pub use arena::{DeserializeAllocator, WireDeserializeAllocator};
pub use buffer::{DeserializeBuffer, SerializeBuffer, WIRE_ALIGNMENT, WireSlice};
pub use chain::{ChainNode, ChainedRecord, SType, UnknownChainedStruct};
pub use codec::{CodecLimits, WireCodec};
pub use command::{CMD_HEADER_SIZE, CmdHeader, CommandKind, WireCommand, peek_command_id};
pub use error::{WireError, WireResult};
pub use object::{
    NoObjects, ObjectHandle, ObjectId, ObjectIdProvider, ObjectIdResolver, WireObject,
};
pub use record::{WidenInto, WireBool, WireRecord};
pub use transport::{CommandSerializer, VecCommandSerializer, serialize_command};

/// Returns the wire crate version string.
pub fn wire_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
