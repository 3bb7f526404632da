//! Command framing.
//!
//! Frame format:
//! - bytes 0..8: total command size including this header (LE u64)
//! - bytes 8..12: command discriminant (LE u32)
//! - bytes 12..16: zero padding
//! - remaining bytes: the command record (transfer, then trailing sections)

use std::fmt;
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::arena::DeserializeAllocator;
use crate::buffer::{DeserializeBuffer, SerializeBuffer, WIRE_ALIGNMENT};
use crate::error::{WireError, WireResult};
use crate::object::{NoObjects, ObjectIdProvider, ObjectIdResolver};
use crate::record::{WidenInto, WireRecord, deserialize_record, required_size, serialize_record};

/// Header at the start of every command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct CmdHeader {
    pub command_size: u64,
    pub command_id: u32,
    pub padding: u32,
}

/// Number of bytes in the command header.
pub const CMD_HEADER_SIZE: usize = size_of::<CmdHeader>();

/// A discriminant namespace (client-to-server or server-to-client).
pub trait CommandKind: Copy + fmt::Debug + PartialEq + 'static {
    fn to_wire(self) -> u32;

    fn from_wire(value: u32) -> Option<Self>;
}

/// Reads the discriminant of the next command without consuming anything.
pub fn peek_command_id(buffer: &DeserializeBuffer<'_>) -> WireResult<u32> {
    buffer.peek::<CmdHeader>().map(|header| header.command_id)
}

/// A top-level record framed with a [`CmdHeader`].
pub trait WireCommand: WireRecord {
    type Kind: CommandKind;

    const KIND: Self::Kind;

    /// Header plus record: the exact reservation `serialize_command` needs.
    fn required_size(&self) -> WireResult<usize> {
        required_size(self)?
            .checked_add(CMD_HEADER_SIZE)
            .ok_or(WireError::SizeOverflow)
    }

    /// Serializes into the next `command_size` bytes of `buffer`, which must
    /// be the value returned by [`WireCommand::required_size`].
    fn serialize_command(
        &self,
        command_size: usize,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        let mut command = buffer.next_buffer(command_size)?;
        command.write(&CmdHeader {
            command_size: command_size.widen(),
            command_id: Self::KIND.to_wire(),
            padding: 0,
        })?;
        serialize_record(self, &mut command, provider)?;

        let remaining = command.available_size();
        if remaining != 0 {
            return Err(WireError::SizeMismatch {
                reserved: command_size,
                written: command_size - remaining,
            });
        }
        Ok(())
    }

    /// Deserializes one command, which must be of this type and must fill
    /// its declared size exactly.
    fn deserialize_command(
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let header = buffer.read::<CmdHeader>()?;
        let expected = Self::KIND.to_wire();
        if header.command_id != expected {
            return Err(WireError::CommandMismatch {
                expected,
                actual: header.command_id,
            });
        }

        let available = buffer.available_size();
        let invalid_size = || WireError::InvalidCommandSize {
            declared: header.command_size,
            available,
        };
        let declared = usize::try_from(header.command_size).map_err(|_| invalid_size())?;
        if declared % WIRE_ALIGNMENT != 0 {
            return Err(invalid_size());
        }
        let body_size = declared
            .checked_sub(CMD_HEADER_SIZE)
            .filter(|body| *body <= available)
            .ok_or_else(invalid_size)?;

        let mut body = buffer.split(body_size)?;
        let command = deserialize_record::<Self>(&mut body, allocator, resolver)?;
        let remaining = body.available_size();
        if remaining != 0 {
            return Err(WireError::TrailingBytes { remaining });
        }
        Ok(command)
    }

    /// Serializes a command that carries no object references.
    fn serialize_without_objects(
        &self,
        command_size: usize,
        buffer: &mut SerializeBuffer<'_>,
    ) -> WireResult<()> {
        self.serialize_command(command_size, buffer, &NoObjects)
    }

    /// Deserializes a command that carries no object references.
    fn deserialize_without_objects(
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
    ) -> WireResult<Self> {
        Self::deserialize_command(buffer, allocator, &NoObjects)
    }
}
