//! Byte sink that commands are serialized into.

use std::mem;

use crate::buffer::SerializeBuffer;
use crate::command::WireCommand;
use crate::error::{WireError, WireResult};
use crate::object::ObjectIdProvider;

/// Destination of a command stream.
pub trait CommandSerializer {
    /// Largest single reservation [`CommandSerializer::get_cmd_space`] accepts.
    fn maximum_allocation_size(&self) -> usize;

    /// Reserves `size` zeroed bytes at the end of the stream.
    fn get_cmd_space(&mut self, size: usize) -> WireResult<&mut [u8]>;

    /// Hands everything reserved so far to the transport.
    fn flush(&mut self) -> WireResult<()>;
}

/// Runs the two-phase protocol for `command` against `serializer`.
///
/// A failure leaves the stream in an unspecified state; the session that
/// owns it must stop.
pub fn serialize_command<C, S>(
    serializer: &mut S,
    command: &C,
    provider: &dyn ObjectIdProvider,
) -> WireResult<()>
where
    C: WireCommand,
    S: CommandSerializer + ?Sized,
{
    let size = command.required_size()?;
    let limit = serializer.maximum_allocation_size();
    if size > limit {
        return Err(WireError::CommandTooLarge {
            limit,
            actual: size,
        });
    }
    let space = serializer.get_cmd_space(size)?;
    command.serialize_command(size, &mut SerializeBuffer::new(space), provider)
}

/// Keeps the stream in memory until [`VecCommandSerializer::take`] is called.
#[derive(Debug, Clone)]
pub struct VecCommandSerializer {
    bytes: Vec<u8>,
    max_allocation_size: usize,
    flushes: usize,
}

impl VecCommandSerializer {
    pub fn new(max_allocation_size: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max_allocation_size,
            flushes: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of times [`CommandSerializer::flush`] was called.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Removes and returns the accumulated stream.
    pub fn take(&mut self) -> Vec<u8> {
        mem::take(&mut self.bytes)
    }
}

impl CommandSerializer for VecCommandSerializer {
    fn maximum_allocation_size(&self) -> usize {
        self.max_allocation_size
    }

    fn get_cmd_space(&mut self, size: usize) -> WireResult<&mut [u8]> {
        if size > self.max_allocation_size {
            return Err(WireError::CommandTooLarge {
                limit: self.max_allocation_size,
                actual: size,
            });
        }
        let start = self.bytes.len();
        let end = start.checked_add(size).ok_or(WireError::SizeOverflow)?;
        self.bytes.resize(end, 0);
        Ok(&mut self.bytes[start..])
    }

    fn flush(&mut self) -> WireResult<()> {
        self.flushes += 1;
        Ok(())
    }
}
