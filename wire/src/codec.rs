//! One-command-per-buffer facade over the framing layer.

use serde::{Deserialize, Serialize};

use crate::arena::{DeserializeAllocator, WireDeserializeAllocator};
use crate::buffer::{DeserializeBuffer, SerializeBuffer};
use crate::command::WireCommand;
use crate::error::{WireError, WireResult};
use crate::object::{ObjectIdProvider, ObjectIdResolver};

/// Limits protecting both sides against oversized commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    /// Largest encoded command, header included.
    pub max_command_size: usize,
    /// Arena budget for decoding a single command.
    pub max_allocation_size: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_command_size: 16 * 1024 * 1024,
            max_allocation_size: 64 * 1024 * 1024,
        }
    }
}

/// Encodes and decodes single commands under [`CodecLimits`].
#[derive(Clone, Debug, Default)]
pub struct WireCodec {
    limits: CodecLimits,
}

impl WireCodec {
    #[must_use]
    pub const fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// A fresh arena sized for one decoded command.
    #[must_use]
    pub fn allocator(&self) -> WireDeserializeAllocator {
        WireDeserializeAllocator::new(self.limits.max_allocation_size)
    }

    /// Encodes `command` into a buffer of exactly its required size.
    pub fn encode<C: WireCommand>(
        &self,
        command: &C,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<Vec<u8>> {
        let size = command.required_size()?;
        self.check_size(size)?;

        let mut bytes = vec![0u8; size];
        command.serialize_command(size, &mut SerializeBuffer::new(&mut bytes), provider)?;
        Ok(bytes)
    }

    /// Decodes a buffer holding exactly one command of type `C`.
    pub fn decode<C: WireCommand>(
        &self,
        bytes: &[u8],
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<C> {
        self.check_size(bytes.len())?;

        let mut buffer = DeserializeBuffer::new(bytes);
        let command = C::deserialize_command(&mut buffer, allocator, resolver)?;
        let remaining = buffer.available_size();
        if remaining != 0 {
            return Err(WireError::TrailingBytes { remaining });
        }
        Ok(command)
    }

    fn check_size(&self, actual: usize) -> WireResult<()> {
        if actual > self.limits.max_command_size {
            return Err(WireError::CommandTooLarge {
                limit: self.limits.max_command_size,
                actual,
            });
        }
        Ok(())
    }
}
