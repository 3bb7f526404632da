//! The GPU command schema built on top of the codec engine.
//!
//! Each record here is a thin [`WireRecord`](crate::WireRecord) impl that
//! walks its fields through the helpers in [`crate::record`] and
//! [`crate::chain`].

mod commands;
mod descriptors;
mod extensions;
mod returns;

pub use commands::*;
pub use descriptors::*;
pub use extensions::*;
pub use returns::*;

use crate::command::CommandKind;
use crate::error::{WireError, WireResult};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($label:literal) {
            $($(#[$variant_meta:meta])* $variant:ident = $value:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant = $value,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn from_wire(value: u32) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// Like [`Self::from_wire`], but an unknown value is fatal.
            pub fn decode(value: u32) -> WireResult<Self> {
                Self::from_wire(value).ok_or(WireError::InvalidEnum {
                    name: $label,
                    value,
                })
            }

            pub const fn to_wire(self) -> u32 {
                self as u32
            }
        }
    };
}

wire_enum! {
    /// Client-to-server commands.
    pub enum WireCmd ("WireCmd") {
        BufferMapAsync = 0,
        CommandEncoderFinish = 1,
        DestroyObject = 2,
        DeviceCreateBindGroup = 3,
        DeviceCreateBuffer = 4,
        DeviceCreateCommandEncoder = 5,
        DeviceCreateComputePipeline = 6,
        DeviceCreateShaderModule = 7,
        QueueOnSubmittedWorkDone = 8,
        QueueSubmit = 9,
        QueueWriteBuffer = 10,
        ShaderModuleGetCompilationInfo = 11,
    }
}

wire_enum! {
    /// Server-to-client commands, delivering callbacks and events.
    pub enum ReturnWireCmd ("ReturnWireCmd") {
        BufferMapAsyncCallback = 0,
        DeviceUncapturedErrorCallback = 1,
        QueueWorkDoneCallback = 2,
        ShaderModuleGetCompilationInfoCallback = 3,
    }
}

impl CommandKind for WireCmd {
    fn to_wire(self) -> u32 {
        WireCmd::to_wire(self)
    }

    fn from_wire(value: u32) -> Option<Self> {
        WireCmd::from_wire(value)
    }
}

impl CommandKind for ReturnWireCmd {
    fn to_wire(self) -> u32 {
        ReturnWireCmd::to_wire(self)
    }

    fn from_wire(value: u32) -> Option<Self> {
        ReturnWireCmd::from_wire(value)
    }
}

wire_enum! {
    pub enum MapMode ("MapMode") {
        Read = 1,
        Write = 2,
    }
}

wire_enum! {
    pub enum MapAsyncStatus ("MapAsyncStatus") {
        Success = 0,
        ValidationError = 1,
        DestroyedBeforeCallback = 2,
        Unknown = 3,
    }
}

wire_enum! {
    pub enum QueueWorkDoneStatus ("QueueWorkDoneStatus") {
        Success = 0,
        Error = 1,
        DeviceLost = 2,
    }
}

wire_enum! {
    pub enum CompilationInfoRequestStatus ("CompilationInfoRequestStatus") {
        Success = 0,
        Error = 1,
        DeviceLost = 2,
    }
}

wire_enum! {
    pub enum CompilationMessageType ("CompilationMessageType") {
        Error = 0,
        Warning = 1,
        Info = 2,
    }
}

wire_enum! {
    pub enum ErrorType ("ErrorType") {
        Validation = 1,
        OutOfMemory = 2,
        Internal = 3,
        DeviceLost = 4,
    }
}

/// Buffer usage bits, passed through unvalidated.
pub mod buffer_usage {
    pub const MAP_READ: u32 = 0x0001;
    pub const MAP_WRITE: u32 = 0x0002;
    pub const COPY_SRC: u32 = 0x0004;
    pub const COPY_DST: u32 = 0x0008;
    pub const UNIFORM: u32 = 0x0040;
    pub const STORAGE: u32 = 0x0080;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_discriminants_round_trip() {
        for cmd in WireCmd::ALL {
            assert_eq!(WireCmd::from_wire(cmd.to_wire()), Some(*cmd));
        }
        for cmd in ReturnWireCmd::ALL {
            assert_eq!(ReturnWireCmd::from_wire(cmd.to_wire()), Some(*cmd));
        }
        assert_eq!(WireCmd::from_wire(12), None);
    }

    #[test]
    fn unknown_enum_values_are_fatal() {
        assert_eq!(MapMode::decode(2), Ok(MapMode::Write));
        assert_eq!(
            MapMode::decode(3),
            Err(WireError::InvalidEnum {
                name: "MapMode",
                value: 3
            })
        );
    }
}
