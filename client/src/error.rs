use common::ObjectType;
use wire::{ObjectHandle, WireError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("connection to the server is lost")]
    Disconnected,

    #[error("no more {ty} ids available")]
    IdsExhausted { ty: ObjectType },

    #[error("{ty} {handle} is not a live object")]
    StaleObject { ty: ObjectType, handle: ObjectHandle },

    #[error("callback for unknown request serial {serial}")]
    UnknownRequest { serial: u64 },

    #[error("callback for request {serial} names {actual}, expected {expected}")]
    RequestObjectMismatch {
        serial: u64,
        expected: ObjectHandle,
        actual: ObjectHandle,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
