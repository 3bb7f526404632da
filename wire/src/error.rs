//! Fatal codec errors.
//!
//! The codec has a single failure kind: any of these variants means the peer
//! is misbehaving or the stream is corrupted, and the session that produced
//! it must stop. The variants only exist to make logs useful.

use common::ObjectType;

use crate::object::ObjectId;

/// Errors produced while sizing, serializing or deserializing wire records.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer exhausted: requested {requested} bytes, {available} available")]
    BufferExhausted { requested: usize, available: usize },

    #[error("size computation overflowed")]
    SizeOverflow,

    #[error("wire value {value} does not fit its native field")]
    ValueOutOfRange { value: u64 },

    #[error("invalid boolean flag {value}")]
    InvalidBool { value: u32 },

    #[error("invalid {name} value {value}")]
    InvalidEnum { name: &'static str, value: u32 },

    #[error("string field is not valid utf-8")]
    InvalidUtf8,

    #[error("{ty} id {id} does not name a live object")]
    UnknownObject { ty: ObjectType, id: ObjectId },

    #[error("null {ty} id where a reference is required")]
    NullObject { ty: ObjectType },

    #[error("{ty} reference used where object references are not available")]
    ObjectsUnavailable { ty: ObjectType },

    #[error("command mismatch: expected {expected}, got {actual}")]
    CommandMismatch { expected: u32, actual: u32 },

    #[error("unknown command discriminant {value}")]
    UnknownCommand { value: u32 },

    #[error("invalid declared command size {declared} ({available} bytes available)")]
    InvalidCommandSize { declared: u64, available: usize },

    #[error("{remaining} bytes left unconsumed")]
    TrailingBytes { remaining: usize },

    #[error("serialized {written} bytes into a {reserved} byte reservation")]
    SizeMismatch { reserved: usize, written: usize },

    #[error("command exceeds limit: limit={limit} actual={actual}")]
    CommandTooLarge { limit: usize, actual: usize },

    #[error("arena exhausted: requested {requested} bytes")]
    AllocationFailed { requested: usize },
}

/// Result alias used throughout the codec.
pub type WireResult<T = ()> = Result<T, WireError>;
