use common::ObjectType;
use wire::{ObjectHandle, ObjectId, WireError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("session was terminated by an earlier error")]
    Terminated,

    #[error("cannot create a {ty} with the null id")]
    NullObjectId { ty: ObjectType },

    #[error("{ty} {id} is already live")]
    ObjectAlreadyLive { ty: ObjectType, id: ObjectId },

    #[error("{ty} {handle} does not advance past generation {previous}")]
    StaleGeneration {
        ty: ObjectType,
        handle: ObjectHandle,
        previous: u32,
    },

    #[error("{ty} {id} is not a live object")]
    UnknownObject { ty: ObjectType, id: ObjectId },
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;
