//! Object references across the process boundary.
//!
//! Locally an object is an opaque [`WireObject`] handle whose meaning belongs
//! to the side holding it. On the wire it is an [`ObjectId`]. The handle
//! tables of each side translate between the two through
//! [`ObjectIdProvider`] and [`ObjectIdResolver`].

use std::fmt;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use common::ObjectType;
use serde::{Deserialize, Serialize};

use crate::error::{WireError, WireResult};

/// Wire id of a remote object. Zero is the null sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Serialize,
    Deserialize,
)]
#[repr(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity chosen by the creating side for a new remote object.
///
/// The generation distinguishes successive objects that reuse the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct ObjectHandle {
    pub id: ObjectId,
    pub generation: u32,
}

impl ObjectHandle {
    pub const fn new(id: ObjectId, generation: u32) -> Self {
        Self { id, generation }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// Native handle to an object of one [`ObjectType`].
pub trait WireObject: Copy + fmt::Debug + 'static {
    const TYPE: ObjectType;

    fn from_raw(raw: NonZeroU64) -> Self;

    fn raw(self) -> NonZeroU64;
}

macro_rules! wire_objects {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Native handle to a `", stringify!($name), "`.")]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(NonZeroU64);

            impl WireObject for $name {
                const TYPE: ObjectType = ObjectType::$name;

                fn from_raw(raw: NonZeroU64) -> Self {
                    Self(raw)
                }

                fn raw(self) -> NonZeroU64 {
                    self.0
                }
            }
        )*
    };
}

wire_objects!(
    Adapter,
    BindGroup,
    BindGroupLayout,
    Buffer,
    CommandBuffer,
    CommandEncoder,
    ComputePassEncoder,
    ComputePipeline,
    Device,
    ExternalTexture,
    Instance,
    PipelineLayout,
    QuerySet,
    Queue,
    RenderBundle,
    RenderBundleEncoder,
    RenderPassEncoder,
    RenderPipeline,
    Sampler,
    ShaderModule,
    Surface,
    SwapChain,
    Texture,
    TextureView,
);

/// Maps local objects to the ids the peer knows them by.
pub trait ObjectIdProvider {
    /// Returns the id of a live object of type `ty`. Anything else is fatal.
    fn get_raw_id(&self, ty: ObjectType, raw: NonZeroU64) -> WireResult<ObjectId>;
}

impl dyn ObjectIdProvider + '_ {
    pub fn get_id<T: WireObject>(&self, object: T) -> WireResult<ObjectId> {
        self.get_raw_id(T::TYPE, object.raw())
    }

    pub fn get_optional_id<T: WireObject>(&self, object: Option<T>) -> WireResult<ObjectId> {
        match object {
            Some(object) => self.get_id(object),
            None => Ok(ObjectId::NULL),
        }
    }
}

/// Maps ids received from the peer back to local objects.
pub trait ObjectIdResolver {
    /// Resolves a non-null id of type `ty`. Unknown, freed or foreign ids
    /// are fatal.
    fn get_raw_from_id(&self, ty: ObjectType, id: ObjectId) -> WireResult<NonZeroU64>;
}

impl dyn ObjectIdResolver + '_ {
    pub fn get_from_id<T: WireObject>(&self, id: ObjectId) -> WireResult<T> {
        if id.is_null() {
            return Err(WireError::NullObject { ty: T::TYPE });
        }
        self.get_raw_from_id(T::TYPE, id).map(T::from_raw)
    }

    pub fn get_optional_from_id<T: WireObject>(&self, id: ObjectId) -> WireResult<Option<T>> {
        if id.is_null() {
            return Ok(None);
        }
        self.get_from_id(id).map(Some)
    }
}

/// Provider and resolver for contexts where no object may appear.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObjects;

impl ObjectIdProvider for NoObjects {
    fn get_raw_id(&self, ty: ObjectType, _raw: NonZeroU64) -> WireResult<ObjectId> {
        Err(WireError::ObjectsUnavailable { ty })
    }
}

impl ObjectIdResolver for NoObjects {
    fn get_raw_from_id(&self, ty: ObjectType, _id: ObjectId) -> WireResult<NonZeroU64> {
        Err(WireError::ObjectsUnavailable { ty })
    }
}
