//! GPU object type catalogue shared by both ends of the wire.
//!
//! Every object that can cross the process boundary belongs to exactly one
//! [`ObjectType`]. The discriminants are the values carried on the wire (for
//! example in `DestroyObject`), so they must stay stable.

use std::ops::{Index, IndexMut};

/// Number of object types known to the protocol.
pub const OBJECT_TYPE_COUNT: usize = 24;

/// Represents every kind of remote GPU object.
///
/// Discriminants are contiguous starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ObjectType {
    /// Physical adapter selected by the instance
    Adapter = 0,

    // ==================== Binding ====================
    /// Set of resources bound together for a pipeline stage
    BindGroup = 1,

    /// Layout a bind group must conform to
    BindGroupLayout = 2,

    // ==================== Resources ====================
    /// Linear GPU memory
    Buffer = 3,

    // ==================== Recording ====================
    /// Finished, submittable list of GPU commands
    CommandBuffer = 4,

    /// Records commands into a command buffer
    CommandEncoder = 5,

    /// Records dispatches inside a compute pass
    ComputePassEncoder = 6,

    // ==================== Pipelines ====================
    /// Compiled compute pipeline
    ComputePipeline = 7,

    // ==================== Core ====================
    /// Logical device that owns every other resource
    Device = 8,

    /// Texture imported from outside the API
    ExternalTexture = 9,

    /// Entry point of the API
    Instance = 10,

    /// Bind group layouts used by a pipeline
    PipelineLayout = 11,

    /// Occlusion or timestamp query storage
    QuerySet = 12,

    /// Submission queue of a device
    Queue = 13,

    /// Pre-recorded render commands
    RenderBundle = 14,

    /// Records a render bundle
    RenderBundleEncoder = 15,

    /// Records draws inside a render pass
    RenderPassEncoder = 16,

    /// Compiled render pipeline
    RenderPipeline = 17,

    /// Texture sampling state
    Sampler = 18,

    /// Compiled shader source
    ShaderModule = 19,

    // ==================== Presentation ====================
    /// Platform window surface
    Surface = 20,

    /// Presentable image chain of a surface
    SwapChain = 21,

    // ==================== Textures ====================
    /// Multi-dimensional image
    Texture = 22,

    /// View into a subresource range of a texture
    TextureView = 23,
}

impl ObjectType {
    /// Every object type in discriminant order.
    pub const ALL: [ObjectType; OBJECT_TYPE_COUNT] = [
        ObjectType::Adapter,
        ObjectType::BindGroup,
        ObjectType::BindGroupLayout,
        ObjectType::Buffer,
        ObjectType::CommandBuffer,
        ObjectType::CommandEncoder,
        ObjectType::ComputePassEncoder,
        ObjectType::ComputePipeline,
        ObjectType::Device,
        ObjectType::ExternalTexture,
        ObjectType::Instance,
        ObjectType::PipelineLayout,
        ObjectType::QuerySet,
        ObjectType::Queue,
        ObjectType::RenderBundle,
        ObjectType::RenderBundleEncoder,
        ObjectType::RenderPassEncoder,
        ObjectType::RenderPipeline,
        ObjectType::Sampler,
        ObjectType::ShaderModule,
        ObjectType::Surface,
        ObjectType::SwapChain,
        ObjectType::Texture,
        ObjectType::TextureView,
    ];

    /// Returns a human-readable name for the object type
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Adapter => "Adapter",
            ObjectType::BindGroup => "BindGroup",
            ObjectType::BindGroupLayout => "BindGroupLayout",
            ObjectType::Buffer => "Buffer",
            ObjectType::CommandBuffer => "CommandBuffer",
            ObjectType::CommandEncoder => "CommandEncoder",
            ObjectType::ComputePassEncoder => "ComputePassEncoder",
            ObjectType::ComputePipeline => "ComputePipeline",
            ObjectType::Device => "Device",
            ObjectType::ExternalTexture => "ExternalTexture",
            ObjectType::Instance => "Instance",
            ObjectType::PipelineLayout => "PipelineLayout",
            ObjectType::QuerySet => "QuerySet",
            ObjectType::Queue => "Queue",
            ObjectType::RenderBundle => "RenderBundle",
            ObjectType::RenderBundleEncoder => "RenderBundleEncoder",
            ObjectType::RenderPassEncoder => "RenderPassEncoder",
            ObjectType::RenderPipeline => "RenderPipeline",
            ObjectType::Sampler => "Sampler",
            ObjectType::ShaderModule => "ShaderModule",
            ObjectType::Surface => "Surface",
            ObjectType::SwapChain => "SwapChain",
            ObjectType::Texture => "Texture",
            ObjectType::TextureView => "TextureView",
        }
    }

    /// Position of this type in [`ObjectType::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns true for objects that record commands rather than own GPU state
    pub fn is_encoder(&self) -> bool {
        matches!(
            self,
            ObjectType::CommandEncoder
                | ObjectType::ComputePassEncoder
                | ObjectType::RenderPassEncoder
                | ObjectType::RenderBundleEncoder
        )
    }

    /// Tries to create an ObjectType from its wire discriminant
    pub fn from_id(id: u32) -> Option<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fixed-size table holding one `T` per object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerObjectType<T> {
    entries: [T; OBJECT_TYPE_COUNT],
}

impl<T: Default> Default for PerObjectType<T> {
    fn default() -> Self {
        Self {
            entries: std::array::from_fn(|_| T::default()),
        }
    }
}

impl<T> PerObjectType<T> {
    /// Iterates `(type, entry)` pairs in discriminant order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectType, &T)> {
        ObjectType::ALL.into_iter().zip(self.entries.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectType, &mut T)> {
        ObjectType::ALL.into_iter().zip(self.entries.iter_mut())
    }
}

impl<T> Index<ObjectType> for PerObjectType<T> {
    type Output = T;

    fn index(&self, ty: ObjectType) -> &T {
        &self.entries[ty.index()]
    }
}

impl<T> IndexMut<ObjectType> for PerObjectType<T> {
    fn index_mut(&mut self, ty: ObjectType) -> &mut T {
        &mut self.entries[ty.index()]
    }
}
