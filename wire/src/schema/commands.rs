use bytemuck::{Pod, Zeroable};
use common::ObjectType;

use super::{
    BindGroupDescriptor, BindGroupDescriptorTransfer, BufferDescriptor, BufferDescriptorTransfer,
    CommandBufferDescriptor, CommandEncoderDescriptor, ComputePipelineDescriptor,
    ComputePipelineDescriptorTransfer, MapMode, ShaderModuleDescriptor,
    ShaderModuleDescriptorTransfer, WireCmd,
};
use crate::arena::DeserializeAllocator;
use crate::buffer::{DeserializeBuffer, SerializeBuffer};
use crate::command::WireCommand;
use crate::error::{WireError, WireResult};
use crate::object::{
    Buffer, CommandBuffer, CommandEncoder, Device, ObjectHandle, ObjectId, ObjectIdProvider,
    ObjectIdResolver, Queue, ShaderModule,
};
use crate::record::{
    WidenInto, WireBool, WireRecord, deserialize_object_array, deserialize_optional_record,
    deserialize_slice, object_array_extra_size, optional_record_extra_size,
    serialize_object_array, serialize_optional_record, serialize_slice, slice_extra_size,
};

/// `device.create_*(descriptor)` commands: the descriptor travels inline and
/// `result` names the object the server must create.
macro_rules! device_create_command {
    (
        $(#[$meta:meta])*
        $name:ident, $transfer:ident, $descriptor:ty, $descriptor_transfer:ty, $kind:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub device: Device,
            pub descriptor: $descriptor,
            pub result: ObjectHandle,
        }

        #[derive(Debug, Clone, Copy, Pod, Zeroable)]
        #[repr(C)]
        pub struct $transfer {
            pub descriptor: $descriptor_transfer,
            pub result: ObjectHandle,
            pub device: ObjectId,
            pub padding: u32,
        }

        impl WireRecord for $name {
            type Transfer = $transfer;

            fn extra_required_size(&self) -> WireResult<usize> {
                self.descriptor.extra_required_size()
            }

            fn serialize(
                &self,
                transfer: &mut Self::Transfer,
                buffer: &mut SerializeBuffer<'_>,
                provider: &dyn ObjectIdProvider,
            ) -> WireResult<()> {
                transfer.device = provider.get_id(self.device)?;
                transfer.result = self.result;
                self.descriptor
                    .serialize(&mut transfer.descriptor, buffer, provider)
            }

            fn deserialize(
                transfer: &Self::Transfer,
                buffer: &mut DeserializeBuffer<'_>,
                allocator: &mut dyn DeserializeAllocator,
                resolver: &dyn ObjectIdResolver,
            ) -> WireResult<Self> {
                Ok(Self {
                    device: resolver.get_from_id(transfer.device)?,
                    descriptor: <$descriptor>::deserialize(
                        &transfer.descriptor,
                        buffer,
                        allocator,
                        resolver,
                    )?,
                    result: transfer.result,
                })
            }
        }

        impl WireCommand for $name {
            type Kind = WireCmd;
            const KIND: WireCmd = $kind;
        }
    };
}

device_create_command!(
    DeviceCreateBufferCmd,
    DeviceCreateBufferTransfer,
    BufferDescriptor,
    BufferDescriptorTransfer,
    WireCmd::DeviceCreateBuffer
);

device_create_command!(
    DeviceCreateShaderModuleCmd,
    DeviceCreateShaderModuleTransfer,
    ShaderModuleDescriptor,
    ShaderModuleDescriptorTransfer,
    WireCmd::DeviceCreateShaderModule
);

device_create_command!(
    DeviceCreateComputePipelineCmd,
    DeviceCreateComputePipelineTransfer,
    ComputePipelineDescriptor,
    ComputePipelineDescriptorTransfer,
    WireCmd::DeviceCreateComputePipeline
);

device_create_command!(
    DeviceCreateBindGroupCmd,
    DeviceCreateBindGroupTransfer,
    BindGroupDescriptor,
    BindGroupDescriptorTransfer,
    WireCmd::DeviceCreateBindGroup
);

/// Commands whose descriptor is optional travel as a presence flag plus a
/// trailing record.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct OptionalDescriptorCreateTransfer {
    pub result: ObjectHandle,
    pub target: ObjectId,
    pub has_descriptor: WireBool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCreateCommandEncoderCmd {
    pub device: Device,
    pub descriptor: Option<CommandEncoderDescriptor>,
    pub result: ObjectHandle,
}

impl WireRecord for DeviceCreateCommandEncoderCmd {
    type Transfer = OptionalDescriptorCreateTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        optional_record_extra_size(self.descriptor.as_ref())
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.target = provider.get_id(self.device)?;
        transfer.result = self.result;
        transfer.has_descriptor = WireBool::from(self.descriptor.is_some());
        serialize_optional_record(self.descriptor.as_ref(), buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            device: resolver.get_from_id(transfer.target)?,
            descriptor: deserialize_optional_record(
                transfer.has_descriptor,
                buffer,
                allocator,
                resolver,
            )?,
            result: transfer.result,
        })
    }
}

impl WireCommand for DeviceCreateCommandEncoderCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::DeviceCreateCommandEncoder;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandEncoderFinishCmd {
    pub encoder: CommandEncoder,
    pub descriptor: Option<CommandBufferDescriptor>,
    pub result: ObjectHandle,
}

impl WireRecord for CommandEncoderFinishCmd {
    type Transfer = OptionalDescriptorCreateTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        optional_record_extra_size(self.descriptor.as_ref())
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.target = provider.get_id(self.encoder)?;
        transfer.result = self.result;
        transfer.has_descriptor = WireBool::from(self.descriptor.is_some());
        serialize_optional_record(self.descriptor.as_ref(), buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            encoder: resolver.get_from_id(transfer.target)?,
            descriptor: deserialize_optional_record(
                transfer.has_descriptor,
                buffer,
                allocator,
                resolver,
            )?,
            result: transfer.result,
        })
    }
}

impl WireCommand for CommandEncoderFinishCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::CommandEncoderFinish;
}

/// Requests a mapping of `buffer_id`. Carries a raw id so the client can send
/// it without a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMapAsyncCmd {
    pub buffer_id: ObjectId,
    pub request_serial: u64,
    pub mode: MapMode,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BufferMapAsyncTransfer {
    pub request_serial: u64,
    pub offset: u64,
    pub size: u64,
    pub buffer_id: ObjectId,
    pub mode: u32,
}

impl WireRecord for BufferMapAsyncCmd {
    type Transfer = BufferMapAsyncTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.buffer_id = self.buffer_id;
        transfer.request_serial = self.request_serial.widen();
        transfer.mode = self.mode.to_wire();
        transfer.offset = self.offset.widen();
        transfer.size = self.size.widen();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            buffer_id: transfer.buffer_id,
            request_serial: transfer.request_serial,
            mode: MapMode::decode(transfer.mode)?,
            offset: transfer.offset,
            size: transfer.size,
        })
    }
}

impl WireCommand for BufferMapAsyncCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::BufferMapAsync;
}

/// Releases the server-side object `object_id` of type `object_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyObjectCmd {
    pub object_type: ObjectType,
    pub object_id: ObjectId,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct DestroyObjectTransfer {
    pub object_type: u32,
    pub object_id: ObjectId,
}

impl WireRecord for DestroyObjectCmd {
    type Transfer = DestroyObjectTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.object_type = self.object_type as u32;
        transfer.object_id = self.object_id;
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let object_type =
            ObjectType::from_id(transfer.object_type).ok_or(WireError::InvalidEnum {
                name: "ObjectType",
                value: transfer.object_type,
            })?;
        Ok(Self {
            object_type,
            object_id: transfer.object_id,
        })
    }
}

impl WireCommand for DestroyObjectCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::DestroyObject;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOnSubmittedWorkDoneCmd {
    pub queue: Queue,
    pub request_serial: u64,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct QueueOnSubmittedWorkDoneTransfer {
    pub request_serial: u64,
    pub queue: ObjectId,
    pub padding: u32,
}

impl WireRecord for QueueOnSubmittedWorkDoneCmd {
    type Transfer = QueueOnSubmittedWorkDoneTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.queue = provider.get_id(self.queue)?;
        transfer.request_serial = self.request_serial.widen();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            queue: resolver.get_from_id(transfer.queue)?,
            request_serial: transfer.request_serial,
        })
    }
}

impl WireCommand for QueueOnSubmittedWorkDoneCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::QueueOnSubmittedWorkDone;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSubmitCmd {
    pub queue: Queue,
    pub commands: Vec<CommandBuffer>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct QueueSubmitTransfer {
    pub command_count: u64,
    pub queue: ObjectId,
    pub padding: u32,
}

impl WireRecord for QueueSubmitCmd {
    type Transfer = QueueSubmitTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        object_array_extra_size(&self.commands)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.queue = provider.get_id(self.queue)?;
        transfer.command_count = self.commands.len().widen();
        serialize_object_array(&self.commands, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            queue: resolver.get_from_id(transfer.queue)?,
            commands: deserialize_object_array(
                transfer.command_count,
                buffer,
                allocator,
                resolver,
            )?,
        })
    }
}

impl WireCommand for QueueSubmitCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::QueueSubmit;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueWriteBufferCmd {
    pub queue: Queue,
    pub buffer: Buffer,
    pub buffer_offset: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct QueueWriteBufferTransfer {
    pub buffer_offset: u64,
    pub size: u64,
    pub queue: ObjectId,
    pub buffer: ObjectId,
}

impl WireRecord for QueueWriteBufferCmd {
    type Transfer = QueueWriteBufferTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        slice_extra_size(&self.data)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.queue = provider.get_id(self.queue)?;
        transfer.buffer = provider.get_id(self.buffer)?;
        transfer.buffer_offset = self.buffer_offset.widen();
        transfer.size = self.data.len().widen();
        serialize_slice(&self.data, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            queue: resolver.get_from_id(transfer.queue)?,
            buffer: resolver.get_from_id(transfer.buffer)?,
            buffer_offset: transfer.buffer_offset,
            data: deserialize_slice(transfer.size, buffer, allocator)?,
        })
    }
}

impl WireCommand for QueueWriteBufferCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::QueueWriteBuffer;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderModuleGetCompilationInfoCmd {
    pub shader_module: ShaderModule,
    pub request_serial: u64,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ShaderModuleGetCompilationInfoTransfer {
    pub request_serial: u64,
    pub shader_module: ObjectId,
    pub padding: u32,
}

impl WireRecord for ShaderModuleGetCompilationInfoCmd {
    type Transfer = ShaderModuleGetCompilationInfoTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.shader_module = provider.get_id(self.shader_module)?;
        transfer.request_serial = self.request_serial.widen();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            shader_module: resolver.get_from_id(transfer.shader_module)?,
            request_serial: transfer.request_serial,
        })
    }
}

impl WireCommand for ShaderModuleGetCompilationInfoCmd {
    type Kind = WireCmd;
    const KIND: WireCmd = WireCmd::ShaderModuleGetCompilationInfo;
}
