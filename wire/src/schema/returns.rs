//! Server-to-client commands.
//!
//! Return commands name objects by their [`ObjectHandle`] rather than by a
//! resolved reference: the client checks the generation itself, since the
//! object may have been released and its id reused while the callback was in
//! flight.

use bytemuck::{Pod, Zeroable};

use super::{
    CompilationInfo, CompilationInfoRequestStatus, ErrorType, MapAsyncStatus,
    QueueWorkDoneStatus, ReturnWireCmd,
};
use crate::arena::DeserializeAllocator;
use crate::buffer::{DeserializeBuffer, SerializeBuffer};
use crate::command::WireCommand;
use crate::error::WireResult;
use crate::object::{ObjectHandle, ObjectIdProvider, ObjectIdResolver};
use crate::record::{
    WidenInto, WireBool, WireRecord, deserialize_optional_record, deserialize_slice,
    deserialize_string, optional_record_extra_size, serialize_optional_record, serialize_slice,
    serialize_string, slice_extra_size, string_extra_size,
};

/// Completes a `BufferMapAsync` request. `data` holds the mapped range for
/// read mappings and is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnBufferMapAsyncCallbackCmd {
    pub buffer: ObjectHandle,
    pub request_serial: u64,
    pub status: MapAsyncStatus,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ReturnBufferMapAsyncCallbackTransfer {
    pub buffer: ObjectHandle,
    pub request_serial: u64,
    pub data_length: u64,
    pub status: u32,
    pub padding: u32,
}

impl WireRecord for ReturnBufferMapAsyncCallbackCmd {
    type Transfer = ReturnBufferMapAsyncCallbackTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        slice_extra_size(&self.data)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.buffer = self.buffer;
        transfer.request_serial = self.request_serial.widen();
        transfer.status = self.status.to_wire();
        transfer.data_length = self.data.len().widen();
        serialize_slice(&self.data, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            buffer: transfer.buffer,
            request_serial: transfer.request_serial,
            status: MapAsyncStatus::decode(transfer.status)?,
            data: deserialize_slice(transfer.data_length, buffer, allocator)?,
        })
    }
}

impl WireCommand for ReturnBufferMapAsyncCallbackCmd {
    type Kind = ReturnWireCmd;
    const KIND: ReturnWireCmd = ReturnWireCmd::BufferMapAsyncCallback;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnDeviceUncapturedErrorCallbackCmd {
    pub device: ObjectHandle,
    pub error_type: ErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ReturnDeviceUncapturedErrorCallbackTransfer {
    pub device: ObjectHandle,
    pub message_strlen: u64,
    pub error_type: u32,
    pub padding: u32,
}

impl WireRecord for ReturnDeviceUncapturedErrorCallbackCmd {
    type Transfer = ReturnDeviceUncapturedErrorCallbackTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        string_extra_size(&self.message)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.device = self.device;
        transfer.error_type = self.error_type.to_wire();
        transfer.message_strlen = self.message.len().widen();
        serialize_string(&self.message, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            device: transfer.device,
            error_type: ErrorType::decode(transfer.error_type)?,
            message: deserialize_string(transfer.message_strlen, buffer, allocator)?,
        })
    }
}

impl WireCommand for ReturnDeviceUncapturedErrorCallbackCmd {
    type Kind = ReturnWireCmd;
    const KIND: ReturnWireCmd = ReturnWireCmd::DeviceUncapturedErrorCallback;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnQueueWorkDoneCallbackCmd {
    pub queue: ObjectHandle,
    pub request_serial: u64,
    pub status: QueueWorkDoneStatus,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ReturnQueueWorkDoneCallbackTransfer {
    pub queue: ObjectHandle,
    pub request_serial: u64,
    pub status: u32,
    pub padding: u32,
}

impl WireRecord for ReturnQueueWorkDoneCallbackCmd {
    type Transfer = ReturnQueueWorkDoneCallbackTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.queue = self.queue;
        transfer.request_serial = self.request_serial.widen();
        transfer.status = self.status.to_wire();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            queue: transfer.queue,
            request_serial: transfer.request_serial,
            status: QueueWorkDoneStatus::decode(transfer.status)?,
        })
    }
}

impl WireCommand for ReturnQueueWorkDoneCallbackCmd {
    type Kind = ReturnWireCmd;
    const KIND: ReturnWireCmd = ReturnWireCmd::QueueWorkDoneCallback;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnShaderModuleGetCompilationInfoCallbackCmd {
    pub shader_module: ObjectHandle,
    pub request_serial: u64,
    pub status: CompilationInfoRequestStatus,
    pub info: Option<CompilationInfo>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ReturnShaderModuleGetCompilationInfoCallbackTransfer {
    pub shader_module: ObjectHandle,
    pub request_serial: u64,
    pub status: u32,
    pub has_info: WireBool,
}

impl WireRecord for ReturnShaderModuleGetCompilationInfoCallbackCmd {
    type Transfer = ReturnShaderModuleGetCompilationInfoCallbackTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        optional_record_extra_size(self.info.as_ref())
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.shader_module = self.shader_module;
        transfer.request_serial = self.request_serial.widen();
        transfer.status = self.status.to_wire();
        transfer.has_info = WireBool::from(self.info.is_some());
        serialize_optional_record(self.info.as_ref(), buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            shader_module: transfer.shader_module,
            request_serial: transfer.request_serial,
            status: CompilationInfoRequestStatus::decode(transfer.status)?,
            info: deserialize_optional_record(transfer.has_info, buffer, allocator, resolver)?,
        })
    }
}

impl WireCommand for ReturnShaderModuleGetCompilationInfoCallbackCmd {
    type Kind = ReturnWireCmd;
    const KIND: ReturnWireCmd = ReturnWireCmd::ShaderModuleGetCompilationInfoCallback;
}
