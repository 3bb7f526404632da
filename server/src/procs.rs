//! GPU entry points the server forwards decoded commands to.

use std::collections::HashMap;
use std::num::NonZeroU64;

use common::ObjectType;
use wire::object::{
    BindGroup, BindGroupLayout, Buffer, CommandBuffer, CommandEncoder, ComputePipeline, Device,
    Queue, ShaderModule,
};
use wire::schema::*;
use wire::WireObject;

/// Error a GPU call reports through the device's uncaptured error callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcError {
    pub error_type: ErrorType,
    pub message: String,
}

impl ProcError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Validation,
            message: message.into(),
        }
    }
}

pub type ProcResult<T> = std::result::Result<T, ProcError>;

/// The native GPU API.
///
/// Asynchronous requests complete before the call returns, and their result
/// is handed back directly.
pub trait Procs {
    fn create_device(&mut self) -> Device;

    fn device_get_queue(&mut self, device: Device) -> Queue;

    fn create_buffer(&mut self, device: Device, descriptor: &BufferDescriptor) -> Buffer;

    fn create_shader_module(
        &mut self,
        device: Device,
        descriptor: &ShaderModuleDescriptor,
    ) -> ShaderModule;

    fn create_compute_pipeline(
        &mut self,
        device: Device,
        descriptor: &ComputePipelineDescriptor,
    ) -> ComputePipeline;

    fn create_bind_group(&mut self, device: Device, descriptor: &BindGroupDescriptor)
        -> BindGroup;

    fn create_command_encoder(
        &mut self,
        device: Device,
        descriptor: Option<&CommandEncoderDescriptor>,
    ) -> CommandEncoder;

    fn encoder_finish(
        &mut self,
        encoder: CommandEncoder,
        descriptor: Option<&CommandBufferDescriptor>,
    ) -> CommandBuffer;

    fn queue_submit(&mut self, queue: Queue, commands: &[CommandBuffer]);

    fn queue_write_buffer(
        &mut self,
        queue: Queue,
        buffer: Buffer,
        offset: u64,
        data: &[u8],
    ) -> ProcResult<()>;

    /// Maps `offset..offset + size` and returns a copy of its contents.
    fn buffer_map_async(
        &mut self,
        buffer: Buffer,
        mode: MapMode,
        offset: u64,
        size: u64,
    ) -> (MapAsyncStatus, Vec<u8>);

    fn queue_on_submitted_work_done(&mut self, queue: Queue) -> QueueWorkDoneStatus;

    fn shader_module_get_compilation_info(
        &mut self,
        shader_module: ShaderModule,
    ) -> (CompilationInfoRequestStatus, Option<CompilationInfo>);

    fn release(&mut self, ty: ObjectType, raw: NonZeroU64);
}

/// Largest buffer [`RecordingProcs`] backs with memory.
pub const MAX_BACKING_SIZE: u64 = 1 << 28;

/// One call received by [`RecordingProcs`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcCall {
    CreateDevice,
    CreateBuffer { label: Option<String>, size: u64 },
    CreateShaderModule { label: Option<String> },
    CreateComputePipeline { entry_point: String, constants: usize },
    CreateBindGroup { entries: usize },
    CreateCommandEncoder,
    EncoderFinish,
    QueueSubmit { commands: usize },
    QueueWriteBuffer { offset: u64, len: usize },
    BufferMapAsync { mode: MapMode, offset: u64, size: u64 },
    QueueOnSubmittedWorkDone,
    GetCompilationInfo,
    Release { ty: ObjectType },
}

/// In-memory stand-in for a GPU.
///
/// Buffers hold real bytes so that writes can be read back through a map.
#[derive(Debug)]
pub struct RecordingProcs {
    next_raw: NonZeroU64,
    calls: Vec<ProcCall>,
    buffers: HashMap<NonZeroU64, Vec<u8>>,
    shader_modules: HashMap<NonZeroU64, CompilationInfo>,
    submitted: usize,
}

impl Default for RecordingProcs {
    fn default() -> Self {
        Self {
            next_raw: NonZeroU64::MIN,
            calls: Vec::new(),
            buffers: HashMap::new(),
            shader_modules: HashMap::new(),
            submitted: 0,
        }
    }
}

impl RecordingProcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[ProcCall] {
        &self.calls
    }

    /// Contents of a live buffer.
    pub fn buffer_contents(&self, buffer: Buffer) -> Option<&[u8]> {
        self.buffers.get(&buffer.raw()).map(Vec::as_slice)
    }

    /// Creates a bind group layout outside the command stream, for injection.
    pub fn create_bind_group_layout(&mut self, _device: Device) -> BindGroupLayout {
        self.next()
    }

    /// Number of command buffers submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    fn next<T: WireObject>(&mut self) -> T {
        let raw = self.next_raw;
        self.next_raw = raw.saturating_add(1);
        T::from_raw(raw)
    }

    fn compile(descriptor: &ShaderModuleDescriptor) -> CompilationInfo {
        let has_source = descriptor.chain.iter().any(|node| match node {
            ChainedStruct::ShaderModuleWgsl(wgsl) => !wgsl.code.trim().is_empty(),
            ChainedStruct::ShaderModuleSpirv(spirv) => !spirv.code.is_empty(),
            _ => false,
        });
        if has_source {
            return CompilationInfo::default();
        }
        CompilationInfo {
            messages: vec![CompilationMessage {
                message: Some("shader module has no source".to_string()),
                kind: CompilationMessageType::Error,
                line_num: 0,
                line_pos: 0,
                offset: 0,
                length: 0,
            }],
        }
    }
}

/// `offset..offset + len` as a range into a buffer of `size` bytes.
fn buffer_range(offset: u64, len: u64, size: usize) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    (end <= size).then_some(start..end)
}

impl Procs for RecordingProcs {
    fn create_device(&mut self) -> Device {
        self.calls.push(ProcCall::CreateDevice);
        self.next()
    }

    fn device_get_queue(&mut self, _device: Device) -> Queue {
        self.next()
    }

    fn create_buffer(&mut self, _device: Device, descriptor: &BufferDescriptor) -> Buffer {
        self.calls.push(ProcCall::CreateBuffer {
            label: descriptor.label.clone(),
            size: descriptor.size,
        });
        let buffer: Buffer = self.next();
        // Oversized buffers get no backing store, so every access fails validation.
        let size = if descriptor.size <= MAX_BACKING_SIZE {
            usize::try_from(descriptor.size).unwrap_or(0)
        } else {
            0
        };
        self.buffers.insert(buffer.raw(), vec![0; size]);
        buffer
    }

    fn create_shader_module(
        &mut self,
        _device: Device,
        descriptor: &ShaderModuleDescriptor,
    ) -> ShaderModule {
        self.calls.push(ProcCall::CreateShaderModule {
            label: descriptor.label.clone(),
        });
        let module: ShaderModule = self.next();
        self.shader_modules
            .insert(module.raw(), Self::compile(descriptor));
        module
    }

    fn create_compute_pipeline(
        &mut self,
        _device: Device,
        descriptor: &ComputePipelineDescriptor,
    ) -> ComputePipeline {
        self.calls.push(ProcCall::CreateComputePipeline {
            entry_point: descriptor.compute.entry_point.clone(),
            constants: descriptor.compute.constants.len(),
        });
        self.next()
    }

    fn create_bind_group(
        &mut self,
        _device: Device,
        descriptor: &BindGroupDescriptor,
    ) -> BindGroup {
        self.calls.push(ProcCall::CreateBindGroup {
            entries: descriptor.entries.len(),
        });
        self.next()
    }

    fn create_command_encoder(
        &mut self,
        _device: Device,
        _descriptor: Option<&CommandEncoderDescriptor>,
    ) -> CommandEncoder {
        self.calls.push(ProcCall::CreateCommandEncoder);
        self.next()
    }

    fn encoder_finish(
        &mut self,
        _encoder: CommandEncoder,
        _descriptor: Option<&CommandBufferDescriptor>,
    ) -> CommandBuffer {
        self.calls.push(ProcCall::EncoderFinish);
        self.next()
    }

    fn queue_submit(&mut self, _queue: Queue, commands: &[CommandBuffer]) {
        self.calls.push(ProcCall::QueueSubmit {
            commands: commands.len(),
        });
        self.submitted += commands.len();
    }

    fn queue_write_buffer(
        &mut self,
        _queue: Queue,
        buffer: Buffer,
        offset: u64,
        data: &[u8],
    ) -> ProcResult<()> {
        self.calls.push(ProcCall::QueueWriteBuffer {
            offset,
            len: data.len(),
        });
        let contents = self
            .buffers
            .get_mut(&buffer.raw())
            .ok_or_else(|| ProcError::validation("write to a destroyed buffer"))?;
        let range = buffer_range(offset, data.len() as u64, contents.len()).ok_or_else(|| {
            ProcError::validation(format!(
                "write of {} bytes at offset {offset} overruns a {} byte buffer",
                data.len(),
                contents.len()
            ))
        })?;
        contents[range].copy_from_slice(data);
        Ok(())
    }

    fn buffer_map_async(
        &mut self,
        buffer: Buffer,
        mode: MapMode,
        offset: u64,
        size: u64,
    ) -> (MapAsyncStatus, Vec<u8>) {
        self.calls.push(ProcCall::BufferMapAsync { mode, offset, size });
        let Some(contents) = self.buffers.get(&buffer.raw()) else {
            return (MapAsyncStatus::DestroyedBeforeCallback, Vec::new());
        };
        match buffer_range(offset, size, contents.len()) {
            Some(range) if mode == MapMode::Read => (MapAsyncStatus::Success, contents[range].to_vec()),
            Some(_) => (MapAsyncStatus::Success, Vec::new()),
            None => (MapAsyncStatus::ValidationError, Vec::new()),
        }
    }

    fn queue_on_submitted_work_done(&mut self, _queue: Queue) -> QueueWorkDoneStatus {
        self.calls.push(ProcCall::QueueOnSubmittedWorkDone);
        QueueWorkDoneStatus::Success
    }

    fn shader_module_get_compilation_info(
        &mut self,
        shader_module: ShaderModule,
    ) -> (CompilationInfoRequestStatus, Option<CompilationInfo>) {
        self.calls.push(ProcCall::GetCompilationInfo);
        match self.shader_modules.get(&shader_module.raw()) {
            Some(info) => (CompilationInfoRequestStatus::Success, Some(info.clone())),
            None => (CompilationInfoRequestStatus::Error, None),
        }
    }

    fn release(&mut self, ty: ObjectType, raw: NonZeroU64) {
        self.calls.push(ProcCall::Release { ty });
        match ty {
            ObjectType::Buffer => {
                self.buffers.remove(&raw);
            }
            ObjectType::ShaderModule => {
                self.shader_modules.remove(&raw);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(procs: &mut RecordingProcs, size: u64) -> Buffer {
        let device = procs.create_device();
        procs.create_buffer(
            device,
            &BufferDescriptor {
                size,
                ..BufferDescriptor::default()
            },
        )
    }

    #[test]
    fn test_written_bytes_can_be_mapped() {
        let mut procs = RecordingProcs::new();
        let device = procs.create_device();
        let queue = procs.device_get_queue(device);
        let buffer = buffer(&mut procs, 8);

        procs
            .queue_write_buffer(queue, buffer, 2, &[1, 2, 3])
            .unwrap();
        assert_eq!(
            procs.buffer_map_async(buffer, MapMode::Read, 0, 6),
            (MapAsyncStatus::Success, vec![0, 0, 1, 2, 3, 0])
        );
    }

    #[test]
    fn test_out_of_range_access_fails_validation() {
        let mut procs = RecordingProcs::new();
        let device = procs.create_device();
        let queue = procs.device_get_queue(device);
        let buffer = buffer(&mut procs, 4);

        let err = procs
            .queue_write_buffer(queue, buffer, 2, &[0; 4])
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::Validation);
        assert_eq!(
            procs.buffer_map_async(buffer, MapMode::Read, u64::MAX, 2).0,
            MapAsyncStatus::ValidationError
        );
    }

    #[test]
    fn test_released_buffer_reports_destroyed() {
        let mut procs = RecordingProcs::new();
        let buffer = buffer(&mut procs, 4);
        procs.release(ObjectType::Buffer, buffer.raw());
        assert_eq!(
            procs.buffer_map_async(buffer, MapMode::Read, 0, 4).0,
            MapAsyncStatus::DestroyedBeforeCallback
        );
        assert_eq!(procs.buffer_contents(buffer), None);
    }

    #[test]
    fn test_module_without_source_reports_an_error_message() {
        let mut procs = RecordingProcs::new();
        let device = procs.create_device();
        let module = procs.create_shader_module(device, &ShaderModuleDescriptor::default());
        let (status, info) = procs.shader_module_get_compilation_info(module);
        assert_eq!(status, CompilationInfoRequestStatus::Success);
        let info = info.unwrap();
        assert_eq!(info.messages.len(), 1);
        assert_eq!(info.messages[0].kind, CompilationMessageType::Error);
    }
}
