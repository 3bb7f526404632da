//! Reference client for the wire protocol.
//!
//! [`Client`] turns API calls into commands written through a
//! [`CommandSerializer`], and turns the server's return commands back into
//! [`ClientEvent`]s.

pub mod error;
pub mod events;
pub mod objects;

use std::collections::HashMap;
use std::mem;

use common::ObjectType;
use wire::object::{
    BindGroup, Buffer, CommandBuffer, CommandEncoder, ComputePipeline, Device, Queue,
    ShaderModule,
};
use wire::schema::*;
use wire::{
    CMD_HEADER_SIZE, CodecLimits, CommandSerializer, DeserializeBuffer, ObjectHandle,
    ObjectIdProvider, WireCommand, WireDeserializeAllocator, WireError, WireObject,
    peek_command_id,
};

pub use error::{ClientError, ClientResult};
pub use events::ClientEvent;
pub use objects::ObjectStore;

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    ty: ObjectType,
    handle: ObjectHandle,
}

/// One client session writing to `S`.
pub struct Client<S> {
    serializer: S,
    objects: ObjectStore,
    arena: WireDeserializeAllocator,
    next_serial: u64,
    pending: HashMap<u64, PendingRequest>,
    events: Vec<ClientEvent>,
    disconnected: bool,
}

impl<S: CommandSerializer> Client<S> {
    pub fn new(serializer: S, limits: CodecLimits) -> Self {
        Self {
            serializer,
            objects: ObjectStore::new(),
            arena: WireDeserializeAllocator::new(limits.max_allocation_size),
            next_serial: 1,
            pending: HashMap::new(),
            events: Vec::new(),
            disconnected: false,
        }
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn serializer_mut(&mut self) -> &mut S {
        &mut self.serializer
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Takes every event received so far.
    pub fn drain_events(&mut self) -> Vec<ClientEvent> {
        mem::take(&mut self.events)
    }

    /// Allocates an id for an object the server creates out of band, such as
    /// the device and its queue. The returned handle must be injected on the
    /// server side.
    pub fn reserve<T: WireObject>(&mut self) -> ClientResult<(T, ObjectHandle)> {
        self.ensure_connected()?;
        self.objects.allocate()
    }

    pub fn flush(&mut self) -> ClientResult<()> {
        self.ensure_connected()?;
        self.serializer.flush().map_err(|err| self.disconnect(err))
    }

    // ------------------------------------------------------------ commands

    pub fn create_buffer(
        &mut self,
        device: Device,
        descriptor: BufferDescriptor,
    ) -> ClientResult<Buffer> {
        let (buffer, result) = self.objects.allocate()?;
        self.send(&DeviceCreateBufferCmd {
            device,
            descriptor,
            result,
        })?;
        Ok(buffer)
    }

    pub fn create_shader_module(
        &mut self,
        device: Device,
        descriptor: ShaderModuleDescriptor,
    ) -> ClientResult<ShaderModule> {
        let (module, result) = self.objects.allocate()?;
        self.send(&DeviceCreateShaderModuleCmd {
            device,
            descriptor,
            result,
        })?;
        Ok(module)
    }

    pub fn create_compute_pipeline(
        &mut self,
        device: Device,
        descriptor: ComputePipelineDescriptor,
    ) -> ClientResult<ComputePipeline> {
        let (pipeline, result) = self.objects.allocate()?;
        self.send(&DeviceCreateComputePipelineCmd {
            device,
            descriptor,
            result,
        })?;
        Ok(pipeline)
    }

    pub fn create_bind_group(
        &mut self,
        device: Device,
        descriptor: BindGroupDescriptor,
    ) -> ClientResult<BindGroup> {
        let (group, result) = self.objects.allocate()?;
        self.send(&DeviceCreateBindGroupCmd {
            device,
            descriptor,
            result,
        })?;
        Ok(group)
    }

    pub fn create_command_encoder(
        &mut self,
        device: Device,
        descriptor: Option<CommandEncoderDescriptor>,
    ) -> ClientResult<CommandEncoder> {
        let (encoder, result) = self.objects.allocate()?;
        self.send(&DeviceCreateCommandEncoderCmd {
            device,
            descriptor,
            result,
        })?;
        Ok(encoder)
    }

    pub fn finish_encoder(
        &mut self,
        encoder: CommandEncoder,
        descriptor: Option<CommandBufferDescriptor>,
    ) -> ClientResult<CommandBuffer> {
        let (commands, result) = self.objects.allocate()?;
        self.send(&CommandEncoderFinishCmd {
            encoder,
            descriptor,
            result,
        })?;
        Ok(commands)
    }

    pub fn queue_submit(&mut self, queue: Queue, commands: &[CommandBuffer]) -> ClientResult<()> {
        self.send(&QueueSubmitCmd {
            queue,
            commands: commands.to_vec(),
        })
    }

    pub fn queue_write_buffer(
        &mut self,
        queue: Queue,
        buffer: Buffer,
        buffer_offset: u64,
        data: &[u8],
    ) -> ClientResult<()> {
        self.send(&QueueWriteBufferCmd {
            queue,
            buffer,
            buffer_offset,
            data: data.to_vec(),
        })
    }

    /// Returns the serial the matching [`ClientEvent::QueueWorkDone`] carries.
    pub fn queue_on_submitted_work_done(&mut self, queue: Queue) -> ClientResult<u64> {
        let request_serial = self.track_request(queue)?;
        self.send(&QueueOnSubmittedWorkDoneCmd {
            queue,
            request_serial,
        })?;
        Ok(request_serial)
    }

    /// Returns the serial the matching [`ClientEvent::BufferMapped`] carries.
    pub fn buffer_map_async(
        &mut self,
        buffer: Buffer,
        mode: MapMode,
        offset: u64,
        size: u64,
    ) -> ClientResult<u64> {
        let provider: &dyn ObjectIdProvider = &self.objects;
        let buffer_id = provider.get_id(buffer)?;
        let request_serial = self.track_request(buffer)?;
        self.send(&BufferMapAsyncCmd {
            buffer_id,
            request_serial,
            mode,
            offset,
            size,
        })?;
        Ok(request_serial)
    }

    /// Returns the serial the matching [`ClientEvent::CompilationInfo`]
    /// carries.
    pub fn get_compilation_info(&mut self, shader_module: ShaderModule) -> ClientResult<u64> {
        let request_serial = self.track_request(shader_module)?;
        self.send(&ShaderModuleGetCompilationInfoCmd {
            shader_module,
            request_serial,
        })?;
        Ok(request_serial)
    }

    /// Destroys `object` on the server and frees its id for reuse.
    ///
    /// Callbacks still in flight for it are delivered without the object.
    pub fn release<T: WireObject>(&mut self, object: T) -> ClientResult<()> {
        let handle = self.objects.handle(object);
        if !self.objects.is_live(T::TYPE, handle) {
            return Err(ClientError::StaleObject {
                ty: T::TYPE,
                handle,
            });
        }
        self.send(&DestroyObjectCmd {
            object_type: T::TYPE,
            object_id: handle.id,
        })?;
        self.objects.free(object)?;
        Ok(())
    }

    fn track_request<T: WireObject>(&mut self, object: T) -> ClientResult<u64> {
        let handle = self.objects.handle(object);
        if !self.objects.is_live(T::TYPE, handle) {
            return Err(ClientError::StaleObject {
                ty: T::TYPE,
                handle,
            });
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        self.pending.insert(
            serial,
            PendingRequest {
                ty: T::TYPE,
                handle,
            },
        );
        Ok(serial)
    }

    fn send<C: WireCommand>(&mut self, command: &C) -> ClientResult<()> {
        self.ensure_connected()?;
        wire::serialize_command(&mut self.serializer, command, &self.objects)
            .map_err(|err| self.disconnect(err))?;
        log::debug!("sent {:?}", C::KIND);
        Ok(())
    }

    fn ensure_connected(&self) -> ClientResult<()> {
        if self.disconnected {
            return Err(ClientError::Disconnected);
        }
        Ok(())
    }

    fn disconnect(&mut self, err: impl Into<ClientError>) -> ClientError {
        let err = err.into();
        log::error!("client session terminated: {err}");
        self.disconnected = true;
        err
    }

    // ------------------------------------------------------------ returns

    /// Handles every return command in `bytes`. A malformed stream ends the
    /// session.
    pub fn handle_commands(&mut self, bytes: &[u8]) -> ClientResult<()> {
        self.ensure_connected()?;
        self.dispatch_all(bytes).map_err(|err| self.disconnect(err))
    }

    fn dispatch_all(&mut self, bytes: &[u8]) -> ClientResult<()> {
        let mut buffer = DeserializeBuffer::new(bytes);
        while buffer.available_size() >= CMD_HEADER_SIZE {
            let value = peek_command_id(&buffer)?;
            let kind =
                ReturnWireCmd::from_wire(value).ok_or(WireError::UnknownCommand { value })?;
            self.arena.reset();
            log::debug!("received {kind:?}");

            match kind {
                ReturnWireCmd::BufferMapAsyncCallback => {
                    let command = ReturnBufferMapAsyncCallbackCmd::deserialize_without_objects(
                        &mut buffer,
                        &mut self.arena,
                    )?;
                    self.on_buffer_map_async(command)?;
                }
                ReturnWireCmd::DeviceUncapturedErrorCallback => {
                    let command =
                        ReturnDeviceUncapturedErrorCallbackCmd::deserialize_without_objects(
                            &mut buffer,
                            &mut self.arena,
                        )?;
                    self.events.push(ClientEvent::UncapturedError {
                        device: self.objects.lookup(command.device),
                        error_type: command.error_type,
                        message: command.message,
                    });
                }
                ReturnWireCmd::QueueWorkDoneCallback => {
                    let command = ReturnQueueWorkDoneCallbackCmd::deserialize_without_objects(
                        &mut buffer,
                        &mut self.arena,
                    )?;
                    self.complete_request::<Queue>(command.request_serial, command.queue)?;
                    self.events.push(ClientEvent::QueueWorkDone {
                        queue: self.objects.lookup(command.queue),
                        request_serial: command.request_serial,
                        status: command.status,
                    });
                }
                ReturnWireCmd::ShaderModuleGetCompilationInfoCallback => {
                    let command =
                        ReturnShaderModuleGetCompilationInfoCallbackCmd::deserialize_without_objects(
                            &mut buffer,
                            &mut self.arena,
                        )?;
                    self.complete_request::<ShaderModule>(
                        command.request_serial,
                        command.shader_module,
                    )?;
                    self.events.push(ClientEvent::CompilationInfo {
                        shader_module: self.objects.lookup(command.shader_module),
                        request_serial: command.request_serial,
                        status: command.status,
                        info: command.info,
                    });
                }
            }
        }

        let remaining = buffer.available_size();
        if remaining != 0 {
            return Err(WireError::TrailingBytes { remaining }.into());
        }
        Ok(())
    }

    fn on_buffer_map_async(&mut self, command: ReturnBufferMapAsyncCallbackCmd) -> ClientResult<()> {
        self.complete_request::<Buffer>(command.request_serial, command.buffer)?;
        let buffer = self.objects.lookup(command.buffer);
        if buffer.is_none() {
            log::debug!(
                "buffer {} was released before its map request {} completed",
                command.buffer,
                command.request_serial
            );
        }
        self.events.push(ClientEvent::BufferMapped {
            buffer,
            request_serial: command.request_serial,
            status: command.status,
            data: command.data,
        });
        Ok(())
    }

    /// Retires `serial`, which must have been issued for `handle`.
    fn complete_request<T: WireObject>(
        &mut self,
        serial: u64,
        handle: ObjectHandle,
    ) -> ClientResult<()> {
        let pending = self
            .pending
            .remove(&serial)
            .ok_or(ClientError::UnknownRequest { serial })?;
        if pending.ty != T::TYPE || pending.handle != handle {
            return Err(ClientError::RequestObjectMismatch {
                serial,
                expected: pending.handle,
                actual: handle,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire::VecCommandSerializer;

    fn client() -> Client<VecCommandSerializer> {
        Client::new(VecCommandSerializer::new(1 << 20), CodecLimits::default())
    }

    #[test]
    fn reserve_hands_out_the_first_ids() {
        let mut client = client();
        let (_, device) = client.reserve::<Device>().unwrap();
        let (_, queue) = client.reserve::<Queue>().unwrap();
        assert_eq!(device.id.0, 1);
        assert_eq!(queue.id.0, 1);
        assert!(client.serializer().is_empty());
    }

    #[test]
    fn request_serials_increase() {
        let mut client = client();
        let (queue, _) = client.reserve::<Queue>().unwrap();
        assert_eq!(client.queue_on_submitted_work_done(queue), Ok(1));
        assert_eq!(client.queue_on_submitted_work_done(queue), Ok(2));
        assert_eq!(client.pending_requests(), 2);
    }

    #[test]
    fn released_objects_cannot_be_used() {
        let mut client = client();
        let (device, _) = client.reserve::<Device>().unwrap();
        let buffer = client
            .create_buffer(device, BufferDescriptor::default())
            .unwrap();
        client.release(buffer).unwrap();

        assert!(matches!(
            client.release(buffer),
            Err(ClientError::StaleObject { .. })
        ));
        let (queue, _) = client.reserve::<Queue>().unwrap();
        assert!(matches!(
            client.queue_write_buffer(queue, buffer, 0, &[1, 2, 3]),
            Err(ClientError::Wire(WireError::UnknownObject { .. }))
        ));
        assert!(client.is_disconnected());
    }
}
