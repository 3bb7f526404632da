use wire::buffer::wire_align_sizeof_n;
use wire::object::{
    BindGroup, Buffer, CommandBuffer, CommandEncoder, ComputePipeline, ShaderModule,
};
use wire::schema::*;
use wire::{CommandSerializer, DeserializeBuffer, ObjectHandle, WireCommand, WireObject};

use common::ObjectType;

use crate::error::{ServerError, ServerResult};
use crate::procs::Procs;
use crate::server::Server;

impl<P: Procs, S: CommandSerializer> Server<P, S> {
    fn read<C: WireCommand>(&mut self, buffer: &mut DeserializeBuffer<'_>) -> ServerResult<C> {
        Ok(C::deserialize_command(
            buffer,
            &mut self.arena,
            &self.objects,
        )?)
    }

    pub(crate) fn dispatch(
        &mut self,
        kind: WireCmd,
        buffer: &mut DeserializeBuffer<'_>,
    ) -> ServerResult<()> {
        match kind {
            WireCmd::BufferMapAsync => {
                let command = self.read(buffer)?;
                self.handle_buffer_map_async(command)
            }
            WireCmd::CommandEncoderFinish => {
                let command: CommandEncoderFinishCmd = self.read(buffer)?;
                self.objects
                    .check_allocation::<CommandBuffer>(command.result)?;
                let commands = self
                    .procs
                    .encoder_finish(command.encoder, command.descriptor.as_ref());
                self.objects.allocate(command.result, commands)
            }
            WireCmd::DestroyObject => {
                let command = self.read(buffer)?;
                self.handle_destroy_object(command)
            }
            WireCmd::DeviceCreateBindGroup => {
                let command: DeviceCreateBindGroupCmd = self.read(buffer)?;
                self.objects.check_allocation::<BindGroup>(command.result)?;
                let group = self
                    .procs
                    .create_bind_group(command.device, &command.descriptor);
                self.objects.allocate(command.result, group)
            }
            WireCmd::DeviceCreateBuffer => {
                let command: DeviceCreateBufferCmd = self.read(buffer)?;
                self.objects.check_allocation::<Buffer>(command.result)?;
                let created = self.procs.create_buffer(command.device, &command.descriptor);
                self.objects.allocate(command.result, created)
            }
            WireCmd::DeviceCreateCommandEncoder => {
                let command: DeviceCreateCommandEncoderCmd = self.read(buffer)?;
                self.objects
                    .check_allocation::<CommandEncoder>(command.result)?;
                let encoder = self
                    .procs
                    .create_command_encoder(command.device, command.descriptor.as_ref());
                self.objects.allocate(command.result, encoder)
            }
            WireCmd::DeviceCreateComputePipeline => {
                let command: DeviceCreateComputePipelineCmd = self.read(buffer)?;
                self.objects
                    .check_allocation::<ComputePipeline>(command.result)?;
                let pipeline = self
                    .procs
                    .create_compute_pipeline(command.device, &command.descriptor);
                self.objects.allocate(command.result, pipeline)
            }
            WireCmd::DeviceCreateShaderModule => {
                let command: DeviceCreateShaderModuleCmd = self.read(buffer)?;
                self.objects.check_allocation::<ShaderModule>(command.result)?;
                let module = self
                    .procs
                    .create_shader_module(command.device, &command.descriptor);
                self.objects.allocate(command.result, module)
            }
            WireCmd::QueueOnSubmittedWorkDone => {
                let command: QueueOnSubmittedWorkDoneCmd = self.read(buffer)?;
                let queue = self.live_handle(command.queue)?;
                let status = self.procs.queue_on_submitted_work_done(command.queue);
                self.send_return(&ReturnQueueWorkDoneCallbackCmd {
                    queue,
                    request_serial: command.request_serial,
                    status,
                })
            }
            WireCmd::QueueSubmit => {
                let command: QueueSubmitCmd = self.read(buffer)?;
                self.procs.queue_submit(command.queue, &command.commands);
                Ok(())
            }
            WireCmd::QueueWriteBuffer => {
                let command: QueueWriteBufferCmd = self.read(buffer)?;
                match self.procs.queue_write_buffer(
                    command.queue,
                    command.buffer,
                    command.buffer_offset,
                    &command.data,
                ) {
                    Ok(()) => Ok(()),
                    Err(err) => self.report_error(err),
                }
            }
            WireCmd::ShaderModuleGetCompilationInfo => {
                let command: ShaderModuleGetCompilationInfoCmd = self.read(buffer)?;
                let shader_module = self.live_handle(command.shader_module)?;
                let (status, info) = self
                    .procs
                    .shader_module_get_compilation_info(command.shader_module);
                self.send_return(&ReturnShaderModuleGetCompilationInfoCallbackCmd {
                    shader_module,
                    request_serial: command.request_serial,
                    status,
                    info,
                })
            }
        }
    }

    /// The buffer travels as a bare id here, so it is resolved by hand.
    fn handle_buffer_map_async(&mut self, command: BufferMapAsyncCmd) -> ServerResult<()> {
        let unknown = ServerError::UnknownObject {
            ty: ObjectType::Buffer,
            id: command.buffer_id,
        };
        let handle = self
            .objects
            .handle::<Buffer>(command.buffer_id)
            .ok_or(unknown.clone())?;
        let native = self
            .objects
            .table(ObjectType::Buffer)
            .get(command.buffer_id)
            .ok_or(unknown)?;

        let mut reply = ReturnBufferMapAsyncCallbackCmd {
            buffer: handle,
            request_serial: command.request_serial,
            status: MapAsyncStatus::ValidationError,
            data: Vec::new(),
        };
        if command.mode == MapMode::Read && !self.map_reply_fits(&reply, command.size)? {
            log::warn!(
                "read mapping of {} bytes does not fit in a {} byte return command",
                command.size,
                self.serializer.maximum_allocation_size()
            );
            return self.send_return(&reply);
        }

        let (status, data) = self.procs.buffer_map_async(
            Buffer::from_raw(native),
            command.mode,
            command.offset,
            command.size,
        );
        reply.status = status;
        reply.data = data;
        self.send_return(&reply)
    }

    /// Whether `reply` still fits the return stream once `size` bytes of
    /// mapped data are attached.
    fn map_reply_fits(
        &self,
        reply: &ReturnBufferMapAsyncCallbackCmd,
        size: u64,
    ) -> ServerResult<bool> {
        let data = usize::try_from(size)
            .ok()
            .and_then(|len| wire_align_sizeof_n::<u8>(len).ok());
        let Some(data) = data else {
            return Ok(false);
        };
        let total = WireCommand::required_size(reply)?.checked_add(data);
        Ok(total.is_some_and(|total| total <= self.serializer.maximum_allocation_size()))
    }

    fn handle_destroy_object(&mut self, command: DestroyObjectCmd) -> ServerResult<()> {
        let ty = command.object_type;
        let native = self.objects.free(ty, command.object_id)?;
        if ty == ObjectType::Device
            && self.device.map(|device| device.id) == Some(command.object_id)
        {
            self.device = None;
        }
        self.procs.release(ty, native);
        Ok(())
    }

    fn live_handle<T: WireObject>(&self, object: T) -> ServerResult<ObjectHandle> {
        self.objects
            .handle_of(object)
            .ok_or(ServerError::Wire(wire::WireError::ObjectsUnavailable { ty: T::TYPE }))
    }
}
