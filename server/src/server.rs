//! Server end of a wire session.
//!
//! [`Server::handle_commands`] decodes the client's command stream, checks
//! every object reference against [`ServerObjects`], forwards the call to a
//! [`Procs`] implementation and writes callbacks back through a
//! [`CommandSerializer`].

use wire::schema::{ReturnDeviceUncapturedErrorCallbackCmd, WireCmd};
use wire::{
    CmdHeader, CodecLimits, CommandSerializer, DeserializeBuffer, NoObjects, ObjectHandle,
    WireCommand, WireDeserializeAllocator, WireError, WireObject, CMD_HEADER_SIZE,
};

use common::ObjectType;

use crate::error::{ServerError, ServerResult};
use crate::objects::ServerObjects;
use crate::procs::{ProcError, Procs};

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub commands: u64,
    pub returns: u64,
    pub bytes: u64,
}

pub struct Server<P, S> {
    pub(crate) procs: P,
    pub(crate) serializer: S,
    pub(crate) objects: ServerObjects,
    pub(crate) arena: WireDeserializeAllocator,
    limits: CodecLimits,
    pub(crate) device: Option<ObjectHandle>,
    terminated: bool,
    pub(crate) stats: SessionStats,
}

impl<P: Procs, S: CommandSerializer> Server<P, S> {
    pub fn new(procs: P, serializer: S, limits: CodecLimits) -> Self {
        Self {
            procs,
            serializer,
            objects: ServerObjects::new(),
            arena: WireDeserializeAllocator::new(limits.max_allocation_size),
            limits,
            device: None,
            terminated: false,
            stats: SessionStats::default(),
        }
    }

    pub fn procs(&self) -> &P {
        &self.procs
    }

    pub fn procs_mut(&mut self) -> &mut P {
        &mut self.procs
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn serializer_mut(&mut self) -> &mut S {
        &mut self.serializer
    }

    pub fn objects(&self) -> &ServerObjects {
        &self.objects
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Largest arena footprint of any single command so far.
    pub fn peak_allocation(&self) -> usize {
        self.arena.peak()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Registers an object created outside the command stream under the
    /// handle the client reserved for it.
    ///
    /// The most recently injected device receives uncaptured errors.
    pub fn inject<T: WireObject>(&mut self, object: T, handle: ObjectHandle) -> ServerResult<()> {
        self.ensure_running()?;
        self.objects.allocate(handle, object)?;
        if T::TYPE == ObjectType::Device {
            self.device = Some(handle);
        }
        log::debug!("injected {} {}", T::TYPE, handle);
        Ok(())
    }

    /// Executes every command in `bytes`.
    ///
    /// The first malformed command terminates the session: the error is
    /// logged, returned, and every later call fails with
    /// [`ServerError::Terminated`].
    pub fn handle_commands(&mut self, bytes: &[u8]) -> ServerResult<()> {
        self.ensure_running()?;
        match self.dispatch_all(bytes) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::error!("terminating wire session: {err}");
                self.terminated = true;
                Err(err)
            }
        }
    }

    pub fn flush(&mut self) -> ServerResult<()> {
        self.ensure_running()?;
        Ok(self.serializer.flush()?)
    }

    fn ensure_running(&self) -> ServerResult<()> {
        if self.terminated {
            return Err(ServerError::Terminated);
        }
        Ok(())
    }

    fn dispatch_all(&mut self, bytes: &[u8]) -> ServerResult<()> {
        let mut buffer = DeserializeBuffer::new(bytes);
        while buffer.available_size() >= CMD_HEADER_SIZE {
            let header: CmdHeader = buffer.peek()?;
            let kind = WireCmd::from_wire(header.command_id).ok_or(WireError::UnknownCommand {
                value: header.command_id,
            })?;
            if header.command_size > self.limits.max_command_size as u64 {
                return Err(WireError::CommandTooLarge {
                    limit: self.limits.max_command_size,
                    actual: usize::try_from(header.command_size).unwrap_or(usize::MAX),
                }
                .into());
            }

            log::debug!("handling {kind:?} ({} bytes)", header.command_size);
            self.arena.reset();
            self.dispatch(kind, &mut buffer)?;
            self.stats.commands += 1;
            self.stats.bytes += header.command_size;
        }

        let remaining = buffer.available_size();
        if remaining != 0 {
            return Err(WireError::TrailingBytes { remaining }.into());
        }
        Ok(())
    }

    pub(crate) fn send_return<C: WireCommand>(&mut self, command: &C) -> ServerResult<()> {
        wire::serialize_command(&mut self.serializer, command, &NoObjects)?;
        self.stats.returns += 1;
        log::debug!("returned {:?}", C::KIND);
        Ok(())
    }

    /// Reports a failed GPU call through the device's error callback.
    pub(crate) fn report_error(&mut self, err: ProcError) -> ServerResult<()> {
        log::warn!("{:?} error: {}", err.error_type, err.message);
        self.send_return(&ReturnDeviceUncapturedErrorCallbackCmd {
            device: self.device.unwrap_or_default(),
            error_type: err.error_type,
            message: err.message,
        })
    }
}
