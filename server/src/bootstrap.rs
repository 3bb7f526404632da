//! Objects that exist before the first command arrives.
//!
//! The client reserves a device, its queue and one bind group layout before
//! it sends anything, which gives each of them id 1 at generation 0. The
//! server creates the native objects and injects them under that handle.

use wire::object::{BindGroupLayout, Device, Queue};
use wire::{CommandSerializer, ObjectHandle, ObjectId};

use crate::error::ServerResult;
use crate::procs::{Procs, RecordingProcs};
use crate::server::Server;

/// Handle of every bootstrap object.
pub const BOOTSTRAP_HANDLE: ObjectHandle = ObjectHandle::new(ObjectId(1), 0);

#[derive(Debug, Clone, Copy)]
pub struct BootstrapObjects {
    pub device: Device,
    pub queue: Queue,
    pub bind_group_layout: BindGroupLayout,
}

pub fn inject_bootstrap_objects<S: CommandSerializer>(
    server: &mut Server<RecordingProcs, S>,
) -> ServerResult<BootstrapObjects> {
    let procs = server.procs_mut();
    let device = procs.create_device();
    let queue = procs.device_get_queue(device);
    let bind_group_layout = procs.create_bind_group_layout(device);

    server.inject(device, BOOTSTRAP_HANDLE)?;
    server.inject(queue, BOOTSTRAP_HANDLE)?;
    server.inject(bind_group_layout, BOOTSTRAP_HANDLE)?;
    log::info!("injected bootstrap device, queue and bind group layout");
    Ok(BootstrapObjects {
        device,
        queue,
        bind_group_layout,
    })
}
