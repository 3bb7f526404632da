#![allow(dead_code)]

use client::Client;
use server::{inject_bootstrap_objects, RecordingProcs, Server, BOOTSTRAP_HANDLE};
use wire::object::{BindGroupLayout, Device, Queue};
use wire::{CmdHeader, CodecLimits, DeserializeBuffer, ObjectHandle, VecCommandSerializer};

pub type TestServer = Server<RecordingProcs, VecCommandSerializer>;
pub type TestClient = Client<VecCommandSerializer>;

pub struct Session {
    pub server: TestServer,
    pub client: TestClient,
    pub device: Device,
    pub queue: Queue,
    pub layout: BindGroupLayout,
}

pub fn session() -> Session {
    session_with_limits(CodecLimits::default())
}

/// A client and a server that agree on the bootstrap objects.
pub fn session_with_limits(limits: CodecLimits) -> Session {
    let mut server = Server::new(
        RecordingProcs::new(),
        VecCommandSerializer::new(1 << 20),
        limits,
    );
    inject_bootstrap_objects(&mut server).expect("inject bootstrap objects");

    let mut client = Client::new(VecCommandSerializer::new(1 << 20), CodecLimits::default());
    let (device, device_handle) = client.reserve::<Device>().expect("reserve device");
    let (queue, queue_handle) = client.reserve::<Queue>().expect("reserve queue");
    let (layout, layout_handle) = client
        .reserve::<BindGroupLayout>()
        .expect("reserve layout");
    for handle in [device_handle, queue_handle, layout_handle] {
        assert_eq!(handle, BOOTSTRAP_HANDLE);
    }

    Session {
        server,
        client,
        device,
        queue,
        layout,
    }
}

impl Session {
    /// Commands the client has written since the last call.
    pub fn take_commands(&mut self) -> Vec<u8> {
        self.client.serializer_mut().take()
    }

    /// Runs the client's pending commands on the server and feeds the
    /// returns back to the client.
    pub fn round_trip(&mut self) {
        let commands = self.take_commands();
        self.server
            .handle_commands(&commands)
            .expect("server rejected the command stream");
        let returns = self.server.serializer_mut().take();
        self.client
            .handle_commands(&returns)
            .expect("client rejected the return stream");
    }
}

/// Start offset of every command in `stream`.
pub fn command_offsets(stream: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut buffer = DeserializeBuffer::new(stream);
    while buffer.available_size() > 0 {
        offsets.push(buffer.consumed());
        let header: CmdHeader = buffer.peek().expect("command header");
        buffer
            .split(header.command_size as usize)
            .expect("whole command");
    }
    offsets
}

pub fn patch_u32(stream: &mut [u8], offset: usize, value: u32) {
    stream[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn patch_handle(stream: &mut [u8], offset: usize, handle: ObjectHandle) {
    patch_u32(stream, offset, handle.id.0);
    patch_u32(stream, offset + 4, handle.generation);
}
