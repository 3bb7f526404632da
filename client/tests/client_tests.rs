use std::collections::HashMap;

use client::{Client, ClientError, ClientEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wire::object::{Buffer, Device, Queue};
use wire::schema::*;
use wire::{
    CmdHeader, CodecLimits, DeserializeBuffer, NoObjects, ObjectHandle, VecCommandSerializer,
    WireCommand, WireError, WireObject, peek_command_id,
};

fn new_client() -> Client<VecCommandSerializer> {
    Client::new(VecCommandSerializer::new(1 << 20), CodecLimits::default())
}

fn return_stream<C: WireCommand>(commands: &[C]) -> Vec<u8> {
    let mut serializer = VecCommandSerializer::new(1 << 20);
    for command in commands {
        wire::serialize_command(&mut serializer, command, &NoObjects).expect("serialize");
    }
    serializer.take()
}

fn setup() -> (Client<VecCommandSerializer>, Device, Queue) {
    let mut client = new_client();
    let (device, _) = client.reserve::<Device>().expect("reserve device");
    let (queue, _) = client.reserve::<Queue>().expect("reserve queue");
    (client, device, queue)
}

fn staging_buffer(client: &mut Client<VecCommandSerializer>, device: Device) -> Buffer {
    client
        .create_buffer(
            device,
            BufferDescriptor {
                label: Some("staging".into()),
                usage: buffer_usage::MAP_READ | buffer_usage::COPY_DST,
                size: 16,
                ..BufferDescriptor::default()
            },
        )
        .expect("create buffer")
}

#[test]
fn test_commands_are_written_in_call_order() {
    let (mut client, device, queue) = setup();
    let buffer = staging_buffer(&mut client, device);
    client
        .queue_write_buffer(queue, buffer, 0, &[1, 2, 3, 4])
        .unwrap();
    client.release(buffer).unwrap();

    let bytes = client.serializer_mut().take();
    let mut reader = DeserializeBuffer::new(&bytes);
    let mut kinds = Vec::new();
    while reader.available_size() > 0 {
        let id = peek_command_id(&reader).unwrap();
        kinds.push(WireCmd::from_wire(id).unwrap());
        let header: CmdHeader = reader.peek().unwrap();
        reader.split(header.command_size as usize).unwrap();
    }
    assert_eq!(
        kinds,
        vec![
            WireCmd::DeviceCreateBuffer,
            WireCmd::QueueWriteBuffer,
            WireCmd::DestroyObject
        ]
    );
}

#[test]
fn test_map_callback_is_delivered() {
    let (mut client, device, _) = setup();
    let buffer = staging_buffer(&mut client, device);
    let serial = client
        .buffer_map_async(buffer, MapMode::Read, 0, 4)
        .unwrap();

    let stream = return_stream(&[ReturnBufferMapAsyncCallbackCmd {
        buffer: client.objects().handle(buffer),
        request_serial: serial,
        status: MapAsyncStatus::Success,
        data: vec![9, 8, 7, 6],
    }]);
    client.handle_commands(&stream).unwrap();

    assert_eq!(
        client.drain_events(),
        vec![ClientEvent::BufferMapped {
            buffer: Some(buffer),
            request_serial: serial,
            status: MapAsyncStatus::Success,
            data: vec![9, 8, 7, 6],
        }]
    );
    assert_eq!(client.pending_requests(), 0);
}

#[test]
fn test_callback_for_a_reused_id_does_not_reach_the_new_object() {
    let (mut client, device, _) = setup();
    let old = staging_buffer(&mut client, device);
    let old_handle = client.objects().handle(old);
    let serial = client.buffer_map_async(old, MapMode::Read, 0, 4).unwrap();
    client.release(old).unwrap();

    // Same id, next generation.
    let new = staging_buffer(&mut client, device);
    let new_handle = client.objects().handle(new);
    assert_eq!(new_handle.id, old_handle.id);
    assert_eq!(new_handle.generation, old_handle.generation + 1);

    let stream = return_stream(&[ReturnBufferMapAsyncCallbackCmd {
        buffer: old_handle,
        request_serial: serial,
        status: MapAsyncStatus::DestroyedBeforeCallback,
        data: vec![],
    }]);
    client.handle_commands(&stream).unwrap();

    match client.drain_events().as_slice() {
        [ClientEvent::BufferMapped { buffer, .. }] => assert_eq!(*buffer, None),
        other => panic!("unexpected events {other:?}"),
    }
    assert!(client.objects().is_live(Buffer::TYPE, new_handle));
}

#[test]
fn test_work_done_and_compilation_info() {
    let (mut client, device, queue) = setup();
    let module = client
        .create_shader_module(
            device,
            ShaderModuleDescriptor {
                chain: vec![
                    ShaderModuleWgslDescriptor {
                        code: "@compute @workgroup_size(1) fn main() {}".into(),
                    }
                    .into(),
                ],
                label: None,
            },
        )
        .unwrap();
    let work_serial = client.queue_on_submitted_work_done(queue).unwrap();
    let info_serial = client.get_compilation_info(module).unwrap();

    let mut stream = return_stream(&[ReturnQueueWorkDoneCallbackCmd {
        queue: client.objects().handle(queue),
        request_serial: work_serial,
        status: QueueWorkDoneStatus::Success,
    }]);
    stream.extend(return_stream(&[
        ReturnShaderModuleGetCompilationInfoCallbackCmd {
            shader_module: client.objects().handle(module),
            request_serial: info_serial,
            status: CompilationInfoRequestStatus::Success,
            info: Some(CompilationInfo::default()),
        },
    ]));
    client.handle_commands(&stream).unwrap();

    let events = client.drain_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].request_serial(), Some(work_serial));
    assert!(matches!(
        &events[1],
        ClientEvent::CompilationInfo {
            shader_module: Some(m),
            info: Some(_),
            ..
        } if *m == module
    ));
}

#[test]
fn test_unknown_request_serial_ends_the_session() {
    let (mut client, _, queue) = setup();
    let stream = return_stream(&[ReturnQueueWorkDoneCallbackCmd {
        queue: client.objects().handle(queue),
        request_serial: 42,
        status: QueueWorkDoneStatus::Success,
    }]);
    assert_eq!(
        client.handle_commands(&stream),
        Err(ClientError::UnknownRequest { serial: 42 })
    );
    assert!(client.is_disconnected());
    assert_eq!(client.handle_commands(&[]), Err(ClientError::Disconnected));
    assert_eq!(
        client.queue_on_submitted_work_done(queue),
        Err(ClientError::Disconnected)
    );
}

#[test]
fn test_malformed_return_streams_are_fatal() {
    let (mut client, _, _) = setup();
    let mut stream = return_stream(&[ReturnDeviceUncapturedErrorCallbackCmd {
        device: ObjectHandle::default(),
        error_type: ErrorType::Internal,
        message: "lost".into(),
    }]);
    stream.extend_from_slice(&[0; 8]);
    assert_eq!(
        client.handle_commands(&stream),
        Err(ClientError::Wire(WireError::TrailingBytes { remaining: 8 }))
    );

    let (mut client, _, _) = setup();
    let mut stream = vec![0u8; 16];
    stream[..8].copy_from_slice(&16u64.to_le_bytes());
    stream[8..12].copy_from_slice(&99u32.to_le_bytes());
    assert_eq!(
        client.handle_commands(&stream),
        Err(ClientError::Wire(WireError::UnknownCommand { value: 99 }))
    );
}

#[test]
fn test_uncaptured_error_names_the_device() {
    let (mut client, device, _) = setup();
    let stream = return_stream(&[ReturnDeviceUncapturedErrorCallbackCmd {
        device: client.objects().handle(device),
        error_type: ErrorType::Validation,
        message: "invalid usage".into(),
    }]);
    client.handle_commands(&stream).unwrap();
    assert_eq!(
        client.drain_events(),
        vec![ClientEvent::UncapturedError {
            device: Some(device),
            error_type: ErrorType::Validation,
            message: "invalid usage".into(),
        }]
    );
}

#[test]
fn test_random_create_release_churn_keeps_handles_unique() {
    let (mut client, device, _) = setup();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut live: Vec<Buffer> = Vec::new();
    let mut last_generation: HashMap<u32, u32> = HashMap::new();

    for _ in 0..2000 {
        if live.is_empty() || rng.gen_bool(0.55) {
            let buffer = staging_buffer(&mut client, device);
            let handle = client.objects().handle(buffer);
            if let Some(previous) = last_generation.insert(handle.id.0, handle.generation) {
                assert!(handle.generation > previous, "generation went backwards");
            }
            live.push(buffer);
        } else {
            let index = rng.gen_range(0..live.len());
            let buffer = live.swap_remove(index);
            client.release(buffer).unwrap();
        }
    }

    let mut ids: Vec<u32> = live
        .iter()
        .map(|buffer| client.objects().handle(*buffer).id.0)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), live.len());
    assert_eq!(client.objects().live_count(Buffer::TYPE), live.len());
    assert!(!client.is_disconnected());
}
