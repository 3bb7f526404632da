mod support;

use common::ObjectType;
use server::{Procs, ServerError, BOOTSTRAP_HANDLE};
use support::{command_offsets, patch_handle, patch_u32, session, session_with_limits};
use wire::schema::*;
use wire::{CodecLimits, ObjectHandle, ObjectId, WireError};

/// Offset of `result` inside a `DeviceCreateBuffer` command.
const CREATE_BUFFER_RESULT: usize = 48;
/// Offset of `device` inside a `DeviceCreateBuffer` command.
const CREATE_BUFFER_DEVICE: usize = 56;

fn small_buffer() -> BufferDescriptor {
    BufferDescriptor {
        size: 16,
        usage: buffer_usage::COPY_DST,
        ..BufferDescriptor::default()
    }
}

#[test]
fn test_unknown_command_terminates_the_session() {
    let mut s = session();
    let mut stream = vec![0u8; 16];
    stream[..8].copy_from_slice(&16u64.to_le_bytes());
    patch_u32(&mut stream, 8, 4242);

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::Wire(WireError::UnknownCommand { value: 4242 }))
    );
    assert!(s.server.is_terminated());
    assert_eq!(s.server.handle_commands(&[]), Err(ServerError::Terminated));
    assert_eq!(s.server.flush(), Err(ServerError::Terminated));
}

#[test]
fn test_partial_header_is_fatal() {
    let mut s = session();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let mut stream = s.take_commands();
    stream.extend_from_slice(&[0; 8]);

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::Wire(WireError::TrailingBytes { remaining: 8 }))
    );
    // Commands before the bad tail still ran.
    assert_eq!(s.server.objects().table(ObjectType::Buffer).live_count(), 1);
}

#[test]
fn test_truncated_command_is_fatal() {
    let mut s = session();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let stream = s.take_commands();

    let result = s.server.handle_commands(&stream[..stream.len() - 8]);
    assert!(matches!(
        result,
        Err(ServerError::Wire(WireError::InvalidCommandSize { .. }))
    ));
}

#[test]
fn test_null_result_id_is_fatal() {
    let mut s = session();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let mut stream = s.take_commands();
    patch_handle(&mut stream, CREATE_BUFFER_RESULT, ObjectHandle::default());

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::NullObjectId {
            ty: ObjectType::Buffer
        })
    );
    // Only the bootstrap device was created.
    assert_eq!(s.server.procs().calls().len(), 1);
}

#[test]
fn test_creating_over_a_live_id_is_fatal() {
    let mut s = session();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let mut stream = s.take_commands();
    let second = command_offsets(&stream)[1];
    patch_handle(
        &mut stream,
        second + CREATE_BUFFER_RESULT,
        ObjectHandle::new(ObjectId(1), 0),
    );

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::ObjectAlreadyLive {
            ty: ObjectType::Buffer,
            id: ObjectId(1)
        })
    );
}

#[test]
fn test_reusing_an_id_without_a_new_generation_is_fatal() {
    let mut s = session();
    let buffer = s.client.create_buffer(s.device, small_buffer()).unwrap();
    s.client.release(buffer).unwrap();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let mut stream = s.take_commands();
    let third = command_offsets(&stream)[2];
    patch_u32(&mut stream, third + CREATE_BUFFER_RESULT + 4, 0);

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::StaleGeneration {
            ty: ObjectType::Buffer,
            handle: ObjectHandle::new(ObjectId(1), 0),
            previous: 0
        })
    );
}

#[test]
fn test_forged_object_reference_is_fatal() {
    let mut s = session();
    s.client.create_buffer(s.device, small_buffer()).unwrap();
    let mut stream = s.take_commands();
    patch_u32(&mut stream, CREATE_BUFFER_DEVICE, 7);

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::Wire(WireError::UnknownObject {
            ty: ObjectType::Device,
            id: ObjectId(7)
        }))
    );
}

#[test]
fn test_destroying_an_unknown_object_is_fatal() {
    let mut s = session();
    let buffer = s.client.create_buffer(s.device, small_buffer()).unwrap();
    s.client.release(buffer).unwrap();
    let stream = s.take_commands();
    let destroy = stream[command_offsets(&stream)[1]..].to_vec();

    s.server.handle_commands(&stream).unwrap();
    assert_eq!(
        s.server.handle_commands(&destroy),
        Err(ServerError::UnknownObject {
            ty: ObjectType::Buffer,
            id: ObjectId(1)
        })
    );
}

#[test]
fn test_destroyed_device_no_longer_resolves() {
    let mut s = session();
    s.client.release(s.device).unwrap();
    let stream = s.take_commands();
    s.server.handle_commands(&stream).unwrap();
    assert_eq!(s.server.objects().table(ObjectType::Device).live_count(), 0);

    // Forge a creation on the destroyed device.
    let mut other = session();
    other
        .client
        .create_buffer(other.device, small_buffer())
        .unwrap();
    let create = other.take_commands();
    assert_eq!(
        s.server.handle_commands(&create),
        Err(ServerError::Wire(WireError::UnknownObject {
            ty: ObjectType::Device,
            id: ObjectId(1)
        }))
    );
}

#[test]
fn test_command_size_limit_is_enforced() {
    let mut s = session_with_limits(CodecLimits {
        max_command_size: 64,
        ..CodecLimits::default()
    });
    let buffer = s.client.create_buffer(s.device, small_buffer()).unwrap();
    s.client
        .queue_write_buffer(s.queue, buffer, 0, &[7; 128])
        .unwrap();
    let stream = s.take_commands();

    let result = s.server.handle_commands(&stream);
    assert!(matches!(
        result,
        Err(ServerError::Wire(WireError::CommandTooLarge { limit: 64, .. }))
    ));
}

#[test]
fn test_allocation_limit_is_enforced() {
    let mut s = session_with_limits(CodecLimits {
        max_allocation_size: 16,
        ..CodecLimits::default()
    });
    let buffer = s.client.create_buffer(s.device, small_buffer()).unwrap();
    s.client.queue_write_buffer(s.queue, buffer, 0, &[1; 8]).unwrap();
    s.client
        .queue_write_buffer(s.queue, buffer, 0, &[1; 64])
        .unwrap();
    let stream = s.take_commands();

    assert_eq!(
        s.server.handle_commands(&stream),
        Err(ServerError::Wire(WireError::AllocationFailed { requested: 64 }))
    );
    // The arena is reset between commands, so the small write fit.
    assert!(s.server.peak_allocation() <= 16);
}

#[test]
fn test_inject_refuses_a_live_handle() {
    let mut s = session();
    let device = s.server.procs_mut().create_device();
    assert_eq!(
        s.server.inject(device, BOOTSTRAP_HANDLE),
        Err(ServerError::ObjectAlreadyLive {
            ty: ObjectType::Device,
            id: ObjectId(1)
        })
    );
}
