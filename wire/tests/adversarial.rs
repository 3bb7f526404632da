//! Hostile input: every malformed stream must fail cleanly, never panic.

mod support;

use common::ObjectType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use support::{TestObjects, decode, encode};
use wire::object::{Buffer, CommandBuffer, Device, Queue, ShaderModule};
use wire::schema::*;
use wire::{
    DeserializeBuffer, ObjectHandle, ObjectId, WireCommand, WireDeserializeAllocator, WireError,
};

fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_buffer_command(objects: &mut TestObjects) -> QueueWriteBufferCmd {
    QueueWriteBufferCmd {
        queue: objects.add::<Queue>(2),
        buffer: objects.add::<Buffer>(4),
        buffer_offset: 0,
        data: vec![7; 24],
    }
}

fn create_buffer_command(objects: &mut TestObjects) -> DeviceCreateBufferCmd {
    DeviceCreateBufferCmd {
        device: objects.add::<Device>(1),
        descriptor: BufferDescriptor {
            chain: vec![],
            label: Some("vertices".into()),
            usage: buffer_usage::STORAGE,
            size: 1024,
            mapped_at_creation: false,
        },
        result: ObjectHandle::new(ObjectId(4), 0),
    }
}

#[test]
fn test_huge_array_count_is_rejected() {
    let mut objects = TestObjects::new();
    let mut bytes = encode(&write_buffer_command(&mut objects), &objects);

    for forged in [u64::MAX, u64::MAX / 8, 1 << 40, 25] {
        put_u64(&mut bytes, 24, forged);
        let err = decode::<QueueWriteBufferCmd>(&bytes, &objects).unwrap_err();
        assert!(
            matches!(
                err,
                WireError::SizeOverflow
                    | WireError::BufferExhausted { .. }
                    | WireError::ValueOutOfRange { .. }
            ),
            "count {forged} gave {err:?}"
        );
    }
}

#[test]
fn test_huge_string_length_is_rejected() {
    let mut objects = TestObjects::new();
    let mut bytes = encode(&create_buffer_command(&mut objects), &objects);
    // label_strlen is the first field of the inline descriptor
    put_u64(&mut bytes, 16, u64::MAX - 3);
    assert!(decode::<DeviceCreateBufferCmd>(&bytes, &objects).is_err());
}

#[test]
fn test_forged_object_ids_are_rejected() {
    let mut objects = TestObjects::new();
    let queue: Queue = objects.add(2);
    let commands: CommandBuffer = objects.add(5);
    let mut bytes = encode(
        &QueueSubmitCmd {
            queue,
            commands: vec![commands],
        },
        &objects,
    );

    put_u32(&mut bytes, 32, 77);
    assert_eq!(
        decode::<QueueSubmitCmd>(&bytes, &objects).unwrap_err(),
        WireError::UnknownObject {
            ty: ObjectType::CommandBuffer,
            id: ObjectId(77)
        }
    );

    // An id that exists, but for another object type.
    put_u32(&mut bytes, 32, 2);
    assert_eq!(
        decode::<QueueSubmitCmd>(&bytes, &objects).unwrap_err(),
        WireError::UnknownObject {
            ty: ObjectType::CommandBuffer,
            id: ObjectId(2)
        }
    );
}

#[test]
fn test_null_required_object_is_rejected() {
    let mut objects = TestObjects::new();
    let mut bytes = encode(&create_buffer_command(&mut objects), &objects);
    put_u32(&mut bytes, 56, 0);
    assert_eq!(
        decode::<DeviceCreateBufferCmd>(&bytes, &objects).unwrap_err(),
        WireError::NullObject {
            ty: ObjectType::Device
        }
    );
}

#[test]
fn test_released_object_is_rejected() {
    let mut objects = TestObjects::new();
    let command = write_buffer_command(&mut objects);
    let bytes = encode(&command, &objects);
    objects.remove(command.buffer);
    assert!(matches!(
        decode::<QueueWriteBufferCmd>(&bytes, &objects),
        Err(WireError::UnknownObject {
            ty: ObjectType::Buffer,
            ..
        })
    ));
}

#[test]
fn test_every_truncation_fails() {
    let mut objects = TestObjects::new();
    let bytes = encode(&create_buffer_command(&mut objects), &objects);
    for len in 0..bytes.len() {
        assert!(
            decode::<DeviceCreateBufferCmd>(&bytes[..len], &objects).is_err(),
            "prefix of {len} bytes decoded"
        );
    }
}

#[test]
fn test_declared_size_beyond_stream_is_rejected() {
    let mut objects = TestObjects::new();
    let mut bytes = encode(&write_buffer_command(&mut objects), &objects);
    let real = bytes.len() as u64;
    put_u64(&mut bytes, 0, real + 8);
    assert!(matches!(
        decode::<QueueWriteBufferCmd>(&bytes, &objects),
        Err(WireError::InvalidCommandSize { .. })
    ));
}

#[test]
fn test_invalid_flags_and_enums_are_rejected() {
    let mut objects = TestObjects::new();
    let device: Device = objects.add(1);

    let mut bytes = encode(
        &DeviceCreateCommandEncoderCmd {
            device,
            descriptor: None,
            result: ObjectHandle::new(ObjectId(6), 0),
        },
        &objects,
    );
    put_u32(&mut bytes, 28, 2);
    assert_eq!(
        decode::<DeviceCreateCommandEncoderCmd>(&bytes, &objects).unwrap_err(),
        WireError::InvalidBool { value: 2 }
    );

    let mut bytes = encode(
        &DestroyObjectCmd {
            object_type: ObjectType::Buffer,
            object_id: ObjectId(4),
        },
        &objects,
    );
    put_u32(&mut bytes, 16, 99);
    assert!(matches!(
        decode::<DestroyObjectCmd>(&bytes, &objects),
        Err(WireError::InvalidEnum { value: 99, .. })
    ));
}

#[test]
fn test_arena_exhaustion_is_fatal() {
    let mut objects = TestObjects::new();
    let command = write_buffer_command(&mut objects);
    let bytes = encode(&command, &objects);

    let mut arena = WireDeserializeAllocator::new(8);
    let err = QueueWriteBufferCmd::deserialize_command(
        &mut DeserializeBuffer::new(&bytes),
        &mut arena,
        &objects,
    )
    .unwrap_err();
    assert_eq!(err, WireError::AllocationFailed { requested: 24 });

    let mut arena = WireDeserializeAllocator::new(24);
    assert!(
        QueueWriteBufferCmd::deserialize_command(
            &mut DeserializeBuffer::new(&bytes),
            &mut arena,
            &objects,
        )
        .is_ok()
    );
}

#[test]
fn test_random_corruption_never_panics() {
    let mut rng = StdRng::seed_from_u64(0xbad_c0de);
    let mut objects = TestObjects::new();
    let module: ShaderModule = objects.add(2);
    let device: Device = objects.add(1);
    let original = encode(
        &DeviceCreateComputePipelineCmd {
            device,
            descriptor: ComputePipelineDescriptor {
                chain: vec![PrimitiveDepthClipControl {
                    unclipped_depth: true,
                }
                .into()],
                label: Some("fuzz".into()),
                layout: None,
                compute: ProgrammableStageDescriptor {
                    module,
                    entry_point: "main".into(),
                    constants: vec![ConstantEntry {
                        key: "k".into(),
                        value: 1.0,
                    }],
                },
            },
            result: ObjectHandle::new(ObjectId(3), 0),
        },
        &objects,
    );

    for _ in 0..2000 {
        let mut bytes = original.clone();
        for _ in 0..rng.gen_range(1..4) {
            let at = rng.gen_range(0..bytes.len());
            bytes[at] = rng.r#gen();
        }
        let mut arena = WireDeserializeAllocator::new(1 << 16);
        let _ = DeviceCreateComputePipelineCmd::deserialize_command(
            &mut DeserializeBuffer::new(&bytes),
            &mut arena,
            &objects,
        );
        assert!(arena.used() <= arena.capacity());
    }
}
