#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroU64;

use common::ObjectType;
use wire::{ObjectId, ObjectIdProvider, ObjectIdResolver, WireError, WireObject, WireResult};

/// Handle table shared by both directions of a test: raw handles are
/// `id + 1000` so a mix-up between the two spaces shows in assertions.
#[derive(Default)]
pub struct TestObjects {
    by_raw: HashMap<(ObjectType, NonZeroU64), ObjectId>,
    by_id: HashMap<(ObjectType, ObjectId), NonZeroU64>,
}

impl TestObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: WireObject>(&mut self, id: u32) -> T {
        let raw = NonZeroU64::new(u64::from(id) + 1000).expect("raw handle is non-zero");
        self.by_raw.insert((T::TYPE, raw), ObjectId(id));
        self.by_id.insert((T::TYPE, ObjectId(id)), raw);
        T::from_raw(raw)
    }

    pub fn remove<T: WireObject>(&mut self, object: T) {
        if let Some(id) = self.by_raw.remove(&(T::TYPE, object.raw())) {
            self.by_id.remove(&(T::TYPE, id));
        }
    }
}

impl ObjectIdProvider for TestObjects {
    fn get_raw_id(&self, ty: ObjectType, raw: NonZeroU64) -> WireResult<ObjectId> {
        self.by_raw
            .get(&(ty, raw))
            .copied()
            .ok_or(WireError::UnknownObject {
                ty,
                id: ObjectId::NULL,
            })
    }
}

impl ObjectIdResolver for TestObjects {
    fn get_raw_from_id(&self, ty: ObjectType, id: ObjectId) -> WireResult<NonZeroU64> {
        self.by_id
            .get(&(ty, id))
            .copied()
            .ok_or(WireError::UnknownObject { ty, id })
    }
}

/// Serializes one command into a buffer of exactly its required size.
pub fn encode<C: wire::WireCommand>(command: &C, objects: &TestObjects) -> Vec<u8> {
    let size = command.required_size().expect("command size");
    let mut bytes = vec![0u8; size];
    command
        .serialize_command(size, &mut wire::SerializeBuffer::new(&mut bytes), objects)
        .expect("serialize command");
    bytes
}

/// Deserializes one command with a generous arena.
pub fn decode<C: wire::WireCommand>(bytes: &[u8], objects: &TestObjects) -> WireResult<C> {
    let mut arena = wire::WireDeserializeAllocator::new(1 << 20);
    C::deserialize_command(&mut wire::DeserializeBuffer::new(bytes), &mut arena, objects)
}
