//! Client-side handle table.
//!
//! Ids are allocated per object type starting at 1 and recycled through a
//! free list. Reusing an id bumps its generation, so the server and any
//! in-flight callback can tell the new object apart from the one it replaced.
//! The native handle packs both halves: `generation << 32 | id`.

use std::num::NonZeroU64;

use common::{ObjectType, PerObjectType};
use wire::{ObjectHandle, ObjectId, ObjectIdProvider, WireError, WireObject, WireResult};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Default)]
struct Slots {
    /// Entry `i` describes id `i + 1`.
    entries: Vec<Slot>,
    free: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    live: bool,
}

impl Slots {
    fn get(&self, id: ObjectId) -> Option<&Slot> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.entries.get(index)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut Slot> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.entries.get_mut(index)
    }
}

pub(crate) fn raw_from_handle(handle: ObjectHandle) -> Option<NonZeroU64> {
    NonZeroU64::new((u64::from(handle.generation) << 32) | u64::from(handle.id.0))
}

pub(crate) fn handle_from_raw(raw: NonZeroU64) -> ObjectHandle {
    let raw = raw.get();
    ObjectHandle::new(ObjectId(raw as u32), (raw >> 32) as u32)
}

/// Live objects of every type, as known to the client.
#[derive(Debug, Default)]
pub struct ObjectStore {
    slots: PerObjectType<Slots>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh `(id, generation)` for a new object of type `T`.
    pub fn allocate<T: WireObject>(&mut self) -> ClientResult<(T, ObjectHandle)> {
        let handle = self.allocate_handle(T::TYPE)?;
        let raw = raw_from_handle(handle).ok_or(ClientError::IdsExhausted { ty: T::TYPE })?;
        Ok((T::from_raw(raw), handle))
    }

    fn allocate_handle(&mut self, ty: ObjectType) -> ClientResult<ObjectHandle> {
        let slots = &mut self.slots[ty];
        if let Some(id) = slots.free.pop() {
            let id = ObjectId(id);
            let slot = slots
                .get_mut(id)
                .ok_or(ClientError::IdsExhausted { ty })?;
            slot.generation += 1;
            slot.live = true;
            return Ok(ObjectHandle::new(id, slot.generation));
        }

        let id = slots
            .entries
            .len()
            .checked_add(1)
            .and_then(|next| u32::try_from(next).ok())
            .ok_or(ClientError::IdsExhausted { ty })?;
        slots.entries.push(Slot {
            generation: 0,
            live: true,
        });
        Ok(ObjectHandle::new(ObjectId(id), 0))
    }

    /// Forgets `object`. Its id becomes available again unless its
    /// generation cannot advance any further.
    pub fn free<T: WireObject>(&mut self, object: T) -> ClientResult<ObjectHandle> {
        let handle = handle_from_raw(object.raw());
        let slots = &mut self.slots[T::TYPE];
        let slot = slots
            .get_mut(handle.id)
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .ok_or(ClientError::StaleObject {
                ty: T::TYPE,
                handle,
            })?;
        slot.live = false;
        if slot.generation < u32::MAX {
            slots.free.push(handle.id.0);
        }
        Ok(handle)
    }

    pub fn handle<T: WireObject>(&self, object: T) -> ObjectHandle {
        handle_from_raw(object.raw())
    }

    /// Whether `handle` names the current occupant of its id.
    pub fn is_live(&self, ty: ObjectType, handle: ObjectHandle) -> bool {
        self.slots[ty]
            .get(handle.id)
            .is_some_and(|slot| slot.live && slot.generation == handle.generation)
    }

    /// The object `handle` names, if it is still live.
    pub fn lookup<T: WireObject>(&self, handle: ObjectHandle) -> Option<T> {
        if !self.is_live(T::TYPE, handle) {
            return None;
        }
        raw_from_handle(handle).map(T::from_raw)
    }

    pub fn live_count(&self, ty: ObjectType) -> usize {
        self.slots[ty].entries.iter().filter(|slot| slot.live).count()
    }
}

impl ObjectIdProvider for ObjectStore {
    fn get_raw_id(&self, ty: ObjectType, raw: NonZeroU64) -> WireResult<ObjectId> {
        let handle = handle_from_raw(raw);
        if self.is_live(ty, handle) {
            Ok(handle.id)
        } else {
            Err(WireError::UnknownObject { ty, id: handle.id })
        }
    }
}
