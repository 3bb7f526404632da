//! Server-side table of the objects a client has created.
//!
//! Each entry remembers the generation it was created with, and keeps
//! remembering it after the object is destroyed, so that a client reusing an
//! id must also advance the generation.

use std::collections::HashMap;
use std::num::NonZeroU64;

use common::{ObjectType, PerObjectType};
use wire::{ObjectHandle, ObjectId, ObjectIdResolver, WireError, WireObject, WireResult};

use crate::error::{ServerError, ServerResult};

#[derive(Debug, Clone, Copy)]
struct Entry {
    generation: u32,
    /// Native object while live.
    native: Option<NonZeroU64>,
}

/// Objects of one type, keyed by wire id.
#[derive(Debug, Default)]
pub struct KnownObjects {
    entries: HashMap<ObjectId, Entry>,
    by_native: HashMap<NonZeroU64, ObjectId>,
}

impl KnownObjects {
    pub fn allocate(
        &mut self,
        ty: ObjectType,
        handle: ObjectHandle,
        native: NonZeroU64,
    ) -> ServerResult<()> {
        self.check_allocation(ty, handle)?;
        self.by_native.insert(native, handle.id);
        self.entries.insert(
            handle.id,
            Entry {
                generation: handle.generation,
                native: Some(native),
            },
        );
        Ok(())
    }

    /// Whether `handle` could be allocated right now.
    pub fn check_allocation(&self, ty: ObjectType, handle: ObjectHandle) -> ServerResult<()> {
        if handle.id.is_null() {
            return Err(ServerError::NullObjectId { ty });
        }
        match self.entries.get(&handle.id) {
            None => Ok(()),
            Some(entry) if entry.native.is_some() => Err(ServerError::ObjectAlreadyLive {
                ty,
                id: handle.id,
            }),
            Some(entry) if handle.generation <= entry.generation => {
                Err(ServerError::StaleGeneration {
                    ty,
                    handle,
                    previous: entry.generation,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Marks `id` as destroyed and hands back its native object.
    pub fn free(&mut self, ty: ObjectType, id: ObjectId) -> ServerResult<NonZeroU64> {
        let native = self
            .entries
            .get_mut(&id)
            .and_then(|entry| entry.native.take())
            .ok_or(ServerError::UnknownObject { ty, id })?;
        self.by_native.remove(&native);
        Ok(native)
    }

    pub fn get(&self, id: ObjectId) -> Option<NonZeroU64> {
        self.entries.get(&id).and_then(|entry| entry.native)
    }

    /// The `(id, generation)` of the live object `id`.
    pub fn handle(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.entries
            .get(&id)
            .filter(|entry| entry.native.is_some())
            .map(|entry| ObjectHandle::new(id, entry.generation))
    }

    /// The `(id, generation)` under which `native` is live.
    pub fn handle_of_native(&self, native: NonZeroU64) -> Option<ObjectHandle> {
        self.by_native.get(&native).and_then(|id| self.handle(*id))
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.native.is_some())
            .count()
    }
}

/// Every object the session knows about.
#[derive(Debug, Default)]
pub struct ServerObjects {
    tables: PerObjectType<KnownObjects>,
}

impl ServerObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, ty: ObjectType) -> &KnownObjects {
        &self.tables[ty]
    }

    pub fn allocate<T: WireObject>(&mut self, handle: ObjectHandle, object: T) -> ServerResult<()> {
        self.tables[T::TYPE].allocate(T::TYPE, handle, object.raw())
    }

    pub fn check_allocation<T: WireObject>(&self, handle: ObjectHandle) -> ServerResult<()> {
        self.tables[T::TYPE].check_allocation(T::TYPE, handle)
    }

    pub fn free(&mut self, ty: ObjectType, id: ObjectId) -> ServerResult<NonZeroU64> {
        self.tables[ty].free(ty, id)
    }

    pub fn handle<T: WireObject>(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.tables[T::TYPE].handle(id)
    }

    pub fn handle_of<T: WireObject>(&self, object: T) -> Option<ObjectHandle> {
        self.tables[T::TYPE].handle_of_native(object.raw())
    }

    pub fn live_count(&self) -> usize {
        self.tables.iter().map(|(_, table)| table.live_count()).sum()
    }
}

impl ObjectIdResolver for ServerObjects {
    fn get_raw_from_id(&self, ty: ObjectType, id: ObjectId) -> WireResult<NonZeroU64> {
        self.tables[ty]
            .get(id)
            .ok_or(WireError::UnknownObject { ty, id })
    }
}
