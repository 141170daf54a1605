// crates/cip-safety-rs/src/svs/table.rs

use super::instance::ServerInstance;
use crate::hal::ValidatorError;
use crate::types::InstanceId;
use alloc::collections::BTreeMap;
use core::ops::{Index, IndexMut};

#[derive(Debug, Default)]
struct Slot {
    id: Option<InstanceId>,
    in_use: bool,
    instance: ServerInstance,
}

/// Fixed-capacity store of Safety Validator Server instances.
///
/// Slots are addressed by index internally; the application only ever sees
/// the instance ID assigned at open. `indices` holds exactly one entry per
/// bound ID and mirrors `Slot::id`.
#[derive(Debug)]
pub struct InstanceTable<const N: usize> {
    slots: [Slot; N],
    indices: BTreeMap<InstanceId, usize>,
    next_id: u16,
}

impl<const N: usize> Default for InstanceTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> InstanceTable<N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::default()),
            indices: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claims the first free slot and returns it zero-initialised.
    pub fn allocate(&mut self) -> Result<usize, ValidatorError> {
        let index = self
            .slots
            .iter()
            .position(|slot| !slot.in_use)
            .ok_or(ValidatorError::TableExhausted)?;
        self.clear(index);
        self.slots[index].in_use = true;
        Ok(index)
    }

    /// Frees a slot. Freeing an unused or unknown slot does nothing.
    pub fn deallocate(&mut self, index: usize) {
        self.clear(index);
    }

    fn clear(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if let Some(id) = slot.id {
            self.indices.remove(&id);
        }
        *slot = Slot::default();
    }

    /// Hands out the next instance ID, skipping 0 and IDs still in use.
    pub fn next_free_id(&mut self) -> InstanceId {
        loop {
            let candidate = InstanceId(self.next_id);
            self.next_id = match self.next_id.wrapping_add(1) {
                0 => 1,
                next => next,
            };
            if self.lookup(candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Binds `id` to an allocated slot, replacing any earlier binding of
    /// either side.
    pub fn assign(&mut self, id: InstanceId, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if !slot.in_use {
            return;
        }
        if let Some(previous) = slot.id.replace(id) {
            self.indices.remove(&previous);
        }
        if let Some(stale) = self.indices.insert(id, index)
            && stale != index
        {
            self.slots[stale].id = None;
        }
    }

    /// Resolves an instance ID to its slot index.
    pub fn lookup(&self, id: InstanceId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// Drops the ID binding of a slot without freeing it.
    pub fn release(&mut self, id: InstanceId) {
        if let Some(index) = self.indices.remove(&id) {
            self.slots[index].id = None;
        }
    }

    /// ID bound to the slot at `index`.
    pub fn id_at(&self, index: usize) -> Option<InstanceId> {
        self.slots.get(index).and_then(|slot| slot.id)
    }

    /// IDs of all allocated instances, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.indices.keys().copied()
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.in_use).count()
    }
}

impl<const N: usize> Index<usize> for InstanceTable<N> {
    type Output = ServerInstance;

    fn index(&self, index: usize) -> &Self::Output {
        &self.slots[index].instance
    }
}

impl<const N: usize> IndexMut<usize> for InstanceTable<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.slots[index].instance
    }
}
