//! Rigid Body Store: exclusive owner of every body, addressed by generation-tagged handles.

use crate::error::{PhysicsError, Result};
use crate::types::{BodyHandle, RigidBody, RigidBodyDesc};

struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// Slot array with a free list. Destroying a body bumps its slot generation so
/// stale handles fail the generation check instead of aliasing a new body.
#[derive(Default)]
pub struct BodyStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl BodyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `desc` and allocate a body for it.
    pub fn create(&mut self, desc: &RigidBodyDesc) -> Result<BodyHandle> {
        desc.validate()?;
        let body = RigidBody::from_desc(desc);

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                BodyHandle::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| PhysicsError::descriptor("body store is full"))?;
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                BodyHandle::new(index, 0)
            }
        };
        self.len += 1;
        Ok(handle)
    }

    /// Remove the body and return its final state.
    pub fn destroy(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .ok_or(PhysicsError::UnknownHandle(handle))?;
        let body = slot.body.take().ok_or(PhysicsError::UnknownHandle(handle))?;
        self.len -= 1;
        // A slot whose generation would wrap is retired for good.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(handle.index);
        }
        Ok(body)
    }

    /// Copy of the body's current state.
    pub fn get(&self, handle: BodyHandle) -> Result<RigidBody> {
        self.slot_body(handle).copied()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.slot_body(handle).is_ok()
    }

    /// Update a body in place. Used by the pipeline stages only.
    pub(crate) fn mutate<R>(
        &mut self,
        handle: BodyHandle,
        f: impl FnOnce(&mut RigidBody) -> R,
    ) -> Result<R> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
            .map(f)
            .ok_or(PhysicsError::UnknownHandle(handle))
    }

    /// Mutable access to two distinct bodies at once.
    pub(crate) fn pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Result<(&mut RigidBody, &mut RigidBody)> {
        // Validate both before borrowing so a stale `b` is reported even if `a` is fine.
        self.slot_body(a)?;
        self.slot_body(b)?;
        let (ia, ib) = (a.index as usize, b.index as usize);
        if ia == ib {
            return Err(PhysicsError::UnknownHandle(b));
        }
        let (lo, hi) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (head, tail) = self.slots.split_at_mut(hi);
        let (lo_body, hi_body) = match (head[lo].body.as_mut(), tail[0].body.as_mut()) {
            (Some(l), Some(h)) => (l, h),
            _ => return Err(PhysicsError::UnknownHandle(a)),
        };
        Ok(if ia < ib { (lo_body, hi_body) } else { (hi_body, lo_body) })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live bodies in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body
                .as_ref()
                .map(|b| (BodyHandle::new(i as u32, s.generation), b))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> {
        self.slots.iter_mut().filter_map(|s| s.body.as_mut())
    }

    /// Drop every body. Generations advance so no outstanding handle survives.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.body.take().is_some() {
                if let Some(next) = slot.generation.checked_add(1) {
                    slot.generation = next;
                    self.free.push(i as u32);
                }
            }
        }
        self.len = 0;
    }

    fn slot_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
            .ok_or(PhysicsError::UnknownHandle(handle))
    }
}
