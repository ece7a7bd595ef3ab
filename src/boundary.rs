//! Flat boundary surface for foreign bindings.
//!
//! Only fixed-layout values cross this boundary: packed float triples, a flat
//! body descriptor, scalars, and opaque integer handles. Worlds live in a
//! [`WorldRegistry`] owned by the caller, so there is no process-wide state.

use crate::api::PhysicsWorldApi;
use crate::error::{PhysicsError, Result};
use crate::math::Vec3;
use crate::types::{BodyHandle, DEFAULT_RADIUS, RigidBodyDesc, Shape, WorldConfig};
use crate::world::PhysicsWorld;

/// Three packed `f32`s.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlatVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for FlatVec3 {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<FlatVec3> for Vec3 {
    fn from(v: FlatVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Flat body descriptor: position, velocity, mass and sphere radius.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlatBodyDesc {
    pub position: FlatVec3,
    pub velocity: FlatVec3,
    /// `0` for a static body.
    pub mass: f32,
    /// Sphere radius; `<= 0` selects the default radius.
    pub radius: f32,
}

impl Default for FlatBodyDesc {
    fn default() -> Self {
        Self {
            position: FlatVec3::default(),
            velocity: FlatVec3::default(),
            mass: 1.0,
            radius: DEFAULT_RADIUS,
        }
    }
}

impl From<FlatBodyDesc> for RigidBodyDesc {
    fn from(d: FlatBodyDesc) -> Self {
        // NaN radius is passed through so validation rejects it.
        let radius = if d.radius <= 0.0 { DEFAULT_RADIUS } else { d.radius };
        RigidBodyDesc {
            position: d.position.into(),
            velocity: d.velocity.into(),
            mass: d.mass,
            shape: Shape::Sphere { radius },
            ..Default::default()
        }
    }
}

/// Semantic version triple.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

const fn parse_u32(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut n = 0u32;
    while i < bytes.len() {
        n = n * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    n
}

const VERSION: Version = Version {
    major: parse_u32(env!("CARGO_PKG_VERSION_MAJOR")),
    minor: parse_u32(env!("CARGO_PKG_VERSION_MINOR")),
    patch: parse_u32(env!("CARGO_PKG_VERSION_PATCH")),
};

/// Library version, fixed at compile time. Needs no world.
pub const fn version() -> Version {
    VERSION
}

/// Opaque world handle: generation in the high 32 bits, slot index in the low.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorldHandle(pub u64);

impl WorldHandle {
    fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    fn index(self) -> usize {
        (self.0 as u32) as usize
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

struct WorldSlot {
    generation: u32,
    world: Option<PhysicsWorld>,
}

/// Owner of every world created through the boundary.
///
/// A handle whose world was destroyed reports `WorldDestroyed` (so a double
/// `world_destroy` is an error, not a no-op); a handle never issued here
/// reports `UnknownWorld`.
#[derive(Default)]
pub struct WorldRegistry {
    slots: Vec<WorldSlot>,
    free: Vec<u32>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with the default configuration.
    pub fn world_create(&mut self) -> WorldHandle {
        self.insert(PhysicsWorld::default())
    }

    pub fn world_create_with(&mut self, cfg: WorldConfig) -> Result<WorldHandle> {
        Ok(self.insert(PhysicsWorld::new(cfg)?))
    }

    pub fn world_destroy(&mut self, w: WorldHandle) -> Result<()> {
        let slot = self.slot_mut(w)?;
        let mut world = slot.world.take().ok_or(PhysicsError::WorldDestroyed)?;
        world.destroy()?;
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(w.index() as u32);
        }
        Ok(())
    }

    pub fn world_create_rigidbody(&mut self, w: WorldHandle, desc: FlatBodyDesc) -> Result<u64> {
        let handle = self.world_mut(w)?.create_body(desc.into())?;
        Ok(handle.to_bits())
    }

    pub fn world_destroy_rigidbody(&mut self, w: WorldHandle, body: u64) -> Result<()> {
        self.world_mut(w)?.destroy_body(BodyHandle::from_bits(body))
    }

    pub fn world_step(&mut self, w: WorldHandle, dt: f32) -> Result<()> {
        self.world_mut(w)?.step(dt)
    }

    pub fn world_get_position(&self, w: WorldHandle, body: u64) -> Result<FlatVec3> {
        Ok(self.world(w)?.position(BodyHandle::from_bits(body))?.into())
    }

    pub fn world_get_velocity(&self, w: WorldHandle, body: u64) -> Result<FlatVec3> {
        Ok(self.world(w)?.velocity(BodyHandle::from_bits(body))?.into())
    }

    pub fn world_set_gravity(&mut self, w: WorldHandle, gravity: FlatVec3) -> Result<()> {
        self.world_mut(w)?.set_gravity(gravity.into())
    }

    pub fn world_get_gravity(&self, w: WorldHandle) -> Result<FlatVec3> {
        Ok(self.world(w)?.gravity()?.into())
    }

    pub fn world_is_alive(&self, w: WorldHandle, body: u64) -> Result<bool> {
        self.world(w)?.is_alive(BodyHandle::from_bits(body))
    }

    pub fn world_body_count(&self, w: WorldHandle) -> Result<usize> {
        self.world(w)?.body_count()
    }

    /// Number of live worlds.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.world.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, world: PhysicsWorld) -> WorldHandle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.world = Some(world);
                WorldHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(WorldSlot {
                    generation: 0,
                    world: Some(world),
                });
                WorldHandle::new(index, 0)
            }
        }
    }

    fn slot_mut(&mut self, w: WorldHandle) -> Result<&mut WorldSlot> {
        let slot = self
            .slots
            .get_mut(w.index())
            .ok_or(PhysicsError::UnknownWorld(w.0))?;
        match w.generation() {
            g if g == slot.generation => Ok(slot),
            g if g < slot.generation => Err(PhysicsError::WorldDestroyed),
            _ => Err(PhysicsError::UnknownWorld(w.0)),
        }
    }

    fn world(&self, w: WorldHandle) -> Result<&PhysicsWorld> {
        let slot = self.slots.get(w.index()).ok_or(PhysicsError::UnknownWorld(w.0))?;
        match w.generation() {
            g if g == slot.generation => slot.world.as_ref().ok_or(PhysicsError::WorldDestroyed),
            g if g < slot.generation => Err(PhysicsError::WorldDestroyed),
            _ => Err(PhysicsError::UnknownWorld(w.0)),
        }
    }

    fn world_mut(&mut self, w: WorldHandle) -> Result<&mut PhysicsWorld> {
        self.slot_mut(w)?
            .world
            .as_mut()
            .ok_or(PhysicsError::WorldDestroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_package() {
        let v = version();
        let expected = format!("{}.{}.{}", v.major, v.minor, v.patch);
        assert_eq!(expected, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_flat_desc_default_radius() {
        let d = FlatBodyDesc { radius: 0.0, ..Default::default() };
        let desc: RigidBodyDesc = d.into();
        assert_eq!(desc.shape, Shape::Sphere { radius: DEFAULT_RADIUS });
        let d = FlatBodyDesc { radius: 2.0, ..Default::default() };
        assert_eq!(RigidBodyDesc::from(d).shape, Shape::Sphere { radius: 2.0 });
    }

    #[test]
    fn test_registry_roundtrip() {
        let mut reg = WorldRegistry::new();
        let w = reg.world_create();
        let desc = FlatBodyDesc {
            position: FlatVec3 { x: 0.0, y: 5.0, z: 0.0 },
            ..Default::default()
        };
        let body = reg.world_create_rigidbody(w, desc).unwrap();
        assert!(reg.world_is_alive(w, body).unwrap());
        assert_eq!(reg.world_body_count(w).unwrap(), 1);
        reg.world_step(w, 1.0 / 60.0).unwrap();
        assert!(reg.world_get_position(w, body).unwrap().y < 5.0);
        assert!(reg.world_get_velocity(w, body).unwrap().y < 0.0);

        reg.world_set_gravity(w, FlatVec3::default()).unwrap();
        assert_eq!(reg.world_get_gravity(w).unwrap(), FlatVec3::default());

        reg.world_destroy_rigidbody(w, body).unwrap();
        assert!(!reg.world_is_alive(w, body).unwrap());
        assert!(matches!(
            reg.world_get_position(w, body),
            Err(PhysicsError::UnknownHandle(_))
        ));
    }

    #[test]
    fn test_double_destroy_reports_world_destroyed() {
        let mut reg = WorldRegistry::new();
        let w = reg.world_create();
        reg.world_destroy(w).unwrap();
        assert_eq!(reg.world_destroy(w), Err(PhysicsError::WorldDestroyed));
        assert_eq!(reg.world_step(w, 0.1), Err(PhysicsError::WorldDestroyed));
        assert_eq!(reg.world_body_count(w), Err(PhysicsError::WorldDestroyed));
        assert!(reg.is_empty());

        // The slot is reused under a new generation; the old handle stays dead.
        let w2 = reg.world_create();
        assert_ne!(w, w2);
        assert_eq!(reg.world_body_count(w2), Ok(0));
        assert_eq!(reg.world_body_count(w), Err(PhysicsError::WorldDestroyed));
    }

    #[test]
    fn test_unknown_world_handle() {
        let mut reg = WorldRegistry::new();
        let bogus = WorldHandle(42);
        assert_eq!(reg.world_step(bogus, 0.1), Err(PhysicsError::UnknownWorld(42)));
    }

    #[test]
    fn test_worlds_are_independent() {
        let mut reg = WorldRegistry::new();
        let a = reg.world_create();
        let b = reg.world_create();
        let body = reg.world_create_rigidbody(a, FlatBodyDesc::default()).unwrap();
        reg.world_set_gravity(b, FlatVec3 { x: 1.0, y: 0.0, z: 0.0 }).unwrap();
        assert_eq!(reg.world_body_count(b).unwrap(), 0);
        assert_eq!(reg.world_get_gravity(a).unwrap().x, 0.0);
        reg.world_destroy(b).unwrap();
        assert!(reg.world_get_position(a, body).is_ok());
    }
}
