use crate::error::Result;
use crate::math::Vec3;
use crate::types::*;

/// Public API contract for the handle-based rigid-body world.
///
/// Every call on a destroyed world fails with `PhysicsError::WorldDestroyed`.
pub trait PhysicsWorldApi {
    /// Construct an empty world. Fails with `InvalidConfig` on a bad configuration.
    fn new(cfg: WorldConfig) -> Result<Self>
    where
        Self: Sized;

    // --- Lifecycle ---------------------------------------------------------

    /// Tear the world down: every body is released and every handle invalidated.
    /// Terminal; a second call reports `WorldDestroyed`.
    fn destroy(&mut self) -> Result<()>;

    /// True once `destroy` has succeeded.
    fn is_destroyed(&self) -> bool;

    // --- Bodies ------------------------------------------------------------

    /// Allocate a body. Fails with `InvalidDescriptor` before touching any state.
    fn create_body(&mut self, desc: RigidBodyDesc) -> Result<BodyHandle>;

    /// Remove a body. Its handle never resolves again.
    fn destroy_body(&mut self, handle: BodyHandle) -> Result<()>;

    /// Snapshot copy of the body's state.
    fn body(&self, handle: BodyHandle) -> Result<RigidBody>;

    /// Current position of a live body.
    fn position(&self, handle: BodyHandle) -> Result<Vec3>;

    /// Current linear velocity of a live body.
    fn velocity(&self, handle: BodyHandle) -> Result<Vec3>;

    /// Overwrite a dynamic body's velocity and wake it. Ignored for static bodies.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<()>;

    /// Whether the handle still resolves to a body in this world.
    fn is_alive(&self, handle: BodyHandle) -> Result<bool>;

    /// Number of live bodies.
    fn body_count(&self) -> Result<usize>;

    // --- Global parameters -------------------------------------------------

    /// Replace gravity and wake every sleeping body.
    fn set_gravity(&mut self, gravity: Vec3) -> Result<()>;

    /// Current gravity vector.
    fn gravity(&self) -> Result<Vec3>;

    // --- Simulation --------------------------------------------------------

    /// Integrate, detect, resolve; exactly once, without subdividing `dt`.
    fn step(&mut self, dt: f32) -> Result<()>;

    /// Contacts found by the last step, in resolution order.
    fn contacts(&self) -> Result<&[Contact]>;
}

/// Narrowphase primitive tests. Normals point from the first shape into the second;
/// touching shapes (zero penetration) report no overlap.
pub trait NarrowphaseApi {
    fn sphere_sphere(c0: Vec3, r0: f32, c1: Vec3, r1: f32) -> Option<Overlap>;
    fn sphere_cuboid(c: Vec3, r: f32, box_c: Vec3, box_h: Vec3) -> Option<Overlap>;
    fn cuboid_cuboid(c0: Vec3, h0: Vec3, c1: Vec3, h1: Vec3) -> Option<Overlap>;

    /// Dispatch on the shape pair.
    fn collide(a: &Shape, pos_a: Vec3, b: &Shape, pos_b: Vec3) -> Option<Overlap> {
        match (*a, *b) {
            (Shape::Sphere { radius: r0 }, Shape::Sphere { radius: r1 }) => {
                Self::sphere_sphere(pos_a, r0, pos_b, r1)
            }
            (Shape::Sphere { radius }, Shape::Cuboid { half_extents }) => {
                Self::sphere_cuboid(pos_a, radius, pos_b, half_extents)
            }
            (Shape::Cuboid { half_extents }, Shape::Sphere { radius }) => {
                // Swap and invert normal
                let hit = Self::sphere_cuboid(pos_b, radius, pos_a, half_extents)?;
                Some(Overlap { normal: -hit.normal, ..hit })
            }
            (Shape::Cuboid { half_extents: h0 }, Shape::Cuboid { half_extents: h1 }) => {
                Self::cuboid_cuboid(pos_a, h0, pos_b, h1)
            }
        }
    }
}
