use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, Vec3, is_finite_vec};

/// Sphere radius used when a descriptor does not pick a shape.
pub const DEFAULT_RADIUS: f32 = 0.5;

/// Standard gravity, pointing down the Y axis.
pub const STANDARD_GRAVITY: Vec3 = Vec3::new(0.0, -9.80665, 0.0);

/// Stable handle to a body: slot index plus the slot's generation at creation.
///
/// A handle stays valid until its body is destroyed. After that the slot's
/// generation moves on, so the stale handle never resolves again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

impl BodyHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Pack into an opaque integer: generation in the high 32 bits, index in the low.
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Supported collision shapes. Cuboids are axis-aligned (bodies carry no orientation).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere centered on the body position.
    Sphere { radius: f32 },
    /// Axis-aligned box centered on the body position.
    Cuboid { half_extents: Vec3 },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Sphere { radius: DEFAULT_RADIUS }
    }
}

impl Shape {
    /// Half extents of the shape's bounding box.
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Shape::Sphere { radius } => Vec3::splat(radius),
            Shape::Cuboid { half_extents } => half_extents,
        }
    }

    /// Bounding box when placed at `center`.
    pub fn aabb(&self, center: Vec3) -> Aabb {
        Aabb::from_center(center, self.half_extents())
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Shape::Sphere { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(PhysicsError::descriptor(format!(
                        "sphere radius must be positive and finite, got {radius}"
                    )));
                }
            }
            Shape::Cuboid { half_extents } => {
                if !is_finite_vec(half_extents) || half_extents.min_element() <= 0.0 {
                    return Err(PhysicsError::descriptor(format!(
                        "cuboid half extents must be positive and finite, got {half_extents}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Surface response coefficients.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Coulomb friction coefficient (>= 0).
    pub friction: f32,
    /// Coefficient of restitution in `[0, 1]`; 0 is perfectly inelastic.
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

impl Material {
    pub const fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }

    /// Pair combination: geometric mean of friction, minimum of restitution.
    pub fn combine(self, other: Material) -> Material {
        Material {
            friction: (self.friction * other.friction).sqrt(),
            restitution: self.restitution.min(other.restitution),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(PhysicsError::descriptor(format!(
                "friction must be finite and non-negative, got {}",
                self.friction
            )));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::descriptor(format!(
                "restitution must lie in [0, 1], got {}",
                self.restitution
            )));
        }
        Ok(())
    }
}

/// Input-only configuration for body creation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyDesc {
    pub position: Vec3,
    pub velocity: Vec3,
    /// `0` makes the body static (infinite mass); otherwise strictly positive.
    pub mass: f32,
    pub shape: Shape,
    pub material: Material,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mass: 1.0,
            shape: Shape::default(),
            material: Material::default(),
        }
    }
}

impl RigidBodyDesc {
    /// Dynamic unit sphere description.
    pub fn new(position: Vec3, velocity: Vec3, mass: f32) -> Self {
        Self {
            position,
            velocity,
            mass,
            ..Default::default()
        }
    }

    /// Static (immovable) body at `position`.
    pub fn fixed(position: Vec3) -> Self {
        Self {
            position,
            mass: 0.0,
            ..Default::default()
        }
    }

    pub fn with_sphere(mut self, radius: f32) -> Self {
        self.shape = Shape::Sphere { radius };
        self
    }

    pub fn with_cuboid(mut self, half_extents: Vec3) -> Self {
        self.shape = Shape::Cuboid { half_extents };
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Check every field. Runs before any store mutation.
    pub fn validate(&self) -> Result<()> {
        if !is_finite_vec(self.position) {
            return Err(PhysicsError::descriptor(format!(
                "position must be finite, got {}",
                self.position
            )));
        }
        if !is_finite_vec(self.velocity) {
            return Err(PhysicsError::descriptor(format!(
                "velocity must be finite, got {}",
                self.velocity
            )));
        }
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(PhysicsError::descriptor(format!(
                "mass must be zero (static) or positive and finite, got {}",
                self.mass
            )));
        }
        self.shape.validate()?;
        self.material.validate()
    }
}

/// Simulation state of one body. The store hands out copies only.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// `1 / mass`, or `0` for static bodies.
    pub inverse_mass: f32,
    pub shape: Shape,
    pub material: Material,
    /// Sleeping bodies are skipped by the integrator until woken.
    pub sleeping: bool,
    /// Accumulated time spent below the sleep threshold.
    pub sleep_timer: f32,
}

impl RigidBody {
    /// Build from an already validated descriptor.
    pub(crate) fn from_desc(desc: &RigidBodyDesc) -> Self {
        let inverse_mass = if desc.mass == 0.0 { 0.0 } else { 1.0 / desc.mass };
        Self {
            position: desc.position,
            velocity: if inverse_mass == 0.0 { Vec3::ZERO } else { desc.velocity },
            inverse_mass,
            shape: desc.shape,
            material: desc.material,
            sleeping: false,
            sleep_timer: 0.0,
        }
    }

    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Dynamic and not asleep.
    pub fn is_active(&self) -> bool {
        !self.is_static() && !self.sleeping
    }

    /// Mass, or `None` for static bodies.
    pub fn mass(&self) -> Option<f32> {
        (!self.is_static()).then(|| 1.0 / self.inverse_mass)
    }

    pub fn aabb(&self) -> Aabb {
        self.shape.aabb(self.position)
    }

    pub(crate) fn wake(&mut self) {
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }
}

/// Narrow-phase result for one shape pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Overlap {
    /// Unit normal pointing from A into B.
    pub normal: Vec3,
    /// Penetration depth (> 0).
    pub depth: f32,
    /// Representative contact point.
    pub point: Vec3,
}

/// Step-scoped contact between two bodies. Recomputed every step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    /// Unit normal pointing from `a` to `b`.
    pub normal: Vec3,
    /// Penetration depth (> 0).
    pub depth: f32,
    pub point: Vec3,
    /// Combined friction for the pair.
    pub friction: f32,
    /// Combined restitution for the pair.
    pub restitution: f32,
}

/// Broad-phase strategy. All variants yield the same ordered pair list.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadphaseKind {
    /// Test every unordered pair.
    #[default]
    AllPairs,
    /// Sort on one axis (0 = x, 1 = y, 2 = z) and sweep.
    SweepAndPrune { axis: usize },
    /// Hash bodies into cubic cells of the given size.
    UniformGrid { cell_size: f32 },
}

/// Contact resolver settings.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Velocity passes over the contact list. 1 is a single in-order pass;
    /// larger values approach sequential-impulse convergence.
    pub iterations: u32,
    /// Fraction of penetration removed per step, in `(0, 1]`.
    pub position_correction: f32,
    /// Penetration allowed to remain without positional correction.
    pub penetration_slop: f32,
    /// Approach speeds below this are resolved inelastically.
    pub restitution_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            position_correction: 1.0,
            penetration_slop: 0.0,
            restitution_threshold: 0.0,
        }
    }
}

/// Body sleeping settings.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SleepConfig {
    pub enabled: bool,
    /// Speed under which a body counts as resting.
    pub linear_threshold: f32,
    /// Seconds a body must rest before it is put to sleep.
    pub time_to_sleep: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            linear_threshold: 0.01,
            time_to_sleep: 0.5,
        }
    }
}

/// World-level configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Constant acceleration applied to every awake dynamic body.
    pub gravity: Vec3,
    pub broadphase: BroadphaseKind,
    pub solver: SolverConfig,
    pub sleep: SleepConfig,
    /// Record per-stage timings for the last step (adds small overhead when true).
    pub enable_timing: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            broadphase: BroadphaseKind::default(),
            solver: SolverConfig::default(),
            sleep: SleepConfig::default(),
            enable_timing: false,
        }
    }
}

impl WorldConfig {
    /// Default configuration without gravity.
    #[must_use]
    pub fn zero_gravity() -> Self {
        Self {
            gravity: Vec3::ZERO,
            ..Default::default()
        }
    }

    /// Default configuration with a different gravity vector.
    #[must_use]
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_finite_vec(self.gravity) {
            return Err(PhysicsError::config(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        match self.broadphase {
            BroadphaseKind::AllPairs => {}
            BroadphaseKind::SweepAndPrune { axis } => {
                if axis > 2 {
                    return Err(PhysicsError::config(format!(
                        "sweep axis must be 0, 1 or 2, got {axis}"
                    )));
                }
            }
            BroadphaseKind::UniformGrid { cell_size } => {
                if !(cell_size.is_finite() && cell_size > 0.0) {
                    return Err(PhysicsError::config(format!(
                        "grid cell size must be positive and finite, got {cell_size}"
                    )));
                }
            }
        }
        let s = &self.solver;
        if s.iterations == 0 {
            return Err(PhysicsError::config("solver iterations must be at least 1"));
        }
        if !(s.position_correction > 0.0 && s.position_correction <= 1.0) {
            return Err(PhysicsError::config(format!(
                "position correction must lie in (0, 1], got {}",
                s.position_correction
            )));
        }
        if !(s.penetration_slop.is_finite() && s.penetration_slop >= 0.0) {
            return Err(PhysicsError::config("penetration slop must be finite and >= 0"));
        }
        if !(s.restitution_threshold.is_finite() && s.restitution_threshold >= 0.0) {
            return Err(PhysicsError::config("restitution threshold must be finite and >= 0"));
        }
        let z = &self.sleep;
        if !(z.linear_threshold.is_finite() && z.linear_threshold >= 0.0)
            || !(z.time_to_sleep.is_finite() && z.time_to_sleep >= 0.0)
        {
            return Err(PhysicsError::config("sleep thresholds must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Debug statistics for the last completed step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub bodies: usize,
    /// Pairs proposed by the broad phase.
    pub candidate_pairs: usize,
    /// Pairs confirmed by the narrow phase.
    pub contacts: usize,
    /// Completed steps since creation.
    pub steps: u64,
}

/// Timing breakdown for the last step.
#[derive(Copy, Clone, Debug, Default)]
pub struct StepTiming {
    pub step_ms: f64,
    pub integrate_ms: f64,
    pub broadphase_ms: f64,
    pub narrowphase_ms: f64,
    pub solve_ms: f64,
}
