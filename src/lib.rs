//! ape: small rigid-body physics core (handle-based world, sphere/box contacts, impulse resolver)

pub mod math;
pub mod types;
pub mod error;
pub mod api;
pub mod store;
pub mod integrator;
pub mod broadphase;
pub mod narrowphase;
pub mod solver;
pub mod world;
pub mod boundary;

pub use crate::math::{Aabb, Vec3};
pub use crate::types::*;
pub use crate::error::{PhysicsError, Result};
pub use crate::api::*;
pub use crate::world::PhysicsWorld;
pub use crate::boundary::{version, FlatBodyDesc, FlatVec3, Version, WorldHandle, WorldRegistry};
