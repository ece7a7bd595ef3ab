//! Error types for world, body and boundary operations.

use thiserror::Error;

use crate::types::BodyHandle;

/// Errors reported synchronously by the physics core.
///
/// Every fallible operation validates its inputs before touching any state, so
/// an `Err` always means nothing was mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Body creation parameters were rejected.
    #[error("invalid rigid body descriptor: {0}")]
    InvalidDescriptor(String),

    /// The handle does not refer to a live body in this world.
    #[error("unknown body handle {0}")]
    UnknownHandle(BodyHandle),

    /// Step size was zero, negative, or not finite.
    #[error("invalid timestep {0}: must be positive and finite")]
    InvalidTimestep(f32),

    /// The world has been torn down.
    #[error("world has been destroyed")]
    WorldDestroyed,

    /// World configuration (or a runtime parameter such as gravity) was rejected.
    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    /// A world handle that was never issued by the registry.
    #[error("unknown world handle {0:#x}")]
    UnknownWorld(u64),
}

impl PhysicsError {
    /// Creates an invalid-descriptor error.
    #[must_use]
    pub fn descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor(reason.into())
    }

    /// Creates an invalid-config error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;
