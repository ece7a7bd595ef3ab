//! Semi-implicit (symplectic) Euler integration.

use crate::error::{PhysicsError, Result};
use crate::math::Vec3;
use crate::types::{RigidBody, SleepConfig};

/// Reject zero, negative, and non-finite step sizes.
pub fn validate_timestep(dt: f32) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidTimestep(dt))
    }
}

/// Advance one body: velocity from gravity first, then position from the new velocity.
/// Static and sleeping bodies are left untouched.
#[inline]
pub fn integrate_body(body: &mut RigidBody, dt: f32, gravity: Vec3) {
    if !body.is_active() {
        return;
    }
    body.velocity += gravity * dt;
    body.position += body.velocity * dt;
}

/// Integrate every body. `dt` must already be validated.
pub fn integrate<'a>(bodies: impl Iterator<Item = &'a mut RigidBody>, dt: f32, gravity: Vec3) {
    for body in bodies {
        integrate_body(body, dt, gravity);
    }
}

/// Accumulate rest time and put bodies to sleep once they have rested long enough.
/// Returns how many bodies fell asleep this call.
pub fn update_sleep<'a>(
    bodies: impl Iterator<Item = &'a mut RigidBody>,
    dt: f32,
    cfg: &SleepConfig,
) -> usize {
    if !cfg.enabled {
        return 0;
    }
    let threshold2 = cfg.linear_threshold * cfg.linear_threshold;
    let mut slept = 0;
    for body in bodies {
        if !body.is_active() {
            continue;
        }
        if body.velocity.length_squared() < threshold2 {
            body.sleep_timer += dt;
            if body.sleep_timer >= cfg.time_to_sleep {
                body.sleeping = true;
                body.velocity = Vec3::ZERO;
                slept += 1;
            }
        } else {
            body.sleep_timer = 0.0;
        }
    }
    slept
}
