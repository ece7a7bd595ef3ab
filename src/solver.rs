//! Contact Resolver: normal and friction impulses plus positional correction.
//!
//! Contacts are processed in detector order. With `SolverConfig::iterations == 1`
//! this is a single pass; larger counts repeat the velocity pass (sequential
//! impulses) and improve convergence for stacks and multi-contact bodies.

use tracing::warn;

use crate::math::Vec3;
use crate::store::BodyStore;
use crate::types::{Contact, RigidBody, SolverConfig};

/// Tangential speeds below this get no friction impulse.
const TANGENT_EPS: f32 = 1e-6;

/// Outcome of one resolver call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// Contacts that received at least one impulse or correction pass.
    pub resolved: usize,
    /// Contacts dropped because neither side could move.
    pub skipped: usize,
}

/// Resolve every contact against the bodies in `store`.
pub fn resolve_contacts(store: &mut BodyStore, contacts: &[Contact], cfg: &SolverConfig) -> SolveReport {
    let mut report = SolveReport::default();
    let mut live = vec![false; contacts.len()];

    for (i, c) in contacts.iter().enumerate() {
        match store.pair_mut(c.a, c.b) {
            Ok((a, b)) => {
                if a.inverse_mass + b.inverse_mass == 0.0 {
                    warn!(a = %c.a, b = %c.b, "dropping contact between two static bodies");
                    report.skipped += 1;
                } else if !a.is_active() && !b.is_active() {
                    // Both asleep, or asleep against static.
                    report.skipped += 1;
                } else {
                    live[i] = true;
                    report.resolved += 1;
                }
            }
            Err(err) => {
                warn!(%err, "dropping contact with stale handle");
                report.skipped += 1;
            }
        }
    }

    for _ in 0..cfg.iterations.max(1) {
        for (c, _) in contacts.iter().zip(&live).filter(|(_, l)| **l) {
            if let Ok((a, b)) = store.pair_mut(c.a, c.b) {
                apply_impulses(a, b, c, cfg);
            }
        }
    }

    for (c, _) in contacts.iter().zip(&live).filter(|(_, l)| **l) {
        if let Ok((a, b)) = store.pair_mut(c.a, c.b) {
            correct_position(a, b, c, cfg);
        }
    }

    report
}

/// Velocity-level response for one contact. Leaves the normal relative velocity
/// non-negative (separating or resting).
pub fn apply_impulses(a: &mut RigidBody, b: &mut RigidBody, c: &Contact, cfg: &SolverConfig) {
    let inv_sum = a.inverse_mass + b.inverse_mass;
    if inv_sum == 0.0 {
        return;
    }
    let n = c.normal;
    let v_rel = b.velocity - a.velocity;
    let vn = v_rel.dot(n);
    if vn >= 0.0 {
        return;
    }

    let e = if -vn < cfg.restitution_threshold { 0.0 } else { c.restitution };
    let j = -(1.0 + e) * vn / inv_sum;
    apply(a, b, n * j);

    // Coulomb friction on the post-impulse tangential velocity
    let v_rel = b.velocity - a.velocity;
    let tangent = v_rel - n * v_rel.dot(n);
    let speed = tangent.length();
    if speed > TANGENT_EPS && c.friction > 0.0 {
        let t = tangent / speed;
        let jt = (speed / inv_sum).min(c.friction * j);
        apply(a, b, -t * jt);
    }
}

/// Push the bodies apart along the normal, split by inverse-mass share.
pub fn correct_position(a: &mut RigidBody, b: &mut RigidBody, c: &Contact, cfg: &SolverConfig) {
    let inv_sum = a.inverse_mass + b.inverse_mass;
    let excess = c.depth - cfg.penetration_slop;
    if inv_sum == 0.0 || excess <= 0.0 {
        return;
    }
    let per_inv_mass = excess * cfg.position_correction / inv_sum;
    let push = c.normal * per_inv_mass;
    a.position -= push * a.inverse_mass;
    b.position += push * b.inverse_mass;
}

/// Apply an impulse to B and its opposite to A; sleepers that get kicked wake up.
///
/// An awake body keeps its rest timer: resting contact pushes back every step,
/// and only the post-solve speed decides whether it keeps counting.
fn apply(a: &mut RigidBody, b: &mut RigidBody, impulse: Vec3) {
    for (body, sign) in [(a, -1.0), (b, 1.0)] {
        if body.inverse_mass > 0.0 {
            body.velocity += impulse * (sign * body.inverse_mass);
            if body.sleeping {
                body.wake();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyHandle, RigidBodyDesc};
    use approx::assert_relative_eq;

    fn contact(a: BodyHandle, b: BodyHandle, normal: Vec3, depth: f32, restitution: f32) -> Contact {
        Contact {
            a,
            b,
            normal,
            depth,
            point: Vec3::ZERO,
            friction: 0.0,
            restitution,
        }
    }

    #[test]
    fn test_equal_masses_head_on_inelastic() {
        let mut s = BodyStore::new();
        let a = s.create(&RigidBodyDesc::new(Vec3::ZERO, Vec3::X, 1.0)).unwrap();
        let b = s.create(&RigidBodyDesc::new(Vec3::X * 0.9, -Vec3::X, 1.0)).unwrap();
        let c = contact(a, b, Vec3::X, 0.1, 0.0);
        let r = resolve_contacts(&mut s, &[c], &SolverConfig::default());
        assert_eq!(r.resolved, 1);
        let (va, vb) = (s.get(a).unwrap().velocity, s.get(b).unwrap().velocity);
        assert_relative_eq!(va.x, 0.0);
        assert_relative_eq!(vb.x, 0.0);
        // Each body takes half of the penetration.
        assert_relative_eq!(s.get(a).unwrap().position.x, -0.05, epsilon = 1e-6);
        assert_relative_eq!(s.get(b).unwrap().position.x, 0.95, epsilon = 1e-6);
    }

    #[test]
    fn test_static_body_absorbs_nothing() {
        let mut s = BodyStore::new();
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let ball = s
            .create(&RigidBodyDesc::new(Vec3::new(0.0, 0.9, 0.0), Vec3::new(0.0, -3.0, 0.0), 2.0))
            .unwrap();
        let c = contact(ground, ball, Vec3::Y, 0.1, 0.5);
        resolve_contacts(&mut s, &[c], &SolverConfig::default());
        let g = s.get(ground).unwrap();
        assert_eq!(g.position, Vec3::ZERO);
        assert_eq!(g.velocity, Vec3::ZERO);
        let b = s.get(ball).unwrap();
        assert_relative_eq!(b.velocity.y, 1.5, epsilon = 1e-5);
        assert_relative_eq!(b.position.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_separating_contact_gets_no_impulse() {
        let mut s = BodyStore::new();
        let a = s.create(&RigidBodyDesc::new(Vec3::ZERO, -Vec3::X, 1.0)).unwrap();
        let b = s.create(&RigidBodyDesc::new(Vec3::X * 0.9, Vec3::X, 1.0)).unwrap();
        let c = contact(a, b, Vec3::X, 0.1, 0.0);
        resolve_contacts(&mut s, &[c], &SolverConfig::default());
        assert_eq!(s.get(a).unwrap().velocity, -Vec3::X);
        assert_eq!(s.get(b).unwrap().velocity, Vec3::X);
    }

    #[test]
    fn test_restitution_threshold() {
        let mut s = BodyStore::new();
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let ball = s
            .create(&RigidBodyDesc::new(Vec3::new(0.0, 0.95, 0.0), Vec3::new(0.0, -0.1, 0.0), 1.0))
            .unwrap();
        let cfg = SolverConfig {
            restitution_threshold: 0.5,
            ..Default::default()
        };
        resolve_contacts(&mut s, &[contact(ground, ball, Vec3::Y, 0.05, 1.0)], &cfg);
        assert_relative_eq!(s.get(ball).unwrap().velocity.y, 0.0);
    }

    #[test]
    fn test_friction_clamped_by_normal_impulse() {
        let mut s = BodyStore::new();
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let ball = s
            .create(&RigidBodyDesc::new(Vec3::new(0.0, 0.9, 0.0), Vec3::new(4.0, -1.0, 0.0), 1.0))
            .unwrap();
        let c = Contact {
            friction: 0.5,
            ..contact(ground, ball, Vec3::Y, 0.1, 0.0)
        };
        resolve_contacts(&mut s, &[c], &SolverConfig::default());
        let v = s.get(ball).unwrap().velocity;
        // Normal impulse 1.0, friction capped at 0.5.
        assert_relative_eq!(v.y, 0.0);
        assert_relative_eq!(v.x, 3.5, epsilon = 1e-5);
    }

    #[test]
    fn test_two_static_bodies_dropped() {
        let mut s = BodyStore::new();
        let a = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let b = s.create(&RigidBodyDesc::fixed(Vec3::X * 0.5)).unwrap();
        let r = resolve_contacts(&mut s, &[contact(a, b, Vec3::X, 0.5, 0.0)], &SolverConfig::default());
        assert_eq!(r, SolveReport { resolved: 0, skipped: 1 });
        assert_eq!(s.get(b).unwrap().position, Vec3::X * 0.5);
    }

    #[test]
    fn test_impulse_wakes_sleeping_body() {
        let mut s = BodyStore::new();
        let a = s.create(&RigidBodyDesc::new(Vec3::ZERO, Vec3::X, 1.0)).unwrap();
        let b = s.create(&RigidBodyDesc::new(Vec3::X * 0.9, Vec3::ZERO, 1.0)).unwrap();
        s.mutate(b, |body| body.sleeping = true).unwrap();
        resolve_contacts(&mut s, &[contact(a, b, Vec3::X, 0.1, 0.0)], &SolverConfig::default());
        let body_b = s.get(b).unwrap();
        assert!(!body_b.sleeping);
        assert_relative_eq!(body_b.velocity.x, 0.5);
    }

    #[test]
    fn test_impulse_keeps_rest_timer_of_awake_body() {
        let mut s = BodyStore::new();
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let ball = s
            .create(&RigidBodyDesc::new(Vec3::new(0.0, 0.99, 0.0), Vec3::new(0.0, -0.16, 0.0), 1.0))
            .unwrap();
        s.mutate(ball, |b| b.sleep_timer = 0.25).unwrap();
        resolve_contacts(&mut s, &[contact(ground, ball, Vec3::Y, 0.01, 0.0)], &SolverConfig::default());
        let b = s.get(ball).unwrap();
        assert_relative_eq!(b.velocity.y, 0.0);
        assert_eq!(b.sleep_timer, 0.25);
        assert!(!b.sleeping);
    }

    /// Ground, a resting body on it, and a falling body landing on top.
    fn stack(s: &mut BodyStore) -> (Vec<Contact>, BodyHandle, BodyHandle) {
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let low = s.create(&RigidBodyDesc::new(Vec3::Y, Vec3::ZERO, 1.0)).unwrap();
        let high = s
            .create(&RigidBodyDesc::new(Vec3::Y * 2.0, Vec3::new(0.0, -2.0, 0.0), 1.0))
            .unwrap();
        let contacts = vec![
            contact(ground, low, Vec3::Y, 0.0, 0.0),
            contact(low, high, Vec3::Y, 0.0, 0.0),
        ];
        (contacts, low, high)
    }

    fn worst_normal_velocity(s: &BodyStore, contacts: &[Contact]) -> f32 {
        contacts
            .iter()
            .map(|c| (s.get(c.b).unwrap().velocity - s.get(c.a).unwrap().velocity).dot(c.normal))
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn test_iterations_converge_on_stack() {
        let mut single = BodyStore::new();
        let (contacts, low, _) = stack(&mut single);
        resolve_contacts(&mut single, &contacts, &SolverConfig::default());
        // One pass pushes the lower body into the ground and leaves it there.
        assert_relative_eq!(single.get(low).unwrap().velocity.y, -1.0);
        assert_relative_eq!(worst_normal_velocity(&single, &contacts), -1.0);

        let mut four = BodyStore::new();
        let (contacts, low, high) = stack(&mut four);
        let cfg = SolverConfig { iterations: 4, ..Default::default() };
        resolve_contacts(&mut four, &contacts, &cfg);
        assert_relative_eq!(four.get(low).unwrap().velocity.y, -0.125);
        assert_relative_eq!(four.get(high).unwrap().velocity.y, -0.125);
        assert!(worst_normal_velocity(&four, &contacts) > worst_normal_velocity(&single, &contacts));

        let mut many = BodyStore::new();
        let (contacts, _, _) = stack(&mut many);
        let cfg = SolverConfig { iterations: 30, ..Default::default() };
        resolve_contacts(&mut many, &contacts, &cfg);
        assert!(worst_normal_velocity(&many, &contacts) >= -1e-6);
    }

    #[test]
    fn test_penetration_within_slop_is_left_alone() {
        let mut s = BodyStore::new();
        let a = s.create(&RigidBodyDesc::new(Vec3::ZERO, Vec3::ZERO, 1.0)).unwrap();
        let b = s.create(&RigidBodyDesc::new(Vec3::X * 0.99, Vec3::ZERO, 1.0)).unwrap();
        let cfg = SolverConfig { penetration_slop: 0.02, ..Default::default() };
        resolve_contacts(&mut s, &[contact(a, b, Vec3::X, 0.01, 0.0)], &cfg);
        assert_eq!(s.get(a).unwrap().position, Vec3::ZERO);
        assert_eq!(s.get(b).unwrap().position, Vec3::X * 0.99);

        // Only the depth beyond the slop is removed.
        resolve_contacts(&mut s, &[contact(a, b, Vec3::X, 0.06, 0.0)], &cfg);
        assert_relative_eq!(s.get(a).unwrap().position.x, -0.02, epsilon = 1e-6);
        assert_relative_eq!(s.get(b).unwrap().position.x, 1.01, epsilon = 1e-6);
    }

    #[test]
    fn test_partial_position_correction() {
        let mut s = BodyStore::new();
        let ground = s.create(&RigidBodyDesc::fixed(Vec3::ZERO)).unwrap();
        let ball = s.create(&RigidBodyDesc::new(Vec3::new(0.0, 0.8, 0.0), Vec3::ZERO, 1.0)).unwrap();
        let cfg = SolverConfig { position_correction: 0.5, ..Default::default() };
        resolve_contacts(&mut s, &[contact(ground, ball, Vec3::Y, 0.2, 0.0)], &cfg);
        // Half of the 0.2 depth, all of it taken by the dynamic side.
        assert_relative_eq!(s.get(ball).unwrap().position.y, 0.9, epsilon = 1e-6);
        assert_eq!(s.get(ground).unwrap().position, Vec3::ZERO);
    }
}
