use glam::Vec3;

use std::time::Instant;

use tracing::{debug, trace};

use crate::api::{NarrowphaseApi, PhysicsWorldApi};
use crate::broadphase::{self, Proxy};
use crate::error::{PhysicsError, Result};
use crate::integrator;
use crate::math::{Aabb, is_finite_vec};
use crate::narrowphase::Narrowphase;
use crate::solver;
use crate::store::BodyStore;
use crate::types::*;

/// Sleepers this close to a destroyed body are woken.
const WAKE_MARGIN: f32 = 1e-3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Destroyed,
}

/// Rigid-body world: owns the body store and runs integrate → detect → resolve.
///
/// Not `Sync`-safe for concurrent mutation; one owner drives it serially.
/// Independent worlds share nothing and may run on separate threads.
pub struct PhysicsWorld {
    cfg: WorldConfig,
    state: Lifecycle,
    store: BodyStore,

    // Step-scoped scratch, reused across steps
    snapshot: Vec<(BodyHandle, RigidBody)>,
    proxies: Vec<Proxy>,
    pairs: Vec<(usize, usize)>,
    contacts: Vec<Contact>,

    stats: WorldStats,
    last_timing: Option<StepTiming>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::build(WorldConfig::default())
    }
}

impl PhysicsWorldApi for PhysicsWorld {
    fn new(cfg: WorldConfig) -> Result<Self> {
        cfg.validate()?;
        debug!(gravity = %cfg.gravity, broadphase = ?cfg.broadphase, "world created");
        Ok(Self::build(cfg))
    }

    fn destroy(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let bodies = self.store.len();
        // Release the memory, not just the contents.
        self.store = BodyStore::new();
        self.snapshot = Vec::new();
        self.proxies = Vec::new();
        self.pairs = Vec::new();
        self.contacts = Vec::new();
        self.last_timing = None;
        self.state = Lifecycle::Destroyed;
        debug!(bodies, steps = self.stats.steps, "world destroyed");
        Ok(())
    }

    fn is_destroyed(&self) -> bool {
        self.state == Lifecycle::Destroyed
    }

    fn create_body(&mut self, desc: RigidBodyDesc) -> Result<BodyHandle> {
        self.ensure_alive()?;
        let handle = self.store.create(&desc)?;
        debug!(handle = %handle, mass = desc.mass, position = %desc.position, "body created");
        Ok(handle)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.ensure_alive()?;
        let removed = self.store.destroy(handle)?;
        // Whatever was resting on it has lost its support.
        let bounds = removed.aabb();
        let margin = Vec3::splat(WAKE_MARGIN);
        let reach = Aabb::new(bounds.min - margin, bounds.max + margin);
        let mut woken = 0;
        for body in self.store.iter_mut() {
            if body.sleeping && body.aabb().overlaps(&reach) {
                body.wake();
                woken += 1;
            }
        }
        debug!(handle = %handle, woken, "body destroyed");
        Ok(())
    }

    fn body(&self, handle: BodyHandle) -> Result<RigidBody> {
        self.ensure_alive()?;
        self.store.get(handle)
    }

    fn position(&self, handle: BodyHandle) -> Result<Vec3> {
        Ok(self.body(handle)?.position)
    }

    fn velocity(&self, handle: BodyHandle) -> Result<Vec3> {
        Ok(self.body(handle)?.velocity)
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<()> {
        self.ensure_alive()?;
        if !is_finite_vec(velocity) {
            return Err(PhysicsError::descriptor(format!(
                "velocity must be finite, got {velocity}"
            )));
        }
        self.store.mutate(handle, |body| {
            if !body.is_static() {
                body.velocity = velocity;
                body.wake();
            }
        })
    }

    fn is_alive(&self, handle: BodyHandle) -> Result<bool> {
        self.ensure_alive()?;
        Ok(self.store.contains(handle))
    }

    fn body_count(&self) -> Result<usize> {
        self.ensure_alive()?;
        Ok(self.store.len())
    }

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        self.ensure_alive()?;
        if !is_finite_vec(gravity) {
            return Err(PhysicsError::config(format!("gravity must be finite, got {gravity}")));
        }
        self.cfg.gravity = gravity;
        for body in self.store.iter_mut() {
            body.wake();
        }
        Ok(())
    }

    fn gravity(&self) -> Result<Vec3> {
        self.ensure_alive()?;
        Ok(self.cfg.gravity)
    }

    fn step(&mut self, dt: f32) -> Result<()> {
        self.ensure_alive()?;
        integrator::validate_timestep(dt)?;

        let timed = self.cfg.enable_timing;
        let now = || if timed { Some(Instant::now()) } else { None };
        let ms = |t: Option<Instant>| t.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);
        let t_all = now();

        // 1. Integrate
        let t0 = now();
        integrator::integrate(self.store.iter_mut(), dt, self.cfg.gravity);
        let integrate_ms = ms(t0);

        // 2a. Broad phase over post-integration bounds
        let t1 = now();
        self.snapshot.clear();
        self.snapshot.extend(self.store.iter().map(|(h, b)| (h, *b)));
        self.proxies.clear();
        self.proxies.extend(self.snapshot.iter().map(|(_, b)| Proxy {
            aabb: b.aabb(),
            fixed: b.is_static(),
        }));
        broadphase::find_pairs(self.cfg.broadphase, &self.proxies, &mut self.pairs);
        let broadphase_ms = ms(t1);

        // 2b. Narrow phase, one contact per pair at most
        let t2 = now();
        self.contacts.clear();
        for &(i, j) in &self.pairs {
            let (ha, a) = &self.snapshot[i];
            let (hb, b) = &self.snapshot[j];
            if let Some(ov) = Narrowphase::collide(&a.shape, a.position, &b.shape, b.position) {
                let m = a.material.combine(b.material);
                self.contacts.push(Contact {
                    a: *ha,
                    b: *hb,
                    normal: ov.normal,
                    depth: ov.depth,
                    point: ov.point,
                    friction: m.friction,
                    restitution: m.restitution,
                });
            }
        }
        let narrowphase_ms = ms(t2);

        // 3. Resolve, then sleep bookkeeping on the settled velocities
        let t3 = now();
        let report = solver::resolve_contacts(&mut self.store, &self.contacts, &self.cfg.solver);
        let slept = integrator::update_sleep(self.store.iter_mut(), dt, &self.cfg.sleep);
        let solve_ms = ms(t3);

        self.stats = WorldStats {
            bodies: self.store.len(),
            candidate_pairs: self.pairs.len(),
            contacts: self.contacts.len(),
            steps: self.stats.steps + 1,
        };
        if let Some(t_all) = t_all {
            self.last_timing = Some(StepTiming {
                step_ms: t_all.elapsed().as_secs_f64() * 1000.0,
                integrate_ms,
                broadphase_ms,
                narrowphase_ms,
                solve_ms,
            });
        }
        trace!(
            step = self.stats.steps,
            bodies = self.stats.bodies,
            candidate_pairs = self.stats.candidate_pairs,
            contacts = self.stats.contacts,
            resolved = report.resolved,
            slept,
            "step complete"
        );
        Ok(())
    }

    fn contacts(&self) -> Result<&[Contact]> {
        self.ensure_alive()?;
        Ok(&self.contacts)
    }
}

impl PhysicsWorld {
    fn build(cfg: WorldConfig) -> Self {
        Self {
            cfg,
            state: Lifecycle::Active,
            store: BodyStore::new(),
            snapshot: Vec::new(),
            proxies: Vec::new(),
            pairs: Vec::new(),
            contacts: Vec::new(),
            stats: WorldStats::default(),
            last_timing: None,
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        match self.state {
            Lifecycle::Active => Ok(()),
            Lifecycle::Destroyed => Err(PhysicsError::WorldDestroyed),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    /// Live bodies in slot order, as snapshot copies.
    pub fn bodies(&self) -> Result<Vec<(BodyHandle, RigidBody)>> {
        self.ensure_alive()?;
        Ok(self.store.iter().map(|(h, b)| (h, *b)).collect())
    }

    /// Return debug stats for the last completed step.
    pub fn debug_stats(&self) -> WorldStats {
        self.stats
    }

    /// Return timing breakdown for the last step (requires `enable_timing`).
    pub fn timing(&self) -> Option<StepTiming> {
        self.last_timing
    }
}
