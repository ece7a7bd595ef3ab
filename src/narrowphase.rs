use glam::Vec3;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Below this squared distance two centers count as coincident.
const COINCIDENT_EPS2: f32 = 1e-12;

/// Exact overlap tests for the supported shape pairs.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn sphere_sphere(c0: Vec3, r0: f32, c1: Vec3, r1: f32) -> Option<Overlap> {
        let delta = c1 - c0;
        let dist2 = delta.length_squared();
        let rsum = r0 + r1;
        if dist2 >= rsum * rsum {
            return None;
        }
        if dist2 <= COINCIDENT_EPS2 {
            // Coincident centers; pick +Y so stacked spawns separate vertically.
            return Some(Overlap {
                normal: Vec3::Y,
                depth: rsum,
                point: c0,
            });
        }
        let dist = dist2.sqrt();
        let normal = delta / dist;
        Some(Overlap {
            normal,
            depth: rsum - dist,
            point: c0 + normal * r0,
        })
    }

    fn sphere_cuboid(c: Vec3, r: f32, box_c: Vec3, box_h: Vec3) -> Option<Overlap> {
        let closest = c.clamp(box_c - box_h, box_c + box_h);
        let d = c - closest;
        let dist2 = d.length_squared();
        if dist2 >= r * r {
            return None;
        }
        if dist2 > COINCIDENT_EPS2 {
            let dist = dist2.sqrt();
            // `d` points from the box surface out to the sphere center.
            return Some(Overlap {
                normal: -d / dist,
                depth: r - dist,
                point: closest,
            });
        }

        // Center inside the box: leave through the nearest face.
        let local = c - box_c;
        let face = box_h - local.abs();
        let (axis, gap) = if face.x < face.y && face.x < face.z {
            (Vec3::X, face.x)
        } else if face.y < face.z {
            (Vec3::Y, face.y)
        } else {
            (Vec3::Z, face.z)
        };
        let outward = if local.dot(axis) < 0.0 { -axis } else { axis };
        Some(Overlap {
            normal: -outward,
            depth: r + gap,
            point: c,
        })
    }

    fn cuboid_cuboid(c0: Vec3, h0: Vec3, c1: Vec3, h1: Vec3) -> Option<Overlap> {
        let d = c1 - c0;
        let overlap = (h0 + h1) - d.abs();
        if overlap.min_element() <= 0.0 {
            return None;
        }

        // Axis of minimum penetration
        let (axis, depth, along) = if overlap.x <= overlap.y && overlap.x <= overlap.z {
            (Vec3::X, overlap.x, d.x)
        } else if overlap.y <= overlap.z {
            (Vec3::Y, overlap.y, d.y)
        } else {
            (Vec3::Z, overlap.z, d.z)
        };
        let normal = if along >= 0.0 { axis } else { -axis };

        // Center of the intersection box
        let lo = (c0 - h0).max(c1 - h1);
        let hi = (c0 + h0).min(c1 + h1);
        Some(Overlap {
            normal,
            depth,
            point: (lo + hi) * 0.5,
        })
    }
}
