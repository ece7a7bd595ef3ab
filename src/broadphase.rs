//! Broad phase: propose candidate pairs from bounding-box overlap.
//!
//! Every strategy emits the same list: pairs `(a, b)` of proxy indices with
//! `a < b`, deduplicated and sorted, with static-static pairs left out. The
//! narrow phase therefore sees pairs in the same order whatever strategy runs.

use std::collections::{HashMap, HashSet};

use crate::math::{Aabb, Vec3, axis_component};
use crate::types::BroadphaseKind;

/// One body as seen by the broad phase.
#[derive(Copy, Clone, Debug)]
pub struct Proxy {
    pub aabb: Aabb,
    /// Immovable; two fixed proxies never pair.
    pub fixed: bool,
}

#[inline]
fn admissible(a: &Proxy, b: &Proxy) -> bool {
    !(a.fixed && b.fixed) && a.aabb.overlaps(&b.aabb)
}

/// Run the configured strategy, replacing the contents of `out`.
pub fn find_pairs(kind: BroadphaseKind, proxies: &[Proxy], out: &mut Vec<(usize, usize)>) {
    match kind {
        BroadphaseKind::AllPairs => all_pairs(proxies, out),
        BroadphaseKind::SweepAndPrune { axis } => sweep_and_prune(proxies, axis, out),
        BroadphaseKind::UniformGrid { cell_size } => uniform_grid(proxies, cell_size, out),
    }
}

/// O(n^2) scan of every unordered pair.
pub fn all_pairs(proxies: &[Proxy], out: &mut Vec<(usize, usize)>) {
    out.clear();
    for i in 0..proxies.len() {
        for j in (i + 1)..proxies.len() {
            if admissible(&proxies[i], &proxies[j]) {
                out.push((i, j));
            }
        }
    }
}

/// Sort intervals on one axis and sweep; survivors are checked on all three axes.
pub fn sweep_and_prune(proxies: &[Proxy], axis: usize, out: &mut Vec<(usize, usize)>) {
    out.clear();
    let mut order: Vec<usize> = (0..proxies.len()).collect();
    order.sort_by(|&a, &b| {
        axis_component(proxies[a].aabb.min, axis)
            .total_cmp(&axis_component(proxies[b].aabb.min, axis))
            .then(a.cmp(&b))
    });

    let mut active: Vec<usize> = Vec::new();
    for &i in &order {
        let min_i = axis_component(proxies[i].aabb.min, axis);
        active.retain(|&j| axis_component(proxies[j].aabb.max, axis) >= min_i);
        for &j in &active {
            if admissible(&proxies[i], &proxies[j]) {
                out.push(if i < j { (i, j) } else { (j, i) });
            }
        }
        active.push(i);
    }
    out.sort_unstable();
}

/// Proxies covering more cells than this skip the grid.
pub const MAX_CELLS_PER_PROXY: i64 = 64;

/// Hash every box into the cubic cells it touches and pair up cell mates.
///
/// A proxy that would cover more than [`MAX_CELLS_PER_PROXY`] cells goes on a
/// side list and is tested against every other proxy instead, so a tiny cell
/// size next to a huge body costs O(n) rather than O(volume / cell³).
pub fn uniform_grid(proxies: &[Proxy], cell_size: f32, out: &mut Vec<(usize, usize)>) {
    out.clear();
    let cs = cell_size.max(1e-5);
    let to_cell = |v: Vec3| {
        let c = (v / cs).floor();
        [c.x as i32, c.y as i32, c.z as i32]
    };

    let mut grid: HashMap<(i32, i32, i32), Vec<usize>> = HashMap::new();
    let mut large: Vec<usize> = Vec::new();
    for (idx, p) in proxies.iter().enumerate() {
        let (lo, hi) = (to_cell(p.aabb.min), to_cell(p.aabb.max));
        let cells = (0..3)
            .map(|k| i64::from(hi[k]) - i64::from(lo[k]) + 1)
            .fold(1i64, i64::saturating_mul);
        if cells > MAX_CELLS_PER_PROXY {
            large.push(idx);
            continue;
        }
        for iz in lo[2]..=hi[2] {
            for iy in lo[1]..=hi[1] {
                for ix in lo[0]..=hi[0] {
                    grid.entry((ix, iy, iz)).or_default().push(idx);
                }
            }
        }
    }

    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut consider = |a: usize, b: usize, out: &mut Vec<(usize, usize)>| {
        let key = if a < b { (a, b) } else { (b, a) };
        if seen.insert(key) && admissible(&proxies[key.0], &proxies[key.1]) {
            out.push(key);
        }
    };
    for indices in grid.values() {
        for i0 in 0..indices.len() {
            for i1 in (i0 + 1)..indices.len() {
                consider(indices[i0], indices[i1], &mut *out);
            }
        }
    }
    for &l in &large {
        for other in (0..proxies.len()).filter(|&o| o != l) {
            consider(l, other, &mut *out);
        }
    }
    // Hash iteration order is arbitrary; sorting keeps the step deterministic.
    out.sort_unstable();
}
