//! Overlap resolution: pushes agents out of heavier-or-equal neighbors and
//! keeps every agent inside the world rectangle.

use crate::agent::Agent;
use crate::math::{self, Vec2};
use crate::neighbor::NeighborRecord;
use rayon::prelude::*;

/// Accumulated away force on `agent` from overlapping neighbors.
///
/// Neighbors lighter than the agent are ignored. The magnitude grows with the
/// square of the penetration depth relative to the agent's own radius.
pub fn away_force(agent: &Agent, neighbors: &[NeighborRecord]) -> Vec2 {
    let mut force = [0.0, 0.0];
    for n in neighbors {
        if agent.mass > n.mass {
            continue;
        }
        let radius_both = agent.radius + n.radius;
        let offset = math::sub(agent.position, n.position);
        let d2 = math::length_sq(offset);
        if d2 >= radius_both * radius_both {
            continue;
        }
        let d = d2.sqrt();
        let factor = ((radius_both - d) / agent.radius).powi(2);
        if d > 0.0 {
            force = math::add(force, math::scale(offset, factor / d));
        } else {
            // Coincident centers: split along x by id so the pair separates.
            tracing::trace!(agent = agent.id, neighbor = n.id, "coincident centers");
            let dir = if agent.id <= n.id { [-1.0, 0.0] } else { [1.0, 0.0] };
            force = math::add(force, math::scale(dir, factor));
        }
    }
    force
}

/// Clamp `agent` into `[min, max]`, reflecting the velocity component of every
/// clamped axis that still points outward.
pub fn constrain_to_bounds(agent: &mut Agent, min: Vec2, max: Vec2) {
    let mut velocity = agent.kinematics.velocity;
    let mut reflected = false;
    for axis in 0..2 {
        let p = agent.position[axis];
        if p < min[axis] {
            agent.position[axis] = min[axis];
            if velocity[axis] < 0.0 {
                velocity[axis] = -velocity[axis];
                reflected = true;
            }
        } else if p > max[axis] {
            agent.position[axis] = max[axis];
            if velocity[axis] > 0.0 {
                velocity[axis] = -velocity[axis];
                reflected = true;
            }
        }
    }
    if reflected {
        agent.kinematics.set_velocity(velocity);
    }
}

/// Apply the away force for `dt` seconds and clamp into bounds.
///
/// `previous` is the last committed position; it is restored if the update
/// would produce a non-finite position.
pub fn resolve(
    agent: &mut Agent,
    neighbors: &[NeighborRecord],
    dt: f64,
    min: Vec2,
    max: Vec2,
    previous: Vec2,
) {
    if dt.is_finite() && dt > 0.0 && !neighbors.is_empty() {
        let force = away_force(agent, neighbors);
        agent.position = math::add(agent.position, math::scale(force, dt));
    }
    if !math::is_finite(agent.position) {
        tracing::trace!(agent = agent.id, "non-finite position restored");
        agent.position = previous;
    }
    constrain_to_bounds(agent, min, max);
}

/// Resolve overlaps for every agent in parallel.
///
/// `staged` holds this step's post-steering agents and is updated in place;
/// `committed` is the state at the start of the step.
pub fn collision_pass(
    staged: &mut [Agent],
    committed: &[Agent],
    neighbors: &[Vec<NeighborRecord>],
    dt: f64,
    min: Vec2,
    max: Vec2,
) {
    debug_assert_eq!(staged.len(), neighbors.len());
    staged
        .par_iter_mut()
        .zip(committed.par_iter())
        .zip(neighbors.par_iter())
        .for_each(|((agent, before), neigh)| {
            resolve(agent, neigh, dt, min, max, before.position);
        });
}
