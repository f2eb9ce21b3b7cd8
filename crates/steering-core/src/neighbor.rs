use crate::agent::Agent;
use crate::grid::GridIndex;
use crate::math::{self, Vec2};
use crate::wall::{ObstacleRecord, WallRegistry};
use rayon::prelude::*;

/// Snapshot of another agent taken for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborRecord {
    pub id: u32,
    pub slot: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f64,
    pub mass: f64,
}

impl NeighborRecord {
    fn of(slot: usize, agent: &Agent) -> Self {
        Self {
            id: agent.id,
            slot,
            position: agent.position,
            velocity: agent.kinematics.velocity,
            radius: agent.radius,
            mass: agent.mass,
        }
    }
}

/// Replace `out` with the agents within `agents[slot]`'s view distance.
///
/// `grid` must have been rebuilt from `agents` in slot order. Results follow
/// cell order, then slot order within a cell.
pub fn collect_neighbors(
    grid: &GridIndex,
    agents: &[Agent],
    slot: usize,
    out: &mut Vec<NeighborRecord>,
) {
    out.clear();
    let Some(agent) = agents.get(slot) else {
        return;
    };
    let view = agent.kinematics.view_distance;
    let view_sq = view * view;
    for cell in grid.cell_span(agent.position, view) {
        for &other_slot in grid.agents_in(cell) {
            if other_slot == slot {
                continue;
            }
            let other = &agents[other_slot];
            if math::distance_sq(agent.position, other.position) <= view_sq {
                out.push(NeighborRecord::of(other_slot, other));
            }
        }
    }
}

/// Refill every agent's neighbor and obstacle buffers in parallel.
///
/// Each task writes only the buffers of its own slot.
pub fn neighbor_pass(
    grid: &GridIndex,
    walls: &WallRegistry,
    agents: &[Agent],
    neighbors: &mut [Vec<NeighborRecord>],
    obstacles: &mut [Vec<ObstacleRecord>],
) {
    debug_assert_eq!(neighbors.len(), agents.len());
    debug_assert_eq!(obstacles.len(), agents.len());
    neighbors
        .par_iter_mut()
        .zip(obstacles.par_iter_mut())
        .enumerate()
        .for_each(|(slot, (neighbor_buf, obstacle_buf))| {
            collect_neighbors(grid, agents, slot, neighbor_buf);
            let agent = &agents[slot];
            walls.query(agent.position, agent.kinematics.view_distance, obstacle_buf);
        });
}
