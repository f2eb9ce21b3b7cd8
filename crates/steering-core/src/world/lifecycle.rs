use super::metrics::StepTimings;
use super::{World, WorldInitError};
use crate::agent::{Agent, AgentParams};
use crate::collision;
use crate::config::SimConfig;
use crate::neighbor;
use crate::steering;
use rand::Rng;
use std::f64::consts::TAU;
use std::time::Instant;

impl World {
    fn next_agent_id_checked(&mut self) -> Option<u32> {
        if self.next_agent_id == u32::MAX {
            return None;
        }
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        Some(id)
    }

    /// Random coordinate on one axis, inset by half the wall border and the agent radius.
    fn spawn_coord(&mut self, axis: usize, radius: f64) -> f64 {
        let inset = self.config.wall_border * 0.5 + radius;
        let lo = self.config.world_min[axis] + inset;
        let hi = self.config.world_max[axis] - inset;
        if lo < hi {
            self.rng.random_range(lo..hi)
        } else {
            (self.config.world_min[axis] + self.config.world_max[axis]) * 0.5
        }
    }

    /// Spawn `count` agents at random positions and headings. Returns their ids.
    pub fn spawn(
        &mut self,
        count: usize,
        params: &AgentParams,
    ) -> Result<Vec<u32>, WorldInitError> {
        params.validate()?;
        let total = self.agents.len().saturating_add(count);
        if total > SimConfig::MAX_TOTAL_AGENTS {
            return Err(WorldInitError::TooManyAgents {
                max: SimConfig::MAX_TOTAL_AGENTS,
                actual: total,
            });
        }
        let remaining_ids = u32::MAX as u64 - self.next_agent_id as u64;
        if remaining_ids < count as u64 {
            return Err(WorldInitError::AgentIdExhausted);
        }

        let mut ids = Vec::with_capacity(count);
        self.agents.reserve(count);
        for _ in 0..count {
            let Some(id) = self.next_agent_id_checked() else {
                return Err(WorldInitError::AgentIdExhausted);
            };
            let position = [
                self.spawn_coord(0, params.radius),
                self.spawn_coord(1, params.radius),
            ];
            let heading = self.rng.random_range(0.0..TAU);
            self.agents.push(Agent::try_new(id, position, heading, params)?);
            ids.push(id);
        }
        self.sync_buffers();
        tracing::debug!(spawned = count, total = self.agents.len(), "agents spawned");
        Ok(ids)
    }

    /// Remove the agent with `id`. The last slot moves into the freed one.
    pub fn remove_agent(&mut self, id: u32) -> bool {
        let Some(slot) = self.agents.iter().position(|a| a.id == id) else {
            return false;
        };
        self.agents.swap_remove(slot);
        // Buffers are refilled every step; swapping keeps their allocations.
        self.neighbors.swap_remove(slot);
        self.obstacles.swap_remove(slot);
        self.sync_buffers();
        true
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Order: grid occupancy, neighbor pass, steering pass, collision pass.
    /// Each pass finishes for every agent before the next starts; results are
    /// staged and swapped in only after the collision pass completed.
    pub fn step(&mut self, dt: f64) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            tracing::warn!(dt, step = self.step_index, "invalid dt treated as zero");
            0.0
        };

        let t0 = Instant::now();
        self.grid.rebuild(self.agents.iter().map(|a| a.position));
        let grid_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        neighbor::neighbor_pass(
            &self.grid,
            &self.walls,
            &self.agents,
            &mut self.neighbors,
            &mut self.obstacles,
        );
        let neighbor_query_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.staged.clone_from(&self.agents);
        steering::steering_pass(
            &self.agents,
            &self.neighbors,
            &self.obstacles,
            &self.config.steering,
            dt,
            &mut self.staged,
        );
        let steering_us = t2.elapsed().as_micros() as u64;

        let t3 = Instant::now();
        collision::collision_pass(
            &mut self.staged,
            &self.agents,
            &self.neighbors,
            dt,
            self.config.world_min,
            self.config.world_max,
        );
        std::mem::swap(&mut self.agents, &mut self.staged);
        let collision_us = t3.elapsed().as_micros() as u64;

        let timings = StepTimings {
            grid_build_us,
            neighbor_query_us,
            steering_us,
            collision_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        tracing::debug!(
            step = self.step_index,
            agents = self.agents.len(),
            grid_build_us,
            neighbor_query_us,
            steering_us,
            collision_us,
            total_us = timings.total_us,
            "step complete"
        );
        timings
    }
}
