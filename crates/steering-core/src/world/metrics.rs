use super::World;
use crate::math::{self, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub grid_build_us: u64,
    pub neighbor_query_us: u64,
    pub steering_us: u64,
    pub collision_us: u64,
    pub total_us: u64,
}

/// What the presentation layer needs to draw one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentFrame {
    pub id: u32,
    pub position: Vec2,
    pub forward: Vec2,
    pub right: Vec2,
    /// Plane position lifted to `(x, 0, z)`.
    pub translation: [f64; 3],
}

/// Cell geometry for debug drawing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellFrame {
    pub index: usize,
    pub center: Vec2,
    pub extents: Vec2,
    pub occupants: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub agent_count: usize,
    pub mean_speed: f64,
    pub max_speed: f64,
    pub mean_neighbors: f64,
    pub mean_obstacles: f64,
    /// Overlapping pairs among last step's neighbor candidates, at committed positions.
    pub overlapping_pairs: usize,
    pub max_penetration: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub dt: f64,
    pub final_agent_count: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub final_frames: Vec<AgentFrame>,
}

impl World {
    pub fn agent_frames(&self) -> Vec<AgentFrame> {
        self.agents
            .iter()
            .map(|a| AgentFrame {
                id: a.id,
                position: a.position,
                forward: a.kinematics.forward,
                right: a.kinematics.right,
                translation: a.transform(),
            })
            .collect()
    }

    /// Cell geometry plus the occupancy seen by the last step.
    pub fn cell_frames(&self) -> Vec<CellFrame> {
        self.grid
            .cells()
            .iter()
            .map(|c| CellFrame {
                index: c.index,
                center: c.center,
                extents: c.extents,
                occupants: self.grid.agents_in(c.index).len(),
            })
            .collect()
    }

    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let n = self.agents.len();
        let denom = n.max(1) as f64;

        let mut speed_sum = 0.0;
        let mut max_speed: f64 = 0.0;
        for a in &self.agents {
            speed_sum += a.kinematics.speed;
            max_speed = max_speed.max(a.kinematics.speed);
        }
        let neighbor_total: usize = self.neighbors.iter().map(Vec::len).sum();
        let obstacle_total: usize = self.obstacles.iter().map(Vec::len).sum();

        let mut overlapping_pairs = 0usize;
        let mut max_penetration: f64 = 0.0;
        for (slot, list) in self.neighbors.iter().enumerate().take(n) {
            let a = &self.agents[slot];
            for record in list.iter().filter(|r| r.slot > slot && r.slot < n) {
                let b = &self.agents[record.slot];
                let radius_both = a.radius + b.radius;
                let d = math::distance_sq(a.position, b.position).sqrt();
                if d < radius_both {
                    overlapping_pairs += 1;
                    max_penetration = max_penetration.max(radius_both - d);
                }
            }
        }

        StepMetrics {
            step,
            agent_count: n,
            mean_speed: speed_sum / denom,
            max_speed,
            mean_neighbors: neighbor_total as f64 / denom,
            mean_obstacles: obstacle_total as f64 / denom,
            overlapping_pairs,
            max_penetration,
        }
    }
}
