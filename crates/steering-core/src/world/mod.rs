pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::agent::Agent;
use crate::config::{SimConfig, SimConfigError};
use crate::grid::{Cell, GridIndex};
use crate::math::{self, Vec2};
use crate::neighbor::NeighborRecord;
use crate::wall::{ObstacleRecord, Wall, WallRegistry};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::collections::HashSet;
use std::{error::Error, fmt};

/// Owns every agent, the grid, the walls and the per-slot scratch buffers.
///
/// Agent slots are positions in `agents`; all per-agent buffers are indexed by
/// the same slot and resized together.
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) grid: GridIndex,
    pub(crate) walls: WallRegistry,
    pub(crate) agents: Vec<Agent>,
    pub(crate) staged: Vec<Agent>,
    pub(crate) neighbors: Vec<Vec<NeighborRecord>>,
    pub(crate) obstacles: Vec<Vec<ObstacleRecord>>,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) next_agent_id: u32,
    pub(crate) step_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    TooManyAgents { max: usize, actual: usize },
    DuplicateAgentId(u32),
    AgentOutOfBounds { id: u32, position: Vec2 },
    AgentIdExhausted,
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::TooManyAgents { max, actual } => {
                write!(f, "total agents ({actual}) exceeds supported maximum ({max})")
            }
            WorldInitError::DuplicateAgentId(id) => write!(f, "agent id {id} is used twice"),
            WorldInitError::AgentOutOfBounds { id, position } => {
                write!(f, "agent {id} starts outside the world bounds at {position:?}")
            }
            WorldInitError::AgentIdExhausted => write!(f, "agent id space exhausted"),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build the grid and walls, then spawn `config.initial_agents` agents.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        let mut world = Self::empty(config)?;
        let count = world.config.initial_agents;
        let params = world.config.agent;
        world.spawn(count, &params)?;
        Ok(world)
    }

    /// Build a world around host-provided agents; `config.initial_agents` is ignored.
    pub fn with_agents(config: SimConfig, agents: Vec<Agent>) -> Result<Self, WorldInitError> {
        let mut world = Self::empty(config)?;
        if agents.len() > SimConfig::MAX_TOTAL_AGENTS {
            return Err(WorldInitError::TooManyAgents {
                max: SimConfig::MAX_TOTAL_AGENTS,
                actual: agents.len(),
            });
        }
        let (min, max) = world.grid.bounds();
        let mut seen = HashSet::with_capacity(agents.len());
        for agent in &agents {
            if !seen.insert(agent.id) {
                return Err(WorldInitError::DuplicateAgentId(agent.id));
            }
            if !agent.radius.is_finite() || agent.radius <= 0.0 {
                return Err(SimConfigError::InvalidRadius(agent.radius).into());
            }
            if !agent.mass.is_finite() || agent.mass <= 0.0 {
                return Err(SimConfigError::InvalidMass(agent.mass).into());
            }
            let p = agent.position;
            let inside = math::is_finite(p)
                && (min[0]..=max[0]).contains(&p[0])
                && (min[1]..=max[1]).contains(&p[1]);
            if !inside {
                return Err(WorldInitError::AgentOutOfBounds {
                    id: agent.id,
                    position: p,
                });
            }
        }
        let max_id = agents.iter().map(|a| a.id).max();
        world.next_agent_id = match max_id {
            Some(id) => id.checked_add(1).ok_or(WorldInitError::AgentIdExhausted)?,
            None => 0,
        };
        world.agents = agents;
        world.sync_buffers();
        Ok(world)
    }

    fn empty(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let grid = GridIndex::build(
            config.world_min,
            config.world_max,
            config.cells_x,
            config.cells_z,
        )?;
        let half_border = config.wall_border * 0.5;
        let mut walls =
            WallRegistry::border_walls(config.world_min, config.world_max, config.wall_border)?;
        for [from, to] in &config.walls {
            walls.push(Wall::new(*from, *to, half_border)?);
        }
        Ok(Self {
            grid,
            walls: WallRegistry::new(walls),
            agents: Vec::new(),
            staged: Vec::new(),
            neighbors: Vec::new(),
            obstacles: Vec::new(),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            next_agent_id: 0,
            step_index: 0,
            config,
        })
    }

    /// Keep per-slot buffers the same length as `agents`, reusing allocations.
    /// Resize per-slot buffers to the agent count after slots changed.
    ///
    /// Slot indices shift on removal, so existing records are dropped and
    /// occupancy is re-binned. Lists stay empty until the next step.
    pub(crate) fn sync_buffers(&mut self) {
        let n = self.agents.len();
        self.neighbors.resize_with(n, Vec::new);
        self.obstacles.resize_with(n, Vec::new);
        self.neighbors.iter_mut().for_each(Vec::clear);
        self.obstacles.iter_mut().for_each(Vec::clear);
        self.staged.truncate(n);
        self.grid.rebuild(self.agents.iter().map(|a| a.position));
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn cells(&self) -> &[Cell] {
        self.grid.cells()
    }

    pub fn walls(&self) -> &WallRegistry {
        &self.walls
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Neighbor list built for `slot` during the last step.
    pub fn neighbors_of(&self, slot: usize) -> &[NeighborRecord] {
        self.neighbors.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Obstacle list built for `slot` during the last step.
    pub fn obstacles_of(&self, slot: usize) -> &[ObstacleRecord] {
        self.obstacles.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn run_experiment(&mut self, steps: usize, dt: f64, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, dt, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        dt: f64,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step(dt);
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            dt,
            final_agent_count: self.agents.len(),
            samples,
            final_frames: Vec::new(),
        })
    }
}
