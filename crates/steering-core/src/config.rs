use crate::agent::AgentParams;
use crate::math::{self, Vec2};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Relative weights of the flocking behaviors blended by the steering pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringWeights {
    pub separation: f64,
    pub alignment: f64,
    pub cohesion: f64,
    pub wall_avoidance: f64,
}

impl Default for SteeringWeights {
    fn default() -> Self {
        Self {
            separation: 1.5,
            alignment: 1.0,
            cohesion: 0.5,
            wall_avoidance: 3.0,
        }
    }
}

impl SteeringWeights {
    /// All behaviors off: agents keep their current velocity.
    pub const NONE: SteeringWeights = SteeringWeights {
        separation: 0.0,
        alignment: 0.0,
        cohesion: 0.0,
        wall_avoidance: 0.0,
    };
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world_min: Vec2,
    pub world_max: Vec2,
    pub cells_x: usize,
    pub cells_z: usize,
    /// Thickness of the border walls; also shrinks the spawn region.
    pub wall_border: f64,
    /// Extra wall segments as `[from, to]` endpoint pairs.
    pub walls: Vec<[Vec2; 2]>,
    pub initial_agents: usize,
    pub agent: AgentParams,
    pub steering: SteeringWeights,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_min: [0.0, 0.0],
            world_max: [100.0, 100.0],
            cells_x: 10,
            cells_z: 10,
            wall_border: 1.0,
            walls: Vec::new(),
            initial_agents: 0,
            agent: AgentParams::default(),
            steering: SteeringWeights::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    InvalidBounds { min: Vec2, max: Vec2 },
    InvalidResolution { cells_x: usize, cells_z: usize },
    TooManyCells { max: usize, actual: usize },
    InvalidWallBorder(f64),
    DegenerateWall { from: Vec2, to: Vec2 },
    InvalidRadius(f64),
    InvalidMass(f64),
    InvalidLimit { name: &'static str, value: f64 },
    InvalidSteeringWeight { name: &'static str, value: f64 },
    TooManyAgents { max: usize, actual: usize },
    Parse(String),
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::InvalidBounds { min, max } => write!(
                f,
                "world bounds must be finite with min < max on both axes (min={min:?}, max={max:?})"
            ),
            SimConfigError::InvalidResolution { cells_x, cells_z } => write!(
                f,
                "grid resolution must be positive (cells_x={cells_x}, cells_z={cells_z})"
            ),
            SimConfigError::TooManyCells { max, actual } => {
                write!(f, "grid cell count ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::InvalidWallBorder(v) => {
                write!(f, "wall_border must be finite and non-negative, got {v}")
            }
            SimConfigError::DegenerateWall { from, to } => {
                write!(f, "wall endpoints must differ and be finite ({from:?} -> {to:?})")
            }
            SimConfigError::InvalidRadius(r) => {
                write!(f, "agent radius must be finite and positive, got {r}")
            }
            SimConfigError::InvalidMass(m) => {
                write!(f, "agent mass must be finite and positive, got {m}")
            }
            SimConfigError::InvalidLimit { name, value } => {
                write!(f, "{name} must be finite and non-negative, got {value}")
            }
            SimConfigError::InvalidSteeringWeight { name, value } => {
                write!(f, "steering weight {name} must be finite, got {value}")
            }
            SimConfigError::TooManyAgents { max, actual } => {
                write!(f, "initial_agents ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::Parse(msg) => write!(f, "invalid config document: {msg}"),
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub const MAX_TOTAL_AGENTS: usize = 1_000_000;
    pub const MAX_CELLS: usize = 1 << 20;

    pub fn from_json_str(s: &str) -> Result<Self, SimConfigError> {
        serde_json::from_str(s).map_err(|e| SimConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        validate_bounds(self.world_min, self.world_max)?;
        validate_resolution(self.cells_x, self.cells_z)?;
        if !self.wall_border.is_finite() || self.wall_border < 0.0 {
            return Err(SimConfigError::InvalidWallBorder(self.wall_border));
        }
        for [from, to] in &self.walls {
            if !math::is_finite(*from)
                || !math::is_finite(*to)
                || math::distance_sq(*from, *to) <= math::EPSILON
            {
                return Err(SimConfigError::DegenerateWall {
                    from: *from,
                    to: *to,
                });
            }
        }
        if self.initial_agents > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_TOTAL_AGENTS,
                actual: self.initial_agents,
            });
        }
        self.agent.validate()?;
        let w = &self.steering;
        for (name, value) in [
            ("separation", w.separation),
            ("alignment", w.alignment),
            ("cohesion", w.cohesion),
            ("wall_avoidance", w.wall_avoidance),
        ] {
            if !value.is_finite() {
                return Err(SimConfigError::InvalidSteeringWeight { name, value });
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_bounds(min: Vec2, max: Vec2) -> Result<(), SimConfigError> {
    let ok = math::is_finite(min) && math::is_finite(max) && min[0] < max[0] && min[1] < max[1];
    if ok {
        Ok(())
    } else {
        Err(SimConfigError::InvalidBounds { min, max })
    }
}

pub(crate) fn validate_resolution(cells_x: usize, cells_z: usize) -> Result<(), SimConfigError> {
    if cells_x == 0 || cells_z == 0 {
        return Err(SimConfigError::InvalidResolution { cells_x, cells_z });
    }
    match cells_x.checked_mul(cells_z) {
        Some(n) if n <= SimConfig::MAX_CELLS => Ok(()),
        Some(n) => Err(SimConfigError::TooManyCells {
            max: SimConfig::MAX_CELLS,
            actual: n,
        }),
        None => Err(SimConfigError::TooManyCells {
            max: SimConfig::MAX_CELLS,
            actual: usize::MAX,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let config = SimConfig {
            world_min: [10.0, 0.0],
            world_max: [0.0, 10.0],
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let config = SimConfig {
            cells_z: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidResolution {
                cells_x: 10,
                cells_z: 0
            })
        );
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut config = SimConfig::default();
        config.agent.radius = 0.0;
        assert_eq!(config.validate(), Err(SimConfigError::InvalidRadius(0.0)));
    }

    #[test]
    fn degenerate_extra_wall_is_rejected() {
        let config = SimConfig {
            walls: vec![[[5.0, 5.0], [5.0, 5.0]]],
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::DegenerateWall { .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            SimConfig::from_json_str(r#"{"cells_x": 4, "agent": {"radius": 0.25}}"#).unwrap();
        assert_eq!(config.cells_x, 4);
        assert_eq!(config.cells_z, SimConfig::default().cells_z);
        assert_eq!(config.agent.radius, 0.25);
        assert_eq!(config.agent.mass, AgentParams::default().mass);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SimConfig::from_json_str("{ not json"),
            Err(SimConfigError::Parse(_))
        ));
    }
}
