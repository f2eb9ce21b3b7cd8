use crate::config::SimConfigError;
use crate::math::{self, Vec2};
use serde::{Deserialize, Serialize};

/// Per-agent physical limits, shared by everything spawned from one template.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub radius: f64,
    pub mass: f64,
    pub max_speed: f64,
    pub max_force: f64,
    /// Radians per second.
    pub max_turn_rate: f64,
    pub view_distance: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            mass: 1.0,
            max_speed: 5.0,
            max_force: 10.0,
            max_turn_rate: std::f64::consts::PI,
            view_distance: 3.0,
        }
    }
}

impl AgentParams {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(SimConfigError::InvalidRadius(self.radius));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(SimConfigError::InvalidMass(self.mass));
        }
        for (name, value) in [
            ("max_speed", self.max_speed),
            ("max_force", self.max_force),
            ("max_turn_rate", self.max_turn_rate),
            ("view_distance", self.view_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimConfigError::InvalidLimit { name, value });
            }
        }
        Ok(())
    }
}

/// Motion state carried across steps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub velocity: Vec2,
    /// Unit heading.
    pub forward: Vec2,
    /// Always `forward` rotated by -90 degrees.
    pub right: Vec2,
    pub speed: f64,
    pub max_speed: f64,
    pub max_force: f64,
    pub max_turn_rate: f64,
    pub view_distance: f64,
}

impl Kinematics {
    pub fn new(forward: Vec2, params: &AgentParams) -> Self {
        let forward = math::normalize(forward).unwrap_or([1.0, 0.0]);
        let speed = params.max_speed.min(1.0);
        Self {
            velocity: math::scale(forward, speed),
            forward,
            right: math::perp_right(forward),
            speed,
            max_speed: params.max_speed,
            max_force: params.max_force,
            max_turn_rate: params.max_turn_rate,
            view_distance: params.view_distance,
        }
    }

    /// Point the agent along `dir`. Zero or non-finite directions keep the current heading.
    pub fn set_forward(&mut self, dir: Vec2) {
        if let Some(forward) = math::normalize(dir) {
            self.forward = forward;
            self.right = math::perp_right(forward);
        }
    }

    /// Store `velocity`, refreshing speed and heading.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        if !math::is_finite(velocity) {
            return;
        }
        self.velocity = velocity;
        self.speed = math::length(velocity);
        self.set_forward(velocity);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub position: Vec2,
    pub radius: f64,
    pub mass: f64,
    pub kinematics: Kinematics,
}

impl Agent {
    /// Create an agent facing `heading` radians (counter-clockwise from +x).
    pub fn try_new(
        id: u32,
        position: Vec2,
        heading: f64,
        params: &AgentParams,
    ) -> Result<Self, SimConfigError> {
        params.validate()?;
        Ok(Self {
            id,
            position,
            radius: params.radius,
            mass: params.mass,
            kinematics: Kinematics::new([heading.cos(), heading.sin()], params),
        })
    }

    /// Presentation translation: plane `(x, y)` mapped onto `(x, 0, z)`.
    pub fn transform(&self) -> [f64; 3] {
        [self.position[0], 0.0, self.position[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_radius_agent_is_rejected() {
        let params = AgentParams {
            radius: 0.0,
            ..AgentParams::default()
        };
        assert_eq!(
            Agent::try_new(0, [0.0, 0.0], 0.0, &params),
            Err(SimConfigError::InvalidRadius(0.0))
        );
    }

    #[test]
    fn negative_limit_is_rejected() {
        let params = AgentParams {
            view_distance: -1.0,
            ..AgentParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SimConfigError::InvalidLimit {
                name: "view_distance",
                ..
            })
        ));
    }

    #[test]
    fn new_agent_moves_along_heading_with_right_perpendicular() {
        let agent = Agent::try_new(
            1,
            [2.0, 3.0],
            std::f64::consts::FRAC_PI_2,
            &AgentParams::default(),
        )
        .unwrap();
        let k = agent.kinematics;
        assert!((k.forward[0]).abs() < 1e-12 && (k.forward[1] - 1.0).abs() < 1e-12);
        assert!((k.right[0] - 1.0).abs() < 1e-12 && k.right[1].abs() < 1e-12);
        assert!(math::dot(k.forward, k.right).abs() < 1e-12);
        assert_eq!(k.speed, 1.0);
        assert_eq!(agent.transform(), [2.0, 0.0, 3.0]);
    }

    #[test]
    fn zero_velocity_keeps_previous_heading() {
        let mut k = Kinematics::new([0.0, 1.0], &AgentParams::default());
        k.set_velocity([0.0, 0.0]);
        assert_eq!(k.speed, 0.0);
        assert_eq!(k.forward, [0.0, 1.0]);
    }
}
