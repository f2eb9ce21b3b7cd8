//! Flocking steering: separation, alignment, cohesion and wall avoidance,
//! blended by `SteeringWeights` and bounded by each agent's limits.

use crate::agent::Agent;
use crate::config::SteeringWeights;
use crate::math::{self, Vec2, EPSILON};
use crate::neighbor::NeighborRecord;
use crate::wall::ObstacleRecord;
use rayon::prelude::*;

/// Sum of `(A - N) / d²`; coincident neighbors contribute nothing.
pub fn separation(agent: &Agent, neighbors: &[NeighborRecord]) -> Vec2 {
    let mut force = [0.0, 0.0];
    for n in neighbors {
        let offset = math::sub(agent.position, n.position);
        let d2 = math::length_sq(offset);
        if d2 > EPSILON {
            force = math::add(force, math::scale(offset, 1.0 / d2));
        }
    }
    force
}

/// Mean neighbor velocity relative to the agent's own.
pub fn alignment(agent: &Agent, neighbors: &[NeighborRecord]) -> Vec2 {
    if neighbors.is_empty() {
        return [0.0, 0.0];
    }
    let sum = neighbors
        .iter()
        .fold([0.0, 0.0], |acc, n| math::add(acc, n.velocity));
    let mean = math::scale(sum, 1.0 / neighbors.len() as f64);
    math::sub(mean, agent.kinematics.velocity)
}

/// Offset from the agent to the neighbors' centroid.
pub fn cohesion(agent: &Agent, neighbors: &[NeighborRecord]) -> Vec2 {
    if neighbors.is_empty() {
        return [0.0, 0.0];
    }
    let sum = neighbors
        .iter()
        .fold([0.0, 0.0], |acc, n| math::add(acc, n.position));
    let centroid = math::scale(sum, 1.0 / neighbors.len() as f64);
    math::sub(centroid, agent.position)
}

/// Push away from every wall closer than the view distance, linear in how close it is.
pub fn wall_avoidance(agent: &Agent, obstacles: &[ObstacleRecord]) -> Vec2 {
    let view = agent.kinematics.view_distance;
    let mut force = [0.0, 0.0];
    for o in obstacles {
        let penetration = view - o.distance;
        if penetration <= 0.0 {
            continue;
        }
        let away = math::normalize(math::sub(agent.position, o.closest)).unwrap_or(o.normal);
        force = math::add(force, math::scale(away, penetration));
    }
    force
}

/// Weighted blend of all behaviors, truncated to `max_force`.
pub fn steering_force(
    agent: &Agent,
    neighbors: &[NeighborRecord],
    obstacles: &[ObstacleRecord],
    weights: &SteeringWeights,
) -> Vec2 {
    let mut steer = [0.0, 0.0];
    if weights.separation != 0.0 {
        steer = math::add(steer, math::scale(separation(agent, neighbors), weights.separation));
    }
    if weights.alignment != 0.0 {
        steer = math::add(steer, math::scale(alignment(agent, neighbors), weights.alignment));
    }
    if weights.cohesion != 0.0 {
        steer = math::add(steer, math::scale(cohesion(agent, neighbors), weights.cohesion));
    }
    if weights.wall_avoidance != 0.0 {
        steer = math::add(
            steer,
            math::scale(wall_avoidance(agent, obstacles), weights.wall_avoidance),
        );
    }
    if !math::is_finite(steer) {
        tracing::trace!(agent = agent.id, "non-finite steering force dropped");
        return [0.0, 0.0];
    }
    math::truncate(steer, agent.kinematics.max_force)
}

/// Apply `force` for `dt` seconds: accelerate by `force / mass`, limit the turn
/// to `max_turn_rate * dt`, cap the speed, then move.
pub fn integrate(agent: &Agent, force: Vec2, dt: f64) -> Agent {
    let mut next = *agent;
    if !dt.is_finite() || dt <= 0.0 {
        return next;
    }
    let k = &agent.kinematics;
    let accel = math::scale(force, 1.0 / agent.mass);
    let mut velocity = math::add(k.velocity, math::scale(accel, dt));

    let speed = math::length(velocity);
    if speed > EPSILON && k.speed > EPSILON {
        let angle = math::cross(k.forward, velocity).atan2(math::dot(k.forward, velocity));
        let max_turn = k.max_turn_rate * dt;
        if angle.abs() > max_turn {
            let dir = math::rotate(k.forward, max_turn.copysign(angle));
            velocity = math::scale(dir, speed);
        }
    }
    let velocity = math::truncate(velocity, k.max_speed);
    if !math::is_finite(velocity) {
        tracing::trace!(agent = agent.id, "non-finite velocity, agent left unchanged");
        return next;
    }

    next.kinematics.set_velocity(velocity);
    next.position = math::add(agent.position, math::scale(velocity, dt));
    next
}

/// Steer every agent in parallel, writing results into `out` slot by slot.
pub fn steering_pass(
    agents: &[Agent],
    neighbors: &[Vec<NeighborRecord>],
    obstacles: &[Vec<ObstacleRecord>],
    weights: &SteeringWeights,
    dt: f64,
    out: &mut [Agent],
) {
    debug_assert_eq!(out.len(), agents.len());
    out.par_iter_mut()
        .zip(agents.par_iter())
        .zip(neighbors.par_iter().zip(obstacles.par_iter()))
        .for_each(|((slot_out, agent), (neigh, obst))| {
            let force = steering_force(agent, neigh, obst, weights);
            *slot_out = integrate(agent, force, dt);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentParams;

    fn agent_at(id: u32, position: Vec2, heading: f64) -> Agent {
        Agent::try_new(id, position, heading, &AgentParams::default()).unwrap()
    }

    fn record(agent: &Agent, slot: usize) -> NeighborRecord {
        NeighborRecord {
            id: agent.id,
            slot,
            position: agent.position,
            velocity: agent.kinematics.velocity,
            radius: agent.radius,
            mass: agent.mass,
        }
    }

    #[test]
    fn no_neighbors_no_force() {
        let a = agent_at(0, [5.0, 5.0], 0.0);
        assert_eq!(
            steering_force(&a, &[], &[], &SteeringWeights::default()),
            [0.0, 0.0]
        );
    }

    #[test]
    fn separation_points_away_and_cohesion_toward() {
        let a = agent_at(0, [0.0, 0.0], 0.0);
        let b = agent_at(1, [2.0, 0.0], 0.0);
        let neigh = [record(&b, 1)];
        let sep = separation(&a, &neigh);
        let coh = cohesion(&a, &neigh);
        assert!(sep[0] < 0.0 && sep[1] == 0.0);
        assert_eq!(coh, [2.0, 0.0]);
    }

    #[test]
    fn alignment_matches_neighbor_velocity() {
        let a = agent_at(0, [0.0, 0.0], 0.0);
        let b = agent_at(1, [1.0, 0.0], std::f64::consts::FRAC_PI_2);
        let align = alignment(&a, &[record(&b, 1)]);
        assert!((align[0] + 1.0).abs() < 1e-12);
        assert!((align[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn steering_force_is_capped_by_max_force() {
        let a = agent_at(0, [0.0, 0.0], 0.0);
        let crowd: Vec<NeighborRecord> = (1..20)
            .map(|i| record(&agent_at(i, [0.01 * i as f64, 0.0], 0.0), i as usize))
            .collect();
        let f = steering_force(&a, &crowd, &[], &SteeringWeights::default());
        assert!(math::length(f) <= a.kinematics.max_force + 1e-9);
    }

    #[test]
    fn integrate_respects_max_speed_and_turn_rate() {
        let a = agent_at(0, [10.0, 10.0], 0.0);
        let next = integrate(&a, [0.0, 1000.0], 0.1);
        assert!(next.kinematics.speed <= a.kinematics.max_speed + 1e-9);
        let turned = math::cross(a.kinematics.forward, next.kinematics.forward)
            .atan2(math::dot(a.kinematics.forward, next.kinematics.forward));
        assert!(turned <= a.kinematics.max_turn_rate * 0.1 + 1e-9);
        assert!(turned > 0.0);
        let r = next.kinematics.right;
        let f = next.kinematics.forward;
        assert!((r[0] - f[1]).abs() < 1e-12 && (r[1] + f[0]).abs() < 1e-12);
    }

    #[test]
    fn integrate_with_zero_or_negative_dt_is_a_no_op() {
        let a = agent_at(0, [3.0, 4.0], 1.0);
        assert_eq!(integrate(&a, [5.0, 5.0], 0.0), a);
        assert_eq!(integrate(&a, [5.0, 5.0], -1.0), a);
        assert_eq!(integrate(&a, [5.0, 5.0], f64::NAN), a);
    }

    #[test]
    fn wall_avoidance_pushes_off_the_wall() {
        let a = agent_at(0, [1.0, 5.0], 0.0);
        let obstacle = ObstacleRecord {
            wall: 0,
            closest: [0.0, 5.0],
            normal: [1.0, 0.0],
            distance: 0.5,
        };
        let f = wall_avoidance(&a, &[obstacle]);
        assert!((f[0] - 2.5).abs() < 1e-12);
        assert_eq!(f[1], 0.0);
    }
}
