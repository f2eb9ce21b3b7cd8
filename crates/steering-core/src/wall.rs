use crate::config::SimConfigError;
use crate::math::{self, Vec2};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Static wall segment. `normal` is the unit `size` rotated by -90 degrees,
/// so walls listed counter-clockwise around a region face into it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub from: Vec2,
    pub to: Vec2,
    /// `from - to`.
    pub size: Vec2,
    pub normal: Vec2,
    pub center: Vec2,
    pub half_thickness: f64,
}

impl Wall {
    pub fn new(from: Vec2, to: Vec2, half_thickness: f64) -> Result<Self, SimConfigError> {
        let size = math::sub(from, to);
        let dir = math::normalize(size)
            .filter(|_| math::is_finite(from) && math::is_finite(to))
            .ok_or(SimConfigError::DegenerateWall { from, to })?;
        if !half_thickness.is_finite() || half_thickness < 0.0 {
            return Err(SimConfigError::InvalidWallBorder(half_thickness * 2.0));
        }
        Ok(Self {
            from,
            to,
            size,
            normal: math::perp_right(dir),
            center: math::scale(math::add(from, to), 0.5),
            half_thickness,
        })
    }

    pub fn closest_point(&self, position: Vec2) -> Vec2 {
        let seg = math::sub(self.to, self.from);
        let t = math::dot(math::sub(position, self.from), seg) / math::length_sq(seg);
        math::add(self.from, math::scale(seg, t.clamp(0.0, 1.0)))
    }

    fn envelope_corners(&self) -> (Vec2, Vec2) {
        let h = self.half_thickness;
        (
            [self.from[0].min(self.to[0]) - h, self.from[1].min(self.to[1]) - h],
            [self.from[0].max(self.to[0]) + h, self.from[1].max(self.to[1]) + h],
        )
    }
}

/// Per-step reference from an agent to a nearby wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleRecord {
    pub wall: usize,
    pub closest: Vec2,
    pub normal: Vec2,
    /// Distance to the wall surface; negative when the agent center is inside the wall.
    pub distance: f64,
}

#[derive(Clone, Debug)]
struct WallEnvelope {
    index: usize,
    lower: Vec2,
    upper: Vec2,
}

impl RTreeObject for WallEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.lower, self.upper)
    }
}

pub struct WallRegistry {
    walls: Vec<Wall>,
    tree: RTree<WallEnvelope>,
}

impl WallRegistry {
    pub fn new(walls: Vec<Wall>) -> Self {
        let envelopes = walls
            .iter()
            .enumerate()
            .map(|(index, wall)| {
                let (lower, upper) = wall.envelope_corners();
                WallEnvelope {
                    index,
                    lower,
                    upper,
                }
            })
            .collect();
        Self {
            walls,
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Four walls along the edges of `[min, max]`, counter-clockwise, normals facing inward.
    pub fn border_walls(min: Vec2, max: Vec2, border: f64) -> Result<Vec<Wall>, SimConfigError> {
        let half = border * 0.5;
        Ok(vec![
            Wall::new([min[0], min[1]], [max[0], min[1]], half)?,
            Wall::new([max[0], min[1]], [max[0], max[1]], half)?,
            Wall::new([max[0], max[1]], [min[0], max[1]], half)?,
            Wall::new([min[0], max[1]], [min[0], min[1]], half)?,
        ])
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn len(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// Replace `out` with every wall whose surface is within `radius` of `position`.
    pub fn query(&self, position: Vec2, radius: f64, out: &mut Vec<ObstacleRecord>) {
        out.clear();
        if !math::is_finite(position) || radius.is_nan() || radius < 0.0 {
            return;
        }
        let envelope = AABB::from_corners(
            [position[0] - radius, position[1] - radius],
            [position[0] + radius, position[1] + radius],
        );
        for entry in self.tree.locate_in_envelope_intersecting(&envelope) {
            let wall = &self.walls[entry.index];
            let closest = wall.closest_point(position);
            let distance = math::distance_sq(position, closest).sqrt() - wall.half_thickness;
            if distance <= radius {
                out.push(ObstacleRecord {
                    wall: entry.index,
                    closest,
                    normal: wall.normal,
                    distance,
                });
            }
        }
        // The tree yields in node order; keep results stable by wall index.
        out.sort_unstable_by_key(|r| r.wall);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields_follow_endpoints() {
        let wall = Wall::new([0.0, 0.0], [4.0, 0.0], 0.5).unwrap();
        assert_eq!(wall.size, [-4.0, 0.0]);
        assert_eq!(wall.center, [2.0, 0.0]);
        assert_eq!(wall.normal, [0.0, 1.0]);
    }

    #[test]
    fn degenerate_wall_is_rejected() {
        assert!(matches!(
            Wall::new([1.0, 1.0], [1.0, 1.0], 0.0),
            Err(SimConfigError::DegenerateWall { .. })
        ));
    }

    #[test]
    fn border_normals_face_the_interior() {
        let walls = WallRegistry::border_walls([0.0, 0.0], [10.0, 10.0], 1.0).unwrap();
        let center = [5.0, 5.0];
        for wall in &walls {
            let to_center = math::sub(center, wall.center);
            assert!(math::dot(to_center, wall.normal) > 0.0, "{wall:?}");
            assert_eq!(wall.half_thickness, 0.5);
        }
    }

    #[test]
    fn closest_point_clamps_to_segment() {
        let wall = Wall::new([0.0, 0.0], [4.0, 0.0], 0.0).unwrap();
        assert_eq!(wall.closest_point([2.0, 3.0]), [2.0, 0.0]);
        assert_eq!(wall.closest_point([-2.0, 1.0]), [0.0, 0.0]);
        assert_eq!(wall.closest_point([9.0, -1.0]), [4.0, 0.0]);
    }

    #[test]
    fn query_finds_only_walls_in_range() {
        let registry =
            WallRegistry::new(WallRegistry::border_walls([0.0, 0.0], [10.0, 10.0], 1.0).unwrap());
        let mut out = Vec::new();

        registry.query([5.0, 5.0], 2.0, &mut out);
        assert!(out.is_empty());

        registry.query([1.0, 5.0], 2.0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].wall, 3);
        assert!((out[0].distance - 0.5).abs() < 1e-12);
        assert_eq!(out[0].normal, [1.0, 0.0]);

        registry.query([1.0, 1.0], 2.0, &mut out);
        let hit: Vec<usize> = out.iter().map(|r| r.wall).collect();
        assert_eq!(hit, vec![0, 3]);
    }

    #[test]
    fn query_truncates_previous_results() {
        let registry =
            WallRegistry::new(WallRegistry::border_walls([0.0, 0.0], [10.0, 10.0], 0.0).unwrap());
        let mut out = Vec::new();
        registry.query([0.5, 0.5], 1.0, &mut out);
        assert_eq!(out.len(), 2);
        registry.query([5.0, 5.0], 1.0, &mut out);
        assert!(out.is_empty());
    }
}
