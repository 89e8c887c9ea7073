//! Steering-behavior displacement.
//!
//! Simulates a walker that seeks each waypoint in turn with a capped
//! velocity and is pushed away from sharp turns. The result follows the
//! original path loosely, so bots sharing a route do not move in lockstep.
//!
//! Randomness (distance divider and stop-distance jitter) comes from the
//! caller's RNG; seed it to get reproducible output.

use rand::Rng;
use std::f32::consts::{FRAC_PI_4, PI};

use crate::core::{Point3, interior_angle};

/// Minimum node count for steering (needs at least one interior waypoint)
pub const MIN_NODES: usize = 3;

/// Steering configuration
#[derive(Clone, Debug)]
pub struct SteeringConfig {
    /// Apply repulsion from sharp turns
    pub avoid_obstacles: bool,
    /// Distance at which a waypoint counts as reached
    pub distance_threshold: f32,
    /// Velocity cap per sub-step
    pub max_velocity: f32,
    /// Bound of the random stop-distance offset, `[-jitter, jitter)`
    pub jitter: f32,
    /// Bend above which a waypoint is treated as an obstacle (radians)
    pub obstacle_angle: f32,
    /// Sub-step limit per waypoint
    pub max_substeps: usize,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            avoid_obstacles: true,
            distance_threshold: 12.0,
            max_velocity: 2.0,
            jitter: 3.0,
            obstacle_angle: FRAC_PI_4,
            max_substeps: 64,
        }
    }
}

/// Sharp turn on the path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub position: Point3,
    /// Bend angle (radians), 0 for a straight continuation
    pub angle: f32,
    /// Bend in degrees scaled to a full turn
    pub avoidance_force: f32,
}

impl Obstacle {
    pub fn new(position: Point3, angle: f32) -> Self {
        Self {
            position,
            angle,
            avoidance_force: angle.to_degrees() / 360.0,
        }
    }
}

/// Interior waypoints whose bend exceeds `max_angle`.
pub fn find_obstacles(path: &[Point3], max_angle: f32) -> Vec<Obstacle> {
    if path.len() < MIN_NODES {
        return Vec::new();
    }

    path.windows(3)
        .filter_map(|w| {
            let bend = PI - interior_angle(&w[0], &w[1], &w[2])?;
            (bend > max_angle).then(|| Obstacle::new(w[1], bend))
        })
        .collect()
}

/// Walk the path with steering forces and return the visited positions.
pub fn steer<R: Rng + ?Sized>(path: &[Point3], config: &SteeringConfig, rng: &mut R) -> Vec<Point3> {
    if path.len() < MIN_NODES {
        return path.to_vec();
    }

    let divider = (rng.gen_range(0.0f32..1.0) + 1.0) * 2.0;
    let extender = if config.jitter > 0.0 {
        rng.gen_range(-config.jitter..config.jitter)
    } else {
        0.0
    };
    let stop_distance = (config.distance_threshold + extender).max(0.0);

    let obstacles = if config.avoid_obstacles {
        find_obstacles(path, config.obstacle_angle)
    } else {
        Vec::new()
    };

    let mut out = vec![path[0]];
    let mut position = path[0];

    for target in &path[1..path.len() - 1] {
        for _ in 0..config.max_substeps.max(1) {
            let distance = position.distance(target);
            let seek = *target - position;

            let near = obstacles
                .iter()
                .find(|o| o.position.distance(target) < config.distance_threshold / 2.0);

            let (force, multiplier) = match near {
                Some(obstacle) => {
                    let repulsion = (position - obstacle.position).normalize()
                        * (obstacle.avoidance_force * config.max_velocity);
                    (seek + repulsion, obstacle.avoidance_force * 8.0)
                }
                None => (seek, distance / divider),
            };

            position += force.truncate(config.max_velocity * multiplier);
            out.push(position);

            if distance <= stop_distance {
                break;
            }
        }
    }

    out.push(path[path.len() - 1]);
    out
}
