//! Fixed-order composition of the path transforms.

use log::debug;
use rand::Rng;

use super::steering::{self, SteeringConfig};
use super::{PathFlags, catmull_rom, chaikin, node_reduction};
use crate::core::Point3;

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Chaikin passes per request
    pub chaikin_iterations: u32,
    /// Catmull-Rom samples per span
    pub catmull_rom_points: u32,
    /// Bearing change a node must exceed to survive reduction (radians)
    pub node_reduction_min_angle: f32,
    pub steering: SteeringConfig,
    /// Upper bound on the node count of any stage's output
    pub max_points: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chaikin_iterations: 1,
            catmull_rom_points: 4,
            node_reduction_min_angle: node_reduction::DEFAULT_MIN_ANGLE,
            steering: SteeringConfig::default(),
            max_points: 256,
        }
    }
}

/// Pipeline output.
#[derive(Clone, Debug, PartialEq)]
pub struct Transformed {
    pub path: Vec<Point3>,
    /// Stages that actually ran
    pub applied: PathFlags,
}

/// Runs Chaikin, Catmull-Rom, node reduction and steering in that order.
///
/// A stage is skipped when the path is too short for it or when its output
/// would exceed `max_points`; skipped stages are absent from
/// [`Transformed::applied`].
#[derive(Clone, Debug, Default)]
pub struct TransformPipeline {
    config: PipelineConfig,
}

impl TransformPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        path: Vec<Point3>,
        flags: PathFlags,
        rng: &mut R,
    ) -> Transformed {
        let cfg = &self.config;
        let mut path = path;
        let mut applied = PathFlags::NONE;

        if flags.contains(PathFlags::CHAIKIN) && cfg.chaikin_iterations > 0 {
            let predicted = chaikin::output_len(path.len(), cfg.chaikin_iterations);
            if path.len() < chaikin::MIN_NODES {
                debug!("Chaikin skipped: {} nodes", path.len());
            } else if predicted > cfg.max_points {
                debug!(
                    "Chaikin skipped: {} nodes would exceed limit {}",
                    predicted, cfg.max_points
                );
            } else {
                path = chaikin::smooth(&path, cfg.chaikin_iterations);
                applied.insert(PathFlags::CHAIKIN);
            }
        }

        if flags.contains(PathFlags::CATMULL_ROM) {
            let predicted = catmull_rom::output_len(path.len(), cfg.catmull_rom_points);
            if path.len() < catmull_rom::MIN_NODES {
                debug!("Catmull-Rom skipped: {} nodes", path.len());
            } else if predicted > cfg.max_points {
                debug!(
                    "Catmull-Rom skipped: {} nodes would exceed limit {}",
                    predicted, cfg.max_points
                );
            } else {
                path = catmull_rom::resample(&path, cfg.catmull_rom_points);
                applied.insert(PathFlags::CATMULL_ROM);
            }
        }

        if flags.contains(PathFlags::NODE_REDUCTION) {
            if path.len() < node_reduction::MIN_NODES {
                debug!("Node reduction skipped: {} nodes", path.len());
            } else {
                path = node_reduction::reduce(&path, cfg.node_reduction_min_angle);
                applied.insert(PathFlags::NODE_REDUCTION);
            }
        }

        if flags.contains(PathFlags::STEERING) {
            if path.len() < steering::MIN_NODES {
                debug!("Steering skipped: {} nodes", path.len());
            } else {
                // Sub-step count depends on the RNG draw, so the limit is
                // checked on the result.
                let steered = steering::steer(&path, &cfg.steering, rng);
                if steered.len() > cfg.max_points {
                    debug!(
                        "Steering discarded: {} nodes exceed limit {}",
                        steered.len(),
                        cfg.max_points
                    );
                } else {
                    path = steered;
                    applied.insert(PathFlags::STEERING);
                }
            }
        }

        Transformed { path, applied }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn line(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32 * 5.0, 0.0, 0.0)).collect()
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(11)
    }

    #[test]
    fn test_no_flags_passthrough() {
        let pipeline = TransformPipeline::default();
        let out = pipeline.apply(line(3), PathFlags::NONE, &mut rng());
        assert_eq!(out.path, line(3));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_chaikin_applied() {
        let pipeline = TransformPipeline::new(PipelineConfig::default());
        let out = pipeline.apply(line(3), PathFlags::CHAIKIN, &mut rng());
        assert_eq!(out.path.len(), 5);
        assert_eq!(out.applied, PathFlags::CHAIKIN);
    }

    #[test]
    fn test_catmull_rom_skipped_on_short_path() {
        let pipeline = TransformPipeline::default();
        let out = pipeline.apply(line(3), PathFlags::CATMULL_ROM, &mut rng());
        assert_eq!(out.path, line(3));
        assert!(!out.applied.contains(PathFlags::CATMULL_ROM));
    }

    #[test]
    fn test_chaikin_feeds_catmull_rom() {
        // 3 nodes are too few for the spline until Chaikin grows them to 5
        let pipeline = TransformPipeline::default();
        let out = pipeline.apply(
            line(3),
            PathFlags::CHAIKIN | PathFlags::CATMULL_ROM,
            &mut rng(),
        );
        assert_eq!(out.applied, PathFlags::CHAIKIN | PathFlags::CATMULL_ROM);
        assert_eq!(out.path.len(), catmull_rom::output_len(5, 4));
    }

    #[test]
    fn test_limit_skips_stage() {
        let pipeline = TransformPipeline::new(PipelineConfig {
            chaikin_iterations: 4,
            max_points: 20,
            ..Default::default()
        });
        let out = pipeline.apply(line(3), PathFlags::CHAIKIN, &mut rng());
        assert_eq!(out.path, line(3));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_runaway_iterations_skipped() {
        let pipeline = TransformPipeline::new(PipelineConfig {
            chaikin_iterations: 64,
            ..Default::default()
        });
        let out = pipeline.apply(line(3), PathFlags::CHAIKIN, &mut rng());
        assert_eq!(out.path, line(3));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_zero_iterations_not_reported() {
        let pipeline = TransformPipeline::new(PipelineConfig {
            chaikin_iterations: 0,
            ..Default::default()
        });
        let out = pipeline.apply(line(3), PathFlags::CHAIKIN, &mut rng());
        assert_eq!(out.path, line(3));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_node_reduction_and_steering() {
        let pipeline = TransformPipeline::default();
        let out = pipeline.apply(
            line(6),
            PathFlags::NODE_REDUCTION | PathFlags::STEERING,
            &mut rng(),
        );
        // Reduction leaves 2 nodes, too few to steer
        assert_eq!(out.path, vec![line(6)[0], line(6)[5]]);
        assert_eq!(out.applied, PathFlags::NODE_REDUCTION);
    }

    #[test]
    fn test_steering_endpoints() {
        let path = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(30.0, 0.0, 0.0),
            Point3::new(30.0, 30.0, 0.0),
        ];
        let pipeline = TransformPipeline::default();
        let out = pipeline.apply(path.clone(), PathFlags::STEERING, &mut rng());
        assert_eq!(out.applied, PathFlags::STEERING);
        assert_eq!(out.path.first(), path.first());
        assert_eq!(out.path.last(), path.last());
    }
}
