use glam::Vec3;

use crate::config::*;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::track::TrackCurve;

/// Bounded triangle-wave parameter: advance by direction * speed, clamp at
/// the bound, flip direction there.
#[derive(Clone, Copy, Debug)]
pub struct Oscillation {
    phase: f32,
    direction: f32,
    speed: f32,
    min: f32,
    max: f32,
}

impl Oscillation {
    pub fn new(phase: f32, direction: f32, speed: f32, min: f32, max: f32) -> Self {
        debug_assert!(min < max && (min..=max).contains(&phase));
        Self {
            phase,
            direction,
            speed,
            min,
            max,
        }
    }

    pub fn advance(&mut self) -> f32 {
        self.phase += self.direction * self.speed;
        if self.phase >= self.max {
            self.phase = self.max;
            self.direction = -1.0;
        } else if self.phase <= self.min {
            self.phase = self.min;
            self.direction = 1.0;
        }
        self.phase
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleKind {
    /// Sways across the track along the curve's perpendicular.
    Lateral,
    /// Bobs straight up and down above its track point.
    Vertical,
}

struct Obstacle {
    body: BodyHandle,
    kind: ObstacleKind,
    track_position: f32,
    oscillation: Oscillation,
    world_position: Vec3,
}

/// Scripted kinematic obstacles pinned to fixed track parameters.
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    /// The course layout: three swaying blocks, two bobbing ones.
    pub fn course(physics: &mut PhysicsWorld) -> Self {
        let lateral = [
            (0.2, 1.0, 0.01, 0.0),
            (0.4, -1.0, 0.012, 0.0),
            (0.6, 1.0, 0.01, 1.0),
        ];
        let vertical = [(0.3, 1.0, 0.01, 0.0), (0.7, 1.0, 0.02, 0.0)];

        let mut obstacles = Vec::with_capacity(lateral.len() + vertical.len());
        for (t, direction, speed, phase) in lateral {
            obstacles.push(Obstacle {
                body: physics.spawn_obstacle(LATERAL_OBSTACLE_HALF),
                kind: ObstacleKind::Lateral,
                track_position: t,
                oscillation: Oscillation::new(phase, direction, speed, -1.0, 1.0),
                world_position: Vec3::ZERO,
            });
        }
        for (t, direction, speed, phase) in vertical {
            obstacles.push(Obstacle {
                body: physics.spawn_obstacle(VERTICAL_OBSTACLE_HALF),
                kind: ObstacleKind::Vertical,
                track_position: t,
                oscillation: Oscillation::new(phase, direction, speed, 0.0, 2.0),
                world_position: Vec3::ZERO,
            });
        }
        Self { obstacles }
    }

    /// Advance every oscillation one step and move the kinematic bodies.
    pub fn update(&mut self, curve: &TrackCurve, physics: &mut PhysicsWorld) {
        for obstacle in &mut self.obstacles {
            let phase = obstacle.oscillation.advance();
            let anchor = curve.point(obstacle.track_position);
            obstacle.world_position = match obstacle.kind {
                ObstacleKind::Lateral => {
                    let side = curve.perpendicular(obstacle.track_position);
                    let mut p = anchor + side * (phase * LATERAL_SWAY);
                    p.y += LATERAL_RAISE;
                    p
                }
                ObstacleKind::Vertical => Vec3::new(
                    anchor.x,
                    VERTICAL_BASE_HEIGHT + phase * VERTICAL_TRAVEL,
                    anchor.z,
                ),
            };
            physics.set_kinematic_target(obstacle.body, obstacle.world_position);
        }
    }

    /// Current poses for the renderer.
    pub fn positions(&self) -> impl Iterator<Item = (Vec3, ObstacleKind)> + '_ {
        self.obstacles.iter().map(|o| (o.world_position, o.kind))
    }
}
