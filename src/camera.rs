use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use web_time::Instant;

use crate::config::*;
use crate::physics::{BodyHandle, PhysicsWorld};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Readiness {
    NotReady { next_poll: Instant },
    Ready,
}

/// Where the camera wants to sit: behind and above the vehicle, in the
/// vehicle's own frame.
pub fn desired_position(vehicle: Vec3, orientation: Quat, offset: Vec3) -> Vec3 {
    vehicle + orientation * offset
}

/// Third-person chase camera. The vehicle's body arrives asynchronously, so
/// the camera polls until a pose read succeeds before tracking; a failed
/// read after that (body disposed) drops it back to polling.
pub struct ChaseCamera {
    target: BodyHandle,
    offset: Vec3,
    position: Vec3,
    look_at: Vec3,
    readiness: Readiness,
}

impl ChaseCamera {
    pub fn new(target: BodyHandle, now: Instant) -> Self {
        Self {
            target,
            offset: Vec3::from(CAMERA_OFFSET),
            position: Vec3::from(CAMERA_START_POSITION),
            look_at: Vec3::from(START_POSITION),
            readiness: Readiness::NotReady { next_poll: now },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn update(&mut self, physics: &PhysicsWorld, now: Instant) {
        if let Readiness::NotReady { next_poll } = self.readiness {
            if now < next_poll {
                return;
            }
            if physics.pose(self.target).is_none() {
                self.readiness = Readiness::NotReady {
                    next_poll: now + Duration::from_millis(CAMERA_POLL_MS),
                };
                return;
            }
            log::info!("Chase camera target ready");
            self.readiness = Readiness::Ready;
        }

        let Some(pose) = physics.pose(self.target) else {
            log::warn!("Chase camera lost its target, polling again");
            self.readiness = Readiness::NotReady {
                next_poll: now + Duration::from_millis(CAMERA_POLL_MS),
            };
            return;
        };

        let desired = desired_position(pose.position, pose.rotation, self.offset);
        self.position = self.position.lerp(desired, CAMERA_LERP);
        // Look direction snaps to the vehicle; only position is smoothed.
        self.look_at = pose.position;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_position_with_identity_orientation_is_the_raw_offset() {
        let desired = desired_position(Vec3::ZERO, Quat::IDENTITY, Vec3::new(0.0, 2.0, -5.0));
        assert_eq!(desired, Vec3::new(0.0, 2.0, -5.0));
    }

    #[test]
    fn desired_position_rotates_with_the_vehicle() {
        let half_turn = Quat::from_rotation_y(std::f32::consts::PI);
        let desired = desired_position(Vec3::ZERO, half_turn, Vec3::new(0.0, 2.0, -5.0));
        assert!((desired - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn lerp_converges_monotonically_toward_the_target() {
        let mut world = PhysicsWorld::new();
        let body = world.spawn_car();
        let t0 = Instant::now();
        let mut camera = ChaseCamera::new(body, t0);

        camera.update(&world, t0);
        assert!(camera.is_ready());

        let pose = world.pose(body).unwrap();
        let desired = desired_position(pose.position, pose.rotation, Vec3::from(CAMERA_OFFSET));

        let mut last = (camera.position() - desired).length();
        for _ in 0..50 {
            camera.update(&world, t0);
            let distance = (camera.position() - desired).length();
            assert!(distance <= last);
            last = distance;
        }
        assert!(last < 0.1, "camera never settled: {last}");
    }

    #[test]
    fn waits_for_the_body_and_respects_the_poll_interval() {
        let world = PhysicsWorld::new();
        let t0 = Instant::now();
        let mut camera = ChaseCamera::new(BodyHandle::invalid(), t0);

        camera.update(&world, t0);
        assert!(!camera.is_ready());

        // Inside the retry interval nothing happens, even if a body appeared.
        let mut world = PhysicsWorld::new();
        let body = world.spawn_car();
        let mut camera = ChaseCamera::new(body, t0);
        camera.update(&PhysicsWorld::new(), t0);
        camera.update(&world, t0 + Duration::from_millis(50));
        assert!(!camera.is_ready());

        camera.update(&world, t0 + Duration::from_millis(CAMERA_POLL_MS));
        assert!(camera.is_ready());
    }

    #[test]
    fn reverts_to_polling_when_the_body_disappears() {
        let mut world = PhysicsWorld::new();
        let body = world.spawn_car();
        let t0 = Instant::now();
        let mut camera = ChaseCamera::new(body, t0);
        camera.update(&world, t0);
        assert!(camera.is_ready());

        world.despawn(body);
        camera.update(&world, t0 + Duration::from_millis(10));
        assert!(!camera.is_ready());
    }
}
