use glam::{Quat, Vec3};

use crate::config::*;
use crate::input::InputState;
use crate::physics::{BodyHandle, PhysicsWorld};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarEvent {
    Ready,
    Movement,
    Fall,
    Finish,
    ObstacleHit,
}

/// Keyboard- and voice-driven control of the kart's physics body, plus the
/// track-relative event detection (movement, fall, finish, obstacle hits).
pub struct VehicleController {
    body: BodyHandle,
    start_position: Vec3,
    is_ready: bool,
    has_moved: bool,
    touching_obstacle: bool,
    events: Vec<CarEvent>,
}

/// Impulse magnitude before direction factors: a shout at the intensity
/// ceiling doubles the silent baseline.
fn throttle_scale(intensity: f32) -> f32 {
    (0.5 + intensity) * IMPULSE_GAIN
}

impl VehicleController {
    pub fn new(body: BodyHandle) -> Self {
        Self {
            body,
            start_position: Vec3::from(START_POSITION),
            is_ready: false,
            has_moved: false,
            touching_obstacle: false,
            events: Vec::new(),
        }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Per-frame control pass, before the physics step. A body that cannot
    /// be read yet skips the frame silently and retries next tick.
    pub fn update(&mut self, physics: &mut PhysicsWorld, input: &InputState, intensity: f32) {
        let Some(pose) = physics.pose(self.body) else {
            return;
        };

        if !self.is_ready {
            self.is_ready = true;
            self.events.push(CarEvent::Ready);
            log::info!("Car physics body ready");
        }

        if input.any_direction() && !self.has_moved {
            self.has_moved = true;
            self.events.push(CarEvent::Movement);
        }

        if pose.position.y < FALL_Y {
            self.events.push(CarEvent::Fall);
            self.reset_to_start(physics);
            self.has_moved = false;
        }

        if self.has_moved && pose.position.x > FINISH_X && pose.position.y > FINISH_MIN_Y {
            self.events.push(CarEvent::Finish);
            self.has_moved = false;
        }

        let forward = pose.rotation * Vec3::new(0.0, 0.0, -1.0);
        let throttle = throttle_scale(intensity);
        let drive = throttle * FORWARD_FACTOR;
        let torque = throttle - TORQUE_TRIM;

        if input.accelerate() {
            physics.apply_impulse(self.body, Vec3::new(-forward.x * drive, 0.0, -forward.z * drive));
        }
        if input.reverse() {
            physics.apply_impulse(self.body, Vec3::new(forward.x * drive, 0.0, forward.z * drive));
        }
        if input.steer_left() {
            physics.apply_torque_impulse(self.body, Vec3::new(0.0, torque, 0.0));
        }
        if input.steer_right() {
            physics.apply_torque_impulse(self.body, Vec3::new(0.0, -torque, 0.0));
        }
    }

    /// Post-step contact check; one `ObstacleHit` per touch episode. The
    /// position reset for hits belongs to the race wiring, not here.
    pub fn check_obstacle_contact(&mut self, physics: &PhysicsWorld) {
        let touching = physics.touching_obstacle(self.body);
        if touching && !self.touching_obstacle {
            self.events.push(CarEvent::ObstacleHit);
        }
        self.touching_obstacle = touching;
    }

    /// The single reset path: start pose, zero momentum, upright. Shared by
    /// fall handling and the obstacle-hit authority; safe to call twice.
    /// The movement latch is untouched here, only a fall clears it.
    pub fn reset_to_start(&mut self, physics: &mut PhysicsWorld) {
        physics.set_position(self.body, self.start_position);
        physics.set_linvel(self.body, Vec3::ZERO);
        physics.set_angvel(self.body, Vec3::ZERO);
        physics.set_rotation(self.body, Quat::IDENTITY);
    }

    pub fn take_events(&mut self) -> Vec<CarEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (PhysicsWorld, VehicleController) {
        let mut world = PhysicsWorld::new();
        let body = world.spawn_car();
        (world, VehicleController::new(body))
    }

    #[test]
    fn ready_fires_exactly_once() {
        let (mut world, mut car) = setup();
        let input = InputState::new();
        car.update(&mut world, &input, 0.0);
        assert_eq!(car.take_events(), vec![CarEvent::Ready]);
        car.update(&mut world, &input, 0.0);
        assert!(!car.take_events().contains(&CarEvent::Ready));
    }

    #[test]
    fn first_directional_input_emits_movement_once() {
        let (mut world, mut car) = setup();
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::ArrowUp);

        car.update(&mut world, &input, 0.0);
        let events = car.take_events();
        assert_eq!(events.iter().filter(|e| **e == CarEvent::Movement).count(), 1);

        car.update(&mut world, &input, 0.0);
        assert!(!car.take_events().contains(&CarEvent::Movement));
    }

    #[test]
    fn fall_resets_pose_and_momentum() {
        let (mut world, mut car) = setup();
        let input = InputState::new();
        world.set_position(car.body(), Vec3::new(-10.0, -3.0, 2.0));
        world.set_linvel(car.body(), Vec3::new(1.0, -5.0, 0.0));
        world.set_angvel(car.body(), Vec3::new(0.0, 3.0, 0.0));

        car.update(&mut world, &input, 0.0);
        assert!(car.take_events().contains(&CarEvent::Fall));

        let pose = world.pose(car.body()).unwrap();
        assert_eq!(pose.position, Vec3::from(START_POSITION));
        assert!(pose.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert_eq!(world.linvel(car.body()).unwrap(), Vec3::ZERO);
        assert_eq!(world.angvel(car.body()).unwrap(), Vec3::ZERO);
        assert!(!car.has_moved());
    }

    #[test]
    fn obstacle_reset_keeps_movement_latched() {
        let (mut world, mut car) = setup();
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::ArrowUp);
        car.update(&mut world, &input, 0.0);
        car.take_events();
        input.handle_key_release(KeyCode::ArrowUp);

        // The obstacle-hit authority resets the pose mid-race.
        car.reset_to_start(&mut world);
        assert!(car.has_moved());

        input.handle_key_press(KeyCode::ArrowUp);
        car.update(&mut world, &input, 0.0);
        assert!(!car.take_events().contains(&CarEvent::Movement));
    }

    #[test]
    fn double_reset_is_idempotent() {
        let (mut world, mut car) = setup();
        car.reset_to_start(&mut world);
        let first = world.pose(car.body()).unwrap();
        car.reset_to_start(&mut world);
        let second = world.pose(car.body()).unwrap();
        assert_eq!(first.position, second.position);
        assert_eq!(first.rotation, second.rotation);
    }

    #[test]
    fn finish_requires_prior_movement() {
        let (mut world, mut car) = setup();
        let input = InputState::new();
        world.set_position(car.body(), Vec3::new(24.5, 1.0, 0.0));
        car.update(&mut world, &input, 0.0);
        assert!(!car.take_events().contains(&CarEvent::Finish));
    }

    #[test]
    fn finish_fires_once_until_next_movement() {
        let (mut world, mut car) = setup();
        let mut input = InputState::new();

        input.handle_key_press(KeyCode::ArrowUp);
        car.update(&mut world, &input, 0.0);
        input.handle_key_release(KeyCode::ArrowUp);
        car.take_events();

        world.set_position(car.body(), Vec3::new(24.5, 1.0, 0.0));
        car.update(&mut world, &input, 0.0);
        assert!(car.take_events().contains(&CarEvent::Finish));

        // Still past the line, but no intervening movement event.
        car.update(&mut world, &input, 0.0);
        assert!(!car.take_events().contains(&CarEvent::Finish));
    }

    #[test]
    fn accelerate_pushes_the_car() {
        let (mut world, mut car) = setup();
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::ArrowUp);
        let before = world.position(car.body()).unwrap();

        car.update(&mut world, &input, 0.0);
        world.step(DT);

        // Identity orientation: local forward is -Z, accelerate drives +Z.
        assert!(world.position(car.body()).unwrap().z > before.z);
    }

    #[test]
    fn voice_intensity_raises_the_throttle() {
        assert!((throttle_scale(0.0) - 0.5 * IMPULSE_GAIN).abs() < 1e-6);
        assert!((throttle_scale(0.5) - IMPULSE_GAIN).abs() < 1e-6);
        assert!(throttle_scale(0.5) > throttle_scale(0.0));
    }

    #[test]
    fn obstacle_hit_is_edge_triggered() {
        let (mut world, mut car) = setup();
        let obstacle = world.spawn_obstacle(VERTICAL_OBSTACLE_HALF);
        world.set_kinematic_target(obstacle, Vec3::from(START_POSITION));
        world.step(DT);
        world.step(DT);

        car.check_obstacle_contact(&world);
        assert_eq!(car.take_events(), vec![CarEvent::ObstacleHit]);

        // Still overlapping: no second hit.
        car.check_obstacle_contact(&world);
        assert!(car.take_events().is_empty());
    }

    #[test]
    fn missing_body_skips_the_frame() {
        let mut world = PhysicsWorld::new();
        let mut car = VehicleController::new(crate::physics::BodyHandle::invalid());
        let input = InputState::new();
        car.update(&mut world, &input, 0.0);
        assert!(car.take_events().is_empty());
    }
}
