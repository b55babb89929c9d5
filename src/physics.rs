use glam::{Quat, Vec3};
use rapier3d::na::Quaternion;
use rapier3d::prelude::*;

use crate::config::*;
use crate::track::TrackCurve;

pub type BodyHandle = RigidBodyHandle;

/// Collider tag marking obstacle bodies; the car's contact query keys on it.
const OBSTACLE_TAG: u128 = 1;

#[derive(Clone, Copy, Debug)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Rapier-backed world. Gameplay code only talks to the per-body operations
/// below; a missing body reads as `None` ("not ready"), never as an error.
pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    gravity: Vector<Real>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: vector![0.0, -9.81, 0.0],
        }
    }

    /// Fixed slabs along the curve forming the drivable ribbon.
    pub fn spawn_track(&mut self, curve: &TrackCurve) {
        let body = self.bodies.insert(RigidBodyBuilder::fixed().build());
        for seg in curve.collider_segments() {
            let rotation = Rotation::from_axis_angle(&Vector::y_axis(), seg.yaw);
            let position = Isometry::from_parts(
                Translation::from(vector![seg.center.x, seg.center.y, seg.center.z]),
                rotation,
            );
            let collider = ColliderBuilder::cuboid(
                seg.half_length,
                TRACK_HALF_THICKNESS,
                TRACK_HALF_WIDTH,
            )
            .position(position)
            .build();
            self.colliders
                .insert_with_parent(collider, body, &mut self.bodies);
        }
    }

    pub fn spawn_car(&mut self) -> BodyHandle {
        let [x, y, z] = START_POSITION;
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![x, y, z])
            .linear_damping(CAR_LINEAR_DAMPING)
            .angular_damping(CAR_ANGULAR_DAMPING)
            // The kart may only yaw; tipping over is not part of the game.
            .enabled_rotations(false, true, false)
            .build();
        let handle = self.bodies.insert(body);
        let [hx, hy, hz] = CAR_HALF_EXTENTS;
        let collider = ColliderBuilder::cuboid(hx, hy, hz).mass(CAR_MASS).build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Kinematic body whose position is scripted by `ObstacleSet` each frame.
    pub fn spawn_obstacle(&mut self, half_extents: [f32; 3]) -> BodyHandle {
        let handle = self
            .bodies
            .insert(RigidBodyBuilder::kinematic_position_based().build());
        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .user_data(OBSTACLE_TAG)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Advance the simulation by `dt` seconds (variable timestep).
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| to_vec3(b.translation()))
    }

    pub fn rotation(&self, handle: BodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|b| to_quat(b.rotation()))
    }

    pub fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        self.bodies.get(handle).map(|b| Pose {
            position: to_vec3(b.translation()),
            rotation: to_quat(b.rotation()),
        })
    }

    pub fn linvel(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| to_vec3(b.linvel()))
    }

    pub fn angvel(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| to_vec3(b.angvel()))
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(vector![position.x, position.y, position.z], true);
        }
    }

    pub fn set_linvel(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    pub fn set_angvel(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_angvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    pub fn set_rotation(&mut self, handle: BodyHandle, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let q = Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z);
            body.set_rotation(Rotation::from_quaternion(q), true);
        }
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
        }
    }

    pub fn apply_torque_impulse(&mut self, handle: BodyHandle, torque: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_torque_impulse(vector![torque.x, torque.y, torque.z], true);
        }
    }

    /// Scripted placement for kinematic bodies; takes effect on the next step.
    pub fn set_kinematic_target(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation(vector![position.x, position.y, position.z]);
        }
    }

    /// Remove a body and its colliders; readers see it as not ready afterwards.
    pub fn despawn(&mut self, handle: BodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Whether the body currently has an active contact with any obstacle.
    pub fn touching_obstacle(&self, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        for &collider in body.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let other = if pair.collider1 == collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                let tagged = self
                    .colliders
                    .get(other)
                    .map(|c| c.user_data == OBSTACLE_TAG)
                    .unwrap_or(false);
                if tagged {
                    return true;
                }
            }
        }
        false
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_quat(r: &Rotation<Real>) -> Quat {
    let q = r.quaternion();
    Quat::from_xyzw(q.coords.x, q.coords.y, q.coords.z, q.coords.w)
}
