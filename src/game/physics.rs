use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::control::{
    CharacterAutostep, CharacterCollision, CharacterLength, KinematicCharacterController,
};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;
use std::collections::HashMap;

use super::constants::physics as consts;
use super::scene::ObjectId;

// Contact layers. Static geometry lives on the default layer; characters and
// their attached parts use their own so movement sweeps skip each other.
pub const LAYER_DEFAULT: u32 = Group::GROUP_1.bits();
pub const LAYER_CHARACTER: u32 = Group::GROUP_2.bits();

const GROUP_CHARACTER: Group = Group::GROUP_2;

/// Which sides of the capsule touched something during one swept move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub below: bool,
    pub above: bool,
    pub sides: bool,
}

impl CollisionFlags {
    pub fn none(&self) -> bool {
        !(self.below || self.above || self.sides)
    }
}

/// Result of [`PhysicsWorld::move_character`].
#[derive(Debug, Clone, Copy)]
pub struct CharacterMove {
    /// Translation actually applied after collision resolution.
    pub translation: Vector3<f32>,
    /// Built-in ground flag reported by the kinematic controller.
    pub grounded: bool,
    pub flags: CollisionFlags,
}

/// Physics-side record of a kinematic character.
pub struct CharacterControllerState {
    pub collider_handle: ColliderHandle,
    pub body_handle: RigidBodyHandle,
    pub radius: f32,
    pub height: f32,
    /// Ground flag from the last swept move.
    pub grounded: bool,
    /// Extra bodies carried along with the character (held props, child rigs).
    pub child_bodies: Vec<RigidBodyHandle>,
}

impl CharacterControllerState {
    /// True if `body` is the character itself or one of its children.
    pub fn owns_body(&self, body: RigidBodyHandle) -> bool {
        body == self.body_handle || self.child_bodies.contains(&body)
    }
}

/// Wrapper around the Rapier3D world used for character movement and queries.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps scene object ID to its rigid body
    pub object_to_body: HashMap<ObjectId, RigidBodyHandle>,
    /// Character controllers keyed by scene object ID
    pub character_controllers: HashMap<ObjectId, CharacterControllerState>,
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -consts::DEFAULT_GRAVITY.abs(), 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            object_to_body: HashMap::new(),
            character_controllers: HashMap::new(),
        }
    }

    /// Sets the gravity magnitude applied to dynamic bodies (always downward)
    pub fn set_gravity(&mut self, gravity_y: f32) {
        self.gravity = vector![0.0, -gravity_y.abs(), 0.0];
    }

    /// Steps the physics simulation forward by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refreshes the query pipeline so queries see the latest collider poses.
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Adds fixed box geometry (floors, walls) on the given contact layer.
    pub fn add_static_box(
        &mut self,
        id: ObjectId,
        position: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
    ) -> RigidBodyHandle {
        self.add_box(id, position, half_extents, layer, false)
    }

    /// Adds a trigger volume. Triggers never block movement or count as ground.
    pub fn add_trigger_box(
        &mut self,
        id: ObjectId,
        position: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
    ) -> RigidBodyHandle {
        self.add_box(id, position, half_extents, layer, true)
    }

    fn add_box(
        &mut self,
        id: ObjectId,
        position: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
        sensor: bool,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().translation(position).build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .sensor(sensor)
            .collision_groups(InteractionGroups::new(Group::from_bits_truncate(layer), Group::ALL))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.object_to_body.insert(id, handle);
        handle
    }

    /// Adds a kinematic capsule character. `position` is the capsule centre.
    pub fn add_character(
        &mut self,
        id: ObjectId,
        position: Vector3<f32>,
        radius: f32,
        height: f32,
    ) -> RigidBodyHandle {
        let position = self.clear_of_ground(None, position, radius, height);
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(position)
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        // Half-height is the cylinder part, total height = 2*half_height + 2*radius
        let half_height = (height - 2.0 * radius).max(0.0) / 2.0;
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .collision_groups(InteractionGroups::new(GROUP_CHARACTER, Group::ALL))
            .build();
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.character_controllers.insert(
            id,
            CharacterControllerState {
                collider_handle,
                body_handle,
                radius,
                height,
                grounded: false,
                child_bodies: Vec::new(),
            },
        );
        self.object_to_body.insert(id, body_handle);
        body_handle
    }

    /// Attaches an extra box collider to the character's own body.
    pub fn attach_character_collider(
        &mut self,
        id: ObjectId,
        local_offset: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
    ) -> Option<ColliderHandle> {
        let body_handle = self.character_controllers.get(&id)?.body_handle;
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(local_offset)
            .collision_groups(InteractionGroups::new(Group::from_bits_truncate(layer), Group::ALL))
            .build();
        Some(
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set),
        )
    }

    /// Adds a separate kinematic body that belongs to the character and follows it.
    pub fn attach_child_body(
        &mut self,
        id: ObjectId,
        local_offset: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
    ) -> Option<RigidBodyHandle> {
        let origin = {
            let state = self.character_controllers.get(&id)?;
            *self.rigid_body_set.get(state.body_handle)?.translation()
        };
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(origin + local_offset)
            .build();
        let child = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(Group::from_bits_truncate(layer), Group::ALL))
            .build();
        self.collider_set
            .insert_with_parent(collider, child, &mut self.rigid_body_set);
        self.character_controllers.get_mut(&id)?.child_bodies.push(child);
        Some(child)
    }

    pub fn has_character(&self, id: ObjectId) -> bool {
        self.character_controllers.contains_key(&id)
    }

    pub fn get_character_state(&self, id: ObjectId) -> Option<&CharacterControllerState> {
        self.character_controllers.get(&id)
    }

    /// Gets the current capsule centre of a character
    pub fn get_character_position(&self, id: ObjectId) -> Option<Vector3<f32>> {
        let state = self.character_controllers.get(&id)?;
        let body = self.rigid_body_set.get(state.body_handle)?;
        Some(*body.translation())
    }

    /// Gets the rotation of any registered body
    pub fn get_rotation(&self, id: ObjectId) -> Option<UnitQuaternion<f32>> {
        let handle = self.object_to_body.get(&id)?;
        Some(*self.rigid_body_set.get(*handle)?.rotation())
    }

    /// Teleports a character, carrying its child bodies along.
    ///
    /// Like [`Self::add_character`], a target resting on or just inside a
    /// surface is lifted to the controller offset above it.
    pub fn set_character_position(&mut self, id: ObjectId, position: Vector3<f32>) -> bool {
        let Some(current) = self.get_character_position(id) else {
            return false;
        };
        let Some((radius, height)) = self
            .character_controllers
            .get(&id)
            .map(|state| (state.radius, state.height))
        else {
            return false;
        };
        let position = self.clear_of_ground(Some(id), position, radius, height);
        self.shift_character(id, position - current, true);
        true
    }

    /// Raises a capsule centre so the capsule starts just over
    /// `CONTROLLER_OFFSET` above the solid surface below it.
    ///
    /// The swept move does not push out of obstacles it already sits within
    /// the offset of, so a capsule placed flush on a floor would slide into it.
    /// Casts down from one radius above `center`; deeper overlaps are left alone.
    fn clear_of_ground(
        &mut self,
        owner: Option<ObjectId>,
        center: Vector3<f32>,
        radius: f32,
        height: f32,
    ) -> Vector3<f32> {
        self.update_queries();
        let half_height = (height - 2.0 * radius).max(0.0) / 2.0;
        let capsule = Capsule::new_y(half_height, radius);
        let start = center + Vector3::y() * radius;

        let owner = owner.and_then(|id| self.character_controllers.get(&id));
        let not_own_part = |_handle: ColliderHandle, other: &Collider| match (owner, other.parent()) {
            (Some(state), Some(parent)) => !state.owns_body(parent),
            _ => true,
        };
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_CHARACTER, Group::ALL & !GROUP_CHARACTER))
            .predicate(&not_own_part);
        let options = ShapeCastOptions {
            target_distance: consts::CONTROLLER_OFFSET,
            ..ShapeCastOptions::with_max_time_of_impact(radius)
        };

        let hit = self.query_pipeline.cast_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &Isometry::translation(start.x, start.y, start.z),
            &-Vector3::y(),
            &capsule,
            options,
            filter,
        );
        let Some((_, hit)) = hit else {
            return center;
        };
        if hit.time_of_impact <= 0.0 {
            return center;
        }
        let rest_y = start.y - hit.time_of_impact + consts::PLACEMENT_MARGIN;
        if rest_y > center.y {
            log::debug!("character lifted {:.4} clear of ground", rest_y - center.y);
            Vector3::new(center.x, rest_y, center.z)
        } else {
            center
        }
    }

    /// Schedules the character's yaw for the next step.
    pub fn set_character_rotation(&mut self, id: ObjectId, rotation: UnitQuaternion<f32>) -> bool {
        let Some(state) = self.character_controllers.get(&id) else {
            return false;
        };
        let Some(body) = self.rigid_body_set.get_mut(state.body_handle) else {
            return false;
        };
        body.set_next_kinematic_rotation(rotation);
        true
    }

    fn shift_character(&mut self, id: ObjectId, delta: Vector3<f32>, teleport: bool) {
        let Some(state) = self.character_controllers.get(&id) else {
            return;
        };
        let mut handles = vec![state.body_handle];
        handles.extend(state.child_bodies.iter().copied());
        for handle in handles {
            if let Some(body) = self.rigid_body_set.get_mut(handle) {
                let next = body.translation() + delta;
                if teleport {
                    body.set_translation(next, true);
                }
                body.set_next_kinematic_translation(next);
            }
        }
    }

    /// Removes a character controller and its child bodies
    pub fn remove_character(&mut self, id: ObjectId) -> bool {
        let Some(state) = self.character_controllers.remove(&id) else {
            return false;
        };
        self.object_to_body.remove(&id);
        let mut handles = vec![state.body_handle];
        handles.extend(state.child_bodies);
        for handle in handles {
            self.rigid_body_set.remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
        true
    }

    /// Sphere overlap test against solid colliders on `layers`.
    ///
    /// Hits on the querying character's own body or its child bodies are
    /// discarded. Returns on the first remaining hit.
    pub fn overlap_sphere(
        &self,
        center: Vector3<f32>,
        radius: f32,
        layers: u32,
        exclude: Option<ObjectId>,
    ) -> bool {
        let ball = Ball::new(radius);
        let pos = Isometry::translation(center.x, center.y, center.z);
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(layers)));
        let owner = exclude.and_then(|id| self.character_controllers.get(&id));

        let mut found = false;
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &pos,
            &ball,
            filter,
            |other_collider_handle| {
                let Some(other) = self.collider_set.get(other_collider_handle) else {
                    return true;
                };
                let is_self = match (owner, other.parent()) {
                    (Some(state), Some(parent)) => state.owns_body(parent),
                    _ => false,
                };
                if is_self {
                    return true; // keep searching
                }
                found = true;
                false
            },
        );
        found
    }

    /// Sweeps the character capsule by `desired_translation` for one tick.
    ///
    /// Contacts are classified by the steepness of the contact normal: steep
    /// normals against the direction of vertical travel are floor or ceiling
    /// hits, everything else is a side hit.
    pub fn move_character(
        &mut self,
        id: ObjectId,
        desired_translation: Vector3<f32>,
        dt: f32,
    ) -> Option<CharacterMove> {
        let state = self.character_controllers.get(&id)?;
        let body_handle = state.body_handle;

        let body = self.rigid_body_set.get(body_handle)?;
        let collider = self.collider_set.get(state.collider_handle)?;
        let shape = collider.shape();
        let current_pos = *body.position();

        let controller = KinematicCharacterController {
            offset: CharacterLength::Absolute(consts::CONTROLLER_OFFSET),
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(consts::AUTOSTEP_MAX_HEIGHT),
                min_width: CharacterLength::Absolute(consts::AUTOSTEP_MIN_WIDTH),
                include_dynamic_bodies: true,
            }),
            max_slope_climb_angle: 45.0_f32.to_radians(),
            min_slope_slide_angle: 30.0_f32.to_radians(),
            snap_to_ground: Some(CharacterLength::Absolute(consts::SNAP_TO_GROUND)),
            ..Default::default()
        };

        let not_own_part = |_handle: ColliderHandle, other: &Collider| {
            other.parent().map_or(true, |parent| !state.owns_body(parent))
        };
        let filter = QueryFilter::default()
            .exclude_rigid_body(body_handle)
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_CHARACTER, Group::ALL & !GROUP_CHARACTER))
            .predicate(&not_own_part);

        let moving_down = desired_translation.y <= 0.0;
        let mut flags = CollisionFlags::default();
        let movement = controller.move_shape(
            dt,
            &self.rigid_body_set,
            &self.collider_set,
            &self.query_pipeline,
            shape,
            &current_pos,
            desired_translation,
            filter,
            |collision: CharacterCollision| {
                let normal_y = collision.hit.normal1.y;
                if normal_y.abs() >= consts::CONTACT_NORMAL_Y_THRESHOLD {
                    if moving_down {
                        flags.below = true;
                    } else {
                        flags.above = true;
                    }
                } else {
                    flags.sides = true;
                }
            },
        );
        if movement.grounded {
            flags.below = true;
        }

        self.shift_character(id, movement.translation, false);
        if let Some(state) = self.character_controllers.get_mut(&id) {
            state.grounded = movement.grounded;
        }
        Some(CharacterMove {
            translation: movement.translation,
            grounded: movement.grounded,
            flags,
        })
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
