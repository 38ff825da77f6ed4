use crossbeam_channel::Sender;
use nalgebra::Vector3;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{CharacterConfig, LookConfig, ObjectKind, PlayerLookupConfig, SceneConfig, SceneError};

use super::animation::{state_hash, Animator, AnimatorController};
use super::input::{InputFrame, InputQueue, KeyCode};
use super::locomotion::{LocomotionParams, LocomotionState, LocomotionStep};
use super::look::{LookController, LookParams};
use super::math::yaw_rotation;
use super::patrol::{PatrolConfig, PatrolController};
use super::physics::{CollisionFlags, PhysicsWorld};
use super::proximity::{ProximityAnimator, ProximityConfig};
use super::scene::{ObjectId, Scene, Transform};
use super::warn_once::WarnOnce;

mod character_controller;
mod character_motor;
mod controller_runtime;
mod tick_pipeline;

pub use character_controller::{GroundSensor, GroundSensorSample};
pub use character_motor::CharacterMotor;

/// The player-driven character and its locomotion state.
#[derive(Debug, Clone)]
pub struct PlayerCharacter {
    pub id: ObjectId,
    pub name: String,
    pub params: LocomotionParams,
    pub state: LocomotionState,
    pub sensor: GroundSensor,
    pub motor: CharacterMotor,
    /// Ground result used by the last tick
    pub grounded: bool,
    pub last_flags: CollisionFlags,
    pub last_step: Option<LocomotionStep>,
}

/// Camera pose relative to the followed body (or the world when not following).
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    pub local: Transform,
    pub follow_body: bool,
}

/// A headless scene: physics, objects, one player character, a camera rig
/// and the NPC controllers, advanced together by [`GameInstance::tick`].
pub struct GameInstance {
    pub instance_id: Uuid,
    pub scene: Scene,
    pub physics: PhysicsWorld,
    pub tick: u64,
    pub elapsed: f32,
    pub character: Option<PlayerCharacter>,
    pub camera: Option<CameraRig>,
    pub look: LookController,
    pub patrols: PatrolController,
    pub proximity: Vec<ProximityAnimator>,
    pub player_lookup: PlayerLookupConfig,
    player_ref: Option<ObjectId>,
    input: InputQueue,
    last_input: InputFrame,
    warnings: WarnOnce,
}

impl GameInstance {
    /// Creates an empty instance without character or camera
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            scene: Scene::new(),
            physics: PhysicsWorld::new(),
            tick: 0,
            elapsed: 0.0,
            character: None,
            camera: None,
            look: LookController::default(),
            patrols: PatrolController::new(),
            proximity: Vec::new(),
            player_lookup: PlayerLookupConfig::default(),
            player_ref: None,
            input: InputQueue::new(),
            last_input: InputFrame::default(),
            warnings: WarnOnce::new(),
        }
    }

    /// Builds the scene described by a validated config
    pub fn from_config(config: &SceneConfig) -> Result<Self, SceneError> {
        let mut instance = Self::new();
        instance.player_lookup = config.player.clone();

        let controllers: HashMap<&str, Arc<AnimatorController>> = config
            .controllers
            .iter()
            .map(|c| (c.name.as_str(), Arc::new(AnimatorController::new(&c.name, &c.states))))
            .collect();
        let controller = |name: &str| {
            controllers
                .get(name)
                .cloned()
                .ok_or_else(|| SceneError::UnknownObject(name.to_string()))
        };

        let mut names = HashSet::new();
        if let Some(character) = &config.character {
            names.insert(character.name.as_str());
        }
        for object in &config.objects {
            if !names.insert(object.name.as_str()) {
                return Err(SceneError::DuplicateName(object.name.clone()));
            }
            let [x, y, z] = object.position;
            let transform = Transform {
                position: Vector3::new(x, y, z),
                rotation: yaw_rotation(object.yaw),
            };
            let id = instance.scene.spawn(&object.name, object.tag.as_deref(), transform);
            let half_extents = object
                .size
                .map(|[sx, sy, sz]| Vector3::new(sx, sy, sz) / 2.0)
                .unwrap_or_else(Vector3::zeros);
            match object.kind {
                ObjectKind::Floor => {
                    instance
                        .physics
                        .add_static_box(id, transform.position, half_extents, object.layer);
                }
                ObjectKind::Trigger => {
                    instance
                        .physics
                        .add_trigger_box(id, transform.position, half_extents, object.layer);
                }
                ObjectKind::Npc => {
                    let ctrl = object.controller.as_deref().map(&controller).transpose()?;
                    instance.scene.set_animator(id, Animator::new(ctrl));
                }
                ObjectKind::Marker => {}
            }
        }

        if let Some(character) = &config.character {
            instance.add_player_character(character);
        }
        if let Some(look) = &config.look {
            instance.set_camera(look);
        }

        for section in &config.patrols {
            let mut patrol = PatrolConfig::new(&section.name, &section.npc, &section.pos1, &section.pos2);
            patrol.trigger_distance = section.trigger_distance;
            patrol.move_speed = section.move_speed;
            patrol.trigger_key = KeyCode::new(&section.trigger_key);
            patrol.walk_controller = section.walk_controller.as_deref().map(&controller).transpose()?;
            patrol.walk_state = section.walk_state.as_deref().map(state_hash);
            instance.patrols.add(patrol);
        }

        for section in &config.proximity {
            let mut toggle = ProximityConfig::new(&section.npc, controller(&section.idle_controller)?);
            toggle.attack_range = section.attack_range;
            toggle.attack_controller = section.attack_controller.as_deref().map(&controller).transpose()?;
            instance.proximity.push(ProximityAnimator::new(toggle));
        }

        instance.physics.update_queries();
        log::info!(
            "scene {} built: {} objects, {} patrols, {} proximity toggles",
            config.name.as_deref().unwrap_or("<unnamed>"),
            config.objects.len(),
            config.patrols.len(),
            config.proximity.len()
        );
        Ok(instance)
    }

    /// Spawns the player character. Replaces any existing one.
    pub fn add_player_character(&mut self, config: &CharacterConfig) -> ObjectId {
        if let Some(previous) = self.character.take() {
            self.physics.remove_character(previous.id);
            self.scene.despawn(previous.id);
        }
        let [x, y, z] = config.spawn;
        let center = Vector3::new(x, y, z);
        let id = self
            .scene
            .spawn(&config.name, config.tag.as_deref(), Transform::from_position(center));
        self.physics.add_character(id, center, config.radius, config.height);
        self.physics.set_gravity(config.gravity);

        let params = LocomotionParams {
            walk_speed: config.walk_speed,
            turn_smooth_time: config.turn_smooth_time,
            jump_height: config.jump_height,
            gravity: config.gravity,
            rest_velocity: config.rest_velocity,
        };
        self.character = Some(PlayerCharacter {
            id,
            name: config.name.clone(),
            params,
            state: LocomotionState::default(),
            sensor: GroundSensor::new(config.ground_check_offset, config.ground_layers),
            motor: CharacterMotor::new(config.rest_velocity),
            grounded: false,
            last_flags: CollisionFlags::default(),
            last_step: None,
        });
        self.player_ref = None;
        id
    }

    /// Installs a camera rig with the given look settings.
    pub fn set_camera(&mut self, config: &LookConfig) {
        self.look = LookController::new(LookParams {
            horizontal_sensitivity: config.horizontal_sensitivity,
            vertical_sensitivity: config.vertical_sensitivity,
            max_look_up: config.max_look_up_angle,
            max_look_down: config.max_look_down_angle,
        });
        self.camera = Some(CameraRig {
            local: Transform::default(),
            follow_body: config.follow_body,
        });
    }

    /// Adds a static floor box and returns its scene object
    pub fn add_floor(&mut self, name: &str, center: Vector3<f32>, size: Vector3<f32>, layer: u32) -> ObjectId {
        let id = self.scene.spawn(name, None, Transform::from_position(center));
        self.physics.add_static_box(id, center, size / 2.0, layer);
        id
    }

    /// Attaches a box to the player character, either on its own body or as a
    /// separate child body that follows it.
    pub fn attach_character_part(
        &mut self,
        local_offset: Vector3<f32>,
        half_extents: Vector3<f32>,
        layer: u32,
        separate_body: bool,
    ) -> Result<(), SceneError> {
        let Some(character) = &self.character else {
            return Err(SceneError::MissingBody("player".to_string()));
        };
        let id = character.id;
        let attached = if separate_body {
            self.physics
                .attach_child_body(id, local_offset, half_extents, layer)
                .is_some()
        } else {
            self.physics
                .attach_character_collider(id, local_offset, half_extents, layer)
                .is_some()
        };
        if !attached {
            return Err(SceneError::MissingBody(character.name.clone()));
        }
        self.physics.update_queries();
        Ok(())
    }

    /// Handle for an input source, possibly on another thread
    pub fn input_sender(&self) -> Sender<InputFrame> {
        self.input.sender()
    }

    pub fn push_input(&self, frame: InputFrame) {
        self.input.push(frame);
    }

    /// Input frame consumed by the last tick
    pub fn last_input(&self) -> &InputFrame {
        &self.last_input
    }

    /// Runs one simulation tick
    pub fn tick(&mut self, dt: f32) {
        tick_pipeline::run_tick_phases(self, dt);
        self.tick += 1;
        self.elapsed += dt;
    }

    pub fn character_position(&self) -> Option<Vector3<f32>> {
        let character = self.character.as_ref()?;
        self.physics.get_character_position(character.id)
    }

    pub fn heading(&self) -> Option<f32> {
        self.character.as_ref().map(|c| c.state.heading)
    }

    pub fn vertical_velocity(&self) -> Option<f32> {
        self.character.as_ref().map(|c| c.state.vertical_velocity)
    }

    pub fn is_grounded(&self) -> bool {
        self.character.as_ref().is_some_and(|c| c.grounded)
    }

    /// Current ground probe sphere, for debug drawing
    pub fn probe_sphere(&self) -> Option<(Vector3<f32>, f32)> {
        let character = self.character.as_ref()?;
        character.sensor.probe_sphere(&self.physics, character.id)
    }
}

impl Default for GameInstance {
    fn default() -> Self {
        Self::new()
    }
}
