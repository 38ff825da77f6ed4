//! Scene configuration parsing from scene.toml files

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::constants::{locomotion, look, patrol, physics, proximity};
use crate::game::physics::LAYER_DEFAULT;

/// Player character section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub name: String,
    pub tag: Option<String>,
    /// Capsule centre at spawn
    pub spawn: [f32; 3],
    pub radius: f32,
    pub height: f32,
    pub walk_speed: f32,
    pub turn_smooth_time: f32,
    pub jump_height: f32,
    /// Either sign; always pulls down
    pub gravity: f32,
    pub ground_check_offset: f32,
    /// Bit mask of contact layers that count as ground
    pub ground_layers: u32,
    pub rest_velocity: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            tag: Some("Player".to_string()),
            spawn: [0.0, physics::CHARACTER_HEIGHT / 2.0 + physics::CONTROLLER_OFFSET, 0.0],
            radius: physics::CHARACTER_RADIUS,
            height: physics::CHARACTER_HEIGHT,
            walk_speed: locomotion::DEFAULT_WALK_SPEED,
            turn_smooth_time: locomotion::DEFAULT_TURN_SMOOTH_TIME,
            jump_height: locomotion::DEFAULT_JUMP_HEIGHT,
            gravity: physics::DEFAULT_GRAVITY,
            ground_check_offset: locomotion::DEFAULT_GROUND_CHECK_OFFSET,
            ground_layers: locomotion::DEFAULT_GROUND_LAYERS,
            rest_velocity: locomotion::GROUND_REST_VELOCITY,
        }
    }
}

/// Camera look section. Omitting it leaves the scene without a camera.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    pub horizontal_sensitivity: f32,
    pub vertical_sensitivity: f32,
    pub max_look_up_angle: f32,
    pub max_look_down_angle: f32,
    /// Apply yaw to the player body instead of the camera
    pub follow_body: bool,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            horizontal_sensitivity: look::DEFAULT_HORIZONTAL_SENSITIVITY,
            vertical_sensitivity: look::DEFAULT_VERTICAL_SENSITIVITY,
            max_look_up_angle: look::DEFAULT_MAX_LOOK_UP,
            max_look_down_angle: look::DEFAULT_MAX_LOOK_DOWN,
            follow_body: true,
        }
    }
}

/// How patrols and proximity toggles find the player
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerLookupConfig {
    pub tag: String,
    pub name: String,
}

impl Default for PlayerLookupConfig {
    fn default() -> Self {
        Self {
            tag: "Player".to_string(),
            name: "Player".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Solid static box
    Floor,
    /// Sensor box; never counts as ground
    Trigger,
    /// Bare transform (patrol anchors, spawn points)
    #[default]
    Marker,
    /// Transform plus animator
    Npc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub position: [f32; 3],
    /// Heading in degrees
    #[serde(default)]
    pub yaw: f32,
    /// Full box extents for floors and triggers
    #[serde(default)]
    pub size: Option<[f32; 3]>,
    #[serde(default = "default_layer")]
    pub layer: u32,
    /// Animator controller for NPCs
    #[serde(default)]
    pub controller: Option<String>,
}

fn default_layer() -> u32 {
    LAYER_DEFAULT
}

/// Named animator controller; the first state is the entry state
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    pub name: String,
    pub states: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatrolSectionConfig {
    pub name: String,
    pub npc: String,
    pub pos1: String,
    pub pos2: String,
    #[serde(default = "default_trigger_distance")]
    pub trigger_distance: f32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_trigger_key")]
    pub trigger_key: String,
    #[serde(default)]
    pub walk_controller: Option<String>,
    #[serde(default)]
    pub walk_state: Option<String>,
}

fn default_trigger_distance() -> f32 {
    patrol::DEFAULT_TRIGGER_DISTANCE
}

fn default_move_speed() -> f32 {
    patrol::DEFAULT_MOVE_SPEED
}

fn default_trigger_key() -> String {
    patrol::DEFAULT_TRIGGER_KEY.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProximitySectionConfig {
    pub npc: String,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    pub idle_controller: String,
    #[serde(default)]
    pub attack_controller: Option<String>,
}

fn default_attack_range() -> f32 {
    proximity::DEFAULT_ATTACK_RANGE
}

/// Scene configuration from scene.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneConfig {
    /// Display name of the scene
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub character: Option<CharacterConfig>,
    #[serde(default)]
    pub look: Option<LookConfig>,
    #[serde(default)]
    pub player: PlayerLookupConfig,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    #[serde(default)]
    pub patrols: Vec<PatrolSectionConfig>,
    #[serde(default)]
    pub proximity: Vec<ProximitySectionConfig>,
}

impl SceneConfig {
    /// Load and validate scene configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an in-memory TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and cross references. Name lookups into the scene are
    /// left to scene construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(character) = &self.character {
            if !(character.radius > 0.0 && character.radius.is_finite())
                || !(character.height > 0.0 && character.height.is_finite())
            {
                return Err(invalid(format!(
                    "character {}: radius and height must be positive",
                    character.name
                )));
            }
            if character.height < 2.0 * character.radius {
                return Err(invalid(format!(
                    "character {}: height {} is shorter than two radii",
                    character.name, character.height
                )));
            }
            for (field, value) in [
                ("walk_speed", character.walk_speed),
                ("turn_smooth_time", character.turn_smooth_time),
                ("jump_height", character.jump_height),
                ("ground_check_offset", character.ground_check_offset),
            ] {
                if value < 0.0 || !value.is_finite() {
                    return Err(invalid(format!("character {}: {} must be >= 0", character.name, field)));
                }
            }
            if !character.gravity.is_finite() {
                return Err(invalid(format!("character {}: gravity must be finite", character.name)));
            }
            if character.rest_velocity > 0.0 || !character.rest_velocity.is_finite() {
                return Err(invalid(format!(
                    "character {}: rest_velocity {} must be <= 0",
                    character.name, character.rest_velocity
                )));
            }
        }

        if let Some(look) = &self.look {
            if look.max_look_down_angle > look.max_look_up_angle {
                return Err(invalid(format!(
                    "look: max_look_down_angle {} exceeds max_look_up_angle {}",
                    look.max_look_down_angle, look.max_look_up_angle
                )));
            }
        }

        for object in &self.objects {
            if matches!(object.kind, ObjectKind::Floor | ObjectKind::Trigger) {
                let Some(size) = object.size else {
                    return Err(invalid(format!("object {}: size is required", object.name)));
                };
                if size.iter().any(|s| *s <= 0.0) {
                    return Err(invalid(format!("object {}: size must be positive", object.name)));
                }
            }
        }

        let controllers: HashSet<&str> = self.controllers.iter().map(|c| c.name.as_str()).collect();
        let known = |name: &Option<String>| name.as_deref().map_or(true, |n| controllers.contains(n));

        for object in &self.objects {
            if !known(&object.controller) {
                return Err(invalid(format!("object {}: unknown controller", object.name)));
            }
        }

        let mut patrol_names = HashSet::new();
        for patrol in &self.patrols {
            if !patrol_names.insert(patrol.name.as_str()) {
                return Err(invalid(format!("patrol {} defined twice", patrol.name)));
            }
            if patrol.pos1 == patrol.pos2 {
                return Err(invalid(format!("patrol {}: pos1 and pos2 must differ", patrol.name)));
            }
            if patrol.trigger_distance < 0.0 || patrol.move_speed < 0.0 {
                return Err(invalid(format!(
                    "patrol {}: trigger_distance and move_speed must be >= 0",
                    patrol.name
                )));
            }
            if patrol.trigger_key.trim().is_empty() {
                return Err(invalid(format!("patrol {}: trigger_key is empty", patrol.name)));
            }
            if !known(&patrol.walk_controller) {
                return Err(invalid(format!("patrol {}: unknown walk_controller", patrol.name)));
            }
        }

        for entry in &self.proximity {
            if entry.attack_range < 0.0 {
                return Err(invalid(format!("proximity {}: attack_range must be >= 0", entry.npc)));
            }
            if !controllers.contains(entry.idle_controller.as_str()) || !known(&entry.attack_controller) {
                return Err(invalid(format!("proximity {}: unknown controller", entry.npc)));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

/// Errors that can occur when loading scene configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid scene config: {0}")]
    Invalid(String),
}

/// Errors that can occur while building a scene from a valid config
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Object name {0} is used more than once")]
    DuplicateName(String),
    #[error("Unknown object or controller: {0}")]
    UnknownObject(String),
    #[error("No character body for {0}")]
    MissingBody(String),
}
