//! Ground detection against real colliders: self-exclusion of the
//! character's own parts, trigger volumes, layer masks and probe geometry.

use nalgebra::Vector3;

use locomote::config::CharacterConfig;
use locomote::game::constants::locomotion::DEFAULT_GROUND_CHECK_OFFSET;
use locomote::game::instance::GroundSensor;
use locomote::game::physics::{PhysicsWorld, LAYER_CHARACTER, LAYER_DEFAULT};
use locomote::game::scene::ObjectId;
use locomote::game::GameInstance;

fn floating_character(center_y: f32) -> GameInstance {
    let mut instance = GameInstance::new();
    instance.add_player_character(&CharacterConfig {
        spawn: [0.0, center_y, 0.0],
        ..Default::default()
    });
    instance.physics.update_queries();
    instance
}

fn sample(instance: &GameInstance) -> bool {
    let character = instance.character.as_ref().unwrap();
    character.sensor.is_grounded(&instance.physics, character.id)
}

#[test]
fn test_own_collider_under_feet_is_not_ground() {
    let mut instance = floating_character(10.0);
    instance
        .attach_character_part(
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.45, 0.1, 0.45),
            LAYER_DEFAULT,
            false,
        )
        .unwrap();
    assert!(!sample(&instance));
}

#[test]
fn test_own_child_body_under_feet_is_not_ground() {
    let mut instance = floating_character(10.0);
    instance
        .attach_character_part(
            Vector3::new(0.0, -1.1, 0.0),
            Vector3::new(0.45, 0.1, 0.45),
            LAYER_DEFAULT,
            true,
        )
        .unwrap();
    assert!(!sample(&instance));

    // The child body follows the character and still never grounds it.
    instance.tick(1.0 / 60.0);
    instance.physics.update_queries();
    assert!(!sample(&instance));
}

#[test]
fn test_external_floor_is_ground() {
    let mut instance = floating_character(1.0);
    instance.add_floor(
        "Ground",
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(10.0, 1.0, 10.0),
        LAYER_DEFAULT,
    );
    instance.physics.update_queries();
    assert!(sample(&instance));
}

#[test]
fn test_floor_just_inside_probe_offset() {
    // Capsule bottom hovers 0.04 above the floor: only the probe can see it.
    let mut instance = floating_character(1.04);
    instance.add_floor(
        "Ground",
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(10.0, 1.0, 10.0),
        LAYER_DEFAULT,
    );
    instance.physics.update_queries();
    let character = instance.character.as_ref().unwrap();
    let reading = character.sensor.sample(&instance.physics, character.id);
    assert!(!reading.flag);
    assert!(reading.probe);
    assert!(reading.grounded);
}

#[test]
fn test_floor_beyond_probe_reach() {
    let mut instance = floating_character(1.2);
    instance.add_floor(
        "Ground",
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(10.0, 1.0, 10.0),
        LAYER_DEFAULT,
    );
    instance.physics.update_queries();
    assert!(!sample(&instance));
}

#[test]
fn test_trigger_volume_is_not_ground() {
    let mut physics = PhysicsWorld::new();
    let id = ObjectId(1);
    physics.add_character(id, Vector3::new(0.0, 1.0, 0.0), 0.5, 2.0);
    physics.add_trigger_box(
        ObjectId(2),
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(5.0, 0.5, 5.0),
        LAYER_DEFAULT,
    );
    physics.update_queries();
    assert!(!GroundSensor::default().is_grounded(&physics, id));
}

#[test]
fn test_layer_mask_excludes_floor() {
    let mut physics = PhysicsWorld::new();
    let id = ObjectId(1);
    physics.add_character(id, Vector3::new(0.0, 1.0, 0.0), 0.5, 2.0);
    physics.add_static_box(
        ObjectId(2),
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(5.0, 0.5, 5.0),
        LAYER_DEFAULT,
    );
    physics.update_queries();
    let sensor = GroundSensor::new(DEFAULT_GROUND_CHECK_OFFSET, LAYER_CHARACTER);
    assert!(!sensor.is_grounded(&physics, id));
    assert!(GroundSensor::default().is_grounded(&physics, id));
}

#[test]
fn test_probe_sphere_for_debug_drawing() {
    let instance = floating_character(3.0);
    let (center, radius) = instance.probe_sphere().unwrap();
    assert!((center.y - (3.0 - 0.5 - DEFAULT_GROUND_CHECK_OFFSET)).abs() < 1e-5);
    assert_eq!(radius, 0.5);
}
