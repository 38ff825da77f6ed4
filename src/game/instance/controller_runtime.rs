use nalgebra::Vector3;

use super::super::input::InputFrame;
use super::super::locomotion::{self, LocomotionInput};
use super::super::math::{yaw_of, yaw_rotation, CameraBasis};
use super::super::scene::ObjectId;
use super::GameInstance;

/// Player object for patrol/proximity distance checks: tag first, then name.
pub(super) fn resolve_player(instance: &mut GameInstance) -> Option<ObjectId> {
    if let Some(id) = instance.player_ref.filter(|id| instance.scene.contains(*id)) {
        return Some(id);
    }
    let found = instance
        .scene
        .find_by_tag_or_name(&instance.player_lookup.tag, &instance.player_lookup.name);
    match found {
        Some(id) => {
            log::debug!("player resolved to object {:?}", id);
            instance.player_ref = Some(id);
        }
        None => {
            let subject = instance.player_lookup.name.clone();
            instance.warnings.warn(&subject, "Player not found");
        }
    }
    found
}

pub(super) fn player_position(instance: &mut GameInstance) -> Option<Vector3<f32>> {
    let id = resolve_player(instance)?;
    instance.scene.position(id)
}

/// World-space camera basis, or `None` when no camera is configured.
pub(super) fn camera_basis(instance: &GameInstance) -> Option<CameraBasis> {
    let camera = instance.camera.as_ref()?;
    let rotation = match (&instance.character, camera.follow_body) {
        (Some(character), true) => {
            let body = instance.scene.transform(character.id)?;
            body.rotation * camera.local.rotation
        }
        _ => camera.local.rotation,
    };
    Some(CameraBasis::from_rotation(&rotation))
}

/// Mouse look: pitch on the camera, yaw on the character body when followed.
pub(super) fn apply_look(instance: &mut GameInstance, frame: &InputFrame, dt: f32) {
    let Some(camera) = instance.camera.as_mut() else {
        return;
    };
    let followed = match (&instance.character, camera.follow_body) {
        (Some(character), true) => instance.scene.transform_mut(character.id),
        _ => None,
    };
    let yaw = instance
        .look
        .step(frame.mouse_delta, dt, &mut camera.local, followed);

    // The smoothed heading starts from wherever the mouse left the body.
    if yaw != 0.0 {
        if let Some(character) = instance.character.as_mut().filter(|_| camera.follow_body) {
            if let Some(body) = instance.scene.transform(character.id) {
                character.state.heading = yaw_of(&body.rotation);
            }
        }
    }
}

/// Ground sense, integrate, drive the motor and schedule the new yaw.
pub(super) fn update_character_movement(instance: &mut GameInstance, frame: &InputFrame, dt: f32) {
    let camera = camera_basis(instance);
    if camera.is_none() {
        instance.warnings.warn("camera", "Missing camera, moving along world axes");
    }

    let Some(character) = instance.character.as_mut() else {
        return;
    };
    let id = character.id;
    if !instance.physics.has_character(id) {
        instance.warnings.warn(&character.name, "Missing character body");
        return;
    }

    let sample = character.sensor.sample(&instance.physics, id);
    character.grounded = sample.grounded;

    let input = LocomotionInput {
        strafe: frame.strafe,
        forward: frame.forward,
        jump: frame.jump,
        grounded: sample.grounded,
        camera,
    };
    let step = locomotion::step(&mut character.state, &character.params, &input, dt);
    if step.jumped {
        log::debug!("{} jumped at {:.3} m/s", character.name, character.state.vertical_velocity);
    }

    if let Some(flags) = character
        .motor
        .drive(&mut instance.physics, id, &mut character.state, step.velocity, dt)
    {
        character.last_flags = flags;
    }
    character.last_step = Some(step);

    let rotation = yaw_rotation(step.heading);
    instance.physics.set_character_rotation(id, rotation);
    if let Some(transform) = instance.scene.transform_mut(id) {
        transform.rotation = rotation;
    }
}

/// Copies the stepped character pose back into the scene.
pub(super) fn sync_physics_to_scene(instance: &mut GameInstance) {
    let Some(character) = &instance.character else {
        return;
    };
    let Some(position) = instance.physics.get_character_position(character.id) else {
        return;
    };
    let rotation = instance.physics.get_rotation(character.id);
    if let Some(transform) = instance.scene.transform_mut(character.id) {
        transform.position = position;
        if let Some(rotation) = rotation {
            transform.rotation = rotation;
        }
    }
}
