use super::controller_runtime::{apply_look, player_position, sync_physics_to_scene, update_character_movement};
use super::GameInstance;

/// Executes simulation phases for one tick.
/// input -> look -> ground sense/integrate/move -> physics -> sync back -> NPCs -> animators.
pub(super) fn run_tick_phases(instance: &mut GameInstance, dt: f32) {
    // Collapse everything the input source sent since the last tick.
    let frame = instance.input.drain();

    // Mouse look first so the camera basis reflects this tick's yaw.
    apply_look(instance, &frame, dt);

    // Update query pipeline before character movement so the probe and
    // move_shape see current collider poses.
    instance.physics.update_queries();

    update_character_movement(instance, &frame, dt);

    // Step physics simulation (applies the scheduled kinematic poses).
    instance.physics.step(dt);

    sync_physics_to_scene(instance);

    let player = player_position(instance);
    instance.patrols.tick(&mut instance.scene, player, &frame, dt);
    for toggle in &mut instance.proximity {
        toggle.tick(&mut instance.scene, player, &mut instance.warnings);
    }

    instance.scene.tick_animators(dt);
    instance.last_input = frame;
}
