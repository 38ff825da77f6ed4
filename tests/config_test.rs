//! Scene files on disk: loading, validation errors and scene construction.

use std::path::PathBuf;

use locomote::config::{ConfigError, SceneConfig, SceneError};
use locomote::game::GameInstance;

fn write_scene(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("locomote-config-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_scene_file() {
    let path = write_scene(
        "plaza.toml",
        r#"
        name = "plaza"

        [character]
        walk_speed = 5.0

        [look]
        follow_body = false

        [[objects]]
        name = "Ground"
        kind = "floor"
        position = [0.0, -0.5, 0.0]
        size = [20.0, 1.0, 20.0]

        [[objects]]
        name = "Pad"
        kind = "trigger"
        position = [3.0, 0.5, 0.0]
        size = [1.0, 1.0, 1.0]
        "#,
    );
    let config = SceneConfig::from_file(&path).unwrap();
    let instance = GameInstance::from_config(&config).unwrap();

    let character = instance.character.as_ref().unwrap();
    assert_eq!(character.params.walk_speed, 5.0);
    assert!(!instance.camera.unwrap().follow_body);
    assert!(instance.scene.find_by_name("Pad").is_some());
    assert!(instance.scene.find_by_tag("Player").is_some());
}

#[test]
fn test_missing_file_is_io_error() {
    let path = std::env::temp_dir().join("locomote-does-not-exist.toml");
    let err = SceneConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_, _)));
    assert!(err.to_string().contains("locomote-does-not-exist.toml"));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let path = write_scene("broken.toml", "[[objects]]\nname = 3\n");
    let err = SceneConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_, _)));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let path = write_scene(
        "negative.toml",
        r#"
        [[patrols]]
        name = "route"
        npc = "Guard"
        pos1 = "A"
        pos2 = "B"
        move_speed = -1.0
        "#,
    );
    let err = SceneConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_character_name_clash_with_object() {
    let config = SceneConfig::from_toml_str(
        r#"
        [character]
        name = "Hero"

        [[objects]]
        name = "Hero"
        "#,
    )
    .unwrap();
    assert!(matches!(
        GameInstance::from_config(&config),
        Err(SceneError::DuplicateName(_))
    ));
}

#[test]
fn test_patrol_for_missing_npc_stays_idle() {
    let config = SceneConfig::from_toml_str(
        r#"
        [character]

        [[objects]]
        name = "A"

        [[objects]]
        name = "B"
        position = [2.0, 0.0, 0.0]

        [[patrols]]
        name = "ghost"
        npc = "Nobody"
        pos1 = "A"
        pos2 = "B"
        "#,
    )
    .unwrap();
    let mut instance = GameInstance::from_config(&config).unwrap();
    for _ in 0..5 {
        instance.push_input(locomote::game::input::InputFrame::default().with_key("E"));
        instance.tick(0.1);
    }
    assert!(!instance.patrols.is_in_flight("ghost"));
    assert!(instance.patrols.runtime("ghost").unwrap().binding().is_none());
}
