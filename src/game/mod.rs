pub mod animation;
pub mod constants;
pub mod input;
pub mod instance;
pub mod locomotion;
pub mod look;
pub mod math;
pub mod patrol;
pub mod physics;
pub mod proximity;
pub mod scene;
pub mod warn_once;

pub use instance::{CameraRig, GameInstance, PlayerCharacter};
