//! Simulation constants and tuning defaults.
//! Centralizing these prevents bugs from duplicated hardcoded values.

/// Physics constants
pub mod physics {
    /// Default gravity in units/s² (sign is normalised negative at use sites)
    pub const DEFAULT_GRAVITY: f32 = -9.81;

    /// Fixed timestep for the headless driver (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Character capsule radius
    pub const CHARACTER_RADIUS: f32 = 0.5;

    /// Character capsule total height
    pub const CHARACTER_HEIGHT: f32 = 2.0;

    /// Gap the kinematic controller keeps between the capsule and obstacles
    pub const CONTROLLER_OFFSET: f32 = 0.02;

    /// Character controller autostep max height
    pub const AUTOSTEP_MAX_HEIGHT: f32 = 0.3;

    /// Character controller autostep min width
    pub const AUTOSTEP_MIN_WIDTH: f32 = 0.05;

    /// Character controller snap to ground distance
    pub const SNAP_TO_GROUND: f32 = 0.1;

    /// Contact normals with |y| above this count as floor/ceiling hits
    pub const CONTACT_NORMAL_Y_THRESHOLD: f32 = 0.5;

    /// Clearance added over the controller offset when placing a character
    pub const PLACEMENT_MARGIN: f32 = 0.001;
}

/// Player locomotion defaults
pub mod locomotion {
    /// Horizontal walk speed (units/second)
    pub const DEFAULT_WALK_SPEED: f32 = 4.5;

    /// Heading smoothing time constant (seconds)
    pub const DEFAULT_TURN_SMOOTH_TIME: f32 = 0.1;

    /// Jump apex height (units)
    pub const DEFAULT_JUMP_HEIGHT: f32 = 1.5;

    /// Extra downward reach of the ground probe sphere
    pub const DEFAULT_GROUND_CHECK_OFFSET: f32 = 0.05;

    /// Ground contact layer mask (all layers)
    pub const DEFAULT_GROUND_LAYERS: u32 = u32::MAX;

    /// Vertical velocity held while grounded to keep the capsule pressed down
    pub const GROUND_REST_VELOCITY: f32 = -2.0;

    /// Input magnitude below which the stick counts as released
    pub const INPUT_DEAD_ZONE: f32 = 0.1;

    /// Squared-length floor for direction vectors
    pub const DIRECTION_EPSILON_SQ: f32 = 1.0e-4;

    /// Lower bound for smoothing time constants
    pub const MIN_SMOOTH_TIME: f32 = 1.0e-4;
}

/// NPC patrol defaults
pub mod patrol {
    /// Remaining distance at which a leg snaps onto its anchor
    pub const ARRIVE_EPSILON: f32 = 0.05;

    /// Player distance that arms the patrol trigger
    pub const DEFAULT_TRIGGER_DISTANCE: f32 = 3.0;

    /// NPC travel speed (units/second)
    pub const DEFAULT_MOVE_SPEED: f32 = 2.0;

    /// Slerp factor per second used to face the direction of travel
    pub const TURN_RATE: f32 = 5.0;

    /// Key that starts a patrol
    pub const DEFAULT_TRIGGER_KEY: &str = "E";

    /// Cross-fade duration into the walk state (seconds)
    pub const WALK_CROSSFADE_SECS: f32 = 0.2;
}

/// Camera look defaults
pub mod look {
    /// Horizontal mouse sensitivity (degrees per unit per second)
    pub const DEFAULT_HORIZONTAL_SENSITIVITY: f32 = 100.0;

    /// Vertical mouse sensitivity (degrees per unit per second)
    pub const DEFAULT_VERTICAL_SENSITIVITY: f32 = 100.0;

    /// Maximum upward pitch (degrees)
    pub const DEFAULT_MAX_LOOK_UP: f32 = 80.0;

    /// Maximum downward pitch (degrees, negative)
    pub const DEFAULT_MAX_LOOK_DOWN: f32 = -80.0;
}

/// Proximity animator defaults
pub mod proximity {
    /// Player distance at which an NPC switches to its attack controller
    pub const DEFAULT_ATTACK_RANGE: f32 = 3.0;
}
