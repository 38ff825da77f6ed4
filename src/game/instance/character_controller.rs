use nalgebra::Vector3;

use super::super::constants::locomotion as loco_consts;
use super::super::physics::PhysicsWorld;
use super::super::scene::ObjectId;

/// Redundant ground test: the motor's ground flag OR a sphere probe at the feet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSensor {
    /// Extra depth of the probe below the lower capsule hemisphere.
    pub check_offset: f32,
    /// Contact layers that count as ground.
    pub layers: u32,
}

/// Sample taken each tick for a character body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundSensorSample {
    /// Built-in flag from the last swept move
    pub flag: bool,
    /// Sphere probe hit something other than the character itself
    pub probe: bool,
    pub grounded: bool,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self {
            check_offset: loco_consts::DEFAULT_GROUND_CHECK_OFFSET,
            layers: loco_consts::DEFAULT_GROUND_LAYERS,
        }
    }
}

impl GroundSensor {
    pub fn new(check_offset: f32, layers: u32) -> Self {
        Self { check_offset, layers }
    }

    /// Centre of the probe sphere for a capsule centred at `center`.
    pub fn probe_center(&self, center: Vector3<f32>, radius: f32, height: f32) -> Vector3<f32> {
        let drop = height / 2.0 - radius + self.check_offset;
        center - Vector3::y() * drop
    }

    /// Probe centre and radius for a registered character, for debug drawing.
    pub fn probe_sphere(&self, physics: &PhysicsWorld, id: ObjectId) -> Option<(Vector3<f32>, f32)> {
        let state = physics.get_character_state(id)?;
        let center = physics.get_character_position(id)?;
        Some((self.probe_center(center, state.radius, state.height), state.radius))
    }

    pub fn sample(&self, physics: &PhysicsWorld, id: ObjectId) -> GroundSensorSample {
        let flag = physics
            .get_character_state(id)
            .is_some_and(|state| state.grounded);
        let probe = self
            .probe_sphere(physics, id)
            .is_some_and(|(center, radius)| physics.overlap_sphere(center, radius, self.layers, Some(id)));
        GroundSensorSample {
            flag,
            probe,
            grounded: flag || probe,
        }
    }

    pub fn is_grounded(&self, physics: &PhysicsWorld, id: ObjectId) -> bool {
        self.sample(physics, id).grounded
    }
}
