//! Idle/attack animation toggle driven by player distance.

use nalgebra::Vector3;
use std::sync::Arc;

use super::animation::AnimatorController;
use super::constants::proximity as proximity_consts;
use super::scene::{ObjectId, Scene};
use super::warn_once::WarnOnce;

#[derive(Debug, Clone)]
pub struct ProximityConfig {
    pub npc: String,
    pub attack_range: f32,
    pub idle_controller: Arc<AnimatorController>,
    /// Falls back to the NPC's own controller when unset
    pub attack_controller: Option<Arc<AnimatorController>>,
}

impl ProximityConfig {
    pub fn new(npc: &str, idle_controller: Arc<AnimatorController>) -> Self {
        Self {
            npc: npc.to_string(),
            attack_range: proximity_consts::DEFAULT_ATTACK_RANGE,
            idle_controller,
            attack_controller: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityState {
    #[default]
    Idle,
    Attacking,
}

#[derive(Debug)]
pub struct ProximityAnimator {
    config: ProximityConfig,
    npc: Option<ObjectId>,
    attack_controller: Option<Arc<AnimatorController>>,
    state: ProximityState,
    disabled: bool,
}

impl ProximityAnimator {
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            attack_controller: config.attack_controller.clone(),
            config,
            npc: None,
            state: ProximityState::Idle,
            disabled: false,
        }
    }

    pub fn state(&self) -> ProximityState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn npc_name(&self) -> &str {
        &self.config.npc
    }

    /// Binds to the NPC once. An NPC without an animator disables this
    /// toggle for good.
    fn bind(&mut self, scene: &Scene, warnings: &mut WarnOnce) -> Option<ObjectId> {
        if let Some(npc) = self.npc.filter(|id| scene.contains(*id)) {
            return Some(npc);
        }
        let npc = scene.find_by_name(&self.config.npc)?;
        let Some(animator) = scene.animator(npc) else {
            warnings.warn(&self.config.npc, "Missing animator, proximity animation disabled");
            self.disabled = true;
            return None;
        };
        if self.attack_controller.is_none() {
            self.attack_controller = animator.controller().cloned();
        }
        self.npc = Some(npc);
        Some(npc)
    }

    pub fn tick(
        &mut self,
        scene: &mut Scene,
        player_position: Option<Vector3<f32>>,
        warnings: &mut WarnOnce,
    ) {
        if self.disabled {
            return;
        }
        let Some(npc) = self.bind(scene, warnings) else {
            return;
        };
        let Some(player) = player_position else {
            return;
        };
        let Some(npc_position) = scene.position(npc) else {
            return;
        };

        let should_attack = (player - npc_position).norm() <= self.config.attack_range;
        let next = if should_attack {
            ProximityState::Attacking
        } else {
            ProximityState::Idle
        };
        if next == self.state {
            return;
        }
        self.state = next;

        let controller = match next {
            ProximityState::Attacking => self.attack_controller.clone(),
            ProximityState::Idle => Some(self.config.idle_controller.clone()),
        };
        if let Some(animator) = scene.animator_mut(npc) {
            animator.set_controller(controller);
        }
        log::debug!("{} switched to {:?}", self.config.npc, next);
    }
}
