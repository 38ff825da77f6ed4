use std::sync::Arc;

/// Identifier of an animation state inside a controller.
pub type StateHash = u32;

/// Hashes a state name (32-bit FNV-1a). Stable across runs and platforms.
pub fn state_hash(name: &str) -> StateHash {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Named set of animation states. The first state is the entry state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorController {
    pub name: String,
    states: Vec<(StateHash, String)>,
}

impl AnimatorController {
    pub fn new<S: AsRef<str>>(name: &str, states: &[S]) -> Self {
        Self {
            name: name.to_string(),
            states: states
                .iter()
                .map(|s| (state_hash(s.as_ref()), s.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn has_state(&self, hash: StateHash) -> bool {
        self.states.iter().any(|(h, _)| *h == hash)
    }

    pub fn entry_state(&self) -> Option<StateHash> {
        self.states.first().map(|(h, _)| *h)
    }

    pub fn state_name(&self, hash: StateHash) -> Option<&str> {
        self.states
            .iter()
            .find(|(h, _)| *h == hash)
            .map(|(_, name)| name.as_str())
    }
}

/// In-progress blend between two states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossFade {
    pub from: Option<StateHash>,
    pub to: StateHash,
    pub duration: f32,
    pub elapsed: f32,
}

impl CrossFade {
    /// Blend weight of the target state in `[0, 1]`.
    pub fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

/// Per-object animation player. Controllers are shared by reference; two
/// animators use "the same" controller when they hold the same `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    controller: Option<Arc<AnimatorController>>,
    current_state: Option<StateHash>,
    crossfade: Option<CrossFade>,
}

impl Animator {
    pub fn new(controller: Option<Arc<AnimatorController>>) -> Self {
        let mut animator = Self::default();
        animator.set_controller(controller);
        animator
    }

    pub fn controller(&self) -> Option<&Arc<AnimatorController>> {
        self.controller.as_ref()
    }

    /// True if the active controller is exactly `controller`.
    pub fn is_using(&self, controller: &Arc<AnimatorController>) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, controller))
    }

    /// Swaps the active controller and restarts at its entry state.
    pub fn set_controller(&mut self, controller: Option<Arc<AnimatorController>>) {
        self.current_state = controller.as_ref().and_then(|c| c.entry_state());
        self.controller = controller;
        self.crossfade = None;
    }

    pub fn has_state(&self, hash: StateHash) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|c| c.has_state(hash))
    }

    /// Starts blending into `hash`. Returns false (and does nothing) if the
    /// active controller has no such state.
    pub fn cross_fade(&mut self, hash: StateHash, duration: f32) -> bool {
        if !self.has_state(hash) {
            return false;
        }
        if self.current_state == Some(hash) && self.crossfade.is_none() {
            return true;
        }
        self.crossfade = Some(CrossFade {
            from: self.current_state,
            to: hash,
            duration: duration.max(0.0),
            elapsed: 0.0,
        });
        true
    }

    pub fn current_state(&self) -> Option<StateHash> {
        self.current_state
    }

    pub fn crossfade(&self) -> Option<&CrossFade> {
        self.crossfade.as_ref()
    }

    /// Advances the active cross-fade; the target becomes current when it completes.
    pub fn tick(&mut self, dt: f32) {
        let Some(fade) = &mut self.crossfade else {
            return;
        };
        fade.elapsed = (fade.elapsed + dt.max(0.0)).min(fade.duration);
        if fade.weight() >= 1.0 {
            self.current_state = Some(fade.to);
            self.crossfade = None;
        }
    }
}
