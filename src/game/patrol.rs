//! Two-waypoint NPC patrols started by player proximity plus a key press.
//!
//! Each patrol is split into immutable [`PatrolConfig`] and a mutable
//! [`PatrolRuntime`] that holds the scene binding and the in-flight guard.
//! A running patrol is a [`PatrolTraversal`] polled once per tick by the
//! [`PatrolController`] until it reports [`TaskStatus::Done`].

use nalgebra::Vector3;
use std::sync::Arc;
use uuid::Uuid;

use super::animation::{AnimatorController, StateHash};
use super::constants::patrol as patrol_consts;
use super::input::{InputFrame, KeyCode};
use super::math::{move_towards, yaw_from_direction, yaw_rotation};
use super::scene::{ObjectId, Scene};
use super::warn_once::WarnOnce;

#[derive(Debug, Clone)]
pub struct PatrolConfig {
    pub name: String,
    /// Scene name of the NPC that walks the patrol
    pub npc: String,
    /// Scene names of the two anchors, walked in order
    pub pos1: String,
    pub pos2: String,
    pub trigger_distance: f32,
    pub move_speed: f32,
    pub trigger_key: KeyCode,
    /// Controller swapped in while walking; the original is restored afterwards
    pub walk_controller: Option<Arc<AnimatorController>>,
    /// State cross-faded into when no walk controller is configured
    pub walk_state: Option<StateHash>,
}

impl PatrolConfig {
    pub fn new(name: &str, npc: &str, pos1: &str, pos2: &str) -> Self {
        Self {
            name: name.to_string(),
            npc: npc.to_string(),
            pos1: pos1.to_string(),
            pos2: pos2.to_string(),
            trigger_distance: patrol_consts::DEFAULT_TRIGGER_DISTANCE,
            move_speed: patrol_consts::DEFAULT_MOVE_SPEED,
            trigger_key: KeyCode::new(patrol_consts::DEFAULT_TRIGGER_KEY),
            walk_controller: None,
            walk_state: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatrolState {
    #[default]
    Idle,
    Triggered,
    MovingToFirst,
    MovingToSecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Continuing,
    Done,
}

/// Ownership token of a running traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraversalHandle(Uuid);

impl TraversalHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Scene objects a patrol is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatrolBinding {
    pub npc: ObjectId,
    pub anchor1: ObjectId,
    pub anchor2: ObjectId,
}

/// Mutable per-patrol record.
#[derive(Debug, Default)]
pub struct PatrolRuntime {
    binding: Option<PatrolBinding>,
    in_flight: Option<TraversalHandle>,
    state: PatrolState,
}

impl PatrolRuntime {
    pub fn binding(&self) -> Option<PatrolBinding> {
        self.binding
    }

    pub fn in_flight(&self) -> Option<TraversalHandle> {
        self.in_flight
    }

    pub fn state(&self) -> PatrolState {
        self.state
    }

    /// Returns the cached binding, resolving names against the scene if needed.
    fn resolve(&mut self, config: &PatrolConfig, scene: &Scene) -> Option<PatrolBinding> {
        if let Some(binding) = self.binding {
            if [binding.npc, binding.anchor1, binding.anchor2]
                .iter()
                .all(|id| scene.contains(*id))
            {
                return Some(binding);
            }
            self.binding = None;
        }
        let binding = PatrolBinding {
            npc: scene.find_by_name(&config.npc)?,
            anchor1: scene.find_by_name(&config.pos1)?,
            anchor2: scene.find_by_name(&config.pos2)?,
        };
        log::debug!("patrol {} bound to NPC {}", config.name, config.npc);
        self.binding = Some(binding);
        Some(binding)
    }
}

/// One running patrol: two straight legs, then restore and finish.
#[derive(Debug)]
pub struct PatrolTraversal {
    handle: TraversalHandle,
    entry: usize,
    npc: ObjectId,
    targets: [Vector3<f32>; 2],
    leg: usize,
    speed: f32,
    walk_controller: Option<Arc<AnimatorController>>,
    walk_state: Option<StateHash>,
    saved_controller: Option<Arc<AnimatorController>>,
}

impl PatrolTraversal {
    /// Snapshots anchors and the NPC's current controller, then enters the first leg.
    fn start(
        entry: usize,
        config: &PatrolConfig,
        binding: PatrolBinding,
        scene: &mut Scene,
    ) -> Option<Self> {
        let targets = [scene.position(binding.anchor1)?, scene.position(binding.anchor2)?];
        let saved_controller = scene
            .animator(binding.npc)
            .and_then(|animator| animator.controller().cloned());
        let traversal = Self {
            handle: TraversalHandle::new(),
            entry,
            npc: binding.npc,
            targets,
            leg: 0,
            speed: config.move_speed.max(0.0),
            walk_controller: config.walk_controller.clone(),
            walk_state: config.walk_state,
            saved_controller,
        };
        traversal.enter_leg(scene);
        Some(traversal)
    }

    pub fn handle(&self) -> TraversalHandle {
        self.handle
    }

    pub fn state(&self) -> PatrolState {
        if self.leg == 0 {
            PatrolState::MovingToFirst
        } else {
            PatrolState::MovingToSecond
        }
    }

    pub fn target(&self) -> Vector3<f32> {
        self.targets[self.leg.min(1)]
    }

    fn enter_leg(&self, scene: &mut Scene) {
        let Some(animator) = scene.animator_mut(self.npc) else {
            return;
        };
        if let Some(walk) = &self.walk_controller {
            if !animator.is_using(walk) {
                animator.set_controller(Some(walk.clone()));
            }
        } else if let Some(hash) = self.walk_state {
            animator.cross_fade(hash, patrol_consts::WALK_CROSSFADE_SECS);
        }
    }

    fn finish(&self, scene: &mut Scene) {
        if self.walk_controller.is_none() {
            return;
        }
        if let Some(animator) = scene.animator_mut(self.npc) {
            animator.set_controller(self.saved_controller.clone());
        }
    }

    /// Advances the current leg by one tick.
    pub fn resume(&mut self, scene: &mut Scene, dt: f32) -> TaskStatus {
        let target = self.target();
        let Some(transform) = scene.transform_mut(self.npc) else {
            return TaskStatus::Done;
        };

        if let Some(yaw) = yaw_from_direction(target - transform.position) {
            let facing = yaw_rotation(yaw);
            let t = (patrol_consts::TURN_RATE * dt).clamp(0.0, 1.0);
            transform.rotation = transform
                .rotation
                .try_slerp(&facing, t, 1.0e-6)
                .unwrap_or(facing);
        }
        transform.position = move_towards(transform.position, target, self.speed * dt);

        if (target - transform.position).norm() > patrol_consts::ARRIVE_EPSILON {
            return TaskStatus::Continuing;
        }
        transform.position = target;

        if self.leg == 0 {
            self.leg = 1;
            log::debug!("patrol leg 1 reached {:?}", target);
            self.enter_leg(scene);
            TaskStatus::Continuing
        } else {
            self.finish(scene);
            TaskStatus::Done
        }
    }
}

struct PatrolEntry {
    config: PatrolConfig,
    runtime: PatrolRuntime,
}

/// Drives every configured patrol once per tick.
#[derive(Default)]
pub struct PatrolController {
    entries: Vec<PatrolEntry>,
    tasks: Vec<PatrolTraversal>,
    warnings: WarnOnce,
}

impl PatrolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, config: PatrolConfig) {
        self.entries.push(PatrolEntry {
            config,
            runtime: PatrolRuntime::default(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&PatrolEntry> {
        self.entries.iter().find(|e| e.config.name == name)
    }

    pub fn state(&self, name: &str) -> Option<PatrolState> {
        self.entry(name).map(|e| e.runtime.state())
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.entry(name)
            .is_some_and(|e| e.runtime.in_flight().is_some())
    }

    /// Every patrol name with its current state, in configuration order.
    pub fn states(&self) -> impl Iterator<Item = (&str, PatrolState)> + '_ {
        self.entries
            .iter()
            .map(|e| (e.config.name.as_str(), e.runtime.state()))
    }

    pub fn runtime(&self, name: &str) -> Option<&PatrolRuntime> {
        self.entry(name).map(|e| &e.runtime)
    }

    pub fn active_traversals(&self) -> &[PatrolTraversal] {
        &self.tasks
    }

    /// Evaluates triggers, then resumes every running traversal.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        player_position: Option<Vector3<f32>>,
        input: &InputFrame,
        dt: f32,
    ) {
        for index in 0..self.entries.len() {
            if let Some(traversal) = self.try_trigger(index, scene, player_position, input) {
                self.tasks.push(traversal);
            }
        }

        let entries = &mut self.entries;
        let warnings = &mut self.warnings;
        self.tasks.retain_mut(|task| {
            let Some(entry) = entries.get_mut(task.entry) else {
                return false;
            };
            match task.resume(scene, dt) {
                TaskStatus::Continuing => {
                    entry.runtime.state = task.state();
                    true
                }
                TaskStatus::Done => {
                    if !scene.contains(task.npc) {
                        warnings.warn(&entry.config.name, "NPC removed during patrol");
                    } else {
                        log::debug!("patrol {} complete", entry.config.name);
                    }
                    entry.runtime.in_flight = None;
                    entry.runtime.state = PatrolState::Idle;
                    false
                }
            }
        });
    }

    fn try_trigger(
        &mut self,
        index: usize,
        scene: &mut Scene,
        player_position: Option<Vector3<f32>>,
        input: &InputFrame,
    ) -> Option<PatrolTraversal> {
        let entry = self.entries.get_mut(index)?;
        let pressed = input.key_pressed(&entry.config.trigger_key);

        if entry.runtime.in_flight.is_some() {
            if pressed {
                log::debug!("patrol {} already running, trigger ignored", entry.config.name);
            }
            return None;
        }

        let Some(binding) = entry.runtime.resolve(&entry.config, scene) else {
            self.warnings.warn(&entry.config.name, "Patrol NPC or anchors not found");
            return None;
        };
        if !pressed {
            return None;
        }
        let player = player_position?;
        let npc_position = scene.position(binding.npc)?;
        if (player - npc_position).norm() > entry.config.trigger_distance {
            return None;
        }
        if self.tasks.iter().any(|task| task.npc == binding.npc) {
            log::debug!("NPC {} already patrolling, {} not started", entry.config.npc, entry.config.name);
            return None;
        }

        entry.runtime.state = PatrolState::Triggered;
        let Some(traversal) = PatrolTraversal::start(index, &entry.config, binding, scene) else {
            entry.runtime.state = PatrolState::Idle;
            entry.runtime.binding = None;
            return None;
        };
        log::debug!("patrol {} triggered", entry.config.name);
        entry.runtime.in_flight = Some(traversal.handle());
        entry.runtime.state = traversal.state();
        Some(traversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::{state_hash, Animator};
    use crate::game::scene::Transform;

    const DT: f32 = 0.1;

    struct Fixture {
        scene: Scene,
        npc: ObjectId,
        patrols: PatrolController,
    }

    fn fixture(config: impl FnOnce(&mut PatrolConfig)) -> Fixture {
        let mut scene = Scene::new();
        let npc = scene.spawn("Guard", Some("Enemy"), Transform::default());
        scene.spawn("A", None, Transform::from_position(Vector3::new(0.0, 0.0, 0.0)));
        scene.spawn("B", None, Transform::from_position(Vector3::new(5.0, 0.0, 0.0)));
        let mut cfg = PatrolConfig::new("guard-route", "Guard", "A", "B");
        config(&mut cfg);
        let mut patrols = PatrolController::new();
        patrols.add(cfg);
        Fixture { scene, npc, patrols }
    }

    fn near_player() -> Option<Vector3<f32>> {
        Some(Vector3::new(1.0, 0.0, 1.0))
    }

    #[test]
    fn test_idle_without_key_press() {
        let mut f = fixture(|_| {});
        f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::Idle));
        assert!(!f.patrols.is_in_flight("guard-route"));
        // Binding still resolved on the idle tick
        assert!(f.patrols.runtime("guard-route").unwrap().binding().is_some());
    }

    #[test]
    fn test_player_out_of_range_does_not_trigger() {
        let mut f = fixture(|_| {});
        let far = Some(Vector3::new(10.0, 0.0, 0.0));
        f.patrols.tick(&mut f.scene, far, &InputFrame::default().with_key("E"), DT);
        assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::Idle));
    }

    #[test]
    fn test_trigger_at_exact_distance() {
        let mut f = fixture(|_| {});
        let edge = Some(Vector3::new(0.0, 0.0, 3.0));
        f.patrols.tick(&mut f.scene, edge, &InputFrame::default().with_key("e"), DT);
        assert!(f.patrols.is_in_flight("guard-route"));
    }

    #[test]
    fn test_retrigger_while_in_flight_is_ignored() {
        let mut f = fixture(|_| {});
        let press = InputFrame::default().with_key("E");
        f.patrols.tick(&mut f.scene, near_player(), &press, DT);
        let handle = f.patrols.runtime("guard-route").unwrap().in_flight();
        assert!(handle.is_some());

        for _ in 0..5 {
            let before = f.scene.position(f.npc).unwrap();
            f.patrols.tick(&mut f.scene, near_player(), &press, DT);
            let after = f.scene.position(f.npc).unwrap();
            assert_eq!(f.patrols.active_traversals().len(), 1);
            assert_eq!(f.patrols.runtime("guard-route").unwrap().in_flight(), handle);
            // Exactly one leg advances the NPC per tick
            assert!(((after - before).norm() - 2.0 * DT).abs() < 1e-4);
        }
    }

    #[test]
    fn test_patrol_completes_at_second_anchor() {
        let mut f = fixture(|_| {});
        let press = InputFrame::default().with_key("E");
        f.patrols.tick(&mut f.scene, near_player(), &press, DT);
        assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::MovingToSecond));

        let mut travel_ticks = 0;
        while f.patrols.is_in_flight("guard-route") {
            f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
            travel_ticks += 1;
            assert!(travel_ticks < 100, "patrol never finished");
        }
        assert_eq!(f.scene.position(f.npc).unwrap(), Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::Idle));
        let travel_time = travel_ticks as f32 * DT;
        assert!((travel_time - 2.5).abs() <= DT + 1e-4, "travel took {travel_time}s");
    }

    #[test]
    fn test_npc_faces_direction_of_travel() {
        let mut f = fixture(|_| {});
        f.patrols
            .tick(&mut f.scene, near_player(), &InputFrame::default().with_key("E"), DT);
        for _ in 0..15 {
            f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        }
        let forward = f.scene.transform(f.npc).unwrap().forward();
        assert!(forward.x > 0.9, "should face +X, forward={:?}", forward);
    }

    #[test]
    fn test_walk_controller_swapped_and_restored() {
        let original = Arc::new(AnimatorController::new("Guard", &["Idle"]));
        let walk = Arc::new(AnimatorController::new("GuardWalk", &["Walk"]));
        let walk_for_cfg = walk.clone();
        let mut f = fixture(move |cfg| cfg.walk_controller = Some(walk_for_cfg));
        f.scene.set_animator(f.npc, Animator::new(Some(original.clone())));

        f.patrols
            .tick(&mut f.scene, near_player(), &InputFrame::default().with_key("E"), DT);
        assert!(f.scene.animator(f.npc).unwrap().is_using(&walk));

        while f.patrols.is_in_flight("guard-route") {
            f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        }
        assert!(f.scene.animator(f.npc).unwrap().is_using(&original));
    }

    #[test]
    fn test_without_walk_controller_cross_fades_and_keeps_controller() {
        let original = Arc::new(AnimatorController::new("Guard", &["Idle", "Walk"]));
        let mut f = fixture(|cfg| cfg.walk_state = Some(state_hash("Walk")));
        f.scene.set_animator(f.npc, Animator::new(Some(original.clone())));

        f.patrols
            .tick(&mut f.scene, near_player(), &InputFrame::default().with_key("E"), DT);
        let fade = f.scene.animator(f.npc).unwrap().crossfade().copied();
        assert_eq!(fade.map(|c| c.to), Some(state_hash("Walk")));

        while f.patrols.is_in_flight("guard-route") {
            f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        }
        assert!(f.scene.animator(f.npc).unwrap().is_using(&original));
    }

    #[test]
    fn test_unresolved_binding_retries_until_scene_ready() {
        let mut scene = Scene::new();
        scene.spawn("Guard", None, Transform::default());
        scene.spawn("A", None, Transform::default());
        let mut patrols = PatrolController::new();
        patrols.add(PatrolConfig::new("late", "Guard", "A", "B"));
        let press = InputFrame::default().with_key("E");

        patrols.tick(&mut scene, near_player(), &press, DT);
        assert!(!patrols.is_in_flight("late"));
        assert!(patrols.runtime("late").unwrap().binding().is_none());

        scene.spawn("B", None, Transform::from_position(Vector3::new(1.0, 0.0, 0.0)));
        patrols.tick(&mut scene, near_player(), &press, DT);
        assert!(patrols.is_in_flight("late"));
    }

    #[test]
    fn test_respawned_anchor_is_rebound() {
        let mut f = fixture(|_| {});
        f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        let stale = f.patrols.runtime("guard-route").unwrap().binding().unwrap();

        let old_b = f.scene.find_by_name("B").unwrap();
        f.scene.despawn(old_b);
        let new_b = f.scene.spawn("B", None, Transform::from_position(Vector3::new(5.0, 0.0, 0.0)));

        let press = InputFrame::default().with_key("E");
        f.patrols.tick(&mut f.scene, near_player(), &press, DT);
        let binding = f.patrols.runtime("guard-route").unwrap().binding().unwrap();
        assert_ne!(binding.anchor2, stale.anchor2);
        assert_eq!(binding.anchor2, new_b);
        assert!(f.patrols.is_in_flight("guard-route"));
        assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::MovingToSecond));
    }

    #[test]
    fn test_missing_anchor_leaves_patrol_idle_and_retriggerable() {
        let mut f = fixture(|_| {});
        f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        let b = f.scene.find_by_name("B").unwrap();
        f.scene.despawn(b);

        let press = InputFrame::default().with_key("E");
        for _ in 0..3 {
            f.patrols.tick(&mut f.scene, near_player(), &press, DT);
            assert_eq!(f.patrols.state("guard-route"), Some(PatrolState::Idle));
            assert!(!f.patrols.is_in_flight("guard-route"));
        }

        f.scene.spawn("B", None, Transform::from_position(Vector3::new(5.0, 0.0, 0.0)));
        f.patrols.tick(&mut f.scene, near_player(), &press, DT);
        assert!(f.patrols.is_in_flight("guard-route"));
    }

    #[test]
    fn test_second_route_for_busy_npc_is_not_started() {
        let mut f = fixture(|_| {});
        f.patrols.add(PatrolConfig::new("guard-return", "Guard", "B", "A"));

        let press = InputFrame::default().with_key("E");
        f.patrols.tick(&mut f.scene, near_player(), &press, DT);
        assert!(f.patrols.is_in_flight("guard-route"));
        assert!(!f.patrols.is_in_flight("guard-return"));
        assert_eq!(f.patrols.state("guard-return"), Some(PatrolState::Idle));

        for _ in 0..5 {
            let before = f.scene.position(f.npc).unwrap();
            f.patrols.tick(&mut f.scene, near_player(), &press, DT);
            let after = f.scene.position(f.npc).unwrap();
            assert_eq!(f.patrols.active_traversals().len(), 1);
            assert!(((after - before).norm() - 2.0 * DT).abs() < 1e-4);
        }
    }

    #[test]
    fn test_npc_removed_mid_patrol_clears_guard() {
        let mut f = fixture(|_| {});
        f.patrols
            .tick(&mut f.scene, near_player(), &InputFrame::default().with_key("E"), DT);
        assert!(f.patrols.is_in_flight("guard-route"));
        f.scene.despawn(f.npc);
        f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        assert!(!f.patrols.is_in_flight("guard-route"));
        assert!(f.patrols.active_traversals().is_empty());
    }

    #[test]
    fn test_independent_patrols_run_concurrently() {
        let mut f = fixture(|_| {});
        let scout = f.scene.spawn("Scout", None, Transform::from_position(Vector3::new(0.0, 0.0, 2.0)));
        f.scene.spawn("C", None, Transform::from_position(Vector3::new(0.0, 0.0, 2.0)));
        f.scene.spawn("D", None, Transform::from_position(Vector3::new(0.0, 0.0, 6.0)));
        f.patrols.add(PatrolConfig::new("scout-route", "Scout", "C", "D"));

        f.patrols
            .tick(&mut f.scene, near_player(), &InputFrame::default().with_key("E"), DT);
        assert!(f.patrols.is_in_flight("guard-route"));
        assert!(f.patrols.is_in_flight("scout-route"));
        assert_eq!(f.patrols.active_traversals().len(), 2);

        for _ in 0..40 {
            f.patrols.tick(&mut f.scene, near_player(), &InputFrame::default(), DT);
        }
        assert_eq!(f.scene.position(scout).unwrap(), Vector3::new(0.0, 0.0, 6.0));
        assert_eq!(f.scene.position(f.npc).unwrap(), Vector3::new(5.0, 0.0, 0.0));
    }
}
