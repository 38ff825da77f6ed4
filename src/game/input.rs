//! Per-tick input samples and the queue the input source feeds.

use crossbeam_channel::{Receiver, Sender};
use serde::Deserialize;
use std::collections::HashSet;

/// Case-insensitive key name ("E", "space", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub struct KeyCode(String);

impl KeyCode {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for KeyCode {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<&str> for KeyCode {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Everything the input source reports for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    /// Strafe axis in [-1, 1]
    pub strafe: f32,
    /// Forward axis in [-1, 1]
    pub forward: f32,
    /// Jump pressed this tick (edge)
    pub jump: bool,
    /// Keys that went down this tick (edges)
    pub pressed: HashSet<KeyCode>,
    /// Mouse movement since the last tick (x, y)
    pub mouse_delta: [f32; 2],
}

impl InputFrame {
    pub fn axes(strafe: f32, forward: f32) -> Self {
        Self {
            strafe,
            forward,
            ..Default::default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.pressed.insert(KeyCode::new(key));
        self
    }

    pub fn with_mouse(mut self, dx: f32, dy: f32) -> Self {
        self.mouse_delta = [dx, dy];
        self
    }

    pub fn key_pressed(&self, key: &KeyCode) -> bool {
        self.pressed.contains(key)
    }

    /// Folds a later sample into this one: axes and mouse follow the latest
    /// sample while edges accumulate so no press is lost.
    pub fn merge(&mut self, later: InputFrame) {
        self.strafe = later.strafe;
        self.forward = later.forward;
        self.jump |= later.jump;
        self.pressed.extend(later.pressed);
        self.mouse_delta[0] += later.mouse_delta[0];
        self.mouse_delta[1] += later.mouse_delta[1];
    }
}

/// Channel between the input source and the tick driver.
pub struct InputQueue {
    sender: Sender<InputFrame>,
    receiver: Receiver<InputFrame>,
    /// Axes persist between samples; edges don't.
    held: InputFrame,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            held: InputFrame::default(),
        }
    }

    /// Handle the input source can keep on another thread.
    pub fn sender(&self) -> Sender<InputFrame> {
        self.sender.clone()
    }

    pub fn push(&self, frame: InputFrame) {
        let _ = self.sender.send(frame);
    }

    /// Collapses everything queued since the last tick into one frame.
    pub fn drain(&mut self) -> InputFrame {
        let mut frame = InputFrame {
            strafe: self.held.strafe,
            forward: self.held.forward,
            ..Default::default()
        };
        while let Ok(sample) = self.receiver.try_recv() {
            frame.merge(sample);
        }
        self.held.strafe = frame.strafe;
        self.held.forward = frame.forward;
        frame
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
