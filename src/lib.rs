//! Locomote: character locomotion and NPC patrol core
//!
//! This module exposes the simulation library used by the `locomote` CLI:
//! camera-relative character movement with jump/gravity integration and
//! redundant ground detection over a rapier3d world, mouse look, and
//! key-triggered two-waypoint NPC patrols.

pub mod config;
pub mod game;
pub mod logging;
