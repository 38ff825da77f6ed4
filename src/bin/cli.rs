//! Locomote CLI - run a scene headless with scripted input

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use locomote::config::SceneConfig;
use locomote::game::constants::{patrol, physics};
use locomote::game::input::InputFrame;
use locomote::game::GameInstance;

#[derive(Parser)]
#[command(name = "locomote")]
#[command(about = "Character locomotion and NPC patrol simulator", long_about = None)]
struct Cli {
    /// Print debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene for a fixed time with constant input
    Run {
        /// Path to the scene TOML file
        scene: PathBuf,
        /// Simulated seconds
        #[arg(long, default_value = "5.0")]
        seconds: f32,
        /// Fixed timestep in seconds
        #[arg(long, default_value_t = physics::TIMESTEP)]
        dt: f32,
        /// Forward axis held for the whole run
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        forward: f32,
        /// Strafe axis held for the whole run
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        strafe: f32,
        /// Press jump at these times (seconds), repeatable
        #[arg(long = "jump-at")]
        jump_at: Vec<f32>,
        /// Press the patrol trigger key at these times (seconds), repeatable
        #[arg(long = "trigger-at")]
        trigger_at: Vec<f32>,
        /// Key pressed by --trigger-at
        #[arg(long, default_value = patrol::DEFAULT_TRIGGER_KEY)]
        trigger_key: String,
        /// Horizontal mouse delta per tick
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        mouse_x: f32,
    },
    /// Validate a scene file and build it
    Check {
        /// Path to the scene TOML file
        scene: PathBuf,
    },
}

struct Script {
    forward: f32,
    strafe: f32,
    jump_at: Vec<f32>,
    trigger_at: Vec<f32>,
    trigger_key: String,
    mouse_x: f32,
}

impl Script {
    /// Input for the tick covering `[t, t + dt)`.
    fn frame(&self, t: f32, dt: f32) -> InputFrame {
        let fires = |times: &[f32]| times.iter().any(|&at| at >= t && at < t + dt);
        let mut frame = InputFrame::axes(self.strafe, self.forward).with_mouse(self.mouse_x, 0.0);
        if fires(&self.jump_at) {
            frame = frame.with_jump();
        }
        if fires(&self.trigger_at) {
            frame = frame.with_key(&self.trigger_key);
        }
        frame
    }
}

fn main() {
    let cli = Cli::parse();
    locomote::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            scene,
            seconds,
            dt,
            forward,
            strafe,
            jump_at,
            trigger_at,
            trigger_key,
            mouse_x,
        } => {
            let script = Script {
                forward,
                strafe,
                jump_at,
                trigger_at,
                trigger_key,
                mouse_x,
            };
            run_scene(&scene, seconds, dt, &script)
        }
        Commands::Check { scene } => check_scene(&scene),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load(path: &Path) -> Result<GameInstance, Box<dyn std::error::Error>> {
    let config = SceneConfig::from_file(path)?;
    Ok(GameInstance::from_config(&config)?)
}

fn check_scene(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let instance = load(path)?;
    println!(
        "{}: ok ({} patrols, character: {})",
        path.display(),
        instance.patrols.len(),
        if instance.character.is_some() { "yes" } else { "no" }
    );
    Ok(())
}

fn run_scene(path: &Path, seconds: f32, dt: f32, script: &Script) -> Result<(), Box<dyn std::error::Error>> {
    if dt <= 0.0 || !dt.is_finite() {
        return Err(format!("--dt must be positive, got {}", dt).into());
    }
    let mut instance = load(path)?;
    let ticks = (seconds.max(0.0) / dt).round() as u64;
    let ticks_per_second = ((1.0 / dt).round() as u64).max(1);
    log::info!("running {} ticks at dt={}", ticks, dt);

    for tick in 0..ticks {
        let t = tick as f32 * dt;
        instance.push_input(script.frame(t, dt));
        instance.tick(dt);
        if (tick + 1) % ticks_per_second == 0 || tick + 1 == ticks {
            log_summary(&instance);
        }
    }
    Ok(())
}

fn log_summary(instance: &GameInstance) {
    if let Some(position) = instance.character_position() {
        log::info!(
            "t={:.2}s pos=({:.2}, {:.2}, {:.2}) heading={:.1} vy={:.2} grounded={}",
            instance.elapsed,
            position.x,
            position.y,
            position.z,
            instance.heading().unwrap_or_default(),
            instance.vertical_velocity().unwrap_or_default(),
            instance.is_grounded()
        );
    }
    for (name, state) in instance.patrols.states() {
        log::info!("  patrol {} {:?}", name, state);
    }
    for toggle in &instance.proximity {
        log::info!(
            "  {} {:?} animation={}",
            toggle.npc_name(),
            toggle.state(),
            animation_label(instance, toggle.npc_name()).unwrap_or_else(|| "-".to_string())
        );
    }
}

/// `Controller/State` of an NPC's animator, if it has one.
fn animation_label(instance: &GameInstance, npc: &str) -> Option<String> {
    let animator = instance.scene.animator(instance.scene.find_by_name(npc)?)?;
    let controller = animator.controller()?;
    let state = controller.state_name(animator.current_state()?)?;
    Some(format!("{}/{}", controller.name, state))
}
