//! Logger setup shared by the CLI and the test suites.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Filter used when `RUST_LOG` is unset.
fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs env_logger with millisecond timestamps.
///
/// `RUST_LOG` overrides `verbose`. Only the first call installs anything; a
/// host or test harness that already set a logger keeps it.
pub fn init(verbose: bool) {
    let env = Env::default().default_filter_or(default_level(verbose).to_string());
    if Builder::from_env(env).format_timestamp_millis().try_init().is_ok() {
        log::debug!("logger installed at {}", default_level(verbose));
    }
}
