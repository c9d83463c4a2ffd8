//! Container-side init (`scubainit`)
//!
//! Runs as the container entrypoint, as root. It creates the invoking
//! user, runs hooks, drops privileges and then execs the real command
//! so that it becomes PID 1.

pub mod entfiles;
pub mod env;
pub mod group;
pub mod hooks;
pub mod identity;
pub mod passwd;
pub mod sequence;
pub mod shadow;

pub use env::InitContract;
pub use identity::{EtcPaths, UserIdentity};
pub use sequence::{run_from_env, InitSequence, Stage};

/// Exit status when the init sequence itself fails
pub const EXIT_FAIL: u8 = 99;
