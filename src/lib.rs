//! Scuba - Simple Container-Utilizing Build Apparatus
//!
//! Scuba runs commands inside a Docker container as the invoking user, with
//! the project directory mounted at the same path. The container image,
//! aliases and hooks come from a `.scuba.yml` file in the project root.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use scuba::config::load_config;
//! use scuba::resolve::{resolve, CliOverrides, Selector};
//!
//! let root = Path::new("/src/project");
//! let config = load_config(&root.join(".scuba.yml"), root).unwrap();
//! let selector = Selector::from_tokens(&config, &["build".to_string()]);
//! let resolved = resolve(&config, &selector, &CliOverrides::default()).unwrap();
//! println!("{:?}", resolved.command_lines);
//! ```
//!
//! The container side lives in [`init`]: the `scubainit` binary provisions
//! the user, runs hooks, drops privileges and execs the command.

pub mod cli;
pub mod config;
pub mod error;
pub mod init;
pub mod invocation;
pub mod logging;
pub mod output;
pub mod resolve;
pub mod shell;

pub use config::{load_config, ScubaConfig};
pub use error::{Result, ScubaError};
pub use invocation::{build, BuildOptions, DockerInvocation};
pub use output::{format_output, OutputFormat};
pub use resolve::{resolve, CliOverrides, ResolvedInvocation, Selector};
