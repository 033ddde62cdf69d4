pub mod bootstrap;
pub mod builder;
pub mod cli;
pub mod command;
pub mod config;
pub mod depfile;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logger;
pub mod process;
pub mod project;
pub mod registry;
pub mod rule;
pub mod scheduler;
pub mod stage;
pub mod staleness;

pub use bootstrap::{rebuild_self_if_stale, Bootstrap, Launcher, ProcessLauncher, SelfRebuild};
pub use builder::{BuildOutcome, Builder, CLEAN_TARGET};
pub use cli::{Cli, Commands};
pub use command::{Cmd, Toolchain};
pub use config::Config;
pub use engine::{Engine, ExecutionReport, JobFailure};
pub use error::{BuildError, EXIT_CONFIG_ERROR};
pub use graph::{BuildGraph, GraphError};
pub use logger::{LogLevel, Logger};
pub use project::{build_project, ProjectConfig};
pub use registry::Registry;
pub use rule::{Action, Dependencies, Recipe, Rule};
pub use scheduler::{BuildOptions, Schedule};
pub use stage::{Stage, StageResult, StageStatus};
