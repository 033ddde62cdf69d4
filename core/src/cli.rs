use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::logger::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "maker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(
        value_name = "TARGET",
        help = "Target to build (\"clean\" removes built files)"
    )]
    pub target: Option<String>,

    #[arg(
        short = 't',
        long = "target",
        value_name = "TARGET",
        conflicts_with = "target",
        help = "Target to build, even one named like a subcommand"
    )]
    pub named_target: Option<String>,

    #[arg(
        short = 'C',
        long = "directory",
        value_name = "DIR",
        help = "Change to DIR before doing anything"
    )]
    pub directory: Option<PathBuf>,

    #[arg(short = 'f', long = "file", value_name = "FILE", help = "Recipe file")]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        help = "Maximum concurrent commands (0 = unbounded)"
    )]
    pub jobs: Option<usize>,

    #[arg(short = 'B', long = "always-make", help = "Rebuild every target")]
    pub always_make: bool,

    #[arg(short, long, conflicts_with = "quiet", help = "Log scheduling details")]
    pub verbose: bool,

    #[arg(short, long, help = "Only log warnings and errors")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Write a starter maker.toml")]
    Init {
        #[arg(long, help = "Executable name")]
        name: Option<String>,
    },

    #[command(about = "List registered targets")]
    List,

    #[command(about = "Compile and link the [project] section")]
    Project,
}

impl Cli {
    pub fn requested_target(&self) -> Option<&str> {
        self.named_target.as_deref().or(self.target.as_deref())
    }

    pub fn recipe_path(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Warning
        } else {
            LogLevel::Info
        }
    }
}
