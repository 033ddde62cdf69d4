use std::path::PathBuf;

use thiserror::Error;

use crate::graph::GraphError;

/// Exit code reported for configuration errors (unknown target, cycles,
/// clashing object names).
pub const EXIT_CONFIG_ERROR: i32 = 2;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("dependency scan `{command}` failed with exit code {code}")]
    DependencyScan { command: String, code: i32 },

    #[error(
        "sources {} and {} both compile to {object}",
        .first.display(),
        .second.display()
    )]
    ObjectCollision {
        object: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Graph(_) | BuildError::ObjectCollision { .. } => EXIT_CONFIG_ERROR,
            BuildError::DependencyScan { code, .. } if *code != 0 => *code,
            BuildError::DependencyScan { .. } | BuildError::Io { .. } => 1,
        }
    }
}
