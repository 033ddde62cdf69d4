use std::fmt;

use crate::rule::Recipe;

/// Commands with no ordering between them, safe to run concurrently.
#[derive(Debug, Clone, Default)]
pub struct Stage {
    jobs: Vec<Recipe>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Recipe) {
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[Recipe] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn descriptions(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.description.as_str()).collect()
    }

    /// Splits the stage into launch batches of at most `max_jobs` commands.
    /// Zero means a single batch holding every command.
    pub fn batches(&self, max_jobs: usize) -> std::slice::Chunks<'_, Recipe> {
        let size = if max_jobs == 0 {
            self.jobs.len().max(1)
        } else {
            max_jobs
        };
        self.jobs.chunks(size)
    }
}

impl From<Vec<Recipe>> for Stage {
    fn from(jobs: Vec<Recipe>) -> Self {
        Self { jobs }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for job in &self.jobs {
            writeln!(f, "  {}", job.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    Success {
        duration: f64,
        jobs_executed: usize,
    },
    Failed {
        error: String,
        exit_code: i32,
        duration: f64,
        jobs_executed: usize,
    },
    Skipped {
        reason: String,
    },
}

impl StageResult {
    pub fn status(&self) -> StageStatus {
        match self {
            StageResult::Success { .. } => StageStatus::Completed,
            StageResult::Failed { .. } => StageStatus::Failed,
            StageResult::Skipped { .. } => StageStatus::Skipped,
        }
    }

    pub fn jobs_executed(&self) -> usize {
        match self {
            StageResult::Success { jobs_executed, .. } | StageResult::Failed { jobs_executed, .. } => {
                *jobs_executed
            }
            StageResult::Skipped { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Failed,
    Skipped,
}
