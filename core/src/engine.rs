use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::logger::Logger;
use crate::process::{self, OutputMode, ABNORMAL_EXIT};
use crate::rule::{Action, Recipe};
use crate::stage::{Stage, StageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub description: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub stages: Vec<StageResult>,
    pub failure: Option<JobFailure>,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.failure.as_ref().map_or(0, |f| f.exit_code)
    }

    pub fn jobs_executed(&self) -> usize {
        self.stages.iter().map(StageResult::jobs_executed).sum()
    }
}

/// Runs stages in order, each in batches of at most `max_jobs` concurrent
/// commands. The first failing command stops any further launches.
#[derive(Debug, Clone)]
pub struct Engine {
    max_jobs: usize,
    logger: Arc<Logger>,
}

impl Engine {
    pub fn new(max_jobs: usize, logger: Arc<Logger>) -> Self {
        Self { max_jobs, logger }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    pub async fn execute(&self, stages: &[Stage]) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (index, stage) in stages.iter().enumerate() {
            if report.failure.is_some() {
                report.stages.push(StageResult::Skipped {
                    reason: "previous stage failed".to_string(),
                });
                continue;
            }

            self.logger.debug(&format!(
                "Stage {}/{}: {} command(s)",
                index + 1,
                stages.len(),
                stage.len()
            ));

            let (result, failure) = self.execute_stage(stage).await;
            report.stages.push(result);
            report.failure = failure;
        }

        report
    }

    async fn execute_stage(&self, stage: &Stage) -> (StageResult, Option<JobFailure>) {
        let start = Instant::now();
        let mut jobs_executed = 0;
        let mut failure: Option<JobFailure> = None;

        for batch in stage.batches(self.max_jobs) {
            let handles: Vec<(String, JoinHandle<i32>)> = batch
                .iter()
                .map(|job| {
                    self.logger.command(&job.description);
                    (job.description.clone(), tokio::spawn(run_job(job.clone())))
                })
                .collect();

            // Everything already launched is awaited, even after a failure.
            for (description, handle) in handles {
                let exit_code = handle.await.unwrap_or(ABNORMAL_EXIT);
                jobs_executed += 1;

                if exit_code != 0 && failure.is_none() {
                    self.logger.error(&format!(
                        "Command failed with exit code {}: {}",
                        exit_code, description
                    ));
                    failure = Some(JobFailure {
                        description,
                        exit_code,
                    });
                }
            }

            if failure.is_some() {
                break;
            }
        }

        let duration = start.elapsed().as_secs_f64();
        let result = match &failure {
            None => StageResult::Success {
                duration,
                jobs_executed,
            },
            Some(f) => StageResult::Failed {
                error: format!("{} exited with code {}", f.description, f.exit_code),
                exit_code: f.exit_code,
                duration,
                jobs_executed,
            },
        };

        (result, failure)
    }
}

async fn run_job(job: Recipe) -> i32 {
    match job.action {
        Action::Process(argv) => process::run(&argv, OutputMode::Inherit).await.exit_code,
        Action::Function(f) => tokio::task::spawn_blocking(move || f())
            .await
            .unwrap_or(ABNORMAL_EXIT),
    }
}
