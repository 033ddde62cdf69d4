use std::fs;
use std::sync::Arc;

use crate::engine::{Engine, ExecutionReport};
use crate::error::BuildError;
use crate::graph::BuildGraph;
use crate::logger::Logger;
use crate::registry::Registry;
use crate::rule::Rule;
use crate::scheduler::{self, BuildOptions, Schedule};
use crate::staleness::FileState;

/// Target name intercepted before graph construction.
pub const CLEAN_TARGET: &str = "clean";

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    UpToDate,
    Cleaned { removed: Vec<String> },
    Executed(ExecutionReport),
}

impl BuildOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildOutcome::UpToDate | BuildOutcome::Cleaned { .. } => 0,
            BuildOutcome::Executed(report) => report.exit_code(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Host-facing entry point: owns the rule registry and runs build requests
/// against it.
#[derive(Debug, Clone)]
pub struct Builder {
    registry: Registry,
    jobs: usize,
    options: BuildOptions,
    logger: Arc<Logger>,
}

impl Builder {
    pub fn new(registry: Registry, logger: Arc<Logger>) -> Self {
        Self {
            registry,
            jobs: 0,
            options: BuildOptions::default(),
            logger,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn register(&mut self, rule: Rule) -> Option<Rule> {
        self.registry.register(rule)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Computes the stages for `target` without running anything.
    pub fn plan(&self, target: &str) -> Result<Schedule, BuildError> {
        let graph = BuildGraph::expand(&self.registry, target)?;
        Ok(scheduler::schedule(&self.registry, &graph, self.options))
    }

    pub async fn build(&self, target: &str) -> Result<BuildOutcome, BuildError> {
        if target == CLEAN_TARGET {
            return self.clean();
        }

        let schedule = self.plan(target)?;
        if schedule.is_empty() {
            self.logger
                .info(&format!("Nothing to be done for '{}'", target));
            return Ok(BuildOutcome::UpToDate);
        }

        self.logger.debug(&format!(
            "Building '{}': {} command(s) in {} stage(s)",
            target,
            schedule.job_count(),
            schedule.stages.len()
        ));

        let engine = Engine::new(self.jobs, Arc::clone(&self.logger));
        let report = engine.execute(&schedule.stages).await;

        if report.success() {
            self.logger.info(&format!(
                "Built '{}' ({} command(s))",
                target,
                report.jobs_executed()
            ));
        } else {
            self.logger.error(&format!(
                "Build of '{}' failed with exit code {}",
                target,
                report.exit_code()
            ));
        }

        Ok(BuildOutcome::Executed(report))
    }

    /// Deletes every existing non-phony file target.
    pub fn clean(&self) -> Result<BuildOutcome, BuildError> {
        let mut removed = Vec::new();

        for rule in self.registry.rules().filter(|rule| !rule.phony) {
            if !matches!(FileState::of(&rule.target), FileState::File(_)) {
                continue;
            }
            fs::remove_file(&rule.target)
                .map_err(|e| BuildError::io("Failed to remove", &rule.target, e))?;
            self.logger.info(&format!("Removed {}", rule.target));
            removed.push(rule.target.clone());
        }

        if removed.is_empty() {
            self.logger.info("Already clean");
        }

        Ok(BuildOutcome::Cleaned { removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use crate::logger::LogLevel;
    use crate::rule::Recipe;
    use crate::staleness::test_support::touch_at;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn quiet() -> Arc<Logger> {
        Arc::new(Logger::new().with_min_level(LogLevel::Error))
    }

    fn p(dir: &Path, name: &str) -> String {
        dir.join(name).display().to_string()
    }

    /// Recipe that creates its own target file and counts invocations.
    fn produce(target: &str, calls: &Arc<AtomicUsize>) -> Recipe {
        let path = target.to_string();
        let calls = Arc::clone(calls);
        Recipe::function(format!("produce {}", target), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            match fs::write(&path, b"built") {
                Ok(()) => 0,
                Err(_) => 1,
            }
        })
    }

    #[tokio::test]
    async fn test_unknown_target_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let out = p(dir.path(), "out");
        let registry: Registry = [Rule::new(out.as_str()).recipe(produce(&out, &calls))]
            .into_iter()
            .collect();

        let err = Builder::new(registry, quiet())
            .build("nope")
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Graph(GraphError::RuleNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!Path::new(&out).exists());
    }

    #[tokio::test]
    async fn test_second_build_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let input = dir.path().join("in.txt");
        touch_at(&input, 0);

        let mid = p(dir.path(), "mid");
        let out = p(dir.path(), "out");
        let registry: Registry = [
            Rule::new(mid.as_str())
                .dep(input.display().to_string())
                .recipe(produce(&mid, &calls)),
            Rule::new(out.as_str())
                .dep(mid.as_str())
                .recipe(produce(&out, &calls)),
        ]
        .into_iter()
        .collect();
        let builder = Builder::new(registry, quiet());

        let first = builder.build(&out).await.unwrap();
        assert!(first.success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = builder.build(&out).await.unwrap();
        assert!(matches!(second, BuildOutcome::UpToDate));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_phony_commands_run_on_every_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry: Registry = [
            Rule::phony("stamp").recipe(Recipe::function("stamp", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                0
            })),
            Rule::phony("all").dep("stamp"),
        ]
        .into_iter()
        .collect();
        let builder = Builder::new(registry, quiet());

        builder.build("all").await.unwrap();
        builder.build("all").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_command_exit_code_is_propagated() {
        let registry: Registry = [
            Rule::phony("broken").recipe(Recipe::function("broken", || 9)),
            Rule::phony("all").dep("broken"),
        ]
        .into_iter()
        .collect();

        let outcome = Builder::new(registry, quiet()).build("all").await.unwrap();
        assert_eq!(outcome.exit_code(), 9);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_clean_removes_existing_file_targets_only() {
        let dir = TempDir::new().unwrap();
        let obj = p(dir.path(), "a.o");
        let gone = p(dir.path(), "b.o");
        let out_dir = p(dir.path(), "build");
        let phony_file = p(dir.path(), "docs");
        let source = dir.path().join("a.c");
        touch_at(Path::new(&obj), 0);
        touch_at(Path::new(&phony_file), 0);
        touch_at(&source, 0);
        fs::create_dir(&out_dir).unwrap();

        let registry: Registry = [
            Rule::new(obj.as_str()).dep(source.display().to_string()),
            Rule::new(gone.as_str()),
            Rule::new(out_dir.as_str()),
            Rule::phony(phony_file.as_str()),
        ]
        .into_iter()
        .collect();
        let builder = Builder::new(registry, quiet());

        let outcome = builder.build(CLEAN_TARGET).await.unwrap();
        match outcome {
            BuildOutcome::Cleaned { removed } => assert_eq!(removed, vec![obj.clone()]),
            other => panic!("Expected Cleaned, got {:?}", other),
        }
        assert!(!Path::new(&obj).exists());
        assert!(source.exists());
        assert!(Path::new(&out_dir).is_dir());
        assert!(Path::new(&phony_file).exists());

        match builder.clean().unwrap() {
            BuildOutcome::Cleaned { removed } => assert!(removed.is_empty()),
            other => panic!("Expected Cleaned, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_exposes_schedule() {
        let registry: Registry = [
            Rule::phony("a").recipe(Recipe::function("A", || 0)),
            Rule::phony("all").dep("a").recipe(Recipe::function("ALL", || 0)),
        ]
        .into_iter()
        .collect();

        let schedule = Builder::new(registry, quiet()).plan("all").unwrap();
        assert_eq!(schedule.descriptions(), vec![vec!["A"], vec!["ALL"]]);
    }
}
