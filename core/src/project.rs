//! Project auto-mode: compile every matching source of a directory into an
//! object file and link them into one executable.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::{BuildOutcome, Builder};
use crate::command::Toolchain;
use crate::config::resolve_compiler;
use crate::depfile;
use crate::error::BuildError;
use crate::logger::Logger;
use crate::process::{self, OutputMode};
use crate::registry::Registry;
use crate::rule::{Recipe, Rule};
use crate::scheduler::BuildOptions;

pub type SourceFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct ProjectConfig {
    pub build_dir: PathBuf,
    pub source_dir: PathBuf,
    pub compiler: String,
    pub compile_flags: String,
    pub link_flags: String,
    pub filter: SourceFilter,
    pub output: String,
    pub max_threads: usize,
    pub force: bool,
}

impl ProjectConfig {
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            source_dir: source_dir.into(),
            compiler: resolve_compiler(),
            compile_flags: String::new(),
            link_flags: String::new(),
            filter: extension_filter(&["c", "cc", "cpp", "cxx"]),
            output: "main".to_string(),
            max_threads: 0,
            force: false,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    pub fn executable(&self) -> PathBuf {
        self.build_dir.join(&self.output)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(
            self.compiler.clone(),
            self.compile_flags.clone(),
            self.link_flags.clone(),
        )
    }

    pub fn object_for(&self, source: &Path) -> PathBuf {
        self.build_dir.join(object_name(source))
    }
}

impl fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("build_dir", &self.build_dir)
            .field("source_dir", &self.source_dir)
            .field("compiler", &self.compiler)
            .field("compile_flags", &self.compile_flags)
            .field("link_flags", &self.link_flags)
            .field("output", &self.output)
            .field("max_threads", &self.max_threads)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

/// Keeps files whose extension is one of `extensions`.
pub fn extension_filter(extensions: &[&str]) -> SourceFilter {
    let extensions: Vec<String> = extensions.iter().map(|e| e.to_string()).collect();
    Arc::new(move |path: &Path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    })
}

/// `src/foo.cpp` -> `foo.o`, the name `-MM` uses for its targets.
fn object_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.o", stem)
}

/// Fails when two sources share a stem (`a.c` and `a.cpp`), since both would
/// compile to the same object and `-MM` would merge their listings.
pub fn check_object_names(sources: &[PathBuf]) -> Result<(), BuildError> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for source in sources {
        let object = object_name(source);
        if let Some(first) = seen.get(&object) {
            return Err(BuildError::ObjectCollision {
                object,
                first: (*first).clone(),
                second: source.clone(),
            });
        }
        seen.insert(object, source);
    }
    Ok(())
}

pub fn discover_sources(config: &ProjectConfig) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(&config.source_dir)
        .map_err(|e| BuildError::io("Failed to read source directory", &config.source_dir, e))?;

    let mut sources: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| (config.filter)(path))
        .collect();
    sources.sort();

    Ok(sources)
}

/// Turns the scanned dependency map into rules: one per object file, one for
/// the build directory and one for the final executable.
pub fn project_rules(
    config: &ProjectConfig,
    sources: &[PathBuf],
    deps: &depfile::DepMap,
) -> Result<Registry, BuildError> {
    check_object_names(sources)?;

    let toolchain = config.toolchain();
    let build_dir = config.build_dir.display().to_string();
    let mut registry = Registry::new();

    let dir = config.build_dir.clone();
    registry.register(Rule::new(build_dir.as_str()).recipe(Recipe::function(
        format!("mkdir -p {}", build_dir),
        move || match fs::create_dir_all(&dir) {
            Ok(()) => 0,
            Err(_) => 1,
        },
    )));

    let mut objects = Vec::with_capacity(sources.len());
    for source in sources {
        let object = config.object_for(source);
        let prerequisites = deps
            .get(&object_name(source))
            .cloned()
            .unwrap_or_else(|| vec![source.display().to_string()]);

        registry.register(
            Rule::new(object.display().to_string())
                .deps(prerequisites)
                .dep(build_dir.as_str())
                .command(toolchain.compile(source, &object)),
        );
        objects.push(object);
    }

    let executable = config.executable();
    let object_refs: Vec<&Path> = objects.iter().map(PathBuf::as_path).collect();
    registry.register(
        Rule::new(executable.display().to_string())
            .deps(objects.iter().map(|o| o.display().to_string()))
            .command(toolchain.link(&object_refs, &executable)),
    );

    Ok(registry)
}

/// Scans, compiles and links the project, rebuilding only what changed.
pub async fn build_project(
    config: &ProjectConfig,
    logger: Arc<Logger>,
) -> Result<BuildOutcome, BuildError> {
    let sources = discover_sources(config)?;
    check_object_names(&sources)?;
    if sources.is_empty() {
        logger.warn(&format!(
            "No source files found in {}",
            config.source_dir.display()
        ));
    }

    let deps = if sources.is_empty() {
        depfile::DepMap::new()
    } else {
        let source_refs: Vec<&Path> = sources.iter().map(PathBuf::as_path).collect();
        let scan = config.toolchain().scan(&source_refs);
        logger.debug(&format!("Scanning dependencies: {}", scan));

        let result = process::run(&scan.clone().into_argv(), OutputMode::Capture).await;
        if !result.success {
            return Err(BuildError::DependencyScan {
                command: scan.render(),
                code: result.exit_code,
            });
        }
        depfile::parse(&result.stdout)
    };

    let registry = project_rules(config, &sources, &deps)?;
    let builder = Builder::new(registry, logger)
        .with_jobs(config.max_threads)
        .with_options(BuildOptions {
            force: config.force,
        });

    builder
        .build(&config.executable().display().to_string())
        .await
}
