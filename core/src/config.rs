use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::command::Cmd;
use crate::project::{extension_filter, ProjectConfig};
use crate::registry::Registry;
use crate::rule::{Recipe, Rule};

/// Environment variable selecting the C/C++ compiler.
pub const COMPILER_ENV: &str = "CXX";
pub const DEFAULT_COMPILER: &str = "c++";

/// Environment variable overriding the self-rebuild flags.
pub const REBUILD_FLAGS_ENV: &str = "MAKER_FLAGS";
pub const DEFAULT_REBUILD_FLAGS: &[&str] = &["-Oz", "-fno-rtti", "-fno-exceptions"];

pub const CONFIG_FILE: &str = "maker.toml";

fn resolve_compiler_with<F>(mut read_env: F) -> String
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(COMPILER_ENV)
        .and_then(|value| value.into_string().ok())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COMPILER.to_string())
}

pub fn resolve_compiler() -> String {
    resolve_compiler_with(|key| std::env::var_os(key))
}

fn resolve_rebuild_flags_with<F>(mut read_env: F) -> Vec<String>
where
    F: FnMut(&str) -> Option<OsString>,
{
    match read_env(REBUILD_FLAGS_ENV).and_then(|value| value.into_string().ok()) {
        Some(flags) => flags.split_whitespace().map(str::to_string).collect(),
        None => DEFAULT_REBUILD_FLAGS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn resolve_rebuild_flags() -> Vec<String> {
    resolve_rebuild_flags_with(|key| std::env::var_os(key))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default, rename = "rule", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
    #[serde(default)]
    pub jobs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub target: String,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub phony: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(default)]
    pub compile_flags: String,
    #[serde(default)]
    pub link_flags: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub max_threads: usize,
    #[serde(default)]
    pub force: bool,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            source_dir: default_source_dir(),
            compiler: None,
            compile_flags: String::new(),
            link_flags: String::new(),
            extensions: default_extensions(),
            output: default_output(),
            max_threads: 0,
            force: false,
        }
    }
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["c".to_string(), "cc".to_string(), "cpp".to_string()]
}

fn default_output() -> String {
    "main".to_string()
}

impl RuleConfig {
    pub fn to_rule(&self) -> Rule {
        let mut rule = Rule::new(self.target.as_str())
            .deps(self.deps.iter().cloned())
            .with_phony(self.phony);

        if !self.command.is_empty() {
            let mut recipe = Recipe::process(Cmd::from_argv(self.command.iter().cloned()));
            if let Some(description) = &self.description {
                recipe.description = description.clone();
            }
            rule = rule.recipe(recipe);
        }

        rule
    }
}

impl ProjectSection {
    /// Resolves directories relative to `root`.
    pub fn to_project_config(&self, root: &Path) -> ProjectConfig {
        let mut config = ProjectConfig::new(
            root.join(Config::expand_path(&self.source_dir)),
            root.join(Config::expand_path(&self.build_dir)),
        );
        if let Some(compiler) = &self.compiler {
            config.compiler = compiler.clone();
        }
        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        config.filter = extension_filter(&extensions);
        config.compile_flags = self.compile_flags.clone();
        config.link_flags = self.link_flags.clone();
        config.output = self.output.clone();
        config.max_threads = self.max_threads;
        config.force = self.force;
        config
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = Self::expand_path(&path.as_ref().to_string_lossy());

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.as_ref())
    }

    pub fn registry(&self) -> Registry {
        self.rules.iter().map(RuleConfig::to_rule).collect()
    }

    /// Starter recipe written by `maker init`.
    pub fn starter(name: Option<&str>) -> Self {
        let output = name.unwrap_or("main").to_string();
        Self {
            build: BuildConfig {
                default_target: Some("all".to_string()),
                jobs: 0,
            },
            rules: vec![
                RuleConfig {
                    target: "all".to_string(),
                    deps: vec![format!("build/{}", output)],
                    command: Vec::new(),
                    description: None,
                    phony: true,
                },
                RuleConfig {
                    target: "build".to_string(),
                    deps: Vec::new(),
                    command: vec!["mkdir".to_string(), "-p".to_string(), "build".to_string()],
                    description: None,
                    phony: false,
                },
                RuleConfig {
                    target: format!("build/{}", output),
                    deps: vec!["build".to_string(), "src/main.c".to_string()],
                    command: vec![
                        DEFAULT_COMPILER.to_string(),
                        "src/main.c".to_string(),
                        "-o".to_string(),
                        format!("build/{}", output),
                    ],
                    description: None,
                    phony: false,
                },
            ],
            project: Some(ProjectSection {
                output,
                ..ProjectSection::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Action;
    use tempfile::TempDir;

    #[test]
    fn test_compiler_env_overrides_default() {
        let compiler = resolve_compiler_with(|key| {
            assert_eq!(key, COMPILER_ENV);
            Some(OsString::from("clang++"))
        });
        assert_eq!(compiler, "clang++");
        assert_eq!(resolve_compiler_with(|_| None), DEFAULT_COMPILER);
        assert_eq!(
            resolve_compiler_with(|_| Some(OsString::from("  "))),
            DEFAULT_COMPILER
        );
    }

    #[test]
    fn test_rebuild_flags_env() {
        assert_eq!(
            resolve_rebuild_flags_with(|_| None),
            vec!["-Oz", "-fno-rtti", "-fno-exceptions"]
        );
        assert_eq!(
            resolve_rebuild_flags_with(|_| Some(OsString::from("-O2  -g"))),
            vec!["-O2", "-g"]
        );
    }

    #[test]
    fn test_parse_rules_and_project() {
        let config: Config = toml::from_str(
            r#"
            [build]
            default_target = "app"
            jobs = 4

            [[rule]]
            target = "a.o"
            deps = ["a.c"]
            command = ["cc", "-c", "a.c", "-o", "a.o"]

            [[rule]]
            target = "app"
            deps = ["a.o"]
            command = ["cc", "a.o", "-o", "app"]
            description = "LINK app"

            [[rule]]
            target = "all"
            deps = ["app"]
            phony = true

            [project]
            compile_flags = "-Wall"
            "#,
        )
        .unwrap();

        assert_eq!(config.build.default_target.as_deref(), Some("app"));
        assert_eq!(config.build.jobs, 4);

        let registry = config.registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("all").unwrap().phony);
        assert!(registry.get("all").unwrap().recipe.is_none());

        let link = registry.get("app").unwrap().recipe.clone().unwrap();
        assert_eq!(link.description, "LINK app");
        assert!(matches!(link.action, Action::Process(ref argv) if argv[0] == "cc"));

        let compile = registry.get("a.o").unwrap().recipe.clone().unwrap();
        assert_eq!(compile.description, "cc -c a.c -o a.o");

        let project = config.project.unwrap();
        assert_eq!(project.build_dir, "build");
        assert_eq!(project.source_dir, "src");
        assert_eq!(project.compile_flags, "-Wall");
        assert_eq!(project.output, "main");
    }

    #[test]
    fn test_project_section_resolves_against_root() {
        let section = ProjectSection {
            compiler: Some("gcc".to_string()),
            extensions: vec!["c".to_string()],
            ..ProjectSection::default()
        };
        let project = section.to_project_config(Path::new("/work"));

        assert_eq!(project.source_dir, Path::new("/work/src"));
        assert_eq!(project.executable(), Path::new("/work/build/main"));
        assert_eq!(project.compiler, "gcc");
        assert!((project.filter)(Path::new("x.c")));
        assert!(!(project.filter)(Path::new("x.cpp")));
    }

    #[test]
    fn test_starter_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        Config::starter(Some("demo")).save_to_file(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();

        assert_eq!(loaded.build.default_target.as_deref(), Some("all"));
        assert_eq!(loaded.rules.len(), 3);
        assert_eq!(loaded.project.unwrap().output, "demo");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from_file(dir.path().join(CONFIG_FILE)).is_err());
    }
}
