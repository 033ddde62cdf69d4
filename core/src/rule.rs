use std::fmt;
use std::sync::Arc;

use crate::command::Cmd;

pub type DepsFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;
pub type ActionFn = Arc<dyn Fn() -> i32 + Send + Sync>;

/// Dependency list of a rule, either declared up front or computed when the
/// build graph is expanded.
#[derive(Clone)]
pub enum Dependencies {
    Fixed(Vec<String>),
    Deferred(DepsFn),
}

impl Dependencies {
    /// Produces the dependency names. Deferred producers run on every call,
    /// so callers resolve once per traversal.
    pub fn resolve(&self) -> Vec<String> {
        match self {
            Dependencies::Fixed(deps) => deps.clone(),
            Dependencies::Deferred(produce) => produce(),
        }
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Dependencies::Fixed(Vec::new())
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependencies::Fixed(deps) => f.debug_tuple("Fixed").field(deps).finish(),
            Dependencies::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// What a recipe does when it runs.
#[derive(Clone)]
pub enum Action {
    /// An external program, given as an argument vector.
    Process(Vec<String>),
    /// An in-process function returning an exit status.
    Function(ActionFn),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Process(argv) => f.debug_tuple("Process").field(argv).finish(),
            Action::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A command attached to a rule. The description doubles as the
/// deduplication key within one build invocation.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub description: String,
    pub action: Action,
}

impl Recipe {
    pub fn new(description: impl Into<String>, action: Action) -> Self {
        Self {
            description: description.into(),
            action,
        }
    }

    pub fn process(cmd: Cmd) -> Self {
        Self {
            description: cmd.render(),
            action: Action::Process(cmd.into_argv()),
        }
    }

    pub fn function<F>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> i32 + Send + Sync + 'static,
    {
        Self::new(description, Action::Function(Arc::new(f)))
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub target: String,
    pub deps: Dependencies,
    pub recipe: Option<Recipe>,
    pub phony: bool,
}

impl Rule {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            deps: Dependencies::default(),
            recipe: None,
            phony: false,
        }
    }

    pub fn phony(target: impl Into<String>) -> Self {
        Self {
            phony: true,
            ..Self::new(target)
        }
    }

    /// Appends one declared dependency. Replaces a deferred producer.
    pub fn dep(mut self, dep: impl Into<String>) -> Self {
        match &mut self.deps {
            Dependencies::Fixed(deps) => deps.push(dep.into()),
            Dependencies::Deferred(_) => self.deps = Dependencies::Fixed(vec![dep.into()]),
        }
        self
    }

    pub fn deps<I, S>(self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        deps.into_iter().fold(self, |rule, dep| rule.dep(dep))
    }

    pub fn deferred_deps<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.deps = Dependencies::Deferred(Arc::new(produce));
        self
    }

    pub fn command(self, cmd: Cmd) -> Self {
        self.recipe(Recipe::process(cmd))
    }

    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    pub fn with_phony(mut self, phony: bool) -> Self {
        self.phony = phony;
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if self.phony {
            write!(f, " (phony)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builder_accumulates_dependencies_in_order() {
        let rule = Rule::new("app").dep("a.o").deps(["b.o", "c.o"]);
        assert_eq!(rule.deps.resolve(), vec!["a.o", "b.o", "c.o"]);
        assert!(!rule.phony);
        assert!(rule.recipe.is_none());
    }

    #[test]
    fn test_deferred_dependencies_run_on_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rule = Rule::new("gen").deferred_deps(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec!["schema.json".to_string()]
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(rule.deps.resolve(), vec!["schema.json"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_process_recipe_description_joins_tokens() {
        let rule = Rule::new("a.o").command(Cmd::new("cc").args(["-c", "a.c", "-o", "a.o"]));
        let recipe = rule.recipe.unwrap();
        assert_eq!(recipe.description, "cc -c a.c -o a.o");
        match recipe.action {
            Action::Process(argv) => assert_eq!(argv, vec!["cc", "-c", "a.c", "-o", "a.o"]),
            Action::Function(_) => panic!("Expected a process action"),
        }
    }

    #[test]
    fn test_phony_display() {
        assert_eq!(Rule::phony("all").to_string(), "all (phony)");
        assert_eq!(Rule::new("app").to_string(), "app");
    }
}
