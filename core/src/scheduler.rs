use std::collections::HashMap;

use crate::graph::{BuildGraph, NodeId};
use crate::registry::Registry;
use crate::rule::Recipe;
use crate::stage::Stage;
use crate::staleness;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Treat every registered rule as stale.
    pub force: bool,
}

/// Ordered stages produced for one build request.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub stages: Vec<Stage>,
}

impl Schedule {
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.job_count() == 0
    }

    pub fn descriptions(&self) -> Vec<Vec<&str>> {
        self.stages.iter().map(Stage::descriptions).collect()
    }
}

/// Walks the graph bottom-up and emits the stages needed to bring the root
/// up to date.
///
/// Every dirty node's command is placed one layer above the deepest command
/// among its dirty descendants, so a dependency shared by several paths runs
/// before each of its dependents no matter which path reached it first.
pub fn schedule(registry: &Registry, graph: &BuildGraph, options: BuildOptions) -> Schedule {
    let mut traversal = Traversal {
        registry,
        graph,
        options,
        visited: vec![None; graph.len()],
        scheduled: HashMap::new(),
        layers: Vec::new(),
    };

    traversal.visit(graph.root());

    let stages = traversal
        .layers
        .into_iter()
        .filter(|layer| !layer.is_empty())
        .map(Stage::from)
        .collect();

    Schedule { stages }
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    dirty: bool,
    /// First layer a dependent's command may occupy.
    ready_after: usize,
}

/// State scoped to a single scheduling pass.
struct Traversal<'a> {
    registry: &'a Registry,
    graph: &'a BuildGraph,
    options: BuildOptions,
    visited: Vec<Option<Visit>>,
    /// Layer each description was placed in.
    scheduled: HashMap<String, usize>,
    layers: Vec<Vec<Recipe>>,
}

impl Traversal<'_> {
    fn visit(&mut self, id: NodeId) -> Visit {
        if let Some(visit) = self.visited[id] {
            return visit;
        }

        let graph = self.graph;
        let mut any_child_dirty = false;
        let mut layer = 0;

        for &child in &graph.node(id).children {
            let visit = self.visit(child);
            if visit.dirty {
                any_child_dirty = true;
                layer = layer.max(visit.ready_after);
            }
        }

        let dirty = any_child_dirty || self.is_stale(id);
        let ready_after = match self.recipe_of(id) {
            Some(recipe) if dirty => self.place(recipe, layer) + 1,
            _ => layer,
        };

        let visit = Visit { dirty, ready_after };
        self.visited[id] = Some(visit);
        visit
    }

    /// Puts `recipe` in `layer` unless an identical command is already
    /// placed, and returns the layer it runs in.
    fn place(&mut self, recipe: Recipe, layer: usize) -> usize {
        if let Some(&existing) = self.scheduled.get(&recipe.description) {
            return existing;
        }

        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, Vec::new);
        }
        self.scheduled.insert(recipe.description.clone(), layer);
        self.layers[layer].push(recipe);
        layer
    }

    fn recipe_of(&self, id: NodeId) -> Option<Recipe> {
        self.registry
            .get(&self.graph.node(id).target)
            .and_then(|rule| rule.recipe.clone())
    }

    fn is_stale(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        match self.registry.get(&node.target) {
            // Plain files are inputs; their parents compare timestamps.
            None => false,
            Some(_) if self.options.force => true,
            Some(rule) => staleness::rule_is_stale(rule, &self.graph.dependencies(id)),
        }
    }
}
