use std::collections::HashMap;

use thiserror::Error;

use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
}

pub type NodeId = usize;

/// One target in the expanded graph. Nodes refer to rules by target name
/// and resolve them through the registry on demand.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub target: String,
    pub children: Vec<NodeId>,
}

/// Dependency graph rooted at a requested target. A target reached through
/// several parents is expanded once and shared.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    nodes: Vec<GraphNode>,
    root: NodeId,
}

impl BuildGraph {
    pub fn expand(registry: &Registry, target: &str) -> Result<Self, GraphError> {
        if !registry.contains(target) {
            return Err(GraphError::RuleNotFound(target.to_string()));
        }

        let mut expansion = Expansion {
            registry,
            nodes: Vec::new(),
            ids: HashMap::new(),
            path: Vec::new(),
        };
        let root = expansion.visit(target)?;

        Ok(Self {
            nodes: expansion.nodes,
            root,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, target: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.target == target)
    }

    pub fn dependencies(&self, id: NodeId) -> Vec<&str> {
        self.nodes[id]
            .children
            .iter()
            .map(|&child| self.nodes[child].target.as_str())
            .collect()
    }
}

struct Expansion<'a> {
    registry: &'a Registry,
    nodes: Vec<GraphNode>,
    ids: HashMap<String, NodeId>,
    path: Vec<String>,
}

impl Expansion<'_> {
    fn visit(&mut self, target: &str) -> Result<NodeId, GraphError> {
        if let Some(pos) = self.path.iter().position(|t| t == target) {
            let mut cycle = self.path[pos..].to_vec();
            cycle.push(target.to_string());
            return Err(GraphError::CircularDependency(cycle));
        }

        if let Some(&id) = self.ids.get(target) {
            return Ok(id);
        }

        let id = self.nodes.len();
        self.nodes.push(GraphNode {
            target: target.to_string(),
            children: Vec::new(),
        });
        self.ids.insert(target.to_string(), id);

        // Unregistered targets are plain files: leaves tracked by mtime only.
        let Some(rule) = self.registry.get(target) else {
            return Ok(id);
        };

        // Deferred producers run here, once per expansion.
        let deps = rule.deps.resolve();

        self.path.push(target.to_string());
        let mut children = Vec::with_capacity(deps.len());
        for dep in deps {
            // A rule listing itself is already satisfied.
            if dep == target {
                continue;
            }
            let child = self.visit(&dep)?;
            if !children.contains(&child) {
                children.push(child);
            }
        }
        self.path.pop();

        self.nodes[id].children = children;
        Ok(id)
    }
}
