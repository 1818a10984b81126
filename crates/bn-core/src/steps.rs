//! Step graph: named pipeline steps with predecessor sets and trigger rules

use crate::error::{CoreError, CoreResult};
use crate::run_state::StepStatus;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// When a step is allowed to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Every predecessor succeeded
    #[default]
    AllSuccess,
    /// Every predecessor finished, whatever the outcome
    AllDone,
}

/// Declaration of one step
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub name: String,
    pub after: Vec<String>,
    pub trigger: Trigger,
}

impl StepSpec {
    pub fn new(name: &str, after: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            after: after.iter().map(|s| s.to_string()).collect(),
            trigger: Trigger::AllSuccess,
        }
    }

    /// Same step, but run regardless of upstream outcome
    pub fn always(mut self) -> Self {
        self.trigger = Trigger::AllDone;
        self
    }
}

/// A directed acyclic graph of steps
#[derive(Debug, Default)]
pub struct StepGraph {
    /// Edges point from a step to the steps that depend on it
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    triggers: HashMap<String, Trigger>,
}

impl StepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a graph from step declarations
    pub fn build(specs: &[StepSpec]) -> CoreResult<Self> {
        let mut graph = Self::new();
        for spec in specs {
            graph.add_step(&spec.name, spec.trigger)?;
        }
        for spec in specs {
            for dep in &spec.after {
                graph.add_dependency(&spec.name, dep)?;
            }
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Add a step; names must be unique
    pub fn add_step(&mut self, name: &str, trigger: Trigger) -> CoreResult<NodeIndex> {
        if name.is_empty() {
            return Err(CoreError::UnknownStep {
                name: "<empty>".to_string(),
            });
        }
        if self.node_map.contains_key(name) {
            return Err(CoreError::DuplicateStep {
                name: name.to_string(),
            });
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        self.triggers.insert(name.to_string(), trigger);
        Ok(idx)
    }

    /// `step` runs after `on`; both must already be declared
    pub fn add_dependency(&mut self, step: &str, on: &str) -> CoreResult<()> {
        let step_idx = self.index(step)?;
        let on_idx = self.index(on)?;
        self.graph.add_edge(on_idx, step_idx, ());
        Ok(())
    }

    fn index(&self, name: &str) -> CoreResult<NodeIndex> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownStep {
                name: name.to_string(),
            })
    }

    /// Validate the graph has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            })
    }

    /// Name the steps of a cycle through `start`, ending back at it
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        if !self.walk_back_to(start, start, &mut path, &mut visited) {
            return format!("cycle involving {}", self.graph[start]);
        }
        path.iter()
            .map(|&i| self.graph[i].as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Depth-first search from `current` for an edge leading to `start`
    fn walk_back_to(
        &self,
        start: NodeIndex,
        current: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        for next in self.graph.neighbors(current) {
            if next == start {
                path.push(next);
                return true;
            }
            if visited.insert(next) {
                path.push(next);
                if self.walk_back_to(start, next, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    /// Steps in dependency order
    pub fn topological_order(&self) -> CoreResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|i| self.graph[i].clone()).collect())
            .map_err(|cycle| CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            })
    }

    /// Group steps into waves: every step's predecessors sit in earlier waves,
    /// so the steps of one wave may run concurrently.
    pub fn levels(&self) -> CoreResult<Vec<Vec<String>>> {
        let order = self.topological_order()?;
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for name in &order {
            let level = self
                .dependencies(name)
                .iter()
                .filter_map(|d| depth.get(d.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(name, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(name.clone());
        }

        for level in &mut levels {
            level.sort();
        }
        Ok(levels)
    }

    /// Direct predecessors of a step
    pub fn dependencies(&self, step: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(step) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|i| self.graph[i].clone())
            .collect();
        names.sort();
        names
    }

    pub fn trigger(&self, step: &str) -> Trigger {
        self.triggers.get(step).copied().unwrap_or_default()
    }

    /// Decide whether `step` may start given the outcome of finished steps.
    pub fn ready(&self, step: &str, outcomes: &HashMap<String, StepStatus>) -> bool {
        let deps = self.dependencies(step);
        match self.trigger(step) {
            Trigger::AllDone => deps.iter().all(|d| outcomes.contains_key(d)),
            Trigger::AllSuccess => deps
                .iter()
                .all(|d| outcomes.get(d) == Some(&StepStatus::Success)),
        }
    }

    pub fn contains(&self, step: &str) -> bool {
        self.node_map.contains_key(step)
    }
}

#[cfg(test)]
#[path = "steps_test.rs"]
mod tests;
