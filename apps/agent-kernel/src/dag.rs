use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::models::Task;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DAGError {
    #[error("Circular dependency detected in tasks: [{}]", .0.join(", "))]
    CycleDetected(Vec<String>),
    #[error("Duplicate task id: {0}")]
    DuplicateNode(String),
    #[error("Task {task} depends on unknown task {dependency}")]
    DependencyNotFound { task: String, dependency: String },
}

/// Dependency graph over the tasks of one plan.
///
/// Node order is the order tasks appear in the plan, so ready sets come out in
/// a stable order.
pub struct DAG {
    nodes: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DAG {
    pub fn from_tasks(tasks: &[Task]) -> Result<Self, DAGError> {
        let mut dag = DAG {
            nodes: Vec::with_capacity(tasks.len()),
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
        };

        for task in tasks {
            dag.add_node(task.id.clone())?;
        }

        for task in tasks {
            for dep in &task.dependencies {
                dag.add_edge(dep, &task.id)?;
            }
        }

        Ok(dag)
    }

    fn add_node(&mut self, node_id: String) -> Result<(), DAGError> {
        if self.dependencies.contains_key(&node_id) {
            return Err(DAGError::DuplicateNode(node_id));
        }
        self.dependencies.insert(node_id.clone(), Vec::new());
        self.dependents.insert(node_id.clone(), Vec::new());
        self.nodes.push(node_id);
        Ok(())
    }

    /// Records that `to` cannot start before `from` has resolved.
    fn add_edge(&mut self, from: &str, to: &str) -> Result<(), DAGError> {
        if !self.dependencies.contains_key(from) {
            return Err(DAGError::DependencyNotFound {
                task: to.to_string(),
                dependency: from.to_string(),
            });
        }

        if let Some(deps) = self.dependencies.get_mut(to) {
            deps.push(from.to_string());
        }
        if let Some(children) = self.dependents.get_mut(from) {
            children.push(to.to_string());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Unresolved nodes whose dependencies are all resolved.
    ///
    /// An empty ready set while nodes remain unresolved means the remainder can
    /// never run; those nodes are returned in the error.
    pub fn ready_set(&self, resolved: &HashSet<String>) -> Result<Vec<String>, DAGError> {
        let pending: Vec<&String> = self
            .nodes
            .iter()
            .filter(|node| !resolved.contains(*node))
            .collect();

        let ready: Vec<String> = pending
            .iter()
            .filter(|node| {
                self.get_dependencies(node)
                    .iter()
                    .all(|dep| resolved.contains(dep))
            })
            .map(|node| (*node).clone())
            .collect();

        if ready.is_empty() && !pending.is_empty() {
            return Err(DAGError::CycleDetected(
                pending.into_iter().cloned().collect(),
            ));
        }

        Ok(ready)
    }

    /// Get dependencies for a given node
    pub fn get_dependencies(&self, node_id: &str) -> &[String] {
        self.dependencies
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get dependents for a given node
    pub fn get_dependents(&self, node_id: &str) -> &[String] {
        self.dependents
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
