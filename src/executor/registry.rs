use super::{Executor, TerraformExecutor};
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Trait for executor registry that manages available executors
pub trait ExecutorRegistry: Send + Sync {
    /// Register an executor with the given name
    fn register(&mut self, name: String, executor: Box<dyn Executor>);

    /// Get an executor by name
    fn get(&self, name: &str) -> Result<Arc<dyn Executor>>;

    /// List all registered executor names
    fn list(&self) -> Vec<String>;
}

/// Default implementation of executor registry using a HashMap
pub struct DefaultExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn Executor>>>,
}

impl DefaultExecutorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new registry with the Terraform and OpenTofu executors
    pub fn with_defaults(command: Arc<dyn CommandExecutor>) -> Self {
        let mut registry = Self::new();
        registry.register(
            "terraform".to_string(),
            Box::new(TerraformExecutor::terraform(Arc::clone(&command))),
        );
        registry.register(
            "opentofu".to_string(),
            Box::new(TerraformExecutor::opentofu(command)),
        );
        registry
    }
}

impl Default for DefaultExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry for DefaultExecutorRegistry {
    fn register(&mut self, name: String, executor: Box<dyn Executor>) {
        let executors = self.executors.get_mut().unwrap_or_else(|e| e.into_inner());
        executors.insert(name, Arc::from(executor));
    }

    fn get(&self, name: &str) -> Result<Arc<dyn Executor>> {
        let executors = self.executors.read().unwrap_or_else(|e| e.into_inner());
        executors.get(name).cloned().with_context(|| {
            let mut known: Vec<&String> = executors.keys().collect();
            known.sort();
            format!("Unknown executor: {} (available: {:?})", name, known)
        })
    }

    fn list(&self) -> Vec<String> {
        let executors = self.executors.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = executors.keys().cloned().collect();
        names.sort();
        names
    }
}
