#[allow(clippy::module_inception)]
pub mod executor;
pub mod registry;
pub mod terraform;

pub use executor::{Executor, ImportOptions};
pub use registry::{DefaultExecutorRegistry, ExecutorRegistry};
pub use terraform::TerraformExecutor;

#[cfg(test)]
pub use executor::{MockExecutor, MockImport};
