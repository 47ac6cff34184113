//! Bayesian network engine: loading trained networks, ancestral and
//! constraint-consistent sampling, and constraint closure.

pub mod closure;
pub mod graph;
pub mod loader;
pub mod node;

pub use closure::{compute_allowed_values, ClosureError};
pub use graph::{Assignment, BayesianNetwork};
pub use loader::LoaderError;
pub use node::{BayesianNode, ConditionalProbabilities, NodeDefinition};
