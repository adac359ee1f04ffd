//! Stochastic dynamic programming solver.
//!
//! - `golden`: golden-section decision search and its unimodality audit
//! - `state`: the tensors owned by one solver run
//! - `value_iteration`: the backward-induction engine
//! - `policy`: the decision table the engine produces

pub mod golden;
pub mod policy;
pub mod state;
pub mod value_iteration;

pub use golden::{golden_section_argmax, UnimodalityAudit};
pub use policy::{Policy, PolicyEntry};
pub use state::SimulationState;
pub use value_iteration::ValueIteration;
