pub mod actions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{CountingUserRepository, EditingScorer, GatedAnalysisRepository};
#[allow(unused_imports)]
pub use setup::{fixed_scorer, TestSetup, TestSetupBuilder};
