// Library root: re-exports all modules so integration tests and the binary
// can reach the pipeline stages.

pub mod config;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod sources;
pub mod teams;
pub mod vegas;
