// Library exports for cortex-relay
// This allows the modules to be imported in tests and external code

pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod planning;
pub mod sequencer;
pub mod server;
