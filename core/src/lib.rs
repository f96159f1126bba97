//! railmap-core: rail network discovery, tracking and persistence.
//!
//! Pipeline: scanner -> tracer -> sequencer -> simplifier -> store.
//! The engine schedules tracker and render cycles off the host thread.

pub mod adjacency;
pub mod audit;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod host;
pub mod model;
pub mod render;
pub mod scanner;
pub mod sequencer;
pub mod simplifier;
pub mod store;
pub mod task;
pub mod tracer;
pub mod tracker;
pub mod types;
