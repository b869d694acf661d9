//! Tangle core library: graph store, inspector scheduler and pipeline.
//!
//! The main entry point is [`pipeline::AnalysisPipeline`], which discovers
//! the files under a root and drives the built-in inspectors to a fixpoint
//! over a [`store::GraphStore`].

pub mod config;
pub mod contracts;
pub mod discovery;
pub mod error;
pub mod inspect;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod types;
