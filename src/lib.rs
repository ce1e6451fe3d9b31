// src/lib.rs
pub mod complement;
pub mod config;
pub mod dimacs;
pub mod error;
pub mod graph;
pub mod interrupt;
pub mod parallel;
pub mod primer;
pub mod stream_manager;

/// Graph file written by `sets` when none is given.
pub const DEFAULT_GRAPH_FILE: &str = "compatibility_graph.dimacs";
