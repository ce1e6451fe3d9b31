// src/error.rs
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Failures while reading primers, building edges or encoding a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Malformed input at {location}: {reason}")]
    MalformedInput { location: String, reason: String },

    #[error("Edges must have exactly two endpoints, got {0:?}")]
    MalformedEdge(Vec<u32>),

    #[error("Edge ({a}, {b}) references a vertex that is not in the graph")]
    DanglingEdge { a: u32, b: u32 },

    #[error("DIMACS header declares {declared_nodes} nodes and {declared_edges} edges, body has {nodes} and {edges}")]
    HeaderMismatch {
        declared_nodes: usize,
        declared_edges: usize,
        nodes: usize,
        edges: usize,
    },

    #[error("No active primers. Relax the primer filters or raise --max-primers (0 keeps all).")]
    NoActivePrimers,

    #[error("No compatible primer pairs among {primers} primers. Relax parameters: try a higher --max-hetdimer-bind or a larger primer pool.")]
    NoCompatiblePairs { primers: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GraphError {
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::MalformedInput { location: location.into(), reason: reason.into() }
    }
}

/// Failures of the external set finder process.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Cannot find set finder binary {0:?}. Install it or set `set_finder` in the config file.")]
    NotFound(PathBuf),

    #[error("Failed to start set finder {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Set finder exited with {0}")]
    ExitStatus(ExitStatus),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Cannot parse set finder output {line:?}: {reason}")]
    MalformedLine { line: String, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
