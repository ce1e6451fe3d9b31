// src/config.rs
// PIPELINE CONFIGURATION
// One explicit value object, built at startup from an optional TOML file and then
// overridden by command line flags. The core modules never read files or the
// environment for settings; they receive plain values from here.
//
// Example swga.toml:
//
//   [graph]
//   max_hetdimer_bind = 4
//
//   [sets]
//   set_finder = "/opt/swga/bin/set_finder"
//   bg_genome_len = 3100000000
//   min_bg_bind_dist = 30000

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, SolverError};
use crate::stream_manager::{SolverParams, VertexOrdering};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "swga.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Max consecutive complementary bases two primers may share (inclusive).
    pub max_hetdimer_bind: usize,
    /// Keep only the N best primers by ratio. 0 keeps all.
    pub max_primers: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { max_hetdimer_bind: 4, max_primers: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetsConfig {
    pub set_finder: PathBuf,
    pub min_size: u32,
    pub max_size: u32,
    pub min_bg_bind_dist: u64,
    /// Must be set (> 0) before sets can be searched.
    pub bg_genome_len: u64,
    /// Stop after this many sets. 0 runs until the solver finishes or the user interrupts.
    pub max_sets: usize,
    pub workers: usize,
    pub vertex_ordering: VertexOrdering,
}

impl Default for SetsConfig {
    fn default() -> Self {
        Self {
            set_finder: PathBuf::from("set_finder"),
            min_size: 2,
            max_size: 7,
            min_bg_bind_dist: 30000,
            bg_genome_len: 0,
            max_sets: 10,
            workers: 1,
            vertex_ordering: VertexOrdering::WeightedColoring,
        }
    }
}

impl SetsConfig {
    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            min_bg_bind_dist: self.min_bg_bind_dist,
            bg_genome_len: self.bg_genome_len,
            min_size: self.min_size,
            max_size: self.max_size,
            vertex_ordering: self.vertex_ordering,
        }
    }

    /// Checks the values the solver cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_size == 0 {
            return Err(ConfigError::Invalid("min_size must be at least 1".into()));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::Invalid(format!(
                "min_size ({}) is larger than max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.bg_genome_len == 0 {
            return Err(ConfigError::Invalid(
                "bg_genome_len is not set; pass --bg-genome-len or set it under [sets]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwgaConfig {
    pub graph: GraphConfig,
    pub sets: SetsConfig,
}

impl SwgaConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })
    }

    /// Loads `path`, or `swga.toml` from the working directory if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        Self::from_toml_str(&text, &path)
    }
}

/// Locates the set finder binary. Bare names are searched in `search_path`
/// (the value of `PATH`); anything with a directory component must exist as given.
pub fn resolve_program(program: &Path, search_path: Option<&OsStr>) -> Result<PathBuf, SolverError> {
    if program.components().count() > 1 {
        return if program.is_file() {
            Ok(program.to_path_buf())
        } else {
            Err(SolverError::NotFound(program.to_path_buf()))
        };
    }

    search_path
        .into_iter()
        .flat_map(|paths| std::env::split_paths(paths))
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| SolverError::NotFound(program.to_path_buf()))
}
