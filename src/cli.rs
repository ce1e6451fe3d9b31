// src/cli.rs
use clap::{ArgGroup, Parser, Subcommand};
use swga_graph::stream_manager::VertexOrdering;

#[derive(Parser)]
#[command(name = "swga-graph", author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(help_template = "\
{before-help}{name} v{version}
{author-with-newline}{about-with-newline}
{usage-heading}
{usage}

{all-args}{after-help}
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set the number of threads for parallel processing.
    ///
    /// - 0: Auto-detect (Use all available cores).
    /// - 1: Sequential (Single-threaded, good for debugging).
    /// - >1: Force specific thread count.
    #[arg(short = 'j', long, global = true, default_value_t = 0, value_name = "THREADS")]
    pub jobs: usize,

    /// TOML parameter file (default: ./swga.toml if present)
    #[arg(long, global = true, value_name = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Show debug messages
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the heterodimer compatibility graph (DIMACS) from a primer list.
    #[command(visible_alias = "mkgraph")]
    Graph {
        /// Primer file: one `<seq> <fg_count> <bg_count> <ratio>` per line ("-" for stdin)
        #[arg(short, long, default_value = "-", value_name = "PRIMER_FILE")]
        input: String,

        /// Output DIMACS graph ("-" for stdout)
        #[arg(short, long, default_value = "-", value_name = "GRAPH_FILE")]
        output: String,

        /// Max consecutive complementary bases allowed between two primers
        #[arg(short = 'm', long, value_name = "BASES")]
        max_hetdimer_bind: Option<usize>,

        /// Keep only the N primers with the highest fg/bg ratio (0 = all)
        #[arg(long, value_name = "N")]
        max_primers: Option<usize>,
    },

    /// Build the graph (or load one) and stream compatible primer sets from the set finder.
    #[command(visible_alias = "find-sets")]
    #[command(group(ArgGroup::new("source").required(true).args(["input", "graph"])))]
    Sets {
        /// Primer file to build the graph from ("-" for stdin)
        #[arg(short, long, value_name = "PRIMER_FILE")]
        input: Option<String>,

        /// Use an existing DIMACS graph instead of building one
        #[arg(short, long, value_name = "GRAPH_FILE")]
        graph: Option<String>,

        /// Where to write the graph built from --input
        #[arg(long, default_value = swga_graph::DEFAULT_GRAPH_FILE, value_name = "GRAPH_FILE")]
        graph_out: String,

        /// Output file for the sets ("-" for stdout)
        #[arg(short, long, default_value = "-", value_name = "OUT_FILE")]
        output: String,

        /// Append the primer sequences of each set (needs --input)
        #[arg(long, requires = "input")]
        sequences: bool,

        /// Max consecutive complementary bases allowed between two primers
        #[arg(short = 'm', long, value_name = "BASES")]
        max_hetdimer_bind: Option<usize>,

        /// Keep only the N primers with the highest fg/bg ratio (0 = all)
        #[arg(long, value_name = "N")]
        max_primers: Option<usize>,

        /// Set finder binary (name on PATH or a path)
        #[arg(long, value_name = "BINARY")]
        set_finder: Option<String>,

        /// Minimum primer set size
        #[arg(long, value_name = "SIZE")]
        min_size: Option<u32>,

        /// Maximum primer set size
        #[arg(long, value_name = "SIZE")]
        max_size: Option<u32>,

        /// Minimum mean distance between background binding sites
        #[arg(short = 'b', long, value_name = "BASES")]
        min_bg_bind_dist: Option<u64>,

        /// Length of the background genome
        #[arg(short = 'l', long, value_name = "BASES")]
        bg_genome_len: Option<u64>,

        /// Stop after this many sets (0 = until the search ends or Ctrl-C)
        #[arg(long, value_name = "N")]
        max_sets: Option<usize>,

        /// Independent set finder processes (randomized vertex ordering when > 1)
        #[arg(short = 'w', long, value_name = "N")]
        workers: Option<usize>,

        /// Vertex ordering heuristic for a single set finder
        #[arg(long, value_enum, value_name = "ORDERING")]
        reorder: Option<VertexOrdering>,
    },

    /// Report the longest complementary run for every pair of the given sequences.
    #[command(visible_alias = "check")]
    Dimer {
        /// Primer sequences (two or more)
        #[arg(required = true, num_args = 2.., value_name = "SEQ")]
        seqs: Vec<String>,

        /// Max consecutive complementary bases allowed between two primers
        #[arg(short = 'm', long, value_name = "BASES")]
        max_hetdimer_bind: Option<usize>,
    },
}
