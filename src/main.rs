// src/main.rs
// SWGA-GRAPH: Primer Set Compatibility Analysis
// Entry point for the Command Line Interface.
// Handles primer/graph I/O, logging, configuration and set finder orchestration.
// stdout carries data (DIMACS graphs, set lines); progress goes to stderr.

mod cli;

use swga_graph::complement::reverse_complement;
use swga_graph::config::{resolve_program, SwgaConfig};
use swga_graph::dimacs::{read_graph, write_graph_file};
use swga_graph::error::SolverError;
use swga_graph::graph::CompatibilityGraph;
use swga_graph::interrupt;
use swga_graph::parallel::ParallelProcessor;
use swga_graph::primer::{load_active_primers, Primer};
use swga_graph::stream_manager::SetFinder;
use crate::cli::{Cli, Commands};

use clap::Parser;
use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use anyhow::{Result, Context};
use chrono::Local;
use log::{info, LevelFilter};

/// Exit code for a run stopped by Ctrl-C (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

/// Console status line on stderr, silenced by `--quiet`.
macro_rules! status {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Info) {
            eprintln!($($arg)*);
        }
    };
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
    .format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
            record.level(),
            record.args()
        )
    })
    .filter(None, level)
    .parse_env("RUST_LOG")
    .init();
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).context(format!("Failed to open input: {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path).context(format!("Failed to create output: {}", path))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn display_path(path: &str) -> &str {
    if path == "-" { "<stdin/stdout>" } else { path }
}

/// Primer source -> active primers -> compatibility graph.
fn build_graph(input: &str, cfg: &SwgaConfig) -> Result<(Vec<Primer>, CompatibilityGraph)> {
    status!("[*] Reading primers from {}...", display_path(input));

    let reader = open_input(input)?;
    let (primers, skipped) = load_active_primers(reader, cfg.graph.max_primers)
    .context(format!("Failed to read primers from {}", display_path(input)))?;

    if skipped > 0 {
        status!("[!] Skipped {} malformed primer lines.", skipped);
    }
    status!(
        "[i] Active primers: {} | Max heterodimer bind: {} bases",
        primers.len(),
        cfg.graph.max_hetdimer_bind
    );

    if let Some(best) = primers.first() {
        status!("[i] Best fg/bg ratio: {} ({})", best.ratio, best.seq);
    }

    let graph = CompatibilityGraph::build(&primers, cfg.graph.max_hetdimer_bind)?;
    Ok((primers, graph))
}

fn print_graph_summary(graph: &CompatibilityGraph, destination: &str) {
    let n = graph.node_count();
    let possible = n.saturating_sub(1) * n / 2;
    status!("--------------------------------------------------");
    status!("    Primers (nodes):   {}", n);
    status!("    Compatible pairs:  {} of {}", graph.edge_count(), possible);
    if possible > 0 {
        status!("    Density:           {:.2}%", graph.edge_count() as f64 / possible as f64 * 100.0);
    }
    status!("    Isolated primers:  {}", graph.isolated_nodes().len());
    status!("    Output:            {}", display_path(destination));
    status!("--------------------------------------------------");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // CONCURRENCY CONFIGURATION
    rayon::ThreadPoolBuilder::new()
    .num_threads(cli.jobs)
    .build_global()
    .map_err(|e| anyhow::anyhow!("Failed to configure thread pool: {}", e))?;

    let num_threads = rayon::current_num_threads();
    if num_threads == 1 {
        info!("Mode: SEQUENTIAL (Single-threaded)");
    } else {
        info!("Mode: PARALLEL ({} threads active)", num_threads);
    }

    let mut cfg = SwgaConfig::load(cli.config.as_deref().map(Path::new))?;

    match &cli.command {
        // COMMAND: GRAPH (Primer list -> DIMACS)
        Commands::Graph { input, output, max_hetdimer_bind, max_primers } => {
            if let Some(m) = max_hetdimer_bind { cfg.graph.max_hetdimer_bind = *m; }
            if let Some(n) = max_primers { cfg.graph.max_primers = *n; }

            let (_, graph) = build_graph(input, &cfg)?;

            let mut out = open_output(output)?;
            graph.write_dimacs(&mut out).context(format!("Failed to write graph to {}", display_path(output)))?;

            status!("[✔] Graph written.");
            print_graph_summary(&graph, output);

            if graph.edge_count() == 0 {
                status!("[!] No primer pair is compatible. Relax parameters (e.g. a higher --max-hetdimer-bind) before searching for sets.");
            }
        }

        // COMMAND: SETS (Graph -> set finder -> compatible primer sets)
        Commands::Sets {
            input, graph, graph_out, output, sequences,
            max_hetdimer_bind, max_primers,
            set_finder, min_size, max_size, min_bg_bind_dist, bg_genome_len,
            max_sets, workers, reorder,
        } => {
            if let Some(m) = max_hetdimer_bind { cfg.graph.max_hetdimer_bind = *m; }
            if let Some(n) = max_primers { cfg.graph.max_primers = *n; }
            if let Some(p) = set_finder { cfg.sets.set_finder = PathBuf::from(p); }
            if let Some(v) = min_size { cfg.sets.min_size = *v; }
            if let Some(v) = max_size { cfg.sets.max_size = *v; }
            if let Some(v) = min_bg_bind_dist { cfg.sets.min_bg_bind_dist = *v; }
            if let Some(v) = bg_genome_len { cfg.sets.bg_genome_len = *v; }
            if let Some(v) = max_sets { cfg.sets.max_sets = *v; }
            if let Some(v) = workers { cfg.sets.workers = *v; }
            if let Some(v) = reorder { cfg.sets.vertex_ordering = *v; }

            cfg.sets.validate()?;
            let program = resolve_program(&cfg.sets.set_finder, env::var_os("PATH").as_deref())
            .context("Set finder binary is unavailable; pass --set-finder or set [sets].set_finder")?;

            // 1. Resolve the graph: load and validate, or build and persist
            let (graph_path, seq_by_id): (PathBuf, HashMap<u32, String>) = match (input, graph) {
                (_, Some(path)) => {
                    status!("[*] Loading graph from {}...", path);
                    let file = File::open(path).context(format!("Failed to open graph: {}", path))?;
                    let loaded = read_graph(BufReader::new(file)).context(format!("Invalid graph file: {}", path))?;
                    loaded.ensure_searchable()?;
                    status!("[i] Graph: {} primers, {} compatible pairs", loaded.node_count(), loaded.edge_count());
                    (PathBuf::from(path), HashMap::new())
                }
                (Some(input), None) => {
                    let (primers, built) = build_graph(input, &cfg)?;
                    built.ensure_searchable()?;
                    write_graph_file(graph_out, built.nodes(), built.edges())
                    .context(format!("Failed to write graph to {}", graph_out))?;
                    print_graph_summary(&built, graph_out);

                    let by_id = primers
                    .into_iter()
                    .filter_map(|p| p.id.map(|id| (id, p.seq)))
                    .collect();
                    (PathBuf::from(graph_out), by_id)
                }
                (None, None) => anyhow::bail!("Either --input or --graph is required"),
            };

            // 2. Stream sets from the solver(s)
            interrupt::install().context("Failed to install the Ctrl-C handler")?;

            let finder = SetFinder::new(program, cfg.sets.solver_params());
            status!(
                "[*] Searching sets of {}..{} primers ({} worker(s), {})...",
                cfg.sets.min_size,
                cfg.sets.max_size,
                cfg.sets.workers,
                finder.program().display()
            );
            let mut stream = finder.spawn_workers(&graph_path, cfg.sets.workers)?;

            let mut out = open_output(output)?;
            let mut found = 0usize;

            while let Some(result) = stream.next() {
                let set = match result {
                    Ok(set) => set,
                    Err(SolverError::Interrupted) => {
                        drop(stream);
                        out.flush()?;
                        status!("\n[!] Interrupted. {} sets written to {}.", found, display_path(output));
                        process::exit(EXIT_INTERRUPTED);
                    }
                    Err(e) => return Err(e).context("Set finder failed"),
                };

                write!(out, "{}", set)?;
                if *sequences {
                    let seqs: Vec<&str> = set.ids.iter().filter_map(|id| seq_by_id.get(id).map(String::as_str)).collect();
                    write!(out, "\t{}", seqs.join(","))?;
                }
                writeln!(out)?;
                out.flush()?;

                found += 1;
                if cfg.sets.max_sets > 0 && found >= cfg.sets.max_sets {
                    info!("Reached max_sets ({}), stopping the set finder", cfg.sets.max_sets);
                    break;
                }
            }
            drop(stream);

            status!("[✔] Search finished: {} sets written to {}.", found, display_path(output));
            if found == 0 {
                status!("[!] No sets met the constraints. Try a smaller --min-bg-bind-dist or a wider size range.");
            }
        }

        // COMMAND: DIMER (Pairwise report)
        Commands::Dimer { seqs, max_hetdimer_bind } => {
            let max_binding = max_hetdimer_bind.unwrap_or(cfg.graph.max_hetdimer_bind);
            let refs: Vec<&str> = seqs.iter().map(String::as_str).collect();

            for seq in &refs {
                match reverse_complement(seq) {
                    Some(rc) => status!("[i] {} (reverse complement {})", seq, rc),
                    None => status!("[i] {} (contains non-ACGT bases, those never pair)", seq),
                }
            }

            status!("[*] Max heterodimer bind: {} bases", max_binding);
            println!("seq1\tseq2\tmax_bind\tverdict");
            for (i, j, bind) in ParallelProcessor::binding_matrix(&refs) {
                let verdict = if ParallelProcessor::is_compatible(refs[i], refs[j], max_binding) {
                    "compatible"
                } else if bind > max_binding {
                    "heterodimer"
                } else {
                    "substring"
                };
                println!("{}\t{}\t{}\t{}", refs[i], refs[j], bind, verdict);
            }
        }
    }
    Ok(())
}
