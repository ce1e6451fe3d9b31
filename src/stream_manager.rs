// src/stream_manager.rs
// SET FINDER STREAM
// Runs the external clique/set finder on a DIMACS graph and yields its result lines.
//
// Output format, one line per compatible set:  <id1>,<id2>,...,<idK> <weight>
//
// - Each solver runs in its own process group, so cancelling kills any helpers it forked.
// - A reader thread per solver forwards stdout lines over a channel. The consumer polls
//   that channel with a short timeout, so a silent solver never blocks an interrupt.
// - There is no overall timeout: the search stops when the caller has enough sets,
//   the solver finishes, or the user interrupts.
// - Dropping the stream cancels it. Every exit path reaps the children.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::SolverError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Vertex ordering heuristic passed to the set finder (`--reorder`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VertexOrdering {
    WeightedColoring,
    UnweightedColoring,
    Random,
}

impl VertexOrdering {
    pub fn as_str(self) -> &'static str {
        match self {
            VertexOrdering::WeightedColoring => "weighted-coloring",
            VertexOrdering::UnweightedColoring => "unweighted-coloring",
            VertexOrdering::Random => "random",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Minimum mean distance between background binding sites of a set.
    pub min_bg_bind_dist: u64,
    pub bg_genome_len: u64,
    pub min_size: u32,
    pub max_size: u32,
    pub vertex_ordering: VertexOrdering,
}

/// One compatible set reported by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SetLine {
    pub ids: Vec<u32>,
    /// Solver-computed aggregate (mean background binding distance).
    pub weight: f64,
}

impl SetLine {
    /// Ids in ascending order; two lines describe the same set iff these match.
    pub fn canonical_ids(&self) -> Vec<u32> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Display for SetLine {
    /// Same layout the solver prints: `<id1>,<id2>,... <weight>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(u32::to_string).collect();
        write!(f, "{} {}", ids.join(","), self.weight)
    }
}

/// Parses `<id1>,<id2>,... <weight>`.
pub fn parse_set_line(line: &str) -> Result<SetLine, SolverError> {
    let malformed = |reason: &str| SolverError::MalformedLine { line: line.to_string(), reason: reason.to_string() };

    let mut fields = line.split_whitespace();
    let (ids_field, weight_field) = match (fields.next(), fields.next(), fields.next()) {
        (Some(ids), Some(weight), None) => (ids, weight),
        _ => return Err(malformed("expected `<ids> <weight>`")),
    };

    let ids = ids_field
        .split(',')
        .map(|t| t.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed("invalid primer id"))?;
    let weight: f64 = weight_field.parse().map_err(|_| malformed("invalid weight"))?;

    Ok(SetLine { ids, weight })
}

/// Invocation recipe for the set finder binary.
#[derive(Debug, Clone)]
pub struct SetFinder {
    program: PathBuf,
    params: SolverParams,
}

impl SetFinder {
    pub fn new(program: impl Into<PathBuf>, params: SolverParams) -> Self {
        Self { program: program.into(), params }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector for one solver run over `graph`.
    pub fn args(&self, graph: &Path, ordering: VertexOrdering) -> Vec<OsString> {
        let p = &self.params;
        let mut args: Vec<OsString> = [
            "-q".to_string(), "-q".to_string(),
            "--bg_freq".to_string(), p.min_bg_bind_dist.to_string(),
            "--bg_len".to_string(), p.bg_genome_len.to_string(),
            "--min".to_string(), p.min_size.to_string(),
            "--max".to_string(), p.max_size.to_string(),
            "--all".to_string(),
            "--reorder".to_string(), ordering.as_str().to_string(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(graph.as_os_str().to_owned());
        args
    }

    /// Starts a single solver with the configured vertex ordering.
    pub fn spawn(&self, graph: &Path) -> Result<SolverStream, SolverError> {
        self.spawn_workers(graph, 1)
    }

    /// Starts `workers` independent solvers over the same graph.
    ///
    /// With more than one worker each run uses random vertex ordering, so every
    /// process explores a different part of the search space. Their lines are
    /// merged as they arrive and repeated sets are dropped. Memory for the
    /// repeat check grows with the number of distinct sets reported.
    pub fn spawn_workers(&self, graph: &Path, workers: usize) -> Result<SolverStream, SolverError> {
        let workers = workers.max(1);
        let ordering = if workers > 1 { VertexOrdering::Random } else { self.params.vertex_ordering };

        let (tx, rx) = mpsc::channel();
        let mut stream = SolverStream {
            children: Vec::with_capacity(workers),
            readers: Vec::with_capacity(workers),
            lines: rx,
            seen: (workers > 1).then(HashSet::new),
            interrupt_check: crate::interrupt::requested,
            finished: false,
        };

        for worker in 0..workers {
            let child = Command::new(&self.program)
                .args(self.args(graph, ordering))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .process_group(0)
                .spawn()
                .map_err(|source| match source.kind() {
                    io::ErrorKind::NotFound => SolverError::NotFound(self.program.clone()),
                    _ => SolverError::Spawn { program: self.program.clone(), source },
                })?;
            debug!("Started set finder worker {} (pid {})", worker, child.id());

            stream.children.push(child);

            let stdout = stream.children.last_mut().and_then(|c| c.stdout.take()).ok_or_else(|| {
                SolverError::Io(io::Error::new(io::ErrorKind::Other, "set finder stdout was not captured"))
            })?;

            let tx = tx.clone();
            stream.readers.push(thread::spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let stop = line.is_err();
                    if tx.send(line).is_err() || stop {
                        break;
                    }
                }
            }));
        }

        Ok(stream)
    }
}

/// Live result stream over one or more solver processes.
pub struct SolverStream {
    children: Vec<Child>,
    readers: Vec<JoinHandle<()>>,
    lines: Receiver<io::Result<String>>,
    /// Present when several workers may report the same set. Holds every set
    /// reported so far, so it grows with the run; `max_sets` bounds it in practice.
    seen: Option<HashSet<Vec<u32>>>,
    interrupt_check: fn() -> bool,
    finished: bool,
}

impl SolverStream {
    /// Replaces the interrupt probe (defaults to the process-wide SIGINT flag).
    pub fn with_interrupt_check(mut self, check: fn() -> bool) -> Self {
        self.interrupt_check = check;
        self
    }

    /// KILL SWITCH: terminates every solver process group and reaps the children.
    /// Safe to call repeatedly; children that already exited are only reaped.
    pub fn cancel(&mut self) {
        self.finished = true;

        for child in &mut self.children {
            if let Ok(None) = child.try_wait() {
                // SAFETY: plain syscall on the group we created for this child.
                let rc = unsafe { libc::killpg(child.id() as libc::pid_t, libc::SIGKILL) };
                if rc != 0 {
                    // Group already gone, fall back to the direct child
                    let _ = child.kill();
                }
            }
            let _ = child.wait();
        }
        self.children.clear();
        self.join_readers();
    }

    fn join_readers(&mut self) {
        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                warn!("Set finder reader thread panicked");
            }
        }
    }

    /// Called once every reader hit EOF: reaps the children and reports the first failure.
    fn finish(&mut self) -> Option<Result<SetLine, SolverError>> {
        self.finished = true;
        self.join_readers();

        let mut failure = None;
        for mut child in self.children.drain(..) {
            match child.wait() {
                Ok(status) if status.success() => {}
                Ok(status) => { failure.get_or_insert(SolverError::ExitStatus(status)); }
                Err(e) => { failure.get_or_insert(SolverError::Io(e)); }
            }
        }
        failure.map(Err)
    }
}

impl Iterator for SolverStream {
    type Item = Result<SetLine, SolverError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if (self.interrupt_check)() {
                self.cancel();
                return Some(Err(SolverError::Interrupted));
            }

            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(line)) => {
                    if line.trim().is_empty() { continue; }

                    let set = match parse_set_line(&line) {
                        Ok(set) => set,
                        Err(e) => return Some(Err(e)),
                    };

                    if let Some(seen) = self.seen.as_mut() {
                        if !seen.insert(set.canonical_ids()) { continue; }
                    }
                    return Some(Ok(set));
                }
                Ok(Err(e)) => {
                    self.cancel();
                    return Some(Err(SolverError::Io(e)));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return self.finish(),
            }
        }
    }
}

impl Drop for SolverStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
