// src/dimacs.rs
// DIMACS SPARSE GRAPH CODEC
// Byte-exact format consumed by the set finder:
//
//   p sp <node_count> <edge_count>
//   n <node_id> <node_weight>      one per vertex, in vertex order
//   e <id_a> <id_b>                one per edge, in edge order
//
// The set finder validates the header counts, so they must match the body exactly.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::GraphError;
use crate::graph::{CompatibilityGraph, Edge, Node};
use crate::primer::Primer;

/// Anything that can be written as an `n` line.
/// A record with no id or no weight is malformed; it is never written as a zero.
pub trait Vertex {
    fn vertex_id(&self) -> Option<u32>;
    fn vertex_weight(&self) -> Option<u64>;

    fn describe(&self) -> String {
        match self.vertex_id() {
            Some(id) => format!("vertex {}", id),
            None => "vertex without id".to_string(),
        }
    }
}

impl Vertex for Primer {
    fn vertex_id(&self) -> Option<u32> {
        self.id
    }

    fn vertex_weight(&self) -> Option<u64> {
        Some(self.weight())
    }

    fn describe(&self) -> String {
        format!("primer {}", self.seq)
    }
}

impl Vertex for Node {
    fn vertex_id(&self) -> Option<u32> {
        Some(self.id)
    }

    fn vertex_weight(&self) -> Option<u64> {
        Some(self.weight)
    }
}

/// ENCODER: writes vertices and edges in DIMACS `sp` format.
///
/// Ids are written as given; density and 1-based numbering are the caller's job.
/// On error the destination holds a partial graph and must be discarded.
pub fn write_graph<W: Write, V: Vertex>(
    out: &mut W,
    vertices: &[V],
    edges: &[Edge],
) -> Result<(), GraphError> {
    writeln!(out, "p sp {} {}", vertices.len(), edges.len())?;

    for v in vertices {
        let id = v
            .vertex_id()
            .ok_or_else(|| GraphError::malformed(v.describe(), "missing vertex id"))?;
        let weight = v
            .vertex_weight()
            .ok_or_else(|| GraphError::malformed(v.describe(), "missing vertex weight"))?;
        writeln!(out, "n {} {}", id, weight)?;
    }

    for Edge(a, b) in edges {
        writeln!(out, "e {} {}", a, b)?;
    }

    out.flush()?;
    Ok(())
}

/// Writes a whole graph to `path`. The handle is closed on every exit path.
pub fn write_graph_file<P: AsRef<Path>, V: Vertex>(
    path: P,
    vertices: &[V],
    edges: &[Edge],
) -> Result<(), GraphError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_graph(&mut out, vertices, edges)
}

impl CompatibilityGraph {
    pub fn write_dimacs<W: Write>(&self, out: &mut W) -> Result<(), GraphError> {
        write_graph(out, self.nodes(), self.edges())
    }
}

fn at_line(line_no: usize, reason: impl Into<String>) -> GraphError {
    GraphError::malformed(format!("line {}", line_no), reason)
}

fn parse_field<T: FromStr>(
    token: Option<&str>,
    line_no: usize,
    what: &str,
) -> Result<T, GraphError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| at_line(line_no, format!("missing or invalid {}", what)))
}

/// DECODER: parses a DIMACS `sp` graph and checks it the way the set finder would.
///
/// `c` comment lines and blank lines are ignored. The `p` line must come first.
pub fn read_graph<R: BufRead>(reader: R) -> Result<CompatibilityGraph, GraphError> {
    let mut header: Option<(usize, usize)> = None;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            None | Some("c") => continue,
            Some("p") => {
                if header.is_some() {
                    return Err(at_line(line_no, "duplicate problem line"));
                }
                if tokens.next() != Some("sp") {
                    return Err(at_line(line_no, "expected `p sp <nodes> <edges>`"));
                }
                let n = parse_field(tokens.next(), line_no, "node count")?;
                let m = parse_field(tokens.next(), line_no, "edge count")?;
                header = Some((n, m));
            }
            Some(kind @ ("n" | "e")) => {
                if header.is_none() {
                    return Err(at_line(line_no, "data before problem line"));
                }
                if kind == "n" {
                    let id = parse_field(tokens.next(), line_no, "node id")?;
                    let weight = parse_field(tokens.next(), line_no, "node weight")?;
                    nodes.push(Node { id, weight });
                } else {
                    let ids: Vec<u32> = tokens
                        .by_ref()
                        .map(|t| parse_field(Some(t), line_no, "edge endpoint"))
                        .collect::<Result<_, _>>()?;
                    edges.push(Edge::try_from(ids.as_slice())?);
                    continue;
                }
            }
            Some(other) => {
                return Err(at_line(line_no, format!("unknown line type {:?}", other)));
            }
        }

        if tokens.next().is_some() {
            return Err(at_line(line_no, "trailing fields"));
        }
    }

    let (declared_nodes, declared_edges) =
        header.ok_or_else(|| GraphError::malformed("graph", "missing problem line"))?;
    if declared_nodes != nodes.len() || declared_edges != edges.len() {
        return Err(GraphError::HeaderMismatch {
            declared_nodes,
            declared_edges,
            nodes: nodes.len(),
            edges: edges.len(),
        });
    }

    CompatibilityGraph::new(nodes, edges)
}
