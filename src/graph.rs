// src/graph.rs
// HETERODIMER COMPATIBILITY GRAPH
// Vertices are activated primers weighted by background binding.
// An edge joins two primers that can share a reaction without forming a heterodimer.

use std::collections::HashSet;

use log::{debug, info};

use crate::error::GraphError;
use crate::parallel::ParallelProcessor;
use crate::primer::Primer;

/// Unordered pair of vertex ids. Stored in the order it was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge(pub u32, pub u32);

impl TryFrom<&[u32]> for Edge {
    type Error = GraphError;

    fn try_from(pair: &[u32]) -> Result<Self, Self::Error> {
        match pair {
            [a, b] => Ok(Edge(*a, *b)),
            _ => Err(GraphError::MalformedEdge(pair.to_vec())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: u32,
    pub weight: u64,
}

/// One-shot graph artifact for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

fn not_activated(p: &Primer) -> GraphError {
    GraphError::malformed(format!("primer {}", p.seq), "primer has not been activated (no id)")
}

/// EDGE BUILDER: tests every combination of two primers exactly once.
///
/// Edges come out in lexicographic combination order over `primers`.
/// Fewer than two primers gives an empty list; so may a strict threshold.
/// Escalating an empty result is left to the caller.
pub fn build_edges(primers: &[Primer], max_binding: usize) -> Result<Vec<Edge>, GraphError> {
    let ids = primers
        .iter()
        .map(|p| p.id.ok_or_else(|| not_activated(p)))
        .collect::<Result<Vec<u32>, _>>()?;

    let seqs: Vec<&str> = primers.iter().map(|p| p.seq.as_str()).collect();
    let pairs = ParallelProcessor::compatible_pairs(&seqs, max_binding);

    debug!(
        "{} of {} primer pairs are compatible",
        pairs.len(),
        seqs.len() * seqs.len().saturating_sub(1) / 2
    );

    Ok(pairs.into_iter().map(|(i, j)| Edge(ids[i], ids[j])).collect())
}

impl CompatibilityGraph {
    /// Assembles a graph and checks that every edge endpoint is a node.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let known: HashSet<u32> = nodes.iter().map(|n| n.id).collect();
        if let Some(e) = edges.iter().find(|e| !known.contains(&e.0) || !known.contains(&e.1)) {
            return Err(GraphError::DanglingEdge { a: e.0, b: e.1 });
        }
        Ok(Self { nodes, edges })
    }

    /// Builds the graph for activated primers: one node per primer (in the given order)
    /// plus every compatible pair.
    pub fn build(primers: &[Primer], max_binding: usize) -> Result<Self, GraphError> {
        let edges = build_edges(primers, max_binding)?;
        let nodes = primers
            .iter()
            .map(|p| p.id.map(|id| Node { id, weight: p.weight() }).ok_or_else(|| not_activated(p)))
            .collect::<Result<Vec<_>, _>>()?;

        let graph = Self::new(nodes, edges)?;
        info!(
            "Compatibility graph: {} primers, {} edges (max heterodimer bind {})",
            graph.node_count(),
            graph.edge_count(),
            max_binding
        );
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// A set search needs at least one primer and one compatible pair.
    /// Building an empty or edgeless graph is fine; searching it is not.
    pub fn ensure_searchable(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::NoActivePrimers);
        }
        if self.edges.is_empty() {
            return Err(GraphError::NoCompatiblePairs { primers: self.nodes.len() });
        }
        Ok(())
    }

    /// Nodes not touched by any edge. Legal, but they can never join a set.
    pub fn isolated_nodes(&self) -> Vec<u32> {
        let touched: HashSet<u32> = self.edges.iter().flat_map(|e| [e.0, e.1]).collect();
        self.nodes.iter().map(|n| n.id).filter(|id| !touched.contains(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complement::max_consecutive_binding;

    fn primer(id: u32, seq: &str) -> Primer {
        Primer::new(seq, 10, 10).with_id(id)
    }

    fn reference_primers() -> Vec<Primer> {
        vec![
            primer(0, "ATGCTC"),
            // rev. complement binds 5 bases
            primer(1, "CAGCAT"),
            // rev. complement binds 3 bases
            primer(2, "GAGGTA"),
            primer(3, "ATCGAG"),
            // rev. complement binds 2 bases
            primer(4, "TTCCAC"),
            // substring of the reference primer
            primer(5, "ATGC"),
        ]
    }

    #[test]
    fn heterodimers_get_no_edge() {
        let p = reference_primers();
        for het in &p[1..4] {
            let edges = build_edges(&[p[0].clone(), het.clone()], 2).unwrap();
            assert!(edges.is_empty(), "{} should dimerize", het.seq);
        }
    }

    #[test]
    fn valid_pair_gets_an_edge() {
        let p = reference_primers();
        let edges = build_edges(&[p[0].clone(), p[4].clone()], 2).unwrap();
        assert_eq!(edges, vec![Edge(0, 4)]);
    }

    #[test]
    fn substring_pair_gets_no_edge() {
        let p = reference_primers();
        let edges = build_edges(&[p[0].clone(), p[5].clone()], 100).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn three_primer_edges_follow_scanner_output() {
        let primers = vec![primer(1, "ATGC"), primer(2, "GGCC"), primer(3, "CCTA")];
        assert_eq!(max_consecutive_binding("ATGC", "GGCC"), 2);
        assert_eq!(max_consecutive_binding("ATGC", "CCTA"), 1);
        assert_eq!(max_consecutive_binding("GGCC", "CCTA"), 0);

        let edges = build_edges(&primers, 3).unwrap();
        assert_eq!(edges, vec![Edge(1, 2), Edge(1, 3), Edge(2, 3)]);

        let edges = build_edges(&primers, 1).unwrap();
        assert_eq!(edges, vec![Edge(1, 3), Edge(2, 3)]);
    }

    #[test]
    fn edge_iff_threshold_and_no_containment() {
        let p = reference_primers();
        let edges = build_edges(&p, 3).unwrap();
        for (i, a) in p.iter().enumerate() {
            for b in &p[i + 1..] {
                let expected = !a.seq.contains(&b.seq)
                    && !b.seq.contains(&a.seq)
                    && max_consecutive_binding(&a.seq, &b.seq) <= 3;
                let present = edges.contains(&Edge(a.id.unwrap(), b.id.unwrap()));
                assert_eq!(present, expected, "{} / {}", a.seq, b.seq);
            }
        }
    }

    #[test]
    fn edge_count_bounded_by_combinations() {
        let primers: Vec<Primer> = ["AAAC", "CCCA", "GGGA", "TTTG", "ACAC"]
            .iter()
            .enumerate()
            .map(|(i, s)| primer(i as u32 + 1, s))
            .collect();
        let edges = build_edges(&primers, 100).unwrap();
        assert_eq!(edges.len(), 10);
        let unique: HashSet<_> = edges.iter().map(|e| (e.0.min(e.1), e.0.max(e.1))).collect();
        assert_eq!(unique.len(), 10);
        assert!(edges.iter().all(|e| e.0 != e.1));
    }

    #[test]
    fn empty_and_single_inputs() {
        assert!(build_edges(&[], 3).unwrap().is_empty());
        assert!(build_edges(&[primer(1, "ATGC")], 3).unwrap().is_empty());
    }

    #[test]
    fn unactivated_primer_is_malformed_input() {
        let primers = vec![primer(1, "ATGC"), Primer::new("GGCC", 1, 1)];
        assert!(matches!(build_edges(&primers, 3), Err(GraphError::MalformedInput { .. })));
    }

    #[test]
    fn edge_from_slice_requires_two_elements() {
        assert_eq!(Edge::try_from(&[1u32, 2][..]).unwrap(), Edge(1, 2));
        let short = Edge::try_from(&[1u32][..]);
        assert!(matches!(short, Err(GraphError::MalformedEdge(v)) if v == vec![1]));
        assert!(Edge::try_from(&[1u32, 2, 3][..]).is_err());
    }

    #[test]
    fn graph_weights_and_isolated_nodes() {
        let primers = vec![
            Primer::new("ATGC", 5, 1400).with_id(1),
            Primer::new("GGCC", 5, 1500).with_id(2),
            Primer::new("ATGCTC", 5, 0).with_id(3),
        ];
        // ATGC is a substring of ATGCTC; GGCC vs ATGCTC binds 2
        let graph = CompatibilityGraph::build(&primers, 1).unwrap();
        assert_eq!(
            graph.nodes(),
            &[Node { id: 1, weight: 1400 }, Node { id: 2, weight: 1500 }, Node { id: 3, weight: 1 }]
        );
        assert!(graph.edges().is_empty());
        assert_eq!(graph.isolated_nodes(), vec![1, 2, 3]);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let nodes = vec![Node { id: 1, weight: 1 }];
        assert!(matches!(
            CompatibilityGraph::new(nodes, vec![Edge(1, 2)]),
            Err(GraphError::DanglingEdge { a: 1, b: 2 })
        ));
    }

    #[test]
    fn empty_and_edgeless_graphs_are_not_searchable() {
        let empty = CompatibilityGraph::build(&[], 4).unwrap();
        let err = empty.ensure_searchable().unwrap_err();
        assert!(matches!(err, GraphError::NoActivePrimers));
        assert!(err.to_string().contains("Relax the primer filters"));

        // Substring pair: never compatible, whatever the threshold
        let primers = vec![primer(1, "ATGC"), primer(2, "ATGCTC")];
        let edgeless = CompatibilityGraph::build(&primers, 100).unwrap();
        let err = edgeless.ensure_searchable().unwrap_err();
        assert!(matches!(err, GraphError::NoCompatiblePairs { primers: 2 }));
        assert!(err.to_string().contains("Relax parameters"));

        let primers = vec![primer(1, "ATGCTC"), primer(2, "TTCCAC")];
        let searchable = CompatibilityGraph::build(&primers, 2).unwrap();
        assert!(searchable.ensure_searchable().is_ok());
    }
}
