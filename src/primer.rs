// src/primer.rs
// PRIMER RECORDS
// Parses the primer source stream and prepares primers for graph construction.
//
// Line format: <sequence> <fg_count> <bg_count> <ratio>   (space or tab delimited)
// - Identifiers are NOT durable. They are (re)assigned by `activate` right before a
//   graph is built, because the set finder consumes dense 1-based vertex ids.
// - The durable key of a primer is its sequence.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead};

use log::{debug, warn};

use crate::error::GraphError;

/// Foreground/background binding ratio. `Unbounded` stands in for a zero background count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Finite(f64),
    Unbounded,
}

impl Ratio {
    pub fn from_counts(fg_freq: u64, bg_freq: u64) -> Self {
        if bg_freq == 0 {
            Ratio::Unbounded
        } else {
            Ratio::Finite(fg_freq as f64 / bg_freq as f64)
        }
    }

    /// Sort key where `Unbounded` ranks above every finite ratio.
    fn rank(self) -> f64 {
        match self {
            Ratio::Finite(r) => r,
            Ratio::Unbounded => f64::INFINITY,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Finite(r) => write!(f, "{}", r),
            Ratio::Unbounded => write!(f, "inf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primer {
    /// Dense 1-based vertex id, `None` until the primer is activated.
    pub id: Option<u32>,
    pub seq: String,
    pub fg_freq: u64,
    pub bg_freq: u64,
    pub ratio: Ratio,
}

impl Primer {
    pub fn new(seq: impl Into<String>, fg_freq: u64, bg_freq: u64) -> Self {
        Self {
            id: None,
            seq: seq.into(),
            fg_freq,
            bg_freq,
            ratio: Ratio::from_counts(fg_freq, bg_freq),
        }
    }

    /// Builder helper for callers (and tests) that already know the vertex id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Vertex weight in the compatibility graph: the background count, floored at 1
    /// so the set finder never sees a zero-weight vertex.
    pub fn weight(&self) -> u64 {
        self.bg_freq.max(1)
    }
}

/// Parses one primer line. Fails on a wrong field count, non-numeric counts or a bad ratio.
pub fn parse_primer_line(line: &str) -> Result<Primer, GraphError> {
    let fields: Vec<&str> = line.split([' ', '\t']).filter(|f| !f.is_empty()).collect();
    if fields.len() != 4 {
        return Err(GraphError::malformed(
            "primer line",
            format!("expected 4 fields (seq, fg, bg, ratio), found {}", fields.len()),
        ));
    }

    let seq = fields[0];
    let fg_freq: u64 = fields[1]
        .parse()
        .map_err(|_| GraphError::malformed("primer line", format!("invalid foreground count {:?}", fields[1])))?;
    let bg_freq: u64 = fields[2]
        .parse()
        .map_err(|_| GraphError::malformed("primer line", format!("invalid background count {:?}", fields[2])))?;
    let ratio = match fields[3].parse::<f64>() {
        Ok(r) if r.is_infinite() && r > 0.0 => Ratio::Unbounded,
        Ok(r) if r.is_finite() && r >= 0.0 => Ratio::Finite(r),
        _ => {
            return Err(GraphError::malformed(
                "primer line",
                format!("invalid ratio {:?}", fields[3]),
            ))
        }
    };

    Ok(Primer { id: None, seq: seq.to_string(), fg_freq, bg_freq, ratio })
}

/// Streaming primer source.
///
/// Malformed lines (including bytes that are not UTF-8) are skipped with a warning
/// and counted; they never abort the batch. Blank lines are ignored. I/O errors are propagated.
pub struct PrimerReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> PrimerReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new(), line_no: 0, skipped: 0 }
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for PrimerReader<R> {
    type Item = io::Result<Primer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(l) => l.trim(),
                Err(_) => {
                    warn!("Line {} is not valid UTF-8, skipping...", self.line_no);
                    self.skipped += 1;
                    continue;
                }
            };
            if line.is_empty() { continue; }

            match parse_primer_line(line) {
                Ok(primer) => return Some(Ok(primer)),
                Err(e) => {
                    warn!("Cannot parse line {} ({}), skipping...", self.line_no, e);
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Reads every well-formed primer from a source. Returns the primers and the skip count.
pub fn read_primers<R: BufRead>(reader: R) -> io::Result<(Vec<Primer>, usize)> {
    let mut source = PrimerReader::new(reader);
    let primers = source.by_ref().collect::<io::Result<Vec<_>>>()?;
    Ok((primers, source.skipped()))
}

/// Drops primers whose sequence was already seen, keeping the first occurrence.
pub fn dedup_by_sequence(primers: Vec<Primer>) -> Vec<Primer> {
    let mut seen = HashSet::with_capacity(primers.len());
    let before = primers.len();
    let unique: Vec<Primer> = primers
        .into_iter()
        .filter(|p| seen.insert(p.seq.clone()))
        .collect();
    if unique.len() < before {
        debug!("Dropped {} duplicate primer sequences", before - unique.len());
    }
    unique
}

/// ACTIVATION: orders primers by descending ratio and assigns dense ids 1..=n.
///
/// Any previous ids are discarded. `max_active` > 0 keeps only the top primers
/// and warns when fewer than that were available.
pub fn activate(mut primers: Vec<Primer>, max_active: usize) -> Vec<Primer> {
    // Stable: equal ratios keep input order
    primers.sort_by(|a, b| b.ratio.rank().total_cmp(&a.ratio.rank()));

    if max_active > 0 {
        if primers.len() < max_active {
            warn!(
                "Fewer than {} primers were selected ({} available). You may want to try less restrictive filtering parameters.",
                max_active,
                primers.len()
            );
        }
        primers.truncate(max_active);
    }

    for (i, primer) in primers.iter_mut().enumerate() {
        primer.id = Some(i as u32 + 1);
    }
    primers
}

/// Primer source to graph-ready primers: read, drop repeated sequences, activate.
/// Returns the active primers and the number of skipped input lines.
pub fn load_active_primers<R: BufRead>(reader: R, max_active: usize) -> io::Result<(Vec<Primer>, usize)> {
    let (primers, skipped) = read_primers(reader)?;
    Ok((activate(dedup_by_sequence(primers), max_active), skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_space_and_tab_delimited_lines() {
        let p = parse_primer_line("ATGC 50 99 0.5").unwrap();
        assert_eq!(p.seq, "ATGC");
        assert_eq!((p.fg_freq, p.bg_freq), (50, 99));
        assert_eq!(p.ratio, Ratio::Finite(0.5));
        assert_eq!(p.id, None);

        let p = parse_primer_line("CGTA\t100\t98\t0.2").unwrap();
        assert_eq!(p.seq, "CGTA");
        assert_eq!(p.bg_freq, 98);

        let p = parse_primer_line("GGCC 12 0 inf").unwrap();
        assert_eq!(p.ratio, Ratio::Unbounded);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_primer_line("GCCT;1;2;3").is_err());
        assert!(parse_primer_line("Some header file here").is_err());
        assert!(parse_primer_line("ATGC 1 2").is_err());
        assert!(parse_primer_line("ATGC -1 2 0.5").is_err());
        assert!(parse_primer_line("ATGC 1 x 0.5").is_err());
        assert!(parse_primer_line("ATGC 1 2 nan").is_err());
        assert!(parse_primer_line("ATGC 1 2 -0.5").is_err());
    }

    #[test]
    fn reader_skips_bad_lines_and_counts_them() {
        let input = "Some header file here\nATGC 50 99 0.5\nTCGA 100 200 0.4\n\nCGTA\t100\t98\t0.2\nGCCT;1;2;3\nCTTA 4 99 0.4\n";
        let (primers, skipped) = read_primers(Cursor::new(input)).unwrap();
        let seqs: Vec<_> = primers.iter().map(|p| p.seq.as_str()).collect();
        assert_eq!(seqs, ["ATGC", "TCGA", "CGTA", "CTTA"]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn reader_skips_lines_that_are_not_utf8() {
        let input: &[u8] = b"ATGC 50 99 0.5\n\xff\xfe garbage\nGGCC 10 5 2.0\n";
        let (primers, skipped) = read_primers(Cursor::new(input)).unwrap();
        let seqs: Vec<_> = primers.iter().map(|p| p.seq.as_str()).collect();
        assert_eq!(seqs, ["ATGC", "GGCC"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn reader_handles_crlf_and_missing_final_newline() {
        let (primers, skipped) = read_primers(Cursor::new("ATGC 50 99 0.5\r\nGGCC 10 5 2.0")).unwrap();
        assert_eq!(primers.len(), 2);
        assert_eq!(primers[1].bg_freq, 5);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn weight_is_floored_at_one() {
        assert_eq!(Primer::new("ATGC", 10, 0).weight(), 1);
        assert_eq!(Primer::new("ATGC", 10, 1400).weight(), 1400);
    }

    #[test]
    fn ratio_from_counts() {
        assert_eq!(Ratio::from_counts(10, 0), Ratio::Unbounded);
        assert_eq!(Ratio::from_counts(10, 4), Ratio::Finite(2.5));
        assert_eq!(Ratio::Unbounded.to_string(), "inf");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let primers = vec![
            Primer::new("ATGC", 1, 1),
            Primer::new("GGCC", 2, 2),
            Primer::new("ATGC", 3, 3),
        ];
        let unique = dedup_by_sequence(primers);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].fg_freq, 1);
        assert_eq!(unique[1].seq, "GGCC");
    }

    #[test]
    fn activation_orders_by_ratio_and_assigns_dense_ids() {
        let primers = vec![
            Primer::new("AAAC", 10, 10).with_id(42), // 1.0
            Primer::new("CCCA", 30, 10),             // 3.0
            Primer::new("GGGT", 5, 0),               // unbounded
            Primer::new("TTTG", 20, 10),             // 2.0
        ];
        let active = activate(primers, 0);
        let order: Vec<_> = active.iter().map(|p| (p.id, p.seq.as_str())).collect();
        assert_eq!(
            order,
            [(Some(1), "GGGT"), (Some(2), "CCCA"), (Some(3), "TTTG"), (Some(4), "AAAC")]
        );
    }

    #[test]
    fn activation_truncates_to_max_active() {
        let primers = vec![
            Primer::new("AAAC", 10, 10),
            Primer::new("CCCA", 30, 10),
            Primer::new("TTTG", 20, 10),
        ];
        let active = activate(primers, 2);
        assert_eq!(active.len(), 2);
        assert_eq!(active[1].seq, "TTTG");

        // Asking for more than available keeps everything
        let active = activate(active, 5);
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn activation_keeps_input_order_for_ties() {
        let primers = vec![Primer::new("AAAC", 1, 1), Primer::new("CCCA", 2, 2)];
        let active = activate(primers, 0);
        assert_eq!(active[0].seq, "AAAC");
        assert_eq!(active[1].id, Some(2));
    }

    #[test]
    fn load_active_primers_end_to_end() {
        let input = "ATGC 50 100 0.5\nGGCC 90 30 3.0\nbad line\nATGC 1 1 1.0\nCCTA 10 0 inf\n";
        let (active, skipped) = load_active_primers(Cursor::new(input), 0).unwrap();
        assert_eq!(skipped, 1);
        let order: Vec<_> = active.iter().map(|p| (p.id.unwrap(), p.seq.as_str(), p.weight())).collect();
        assert_eq!(order, [(1, "CCTA", 1), (2, "GGCC", 30), (3, "ATGC", 100)]);
    }
}
