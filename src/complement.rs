// src/complement.rs
// CORE LOGIC: Watson-Crick complementarity between two primers.
// Predicts heterodimer formation by sliding the reverse of one primer along the other
// and measuring the longest run of consecutively paired bases (A-T, C-G).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A, C, G, T,
}

impl Base {
    pub fn to_byte(self) -> u8 {
        match self {
            Base::A => b'A', Base::C => b'C', Base::G => b'G', Base::T => b'T',
        }
    }

    /// Uppercase ACGT only. Anything else (lowercase, N, padding) has no base.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'A' => Some(Base::A), b'C' => Some(Base::C),
            b'G' => Some(Base::G), b'T' => Some(Base::T),
            _ => None,
        }
    }

    pub fn complement(self) -> Base {
        match self {
            Base::A => Base::T, Base::T => Base::A,
            Base::C => Base::G, Base::G => Base::C,
        }
    }
}

/// True when `a` pairs with `b`. Bytes outside ACGT never pair with anything.
#[inline]
fn pairs_with(a: u8, b: u8) -> bool {
    match (Base::from_byte(a), Base::from_byte(b)) {
        (Some(x), Some(y)) => x.complement() == y,
        _ => false,
    }
}

/// Maximum number of consecutively complementary bases between two primers.
///
/// ALGORITHM:
/// 1. The longer sequence is held fixed (ties: `seq1` is treated as the longer one).
/// 2. The shorter sequence is reversed (not complemented, pairing is tested per position).
/// 3. For every offset `0..len(longer)` the reversed shorter sequence is laid against
///    `longer[offset..]`. Positions that run past the tail of `longer` never pair.
/// 4. The longest contiguous run of paired positions over all offsets is returned.
///
/// The result is symmetric in its arguments and bounded by `min(len(seq1), len(seq2))`.
/// Complexity: O(len(longer) * len(shorter)).
pub fn max_consecutive_binding(seq1: &str, seq2: &str) -> usize {
    let (longer, shorter) = if seq2.len() > seq1.len() {
        (seq2.as_bytes(), seq1.as_bytes())
    } else {
        (seq1.as_bytes(), seq2.as_bytes())
    };

    let reversed: Vec<u8> = shorter.iter().rev().copied().collect();

    let mut max_bind = 0;
    for offset in 0..longer.len() {
        let mut consecutive = 0;
        for (x, &base) in reversed.iter().enumerate() {
            // Past the tail of `longer` acts as the no-match sentinel
            let paired = longer.get(offset + x).map_or(false, |&l| pairs_with(l, base));
            if paired {
                consecutive += 1;
                if consecutive > max_bind {
                    max_bind = consecutive;
                }
            } else {
                consecutive = 0;
            }
        }
    }
    max_bind
}

/// Reverse complement of a primer. Returns None if the sequence contains non-ACGT characters.
pub fn reverse_complement(seq: &str) -> Option<String> {
    seq.bytes()
        .rev()
        .map(|b| Base::from_byte(b).map(|base| base.complement().to_byte() as char))
        .collect()
}
