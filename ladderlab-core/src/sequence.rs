//! Weighting sequences used to shape ladder allocations.
//!
//! Every sequence is strictly positive, so any prefix can be used as a set of
//! proportional weights by the distributor.

use crate::error::LadderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest sequence the generator will produce.
///
/// The Fibonacci-like recurrence stays exactly representable in f64 well past this.
pub const MAX_SEQUENCE_DEPTH: usize = 64;

/// Constant weight used by [`SequenceKind::Equal`].
const EQUAL_WEIGHT: f64 = 5.0;

const LOG_BASE: f64 = 0.69;
const LOG_STEP: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    /// `1, 2, 3, 5, 8, ...`; each term is the sum of the previous two.
    Fibonacci,
    /// `1, 2, 3, ..., depth`
    Arithmetic,
    /// Constant weight.
    Equal,
    /// `0.69 + 0.2·i`
    Logarithmic,
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 4] = [
        SequenceKind::Fibonacci,
        SequenceKind::Arithmetic,
        SequenceKind::Equal,
        SequenceKind::Logarithmic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SequenceKind::Fibonacci => "fibonacci",
            SequenceKind::Arithmetic => "arithmetic",
            SequenceKind::Equal => "equal",
            SequenceKind::Logarithmic => "logarithmic",
        }
    }

    pub fn generate(self, depth: usize) -> Result<Vec<f64>, LadderError> {
        generate(self, depth)
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SequenceKind {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SequenceKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                LadderError::invalid(
                    "sequence",
                    format!("unknown kind '{s}' (fibonacci, arithmetic, equal, logarithmic)"),
                )
            })
    }
}

/// Generate `depth` weights of the given kind.
pub fn generate(kind: SequenceKind, depth: usize) -> Result<Vec<f64>, LadderError> {
    if depth == 0 {
        return Err(LadderError::invalid("depth", "must be at least 1"));
    }
    if depth > MAX_SEQUENCE_DEPTH {
        return Err(LadderError::invalid(
            "depth",
            format!("{depth} exceeds the supported maximum of {MAX_SEQUENCE_DEPTH}"),
        ));
    }

    let seq = match kind {
        SequenceKind::Fibonacci => fibonacci(depth),
        SequenceKind::Arithmetic => (1..=depth).map(|i| i as f64).collect(),
        SequenceKind::Equal => vec![EQUAL_WEIGHT; depth],
        SequenceKind::Logarithmic => (0..depth)
            .map(|i| LOG_BASE + LOG_STEP * i as f64)
            .collect(),
    };
    Ok(seq)
}

fn fibonacci(depth: usize) -> Vec<f64> {
    let mut terms: Vec<u64> = vec![1, 2];
    while terms.len() < depth {
        let n = terms.len();
        terms.push(terms[n - 1] + terms[n - 2]);
    }
    terms.truncate(depth);
    terms.into_iter().map(|t| t as f64).collect()
}
