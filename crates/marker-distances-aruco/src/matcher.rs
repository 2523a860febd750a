//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that: `observed_code == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

/// Matcher for a fixed dictionary.
///
/// Every id is tried in all four orientations; the first exact hit wins.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    /// `oriented[4 * id + rotation]`
    oriented: Vec<u64>,
}

impl Matcher {
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let oriented = dict
            .codes
            .iter()
            .flat_map(|&code| (0..4u8).map(move |rot| rotate_code_u64(code, n, rot)))
            .collect();

        Self {
            dict,
            max_hamming,
            oriented,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest id/orientation within `max_hamming`. Ties keep the lowest
    /// id, then the lowest rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (slot, &cand) in self.oriented.iter().enumerate() {
            let hamming = (observed ^ cand).count_ones();
            if hamming > u32::from(self.max_hamming)
                || best.is_some_and(|b| u32::from(b.hamming) <= hamming)
            {
                continue;
            }
            best = Some(Match {
                id: (slot / 4) as u32,
                rotation: (slot % 4) as u8,
                hamming: hamming as u8,
            });
            if hamming == 0 {
                break;
            }
        }

        best
    }
}

/// Rotate a row-major code (`bit = y * n + x`) by `rot` quarter turns.
///
/// One quarter turn maps output cell `(x, y)` to input cell `(y, n - 1 - x)`.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    (0..rot & 3).fold(code, |c, _| quarter_turn(c, n))
}

fn quarter_turn(code: u64, n: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let bit = (code >> (n * (n - 1 - x) + y)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}
