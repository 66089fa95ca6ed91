//! Waiting-tile solver.
//!
//! The server's login challenge is a single-suit hand encoded as a
//! digit string of tile ranks 1–9. The answer is every rank that, if
//! drawn, completes the hand into full groups — each a run of three
//! consecutive ranks or a triplet — plus exactly one pair.
//!
//! The search is exhaustive backtracking over rank counts, always
//! working on the lowest rank that still has tiles: that rank must
//! start a run, form a triplet, or be reserved as the pair, so the
//! branching factor stays tiny and the depth is bounded by the group
//! count. Worst-case cost is small and constant.

use std::fmt::Write as _;

/// Counts per rank; index 0 is unused so rank `r` lives at `counts[r]`.
type Counts = [u8; 10];

/// Ways a challenge string can be malformed.
///
/// The login path treats any of these as "send an empty answer" — a
/// bad challenge must not take the session down.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SolverError {
    /// A character outside `1`..=`9`.
    #[error("invalid tile {0:?} in hand")]
    InvalidTile(char),

    /// More than four copies of one rank.
    #[error("more than four tiles of rank {0}")]
    TooManyOfRank(u8),

    /// A hand must hold 3n+1 tiles to be one tile short of complete.
    #[error("hand of {0} tiles cannot be waiting")]
    BadHandSize(usize),
}

/// Computes the set of ranks that complete the hand, ascending and
/// duplicate-free. An empty result means the hand waits on nothing.
pub fn solve(hand: &str) -> Result<Vec<u8>, SolverError> {
    let mut counts = parse_hand(hand)?;

    let mut waits = Vec::new();
    for rank in 1..=9u8 {
        // A fifth copy of a rank cannot exist in the tileset.
        if counts[rank as usize] >= 4 {
            continue;
        }
        counts[rank as usize] += 1;
        if decompose(&mut counts, false) {
            waits.push(rank);
        }
        counts[rank as usize] -= 1;
    }
    Ok(waits)
}

/// Like [`solve`], but formatted as the digit string the login answer
/// field expects; malformed or unsolvable hands become the empty
/// string.
pub fn solve_answer(hand: &str) -> String {
    let mut answer = String::new();
    if let Ok(waits) = solve(hand) {
        for rank in waits {
            let _ = write!(answer, "{rank}");
        }
    }
    answer
}

fn parse_hand(hand: &str) -> Result<Counts, SolverError> {
    let mut counts = [0u8; 10];
    for ch in hand.chars() {
        let rank = ch
            .to_digit(10)
            .filter(|d| (1..=9).contains(d))
            .ok_or(SolverError::InvalidTile(ch))? as usize;
        counts[rank] += 1;
        if counts[rank] > 4 {
            return Err(SolverError::TooManyOfRank(rank as u8));
        }
    }
    if hand.len() % 3 != 1 {
        return Err(SolverError::BadHandSize(hand.len()));
    }
    Ok(counts)
}

/// Consumes the hand from the lowest occupied rank upward. That rank
/// can only start a run, form a triplet, or sit reserved as the pair;
/// a reservation is confirmed only when the rest of the hand empties,
/// so at most one pair ever survives.
fn decompose(counts: &mut Counts, pair_taken: bool) -> bool {
    let Some(rank) = (1..=9).find(|&r| counts[r] > 0) else {
        return pair_taken;
    };

    // Run starting here. A run containing this rank that starts lower
    // would need an already-consumed tile, so no other start matters.
    if rank <= 7 && counts[rank + 1] > 0 && counts[rank + 2] > 0 {
        for r in rank..rank + 3 {
            counts[r] -= 1;
        }
        let ok = decompose(counts, pair_taken);
        for r in rank..rank + 3 {
            counts[r] += 1;
        }
        if ok {
            return true;
        }
    }

    // Triplet of this rank.
    if counts[rank] >= 3 {
        counts[rank] -= 3;
        let ok = decompose(counts, pair_taken);
        counts[rank] += 3;
        if ok {
            return true;
        }
    }

    // Reserve this rank as the pair.
    if !pair_taken && counts[rank] >= 2 {
        counts[rank] -= 2;
        let ok = decompose(counts, true);
        counts[rank] += 2;
        if ok {
            return true;
        }
    }

    false
}
