//! Lock mode compatibility/conversion matrices (spec.md §4.6).
//!
//! Grounded on the teacher's two-mode (`Lock::{SLock, XLock}`)
//! `concurrent_status.rs`, generalized to the full five-mode set the
//! spec requires so `U`/`SIX` conversions and the Upgrader Positioning
//! Rule have somewhere to live.

use std::cmp::Ordering;

/// `{NULL, S, U, X, SIX}`, ordered so `NULL < S < U < SIX < X` matches
/// "X dominates all" (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    Null,
    S,
    U,
    Six,
    X,
}

const ORDER: [LockMode; 5] = [LockMode::Null, LockMode::S, LockMode::U, LockMode::Six, LockMode::X];

fn idx(m: LockMode) -> usize {
    ORDER.iter().position(|x| *x == m).unwrap()
}

/// `Comp[a][b]`: whether a holder/waiter in mode `a` is compatible with a
/// request in mode `b` (symmetric).
const COMP: [[bool; 5]; 5] = {
    // rows/cols: NULL, S, U, Six, X
    [
        [true, true, true, true, true],   // NULL
        [true, true, true, true, false],  // S
        [true, true, false, false, false],// U
        [true, true, false, false, false],// Six
        [true, false, false, false, false],// X
    ]
};

/// `Conv[a][b]`: the mode that results from holding `a` and granting `b`
/// to the same holder (also used to reduce a holder set's "group mode").
const CONV: [[LockMode; 5]; 5] = [
    [LockMode::Null, LockMode::S, LockMode::U, LockMode::Six, LockMode::X],
    [LockMode::S, LockMode::S, LockMode::U, LockMode::Six, LockMode::X],
    [LockMode::U, LockMode::U, LockMode::U, LockMode::Six, LockMode::X],
    [LockMode::Six, LockMode::Six, LockMode::Six, LockMode::Six, LockMode::X],
    [LockMode::X, LockMode::X, LockMode::X, LockMode::X, LockMode::X],
];

/// Symmetric compatibility check.
pub fn compatible(a: LockMode, b: LockMode) -> bool {
    COMP[idx(a)][idx(b)]
}

/// Conversion: the resulting mode when a holder already at `held` is
/// additionally granted `requested` (idempotent: `conv(a, a) == a`).
pub fn conv(held: LockMode, requested: LockMode) -> LockMode {
    CONV[idx(held)][idx(requested)]
}

/// Reduce a set of granted modes into the resource's "group mode"
/// (spec.md §4.6 step 4: `new_group_mode = reduce(Conv, ...)`).
pub fn reduce_group_mode(modes: impl IntoIterator<Item = LockMode>) -> LockMode {
    modes.into_iter().fold(LockMode::Null, conv)
}

impl LockMode {
    pub fn dominates(self, other: LockMode) -> bool {
        idx(self).cmp(&idx(other)) != Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_is_symmetric() {
        for &a in ORDER.iter() {
            for &b in ORDER.iter() {
                assert_eq!(compatible(a, b), compatible(b, a), "{:?} {:?}", a, b);
            }
        }
    }

    #[test]
    fn self_conversion_is_idempotent() {
        for &a in ORDER.iter() {
            assert_eq!(conv(a, a), a);
        }
    }

    #[test]
    fn x_dominates_all() {
        for &a in ORDER.iter() {
            assert!(LockMode::X.dominates(a));
            if a != LockMode::X {
                assert!(compatible(LockMode::X, a) == (a == LockMode::Null));
            }
        }
    }

    #[test]
    fn u_blocks_u() {
        assert!(!compatible(LockMode::U, LockMode::U));
    }
}
