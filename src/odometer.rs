//! Mixed-radix counter over coefficient vectors.
//!
//! Digits are advanced like an odometer: the last coefficient is incremented,
//! and any digit that exceeds `max_coeff` is reset to zero with a carry into
//! the next more significant digit. Starting from all zeros this visits every
//! vector in `{0..=max_coeff}^order` once, in lexicographic order.

use crate::word::Word;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    Next,
    /// The carry ran past the most significant digit.
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct Odometer<W> {
    digits: Vec<W>,
    max_coeff: W,
}

impl<W: Word> Odometer<W> {
    pub fn new(start: Vec<W>, max_coeff: W) -> Self {
        Odometer {
            digits: start,
            max_coeff,
        }
    }

    pub fn current(&self) -> &[W] {
        &self.digits
    }

    /// Step to the next vector.
    ///
    /// On [`Advance::Exhausted`] the digits are left in their overflowed state
    /// (most significant digit above `max_coeff`) so the caller can report
    /// where the barrier was hit.
    pub fn advance(&mut self) -> Advance {
        let Some(mut pos) = self.digits.len().checked_sub(1) else {
            return Advance::Exhausted;
        };
        loop {
            match self.digits[pos].checked_add(W::ONE) {
                Some(d) if d <= self.max_coeff => {
                    self.digits[pos] = d;
                    return Advance::Next;
                }
                bumped => {
                    if pos == 0 {
                        if let Some(d) = bumped {
                            self.digits[0] = d;
                        }
                        return Advance::Exhausted;
                    }
                    self.digits[pos] = W::ZERO;
                    pos -= 1;
                }
            }
        }
    }
}
