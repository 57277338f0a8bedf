//! # Word: Fixed-Width Integers for Matrix Entries and Term Values
//!
//! The recurrence engine is generic over a machine word: `u64` by default,
//! `u128` when the CLI is run with `--wide`. Every modular operation reduces
//! after each multiply or add, so results stay exact for any modulus the
//! width can represent.
//!
//! ## Reduction Strategy
//!
//! - `u64`: products are formed in `u128` and reduced.
//! - `u128`: when both operands have at most 128 significant bits combined the
//!   product is formed directly; otherwise a double-and-add loop keeps every
//!   intermediate below the modulus.

use std::fmt::{Debug, Display};
use std::ops::{Add, Rem, Sub};
use std::str::FromStr;

/// An unsigned machine word usable as a matrix entry and modulus.
pub trait Word:
    Copy
    + Ord
    + Default
    + Debug
    + Display
    + FromStr
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Rem<Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const BITS: u32;

    fn from_u64(v: u64) -> Self;

    /// Narrow a `u128` into this width, `None` if it does not fit.
    fn try_from_u128(v: u128) -> Option<Self>;

    fn to_u128(self) -> u128;

    fn checked_add(self, rhs: Self) -> Option<Self>;

    fn checked_mul(self, rhs: Self) -> Option<Self>;

    /// `(self + rhs) mod m` for `self, rhs < m`.
    fn add_mod(self, rhs: Self, m: Self) -> Self;

    /// `(self * rhs) mod m` without overflow, for any operands.
    fn mul_mod(self, rhs: Self, m: Self) -> Self;

    /// Whether bit `i` (0 = least significant) is set.
    fn bit(self, i: u32) -> bool;

    /// Index of the most significant set bit. Undefined for zero.
    fn leading_bit(self) -> u32 {
        Self::BITS - 1 - self.leading_zeros()
    }

    fn leading_zeros(self) -> u32;
}

impl Word for u64 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const BITS: u32 = u64::BITS;

    fn from_u64(v: u64) -> Self {
        v
    }

    fn try_from_u128(v: u128) -> Option<Self> {
        u64::try_from(v).ok()
    }

    fn to_u128(self) -> u128 {
        self as u128
    }

    fn checked_add(self, rhs: Self) -> Option<Self> {
        u64::checked_add(self, rhs)
    }

    fn checked_mul(self, rhs: Self) -> Option<Self> {
        u64::checked_mul(self, rhs)
    }

    fn add_mod(self, rhs: Self, m: Self) -> Self {
        ((self as u128 + rhs as u128) % m as u128) as u64
    }

    fn mul_mod(self, rhs: Self, m: Self) -> Self {
        (self as u128 * rhs as u128 % m as u128) as u64
    }

    fn bit(self, i: u32) -> bool {
        (self >> i) & 1 == 1
    }

    fn leading_zeros(self) -> u32 {
        u64::leading_zeros(self)
    }
}

impl Word for u128 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const BITS: u32 = u128::BITS;

    fn from_u64(v: u64) -> Self {
        v as u128
    }

    fn try_from_u128(v: u128) -> Option<Self> {
        Some(v)
    }

    fn to_u128(self) -> u128 {
        self
    }

    fn checked_add(self, rhs: Self) -> Option<Self> {
        u128::checked_add(self, rhs)
    }

    fn checked_mul(self, rhs: Self) -> Option<Self> {
        u128::checked_mul(self, rhs)
    }

    fn add_mod(self, rhs: Self, m: Self) -> Self {
        let (sum, overflowed) = self.overflowing_add(rhs);
        if overflowed || sum >= m {
            sum.wrapping_sub(m)
        } else {
            sum
        }
    }

    fn mul_mod(self, rhs: Self, m: Self) -> Self {
        let mut a = self % m;
        let mut b = rhs % m;
        if u128::leading_zeros(a) + u128::leading_zeros(b) >= 128 {
            return a * b % m;
        }
        let mut result = 0u128;
        while b > 0 {
            if b & 1 == 1 {
                result = result.add_mod(a, m);
            }
            a = a.add_mod(a, m);
            b >>= 1;
        }
        result
    }

    fn bit(self, i: u32) -> bool {
        (self >> i) & 1 == 1
    }

    fn leading_zeros(self) -> u32 {
        u128::leading_zeros(self)
    }
}
