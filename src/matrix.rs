//! # Matrix: Dense Square Matrices over a Modulus
//!
//! Owned n×n matrices stored as a flattened row-major buffer, with the two
//! operations the recurrence engine needs: modular multiplication and
//! left-to-right binary exponentiation.
//!
//! The `_into` variants write into caller-owned buffers so a search worker can
//! evaluate millions of terms without allocating. `multiply` and `power` are
//! allocating conveniences used by tests and one-off evaluations.

use std::ops::{Index, IndexMut};

use crate::word::Word;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix<W> {
    n: usize,
    data: Vec<W>,
}

impl<W: Word> Matrix<W> {
    pub fn zeros(n: usize) -> Self {
        Matrix {
            n,
            data: vec![W::ZERO; n * n],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n);
        for i in 0..n {
            m[(i, i)] = W::ONE;
        }
        m
    }

    /// Build from row slices. Panics if the rows are not square.
    pub fn from_rows(rows: &[&[W]]) -> Self {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for row in rows {
            assert_eq!(row.len(), n, "matrix rows must have length {}", n);
            data.extend_from_slice(row);
        }
        Matrix { n, data }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn row(&self, i: usize) -> &[W] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [W] {
        &mut self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn copy_from(&mut self, other: &Matrix<W>) {
        assert_eq!(self.n, other.n);
        self.data.copy_from_slice(&other.data);
    }

    /// Reset to an n×n zero matrix, reusing the allocation when possible.
    pub fn reset(&mut self, n: usize) {
        self.n = n;
        self.data.clear();
        self.data.resize(n * n, W::ZERO);
    }

    pub fn multiply(&self, other: &Matrix<W>, modulus: W) -> Matrix<W> {
        let mut out = Matrix::zeros(self.n);
        multiply_into(&mut out, self, other, modulus);
        out
    }

    pub fn power(&self, exponent: W, modulus: W) -> Matrix<W> {
        let mut result = Matrix::zeros(self.n);
        let mut temp = Matrix::zeros(self.n);
        power_into(&mut result, self, exponent, &mut temp, modulus);
        result
    }
}

impl<W> Index<(usize, usize)> for Matrix<W> {
    type Output = W;

    fn index(&self, (i, j): (usize, usize)) -> &W {
        &self.data[i * self.n + j]
    }
}

impl<W> IndexMut<(usize, usize)> for Matrix<W> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut W {
        &mut self.data[i * self.n + j]
    }
}

/// `out = a * b mod modulus`. Each multiply-add is reduced immediately, so
/// the accumulator never exceeds the modulus.
pub fn multiply_into<W: Word>(out: &mut Matrix<W>, a: &Matrix<W>, b: &Matrix<W>, modulus: W) {
    let n = a.n;
    assert!(b.n == n && out.n == n, "matrix dimensions differ");
    for i in 0..n {
        let a_row = a.row(i);
        for j in 0..n {
            let mut acc = W::ZERO;
            for (k, &a_ik) in a_row.iter().enumerate() {
                acc = acc.add_mod(a_ik.mul_mod(b.data[k * n + j], modulus), modulus);
            }
            out.data[i * n + j] = acc;
        }
    }
}

/// `result = base^exponent mod modulus`, using `temp` as the squaring buffer.
///
/// Left-to-right square-and-multiply: start from `base` and walk the exponent
/// from its second-most-significant bit down to bit 0. An exponent of zero
/// yields the identity.
pub fn power_into<W: Word>(
    result: &mut Matrix<W>,
    base: &Matrix<W>,
    exponent: W,
    temp: &mut Matrix<W>,
    modulus: W,
) {
    let n = base.n;
    if exponent == W::ZERO {
        result.reset(n);
        for i in 0..n {
            result[(i, i)] = W::ONE % modulus;
        }
        return;
    }

    result.copy_from(base);
    if exponent == W::ONE {
        return;
    }

    for bit in (0..exponent.leading_bit()).rev() {
        multiply_into(temp, result, result, modulus);
        if exponent.bit(bit) {
            multiply_into(result, temp, base, modulus);
        } else {
            std::mem::swap(result, temp);
        }
    }
}
