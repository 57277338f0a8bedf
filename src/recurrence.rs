//! # Recurrence: Companion-Matrix Model of a C-Finite Sequence
//!
//! An order-n recurrence `a(k) = c[0]·a(k-1) + c[1]·a(k-2) + ... + c[n-1]·a(k-n)`
//! is represented by its companion matrix (row 0 holds the coefficients, rows
//! 1..n form a shifted identity) and its first n terms.
//!
//! Initial terms are not supplied by the caller: they are the power sums of the
//! characteristic polynomial's roots, derived with Newton's identities. For the
//! coefficients `[0, 1, 1]` this yields the Perrin sequence 3, 0, 2, 3, 2, 5, ...
//!
//! ## Term Evaluation
//!
//! `term(k, m)` raises the companion matrix to `k - n + 1` modulo `m` and dots
//! its top row with the reversed initial terms: O(n³ log k) per term. The
//! matrices used for this are held in a [`Scratch`] owned by the caller.

use anyhow::{anyhow, bail, Result};

use crate::matrix::{power_into, Matrix};
use crate::word::Word;

/// Reusable `result`/`temp` buffers for term evaluation.
#[derive(Debug)]
pub struct Scratch<W> {
    result: Matrix<W>,
    temp: Matrix<W>,
}

impl<W: Word> Scratch<W> {
    pub fn new(order: usize) -> Self {
        Scratch {
            result: Matrix::zeros(order),
            temp: Matrix::zeros(order),
        }
    }

    fn fit(&mut self, order: usize) {
        if self.result.dim() != order {
            self.result.reset(order);
            self.temp.reset(order);
        }
    }
}

#[derive(Clone, Debug)]
pub struct Recurrence<W> {
    coefficients: Vec<W>,
    companion: Matrix<W>,
    initial_terms: Vec<W>,
}

impl<W: Word> Recurrence<W> {
    /// An order-n recurrence with all coefficients zero, ready for
    /// [`set_coefficients`](Self::set_coefficients).
    pub fn with_order(order: usize) -> Result<Self> {
        if order == 0 {
            bail!("recurrence order must be positive");
        }
        let mut companion = Matrix::zeros(order);
        for i in 1..order {
            companion[(i, i - 1)] = W::ONE;
        }
        let mut initial_terms = vec![W::ZERO; order];
        initial_terms[0] = W::from_u64(order as u64);
        Ok(Recurrence {
            coefficients: vec![W::ZERO; order],
            companion,
            initial_terms,
        })
    }

    pub fn new(coefficients: &[W]) -> Result<Self> {
        let mut rec = Self::with_order(coefficients.len())?;
        rec.set_coefficients(coefficients)?;
        Ok(rec)
    }

    /// Re-populate the companion row and initial terms in place.
    ///
    /// On error the recurrence is left unchanged.
    pub fn set_coefficients(&mut self, coefficients: &[W]) -> Result<()> {
        if coefficients.len() != self.order() {
            bail!(
                "expected {} coefficients, got {}",
                self.order(),
                coefficients.len()
            );
        }
        let inits = newton_initial_terms(coefficients)?;
        self.coefficients.copy_from_slice(coefficients);
        self.companion.row_mut(0).copy_from_slice(coefficients);
        self.initial_terms = inits;
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[W] {
        &self.coefficients
    }

    pub fn companion(&self) -> &Matrix<W> {
        &self.companion
    }

    pub fn initial_terms(&self) -> &[W] {
        &self.initial_terms
    }

    /// The `index`-th term modulo `modulus`.
    ///
    /// Indices below the order return the stored initial term without
    /// reduction. `modulus` must be at least 1.
    pub fn term(&self, index: W, modulus: W, scratch: &mut Scratch<W>) -> W {
        let order = W::from_u64(self.order() as u64);
        if index < order {
            return self.initial_terms[index.to_u128() as usize];
        }

        scratch.fit(self.order());
        let Scratch { result, temp } = scratch;
        power_into(result, &self.companion, index - order + W::ONE, temp, modulus);

        let n = self.order();
        result
            .row(0)
            .iter()
            .enumerate()
            .fold(W::ZERO, |acc, (i, &coeff)| {
                let init = self.initial_terms[n - 1 - i] % modulus;
                acc.add_mod(coeff.mul_mod(init, modulus), modulus)
            })
    }

    /// Whether `index` satisfies `term(index) ≡ c[0] (mod index)`, the
    /// congruence every prime satisfies.
    pub fn satisfies_congruence(&self, index: W, scratch: &mut Scratch<W>) -> bool {
        self.term(index, index, scratch) == self.coefficients[0] % index
    }
}

/// Power sums of the characteristic roots: `inits[0] = n` and, for k ≥ 1,
/// `inits[k] = k·c[k-1] + Σ_{i=1}^{k-1} c[k-i-1]·inits[i]`.
///
/// Computed without modular reduction; fails if a value exceeds the word width.
pub fn newton_initial_terms<W: Word>(coefficients: &[W]) -> Result<Vec<W>> {
    let n = coefficients.len();
    if n == 0 {
        bail!("recurrence order must be positive");
    }
    let overflow = || {
        anyhow!(
            "initial terms for {:?} exceed {}-bit words",
            coefficients,
            W::BITS
        )
    };

    let mut inits = Vec::with_capacity(n);
    inits.push(W::from_u64(n as u64));
    for k in 1..n {
        let mut sum = W::from_u64(k as u64)
            .checked_mul(coefficients[k - 1])
            .ok_or_else(overflow)?;
        for i in 1..k {
            let product = coefficients[k - i - 1]
                .checked_mul(inits[i])
                .ok_or_else(overflow)?;
            sum = sum.checked_add(product).ok_or_else(overflow)?;
        }
        inits.push(sum);
    }
    Ok(inits)
}
