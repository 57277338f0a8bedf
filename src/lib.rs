pub mod checker;
pub mod checkpoint;
pub mod finder;
pub mod matrix;
pub mod odometer;
pub mod params;
pub mod progress;
pub mod recurrence;
pub mod report;
pub mod word;

use rug::integer::IsPrime;
use rug::Integer;

/// Miller-Rabin rounds used when no `--mr-rounds` is given.
pub const DEFAULT_MR_ROUNDS: u32 = 25;

/// Primality oracle consulted once an index satisfies the recurrence congruence.
/// Search drivers accept `&dyn PrimalityOracle` so tests can substitute a
/// deterministic table.
pub trait PrimalityOracle: Send + Sync {
    fn is_probably_prime(&self, n: u128) -> bool;
}

/// GMP-backed oracle: small-prime trial division, then screened Miller-Rabin.
#[derive(Clone, Copy, Debug)]
pub struct RugOracle {
    pub mr_rounds: u32,
}

impl Default for RugOracle {
    fn default() -> Self {
        RugOracle {
            mr_rounds: DEFAULT_MR_ROUNDS,
        }
    }
}

impl PrimalityOracle for RugOracle {
    fn is_probably_prime(&self, n: u128) -> bool {
        let n = Integer::from(n);
        if has_small_factor(&n) {
            return false;
        }
        mr_screened_test(&n, self.mr_rounds) != IsPrime::No
    }
}

/// Small primes for trial division pre-filter.
const SMALL_PRIMES: [u32; 64] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311,
];

/// Returns true if n is definitely composite because it has a small factor.
pub fn has_small_factor(n: &Integer) -> bool {
    for &p in &SMALL_PRIMES {
        if n.is_divisible_u(p) {
            return n > &Integer::from(p);
        }
    }
    false
}

/// Two fast Miller-Rabin rounds first; the full round count only for survivors.
pub fn mr_screened_test(candidate: &Integer, mr_rounds: u32) -> IsPrime {
    if mr_rounds > 2 && candidate.is_probably_prime(2) == IsPrime::No {
        return IsPrime::No;
    }
    candidate.is_probably_prime(mr_rounds)
}
