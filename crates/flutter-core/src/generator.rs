// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Candidate Generator
// ─────────────────────────────────────────────────────────────────────
//! Exhaustive enumeration of codes with fixed open endpoints.
//!
//! A code of length `n` and weight `k` is fully described by the `k-2`
//! open slots among the interior positions `1..n-1` (0-indexed), so the
//! candidate space is the set of `(k-2)`-combinations of `n-2` slots,
//! `C(n-2, k-2)` codes in lexicographic order.
//!
//! Reversing a code leaves every objective unchanged, so the generator
//! can optionally keep one code per reversal pair: a selection is
//! skipped when its mirror image comes earlier in the enumeration.
//! Palindromes are their own mirror and are always kept.

use flutter_types::{Code, FlutterError, FlutterResult};

/// Binomial coefficient `C(n, r)`, saturating at `u64::MAX`.
pub fn binomial(n: u64, r: u64) -> u64 {
    if r > n {
        return 0;
    }
    let r = r.min(n - r);
    let mut acc: u128 = 1;
    for i in 0..r {
        // acc * (n - i) is always divisible by (i + 1)
        acc = acc * u128::from(n - i) / u128::from(i + 1);
        if acc > u128::from(u64::MAX) {
            return u64::MAX;
        }
    }
    acc as u64
}

/// Lexicographic `r`-combinations of `0..m`.
///
/// `r = 0` yields exactly one empty selection.
#[derive(Debug, Clone)]
pub struct Combinations {
    m: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(m: usize, r: usize) -> Self {
        Self {
            m,
            indices: (0..r).collect(),
            started: false,
            done: r > m,
        }
    }

    fn advance(&mut self) -> bool {
        let r = self.indices.len();
        let Some(i) = (0..r).rev().find(|&i| self.indices[i] != i + self.m - r) else {
            return false;
        };
        self.indices[i] += 1;
        for j in (i + 1)..r {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        true
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started && !self.advance() {
            self.done = true;
            return None;
        }
        self.started = true;
        Some(self.indices.clone())
    }
}

/// Number of palindromic `r`-subsets of `m` slots.
///
/// Slots pair up around the centre; an odd `m` leaves a middle slot that
/// is open exactly when `r` is odd.
pub fn palindrome_count(m: u64, r: u64) -> u64 {
    if m % 2 == 0 && r % 2 == 1 {
        return 0;
    }
    binomial(m / 2, r / 2)
}

/// Enumerates every admissible code for a given `(n, k)`.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator {
    n: usize,
    k: usize,
    skip_reversals: bool,
}

impl CandidateGenerator {
    pub fn new(n: usize, k: usize) -> FlutterResult<Self> {
        if n < 2 || k < 2 || k > n {
            return Err(FlutterError::Validation(format!(
                "need n >= 2 and 2 <= k <= n, got n={n} k={k}"
            )));
        }
        Ok(Self {
            n,
            k,
            skip_reversals: false,
        })
    }

    /// Keep only one code of each reversal pair.
    pub fn skip_reversals(mut self, skip_reversals: bool) -> Self {
        self.skip_reversals = skip_reversals;
        self
    }

    pub fn skips_reversals(&self) -> bool {
        self.skip_reversals
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// True when `(n, k)` admits a single code (k = 2 or k = n).
    pub fn is_unique(&self) -> bool {
        self.k == 2 || self.k == self.n
    }

    /// Size of the full space, `C(n-2, k-2)`.
    pub fn full_count(&self) -> u64 {
        binomial((self.n - 2) as u64, (self.k - 2) as u64)
    }

    /// Number of codes that equal their own reversal.
    pub fn palindrome_count(&self) -> u64 {
        palindrome_count((self.n - 2) as u64, (self.k - 2) as u64)
    }

    /// Number of candidates `candidates()` yields: `C(n-2, k-2)`, or
    /// `(C(n-2, k-2) + palindromes) / 2` when reversals are skipped.
    pub fn expected_count(&self) -> u64 {
        if self.skip_reversals {
            self.full_count().saturating_add(self.palindrome_count()) / 2
        } else {
            self.full_count()
        }
    }

    /// Lazily build every candidate in lexicographic order of open slots.
    pub fn candidates(&self) -> Candidates {
        Candidates {
            n: self.n,
            k: self.k,
            skip_reversals: self.skip_reversals,
            inner: Combinations::new(self.n - 2, self.k - 2),
        }
    }

    /// Collect all candidates, checking the count against `expected_count`.
    pub fn enumerate(&self) -> FlutterResult<Vec<Code>> {
        let codes = self.candidates().collect::<FlutterResult<Vec<Code>>>()?;
        verify_count(codes.len() as u64, self.expected_count())?;
        Ok(codes)
    }
}

/// Iterator over the candidate codes of one `(n, k)` pair.
#[derive(Debug, Clone)]
pub struct Candidates {
    n: usize,
    k: usize,
    skip_reversals: bool,
    inner: Combinations,
}

/// True if the mirrored selection does not come before `selection`.
fn precedes_mirror(selection: &[usize], m: usize) -> bool {
    selection
        .iter()
        .copied()
        .le(selection.iter().rev().map(|&i| m - 1 - i))
}

impl Iterator for Candidates {
    type Item = FlutterResult<Code>;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.n - 2;
        let selection = if self.skip_reversals {
            self.inner.find(|s| precedes_mirror(s, m))?
        } else {
            self.inner.next()?
        };
        let interior: Vec<usize> = selection.iter().map(|&i| i + 1).collect();
        Some(
            Code::from_interior(self.n, &interior)
                .map_err(|e| FlutterError::Consistency(format!("generated invalid code: {e}")))
                .and_then(|code| {
                    if code.weight() == self.k {
                        Ok(code)
                    } else {
                        Err(FlutterError::Consistency(format!(
                            "generated code {code} has weight {}, expected {}",
                            code.weight(),
                            self.k
                        )))
                    }
                }),
        )
    }
}

/// Fail if an enumeration produced anything other than the expected count.
pub fn verify_count(seen: u64, expected: u64) -> FlutterResult<()> {
    if seen != expected {
        return Err(FlutterError::Consistency(format!(
            "enumerated {seen} candidates, expected {expected}"
        )));
    }
    Ok(())
}
