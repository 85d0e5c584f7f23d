// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Search for coded exposure (flutter shutter) sequences.
//!
//! A code of length `n` with `k` open slots, both endpoints open, is
//! scored by the minimum magnitude of the DFT of `code / k` padded with
//! `objectwidth` zeros. Small spaces are enumerated in full; large ones
//! are handed to an external random search whose result table is read
//! back.
//!
//! # Invariants
//!
//! 1. **Every candidate is admissible**: length `n`, weight `k`, first
//!    and last slot open. A generated candidate breaking this, or an
//!    enumeration whose size differs from `C(n-2, k-2)`, aborts the run
//!    with `FlutterError::Consistency`.
//!
//! 2. **Strict improvement, first seen wins**: the running best is only
//!    replaced by a strictly better score. The parallel scan breaks ties
//!    by enumeration index and returns the same code as the sequential
//!    one.
//!
//! 3. **Objectives are pure**: a score depends only on the code and the
//!    padding, never on evaluation order.
//!
//! 4. **No partial results**: any failure (evaluator, external process,
//!    result table) ends the run with an error.

pub mod archive;
pub mod delegate;
pub mod generator;
pub mod objective;
pub mod search;

pub use delegate::{
    ExternalRunner, FsResultReader, InMemoryResults, ProcessRunner, RandomSearchParams,
    RandomSearchRunner, ResultFile, ResultReader,
};
pub use generator::{binomial, palindrome_count, CandidateGenerator};
pub use objective::{
    build_evaluator, EstimationVariance, Evaluator, SpectralFlatness, SpectralMinimum,
};
pub use search::{search, CodeSearch, SearchStrategy};
