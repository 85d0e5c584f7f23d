// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Exposure codes, search configuration, score types, and the error
//! hierarchy shared by the flutter shutter code search.

pub mod code;
pub mod config;
pub mod error;
pub mod score;

pub use code::Code;
pub use config::{ObjectiveKind, SearchConfig};
pub use error::{FlutterError, FlutterResult};
pub use score::{Direction, ProgressRecord, SearchOutcome, StrategyKind};
