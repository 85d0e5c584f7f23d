// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Exposure Code
// ─────────────────────────────────────────────────────────────────────
//! Binary shutter sequence with both endpoints open.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlutterError, FlutterResult};

/// Open/closed shutter state per exposure slot.
///
/// Invariants: length >= 2, every bit is 0 or 1, first and last bit are 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code {
    bits: Vec<u8>,
    weight: usize,
}

impl Code {
    /// Build a code from raw bits, checking the endpoint invariant.
    pub fn from_bits(bits: Vec<u8>) -> FlutterResult<Self> {
        if bits.len() < 2 {
            return Err(FlutterError::Validation(format!(
                "code length must be >= 2, got {}",
                bits.len()
            )));
        }
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(FlutterError::Validation(format!(
                "code bit {pos} is {}, expected 0 or 1",
                bits[pos]
            )));
        }
        if bits[0] != 1 || bits[bits.len() - 1] != 1 {
            return Err(FlutterError::Validation(format!(
                "code endpoints must be open, got {}",
                render(&bits)
            )));
        }
        let weight = bits.iter().filter(|&&b| b == 1).count();
        Ok(Self { bits, weight })
    }

    /// Build a length-`n` code from 0-indexed interior positions (each in `1..n-1`).
    pub fn from_interior(n: usize, interior: &[usize]) -> FlutterResult<Self> {
        if n < 2 {
            return Err(FlutterError::Validation(format!(
                "code length must be >= 2, got {n}"
            )));
        }
        let mut bits = vec![0u8; n];
        bits[0] = 1;
        bits[n - 1] = 1;
        for &pos in interior {
            if pos == 0 || pos >= n - 1 {
                return Err(FlutterError::Validation(format!(
                    "interior position {pos} outside 1..{}",
                    n - 1
                )));
            }
            bits[pos] = 1;
        }
        Self::from_bits(bits)
    }

    /// Parse a digit string such as `"10011"`.
    pub fn parse(digits: &str) -> FlutterResult<Self> {
        let bits = digits
            .trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(0u8),
                '1' => Ok(1u8),
                other => Err(FlutterError::Validation(format!(
                    "invalid code digit {other:?} in {digits:?}"
                ))),
            })
            .collect::<FlutterResult<Vec<u8>>>()?;
        Self::from_bits(bits)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of open slots.
    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Check the code against an expected length and weight.
    pub fn check(&self, n: usize, k: usize) -> FlutterResult<()> {
        if self.len() != n || self.weight != k {
            return Err(FlutterError::Validation(format!(
                "expected length {n} weight {k}, got length {} weight {} ({self})",
                self.len(),
                self.weight
            )));
        }
        Ok(())
    }

    /// Exposure profile: each bit divided by the weight, summing to 1.
    pub fn normalized(&self) -> Vec<f64> {
        let w = self.weight as f64;
        self.bits.iter().map(|&b| f64::from(b) / w).collect()
    }

    /// Digit rendering, e.g. `"11001"`.
    pub fn to_digit_string(&self) -> String {
        render(&self.bits)
    }
}

fn render(bits: &[u8]) -> String {
    bits.iter().map(|&b| char::from(b'0' + b.min(9))).collect()
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_digit_string())
    }
}

impl TryFrom<String> for Code {
    type Error = FlutterError;

    fn try_from(value: String) -> FlutterResult<Self> {
        Self::parse(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_digit_string()
    }
}
