// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Objective Evaluators
// ─────────────────────────────────────────────────────────────────────
//! Scoring functions for candidate codes.
//!
//! Every evaluator is a pure function of `(code, objectwidth)`: it is
//! built once per run (FFT plan included) and then only read, so one
//! instance can be shared across threads.
//!
//! - `SpectralMinimum`: min |DFT(code / k ++ zeros)|, higher is better.
//! - `SpectralFlatness`: the same minimum minus the variance of the
//!   complex spectrum, higher is better.
//! - `EstimationVariance`: sqrt(mean(diag((AᵗA)⁻¹))) for the motion blur
//!   matrix A, lower is better.

use std::sync::Arc;

use nalgebra::DMatrix;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use flutter_types::{Code, Direction, FlutterError, FlutterResult, ObjectiveKind, SearchConfig};

/// Trait for code scoring backends.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Direction in which scores improve.
    fn direction(&self) -> Direction;

    fn score(&self, code: &Code) -> FlutterResult<f64>;
}

/// Build the evaluator selected by the configuration.
pub fn build_evaluator(config: &SearchConfig) -> Box<dyn Evaluator> {
    match config.objective {
        ObjectiveKind::SpectralMinimum => {
            Box::new(SpectralMinimum::new(config.n, config.objectwidth))
        }
        ObjectiveKind::SpectralFlatness => {
            Box::new(SpectralFlatness::new(config.n, config.objectwidth))
        }
        ObjectiveKind::EstimationVariance => {
            Box::new(EstimationVariance::new(config.n, config.objectwidth))
        }
    }
}

fn check_len(code: &Code, n: usize) -> FlutterResult<()> {
    if code.len() != n {
        return Err(FlutterError::Validation(format!(
            "evaluator built for length {n}, got code of length {}",
            code.len()
        )));
    }
    Ok(())
}

/// Planned forward DFT of the normalized code followed by `objectwidth` zeros.
pub struct PaddedTransform {
    n: usize,
    objectwidth: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl PaddedTransform {
    pub fn new(n: usize, objectwidth: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n + objectwidth);
        Self {
            n,
            objectwidth,
            fft,
        }
    }

    pub fn len(&self) -> usize {
        self.n + self.objectwidth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Complex spectrum, `n + objectwidth` bins.
    pub fn spectrum(&self, code: &Code) -> FlutterResult<Vec<Complex64>> {
        check_len(code, self.n)?;
        let mut buf = vec![Complex64::new(0.0, 0.0); self.len()];
        for (slot, v) in buf.iter_mut().zip(code.normalized()) {
            slot.re = v;
        }
        self.fft.process(&mut buf);
        Ok(buf)
    }

    /// Bin magnitudes of the padded spectrum.
    #[cfg(test)]
    fn magnitudes(&self, code: &Code) -> FlutterResult<Vec<f64>> {
        Ok(self.spectrum(code)?.iter().map(|x| x.norm()).collect())
    }
}

fn min_magnitude(spectrum: &[Complex64]) -> f64 {
    spectrum
        .iter()
        .map(|x| x.norm())
        .fold(f64::INFINITY, f64::min)
}

/// Minimum magnitude of the padded spectrum.
pub struct SpectralMinimum {
    transform: PaddedTransform,
}

impl SpectralMinimum {
    pub fn new(n: usize, objectwidth: usize) -> Self {
        Self {
            transform: PaddedTransform::new(n, objectwidth),
        }
    }
}

impl Evaluator for SpectralMinimum {
    fn name(&self) -> &'static str {
        "spectral_minimum"
    }

    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    fn score(&self, code: &Code) -> FlutterResult<f64> {
        Ok(min_magnitude(&self.transform.spectrum(code)?))
    }
}

/// Minimum magnitude minus the variance of the complex padded spectrum.
///
/// Variance is `mean(|X - mean(X)|²)`.
pub struct SpectralFlatness {
    transform: PaddedTransform,
}

impl SpectralFlatness {
    pub fn new(n: usize, objectwidth: usize) -> Self {
        Self {
            transform: PaddedTransform::new(n, objectwidth),
        }
    }
}

impl Evaluator for SpectralFlatness {
    fn name(&self) -> &'static str {
        "spectral_flatness"
    }

    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    fn score(&self, code: &Code) -> FlutterResult<f64> {
        let spectrum = self.transform.spectrum(code)?;
        let len = spectrum.len() as f64;
        let mean = spectrum.iter().sum::<Complex64>() / len;
        let var = spectrum.iter().map(|x| (x - mean).norm_sqr()).sum::<f64>() / len;
        Ok(min_magnitude(&spectrum) - var)
    }
}

/// Estimated reconstruction noise of deblurring with the code.
///
/// AᵗA of the blur matrix is the symmetric Toeplitz matrix of the
/// profile's autocorrelation, built directly without forming A.
pub struct EstimationVariance {
    n: usize,
    objectwidth: usize,
}

impl EstimationVariance {
    pub fn new(n: usize, objectwidth: usize) -> Self {
        Self { n, objectwidth }
    }

    /// `AᵗA` for the code's normalized profile.
    pub fn gram(&self, code: &Code) -> FlutterResult<DMatrix<f64>> {
        check_len(code, self.n)?;
        let profile = code.normalized();
        let autocorr: Vec<f64> = (0..self.n)
            .map(|lag| {
                profile[..self.n - lag]
                    .iter()
                    .zip(&profile[lag..])
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect();
        Ok(DMatrix::from_fn(self.objectwidth, self.objectwidth, |i, j| {
            let lag = i.abs_diff(j);
            if lag < self.n {
                autocorr[lag]
            } else {
                0.0
            }
        }))
    }
}

impl Evaluator for EstimationVariance {
    fn name(&self) -> &'static str {
        "estimation_variance"
    }

    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn score(&self, code: &Code) -> FlutterResult<f64> {
        let gram = self.gram(code)?;
        let inverse = match gram.clone().cholesky() {
            Some(chol) => chol.inverse(),
            None => gram.try_inverse().ok_or_else(|| {
                FlutterError::Numerical(format!("AᵗA is singular for code {code}"))
            })?,
        };
        let mean_diag = inverse.diagonal().mean();
        if !mean_diag.is_finite() || mean_diag < 0.0 {
            return Err(FlutterError::Numerical(format!(
                "mean of diag((AᵗA)⁻¹) is {mean_diag} for code {code}"
            )));
        }
        Ok(mean_diag.sqrt())
    }
}
