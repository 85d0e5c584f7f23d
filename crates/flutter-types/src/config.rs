// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Search Configuration
// ─────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FlutterError, FlutterResult};

/// Largest default zero padding, `2^20` samples.
pub const MAX_DEFAULT_OBJECTWIDTH: usize = 1 << 20;

/// Default cap on the exhaustive candidate count.
pub const DEFAULT_MAX_EXHAUSTIVE: u64 = 500_000;

/// Default number of trials handed to the external random search.
pub const DEFAULT_MAX_RANDOM: u64 = 5_000_000;

/// Default lower bound on `objectwidth / n`.
pub const DEFAULT_MIN_PADDING_RATIO: usize = 8;

/// Largest padding the estimation variance objective accepts. Its Gram
/// matrix is dense `objectwidth × objectwidth` (128 MiB at this bound).
pub const MAX_DENSE_OBJECTWIDTH: usize = 4096;

/// Which objective scores candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Minimum magnitude of the padded DFT. Higher is better.
    #[default]
    SpectralMinimum,
    /// `min |X| - var(X)` over the padded DFT. Higher is better.
    SpectralFlatness,
    /// `sqrt(mean(diag((AᵗA)⁻¹)))` of the motion blur matrix. Lower is better.
    EstimationVariance,
}

/// Parameters of one code search.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Code length (number of exposure slots). Must be >= 2.
    pub n: usize,

    /// Code weight (number of open slots). Must satisfy 2 <= k <= n.
    pub k: usize,

    /// Number of zeros appended before the transform.
    /// Default: min(16 n, 2^20).
    pub objectwidth: usize,

    /// Exhaustive search is used while C(n-2, k-2) stays below this.
    /// Default: 500,000.
    #[serde(default = "default_max_exhaustive")]
    pub max_exhaustive_search_times: u64,

    /// Trial budget passed to the external random search.
    /// Default: 5,000,000.
    #[serde(default = "default_max_random")]
    pub max_random_search_times: u64,

    #[serde(default)]
    pub objective: ObjectiveKind,

    /// Reject configurations with `objectwidth < ratio * n`.
    /// 0 disables the check. Default: 8.
    #[serde(default = "default_min_padding_ratio")]
    pub min_padding_ratio: usize,

    /// Score exhaustive candidates on the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    /// Score only one code of each reversal pair. A code and its mirror
    /// image have the same spectrum magnitudes and the same estimation
    /// variance, so the optimum score is unchanged.
    #[serde(default)]
    pub skip_reversals: bool,

    /// Executable of the external random search.
    #[serde(default = "default_random_search_program")]
    pub random_search_program: PathBuf,

    /// Working directory of the external search; its result file lands here.
    #[serde(default = "default_random_search_dir")]
    pub random_search_dir: PathBuf,
}

fn default_max_exhaustive() -> u64 {
    DEFAULT_MAX_EXHAUSTIVE
}

fn default_max_random() -> u64 {
    DEFAULT_MAX_RANDOM
}

fn default_min_padding_ratio() -> usize {
    DEFAULT_MIN_PADDING_RATIO
}

fn default_random_search_program() -> PathBuf {
    PathBuf::from("RandomSearch")
}

fn default_random_search_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Default zero padding for a code of length `n`.
pub fn default_objectwidth(n: usize) -> usize {
    n.saturating_mul(16).min(MAX_DEFAULT_OBJECTWIDTH)
}

impl SearchConfig {
    /// Configuration with default padding, thresholds, and objective.
    ///
    /// For `n > 2^17` the default padding is capped at `2^20` and falls
    /// short of `min_padding_ratio * n`; `validate` accepts the cap as the
    /// required padding in that case.
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            objectwidth: default_objectwidth(n),
            max_exhaustive_search_times: DEFAULT_MAX_EXHAUSTIVE,
            max_random_search_times: DEFAULT_MAX_RANDOM,
            objective: ObjectiveKind::default(),
            min_padding_ratio: DEFAULT_MIN_PADDING_RATIO,
            parallel: false,
            skip_reversals: false,
            random_search_program: default_random_search_program(),
            random_search_dir: default_random_search_dir(),
        }
    }

    /// Configuration whose weight is `floor(n * density)`, clamped to `[2, n]`.
    pub fn with_density(n: usize, density: f64) -> Self {
        let k = if density.is_finite() && density > 0.0 {
            (n as f64 * density).floor() as usize
        } else {
            0
        };
        Self::new(n, k.clamp(2, n.max(2)))
    }

    pub fn objectwidth(mut self, objectwidth: usize) -> Self {
        self.objectwidth = objectwidth;
        self
    }

    pub fn objective(mut self, objective: ObjectiveKind) -> Self {
        self.objective = objective;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn skip_reversals(mut self, skip_reversals: bool) -> Self {
        self.skip_reversals = skip_reversals;
        self
    }

    /// Smallest padding `validate` accepts: `min_padding_ratio * n`,
    /// capped at `MAX_DEFAULT_OBJECTWIDTH`.
    pub fn required_objectwidth(&self) -> usize {
        self.n
            .saturating_mul(self.min_padding_ratio)
            .min(MAX_DEFAULT_OBJECTWIDTH)
    }

    /// Length of the padded sequence, `n + objectwidth`.
    pub fn padded_len(&self) -> usize {
        self.n + self.objectwidth
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> FlutterResult<()> {
        if self.n < 2 {
            return Err(FlutterError::Config(format!(
                "n must be >= 2, got {}",
                self.n
            )));
        }
        if self.k < 2 || self.k > self.n {
            return Err(FlutterError::Config(format!(
                "k must be in [2, n={}], got {}",
                self.n, self.k
            )));
        }
        if self.objectwidth == 0 {
            return Err(FlutterError::Config(
                "objectwidth must be > 0".to_string(),
            ));
        }
        if self.objectwidth < self.required_objectwidth() {
            return Err(FlutterError::Config(format!(
                "objectwidth must be >= min({} * n, {}) = {}, got {}",
                self.min_padding_ratio,
                MAX_DEFAULT_OBJECTWIDTH,
                self.required_objectwidth(),
                self.objectwidth
            )));
        }
        if self.objective == ObjectiveKind::EstimationVariance
            && self.objectwidth > MAX_DENSE_OBJECTWIDTH
        {
            return Err(FlutterError::Config(format!(
                "estimation_variance needs objectwidth <= {}, got {}",
                MAX_DENSE_OBJECTWIDTH, self.objectwidth
            )));
        }
        if self.max_random_search_times == 0 {
            return Err(FlutterError::Config(
                "max_random_search_times must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> FlutterResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FlutterError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SearchConfig::new(10, 5);
        assert_eq!(cfg.objectwidth, 160);
        assert_eq!(cfg.max_exhaustive_search_times, 500_000);
        assert_eq!(cfg.max_random_search_times, 5_000_000);
        assert_eq!(cfg.objective, ObjectiveKind::SpectralMinimum);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_objectwidth_capped() {
        assert_eq!(default_objectwidth(1 << 17), MAX_DEFAULT_OBJECTWIDTH);
        assert_eq!(default_objectwidth(4), 64);
    }

    #[test]
    fn test_rejects_short_code() {
        let cfg = SearchConfig::new(1, 2);
        assert!(matches!(cfg.validate(), Err(FlutterError::Config(_))));
    }

    #[test]
    fn test_rejects_weight_out_of_range() {
        assert!(SearchConfig::new(6, 1).validate().is_err());
        assert!(SearchConfig::new(6, 7).validate().is_err());
        assert!(SearchConfig::new(6, 6).validate().is_ok());
        assert!(SearchConfig::new(2, 2).validate().is_ok());
    }

    #[test]
    fn test_rejects_thin_padding() {
        let cfg = SearchConfig::new(10, 4).objectwidth(40);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_padding_check_disabled() {
        let mut cfg = SearchConfig::new(10, 4).objectwidth(40);
        cfg.min_padding_ratio = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_capped_default_padding_is_valid() {
        let cfg = SearchConfig::new(200_000, 2);
        assert_eq!(cfg.objectwidth, MAX_DEFAULT_OBJECTWIDTH);
        assert_eq!(cfg.required_objectwidth(), MAX_DEFAULT_OBJECTWIDTH);
        assert!(cfg.validate().is_ok());
        assert!(cfg.objectwidth(MAX_DEFAULT_OBJECTWIDTH - 1).validate().is_err());
    }

    #[test]
    fn test_estimation_variance_padding_bounded() {
        let cfg = SearchConfig::new(65_536, 2).objective(ObjectiveKind::EstimationVariance);
        assert!(matches!(cfg.validate(), Err(FlutterError::Config(_))));

        let mut small = SearchConfig::new(256, 4)
            .objective(ObjectiveKind::EstimationVariance)
            .objectwidth(MAX_DENSE_OBJECTWIDTH);
        assert!(small.validate().is_ok());
        small.objectwidth = MAX_DENSE_OBJECTWIDTH + 1;
        assert!(small.validate().is_err());
        // The spectral objectives have no dense matrix and no such bound.
        assert!(small.objective(ObjectiveKind::SpectralMinimum).validate().is_ok());
    }

    #[test]
    fn test_with_density() {
        assert_eq!(SearchConfig::with_density(20, 0.5).k, 10);
        assert_eq!(SearchConfig::with_density(20, 0.01).k, 2);
        assert_eq!(SearchConfig::with_density(5, 3.0).k, 5);
        assert_eq!(SearchConfig::with_density(5, f64::NAN).k, 2);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let cfg = SearchConfig::from_json(
            r#"{"n": 12, "k": 6, "objectwidth": 192, "objective": "estimation_variance"}"#,
        )
        .unwrap();
        assert_eq!(cfg.n, 12);
        assert_eq!(cfg.objective, ObjectiveKind::EstimationVariance);
        assert_eq!(cfg.max_exhaustive_search_times, DEFAULT_MAX_EXHAUSTIVE);
        assert_eq!(cfg.min_padding_ratio, DEFAULT_MIN_PADDING_RATIO);
        assert!(!cfg.parallel);
        assert!(!cfg.skip_reversals);
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(matches!(
            SearchConfig::from_json("{not json"),
            Err(FlutterError::Config(_))
        ));
    }
}
