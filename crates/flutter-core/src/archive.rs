// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Outcome Archive
// ─────────────────────────────────────────────────────────────────────
//! Opt-in JSON persistence of search outcomes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flutter_types::{FlutterError, FlutterResult, SearchConfig, SearchOutcome};
use serde::{Deserialize, Serialize};

/// An outcome together with the configuration that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedSearch {
    pub config: SearchConfig,
    pub outcome: SearchOutcome,
}

fn serde_error(err: impl ToString) -> FlutterError {
    FlutterError::Validation(format!("archive: {}", err.to_string()))
}

/// Write the outcome as pretty JSON, replacing any existing file.
pub fn save_json(
    config: &SearchConfig,
    outcome: &SearchOutcome,
    path: impl AsRef<Path>,
) -> FlutterResult<()> {
    let record = ArchivedSearch {
        config: config.clone(),
        outcome: outcome.clone(),
    };
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &record).map_err(serde_error)?;
    writer.flush()?;
    log::info!("archived search outcome to {}", path.as_ref().display());
    Ok(())
}

/// Read an archive written by `save_json`, re-checking the code against its config.
pub fn load_json(path: impl AsRef<Path>) -> FlutterResult<ArchivedSearch> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let record: ArchivedSearch = serde_json::from_reader(reader).map_err(serde_error)?;
    record.outcome.code.check(record.config.n, record.config.k)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flutter_types::{Code, StrategyKind};

    fn outcome() -> SearchOutcome {
        SearchOutcome {
            code: Code::parse("10011").unwrap(),
            score: 0.3125,
            strategy: StrategyKind::Exhaustive,
            candidates_evaluated: 3,
            improvements: 2,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n5k3.json");
        let cfg = SearchConfig::new(5, 3);
        save_json(&cfg, &outcome(), &path).unwrap();
        let loaded = load_json(&path).unwrap();
        assert_eq!(loaded.outcome.code.to_digit_string(), "10011");
        assert_eq!(loaded.outcome.score, 0.3125);
        assert_eq!(loaded.config.objectwidth, 80);
    }

    #[test]
    fn test_load_rejects_mismatched_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        save_json(&SearchConfig::new(5, 4), &outcome(), &path).unwrap();
        assert!(matches!(load_json(&path), Err(FlutterError::Validation(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_json(dir.path().join("absent.json")),
            Err(FlutterError::Io(_))
        ));
    }
}
