// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Random Search Delegation
// ─────────────────────────────────────────────────────────────────────
//! Hand-off to the external random search tool for spaces too large to
//! enumerate.
//!
//! The tool is a black box: it is run once, synchronously, with four
//! positional arguments `n k T trials` (where `T = objectwidth + n`), and
//! leaves a table `BestSeq_n=<n>k=<k>T=<T>.txt` in its working
//! directory. Each row records one improvement:
//!
//! ```text
//! <trial> <unused> <score> <packed sequence>
//! ```
//!
//! The packed sequence is the code read as a base-2 number, most
//! significant bit first. Only the last row is used; it is assumed to
//! hold the final best.
//!
//! Running and parsing are separate seams (`RandomSearchRunner`,
//! `ResultReader`, `parse_result`) so each can be replaced in tests.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use flutter_types::{Code, Direction, FlutterError, FlutterResult, SearchConfig};

/// Arguments handed to the external random search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSearchParams {
    pub n: usize,
    pub k: usize,
    /// Padded length, `objectwidth + n`.
    pub total_width: usize,
    /// Maximum number of random trials.
    pub trials: u64,
}

impl RandomSearchParams {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            n: config.n,
            k: config.k,
            total_width: config.padded_len(),
            trials: config.max_random_search_times,
        }
    }

    /// Positional command line arguments, in order.
    pub fn args(&self) -> [String; 4] {
        [
            self.n.to_string(),
            self.k.to_string(),
            self.total_width.to_string(),
            self.trials.to_string(),
        ]
    }

    /// Name of the table the tool writes.
    pub fn result_file_name(&self) -> String {
        format!(
            "BestSeq_n={}k={}T={}.txt",
            self.n, self.k, self.total_width
        )
    }
}

/// Location of a finished random search's result table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultFile {
    pub path: PathBuf,
}

impl ResultFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, reason: impl Into<String>) -> FlutterError {
        FlutterError::ResultFile {
            path: self.path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Trait for random search backends.
///
/// Blocks until the search finished and returns where its table is.
pub trait RandomSearchRunner: Send + Sync {
    fn run(&self, params: &RandomSearchParams) -> FlutterResult<ResultFile>;
}

/// Runs the external tool as a child process and waits for it.
///
/// No timeout: a hung tool has to be killed by the operator.
pub struct ProcessRunner {
    program: PathBuf,
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.random_search_program.clone(),
            config.random_search_dir.clone(),
        )
    }
}

impl RandomSearchRunner for ProcessRunner {
    fn run(&self, params: &RandomSearchParams) -> FlutterResult<ResultFile> {
        let args = params.args();
        log::debug!(
            "spawning {} {} in {}",
            self.program.display(),
            args.join(" "),
            self.working_dir.display()
        );
        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .status()
            .map_err(|e| {
                FlutterError::Delegation(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;
        if !status.success() {
            log::error!("random search {} exited with {status}", self.program.display());
            return Err(FlutterError::Delegation(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(ResultFile::new(
            self.working_dir.join(params.result_file_name()),
        ))
    }
}

/// External runner that calls a function pointer.
///
/// Used to plug in other search backends and fakes in tests.
type RunFn = Box<dyn Fn(&RandomSearchParams) -> FlutterResult<ResultFile> + Send + Sync>;

pub struct ExternalRunner {
    run_fn: RunFn,
}

impl ExternalRunner {
    pub fn new(
        run_fn: impl Fn(&RandomSearchParams) -> FlutterResult<ResultFile> + Send + Sync + 'static,
    ) -> Self {
        Self {
            run_fn: Box::new(run_fn),
        }
    }
}

impl RandomSearchRunner for ExternalRunner {
    fn run(&self, params: &RandomSearchParams) -> FlutterResult<ResultFile> {
        (self.run_fn)(params)
    }
}

/// Trait for loading result tables.
pub trait ResultReader: Send + Sync {
    fn read(&self, file: &ResultFile) -> FlutterResult<String>;
}

/// Reads result tables from disk.
pub struct FsResultReader;

impl ResultReader for FsResultReader {
    fn read(&self, file: &ResultFile) -> FlutterResult<String> {
        log::debug!("reading random search result {}", file.path.display());
        fs::read_to_string(&file.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => file.error("file not found"),
            _ => file.error(e.to_string()),
        })
    }
}

/// In-memory result tables keyed by path.
#[derive(Default)]
pub struct InMemoryResults {
    tables: HashMap<PathBuf, String>,
}

impl InMemoryResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, table: impl Into<String>) {
        self.tables.insert(path.into(), table.into());
    }
}

impl ResultReader for InMemoryResults {
    fn read(&self, file: &ResultFile) -> FlutterResult<String> {
        self.tables
            .get(&file.path)
            .cloned()
            .ok_or_else(|| file.error("file not found"))
    }
}

fn split_row(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_data_row(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.starts_with('%')
}

/// Parse a result table into the best code and its score.
///
/// Uses the last data row: column 3 is the score, column 4 the packed
/// sequence. Earlier rows only feed a warning when one of them scored
/// higher than the last.
pub fn parse_result(
    file: &ResultFile,
    table: &str,
    n: usize,
    k: usize,
) -> FlutterResult<(Code, f64)> {
    let rows: Vec<Vec<&str>> = table
        .lines()
        .filter(|l| is_data_row(l))
        .map(split_row)
        .collect();
    let last = rows.last().ok_or_else(|| file.error("no data rows"))?;
    if last.len() < 4 {
        return Err(file.error(format!(
            "last row has {} columns, expected at least 4",
            last.len()
        )));
    }

    let score: f64 = last[2]
        .parse()
        .map_err(|_| file.error(format!("score column {:?} is not a number", last[2])))?;
    if !score.is_finite() {
        return Err(file.error(format!("score {score} is not finite")));
    }

    let code = decode_packed(last[3], n)?;
    if code.weight() != k {
        return Err(FlutterError::Decode(format!(
            "packed sequence {} decodes to {code} with weight {}, expected {k}",
            last[3],
            code.weight()
        )));
    }

    let earlier_best = rows[..rows.len() - 1]
        .iter()
        .filter_map(|row| row.get(2).and_then(|s| s.parse::<f64>().ok()))
        .fold(f64::NEG_INFINITY, f64::max);
    if Direction::Maximize.is_better(earlier_best, score) {
        log::warn!(
            "{}: last row score {score} is below an earlier row's {earlier_best}; using the last row",
            file.path.display()
        );
    }

    Ok((code, score))
}

/// Integer digits of a packed value, accepting plain or float notation.
fn packed_digits(token: &str) -> FlutterResult<String> {
    let token = token.trim();
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(token.to_string());
    }
    let value: f64 = token
        .parse()
        .map_err(|_| FlutterError::Decode(format!("packed sequence {token:?} is not a number")))?;
    // f64 holds every integer exactly only up to 2^53
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > 9_007_199_254_740_992.0 {
        return Err(FlutterError::Decode(format!(
            "packed sequence {token:?} is not an exact non-negative integer"
        )));
    }
    Ok(format!("{value:.0}"))
}

/// Expand a packed decimal value into a length-`n` code, MSB first.
pub fn decode_packed(token: &str, n: usize) -> FlutterResult<Code> {
    let mut decimal: Vec<u8> = packed_digits(token)?
        .bytes()
        .map(|b| b - b'0')
        .skip_while(|&d| d == 0)
        .collect();

    // Repeated halving of the decimal digit string, LSB first.
    let mut bits = Vec::new();
    while !decimal.is_empty() {
        let mut remainder = 0u8;
        for digit in decimal.iter_mut() {
            let cur = remainder * 10 + *digit;
            *digit = cur / 2;
            remainder = cur % 2;
        }
        bits.push(remainder);
        let leading = decimal.iter().take_while(|&&d| d == 0).count();
        decimal.drain(..leading);
    }
    bits.reverse();

    if bits.len() > n {
        return Err(FlutterError::Decode(format!(
            "packed sequence {token} needs {} bits, code length is {n}",
            bits.len()
        )));
    }
    let mut padded = vec![0u8; n - bits.len()];
    padded.extend(bits);
    Code::from_bits(padded)
        .map_err(|e| FlutterError::Decode(format!("packed sequence {token}: {e}")))
}

/// Packed decimal form of a code, the inverse of `decode_packed`.
#[cfg(test)]
pub(crate) fn encode_packed(code: &Code) -> String {
    // Doubling in decimal, LSB first
    let mut decimal: Vec<u8> = vec![0];
    for &bit in code.bits() {
        let mut carry = bit;
        for digit in decimal.iter_mut() {
            let cur = *digit * 2 + carry;
            *digit = cur % 10;
            carry = cur / 10;
        }
        if carry > 0 {
            decimal.push(carry);
        }
    }
    decimal.iter().rev().map(|&d| char::from(b'0' + d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> ResultFile {
        ResultFile::new("BestSeq_n=5k=3T=45.txt")
    }

    #[test]
    fn test_params_from_config() {
        let cfg = SearchConfig::new(40, 20);
        let params = RandomSearchParams::from_config(&cfg);
        assert_eq!(params.total_width, 40 + 640);
        assert_eq!(params.args(), ["40", "20", "680", "5000000"]);
        assert_eq!(params.result_file_name(), "BestSeq_n=40k=20T=680.txt");
    }

    #[test]
    fn test_decode_packed_msb_first() {
        // 25 = 0b11001
        let code = decode_packed("25", 5).unwrap();
        assert_eq!(code.to_digit_string(), "11001");
    }

    #[test]
    fn test_decode_packed_float_notation() {
        let code = decode_packed("2.1e1", 5).unwrap();
        assert_eq!(code.to_digit_string(), "10101");
        assert!(decode_packed("21.5", 5).is_err());
    }

    #[test]
    fn test_decode_packed_wider_than_u128() {
        // 2^150 + 1: 151 bits, both ends open
        let digits = "1427247692705959881058285969449495136382746625";
        let code = decode_packed(digits, 151).unwrap();
        assert_eq!(code.weight(), 2);
        assert_eq!(encode_packed(&code), digits);
    }

    #[test]
    fn test_decode_packed_too_short_or_long() {
        // 9 = 0b1001 has a closed leading slot when read as 5 bits
        assert!(matches!(decode_packed("9", 5), Err(FlutterError::Decode(_))));
        assert!(matches!(decode_packed("63", 5), Err(FlutterError::Decode(_))));
        assert!(decode_packed("0", 5).is_err());
        assert!(decode_packed("abc", 5).is_err());
        assert!(decode_packed("-3", 5).is_err());
    }

    #[test]
    fn test_parse_result_last_row() {
        let table = "1 0 0.10 25\n17 0 0.20 21\n\n";
        let (code, score) = parse_result(&file(), table, 5, 3).unwrap();
        assert_eq!(code.to_digit_string(), "10101");
        assert!((score - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_parse_result_comma_separated_with_comments() {
        let table = "# trial,x,score,seq\n3,1,0.125,19\n";
        let (code, score) = parse_result(&file(), table, 5, 3).unwrap();
        assert_eq!(code.to_digit_string(), "10011");
        assert!((score - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_parse_result_empty() {
        assert!(matches!(
            parse_result(&file(), "\n# nothing\n", 5, 3),
            Err(FlutterError::ResultFile { .. })
        ));
    }

    #[test]
    fn test_parse_result_short_row() {
        assert!(matches!(
            parse_result(&file(), "1 0 0.3\n", 5, 3),
            Err(FlutterError::ResultFile { .. })
        ));
    }

    #[test]
    fn test_parse_result_bad_score() {
        assert!(parse_result(&file(), "1 0 nan 21\n", 5, 3).is_err());
        assert!(parse_result(&file(), "1 0 x 21\n", 5, 3).is_err());
    }

    #[test]
    fn test_parse_result_wrong_weight() {
        // 31 = 11111 has weight 5
        assert!(matches!(
            parse_result(&file(), "1 0 0.3 31\n", 5, 3),
            Err(FlutterError::Decode(_))
        ));
    }

    #[test]
    fn test_in_memory_reader_missing() {
        let reader = InMemoryResults::new();
        assert!(matches!(
            reader.read(&file()),
            Err(FlutterError::ResultFile { .. })
        ));
    }

    #[test]
    fn test_fs_reader_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ResultFile::new(dir.path().join("BestSeq_n=9k=4T=81.txt"));
        let err = FsResultReader.read(&missing).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_fs_reader_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BestSeq_n=5k=3T=45.txt");
        fs::write(&path, "4 0 0.31 25\n").unwrap();
        let table = FsResultReader.read(&ResultFile::new(&path)).unwrap();
        let (code, _) = parse_result(&ResultFile::new(&path), &table, 5, 3).unwrap();
        assert_eq!(code.to_digit_string(), "11001");
    }

    #[test]
    fn test_external_runner() {
        let runner = ExternalRunner::new(|p| Ok(ResultFile::new(p.result_file_name())));
        let params = RandomSearchParams {
            n: 5,
            k: 3,
            total_width: 45,
            trials: 10,
        };
        assert_eq!(runner.run(&params).unwrap(), file());
    }

    #[test]
    fn test_process_runner_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path().join("no-such-search-tool"), dir.path());
        let params = RandomSearchParams {
            n: 5,
            k: 3,
            total_width: 45,
            trials: 10,
        };
        assert!(matches!(
            runner.run(&params),
            Err(FlutterError::Delegation(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new("false", dir.path());
        let params = RandomSearchParams {
            n: 5,
            k: 3,
            total_width: 45,
            trials: 10,
        };
        assert!(matches!(
            runner.run(&params),
            Err(FlutterError::Delegation(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_success_points_at_table() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new("true", dir.path());
        let params = RandomSearchParams {
            n: 5,
            k: 3,
            total_width: 45,
            trials: 10,
        };
        let result = runner.run(&params).unwrap();
        assert_eq!(result.path, dir.path().join("BestSeq_n=5k=3T=45.txt"));
    }
}
