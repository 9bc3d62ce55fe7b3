use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessReport {
    pub avg: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    /// Summary of the values added so far (population standard deviation).
    pub fn report(&self) -> FitnessReport {
        if self.n_vals == 0 {
            return FitnessReport {
                avg: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        FitnessReport {
            avg: self.mean,
            std: (self.diff_2_sum / self.n_vals as f64).sqrt(),
            min: self.min,
            max: self.max,
        }
    }
}

/// Statistics of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation index (0 is the seeded population).
    pub i_gen: usize,
    /// Number of individuals evaluated in this generation.
    pub n_evals: usize,
    pub report: FitnessReport,
}

impl GenerationRecord {
    fn to_row(&self) -> String {
        let report = &self.report;
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            self.i_gen, self.n_evals, report.avg, report.std, report.min, report.max
        )
    }
}

/// Tab-separated per-generation statistics file.
pub struct StatsLog<W = File> {
    path: PathBuf,
    writer: W,
}

impl StatsLog {
    /// Create `ft_<unix seconds>.tsv` in `out_dir` and write its header.
    ///
    /// If that name is taken, `ft_<unix seconds>_<n>.tsv` is used instead.
    pub fn create<P: AsRef<Path>>(out_dir: P) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?
            .as_secs();

        const MAX_ATTEMPTS: usize = 1000;
        for attempt in 0..MAX_ATTEMPTS {
            let name = match attempt {
                0 => format!("ft_{timestamp}.tsv"),
                _ => format!("ft_{timestamp}_{attempt}.tsv"),
            };
            let path = out_dir.join(name);
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => return Self::from_writer(path, file),
                Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
                Err(error) => {
                    return Err(error).with_context(|| format!("failed to create {path:?}"));
                }
            }
        }
        bail!("no free log file name for timestamp {timestamp} in {out_dir:?}")
    }
}

impl<W: Write> StatsLog<W> {
    /// Wrap `writer` (reported as `path`) and write the header.
    pub fn from_writer(path: PathBuf, writer: W) -> Result<Self> {
        let mut log = Self { path, writer };
        log.write_line("gen\tnevals\tAvg\tStd\tMin\tMax\n")
            .context("failed to write header")?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one generation's row.
    pub fn append(&mut self, record: &GenerationRecord) -> Result<()> {
        self.write_line(&record.to_row())
            .with_context(|| format!("failed to log generation {}", record.i_gen))
    }

    /// Write a whole line, retrying once from the first unwritten byte.
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut rest = line.as_bytes();
        if let Err(error) = self.try_write(&mut rest) {
            log::warn!("retrying write to {:?}: {error}", self.path);
            self.try_write(&mut rest)
                .with_context(|| format!("failed to write to {:?}", self.path))?;
        }
        Ok(())
    }

    fn try_write(&mut self, rest: &mut &[u8]) -> io::Result<()> {
        while !rest.is_empty() {
            match self.writer.write(*rest) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => *rest = &rest[n..],
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn report_matches_population_statistics() {
        let mut acc = Accumulator::new();
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.avg - 5.0).abs() < 1e-12);
        assert!((report.std - 2.0).abs() < 1e-12);
        assert_eq!(report.min, 2.0);
        assert_eq!(report.max, 9.0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let mut acc = Accumulator::new();
        acc.add(0.5);
        let report = acc.report();
        assert_eq!(report.std, 0.0);
        assert_eq!(report.min, report.max);
    }

    #[test]
    fn log_has_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = StatsLog::create(dir.path()).unwrap();
        for i_gen in 0..3 {
            log.append(&GenerationRecord {
                i_gen,
                n_evals: 10,
                report: FitnessReport {
                    avg: 1.0,
                    std: 0.0,
                    min: 1.0,
                    max: 1.0,
                },
            })
            .unwrap();
        }

        let file_name = log.path().file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("ft_") && file_name.ends_with(".tsv"));

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "gen\tnevals\tAvg\tStd\tMin\tMax");
        assert_eq!(lines[1], "0\t10\t1\t0\t1\t1");
        assert!(lines[3].starts_with("2\t"));
    }

    #[test]
    fn logs_created_together_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = StatsLog::create(dir.path()).unwrap();
        let b = StatsLog::create(dir.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    /// Accepts at most `max_chunk` bytes per call and fails the calls after
    /// the first `fail_after`, `n_failures` times.
    struct FlakyWriter {
        data: Vec<u8>,
        n_calls: usize,
        max_chunk: usize,
        fail_after: usize,
        n_failures: usize,
    }

    impl FlakyWriter {
        fn new(max_chunk: usize, fail_after: usize, n_failures: usize) -> Self {
            Self {
                data: Vec::new(),
                n_calls: 0,
                max_chunk,
                fail_after,
                n_failures,
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.n_calls += 1;
            if self.n_calls > self.fail_after && self.n_failures > 0 {
                self.n_failures -= 1;
                return Err(io::Error::other("device busy"));
            }
            let n = buf.len().min(self.max_chunk);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const HEADER: &str = "gen\tnevals\tAvg\tStd\tMin\tMax\n";

    fn record() -> GenerationRecord {
        GenerationRecord {
            i_gen: 4,
            n_evals: 7,
            report: FitnessReport {
                avg: 0.5,
                std: 0.25,
                min: 0.125,
                max: 1.0,
            },
        }
    }

    #[test]
    fn row_write_is_retried_once_then_fails() {
        let writer = FlakyWriter::new(usize::MAX, 1, usize::MAX);
        let mut log = StatsLog::from_writer(PathBuf::from("flaky.tsv"), writer).unwrap();
        assert_eq!(log.writer.n_calls, 1);

        let error = log.append(&record()).unwrap_err();
        assert!(format!("{error:#}").contains("device busy"));
        assert_eq!(log.writer.n_calls, 3);
        assert_eq!(log.writer.data, HEADER.as_bytes());
    }

    #[test]
    fn retry_resumes_after_written_bytes() {
        // The header takes 7 chunks; the row's second chunk fails once.
        let writer = FlakyWriter::new(4, 8, 1);
        let mut log = StatsLog::from_writer(PathBuf::from("flaky.tsv"), writer).unwrap();
        log.append(&record()).unwrap();

        let contents = String::from_utf8(log.writer.data.clone()).unwrap();
        assert_eq!(contents, format!("{HEADER}4\t7\t0.5\t0.25\t0.125\t1\n"));
        assert_eq!(log.writer.n_failures, 0);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StatsLog::create(dir.path().join("missing")).is_err());
    }
}
