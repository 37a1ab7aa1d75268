//! Batch processing of every data file in a directory
//!
//! Each file is loaded, analysed and exported on its own; a failing file is
//! recorded and never stops the rest of the batch.

use anyhow::{bail, Context, Result};
use chrono::Local;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use crate::analysis::LiquidityEngine;
use crate::config::AnalyzerConfig;
use crate::export::{export_analysis, write_csv};
use crate::ingest::load_bars;

const KNOWN_PAIRS: [(&str, &str); 4] = [
    ("EURUSD", "EURUSD"),
    ("EUR_USD", "EURUSD"),
    ("GBPUSD", "GBPUSD"),
    ("USDJPY", "USDJPY"),
];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Instrument and period guessed from a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    pub pair: String,
    pub period: String,
    pub stem: String,
}

impl InstrumentInfo {
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let upper = file_name.to_ascii_uppercase();

        let unpacked = file_name.strip_suffix(".zst").unwrap_or(&file_name);
        let stem = unpacked
            .rsplit_once('.')
            .map_or(unpacked, |(stem, _)| stem)
            .to_string();

        let pair = KNOWN_PAIRS
            .iter()
            .find(|(needle, _)| upper.contains(needle))
            .map_or("UNKNOWN", |(_, pair)| *pair)
            .to_string();

        let period = (2020..2030)
            .map(|year: i32| year.to_string())
            .find(|year| file_name.contains(year.as_str()))
            .or_else(|| {
                MONTHS
                    .iter()
                    .find(|m| upper.contains(*m))
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| "UNKNOWN".to_string());

        Self { pair, period, stem }
    }
}

/// `*.csv`, `*.CSV` and `*.csv.zst` files in `dir`, sorted
pub fn find_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".csv") || name.ends_with(".csv.zst") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    pub input_file: String,
    pub output_base: String,
    pub pair: String,
    pub period: String,
    pub records_count: usize,
    pub analysis_days: usize,
    pub skipped_days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub input_file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
struct SummaryRow<'a> {
    status: &'static str,
    input_file: &'a str,
    output_base: &'a str,
    pair: &'a str,
    period: &'a str,
    records_count: usize,
    analysis_days: usize,
    error: &'a str,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedFile>,
    pub failed: Vec<FailedFile>,
    pub summary_path: Option<PathBuf>,
}

impl BatchReport {
    pub fn total_records(&self) -> usize {
        self.processed.iter().map(|f| f.records_count).sum()
    }

    pub fn total_days(&self) -> usize {
        self.processed.iter().map(|f| f.analysis_days).sum()
    }
}

pub struct BatchRunner {
    files_dir: PathBuf,
    results_dir: PathBuf,
    config: AnalyzerConfig,
    /// Derive pip size from each file's pair instead of using `config` as-is
    per_pair_presets: bool,
}

impl BatchRunner {
    pub fn new(files_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>, config: AnalyzerConfig) -> Self {
        Self {
            files_dir: files_dir.into(),
            results_dir: results_dir.into(),
            config,
            per_pair_presets: true,
        }
    }

    pub fn with_per_pair_presets(mut self, enabled: bool) -> Self {
        self.per_pair_presets = enabled;
        self
    }

    fn config_for(&self, info: &InstrumentInfo) -> AnalyzerConfig {
        if !self.per_pair_presets || info.pair == "UNKNOWN" {
            return self.config.clone();
        }
        let preset = AnalyzerConfig::for_pair(&info.pair);
        AnalyzerConfig {
            instrument: preset.instrument,
            pip_size: preset.pip_size,
            price_precision: preset.price_precision,
            ..self.config.clone()
        }
    }

    pub fn process_file(&self, path: &Path, stamp: &str) -> Result<ProcessedFile> {
        let info = InstrumentInfo::from_path(path);
        let config = self.config_for(&info);

        let loaded = load_bars(path, &config.timezone)
            .with_context(|| format!("Failed to load {:?}", path))?;
        let records_count = loaded.normalized.bars.len();
        if records_count == 0 {
            bail!("no usable rows in {:?}", path);
        }

        let engine = LiquidityEngine::new(config)?;
        let analysis = engine.analyze_bars(loaded.into_bars())?;
        if analysis.days.is_empty() {
            bail!("analysis produced no trading days");
        }

        let output_base = format!("{}_{}_{}_analysis_{}", info.stem, info.pair, info.period, stamp);
        export_analysis(&self.results_dir, &output_base, &analysis, engine.config())?;

        Ok(ProcessedFile {
            input_file: path.display().to_string(),
            output_base,
            pair: info.pair,
            period: info.period,
            records_count,
            analysis_days: analysis.days.len(),
            skipped_days: analysis.skipped_count(),
        })
    }

    pub fn run(&self) -> Result<BatchReport> {
        std::fs::create_dir_all(&self.results_dir)
            .with_context(|| format!("Failed to create {:?}", self.results_dir))?;

        let files = find_input_files(&self.files_dir)?;
        let mut report = BatchReport::default();
        if files.is_empty() {
            info!("No CSV files found in {:?}", self.files_dir);
            return Ok(report);
        }

        info!("Processing {} files from {:?}", files.len(), self.files_dir);
        let started = Instant::now();
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        let outcomes: Vec<(PathBuf, Result<ProcessedFile>)> = files
            .par_iter()
            .map(|path| (path.clone(), self.process_file(path, &stamp)))
            .collect();

        for (path, outcome) in outcomes {
            match outcome {
                Ok(processed) => {
                    info!(
                        "Processed {:?}: {} bars, {} days",
                        path, processed.records_count, processed.analysis_days
                    );
                    report.processed.push(processed);
                }
                Err(e) => {
                    error!("Failed {:?}: {:#}", path, e);
                    report.failed.push(FailedFile {
                        input_file: path.display().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        report.summary_path = Some(self.write_summary(&report, &stamp)?);
        info!(
            "Batch finished in {:.1}s: {} processed, {} failed",
            started.elapsed().as_secs_f64(),
            report.processed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn write_summary(&self, report: &BatchReport, stamp: &str) -> Result<PathBuf> {
        let path = self.results_dir.join(format!("batch_summary_{}.csv", stamp));
        let rows: Vec<SummaryRow> = report
            .processed
            .iter()
            .map(|f| SummaryRow {
                status: "processed",
                input_file: &f.input_file,
                output_base: &f.output_base,
                pair: &f.pair,
                period: &f.period,
                records_count: f.records_count,
                analysis_days: f.analysis_days,
                error: "",
            })
            .chain(report.failed.iter().map(|f| SummaryRow {
                status: "failed",
                input_file: &f.input_file,
                output_base: "",
                pair: "",
                period: "",
                records_count: 0,
                analysis_days: 0,
                error: &f.error,
            }))
            .collect();
        write_csv(&path, &rows)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_info() {
        let info = InstrumentInfo::from_path(Path::new("files/DAT_MT_EURUSD_M1_202505.csv"));
        assert_eq!(info.pair, "EURUSD");
        assert_eq!(info.period, "2025");
        assert_eq!(info.stem, "DAT_MT_EURUSD_M1_202505");

        let info = InstrumentInfo::from_path(Path::new("eur_usd_may.csv.zst"));
        assert_eq!(info.pair, "EURUSD");
        assert_eq!(info.period, "MAY");
        assert_eq!(info.stem, "eur_usd_may");

        let info = InstrumentInfo::from_path(Path::new("prices.CSV"));
        assert_eq!(info.pair, "UNKNOWN");
        assert_eq!(info.period, "UNKNOWN");
    }

    #[test]
    fn test_find_input_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "c.csv.zst", "notes.txt", "d.xlsx"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let files = find_input_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv", "c.csv.zst"]);
    }

    fn write_day(path: &Path) {
        let mut text = String::new();
        // UTC rows; +3h puts 23:00..23:59 at 02:00..02:59 local
        for minute in 0..60 {
            text.push_str(&format!("2025.05.05,23:{:02},1.10050,1.10100,1.10000,1.10050,0\n", minute));
        }
        text.push_str("2025.05.06,08:00,1.10050,1.10200,1.10040,1.10150,0\n");
        text.push_str("2025.05.06,09:00,1.10150,1.10300,1.10140,1.10250,0\n");
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_batch_run_collects_failures() {
        let files = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        write_day(&files.path().join("DAT_MT_EURUSD_M1_202505.csv"));
        std::fs::write(files.path().join("broken_2024.csv"), "not,a,price,file\n").unwrap();

        let report = BatchRunner::new(files.path(), results.path(), AnalyzerConfig::default())
            .run()
            .unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.processed[0].pair, "EURUSD");
        assert_eq!(report.processed[0].analysis_days, 1);
        assert!(report.failed[0].input_file.ends_with("broken_2024.csv"));

        let summary = report.summary_path.unwrap();
        let text = std::fs::read_to_string(summary).unwrap();
        assert_eq!(text.lines().count(), 3);

        let base = &report.processed[0].output_base;
        assert!(results.path().join(format!("{}_results.csv", base)).exists());
    }

    #[test]
    fn test_empty_directory() {
        let files = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let report = BatchRunner::new(files.path(), results.path(), AnalyzerConfig::default())
            .run()
            .unwrap();
        assert!(report.processed.is_empty());
        assert!(report.summary_path.is_none());
    }
}
