//! Minute-bar ingestion
//!
//! Reads MetaTrader-style exports (`Date,Time,Open,High,Low,Close[,Volume]`,
//! optionally zstd-compressed), converts the UTC timestamps onto the analysis
//! calendar and produces the ordered, duplicate-free bar stream the engine
//! expects.

use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::analysis::PriceBar;
use crate::config::{TimeZoneStrategy, ZoneConverter};
use crate::error::DataError;

/// Timestamp layouts tried in order against the first data row
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y.%m.%d %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// One parsed row before validation. Prices that are missing or not numeric
/// are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBar {
    pub utc: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    pub fn is_complete(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some() && self.close.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub rows: Vec<RawBar>,
    pub delimiter: u8,
    pub has_header: bool,
    pub timestamp_format: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Date and time in separate columns
    Split,
    /// `date time` in the first column
    Combined,
}

impl Layout {
    fn price_offset(self) -> usize {
        match self {
            Layout::Split => 2,
            Layout::Combined => 1,
        }
    }

    fn timestamp(self, record: &csv::StringRecord) -> String {
        match self {
            Layout::Split => format!(
                "{} {}",
                record.get(0).unwrap_or("").trim(),
                record.get(1).unwrap_or("").trim()
            ),
            Layout::Combined => record.get(0).unwrap_or("").trim().to_string(),
        }
    }
}

/// Pick `,` `;` or tab by frequency on the first line
pub fn sniff_delimiter(first_line: &str) -> u8 {
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, first_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// A header row names both a date and a time column
pub fn is_header(first_line: &str) -> bool {
    let lower = first_line.to_ascii_lowercase();
    lower.contains("date") && lower.contains("time")
}

pub fn detect_timestamp_format(value: &str) -> Option<&'static str> {
    TIMESTAMP_FORMATS
        .into_iter()
        .find(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

fn parse_price(field: Option<&str>) -> Option<f64> {
    let field = field?.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse CSV text into raw rows
pub fn parse_raw(text: &str) -> Result<RawTable, DataError> {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = sniff_delimiter(first_line);
    let has_header = is_header(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut detected: Option<(Layout, &'static str)> = None;

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line() as usize);

        let (layout, format) = match detected {
            Some(found) => found,
            None => {
                let layout = if record.get(0).is_some_and(|f| f.trim().contains(' ')) {
                    Layout::Combined
                } else {
                    Layout::Split
                };
                let stamp = layout.timestamp(&record);
                let format = detect_timestamp_format(&stamp)
                    .ok_or_else(|| DataError::UnknownTimestampFormat(stamp.clone()))?;
                debug!("Detected timestamp format {:?} ({:?} layout)", format, layout);
                detected = Some((layout, format));
                (layout, format)
            }
        };

        let stamp = layout.timestamp(&record);
        let utc = NaiveDateTime::parse_from_str(&stamp, format)
            .map_err(|_| DataError::InvalidTimestamp { line, value: stamp.clone() })?;

        let base = layout.price_offset();
        rows.push(RawBar {
            utc,
            open: parse_price(record.get(base)),
            high: parse_price(record.get(base + 1)),
            low: parse_price(record.get(base + 2)),
            close: parse_price(record.get(base + 3)),
            volume: parse_price(record.get(base + 4)),
        });
    }

    Ok(RawTable {
        rows,
        delimiter,
        has_header,
        timestamp_format: detected.map_or(TIMESTAMP_FORMATS[0], |(_, f)| f),
    })
}

pub fn read_raw_from(mut reader: impl Read) -> Result<RawTable, DataError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_raw(&text)
}

/// Read a `.csv` or `.csv.zst` file
pub fn read_raw(path: &Path) -> Result<RawTable, DataError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "zst") {
        let decoder = zstd::stream::Decoder::new(file)?;
        read_raw_from(BufReader::new(decoder))
    } else {
        read_raw_from(BufReader::new(file))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub bars: Vec<PriceBar>,
    /// Rows with a missing or non-numeric price
    pub dropped_incomplete: usize,
    /// Rows whose local timestamp repeated an earlier row
    pub dropped_duplicates: usize,
}

/// Convert complete rows to the analysis calendar, sort by local time and
/// drop repeated local timestamps (keeping the first).
///
/// With a daylight-saving zone the repeated hour at a fall-back transition
/// maps onto the same wall-clock minutes, so its second pass is dropped.
pub fn normalize(rows: &[RawBar], zone: &ZoneConverter) -> Normalized {
    let mut bars: Vec<PriceBar> = rows
        .iter()
        .filter_map(|row| {
            Some(PriceBar {
                timestamp: zone.from_utc(row.utc),
                open: row.open?,
                high: row.high?,
                low: row.low?,
                close: row.close?,
            })
        })
        .collect();
    let dropped_incomplete = rows.len() - bars.len();

    bars.sort_by_key(|b| b.local_time());
    let before = bars.len();
    bars.dedup_by_key(|b| b.local_time());

    Normalized {
        dropped_incomplete,
        dropped_duplicates: before - bars.len(),
        bars,
    }
}

#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub raw: RawTable,
    pub normalized: Normalized,
}

impl LoadedBars {
    pub fn into_bars(self) -> Vec<PriceBar> {
        self.normalized.bars
    }
}

pub fn load_bars(path: &Path, timezone: &TimeZoneStrategy) -> Result<LoadedBars, DataError> {
    let zone = timezone.resolve()?;
    let raw = read_raw(path)?;
    let normalized = normalize(&raw.rows, &zone);

    info!(
        "Loaded {} bars from {:?} ({} rows, calendar {})",
        normalized.bars.len(),
        path,
        raw.rows.len(),
        timezone
    );
    if normalized.dropped_incomplete > 0 {
        warn!("Dropped {} rows with missing prices", normalized.dropped_incomplete);
    }
    if normalized.dropped_duplicates > 0 {
        warn!("Dropped {} duplicate timestamps", normalized.dropped_duplicates);
    }
    if let (Some(first), Some(last)) = (normalized.bars.first(), normalized.bars.last()) {
        debug!("Period: {} to {}", first.local_time(), last.local_time());
    }

    Ok(LoadedBars { raw, normalized })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const MT_EXPORT: &str = "\
2025.05.06,02:00,1.10020,1.10080,1.10010,1.10050,0
2025.05.06,02:01,1.10050,1.10100,1.10040,1.10060,0
2025.05.06,02:02,1.10060,,1.10000,1.10030,0
";

    fn utc(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_metatrader_rows() {
        let table = parse_raw(MT_EXPORT).unwrap();
        assert_eq!(table.delimiter, b',');
        assert!(!table.has_header);
        assert_eq!(table.timestamp_format, "%Y.%m.%d %H:%M");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].utc, utc(2, 1));
        assert_eq!(table.rows[1].high, Some(1.10100));
        assert_eq!(table.rows[1].volume, Some(0.0));
        assert!(!table.rows[2].is_complete());
    }

    #[test]
    fn test_header_and_semicolon() {
        let text = "Date;Time;Open;High;Low;Close\n2025-05-06;02:00:00;1.1;1.2;1.0;1.1\n";
        let table = parse_raw(text).unwrap();
        assert_eq!(table.delimiter, b';');
        assert!(table.has_header);
        assert_eq!(table.timestamp_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].volume, None);
    }

    #[test]
    fn test_combined_timestamp_column() {
        let text = "2025-05-06 02:00,1.1,1.2,1.0,1.1\n";
        let table = parse_raw(text).unwrap();
        assert_eq!(table.rows[0].utc, utc(2, 0));
        assert_eq!(table.rows[0].close, Some(1.1));
    }

    #[test]
    fn test_unknown_and_invalid_timestamps() {
        assert!(matches!(
            parse_raw("06/05/2025,02:00,1,1,1,1\n"),
            Err(DataError::UnknownTimestampFormat(_))
        ));
        let text = "2025.05.06,02:00,1,1,1,1\n2025.05.06,xx:00,1,1,1,1\n";
        assert!(matches!(
            parse_raw(text),
            Err(DataError::InvalidTimestamp { line: 2, .. })
        ));
    }

    #[test]
    fn test_normalize_shifts_sorts_and_dedupes() {
        let mut rows = parse_raw(MT_EXPORT).unwrap().rows;
        rows.swap(0, 1);
        rows.push(rows[0]);

        let zone = TimeZoneStrategy::default().resolve().unwrap();
        let normalized = normalize(&rows, &zone);
        assert_eq!(normalized.dropped_incomplete, 1);
        assert_eq!(normalized.dropped_duplicates, 1);
        assert_eq!(normalized.bars.len(), 2);
        assert_eq!(normalized.bars[0].local_time(), utc(5, 0));
        assert_eq!(normalized.bars[1].local_time(), utc(5, 1));
    }

    #[test]
    fn test_load_plain_and_zstd_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("DAT_MT_EURUSD_M1_202505.csv");
        std::fs::write(&plain, MT_EXPORT).unwrap();

        let packed = dir.path().join("DAT_MT_EURUSD_M1_202505.csv.zst");
        let mut encoder = zstd::stream::Encoder::new(File::create(&packed).unwrap(), 3).unwrap();
        encoder.write_all(MT_EXPORT.as_bytes()).unwrap();
        encoder.finish().unwrap();

        for path in [plain, packed] {
            let loaded = load_bars(&path, &TimeZoneStrategy::default()).unwrap();
            assert_eq!(loaded.raw.rows.len(), 3);
            assert_eq!(loaded.normalized.bars.len(), 2);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_bars(Path::new("/nonexistent/file.csv"), &TimeZoneStrategy::default());
        assert!(matches!(err, Err(DataError::Io(_))));
    }
}
