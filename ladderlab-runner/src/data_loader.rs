//! Bar loading for the runner.
//!
//! Two sources:
//! 1. A CSV file with `timestamp,open,high,low,close` columns
//! 2. A seeded random walk (synthetic, for development and tests)
//!
//! Empty or unparsable price cells are loaded as NaN so the engine can report
//! them as data gaps; a bad timestamp or out-of-order rows fail the load.

use chrono::{NaiveDate, NaiveDateTime};
use ladderlab_core::Bar;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bars from '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: {timestamp} is not after the previous bar ({previous})")]
    OutOfOrder {
        row: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("no bars loaded")]
    Empty,

    #[error("synthetic start price must be positive, got {0}")]
    StartPrice(f64),
}

const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "datetime", "time", "date"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Load bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    read_bars(reader)
}

/// Load bars from any CSV source (headers required).
pub fn load_bars_reader<R: Read>(source: R) -> Result<Vec<Bar>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    read_bars(reader)
}

fn read_bars<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Bar>, LoadError> {
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))
    };
    let ts_col = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|&name| column(name).ok())
        .ok_or(LoadError::MissingColumn("timestamp"))?;
    let open_col = column("open")?;
    let high_col = column("high")?;
    let low_col = column("low")?;
    let close_col = column("close")?;

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 2; // 1-based, after the header
        let raw_ts = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            row,
            value: raw_ts.to_string(),
        })?;
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::OutOfOrder {
                    row,
                    timestamp,
                    previous: prev.timestamp,
                });
            }
        }
        let price = |col: usize| parse_price(record.get(col).unwrap_or_default());
        bars.push(Bar::new(
            timestamp,
            price(open_col),
            price(high_col),
            price(low_col),
            price(close_col),
        ));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    let gaps = bars.iter().filter(|b| b.is_void()).count();
    tracing::info!(bars = bars.len(), gaps, "loaded bars");
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Missing and malformed cells become NaN.
fn parse_price(raw: &str) -> f64 {
    if raw.is_empty() {
        return f64::NAN;
    }
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

/// Generate a seeded random walk of minute bars.
///
/// Same `(start_price, count, seed)` always yields the same bars. Prices are
/// cent-rounded.
pub fn generate_synthetic_bars(
    start_price: f64,
    count: usize,
    seed: u64,
) -> Result<Vec<Bar>, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    if !(start_price.is_finite() && start_price > 0.0) {
        return Err(LoadError::StartPrice(start_price));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let cents = |x: f64| ((x * 100.0).round() / 100.0).max(0.01);
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(count);
    let mut price = start_price;
    for i in 0..count {
        let open = cents(price * (1.0 + rng.gen_range(-0.002..0.002)));
        let close = cents(open * (1.0 + rng.gen_range(-0.006..0.006)));
        let high = cents(open.max(close) * (1.0 + rng.gen_range(0.0..0.003)));
        let low = cents(open.min(close) * (1.0 - rng.gen_range(0.0..0.003)));
        bars.push(Bar::new(
            start + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
        ));
        price = close;
    }
    Ok(bars)
}

/// Deterministic BLAKE3 hash over every bar's timestamp and OHLC bits.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
