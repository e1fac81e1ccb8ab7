//! Loading record snapshots from CSV (via Polars) or JSON files

use polars::prelude::*;
use std::path::Path;
use tracing::info;

use crate::error::DataError;
use crate::record::{Metric, Record, FEATURE_COUNT};

/// Load records from `path`, choosing the reader by extension: `.json` is read
/// as an array of loosely-typed report objects, anything else as CSV.
pub fn load_records(path: impl AsRef<Path>) -> crate::Result<Vec<Record>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let records = if is_json {
        load_json_records(path)?
    } else {
        load_csv_records(path)?
    };
    info!(path = %path.display(), n_records = records.len(), "records loaded");
    Ok(records)
}

/// Read a JSON array of report objects.
pub fn load_json_records(path: impl AsRef<Path>) -> crate::Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Record::from_json_array(&value)?)
}

/// Read a CSV file with one report per row.
pub fn load_csv_records(path: impl AsRef<Path>) -> crate::Result<Vec<Record>> {
    let df = LazyCsvReader::new(path.as_ref())
        .with_has_header(true)
        .finish()?
        .collect()?;
    records_from_frame(&df)
}

/// Convert a frame holding the eight metric columns into records.
///
/// Metric columns may use the snake_case name or the camelCase alias. The
/// optional `id`/`_id` column supplies record ids (row position otherwise) and
/// the optional `stockname` column supplies labels.
pub fn records_from_frame(df: &DataFrame) -> crate::Result<Vec<Record>> {
    let n_rows = df.height();
    let ids = optional_text(df, &["_id", "id"])?;
    let names = optional_text(df, &["stockname"])?;

    let ids: Vec<String> = (0..n_rows)
        .map(|row| {
            ids.as_ref()
                .and_then(|col| col.get(row))
                .map_or_else(|| row.to_string(), str::to_string)
        })
        .collect();

    let mut features = vec![[0.0; FEATURE_COUNT]; n_rows];
    for metric in Metric::ALL {
        let series = metric_column(df, metric)?;
        let values = series.cast(&DataType::Float64)?;
        let values = values.f64()?;
        let text = series.cast(&DataType::String)?;
        let text = text.str()?;

        for (row, value) in values.into_iter().enumerate() {
            features[row][metric.index()] = match value {
                Some(v) => v,
                None => {
                    return Err(match text.get(row) {
                        Some(raw) => DataError::NonNumeric {
                            record: ids[row].clone(),
                            metric: metric.name(),
                            value: raw.to_string(),
                        },
                        None => DataError::MissingFeature {
                            record: ids[row].clone(),
                            metric: metric.name(),
                        },
                    }
                    .into());
                }
            };
        }
    }

    let mut records = Vec::with_capacity(n_rows);
    for (row, (id, values)) in ids.into_iter().zip(features).enumerate() {
        let name = names
            .as_ref()
            .and_then(|col| col.get(row))
            .unwrap_or_default()
            .to_string();
        records.push(Record::new(id, name, values)?);
    }
    Ok(records)
}

fn metric_column(df: &DataFrame, metric: Metric) -> crate::Result<&Series> {
    if let Ok(series) = df.column(metric.name()) {
        return Ok(series);
    }
    if let Some(series) = metric.alias().and_then(|alias| df.column(alias).ok()) {
        return Ok(series);
    }
    Err(DataError::MissingColumn {
        column: metric.name().to_string(),
    }
    .into())
}

fn optional_text(df: &DataFrame, names: &[&str]) -> crate::Result<Option<StringChunked>> {
    for name in names {
        if let Ok(series) = df.column(name) {
            let text = series.cast(&DataType::String)?;
            return Ok(Some(text.str()?.clone()));
        }
    }
    Ok(None)
}
