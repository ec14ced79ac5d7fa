use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use ndarray::Array2;
use polars::prelude::*;

use fraudlab_domain::artifacts::TransactionRecord;
use fraudlab_domain::schema::{self, LABEL, OUTPUT_KEY_COLUMNS, TIMESTAMP};
use fraudlab_domain::{PipelineError, Result};

use crate::{table_err, writer};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A transaction table backed by a polars frame, validated on load.
#[derive(Debug, Clone)]
pub struct TransactionTable {
    frame: DataFrame,
    source: PathBuf,
}

impl TransactionTable {
    /// Reads a transaction CSV and checks the columns every job relies on:
    /// the pass-through key columns, parseable timestamps and 0/1 labels.
    pub fn load(path: &Path) -> Result<Self> {
        let table = Self::read_csv(path)?;
        table.require_columns(&OUTPUT_KEY_COLUMNS)?;
        table.timestamps()?;
        table.labels()?;
        tracing::info!(
            path = %path.display(),
            rows = table.height(),
            columns = table.frame.width(),
            "table loaded"
        );
        Ok(table)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        // Whole-number prefixes must not pin a column to i64.
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(table_err)?
            .finish()
            .map_err(table_err)?;
        Ok(Self {
            frame,
            source: path.to_path_buf(),
        })
    }

    pub fn from_records(records: &[TransactionRecord]) -> Result<Self> {
        let frame = DataFrame::new(vec![
            Series::new(
                schema::TXN_ID,
                records.iter().map(|r| r.txn_id.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                TIMESTAMP,
                records
                    .iter()
                    .map(|r| r.timestamp.format(TIMESTAMP_FORMAT).to_string())
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                schema::USER_ID,
                records.iter().map(|r| r.user_id.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                schema::MERCHANT_ID,
                records.iter().map(|r| r.merchant_id.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                schema::AMOUNT,
                records.iter().map(|r| r.amount).collect::<Vec<_>>(),
            ),
            Series::new(
                "merchant_risk",
                records.iter().map(|r| r.merchant_risk).collect::<Vec<_>>(),
            ),
            Series::new(
                "txn_count_24h",
                records.iter().map(|r| r.txn_count_24h).collect::<Vec<_>>(),
            ),
            Series::new(
                schema::DEVICE_TYPE,
                records.iter().map(|r| r.device_type.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                schema::COUNTRY,
                records.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                LABEL,
                records.iter().map(|r| i64::from(r.label_fraud)).collect::<Vec<_>>(),
            ),
        ])
        .map_err(table_err)?;
        Ok(Self {
            frame,
            source: PathBuf::from("<memory>"),
        })
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::schema(format!(
                "{} is missing required columns {missing:?}",
                self.source.display()
            )))
        }
    }

    fn column(&self, name: &str) -> Result<&Series> {
        self.frame.column(name).map_err(|_| {
            PipelineError::schema(format!(
                "column `{name}` is missing from {}",
                self.source.display()
            ))
        })
    }

    /// Values of a numeric column; nulls and non-finite values are rejected.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let series = self.column(name)?;
        let dtype = series.dtype();
        if !(dtype.is_numeric() || matches!(dtype, DataType::Boolean)) {
            return Err(PipelineError::schema(format!(
                "column `{name}` is not numeric ({dtype})"
            )));
        }
        let cast = series.cast(&DataType::Float64).map_err(table_err)?;
        let values = cast.f64().map_err(table_err)?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(PipelineError::schema(format!(
                    "column `{name}` has a missing or non-finite value at row {row}"
                ))),
            })
            .collect()
    }

    /// Row-major `rows × names.len()` matrix, columns in the order of `names`.
    pub fn feature_matrix(&self, names: &[String]) -> Result<Array2<f64>> {
        let mut matrix = Array2::<f64>::zeros((self.height(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let values = self.numeric_column(name)?;
            for (i, v) in values.into_iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        Ok(matrix)
    }

    pub fn labels(&self) -> Result<Vec<bool>> {
        self.numeric_column(LABEL)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                if v == 0.0 {
                    Ok(false)
                } else if v == 1.0 {
                    Ok(true)
                } else {
                    Err(PipelineError::schema(format!(
                        "`{LABEL}` must be 0 or 1, found {v} at row {row}"
                    )))
                }
            })
            .collect()
    }

    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        let series = self.column(TIMESTAMP)?;
        let values = series.str().map_err(|_| {
            PipelineError::schema(format!(
                "`{TIMESTAMP}` must be text, found {}",
                series.dtype()
            ))
        })?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, raw)| {
                raw.and_then(schema::parse_timestamp).ok_or_else(|| {
                    PipelineError::schema(format!(
                        "unparseable `{TIMESTAMP}` {:?} at row {row}",
                        raw.unwrap_or_default()
                    ))
                })
            })
            .collect()
    }

    /// A new table holding only `columns`, in that order.
    pub fn project(&self, columns: &[&str]) -> Result<Self> {
        self.require_columns(columns)?;
        let frame = self
            .frame
            .select(columns.iter().copied())
            .map_err(table_err)?;
        Ok(Self {
            frame,
            source: self.source.clone(),
        })
    }

    /// A new table with the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        let idx = IdxCa::from_vec("idx", rows.iter().map(|&r| r as IdxSize).collect());
        let frame = self.frame.take(&idx).map_err(table_err)?;
        Ok(Self {
            frame,
            source: self.source.clone(),
        })
    }

    pub fn with_f64_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.push_column(Series::new(name, values))
    }

    pub fn with_i64_column(&mut self, name: &str, values: Vec<i64>) -> Result<()> {
        self.push_column(Series::new(name, values))
    }

    fn push_column(&mut self, series: Series) -> Result<()> {
        if series.len() != self.height() {
            return Err(PipelineError::schema(format!(
                "column `{}` has {} values for {} rows",
                series.name(),
                series.len(),
                self.height()
            )));
        }
        self.frame.with_column(series).map_err(table_err)?;
        Ok(())
    }

    pub fn write_csv(&mut self, path: &Path) -> Result<()> {
        writer::write_csv(path, &mut self.frame)
    }
}
