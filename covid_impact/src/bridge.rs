//! Snapshot of a `DataFrame` as split-orientation JSON, so a table built when a page mounts can
//! be kept in session state and turned back into a table on each redraw.
//!
//! ```json
//! {"columns":["CountryName","Year"],"dtypes":["str","i32"],"index":[0],"data":[["France",2020]]}
//! ```

use chrono::NaiveDate;
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DashboardError, DashboardResult};
use crate::reshape::{date_series, series_dates};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column types of a snapshot. String, Boolean, Int32, Int64, Float64 and Date columns come back
/// with the same dtype. Narrower numeric columns are widened: UInt32 decodes as Int64 and Float32
/// as Float64. Any other dtype is encoded as `Str`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncodedType {
    Str,
    Bool,
    I32,
    I64,
    F64,
    Date,
}

impl EncodedType {
    pub(crate) fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => EncodedType::Bool,
            DataType::Int32 => EncodedType::I32,
            DataType::Int64 | DataType::UInt32 => EncodedType::I64,
            DataType::Float32 | DataType::Float64 => EncodedType::F64,
            DataType::Date => EncodedType::Date,
            _ => EncodedType::Str,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SplitTable {
    pub columns: Vec<String>,
    pub dtypes: Vec<EncodedType>,
    pub index: Vec<usize>,
    pub data: Vec<Vec<Value>>,
}

pub(crate) fn column_values(series: &Series, dtype: EncodedType) -> DashboardResult<Vec<Value>> {
    let values = match dtype {
        EncodedType::Str => {
            let s = series.cast(&DataType::String)?;
            let values = s.str()?.into_iter().map(|v| json!(v)).collect_vec();
            values
        }
        EncodedType::Bool => series.bool()?.into_iter().map(|v| json!(v)).collect_vec(),
        EncodedType::I32 => {
            let s = series.cast(&DataType::Int32)?;
            let values = s.i32()?.into_iter().map(|v| json!(v)).collect_vec();
            values
        }
        EncodedType::I64 => {
            let s = series.cast(&DataType::Int64)?;
            let values = s.i64()?.into_iter().map(|v| json!(v)).collect_vec();
            values
        }
        EncodedType::F64 => {
            let s = series.cast(&DataType::Float64)?;
            // JSON has no NaN or infinity, non-finite values decode as missing
            let values = s
                .f64()?
                .into_iter()
                .map(|v| v.filter(|f| f.is_finite()).map_or(Value::Null, |f| json!(f)))
                .collect_vec();
            values
        }
        EncodedType::Date => series_dates(series)?
            .into_iter()
            .map(|d| json!(d.map(|d| d.format(DATE_FORMAT).to_string())))
            .collect_vec(),
    };
    Ok(values)
}

/// Encode `df` row-major with explicit columns, dtypes and index. Floats round-trip bit-for-bit
/// except NaN and infinities, which become null.
pub fn encode(df: &DataFrame) -> DashboardResult<Vec<u8>> {
    let columns = df.get_columns();
    let dtypes = columns
        .iter()
        .map(|s| EncodedType::of(s.dtype()))
        .collect_vec();
    let by_column = columns
        .iter()
        .zip(&dtypes)
        .map(|(s, dtype)| column_values(s, *dtype))
        .collect::<DashboardResult<Vec<_>>>()?;
    let data = (0..df.height())
        .map(|row| by_column.iter().map(|values| values[row].clone()).collect_vec())
        .collect_vec();
    let table = SplitTable {
        columns: columns.iter().map(|s| s.name().to_string()).collect(),
        dtypes,
        index: (0..df.height()).collect(),
        data,
    };
    Ok(serde_json::to_vec(&table)?)
}

fn decode_error(reason: impl ToString) -> DashboardError {
    DashboardError::ParseError {
        path: "<snapshot>".into(),
        reason: reason.to_string(),
    }
}

fn typed<T>(
    values: &[&Value],
    column: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> DashboardResult<Vec<Option<T>>> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => Ok(None),
            other => extract(other)
                .map(Some)
                .ok_or_else(|| decode_error(format!("unexpected value {other} in '{column}'"))),
        })
        .collect()
}

fn decode_column(name: &str, dtype: EncodedType, values: &[&Value]) -> DashboardResult<Series> {
    let series = match dtype {
        EncodedType::Str => Series::new(name, typed(values, name, |v| v.as_str().map(String::from))?),
        EncodedType::Bool => Series::new(name, typed(values, name, Value::as_bool)?),
        EncodedType::I32 => Series::new(
            name,
            typed(values, name, |v| v.as_i64().and_then(|i| i32::try_from(i).ok()))?,
        ),
        EncodedType::I64 => Series::new(name, typed(values, name, Value::as_i64)?),
        EncodedType::F64 => Series::new(name, typed(values, name, Value::as_f64)?),
        EncodedType::Date => {
            let dates = typed(values, name, |v| {
                v.as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            })?;
            date_series(name, &dates)?
        }
    };
    Ok(series)
}

/// Inverse of `encode`
pub fn decode(bytes: &[u8]) -> DashboardResult<DataFrame> {
    let table: SplitTable = serde_json::from_slice(bytes)?;
    if table.columns.len() != table.dtypes.len() {
        return Err(decode_error("columns and dtypes differ in length"));
    }
    if table.index.len() != table.data.len() {
        return Err(decode_error("index and data differ in length"));
    }
    if let Some(row) = table.data.iter().find(|row| row.len() != table.columns.len()) {
        return Err(decode_error(format!(
            "row of width {} for {} columns",
            row.len(),
            table.columns.len()
        )));
    }

    let columns = table
        .columns
        .iter()
        .zip(&table.dtypes)
        .enumerate()
        .map(|(idx, (name, dtype))| {
            let values = table.data.iter().map(|row| &row[idx]).collect_vec();
            decode_column(name, *dtype, &values)
        })
        .collect::<DashboardResult<Vec<Series>>>()?;
    Ok(DataFrame::new(columns)?)
}
