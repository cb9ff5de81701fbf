//! Wide to long reshaping, numeric coercion and period parsing.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use itertools::{izip, Itertools};
use log::{debug, warn};
use polars::prelude::*;
use regex::Regex;

use crate::error::{DashboardError, DashboardResult};
use crate::loader::require_columns;
use crate::COL;

/// Days between 0001-01-01 and the unix epoch, as counted by `NaiveDate::num_days_from_ce`
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Template of the dates heading the stringency index columns, e.g. "01Jan2020"
pub const STRINGENCY_DATE_TEMPLATE: &str = "%d%b%Y";

/// Templates tried in order when parsing free-form date columns
pub const DATE_TEMPLATES: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%b %d, %Y"];

/// Build a polars `Date` series from chrono dates
pub(crate) fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> DashboardResult<Series> {
    let days = dates
        .iter()
        .map(|date| date.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
        .collect::<Vec<Option<i32>>>();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}

/// Read a polars `Date` series back into chrono dates
pub(crate) fn series_dates(series: &Series) -> DashboardResult<Vec<Option<NaiveDate>>> {
    let days = series.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|day| day.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
        .collect())
}

/// Column-name predicate picking the period columns of a wide table.
#[derive(Debug, Clone)]
pub enum PeriodSelector {
    /// All-digit names, optionally restricted to an inclusive year window
    Years { min: Option<i32>, max: Option<i32> },
    /// Names matching a pattern, e.g. day-month-year headings
    Pattern(Regex),
}

impl PeriodSelector {
    pub fn years_from(min: i32) -> Self {
        PeriodSelector::Years {
            min: Some(min),
            max: None,
        }
    }

    pub fn years_between(min: i32, max: i32) -> Self {
        PeriodSelector::Years {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Headings such as "01Jan2020"
    pub fn day_month_year() -> Self {
        // Unwrap: the pattern is a valid constant regex
        PeriodSelector::Pattern(Regex::new(r"^\d{2}[A-Za-z]{3}\d{4}$").unwrap())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            PeriodSelector::Years { min, max } => {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                    return false;
                }
                match name.parse::<i32>() {
                    Ok(year) => {
                        min.map_or(true, |min| year >= min) && max.map_or(true, |max| year <= max)
                    }
                    Err(_) => false,
                }
            }
            PeriodSelector::Pattern(regex) => regex.is_match(name),
        }
    }
}

/// Names of the columns of `df` selected by `selector`, in column order
pub fn period_columns(df: &DataFrame, selector: &PeriodSelector) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| selector.matches(name))
        .map(|name| name.to_string())
        .collect()
}

/// Cast to `Float64`; tokens that do not parse as a finite number become null.
pub fn coerce_numeric(series: &Series) -> DashboardResult<Series> {
    let coerced = match series.dtype() {
        DataType::String => Series::new(
            series.name(),
            series
                .str()?
                .into_iter()
                .map(|token| {
                    token
                        .and_then(|t| t.trim().parse::<f64>().ok())
                        .filter(|f| f.is_finite())
                })
                .collect::<Vec<Option<f64>>>(),
        ),
        _ => series.cast(&DataType::Float64)?,
    };
    Ok(coerced)
}

/// Apply `coerce_numeric` to each of `columns` in place
pub fn coerce_numeric_columns(mut df: DataFrame, columns: &[String]) -> DashboardResult<DataFrame> {
    for name in columns {
        let coerced = coerce_numeric(df.column(name)?)?;
        df.with_column(coerced)?;
    }
    Ok(df)
}

/// Reshape `df` so each of `value_columns` becomes rows of (`variable_label`, `value_label`),
/// with the `id_columns` repeated. The value column is always `Float64`: each value column goes
/// through `coerce_numeric`, so text cells that are not numbers (e.g. "N/A") become null.
pub fn melt(
    df: &DataFrame,
    id_columns: &[&str],
    value_columns: &[&str],
    variable_label: &str,
    value_label: &str,
) -> DashboardResult<DataFrame> {
    require_columns(df, id_columns)?;
    require_columns(df, value_columns)?;
    let ids = df.select(id_columns.iter().copied())?;

    let mut long: Option<DataFrame> = None;
    for name in value_columns {
        let mut chunk = ids.clone();
        chunk.with_column(Series::new(variable_label, vec![*name; df.height()]))?;
        chunk.with_column(coerce_numeric(df.column(name)?)?.with_name(value_label))?;
        match long.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&chunk)?;
            }
            None => long = Some(chunk),
        }
    }
    let long = match long {
        Some(mut long) => {
            long.align_chunks();
            long
        }
        None => {
            let mut empty = ids.clear();
            empty.with_column(Series::new_empty(variable_label, &DataType::String))?;
            empty.with_column(Series::new_empty(value_label, &DataType::Float64))?;
            empty
        }
    };
    debug!(
        "Melted {} value columns into {} rows",
        value_columns.len(),
        long.height()
    );
    Ok(long)
}

/// Inverse of `melt`: one row per distinct `index`, one column per distinct `variable` (both in
/// order of first appearance). The index column is returned as strings.
pub fn pivot(
    long: &DataFrame,
    index: &str,
    variable: &str,
    value: &str,
) -> DashboardResult<DataFrame> {
    require_columns(long, &[index, variable, value])?;
    let index_values = long.column(index)?.cast(&DataType::String)?;
    let variable_values = long.column(variable)?.cast(&DataType::String)?;
    let values = coerce_numeric(long.column(value)?)?;

    let mut rows: Vec<String> = vec![];
    let mut row_pos: HashMap<String, usize> = HashMap::new();
    let mut columns: Vec<String> = vec![];
    let mut column_pos: HashMap<String, usize> = HashMap::new();
    let mut cells: HashMap<(usize, usize), Option<f64>> = HashMap::new();

    for (idx, var, val) in izip!(
        index_values.str()?,
        variable_values.str()?,
        values.f64()?
    ) {
        let (Some(idx), Some(var)) = (idx, var) else {
            continue;
        };
        let r = *row_pos.entry(idx.to_string()).or_insert_with(|| {
            rows.push(idx.to_string());
            rows.len() - 1
        });
        let c = *column_pos.entry(var.to_string()).or_insert_with(|| {
            columns.push(var.to_string());
            columns.len() - 1
        });
        if cells.insert((r, c), val).is_some() {
            return Err(DashboardError::DuplicateKeys {
                keys: [index, variable].join(", "),
                example: format!("{idx}, {var}"),
            });
        }
    }

    let mut series = vec![Series::new(index, &rows)];
    for (c, name) in columns.iter().enumerate() {
        series.push(Series::new(
            name,
            (0..rows.len())
                .map(|r| cells.get(&(r, c)).copied().flatten())
                .collect::<Vec<Option<f64>>>(),
        ));
    }
    Ok(DataFrame::new(series)?)
}

fn keep_rows(df: &DataFrame, keep: &[bool]) -> DashboardResult<DataFrame> {
    let mask = Series::new("mask", keep);
    Ok(df.filter(mask.bool()?)?)
}

/// Parse `column` with `template` and append `Date`, `Year` and `Year_Month` ("YYYY-MM")
/// columns. Rows whose date does not parse are dropped.
pub fn parse_periods(df: &DataFrame, column: &str, template: &str) -> DashboardResult<DataFrame> {
    require_columns(df, &[column])?;
    let raw = df.column(column)?.cast(&DataType::String)?;
    let parsed = raw
        .str()?
        .into_iter()
        .map(|token| token.and_then(|t| NaiveDate::parse_from_str(t.trim(), template).ok()))
        .collect_vec();
    let keep = parsed.iter().map(Option::is_some).collect_vec();
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        warn!("Dropped {dropped} rows with unparseable dates in '{column}'");
    }

    let mut out = keep_rows(df, &keep)?;
    let dates = parsed.into_iter().flatten().collect_vec();
    out.with_column(date_series(
        COL::DATE,
        &dates.iter().copied().map(Some).collect_vec(),
    )?)?;
    out.with_column(Series::new(
        COL::YEAR,
        dates.iter().map(|d| d.year()).collect::<Vec<i32>>(),
    ))?;
    out.with_column(Series::new(
        COL::YEAR_MONTH,
        dates
            .iter()
            .map(|d| d.format("%Y-%m").to_string())
            .collect::<Vec<String>>(),
    ))?;
    Ok(out)
}

fn parse_with_templates(token: &str, templates: &[&str]) -> Option<NaiveDate> {
    let token = token.trim();
    templates
        .iter()
        .find_map(|template| NaiveDate::parse_from_str(token, template).ok())
}

/// Replace `column` with a `Date` column, trying each template in turn. Rows that match no
/// template are dropped.
pub fn parse_dates(df: &DataFrame, column: &str, templates: &[&str]) -> DashboardResult<DataFrame> {
    require_columns(df, &[column])?;
    let series = df.column(column)?;
    let parsed = if series.dtype() == &DataType::Date {
        series_dates(series)?
    } else {
        let raw = series.cast(&DataType::String)?;
        let parsed = raw
            .str()?
            .into_iter()
            .map(|token| token.and_then(|t| parse_with_templates(t, templates)))
            .collect_vec();
        parsed
    };
    let keep = parsed.iter().map(Option::is_some).collect_vec();
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        warn!("Dropped {dropped} rows with unparseable dates in '{column}'");
    }
    let mut out = keep_rows(df, &keep)?;
    let dates = parsed.into_iter().filter(Option::is_some).collect_vec();
    out.with_column(date_series(column, &dates)?)?;
    Ok(out)
}

/// Keep rows whose `column` value is one of `values`
pub fn filter_in(df: &DataFrame, column: &str, values: &[String]) -> DashboardResult<DataFrame> {
    require_columns(df, &[column])?;
    let wanted = Series::new("values", values.to_vec());
    Ok(df
        .clone()
        .lazy()
        .filter(col(column).cast(DataType::String).is_in(lit(wanted)))
        .collect()?)
}

/// Keep rows whose date in `column` falls in `min_year` or later
pub fn filter_min_year(df: &DataFrame, column: &str, min_year: i32) -> DashboardResult<DataFrame> {
    require_columns(df, &[column])?;
    let keep = series_dates(df.column(column)?)?
        .into_iter()
        .map(|date| date.map_or(false, |d| d.year() >= min_year))
        .collect_vec();
    keep_rows(df, &keep)
}
