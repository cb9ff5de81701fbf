//! Grouped means, joins and completeness filtering over long tables.

use std::collections::HashSet;

use itertools::Itertools;
use log::debug;
use polars::prelude::*;

use crate::error::{DashboardError, DashboardResult};
use crate::loader::require_columns;
use crate::reshape::coerce_numeric;

/// Group by `group_keys` (keeping first-appearance order) and reduce `value` to its arithmetic
/// mean. Missing values are left out of the mean; a group with no present value keeps its row
/// with a missing mean.
pub fn aggregate_mean(
    long: &DataFrame,
    group_keys: &[&str],
    value: &str,
) -> DashboardResult<DataFrame> {
    require_columns(long, group_keys)?;
    require_columns(long, &[value])?;
    let mut df = long.select(group_keys.iter().copied().chain([value]))?;
    df.with_column(coerce_numeric(long.column(value)?)?)?;

    let keys = group_keys.iter().map(|key| col(key)).collect_vec();
    let aggregated = df
        .lazy()
        .group_by_stable(keys)
        .agg([col(value).mean()])
        .collect()?;
    debug!(
        "Aggregated {} rows into {} groups over [{}]",
        long.height(),
        aggregated.height(),
        group_keys.join(", ")
    );
    Ok(aggregated)
}

/// Left join on `keys`: every row of `left` is kept, columns from `right` are null without a
/// match.
pub fn left_join(left: &DataFrame, right: &DataFrame, keys: &[&str]) -> DashboardResult<DataFrame> {
    require_columns(left, keys)?;
    require_columns(right, keys)?;
    Ok(left.join(
        right,
        keys.to_vec(),
        keys.to_vec(),
        JoinArgs::new(JoinType::Left),
    )?)
}

/// Drop every row missing any of `columns`
pub fn drop_missing(df: &DataFrame, columns: &[&str]) -> DashboardResult<DataFrame> {
    require_columns(df, columns)?;
    let kept = df.drop_nulls(Some(columns))?;
    if kept.height() < df.height() {
        debug!(
            "Dropped {} incomplete rows over [{}]",
            df.height() - kept.height(),
            columns.join(", ")
        );
    }
    Ok(kept)
}

/// Fail with `DuplicateKeys` if any combination of `keys` appears on more than one row
pub fn ensure_unique(df: &DataFrame, keys: &[&str]) -> DashboardResult<()> {
    require_columns(df, keys)?;
    let key_columns = keys
        .iter()
        .map(|key| df.column(key).and_then(|s| s.cast(&DataType::String)))
        .collect::<PolarsResult<Vec<Series>>>()?;
    let key_columns = key_columns
        .iter()
        .map(|s| s.str())
        .collect::<PolarsResult<Vec<&StringChunked>>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    for row in 0..df.height() {
        let key = key_columns.iter().map(|ca| ca.get(row)).collect_vec();
        if !seen.insert(key.clone()) {
            return Err(DashboardError::DuplicateKeys {
                keys: keys.join(", "),
                example: key.iter().map(|k| k.unwrap_or("null")).join(", "),
            });
        }
    }
    Ok(())
}
