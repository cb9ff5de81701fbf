//! Stringency vs. unemployment: the monthly mean stringency index of each target country, joined
//! with its yearly unemployment rate and its income group.

use itertools::Itertools;
use log::info;
use polars::prelude::*;

use crate::aggregate::{aggregate_mean, drop_missing, ensure_unique, left_join};
use crate::config::{Classification, Config};
use crate::error::{DashboardError, DashboardResult};
use crate::loader::{load, require_columns};
use crate::reshape::{
    filter_in, melt, parse_periods, period_columns, PeriodSelector, STRINGENCY_DATE_TEMPLATE,
};
use crate::COL;

/// Identifying columns of the stringency workbook
const STRINGENCY_IDS: [&str; 5] = [
    COL::POLICY_COUNTRY_CODE,
    COL::POLICY_COUNTRY_NAME,
    COL::POLICY_REGION_CODE,
    COL::POLICY_REGION_NAME,
    COL::POLICY_JURISDICTION,
];

const WORLD_BANK_IDS: [&str; 4] = [
    COL::COUNTRY_NAME,
    COL::COUNTRY_CODE,
    COL::INDICATOR_NAME,
    COL::INDICATOR_CODE,
];

/// Inclusive range of years taken from the unemployment source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    fn column_names(&self) -> Vec<String> {
        (self.start..=self.end).map(|year| year.to_string()).collect()
    }
}

/// `CountryName`, `IncomeGroup_Custom`
pub fn classification_table(classification: &[Classification]) -> DashboardResult<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(
            COL::ENTITY,
            classification.iter().map(|c| c.country.as_str()).collect_vec(),
        ),
        Series::new(
            COL::INCOME_GROUP,
            classification
                .iter()
                .map(|c| c.income_group.as_str())
                .collect_vec(),
        ),
    ])?)
}

fn rename(mut df: DataFrame, from: &str, to: &str) -> DashboardResult<DataFrame> {
    df.rename(from, to)?;
    Ok(df)
}

/// Mean stringency index per (`CountryName`, `Year_Month`, `Year`) for the `targets`
pub fn monthly_stringency(wide: &DataFrame, targets: &[String]) -> DashboardResult<DataFrame> {
    require_columns(wide, &STRINGENCY_IDS)?;
    let days = period_columns(wide, &PeriodSelector::day_month_year());
    let days = days.iter().map(String::as_str).collect_vec();
    let long = melt(
        wide,
        &STRINGENCY_IDS,
        &days,
        COL::DATE_RAW,
        COL::STRINGENCY_INDEX,
    )?;
    let long = parse_periods(&long, COL::DATE_RAW, STRINGENCY_DATE_TEMPLATE)?;
    let long = drop_missing(&long, &[COL::STRINGENCY_INDEX])?;
    let long = rename(long, COL::POLICY_COUNTRY_NAME, COL::ENTITY)?;
    let long = filter_in(&long, COL::ENTITY, targets)?;
    aggregate_mean(
        &long,
        &[COL::ENTITY, COL::YEAR_MONTH, COL::YEAR],
        COL::STRINGENCY_INDEX,
    )
}

/// `CountryName`, `Year` (Int32), `Unemployment_Rate` for the `targets` over `years`. Each
/// (country, year) must appear once.
pub fn yearly_unemployment(
    wide: &DataFrame,
    targets: &[String],
    years: YearRange,
) -> DashboardResult<DataFrame> {
    require_columns(wide, &WORLD_BANK_IDS)?;
    let year_columns = years.column_names();
    let year_columns = year_columns.iter().map(String::as_str).collect_vec();
    let long = melt(
        wide,
        &WORLD_BANK_IDS,
        &year_columns,
        COL::YEAR,
        COL::UNEMPLOYMENT_RATE,
    )?;
    let mut long = drop_missing(&long, &[COL::UNEMPLOYMENT_RATE])?;

    let parsed = long
        .column(COL::YEAR)?
        .str()?
        .into_iter()
        .map(|year| year.and_then(|y| y.parse::<i32>().ok()))
        .collect::<Vec<Option<i32>>>();
    long.with_column(Series::new(COL::YEAR, parsed))?;

    let long = rename(long, COL::COUNTRY_NAME, COL::ENTITY)?;
    let long = filter_in(&long, COL::ENTITY, targets)?.select([
        COL::ENTITY,
        COL::YEAR,
        COL::UNEMPLOYMENT_RATE,
    ])?;
    ensure_unique(&long, &[COL::ENTITY, COL::YEAR])?;
    Ok(long)
}

/// Join the monthly stringency and yearly unemployment of the classified countries, keeping only
/// rows where both are known, and label each row with its income group.
pub fn build_analysis_table(
    stringency_wide: &DataFrame,
    unemployment_wide: &DataFrame,
    classification: &[Classification],
    years: YearRange,
) -> DashboardResult<DataFrame> {
    let targets = classification
        .iter()
        .map(|c| c.country.clone())
        .collect_vec();
    let policy = monthly_stringency(stringency_wide, &targets)?;
    let unemployment = yearly_unemployment(unemployment_wide, &targets, years)?;

    let joined = left_join(&policy, &unemployment, &[COL::ENTITY, COL::YEAR])?;
    let complete = drop_missing(&joined, &[COL::UNEMPLOYMENT_RATE, COL::STRINGENCY_INDEX])?;
    let labelled = left_join(
        &complete,
        &classification_table(classification)?,
        &[COL::ENTITY],
    )?;
    if labelled.height() == 0 {
        return Err(DashboardError::EmptyResult(
            "no country has both a stringency index and an unemployment rate, check that country \
             names match across sources"
                .into(),
        ));
    }
    info!(
        "Analysis table ready with {} observations",
        labelled.height()
    );
    Ok(labelled)
}

/// Read both policy sources and build the analysis table
pub fn load_analysis_table(config: &Config) -> DashboardResult<DataFrame> {
    let policy = &config.policy;
    let stringency = load(&config.resolve(&policy.stringency))?;
    let unemployment = load(&config.resolve(&policy.unemployment))?;
    build_analysis_table(
        &stringency,
        &unemployment,
        &policy.classification,
        YearRange {
            start: policy.start_year,
            end: policy.end_year,
        },
    )
}
