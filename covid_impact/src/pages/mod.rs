//! The dashboard pages. Each page loads its sources once, exposes its controls and renders its
//! charts from the loaded tables.

use itertools::Itertools;
use polars::prelude::*;

use crate::config::Config;
use crate::controls::{ControlOption, PageController};
use crate::error::DashboardResult;
use crate::loader::{load, require_columns, SourceSpec};
use crate::COL;

pub mod asia;
pub mod europe;
pub mod global;
pub mod policy;
pub mod us;

/// Every page, in navigation order
pub fn all() -> Vec<Box<dyn PageController>> {
    vec![
        Box::new(global::page()),
        Box::new(us::page()),
        Box::new(europe::page()),
        Box::new(asia::page()),
        Box::new(policy::page()),
    ]
}

pub(crate) fn load_source(config: &Config, source: &SourceSpec) -> DashboardResult<DataFrame> {
    load(&config.resolve(source))
}

/// Distinct present values of `column` in order of first appearance
pub(crate) fn distinct(df: &DataFrame, column: &str) -> DashboardResult<Vec<String>> {
    require_columns(df, &[column])?;
    let values = df.column(column)?.cast(&DataType::String)?;
    let values = values
        .str()?
        .into_iter()
        .flatten()
        .unique()
        .map(str::to_string)
        .collect();
    Ok(values)
}

/// "daily_new_cases" -> "Daily New Cases"
pub(crate) fn metric_title(metric: &str) -> String {
    metric
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

pub(crate) fn health_metric_options() -> Vec<ControlOption> {
    [COL::DAILY_NEW_CASES, COL::ACTIVE_CASES, COL::DAILY_NEW_DEATHS]
        .iter()
        .map(|metric| ControlOption::new(&metric_title(metric), metric))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_titles() {
        assert_eq!(metric_title("daily_new_cases"), "Daily New Cases");
        assert_eq!(metric_title("active_cases"), "Active Cases");
    }

    #[test]
    fn distinct_keeps_first_appearance() {
        let df = df!("c" => &[Some("b"), Some("a"), None, Some("b")]).unwrap();
        assert_eq!(distinct(&df, "c").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn page_ids_are_unique() {
        let pages = all();
        let ids = pages.iter().map(|p| p.meta().id.clone()).collect_vec();
        assert_eq!(ids, vec!["global", "us", "europe", "asia", "policy"]);
    }
}
