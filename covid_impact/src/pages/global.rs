//! World Bank indicators and daily health statistics for any selection of countries.

use itertools::Itertools;
use polars::prelude::*;

use super::{distinct, health_metric_options, load_source, metric_title};
use crate::chart::{ChartSpec, LineChart, Render, Titles};
use crate::config::Config;
use crate::controls::{ChartSlot, Control, Page, PageMeta, Selections};
use crate::error::DashboardResult;
use crate::loader::{normalize_column_names, require_columns};
use crate::reshape::{
    filter_in, filter_min_year, melt, parse_dates, period_columns, PeriodSelector, DATE_TEMPLATES,
};
use crate::COL;

const GDP_LABEL: &str = "GDP Growth (%)";
const INFLATION_LABEL: &str = "Inflation (%)";
const UNEMPLOYMENT_LABEL: &str = "Unemployment (%)";

const DEFAULT_COUNTRIES: [&str; 3] = ["France", "India", "United States"];
const DEFAULT_HEALTH_COUNTRIES: [&str; 3] = ["India", "France", "United States"];

/// Tables shared by the world and Asia pages
pub struct WorldData {
    pub gdp: DataFrame,
    pub inflation: DataFrame,
    pub unemployment: DataFrame,
    pub health: DataFrame,
    pub min_year: i32,
    pub countries: Vec<String>,
    pub health_countries: Vec<String>,
}

pub(crate) fn load_world(config: &Config) -> DashboardResult<WorldData> {
    let world = &config.world;
    let gdp = load_source(config, &world.gdp)?;
    let inflation = load_source(config, &world.inflation)?;
    let unemployment = load_source(config, &world.unemployment)?;
    for df in [&gdp, &inflation, &unemployment] {
        require_columns(df, &[COL::COUNTRY_NAME])?;
    }

    let health = normalize_column_names(load_source(config, &world.health)?)?;
    let health = parse_dates(&health, COL::HEALTH_DATE, &DATE_TEMPLATES)?;
    require_columns(&health, &[COL::HEALTH_COUNTRY])?;

    Ok(WorldData {
        countries: distinct(&gdp, COL::COUNTRY_NAME)?,
        health_countries: distinct(&health, COL::HEALTH_COUNTRY)?,
        gdp,
        inflation,
        unemployment,
        health,
        min_year: config.min_year,
    })
}

/// Yearly values of a World Bank indicator from `min_year` on, one line per country
pub(crate) fn indicator_chart(
    wide: &DataFrame,
    countries: &[String],
    min_year: i32,
    value_label: &str,
    title: &str,
) -> DashboardResult<ChartSpec> {
    let filtered = filter_in(wide, COL::COUNTRY_NAME, countries)?;
    let years = period_columns(&filtered, &PeriodSelector::years_from(min_year));
    let years = years.iter().map(String::as_str).collect_vec();
    let long = melt(&filtered, &[COL::COUNTRY_NAME], &years, COL::YEAR, value_label)?;
    LineChart::new(COL::YEAR, value_label, Titles::new(title))
        .with_color(COL::COUNTRY_NAME)
        .render(&long)
}

/// Daily `metric` from `min_year` on, one line per country
pub(crate) fn health_chart(
    health: &DataFrame,
    countries: &[String],
    min_year: i32,
    metric: &str,
    title_suffix: &str,
) -> DashboardResult<ChartSpec> {
    require_columns(health, &[metric])?;
    let filtered = filter_in(health, COL::HEALTH_COUNTRY, countries)?;
    let filtered = filter_min_year(&filtered, COL::HEALTH_DATE, min_year)?;
    let label = metric_title(metric);
    let titles = Titles::new(&format!("{label} Over Time{title_suffix}"))
        .with_x("Date")
        .with_y(&label);
    LineChart::new(COL::HEALTH_DATE, metric, titles)
        .with_color(COL::HEALTH_COUNTRY)
        .render(&filtered)
}

fn controls(data: &WorldData) -> Vec<Control> {
    let countries = |id: &str, label: &str| {
        Control::multi_select(id, label, data.countries.clone(), &DEFAULT_COUNTRIES)
    };
    vec![
        countries("country-dropdown-gdp-global", "GDP countries"),
        countries("country-dropdown-inflation-global", "Inflation countries"),
        countries("country-dropdown-unemployment-global", "Unemployment countries"),
        Control::multi_select(
            "country-dropdown-health-global",
            "Health countries",
            data.health_countries.clone(),
            &DEFAULT_HEALTH_COUNTRIES,
        ),
        Control::radio(
            "health-metric-radio-global",
            "Health metric",
            health_metric_options(),
            COL::DAILY_NEW_CASES,
        ),
    ]
}

fn gdp(data: &WorldData, selections: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.gdp,
        &selections.many("country-dropdown-gdp-global")?,
        data.min_year,
        GDP_LABEL,
        "GDP Growth Rate Over Time",
    )
}

fn inflation(data: &WorldData, selections: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.inflation,
        &selections.many("country-dropdown-inflation-global")?,
        data.min_year,
        INFLATION_LABEL,
        "Inflation Rate Over Time",
    )
}

fn unemployment(data: &WorldData, selections: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.unemployment,
        &selections.many("country-dropdown-unemployment-global")?,
        data.min_year,
        UNEMPLOYMENT_LABEL,
        "Unemployment Rate Over Time",
    )
}

fn health(data: &WorldData, selections: &Selections) -> DashboardResult<ChartSpec> {
    health_chart(
        &data.health,
        &selections.many("country-dropdown-health-global")?,
        data.min_year,
        selections.one("health-metric-radio-global")?,
        "",
    )
}

pub fn page() -> Page<WorldData> {
    Page::new(
        PageMeta::new(
            "global",
            "Global Economic & Health Dashboard",
            "/global-dashboard",
        ),
        load_world,
        controls,
        vec![
            ChartSlot::new("gdp-graph-global", &["country-dropdown-gdp-global"], gdp),
            ChartSlot::new(
                "inflation-graph-global",
                &["country-dropdown-inflation-global"],
                inflation,
            ),
            ChartSlot::new(
                "unemployment-graph-global",
                &["country-dropdown-unemployment-global"],
                unemployment,
            ),
            ChartSlot::new(
                "health-graph-global",
                &["country-dropdown-health-global", "health-metric-radio-global"],
                health,
            ),
        ],
    )
}
