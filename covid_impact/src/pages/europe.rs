//! European markets and macro series. Most sources are wide with one column per country; the
//! selected countries are melted into one line each.

use itertools::Itertools;
use polars::prelude::*;

use super::load_source;
use crate::chart::{BarChart, ChartSpec, ColorMap, LineChart, Palette, PieChart, Render, Titles};
use crate::config::Config;
use crate::controls::{ChartSlot, Control, Page, PageMeta, Selections};
use crate::error::{DashboardError, DashboardResult};
use crate::loader::require_columns;
use crate::reshape::{coerce_numeric, coerce_numeric_columns, melt, parse_dates, DATE_TEMPLATES};
use crate::COL;

/// Columns of the GDP source before the first country (time, EU aggregates and metadata)
const GDP_FIRST_COUNTRY: usize = 6;

/// A table with a time column followed by one numeric column per country
pub struct WideSeries {
    pub table: DataFrame,
    pub time: String,
    pub countries: Vec<String>,
}

impl WideSeries {
    /// The first column is time, `countries` are coerced to numbers
    pub fn new(table: DataFrame, countries: Vec<String>) -> DashboardResult<Self> {
        let time = table
            .get_column_names()
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| DashboardError::SchemaMismatch("time column".into()))?;
        let table = coerce_numeric_columns(table, &countries)?;
        Ok(Self {
            table,
            time,
            countries,
        })
    }

    /// Every column after the first is a country
    pub fn from_table(table: DataFrame) -> DashboardResult<Self> {
        let countries = table
            .get_column_names()
            .into_iter()
            .skip(1)
            .map(str::to_string)
            .collect();
        Self::new(table, countries)
    }

    fn chart(&self, selected: &[String], metric: &str, y_title: &str) -> DashboardResult<ChartSpec> {
        let selected = selected.iter().map(String::as_str).collect_vec();
        let long = melt(&self.table, &[&self.time], &selected, COL::COUNTRY, COL::VALUE)?;
        let titles = Titles::new(&format!("{metric} of {} Over Time", selected.join(", ")))
            .with_x(&self.time)
            .with_y(y_title);
        LineChart::new(&self.time, COL::VALUE, titles)
            .with_color(COL::COUNTRY)
            .render(&long)
    }

    /// `Country`, `GDP` for the row whose time is `year`
    fn year_snapshot(&self, year: i64, countries: &[String]) -> DashboardResult<DataFrame> {
        let times = self.table.column(&self.time)?.cast(&DataType::Int64)?;
        let row = times
            .i64()?
            .into_iter()
            .position(|time| time == Some(year))
            .ok_or_else(|| DashboardError::EmptyResult(format!("no row for {year}")))?;
        let values = countries
            .iter()
            .map(|country| Ok(self.table.column(country)?.f64()?.get(row)))
            .collect::<DashboardResult<Vec<Option<f64>>>>()?;
        Ok(DataFrame::new(vec![
            Series::new(COL::COUNTRY, countries),
            Series::new(COL::GDP, values),
        ])?)
    }
}

/// Source tables as read from disk
pub struct EuropeTables {
    pub stoxx: DataFrame,
    pub gdp: DataFrame,
    pub inflation: DataFrame,
    pub freight: DataFrame,
    pub tourism: DataFrame,
    pub debts: DataFrame,
    pub unemployment: DataFrame,
    pub poverty: DataFrame,
    pub support: DataFrame,
}

pub struct EuropeData {
    pub stoxx: DataFrame,
    pub gdp: WideSeries,
    pub pie_countries: Vec<String>,
    pub pie_colors: ColorMap,
    pub pie_years: (i64, i64),
    pub inflation: WideSeries,
    pub freight: WideSeries,
    pub tourism: WideSeries,
    pub debts: WideSeries,
    pub unemployment: WideSeries,
    pub poverty: WideSeries,
    /// `Country`, `Category`, `Value`
    pub support: DataFrame,
}

/// Prices are exported with thousands separators, e.g. "4,123.45"
fn parse_price(series: &Series) -> DashboardResult<Series> {
    match series.dtype() {
        DataType::String => {
            let stripped = series
                .str()?
                .into_iter()
                .map(|price| price.map(|p| p.replace(',', "")))
                .collect::<Vec<Option<String>>>();
            coerce_numeric(&Series::new(series.name(), stripped))
        }
        _ => coerce_numeric(series),
    }
}

impl EuropeData {
    pub fn from_tables(tables: EuropeTables, pie_years: (i64, i64)) -> DashboardResult<Self> {
        require_columns(&tables.stoxx, &[COL::DATE, COL::PRICE])?;
        let mut stoxx = parse_dates(&tables.stoxx, COL::DATE, &DATE_TEMPLATES)?;
        stoxx.with_column(parse_price(stoxx.column(COL::PRICE)?)?)?;
        let stoxx = stoxx.sort([COL::DATE], SortMultipleOptions::default())?;

        let names = tables
            .gdp
            .get_column_names()
            .into_iter()
            .map(str::to_string)
            .collect_vec();
        let pie_countries = names.iter().skip(GDP_FIRST_COUNTRY).cloned().collect_vec();
        let gdp_countries = names
            .get(1)
            .into_iter()
            .chain(&pie_countries)
            .cloned()
            .collect_vec();
        let gdp = WideSeries::new(tables.gdp, gdp_countries)?;
        let pie_colors = ColorMap::build(&pie_countries, &Palette::dark24());

        require_columns(&tables.support, &[COL::COUNTRY])?;
        let categories = tables
            .support
            .get_column_names()
            .into_iter()
            .filter(|name| *name != COL::COUNTRY)
            .collect_vec();
        let support = melt(
            &tables.support,
            &[COL::COUNTRY],
            &categories,
            COL::CATEGORY,
            COL::VALUE,
        )?;

        Ok(Self {
            stoxx,
            gdp,
            pie_countries,
            pie_colors,
            pie_years,
            inflation: WideSeries::from_table(tables.inflation)?,
            freight: WideSeries::from_table(tables.freight)?,
            tourism: WideSeries::from_table(tables.tourism)?,
            debts: WideSeries::from_table(tables.debts)?,
            unemployment: WideSeries::from_table(tables.unemployment)?,
            poverty: WideSeries::from_table(tables.poverty)?,
            support,
        })
    }

    fn pie(&self, year: i64) -> DashboardResult<ChartSpec> {
        let snapshot = self.gdp.year_snapshot(year, &self.pie_countries)?;
        PieChart::new(COL::COUNTRY, COL::GDP, &format!("GDP by Country ({year})"))
            .with_color_map(self.pie_colors.clone())
            .render(&snapshot)
    }
}

fn load(config: &Config) -> DashboardResult<EuropeData> {
    let europe = &config.europe;
    let tables = EuropeTables {
        stoxx: load_source(config, &europe.stoxx)?,
        gdp: load_source(config, &europe.gdp)?,
        inflation: load_source(config, &europe.inflation)?,
        freight: load_source(config, &europe.freight)?,
        tourism: load_source(config, &europe.tourism)?,
        debts: load_source(config, &europe.debts)?,
        unemployment: load_source(config, &europe.unemployment)?,
        poverty: load_source(config, &europe.poverty)?,
        support: load_source(config, &europe.support)?,
    };
    EuropeData::from_tables(tables, europe.pie_years)
}

fn controls(data: &EuropeData) -> Vec<Control> {
    let countries = |id: &str, label: &str, series: &WideSeries| {
        let default = series.countries.first().map(String::as_str).into_iter().collect_vec();
        Control::multi_select(id, label, series.countries.clone(), &default)
    };
    vec![
        countries("country-dropdown", "GDP", &data.gdp),
        countries("country-dropdown-inf", "Inflation", &data.inflation),
        countries("country-dropdown-freet", "Freight", &data.freight),
        countries("country-dropdown-tourism", "Tourism", &data.tourism),
        countries("country-dropdown-debts", "Debts", &data.debts),
        countries("country-dropdown-unemployment", "Unemployment", &data.unemployment),
        countries("country-dropdown-poverty", "Poverty", &data.poverty),
    ]
}

fn stoxx(data: &EuropeData, _: &Selections) -> DashboardResult<ChartSpec> {
    LineChart::new(
        COL::DATE,
        COL::PRICE,
        Titles::new("StockXX 600 Closing Prices Over Time"),
    )
    .render(&data.stoxx)
}

fn gdp(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.gdp.chart(
        &selections.many("country-dropdown")?,
        "GDP",
        "GDP (millions of euros)",
    )
}

fn gdp_pie_first(data: &EuropeData, _: &Selections) -> DashboardResult<ChartSpec> {
    data.pie(data.pie_years.0)
}

fn gdp_pie_second(data: &EuropeData, _: &Selections) -> DashboardResult<ChartSpec> {
    data.pie(data.pie_years.1)
}

fn inflation(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.inflation.chart(
        &selections.many("country-dropdown-inf")?,
        "Inflation",
        "Inflation rate (% of GDP)",
    )
}

fn freight(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.freight.chart(
        &selections.many("country-dropdown-freet")?,
        "Gross weight of goods transported",
        "Gross weight of goods transported (1000 tonnes)",
    )
}

fn tourism(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.tourism.chart(
        &selections.many("country-dropdown-tourism")?,
        "Tourism",
        "Arrivals at tourist accommodation establishments",
    )
}

fn debts(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.debts.chart(
        &selections.many("country-dropdown-debts")?,
        "Debts",
        "Debt (% of GDP)",
    )
}

fn unemployment(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.unemployment.chart(
        &selections.many("country-dropdown-unemployment")?,
        "Unemployment",
        "Unemployment Rate (%)",
    )
}

fn poverty(data: &EuropeData, selections: &Selections) -> DashboardResult<ChartSpec> {
    data.poverty.chart(
        &selections.many("country-dropdown-poverty")?,
        "Poverty",
        "At risk of poverty or social exclusion (%)",
    )
}

fn support(data: &EuropeData, _: &Selections) -> DashboardResult<ChartSpec> {
    let titles = Titles::new("Financial support by Country during Covid")
        .with_x("Country")
        .with_y("Amount (in % of GDP)");
    BarChart::new(COL::COUNTRY, COL::VALUE, titles)
        .with_color(COL::CATEGORY)
        .render(&data.support)
}

pub fn page() -> Page<EuropeData> {
    Page::new(
        PageMeta::new("europe", "Europe Dashboard", "/europe-dashboard"),
        load,
        controls,
        vec![
            ChartSlot::new("stoxx-graph", &[], stoxx),
            ChartSlot::new("gdp-graph", &["country-dropdown"], gdp),
            ChartSlot::new("gdp-pie-first", &[], gdp_pie_first),
            ChartSlot::new("gdp-pie-second", &[], gdp_pie_second),
            ChartSlot::new("inflation-graph", &["country-dropdown-inf"], inflation),
            ChartSlot::new("freet-graph", &["country-dropdown-freet"], freight),
            ChartSlot::new("tourism-graph", &["country-dropdown-tourism"], tourism),
            ChartSlot::new("debts-graph", &["country-dropdown-debts"], debts),
            ChartSlot::new(
                "unemployment-graph",
                &["country-dropdown-unemployment"],
                unemployment,
            ),
            ChartSlot::new("poverty-graph", &["country-dropdown-poverty"], poverty),
            ChartSlot::new("support-graph", &[], support),
        ],
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::controls::{ControlValue, PageController, PageState, Selections};

    fn series(first: &str) -> DataFrame {
        df!(
            "Time" => &[2019i64, 2020, 2021],
            first => &["1.5", ":", "2.5"],
            "Italy" => &["0.6", "-0.1", "1.9"]
        )
        .unwrap()
    }

    fn tables() -> EuropeTables {
        EuropeTables {
            stoxx: df!(
                "Date" => &["03/02/2020", "01/02/2020", "garbage"],
                "Price" => &["1,402.10", "1,398.50", "1.0"]
            )
            .unwrap(),
            gdp: df!(
                "Time" => &[2019i64, 2020, 2022],
                "EU27" => &[14_000.0, 13_400.0, 15_800.0],
                "EA20" => &[1.0, 1.0, 1.0],
                "Flag1" => &["p", "p", "p"],
                "Flag2" => &["p", "p", "p"],
                "Unit" => &["MEUR", "MEUR", "MEUR"],
                "Germany" => &[3_473.0, 3_403.0, 3_877.0],
                "France" => &[2_437.0, 2_317.0, 2_639.0]
            )
            .unwrap(),
            inflation: series("France"),
            freight: series("France"),
            tourism: series("France"),
            debts: series("France"),
            unemployment: series("France"),
            poverty: series("Spain"),
            support: df!(
                "Country" => &["France", "Italy"],
                "Grants" => &[5.1, 3.4],
                "Loans" => &[Some(10.2), None]
            )
            .unwrap(),
        }
    }

    fn data() -> EuropeData {
        EuropeData::from_tables(tables(), (2019, 2022)).unwrap()
    }

    #[test]
    fn stoxx_is_sorted_by_date_with_numeric_prices() {
        let data = data();
        assert_eq!(data.stoxx.height(), 2, "the unparseable date is dropped");
        let spec = stoxx(&data, &Selections::default()).unwrap();
        assert_eq!(spec.data[0].x, vec![json!("2020-01-02"), json!("2020-03-02")]);
        assert_eq!(spec.data[0].y, vec![json!(1398.5), json!(1402.1)]);
    }

    #[test]
    fn gdp_dropdown_skips_metadata_columns() {
        let data = data();
        assert_eq!(data.gdp.countries, vec!["EU27", "Germany", "France"]);
        assert_eq!(data.pie_countries, vec!["Germany", "France"]);
    }

    #[test]
    fn pies_share_colours() {
        let data = data();
        let first = gdp_pie_first(&data, &Selections::default()).unwrap();
        let second = gdp_pie_second(&data, &Selections::default()).unwrap();
        assert_eq!(first.layout.title, "GDP by Country (2019)");
        assert_eq!(second.layout.title, "GDP by Country (2022)");
        let colors = |spec: &ChartSpec| spec.data[0].marker.clone().unwrap().colors;
        assert_eq!(colors(&first), colors(&second));
        assert_eq!(colors(&first), vec!["#2E91E5", "#E15F99"]);
        assert_eq!(second.data[0].values, vec![json!(3877.0), json!(2639.0)]);
    }

    #[test]
    fn missing_pie_year_is_an_error_figure_only_for_that_chart() {
        let data = EuropeData::from_tables(tables(), (2019, 2023)).unwrap();
        assert!(matches!(
            data.pie(2023),
            Err(DashboardError::EmptyResult(_))
        ));
    }

    #[test]
    fn wide_series_lines_coerce_non_numeric_cells() {
        let data = data();
        let selections = Selections::from_defaults(&controls(&data));
        let spec = inflation(&data, &selections).unwrap();
        assert_eq!(spec.layout.title, "Inflation of France Over Time");
        assert_eq!(spec.data.len(), 1);
        assert_eq!(spec.data[0].y, vec![json!(1.5), json!(2.5)], "':' is missing");

        let mut selections = selections;
        selections.set("country-dropdown-poverty", ControlValue::many(&["Spain", "Italy"]));
        let spec = poverty(&data, &selections).unwrap();
        assert_eq!(spec.data.len(), 2);
        assert_eq!(spec.layout.title, "Poverty of Spain, Italy Over Time");
    }

    #[test]
    fn support_bars_are_grouped_by_category() {
        let data = data();
        let spec = support(&data, &Selections::default()).unwrap();
        assert_eq!(spec.layout.barmode.as_deref(), Some("group"));
        let names = spec.data.iter().map(|t| t.name.clone().unwrap()).collect_vec();
        assert_eq!(names, vec!["Grants", "Loans"]);
        assert_eq!(spec.data[1].len(), 1, "Italy has no loans");
    }

    #[test]
    fn missing_workbook_fails_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        let mut page = page();
        page.mount(&config);
        assert!(matches!(page.state(), PageState::Failed(_)));
    }
}
