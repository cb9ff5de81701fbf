//! Static US market and macro series.

use polars::prelude::*;

use super::load_source;
use crate::chart::{ChartSpec, LineChart, Render, Titles};
use crate::config::Config;
use crate::controls::{ChartSlot, Control, Page, PageMeta, Selections};
use crate::error::DashboardResult;
use crate::COL;

pub struct UsData {
    pub sp500: DataFrame,
    pub nasdaq: DataFrame,
    pub gdp: DataFrame,
    pub inflation: DataFrame,
    pub unemployment: DataFrame,
    pub debts: DataFrame,
}

fn load(config: &Config) -> DashboardResult<UsData> {
    let us = &config.us;
    Ok(UsData {
        sp500: load_source(config, &us.sp500)?,
        nasdaq: load_source(config, &us.nasdaq)?,
        gdp: load_source(config, &us.gdp)?,
        inflation: load_source(config, &us.inflation)?,
        unemployment: load_source(config, &us.unemployment)?,
        debts: load_source(config, &us.debts)?,
    })
}

fn controls(_: &UsData) -> Vec<Control> {
    vec![]
}

fn over_time(df: &DataFrame, y: &str, title: &str) -> DashboardResult<ChartSpec> {
    LineChart::new(COL::TIME, y, Titles::new(title)).render(df)
}

fn sp500(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(&data.sp500, COL::PRICE, "S&P 500 Closing Prices Over Time")
}

fn nasdaq(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(&data.nasdaq, COL::PRICE, "NASDAQ 100 Closing Prices Over Time")
}

fn gdp(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(&data.gdp, COL::GDP, "US GDP Over Time")
}

fn inflation(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(&data.inflation, COL::US_INFLATION, "US Inflation Over Time")
}

fn unemployment(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(
        &data.unemployment,
        COL::US_UNEMPLOYMENT,
        "US Unemployment Over Time",
    )
}

fn debts(data: &UsData, _: &Selections) -> DashboardResult<ChartSpec> {
    over_time(&data.debts, COL::US_DEBTS, "US Debt Over Time")
}

pub fn page() -> Page<UsData> {
    Page::new(
        PageMeta::new("us", "US Dashboard", "/US-dashboard"),
        load,
        controls,
        vec![
            ChartSlot::new("sp500-graph", &[], sp500),
            ChartSlot::new("nasdaq-graph", &[], nasdaq),
            ChartSlot::new("gdp-graph-us", &[], gdp),
            ChartSlot::new("inflation-graph-us", &[], inflation),
            ChartSlot::new("unemployment-graph-us", &[], unemployment),
            ChartSlot::new("debts-graph-us", &[], debts),
        ],
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::config::paths;
    use crate::controls::PageController;
    use crate::pages::global::tests::config_in;

    pub(crate) fn write_us(dir: &Path) {
        let files = [
            (paths::US_SP500, "Time,Price\n2019,3230.78\n2020,3756.07\n"),
            (paths::US_NASDAQ, "Time,Price\n2019,8733.07\n2020,12888.28\n"),
            (paths::US_GDP, "Time,GDP\n2019,21.5\n2020,21.3\n"),
            (paths::US_INFLATION, "Time,Inflation\n2019,1.8\n2020,1.2\n"),
            (paths::US_UNEMPLOYMENT, "Time,Unemployement_Rate\n2019,3.7\n2020,8.1\n"),
            (paths::US_DEBTS, "Time,Debts_Rate\n2019,108.5\n2020,133.9\n"),
        ];
        for (name, contents) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    #[test]
    fn static_charts_render_at_mount() {
        let dir = tempfile::tempdir().unwrap();
        write_us(dir.path());
        let mut page = page();
        let view = page.mount(&config_in(dir.path()));
        assert_eq!(view.error, None);
        assert!(view.controls.is_empty());
        assert_eq!(view.charts.len(), 6);
        assert!(view.charts.iter().all(|c| c.figure.data[0].len() == 2));
        assert_eq!(view.charts[4].figure.layout.title, "US Unemployment Over Time");
    }
}
