//! The world sources restricted to a fixed list of Asian countries. Only the health metric is
//! selectable.

use super::global::{health_chart, indicator_chart, load_world, WorldData};
use super::health_metric_options;
use crate::chart::ChartSpec;
use crate::config::Config;
use crate::controls::{ChartSlot, Control, Page, PageMeta, Selections};
use crate::error::DashboardResult;
use crate::COL;

pub struct AsiaData {
    pub world: WorldData,
    pub focus: Vec<String>,
}

impl AsiaData {
    /// " (China, Japan, South Korea)"
    fn title_suffix(&self) -> String {
        format!(" ({})", self.focus.join(", "))
    }
}

fn load(config: &Config) -> DashboardResult<AsiaData> {
    Ok(AsiaData {
        world: load_world(config)?,
        focus: config.asia_countries.clone(),
    })
}

fn controls(_: &AsiaData) -> Vec<Control> {
    vec![Control::radio(
        "health-metric-radio-asia",
        "Health metric",
        health_metric_options(),
        COL::DAILY_NEW_CASES,
    )]
}

fn gdp(data: &AsiaData, _: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.world.gdp,
        &data.focus,
        data.world.min_year,
        "GDP Growth (%)",
        &format!("GDP Growth Rate Over Time{}", data.title_suffix()),
    )
}

fn inflation(data: &AsiaData, _: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.world.inflation,
        &data.focus,
        data.world.min_year,
        "Inflation (%)",
        &format!("Inflation Rate Over Time{}", data.title_suffix()),
    )
}

fn unemployment(data: &AsiaData, _: &Selections) -> DashboardResult<ChartSpec> {
    indicator_chart(
        &data.world.unemployment,
        &data.focus,
        data.world.min_year,
        "Unemployment (%)",
        &format!("Unemployment Rate Over Time{}", data.title_suffix()),
    )
}

fn health(data: &AsiaData, selections: &Selections) -> DashboardResult<ChartSpec> {
    health_chart(
        &data.world.health,
        &data.focus,
        data.world.min_year,
        selections.one("health-metric-radio-asia")?,
        &data.title_suffix(),
    )
}

pub fn page() -> Page<AsiaData> {
    Page::new(
        PageMeta::new("asia", "Asia Economic & Health Dashboard", "/asia-dashboard"),
        load,
        controls,
        vec![
            ChartSlot::new("gdp-graph-asia", &[], gdp),
            ChartSlot::new("inflation-graph-asia", &[], inflation),
            ChartSlot::new("unemployment-graph-asia", &[], unemployment),
            ChartSlot::new("health-graph-asia", &["health-metric-radio-asia"], health),
        ],
    )
}
