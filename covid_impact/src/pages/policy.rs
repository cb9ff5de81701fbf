//! Stringency vs. unemployment. The analysis table is built once when the page mounts and kept as
//! an encoded snapshot; every redraw decodes it.

use polars::prelude::*;

use crate::analysis::load_analysis_table;
use crate::bridge::{decode, encode};
use crate::chart::{ChartSpec, Render, ScatterChart, SizeMapping, Titles};
use crate::config::Config;
use crate::controls::{ChartSlot, Control, ControlOption, LoadFn, Page, PageMeta, Selections};
use crate::error::DashboardResult;
use crate::COL;

const X_AXIS: &str = "x-axis-selector";
const COLOR: &str = "color-selector";
const ANIMATION: &str = "animation-selector";

/// Encoded analysis table
pub type Snapshot = Vec<u8>;

fn load(config: &Config) -> DashboardResult<Snapshot> {
    encode(&load_analysis_table(config)?)
}

fn controls(_: &Snapshot) -> Vec<Control> {
    vec![
        Control::dropdown(
            X_AXIS,
            "1. Indicateur Politique (Axe X)",
            [ControlOption::new(
                "Indice de Rigueur (OxCGRT)",
                COL::STRINGENCY_INDEX,
            )],
            COL::STRINGENCY_INDEX,
        ),
        Control::dropdown(
            COLOR,
            "2. Regroupement (Couleur)",
            [
                ControlOption::new("Groupe de Revenu", COL::INCOME_GROUP),
                ControlOption::new("Pays", COL::ENTITY),
                ControlOption::new("Année", "Year:nominal"),
            ],
            COL::INCOME_GROUP,
        ),
        Control::dropdown(
            ANIMATION,
            "3. Animation Temporelle",
            [
                ControlOption::new("Année-Mois", COL::YEAR_MONTH),
                ControlOption::new("Année", COL::YEAR),
            ],
            COL::YEAR_MONTH,
        ),
    ]
}

/// A colour choice may carry a type hint after ':', e.g. "Year:nominal"
fn color_field(choice: &str) -> &str {
    choice.split(':').next().unwrap_or(choice)
}

fn scatter(snapshot: &Snapshot, selections: &Selections) -> DashboardResult<ChartSpec> {
    let mut df = decode(snapshot)?;
    let years = df.column(COL::YEAR)?.cast(&DataType::Int32)?;
    let years = years.i32()?;
    let title = format!(
        "Rigueur Politique vs. Taux de Chômage ({} - {})",
        years.min().map_or(String::new(), |y| y.to_string()),
        years.max().map_or(String::new(), |y| y.to_string())
    );
    // Years are categories here, both as colour groups and as animation frames
    let year_labels = df.column(COL::YEAR)?.cast(&DataType::String)?;
    df.with_column(year_labels)?;

    let x = selections.one(X_AXIS)?;
    let titles = Titles::new(&title)
        .with_x("Indice de Rigueur OxCGRT")
        .with_y("Taux de Chômage (%)");
    ScatterChart::new(x, COL::UNEMPLOYMENT_RATE, titles)
        .with_color(color_field(selections.one(COLOR)?))
        .with_animation(selections.one(ANIMATION)?)
        .with_size(SizeMapping::Field(x.to_string()))
        .with_hover(&[
            COL::ENTITY,
            COL::INCOME_GROUP,
            COL::YEAR,
            COL::UNEMPLOYMENT_RATE,
        ])
        .with_x_range(-5.0, 105.0)
        .render(&df)
}

pub(crate) fn page_with_loader(load: LoadFn<Snapshot>) -> Page<Snapshot> {
    Page::new(
        PageMeta::new(
            "policy",
            "Stringency Policy vs. Unemployment",
            "/djamel-dashboard",
        ),
        load,
        controls,
        vec![ChartSlot::new(
            "main-scatter-plot",
            &[X_AXIS, COLOR, ANIMATION],
            scatter,
        )],
    )
}

pub fn page() -> Page<Snapshot> {
    page_with_loader(load)
}
