//! Chart descriptions built from a table and the names of the columns to plot. A `ChartSpec`
//! serialises to a plotly figure (`data`, `layout`, `frames`).

use std::collections::HashMap;

use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::debug;
use nonempty::{nonempty, NonEmpty};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bridge::{column_values, EncodedType};
use crate::error::DashboardResult;
use crate::loader::require_columns;

/// Label of the trace holding rows whose colour value is missing
pub const MISSING_GROUP: &str = "(missing)";

/// Largest marker diameter, in pixels, when sizing by a field
const MAX_MARKER_SIZE: f64 = 20.0;
const DEFAULT_MARKER_SIZE: f64 = 8.0;
const TRANSITION_MS: u32 = 500;

/// Ordered colours handed out to categories, cycling once exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(NonEmpty<String>);

impl Palette {
    pub fn new(colors: NonEmpty<String>) -> Self {
        Self(colors)
    }

    /// Plotly's default qualitative palette
    pub fn plotly() -> Self {
        Self(
            nonempty![
                "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692",
                "#B6E880", "#FF97FF", "#FECB52"
            ]
            .map(String::from),
        )
    }

    /// Plotly's 24-colour dark palette
    pub fn dark24() -> Self {
        Self(
            nonempty![
                "#2E91E5", "#E15F99", "#1CA71C", "#FB0D0D", "#DA16FF", "#222A2A", "#B68100",
                "#750D86", "#EB663B", "#511CFB", "#00A08B", "#FB00D1", "#FC0080", "#B2828D",
                "#6C7C32", "#778AAE", "#862A16", "#A777F1", "#620042", "#1616A7", "#DA60CA",
                "#6C4516", "#0D2A63", "#AF0038"
            ]
            .map(String::from),
        )
    }

    pub fn color(&self, idx: usize) -> &str {
        &self.0[idx % self.0.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::plotly()
    }
}

/// Category to colour assignment. Charts built from the same map give a category the same colour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorMap {
    order: Vec<String>,
    colors: HashMap<String, String>,
}

impl ColorMap {
    /// Assign palette colours to the distinct `categories` in order of first appearance
    pub fn build<I, S>(categories: I, palette: &Palette) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::default();
        map.extend(categories, palette);
        map
    }

    /// Give each category not yet in the map the next palette colour, keeping existing ones
    pub fn extend<I, S>(&mut self, categories: I, palette: &Palette)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for category in categories {
            let category = category.as_ref();
            if self.colors.contains_key(category) {
                continue;
            }
            let color = palette.color(self.order.len()).to_string();
            self.colors.insert(category.to_string(), color);
            self.order.push(category.to_string());
        }
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.colors.get(category).map(String::as_str)
    }

    pub fn categories(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Scatter,
    Pie,
    Bar,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MarkerSize {
    Fixed(f64),
    PerPoint(Vec<f64>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
    /// Per-slice colours of a pie
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub colors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<MarkerSize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sizemode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sizeref: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

/// One plotly trace. Empty fields are left out of the JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub x: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub y: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub labels: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub values: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub customdata: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub textinfo: Option<String>,
}

impl Trace {
    fn new(kind: TraceKind) -> Self {
        Self {
            kind,
            name: None,
            mode: None,
            x: vec![],
            y: vec![],
            labels: vec![],
            values: vec![],
            customdata: vec![],
            marker: None,
            line: None,
            hovertemplate: None,
            textinfo: None,
        }
    }

    /// Number of plotted points (or slices)
    pub fn len(&self) -> usize {
        match self.kind {
            TraceKind::Pie => self.values.len(),
            TraceKind::Scatter | TraceKind::Bar => self.x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub range: Option<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transition {
    pub duration: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SliderStep {
    pub label: String,
    pub method: String,
    pub args: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Slider {
    pub steps: Vec<SliderStep>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub title: String,
    #[serde(default)]
    pub xaxis: Axis,
    #[serde(default)]
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub barmode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transition: Option<Transition>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sliders: Vec<Slider>,
}

/// Traces shown for one value of the animation field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub data: Vec<Trace>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub frames: Vec<Frame>,
    /// Set only on figures standing in for a chart that could not be drawn
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ChartSpec {
    /// A figure with no traces whose title carries `message`
    pub fn error(message: &str) -> Self {
        Self {
            data: vec![],
            layout: Layout {
                title: message.to_string(),
                ..Layout::default()
            },
            frames: vec![],
            error: Some(message.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Turns a table into a chart description
#[enum_dispatch]
pub trait Render {
    fn render(&self, df: &DataFrame) -> DashboardResult<ChartSpec>;
}

#[enum_dispatch(Render)]
#[derive(Debug, Clone)]
pub enum Chart {
    Line(LineChart),
    Scatter(ScatterChart),
    Pie(PieChart),
    Bar(BarChart),
}

/// Column values as JSON, typed by the column's dtype
fn json_column(df: &DataFrame, name: &str) -> DashboardResult<Vec<Value>> {
    let series = df.column(name)?;
    column_values(series, EncodedType::of(series.dtype()))
}

/// Colour value of every row as a string, `MISSING_GROUP` when absent
fn group_keys(df: &DataFrame, color: Option<&str>) -> DashboardResult<Vec<String>> {
    let Some(color) = color else {
        return Ok(vec![String::new(); df.height()]);
    };
    let keys = df.column(color)?.cast(&DataType::String)?;
    let keys = keys
        .str()?
        .into_iter()
        .map(|key| key.unwrap_or(MISSING_GROUP).to_string())
        .collect();
    Ok(keys)
}

/// Split `rows` by key, groups in order of first appearance
fn group_rows(keys: &[String], rows: impl Iterator<Item = usize>) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = vec![];
    let mut position: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let key = keys[row].as_str();
        let idx = *position.entry(key).or_insert_with(|| {
            groups.push((key.to_string(), vec![]));
            groups.len() - 1
        });
        groups[idx].1.push(row);
    }
    groups
}

fn pick(values: &[Value], rows: &[usize]) -> Vec<Value> {
    rows.iter().map(|row| values[*row].clone()).collect()
}

fn axis(title: &Option<String>, fallback: &str) -> Axis {
    Axis {
        title: Some(title.clone().unwrap_or_else(|| fallback.to_string())),
        range: None,
    }
}

/// Titles shared by the x/y chart kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Titles {
    pub title: String,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl Titles {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            x: None,
            y: None,
        }
    }

    pub fn with_x(self, x: &str) -> Self {
        Self {
            x: Some(x.to_string()),
            ..self
        }
    }

    pub fn with_y(self, y: &str) -> Self {
        Self {
            y: Some(y.to_string()),
            ..self
        }
    }
}

/// Traces of an x/y chart, one per colour group. Rows missing x or y are left out.
fn xy_traces(
    df: &DataFrame,
    kind: TraceKind,
    x: &str,
    y: &str,
    color: Option<&str>,
    colors: &ColorMap,
) -> DashboardResult<Vec<Trace>> {
    let xs = json_column(df, x)?;
    let ys = json_column(df, y)?;
    let keys = group_keys(df, color)?;
    let present = (0..df.height()).filter(|row| !xs[*row].is_null() && !ys[*row].is_null());

    let traces = group_rows(&keys, present)
        .into_iter()
        .map(|(key, rows)| {
            let mut trace = Trace::new(kind);
            trace.x = pick(&xs, &rows);
            trace.y = pick(&ys, &rows);
            let trace_color = colors.get(&key).map(str::to_string);
            match kind {
                TraceKind::Scatter => {
                    trace.mode = Some("lines".into());
                    trace.line = Some(Line { color: trace_color });
                }
                TraceKind::Bar | TraceKind::Pie => {
                    trace.marker = Some(Marker {
                        color: trace_color,
                        ..Marker::default()
                    })
                }
            }
            trace.name = (!key.is_empty()).then_some(key);
            trace
        })
        .collect_vec();
    Ok(traces)
}

/// A line per colour group
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub titles: Titles,
    pub palette: Palette,
}

impl LineChart {
    pub fn new(x: &str, y: &str, titles: Titles) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            color: None,
            titles,
            palette: Palette::default(),
        }
    }

    pub fn with_color(self, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..self
        }
    }
}

impl Render for LineChart {
    fn render(&self, df: &DataFrame) -> DashboardResult<ChartSpec> {
        let mut required = vec![self.x.as_str(), self.y.as_str()];
        required.extend(self.color.as_deref());
        require_columns(df, &required)?;

        let keys = group_keys(df, self.color.as_deref())?;
        let colors = ColorMap::build(&keys, &self.palette);
        let data = xy_traces(
            df,
            TraceKind::Scatter,
            &self.x,
            &self.y,
            self.color.as_deref(),
            &colors,
        )?;
        debug!("Line chart '{}' with {} traces", self.titles.title, data.len());
        Ok(ChartSpec {
            data,
            layout: Layout {
                title: self.titles.title.clone(),
                xaxis: axis(&self.titles.x, &self.x),
                yaxis: axis(&self.titles.y, &self.y),
                legend: self.color.clone().map(|title| Legend { title }),
                ..Layout::default()
            },
            frames: vec![],
            error: None,
        })
    }
}

/// Bars grouped side by side per colour group
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub titles: Titles,
    pub palette: Palette,
}

impl BarChart {
    pub fn new(x: &str, y: &str, titles: Titles) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            color: None,
            titles,
            palette: Palette::default(),
        }
    }

    pub fn with_color(self, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..self
        }
    }
}

impl Render for BarChart {
    fn render(&self, df: &DataFrame) -> DashboardResult<ChartSpec> {
        let mut required = vec![self.x.as_str(), self.y.as_str()];
        required.extend(self.color.as_deref());
        require_columns(df, &required)?;

        let keys = group_keys(df, self.color.as_deref())?;
        let colors = ColorMap::build(&keys, &self.palette);
        let data = xy_traces(
            df,
            TraceKind::Bar,
            &self.x,
            &self.y,
            self.color.as_deref(),
            &colors,
        )?;
        Ok(ChartSpec {
            data,
            layout: Layout {
                title: self.titles.title.clone(),
                xaxis: axis(&self.titles.x, &self.x),
                yaxis: axis(&self.titles.y, &self.y),
                legend: self.color.clone().map(|title| Legend { title }),
                barmode: Some("group".into()),
                ..Layout::default()
            },
            frames: vec![],
            error: None,
        })
    }
}

/// How scatter markers are sized
#[derive(Debug, Clone, PartialEq)]
pub enum SizeMapping {
    /// Every marker gets the same diameter in pixels
    Fixed(f64),
    /// Marker area proportional to a numeric field
    Field(String),
}

impl Default for SizeMapping {
    fn default() -> Self {
        SizeMapping::Fixed(DEFAULT_MARKER_SIZE)
    }
}

/// Scatter plot, optionally animated with one frame per value of `animation`
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub animation: Option<String>,
    pub size: SizeMapping,
    /// Fields attached to every point for hover
    pub hover: Vec<String>,
    pub x_range: Option<[f64; 2]>,
    pub titles: Titles,
    pub palette: Palette,
}

impl ScatterChart {
    pub fn new(x: &str, y: &str, titles: Titles) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            color: None,
            animation: None,
            size: SizeMapping::default(),
            hover: vec![],
            x_range: None,
            titles,
            palette: Palette::default(),
        }
    }

    pub fn with_color(self, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..self
        }
    }

    pub fn with_animation(self, animation: &str) -> Self {
        Self {
            animation: Some(animation.to_string()),
            ..self
        }
    }

    pub fn with_size(self, size: SizeMapping) -> Self {
        Self { size, ..self }
    }

    pub fn with_hover(self, hover: &[&str]) -> Self {
        Self {
            hover: hover.iter().map(|h| h.to_string()).collect(),
            ..self
        }
    }

    pub fn with_x_range(self, min: f64, max: f64) -> Self {
        Self {
            x_range: Some([min, max]),
            ..self
        }
    }

    fn hovertemplate(&self) -> Option<String> {
        if self.hover.is_empty() {
            return None;
        }
        let template = self
            .hover
            .iter()
            .enumerate()
            .map(|(idx, field)| format!("{field}=%{{customdata[{idx}]}}"))
            .join("<br>");
        Some(format!("{template}<extra></extra>"))
    }
}

/// Per-row marker sizes, `None` where the size field is missing
fn field_sizes(df: &DataFrame, field: &str) -> DashboardResult<Vec<Option<f64>>> {
    let sizes = df.column(field)?.cast(&DataType::Float64)?;
    let sizes = sizes.f64()?.into_iter().collect();
    Ok(sizes)
}

impl Render for ScatterChart {
    fn render(&self, df: &DataFrame) -> DashboardResult<ChartSpec> {
        let mut required = vec![self.x.as_str(), self.y.as_str()];
        required.extend(self.color.as_deref());
        required.extend(self.animation.as_deref());
        required.extend(self.hover.iter().map(String::as_str));
        if let SizeMapping::Field(field) = &self.size {
            required.push(field.as_str());
        }
        require_columns(df, &required)?;

        let xs = json_column(df, &self.x)?;
        let ys = json_column(df, &self.y)?;
        let hover = self
            .hover
            .iter()
            .map(|field| json_column(df, field))
            .collect::<DashboardResult<Vec<_>>>()?;
        let sizes = match &self.size {
            SizeMapping::Field(field) => Some(field_sizes(df, field)?),
            SizeMapping::Fixed(_) => None,
        };
        // Shared by every frame so a value maps to the same area throughout the animation
        let sizeref = sizes.as_ref().map(|sizes| {
            let max = sizes.iter().flatten().copied().fold(0.0_f64, f64::max);
            if max > 0.0 {
                2.0 * max / MAX_MARKER_SIZE.powi(2)
            } else {
                1.0
            }
        });

        let fixed = match self.size {
            SizeMapping::Fixed(px) => px,
            SizeMapping::Field(_) => DEFAULT_MARKER_SIZE,
        };

        let keys = group_keys(df, self.color.as_deref())?;
        let colors = ColorMap::build(&keys, &self.palette);
        let present = (0..df.height())
            .filter(|row| !xs[*row].is_null() && !ys[*row].is_null())
            .filter(|row| sizes.as_ref().map_or(true, |s| s[*row].is_some()))
            .collect_vec();

        let traces_for = |rows: &[usize]| {
            group_rows(&keys, rows.iter().copied())
                .into_iter()
                .map(|(key, rows)| {
                    let mut trace = Trace::new(TraceKind::Scatter);
                    trace.name = (!key.is_empty()).then(|| key.clone());
                    trace.mode = Some("markers".into());
                    trace.x = pick(&xs, &rows);
                    trace.y = pick(&ys, &rows);
                    trace.customdata = rows
                        .iter()
                        .map(|row| hover.iter().map(|values| values[*row].clone()).collect())
                        .collect();
                    trace.hovertemplate = self.hovertemplate();
                    let size = match &sizes {
                        Some(sizes) => MarkerSize::PerPoint(
                            rows.iter().filter_map(|row| sizes[*row]).collect(),
                        ),
                        None => MarkerSize::Fixed(fixed),
                    };
                    trace.marker = Some(Marker {
                        color: colors.get(&key).map(str::to_string),
                        size: Some(size),
                        sizemode: sizeref.map(|_| "area".to_string()),
                        sizeref,
                        ..Marker::default()
                    });
                    trace
                })
                .collect_vec()
        };

        let frames = match &self.animation {
            Some(animation) => {
                let frame_keys = group_keys(df, Some(animation))?;
                group_rows(&frame_keys, present.iter().copied())
                    .into_iter()
                    .map(|(name, rows)| Frame {
                        name,
                        data: traces_for(&rows),
                    })
                    .collect_vec()
            }
            None => vec![],
        };
        let data = match frames.first() {
            Some(first) => first.data.clone(),
            None => traces_for(&present),
        };
        let sliders = if frames.is_empty() {
            vec![]
        } else {
            vec![Slider {
                steps: frames
                    .iter()
                    .map(|frame| SliderStep {
                        label: frame.name.clone(),
                        method: "animate".into(),
                        args: json!([[frame.name], {
                            "mode": "immediate",
                            "frame": {"duration": TRANSITION_MS, "redraw": false},
                            "transition": {"duration": TRANSITION_MS}
                        }]),
                    })
                    .collect(),
            }]
        };
        debug!(
            "Scatter chart '{}' with {} points over {} frames",
            self.titles.title,
            present.len(),
            frames.len()
        );

        let mut xaxis = axis(&self.titles.x, &self.x);
        xaxis.range = self.x_range;
        Ok(ChartSpec {
            data,
            layout: Layout {
                title: self.titles.title.clone(),
                xaxis,
                yaxis: axis(&self.titles.y, &self.y),
                legend: self.color.clone().map(|title| Legend { title }),
                transition: Some(Transition {
                    duration: TRANSITION_MS,
                }),
                sliders,
                ..Layout::default()
            },
            frames,
            error: None,
        })
    }
}

/// Pie of `values` per `names`. Slices are coloured from `color_map` when given, so several pies
/// can share a legend.
#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub names: String,
    pub values: String,
    pub title: String,
    pub color_map: Option<ColorMap>,
    pub palette: Palette,
}

impl PieChart {
    pub fn new(names: &str, values: &str, title: &str) -> Self {
        Self {
            names: names.to_string(),
            values: values.to_string(),
            title: title.to_string(),
            color_map: None,
            palette: Palette::default(),
        }
    }

    pub fn with_color_map(self, color_map: ColorMap) -> Self {
        Self {
            color_map: Some(color_map),
            ..self
        }
    }
}

impl Render for PieChart {
    fn render(&self, df: &DataFrame) -> DashboardResult<ChartSpec> {
        require_columns(df, &[&self.names, &self.values])?;
        let names = group_keys(df, Some(&self.names))?;
        let values = json_column(df, &self.values)?;
        let rows = (0..df.height())
            .filter(|row| !values[*row].is_null())
            .collect_vec();

        // Categories absent from a shared map continue its palette rather than reuse a colour
        let mut colors = self.color_map.clone().unwrap_or_default();
        colors.extend(rows.iter().map(|row| &names[*row]), &self.palette);
        let mut trace = Trace::new(TraceKind::Pie);
        trace.labels = rows.iter().map(|row| json!(names[*row])).collect();
        trace.values = pick(&values, &rows);
        trace.marker = Some(Marker {
            colors: rows
                .iter()
                .filter_map(|row| colors.get(&names[*row]).map(str::to_string))
                .collect(),
            ..Marker::default()
        });
        trace.hovertemplate = Some("%{label}: %{percent:.1%}".into());
        trace.textinfo = Some("none".into());
        Ok(ChartSpec {
            data: vec![trace],
            layout: Layout {
                title: self.title.clone(),
                ..Layout::default()
            },
            frames: vec![],
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;

    fn analysis() -> DataFrame {
        df!(
            "CountryName" => &["France", "Japan", "France", "Japan", "Sudan"],
            "Year_Month" => &["2020-01", "2020-01", "2020-02", "2020-02", "2020-02"],
            "Stringency_Index" => &[Some(55.0), Some(20.0), Some(80.0), None, Some(10.0)],
            "Unemployment_Rate" => &[8.1, 2.8, 8.1, 2.8, 17.0],
            "IncomeGroup_Custom" => &[Some("1 - Haut Revenu"), Some("1 - Haut Revenu"), Some("1 - Haut Revenu"), Some("1 - Haut Revenu"), None]
        )
        .unwrap()
    }

    #[test]
    fn palette_cycles_once_exhausted() {
        let palette = Palette::plotly();
        assert_eq!(palette.color(0), "#636efa");
        assert_eq!(palette.color(10), palette.color(0));
        assert_eq!(palette.color(13), palette.color(3));

        let map = ColorMap::build((0..30).map(|i| i.to_string()), &Palette::dark24());
        assert_eq!(map.len(), 30);
        assert_eq!(map.get("24"), map.get("0"));
        assert_ne!(map.get("1"), map.get("0"));
    }

    #[test]
    fn shared_color_map_colours_both_pies_alike() {
        let gdp_2019 = df!("Country" => &["France", "Germany"], "GDP" => &[2.4, 3.5]).unwrap();
        let gdp_2022 = df!("Country" => &["Italy", "France"], "GDP" => &[1.9, 2.6]).unwrap();
        let union = ["France", "Germany", "Italy", "France"];
        let map = ColorMap::build(union, &Palette::dark24());
        assert_eq!(map.categories(), &["France", "Germany", "Italy"]);

        let pie = |df: &DataFrame, title: &str| {
            PieChart::new("Country", "GDP", title)
                .with_color_map(map.clone())
                .render(df)
                .unwrap()
        };
        let first = pie(&gdp_2019, "GDP by Country (2019)");
        let second = pie(&gdp_2022, "GDP by Country (2022)");
        let colors = |spec: &ChartSpec| spec.data[0].marker.clone().unwrap().colors;
        assert_eq!(colors(&first)[0], colors(&second)[1]);
        assert_eq!(colors(&first)[0], "#2E91E5");
        assert_eq!(first.data[0].hovertemplate.as_deref(), Some("%{label}: %{percent:.1%}"));
        assert_eq!(first.data[0].textinfo.as_deref(), Some("none"));
    }

    #[test]
    fn categories_outside_a_shared_map_get_a_new_colour() {
        let map = ColorMap::build(["France", "Germany"], &Palette::dark24());
        let df = df!("Country" => &["Spain", "France"], "GDP" => &[1.2, 2.4]).unwrap();
        let spec = PieChart::new("Country", "GDP", "GDP")
            .with_color_map(map)
            .render(&df)
            .unwrap();
        let colors = spec.data[0].marker.clone().unwrap().colors;
        let dark24 = Palette::dark24();
        assert_eq!(colors, vec![dark24.color(2), dark24.color(0)]);
    }

    #[test]
    fn pie_omits_missing_slices() {
        let df = df!("Country" => &["France", "Malta"], "GDP" => &[Some(2.4), None]).unwrap();
        let spec = PieChart::new("Country", "GDP", "GDP").render(&df).unwrap();
        assert_eq!(spec.data[0].labels, vec![json!("France")]);
        assert_eq!(spec.data[0].len(), 1);
    }

    #[test]
    fn line_traces_follow_first_appearance_and_skip_missing() {
        let df = analysis();
        let spec = LineChart::new("Year_Month", "Stringency_Index", Titles::new("Stringency"))
            .with_color("CountryName")
            .render(&df)
            .unwrap();
        let names = spec.data.iter().map(|t| t.name.clone().unwrap()).collect_vec();
        assert_eq!(names, vec!["France", "Japan", "Sudan"]);
        assert_eq!(spec.data[0].y, vec![json!(55.0), json!(80.0)]);
        assert_eq!(spec.data[1].len(), 1, "Japan's missing February value is omitted");
        assert_eq!(spec.data[0].mode.as_deref(), Some("lines"));
        assert_eq!(
            spec.data[1].line.clone().unwrap().color.as_deref(),
            Some(Palette::plotly().color(1))
        );
        assert_eq!(spec.layout.xaxis.title.as_deref(), Some("Year_Month"));
    }

    #[test]
    fn line_without_colour_is_one_unnamed_trace() {
        let df = df!("Time" => &[2019i64, 2020], "Price" => &[1.0, 2.0]).unwrap();
        let spec = LineChart::new("Time", "Price", Titles::new("S&P 500").with_y("USD"))
            .render(&df)
            .unwrap();
        assert_eq!(spec.data.len(), 1);
        assert_eq!(spec.data[0].name, None);
        assert_eq!(spec.data[0].x, vec![json!(2019), json!(2020)]);
        assert_eq!(spec.layout.yaxis.title.as_deref(), Some("USD"));
    }

    #[test]
    fn animated_scatter_has_a_frame_per_period() {
        let df = analysis();
        let spec = ScatterChart::new("Stringency_Index", "Unemployment_Rate", Titles::new("Policy"))
            .with_color("IncomeGroup_Custom")
            .with_animation("Year_Month")
            .with_size(SizeMapping::Field("Stringency_Index".into()))
            .with_hover(&["CountryName", "Unemployment_Rate"])
            .with_x_range(-5.0, 105.0)
            .render(&df)
            .unwrap();

        let frame_names = spec.frames.iter().map(|f| f.name.as_str()).collect_vec();
        assert_eq!(frame_names, vec!["2020-01", "2020-02"]);
        assert_eq!(spec.data, spec.frames[0].data);
        assert_eq!(spec.layout.sliders[0].steps.len(), 2);

        let february = &spec.frames[1].data;
        assert_eq!(february.len(), 2);
        assert_eq!(february[0].name.as_deref(), Some("1 - Haut Revenu"));
        assert_eq!(february[0].len(), 1, "Japan has no February index");
        assert_eq!(february[1].name.as_deref(), Some(MISSING_GROUP));
        assert_eq!(
            february[0].customdata,
            vec![vec![json!("France"), json!(8.1)]]
        );

        let marker = february[0].marker.clone().unwrap();
        assert_eq!(marker.size, Some(MarkerSize::PerPoint(vec![80.0])));
        assert_eq!(marker.sizemode.as_deref(), Some("area"));
        assert_eq!(marker.sizeref, Some(2.0 * 80.0 / 400.0));
        assert_eq!(spec.layout.xaxis.range, Some([-5.0, 105.0]));
        assert_eq!(spec.layout.transition, Some(Transition { duration: 500 }));
    }

    #[test]
    fn scatter_colour_is_stable_across_frames() {
        let df = analysis();
        let spec = ScatterChart::new("Stringency_Index", "Unemployment_Rate", Titles::new("Policy"))
            .with_color("CountryName")
            .with_animation("Year_Month")
            .render(&df)
            .unwrap();
        let color_of = |trace: &Trace| trace.marker.clone().unwrap().color;
        let france = |frame: &Frame| {
            frame
                .data
                .iter()
                .find(|t| t.name.as_deref() == Some("France"))
                .map(color_of)
        };
        assert_eq!(france(&spec.frames[0]), france(&spec.frames[1]));
        let sudan = spec.frames[1]
            .data
            .iter()
            .find(|t| t.name.as_deref() == Some("Sudan"))
            .map(color_of);
        assert_eq!(sudan, Some(Some(Palette::plotly().color(2).to_string())));
    }

    #[test]
    fn grouped_bars() {
        let long = df!(
            "Country" => &["France", "France", "Italy"],
            "Category" => &["Grants", "Loans", "Grants"],
            "Value" => &[1.0, 2.0, 3.0]
        )
        .unwrap();
        let spec = BarChart::new("Country", "Value", Titles::new("Support"))
            .with_color("Category")
            .render(&long)
            .unwrap();
        assert_eq!(spec.layout.barmode.as_deref(), Some("group"));
        assert_eq!(spec.data.len(), 2);
        assert_eq!(spec.data[0].x, vec![json!("France"), json!("Italy")]);
        let figure = serde_json::to_value(&spec).unwrap();
        assert_eq!(figure["data"][0]["type"], json!("bar"));
        assert!(figure.get("frames").is_none());
    }

    #[test]
    fn error_figure_carries_message() {
        let spec = ChartSpec::error("File not found: Data/x.csv");
        assert!(spec.is_error());
        assert_eq!(spec.error.as_deref(), Some("File not found: Data/x.csv"));
        assert_eq!(spec.layout.title, "File not found: Data/x.csv");
        let figure = serde_json::to_value(&spec).unwrap();
        assert_eq!(figure["error"], json!("File not found: Data/x.csv"));
    }

    #[test]
    fn empty_table_is_an_empty_chart_not_an_error() {
        let df = df!("x" => Vec::<f64>::new(), "y" => Vec::<f64>::new()).unwrap();
        let spec = LineChart::new("x", "y", Titles::new("t")).render(&df).unwrap();
        assert!(spec.data.is_empty());
        assert!(!spec.is_error());
        let figure = serde_json::to_value(&spec).unwrap();
        assert!(figure.get("error").is_none());
    }

    #[test]
    fn unknown_field_is_a_schema_mismatch() {
        let chart: Chart = LineChart::new("Year", "GDP", Titles::new("GDP")).into();
        let df = df!("Year" => &[2020i32]).unwrap();
        assert!(matches!(
            chart.render(&df),
            Err(DashboardError::SchemaMismatch(name)) if name == "GDP"
        ));
    }
}
