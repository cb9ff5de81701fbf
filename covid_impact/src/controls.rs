//! Controls, the dispatch table from controls to charts, and the load-once page controller that
//! drives them.

use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::chart::ChartSpec;
use crate::config::Config;
use crate::error::{DashboardError, DashboardResult};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControlKind {
    MultiSelect,
    Dropdown,
    Radio,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ControlOption {
    pub label: String,
    pub value: String,
}

impl ControlOption {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<&str> for ControlOption {
    fn from(value: &str) -> Self {
        ControlOption::new(value, value)
    }
}

impl From<String> for ControlOption {
    fn from(value: String) -> Self {
        ControlOption::new(&value, &value)
    }
}

/// Current value of a control: one option, or several for a multi-select
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ControlValue {
    One(String),
    Many(Vec<String>),
}

impl ControlValue {
    pub fn one(value: &str) -> Self {
        ControlValue::One(value.to_string())
    }

    pub fn many<S: AsRef<str>>(values: &[S]) -> Self {
        ControlValue::Many(values.iter().map(|v| v.as_ref().to_string()).collect())
    }

    fn values(&self) -> Vec<&str> {
        match self {
            ControlValue::One(value) => vec![value.as_str()],
            ControlValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Control {
    pub id: String,
    pub label: String,
    pub kind: ControlKind,
    pub options: Vec<ControlOption>,
    pub default: ControlValue,
}

impl Control {
    pub fn multi_select<O: Into<ControlOption>>(
        id: &str,
        label: &str,
        options: impl IntoIterator<Item = O>,
        default: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ControlKind::MultiSelect,
            options: options.into_iter().map(Into::into).collect(),
            default: ControlValue::many(default),
        }
    }

    pub fn dropdown<O: Into<ControlOption>>(
        id: &str,
        label: &str,
        options: impl IntoIterator<Item = O>,
        default: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ControlKind::Dropdown,
            options: options.into_iter().map(Into::into).collect(),
            default: ControlValue::one(default),
        }
    }

    pub fn radio<O: Into<ControlOption>>(
        id: &str,
        label: &str,
        options: impl IntoIterator<Item = O>,
        default: &str,
    ) -> Self {
        Self {
            kind: ControlKind::Radio,
            ..Control::dropdown(id, label, options, default)
        }
    }

    /// Check `value` has the shape this control takes and names only offered options. A single
    /// value given to a multi-select is widened to a one-element list.
    pub fn validate(&self, value: ControlValue) -> DashboardResult<ControlValue> {
        let invalid = |reason: String| DashboardError::InvalidSelection {
            control: self.id.clone(),
            reason,
        };
        let value = match (self.kind, value) {
            (ControlKind::MultiSelect, ControlValue::One(one)) => ControlValue::Many(vec![one]),
            (ControlKind::MultiSelect, many) => many,
            (_, ControlValue::Many(_)) => {
                return Err(invalid(format!("{} takes a single value", self.kind)))
            }
            (_, one) => one,
        };
        if let Some(unknown) = value
            .values()
            .into_iter()
            .find(|v| !self.options.iter().any(|option| option.value == *v))
        {
            return Err(invalid(format!("'{unknown}' is not one of its options")));
        }
        Ok(value)
    }
}

/// Current value of every control on a page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Selections(HashMap<String, ControlValue>);

impl Selections {
    pub fn from_defaults(controls: &[Control]) -> Self {
        Self(
            controls
                .iter()
                .map(|control| (control.id.clone(), control.default.clone()))
                .collect(),
        )
    }

    pub fn set(&mut self, control: &str, value: ControlValue) {
        self.0.insert(control.to_string(), value);
    }

    pub fn get(&self, control: &str) -> DashboardResult<&ControlValue> {
        self.0
            .get(control)
            .ok_or_else(|| DashboardError::UnknownControl(control.to_string()))
    }

    /// The single value of a dropdown or radio
    pub fn one(&self, control: &str) -> DashboardResult<&str> {
        match self.get(control)? {
            ControlValue::One(value) => Ok(value),
            ControlValue::Many(_) => Err(DashboardError::InvalidSelection {
                control: control.to_string(),
                reason: "expected a single value".into(),
            }),
        }
    }

    /// The values of a multi-select
    pub fn many(&self, control: &str) -> DashboardResult<Vec<String>> {
        Ok(self
            .get(control)?
            .values()
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}

/// Lifecycle of a page's source data
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<D> {
    Idle,
    Loading,
    Ready(D),
    Failed(String),
}

/// `LoadState` without the data
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl<D> From<&LoadState<D>> for PageState {
    fn from(state: &LoadState<D>) -> Self {
        match state {
            LoadState::Idle => PageState::Idle,
            LoadState::Loading => PageState::Loading,
            LoadState::Ready(_) => PageState::Ready,
            LoadState::Failed(message) => PageState::Failed(message.clone()),
        }
    }
}

pub type LoadFn<D> = fn(&Config) -> DashboardResult<D>;
pub type ControlsFn<D> = fn(&D) -> Vec<Control>;
pub type RenderFn<D> = fn(&D, &Selections) -> DashboardResult<ChartSpec>;

/// A chart on a page and the controls it reads
pub struct ChartSlot<D> {
    pub id: String,
    pub inputs: Vec<String>,
    pub render: RenderFn<D>,
}

impl<D> ChartSlot<D> {
    pub fn new(id: &str, inputs: &[&str], render: RenderFn<D>) -> Self {
        Self {
            id: id.to_string(),
            inputs: inputs.iter().map(|i| i.to_string()).collect(),
            render,
        }
    }
}

impl<D> Clone for ChartSlot<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            inputs: self.inputs.clone(),
            render: self.render,
        }
    }
}

/// Control id to the charts that re-render when it changes
pub struct Dispatcher<D> {
    routes: HashMap<String, Vec<(String, RenderFn<D>)>>,
}

impl<D> Default for Dispatcher<D> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<D> Dispatcher<D> {
    pub fn bind(&mut self, control: &str, chart: &str, render: RenderFn<D>) {
        self.routes
            .entry(control.to_string())
            .or_default()
            .push((chart.to_string(), render));
    }

    pub fn from_slots(slots: &[ChartSlot<D>]) -> Self {
        let mut dispatcher = Self::default();
        for slot in slots {
            for input in &slot.inputs {
                dispatcher.bind(input, &slot.id, slot.render);
            }
        }
        dispatcher
    }

    pub fn targets(&self, control: &str) -> &[(String, RenderFn<D>)] {
        self.routes.get(control).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub id: String,
    pub figure: ChartSpec,
}

/// What a host shows for a page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: String,
    pub error: Option<String>,
    pub controls_visible: bool,
    pub controls: Vec<Control>,
    pub charts: Vec<RenderedChart>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub id: String,
    pub title: String,
    pub path: String,
}

impl PageMeta {
    pub fn new(id: &str, title: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            path: path.to_string(),
        }
    }
}

/// A page whose data loads at most once, after which controls re-render charts from it
pub trait PageController {
    fn meta(&self) -> &PageMeta;
    fn state(&self) -> PageState;
    /// Controls of a loaded page, empty otherwise
    fn controls(&self) -> &[Control];
    fn chart_ids(&self) -> Vec<String>;
    fn mount(&mut self, config: &Config) -> PageView;
    fn fire(&mut self, control: &str, value: ControlValue) -> DashboardResult<Vec<RenderedChart>>;
}

pub struct Page<D> {
    meta: PageMeta,
    load: LoadFn<D>,
    controls_for: ControlsFn<D>,
    charts: Vec<ChartSlot<D>>,
    dispatcher: Dispatcher<D>,
    state: LoadState<D>,
    controls: Vec<Control>,
    selections: Selections,
}

impl<D> Page<D> {
    pub fn new(
        meta: PageMeta,
        load: LoadFn<D>,
        controls_for: ControlsFn<D>,
        charts: Vec<ChartSlot<D>>,
    ) -> Self {
        let dispatcher = Dispatcher::from_slots(&charts);
        Self {
            meta,
            load,
            controls_for,
            charts,
            dispatcher,
            state: LoadState::Idle,
            controls: vec![],
            selections: Selections::default(),
        }
    }

    pub fn load_state(&self) -> &LoadState<D> {
        &self.state
    }

    fn ensure_loaded(&mut self, config: &Config) {
        if !matches!(self.state, LoadState::Idle) {
            return;
        }
        info!("Loading page '{}'", self.meta.id);
        self.state = LoadState::Loading;
        self.state = match (self.load)(config) {
            Ok(data) => {
                self.controls = (self.controls_for)(&data);
                self.selections = Selections::from_defaults(&self.controls);
                LoadState::Ready(data)
            }
            Err(err) => {
                error!("Page '{}' failed to load: {err}", self.meta.id);
                LoadState::Failed(err.to_string())
            }
        };
    }

    fn draw(&self, data: &D, id: &str, render: RenderFn<D>) -> RenderedChart {
        let figure = render(data, &self.selections).unwrap_or_else(|err| {
            warn!("Chart '{id}' on page '{}' failed: {err}", self.meta.id);
            ChartSpec::error(&err.to_string())
        });
        RenderedChart {
            id: id.to_string(),
            figure,
        }
    }

    fn failed_charts<'a>(
        &self,
        ids: impl Iterator<Item = &'a str>,
        message: &str,
    ) -> Vec<RenderedChart> {
        ids.map(|id| RenderedChart {
            id: id.to_string(),
            figure: ChartSpec::error(message),
        })
        .collect()
    }
}

impl<D> PageController for Page<D> {
    fn meta(&self) -> &PageMeta {
        &self.meta
    }

    fn state(&self) -> PageState {
        PageState::from(&self.state)
    }

    fn controls(&self) -> &[Control] {
        &self.controls
    }

    fn chart_ids(&self) -> Vec<String> {
        self.charts.iter().map(|slot| slot.id.clone()).collect()
    }

    fn mount(&mut self, config: &Config) -> PageView {
        self.ensure_loaded(config);
        match &self.state {
            LoadState::Ready(data) => PageView {
                page: self.meta.id.clone(),
                error: None,
                controls_visible: true,
                controls: self.controls.clone(),
                charts: self
                    .charts
                    .iter()
                    .map(|slot| self.draw(data, &slot.id, slot.render))
                    .collect(),
            },
            LoadState::Failed(message) => PageView {
                page: self.meta.id.clone(),
                error: Some(message.clone()),
                controls_visible: false,
                controls: vec![],
                charts: self.failed_charts(self.charts.iter().map(|s| s.id.as_str()), message),
            },
            LoadState::Idle | LoadState::Loading => PageView {
                page: self.meta.id.clone(),
                error: None,
                controls_visible: false,
                controls: vec![],
                charts: vec![],
            },
        }
    }

    fn fire(&mut self, control: &str, value: ControlValue) -> DashboardResult<Vec<RenderedChart>> {
        let data = match &self.state {
            LoadState::Ready(data) => data,
            LoadState::Failed(message) => {
                let targets = self.dispatcher.targets(control);
                return Ok(self.failed_charts(targets.iter().map(|(id, _)| id.as_str()), message));
            }
            LoadState::Idle | LoadState::Loading => {
                return Err(DashboardError::InvalidSelection {
                    control: control.to_string(),
                    reason: format!("page '{}' is not mounted", self.meta.id),
                })
            }
        };
        let target = self
            .controls
            .iter()
            .find(|c| c.id == control)
            .ok_or_else(|| DashboardError::UnknownControl(control.to_string()))?;
        let value = target.validate(value)?;
        debug!("{}: {control} = {value:?}", self.meta.id);
        self.selections.set(control, value);

        let rendered = self
            .dispatcher
            .targets(control)
            .iter()
            .map(|(id, render)| self.draw(data, id, *render))
            .collect_vec();
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use polars::prelude::*;

    use super::*;
    use crate::chart::{LineChart, Render, Titles};
    use crate::reshape::filter_in;

    fn table() -> DataFrame {
        df!(
            "Country" => &["France", "Japan", "France", "Japan"],
            "Year" => &[2020i32, 2020, 2021, 2021],
            "GDP" => &[-7.5, -4.1, 6.4, 2.6]
        )
        .unwrap()
    }

    fn controls(_: &DataFrame) -> Vec<Control> {
        vec![
            Control::multi_select("countries", "Countries", ["France", "Japan"], &["France"]),
            Control::radio("metric", "Metric", ["GDP"], "GDP"),
        ]
    }

    fn gdp(df: &DataFrame, selections: &Selections) -> DashboardResult<ChartSpec> {
        let filtered = filter_in(df, "Country", &selections.many("countries")?)?;
        LineChart::new("Year", selections.one("metric")?, Titles::new("GDP"))
            .with_color("Country")
            .render(&filtered)
    }

    fn headline(_: &DataFrame, _: &Selections) -> DashboardResult<ChartSpec> {
        Ok(ChartSpec::default())
    }

    fn page(load: LoadFn<DataFrame>) -> Page<DataFrame> {
        Page::new(
            PageMeta::new("test", "Test", "/test"),
            load,
            controls,
            vec![
                ChartSlot::new("gdp-graph", &["countries", "metric"], gdp),
                ChartSlot::new("headline", &[], headline),
            ],
        )
    }

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    fn counted_load(_: &Config) -> DashboardResult<DataFrame> {
        LOADS.fetch_add(1, Ordering::SeqCst);
        Ok(table())
    }

    fn failing_load(_: &Config) -> DashboardResult<DataFrame> {
        Err(DashboardError::FileNotFound("Data/missing.csv".into()))
    }

    #[test]
    fn mount_loads_once_and_renders_every_chart() {
        let mut page = page(counted_load);
        assert_eq!(page.state(), PageState::Idle);
        let config = Config::default();
        let view = page.mount(&config);
        assert_eq!(page.state(), PageState::Ready);
        assert!(view.controls_visible);
        assert_eq!(view.charts.len(), 2);
        assert_eq!(view.charts[0].figure.data.len(), 1, "default selects France only");

        for _ in 0..5 {
            page.fire("countries", ControlValue::many(&["France", "Japan"]))
                .unwrap();
        }
        page.mount(&config);
        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fire_rerenders_only_bound_charts() {
        let mut page = page(|_| Ok(table()));
        page.mount(&Config::default());
        let rendered = page
            .fire("countries", ControlValue::many(&["France", "Japan"]))
            .unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].id, "gdp-graph");
        assert_eq!(rendered[0].figure.data.len(), 2);

        let rendered = page.fire("countries", ControlValue::one("Japan")).unwrap();
        assert_eq!(rendered[0].figure.data[0].name.as_deref(), Some("Japan"));
    }

    #[test]
    fn clearing_a_multi_select_draws_an_empty_chart() {
        let mut page = page(|_| Ok(table()));
        page.mount(&Config::default());
        let rendered = page
            .fire("countries", ControlValue::Many(vec![]))
            .unwrap();
        assert!(rendered[0].figure.data.is_empty());
        assert!(!rendered[0].figure.is_error());
        assert_eq!(page.state(), PageState::Ready);
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let mut page = page(|_| Ok(table()));
        assert!(matches!(
            page.fire("countries", ControlValue::one("France")),
            Err(DashboardError::InvalidSelection { .. })
        ));
        page.mount(&Config::default());
        assert!(matches!(
            page.fire("nope", ControlValue::one("France")),
            Err(DashboardError::UnknownControl(_))
        ));
        assert!(matches!(
            page.fire("metric", ControlValue::many(&["GDP"])),
            Err(DashboardError::InvalidSelection { .. })
        ));
        assert!(matches!(
            page.fire("countries", ControlValue::many(&["Atlantis"])),
            Err(DashboardError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn failed_page_hides_controls_and_shows_error_figures() {
        let mut page = page(failing_load);
        let view = page.mount(&Config::default());
        assert_eq!(view.error.as_deref(), Some("File not found: Data/missing.csv"));
        assert!(!view.controls_visible);
        assert!(view.controls.is_empty());
        assert!(view.charts.iter().all(|chart| {
            chart.figure.error.as_deref() == Some("File not found: Data/missing.csv")
        }));
        assert!(matches!(page.state(), PageState::Failed(_)));

        let rendered = page.fire("countries", ControlValue::one("France")).unwrap();
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].figure.is_error());
    }

    #[test]
    fn dispatcher_routes_by_control() {
        let slots = vec![
            ChartSlot::new("a", &["x"], headline),
            ChartSlot::new("b", &["x", "y"], headline),
        ];
        let dispatcher = Dispatcher::from_slots(&slots);
        let ids = |control| {
            dispatcher
                .targets(control)
                .iter()
                .map(|(id, _)| id.clone())
                .collect_vec()
        };
        assert_eq!(ids("x"), vec!["a", "b"]);
        assert_eq!(ids("y"), vec!["b"]);
        assert!(ids("z").is_empty());
    }
}
