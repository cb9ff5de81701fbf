use std::io::{Cursor, Write};

use anyhow::Result;
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::{ChartSpec, Trace, TraceKind};
use crate::controls::RenderedChart;

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// rendered charts and save which writes them to a writer
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, charts: &[RenderedChart]) -> Result<()>;
    fn format(&self, charts: &[RenderedChart]) -> Result<String> {
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, charts)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Json(JsonFormatter),
    Csv(CsvFormatter),
}

/// The charts as a JSON array of `{"id", "figure"}`, each figure a plotly figure
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl OutputGenerator for JsonFormatter {
    fn save(&self, writer: &mut impl Write, charts: &[RenderedChart]) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, charts)?;
        } else {
            serde_json::to_writer(&mut *writer, charts)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// One CSV row per plotted point: chart, frame, trace, x, y. Pie slices give their label as x
/// and their value as y.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CsvFormatter;

fn cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Default)]
struct Points {
    chart: Vec<String>,
    frame: Vec<Option<String>>,
    trace: Vec<Option<String>>,
    x: Vec<Option<String>>,
    y: Vec<Option<String>>,
}

impl Points {
    fn push_trace(&mut self, chart: &str, frame: Option<&str>, trace: &Trace) {
        let (xs, ys) = match trace.kind {
            TraceKind::Pie => (&trace.labels, &trace.values),
            TraceKind::Scatter | TraceKind::Bar => (&trace.x, &trace.y),
        };
        for (x, y) in xs.iter().zip(ys) {
            self.chart.push(chart.to_string());
            self.frame.push(frame.map(str::to_string));
            self.trace.push(trace.name.clone());
            self.x.push(cell(x));
            self.y.push(cell(y));
        }
    }

    fn push_chart(&mut self, id: &str, figure: &ChartSpec) {
        if figure.frames.is_empty() {
            for trace in &figure.data {
                self.push_trace(id, None, trace);
            }
        } else {
            for frame in &figure.frames {
                for trace in &frame.data {
                    self.push_trace(id, Some(&frame.name), trace);
                }
            }
        }
    }

    fn into_frame(self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Series::new("chart", self.chart),
            Series::new("frame", self.frame),
            Series::new("trace", self.trace),
            Series::new("x", self.x),
            Series::new("y", self.y),
        ])
    }
}

impl OutputGenerator for CsvFormatter {
    fn save(&self, writer: &mut impl Write, charts: &[RenderedChart]) -> Result<()> {
        let mut points = Points::default();
        for chart in charts {
            points.push_chart(&chart.id, &chart.figure);
        }
        let mut df = points.into_frame()?;
        CsvWriter::new(writer).finish(&mut df)?;
        Ok(())
    }
}
