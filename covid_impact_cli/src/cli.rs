use std::fs::File;
use std::path::Path;

use clap::{Args, Parser, Subcommand};
use covid_impact::{
    config::Config,
    controls::{ControlValue, RenderedChart},
    formatters::{CsvFormatter, JsonFormatter, OutputFormatter, OutputGenerator},
    Dashboard,
};
use enum_dispatch::enum_dispatch;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{display_controls, display_pages};
use crate::error::{CliError, CliResult};

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const LOADING_STRING: &str = "Loading page data";

/// Defines the output formats we are able to produce charts in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    fn formatter(&self, pretty: bool) -> OutputFormatter {
        match self {
            OutputFormat::Json => OutputFormatter::Json(JsonFormatter { pretty }),
            OutputFormat::Csv => OutputFormatter::Csv(CsvFormatter),
        }
    }
}

/// A `--set` argument: a control id and the value(s) to give it
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub control: String,
    pub value: ControlValue,
}

/// Parses `CONTROL=VALUE` or `CONTROL=VALUE,VALUE,...`
fn parse_selection(arg: &str) -> CliResult<Selection> {
    let (control, values) = arg
        .split_once('=')
        .filter(|(control, values)| !control.is_empty() && !values.is_empty())
        .ok_or_else(|| CliError::InvalidSelectionArg(arg.to_string()))?;
    let values = values.split(',').map(str::trim).collect::<Vec<_>>();
    let value = match values.as_slice() {
        [one] => ControlValue::one(one),
        many => ControlValue::many(many),
    };
    Ok(Selection {
        control: control.to_string(),
        value,
    })
}

fn write_output<T, U>(
    output_generator: T,
    charts: &[RenderedChart],
    output_file: Option<U>,
) -> CliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file)?;
        output_generator.save(&mut f, charts)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, charts)?;
    };
    Ok(())
}

fn with_spinner<T>(quiet: bool, f: impl FnOnce() -> T) -> T {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            LOADING_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let result = f();
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING)
    }
    result
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> CliResult<()>;
}

/// The `pages` command lists the dashboard pages and their charts.
#[derive(Args, Debug)]
pub struct PagesCommand {}

impl RunCommand for PagesCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `pages` subcommand");
        let dashboard = Dashboard::new_with_config(config);
        display_pages(dashboard.pages());
        Ok(())
    }
}

/// The `controls` command loads a page and lists its controls with their options.
#[derive(Args, Debug)]
pub struct ControlsCommand {
    #[arg(help = "Page ID, as listed by the `pages` command")]
    page: String,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for ControlsCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `controls` subcommand");
        let mut dashboard = Dashboard::new_with_config(config);
        let view = with_spinner(self.quiet, || dashboard.mount(&self.page))?;
        if let Some(error) = view.error {
            println!("Page '{}' failed to load: {error}", self.page);
            return Ok(());
        }
        display_controls(&view.controls);
        Ok(())
    }
}

/// The `render` command mounts a page, applies the given selections in order and outputs the
/// resulting charts.
#[derive(Args, Debug)]
pub struct RenderCommand {
    #[arg(help = "Page ID, as listed by the `pages` command")]
    page: String,
    #[arg(
        short = 's',
        long = "set",
        value_name = "CONTROL=VALUE[,VALUE...]",
        value_parser = parse_selection,
        help = "Set a control before output, can be repeated"
    )]
    selections: Vec<Selection>,
    #[arg(
        short = 'f',
        long,
        value_name = "json|csv",
        default_value = "json",
        help = "Output format for the charts"
    )]
    output_format: OutputFormat,
    #[arg(long, help = "Pretty print JSON output")]
    pretty: bool,
    #[arg(short = 'o', long, help = "Output file to place the charts")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

/// Replaces the charts with the same id as any of `updates`
fn merge_charts(charts: &mut [RenderedChart], updates: Vec<RenderedChart>) {
    for update in updates {
        if let Some(chart) = charts.iter_mut().find(|chart| chart.id == update.id) {
            *chart = update;
        }
    }
}

impl RunCommand for RenderCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `render` subcommand");
        let mut dashboard = Dashboard::new_with_config(config);
        let view = with_spinner(self.quiet, || dashboard.mount(&self.page))?;
        let mut charts = view.charts;
        match view.error {
            Some(error) => {
                warn!("Page '{}' failed to load: {error}", self.page);
                if !self.selections.is_empty() {
                    warn!("Ignoring selections for a page that failed to load");
                }
            }
            None => {
                for selection in &self.selections {
                    let updates =
                        dashboard.fire(&self.page, &selection.control, selection.value.clone())?;
                    merge_charts(&mut charts, updates);
                }
            }
        }
        write_output(
            self.output_format.formatter(self.pretty),
            &charts,
            self.output_file.as_deref(),
        )
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Render the charts of the Covid economic impact dashboard", long_about = None, name="covid-impact")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// List the dashboard pages
    Pages(PagesCommand),
    /// Load a page and list its controls
    Controls(ControlsCommand),
    /// Load a page, apply selections and output its charts
    Render(RenderCommand),
}
