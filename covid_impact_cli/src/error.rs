use covid_impact::error::DashboardError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("{0}")]
    DashboardError(#[from] DashboardError),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid selection '{0}', expected CONTROL=VALUE[,VALUE...]")]
    InvalidSelectionArg(String),
}

pub type CliResult<T> = Result<T, CliError>;
