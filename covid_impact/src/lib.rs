use log::debug;

use crate::config::Config;
use crate::controls::{ControlValue, PageController, PageView, RenderedChart};
use crate::error::{DashboardError, DashboardResult};

// Re-exports
pub use column_names as COL;

// Modules
pub mod aggregate;
pub mod analysis;
pub mod bridge;
pub mod chart;
pub mod column_names;
pub mod config;
pub mod controls;
pub mod error;
pub mod formatters;
pub mod loader;
pub mod pages;
pub mod reshape;

/// One dashboard session: the configuration and a controller per page. Pages load independently
/// and at most once.
pub struct Dashboard {
    pub config: Config,
    pages: Vec<Box<dyn PageController>>,
}

impl Dashboard {
    /// Setup the Dashboard object with default configuration
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Setup the Dashboard object with custom configuration
    pub fn new_with_config(config: Config) -> Self {
        debug!("config: {config:?}");
        Self {
            config,
            pages: pages::all(),
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = &dyn PageController> {
        self.pages.iter().map(|page| page.as_ref())
    }

    pub fn page(&self, id: &str) -> DashboardResult<&dyn PageController> {
        self.pages()
            .find(|page| page.meta().id == id)
            .ok_or_else(|| DashboardError::UnknownPage(id.to_string()))
    }

    fn page_mut(&mut self, id: &str) -> DashboardResult<&mut Box<dyn PageController>> {
        self.pages
            .iter_mut()
            .find(|page| page.meta().id == id)
            .ok_or_else(|| DashboardError::UnknownPage(id.to_string()))
    }

    /// Load the page if it has not been loaded yet and render all its charts
    pub fn mount(&mut self, id: &str) -> DashboardResult<PageView> {
        let config = self.config.clone();
        Ok(self.page_mut(id)?.mount(&config))
    }

    /// Set a control of a mounted page and re-render the charts bound to it
    pub fn fire(
        &mut self,
        id: &str,
        control: &str,
        value: ControlValue,
    ) -> DashboardResult<Vec<RenderedChart>> {
        self.page_mut(id)?.fire(control, value)
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}
