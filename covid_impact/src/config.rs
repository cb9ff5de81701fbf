use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loader::{Encoding, SourceFormat, SourceSpec};

/// File names of the sources, relative to `Config::data_dir`.
pub mod paths {
    pub const WORLD_GDP: &str = "World_Data/API_NY.GDP.MKTP.KD.ZG_DS2_en_csv_v2_23243.csv";
    pub const WORLD_INFLATION: &str = "World_Data/API_FP.CPI.TOTL.ZG_DS2_en_csv_v2_23195.csv";
    pub const WORLD_UNEMPLOYMENT: &str = "World_Data/API_SL.UEM.TOTL.ZS_DS2_en_csv_v2_25091.csv";
    pub const WORLD_HEALTH: &str = "World_Data/worldometer_coronavirus_daily_data.csv";

    pub const EUROPE_STOXX: &str = "Europe_Data/STOXX 600 Historical Data (1).csv";
    pub const EUROPE_GDP: &str = "Europe_Data/GDP_Dataset.csv";
    pub const EUROPE_INFLATION: &str = "Europe_Data/Inflation_Dataset.csv";
    pub const EUROPE_FREIGHT: &str = "Europe_Data/Freet_Dataset.csv";
    pub const EUROPE_TOURISM: &str = "Europe_Data/Tourism_Dataset.csv";
    pub const EUROPE_DEBTS: &str = "Europe_Data/Debts_Dataset.csv";
    pub const EUROPE_UNEMPLOYMENT: &str = "Europe_Data/Unemployment_Dataset.csv";
    pub const EUROPE_POVERTY: &str = "Europe_Data/Poverty_Dataset.csv";
    pub const EUROPE_SUPPORT: &str = "Europe_Data/Aids_Dataset.xlsx";

    pub const US_SP500: &str = "US_Data/SP500.csv";
    pub const US_NASDAQ: &str = "US_Data/NASDAQ100.csv";
    pub const US_GDP: &str = "US_Data/GDP.csv";
    pub const US_INFLATION: &str = "US_Data/Inflation_Dataset.csv";
    pub const US_UNEMPLOYMENT: &str = "US_Data/Unemployement_Dataset.csv";
    pub const US_DEBTS: &str = "US_Data/Debts.csv";

    pub const POLICY_STRINGENCY: &str = "Djamel_Data/stringency_index_avg.xlsx";
    pub const POLICY_UNEMPLOYMENT: &str = "Djamel_Data/unemployment_data.csv";
}
use paths as PATHS;

/// Number of metadata lines preceding the header of World Bank exports.
const WORLD_BANK_PREAMBLE: usize = 4;
const DEFAULT_SHEET: &str = "Sheet1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory every `SourceSpec::path` is relative to
    pub data_dir: String,
    /// First year plotted by the world and Asia pages
    pub min_year: i32,
    pub world: WorldSources,
    pub asia_countries: Vec<String>,
    pub europe: EuropeSources,
    pub us: UsSources,
    pub policy: PolicySources,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: "Data".into(),
            min_year: 2017,
            world: WorldSources::default(),
            asia_countries: vec!["China".into(), "Japan".into(), "South Korea".into()],
            europe: EuropeSources::default(),
            us: UsSources::default(),
            policy: PolicySources::default(),
        }
    }
}

impl Config {
    /// Returns a copy of `source` with its path resolved against `data_dir`
    pub fn resolve(&self, source: &SourceSpec) -> SourceSpec {
        SourceSpec {
            path: Path::new(&self.data_dir)
                .join(&source.path)
                .to_string_lossy()
                .into_owned(),
            ..source.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldSources {
    pub gdp: SourceSpec,
    pub inflation: SourceSpec,
    pub unemployment: SourceSpec,
    pub health: SourceSpec,
}

impl Default for WorldSources {
    fn default() -> Self {
        Self {
            gdp: SourceSpec::csv(PATHS::WORLD_GDP).with_header_skip(WORLD_BANK_PREAMBLE),
            inflation: SourceSpec::csv(PATHS::WORLD_INFLATION)
                .with_header_skip(WORLD_BANK_PREAMBLE),
            unemployment: SourceSpec::csv(PATHS::WORLD_UNEMPLOYMENT)
                .with_header_skip(WORLD_BANK_PREAMBLE),
            health: SourceSpec::csv(PATHS::WORLD_HEALTH),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EuropeSources {
    pub stoxx: SourceSpec,
    pub gdp: SourceSpec,
    pub inflation: SourceSpec,
    pub freight: SourceSpec,
    pub tourism: SourceSpec,
    pub debts: SourceSpec,
    pub unemployment: SourceSpec,
    pub poverty: SourceSpec,
    pub support: SourceSpec,
    /// Years shown side by side in the GDP distribution pies
    pub pie_years: (i64, i64),
}

impl Default for EuropeSources {
    fn default() -> Self {
        Self {
            stoxx: SourceSpec::csv(PATHS::EUROPE_STOXX),
            gdp: SourceSpec::csv(PATHS::EUROPE_GDP),
            inflation: SourceSpec::csv(PATHS::EUROPE_INFLATION),
            freight: SourceSpec::csv(PATHS::EUROPE_FREIGHT),
            tourism: SourceSpec::csv(PATHS::EUROPE_TOURISM),
            debts: SourceSpec::csv(PATHS::EUROPE_DEBTS),
            unemployment: SourceSpec::csv(PATHS::EUROPE_UNEMPLOYMENT),
            poverty: SourceSpec::csv(PATHS::EUROPE_POVERTY),
            support: SourceSpec::excel(PATHS::EUROPE_SUPPORT, Some(DEFAULT_SHEET)),
            pie_years: (2019, 2022),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UsSources {
    pub sp500: SourceSpec,
    pub nasdaq: SourceSpec,
    pub gdp: SourceSpec,
    pub inflation: SourceSpec,
    pub unemployment: SourceSpec,
    pub debts: SourceSpec,
}

impl Default for UsSources {
    fn default() -> Self {
        Self {
            sp500: SourceSpec::csv(PATHS::US_SP500),
            nasdaq: SourceSpec::csv(PATHS::US_NASDAQ),
            gdp: SourceSpec::csv(PATHS::US_GDP),
            inflation: SourceSpec::csv(PATHS::US_INFLATION),
            unemployment: SourceSpec::csv(PATHS::US_UNEMPLOYMENT),
            debts: SourceSpec::csv(PATHS::US_DEBTS),
        }
    }
}

/// Entity to income-group label, fixed once the configuration is read
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Classification {
    pub country: String,
    pub income_group: String,
}

impl Classification {
    fn new(country: &str, income_group: &str) -> Self {
        Self {
            country: country.into(),
            income_group: income_group.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PolicySources {
    pub stringency: SourceSpec,
    pub unemployment: SourceSpec,
    pub start_year: i32,
    pub end_year: i32,
    pub classification: Vec<Classification>,
}

impl Default for PolicySources {
    fn default() -> Self {
        const HIGH: &str = "1 - Haut Revenu";
        const EMERGING: &str = "2 - Émergent (Interm. Sup.)";
        const LOW: &str = "3 - Faible Revenu";
        Self {
            stringency: SourceSpec::excel(PATHS::POLICY_STRINGENCY, Some(DEFAULT_SHEET)),
            unemployment: SourceSpec::csv(PATHS::POLICY_UNEMPLOYMENT)
                .with_header_skip(WORLD_BANK_PREAMBLE)
                .with_encoding(Encoding::Latin1),
            start_year: 2020,
            end_year: 2023,
            classification: vec![
                Classification::new("France", HIGH),
                Classification::new("United Kingdom", HIGH),
                Classification::new("Japan", HIGH),
                Classification::new("Brazil", EMERGING),
                Classification::new("China", EMERGING),
                Classification::new("South Africa", EMERGING),
                Classification::new("Ethiopia", LOW),
                Classification::new("Sudan", LOW),
                Classification::new("Yemen", LOW),
            ],
        }
    }
}
