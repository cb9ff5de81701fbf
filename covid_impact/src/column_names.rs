//! This module stores the column names used across the source files and the derived tables. Names
//! of source columns must be kept in sync with the headers of the files under the data directory.

// World Bank "API_*" exports
pub const COUNTRY_NAME: &str = "Country Name";
pub const COUNTRY_CODE: &str = "Country Code";
pub const INDICATOR_NAME: &str = "Indicator Name";
pub const INDICATOR_CODE: &str = "Indicator Code";

// Worldometer daily health data (after header normalisation)
pub const HEALTH_COUNTRY: &str = "country";
pub const HEALTH_DATE: &str = "date";
pub const DAILY_NEW_CASES: &str = "daily_new_cases";
pub const ACTIVE_CASES: &str = "active_cases";
pub const DAILY_NEW_DEATHS: &str = "daily_new_deaths";

// Stringency index workbook
pub const POLICY_COUNTRY_CODE: &str = "country_code";
pub const POLICY_COUNTRY_NAME: &str = "country_name";
pub const POLICY_REGION_CODE: &str = "region_code";
pub const POLICY_REGION_NAME: &str = "region_name";
pub const POLICY_JURISDICTION: &str = "jurisdiction";

// Joined analysis table
pub const ENTITY: &str = "CountryName";
pub const DATE_RAW: &str = "Date_Raw";
pub const DATE: &str = "Date";
pub const YEAR: &str = "Year";
pub const YEAR_MONTH: &str = "Year_Month";
pub const STRINGENCY_INDEX: &str = "Stringency_Index";
pub const UNEMPLOYMENT_RATE: &str = "Unemployment_Rate";
pub const INCOME_GROUP: &str = "IncomeGroup_Custom";

// European and US time series
pub const TIME: &str = "Time";
pub const PRICE: &str = "Price";
pub const COUNTRY: &str = "Country";
pub const CATEGORY: &str = "Category";
pub const VALUE: &str = "Value";

// Default labels produced by `melt`
pub const VARIABLE: &str = "variable";
pub const MELTED_VALUE: &str = "value";

// Europe GDP distribution pies
pub const GDP: &str = "GDP";

// US series
pub const US_INFLATION: &str = "Inflation";
pub const US_UNEMPLOYMENT: &str = "Unemployement_Rate";
pub const US_DEBTS: &str = "Debts_Rate";
