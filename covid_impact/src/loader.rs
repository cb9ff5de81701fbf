//! Reading delimited text and Excel workbooks into polars `DataFrame`s.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use itertools::Itertools;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use crate::error::{DashboardError, DashboardResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Character encoding of a delimited source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    /// Transcode raw bytes to UTF-8
    fn decode(self, bytes: Vec<u8>) -> Vec<u8> {
        match self {
            Encoding::Utf8 => bytes,
            // Every Latin-1 byte is the code point of the same value
            Encoding::Latin1 => bytes
                .into_iter()
                .map(char::from)
                .collect::<String>()
                .into_bytes(),
        }
    }
}

fn default_separator() -> char {
    ','
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    Csv {
        #[serde(default = "default_separator")]
        separator: char,
    },
    /// A workbook; the first sheet is read when `sheet` is `None`
    Excel { sheet: Option<String> },
}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat::Csv {
            separator: default_separator(),
        }
    }
}

/// Where and how to read one source table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub path: String,
    #[serde(default)]
    pub format: SourceFormat,
    /// Lines (or sheet rows) to discard before the header row
    #[serde(default)]
    pub header_skip: usize,
    #[serde(default)]
    pub encoding: Encoding,
}

impl SourceSpec {
    pub fn csv(path: &str) -> Self {
        Self {
            path: path.into(),
            format: SourceFormat::default(),
            header_skip: 0,
            encoding: Encoding::Utf8,
        }
    }

    pub fn excel(path: &str, sheet: Option<&str>) -> Self {
        Self {
            path: path.into(),
            format: SourceFormat::Excel {
                sheet: sheet.map(str::to_string),
            },
            header_skip: 0,
            encoding: Encoding::Utf8,
        }
    }

    pub fn with_header_skip(self, header_skip: usize) -> Self {
        Self {
            header_skip,
            ..self
        }
    }

    pub fn with_encoding(self, encoding: Encoding) -> Self {
        Self { encoding, ..self }
    }
}

fn parse_error(path: &str, reason: impl ToString) -> DashboardError {
    DashboardError::ParseError {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Load a table described by `source`. The path is used as given, see `Config::resolve`.
pub fn load(source: &SourceSpec) -> DashboardResult<DataFrame> {
    info!("Attempting to load dataframe from {}", source.path);
    let df = match &source.format {
        SourceFormat::Csv { separator } => read_csv(source, *separator)?,
        SourceFormat::Excel { sheet } => read_excel(source, sheet.as_deref())?,
    };
    debug!("Loaded '{}' with shape {:?}", source.path, df.shape());
    Ok(df)
}

fn read_bytes(path: &str) -> DashboardResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => DashboardError::FileNotFound(path.to_string()),
        _ => DashboardError::IoError(err),
    })
}

/// Drop the first `n` lines of `bytes`
fn skip_lines(bytes: &[u8], n: usize) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..n {
        match rest.iter().position(|b| *b == b'\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return &[],
        }
    }
    rest
}

fn read_csv(source: &SourceSpec, separator: char) -> DashboardResult<DataFrame> {
    let separator = u8::try_from(separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| parse_error(&source.path, format!("non-ASCII separator {separator:?}")))?;
    let raw = read_bytes(&source.path)?;
    let decoded = source.encoding.decode(raw);
    let body = skip_lines(&decoded, source.header_skip);
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(parse_error(&source.path, "no header row"));
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(body.to_vec()))
        .finish()
        .map_err(|err| parse_error(&source.path, err))
}

/// Column type inferred from the non-empty cells of a sheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Text,
}

impl CellKind {
    fn of(cell: &Data) -> Option<Self> {
        match cell {
            Data::Empty => None,
            Data::Int(_) => Some(CellKind::Int),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(CellKind::Int),
            Data::Float(_) => Some(CellKind::Float),
            _ => Some(CellKind::Text),
        }
    }

    fn widen(self, other: Self) -> Self {
        match (self, other) {
            (CellKind::Text, _) | (_, CellKind::Text) => CellKind::Text,
            (CellKind::Float, _) | (_, CellKind::Float) => CellKind::Float,
            _ => CellKind::Int,
        }
    }
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{f:.0}")),
        other => Some(other.to_string()),
    }
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn sheet_column(name: &str, cells: &[&Data]) -> Series {
    let kind = cells
        .iter()
        .filter_map(|cell| CellKind::of(cell))
        .reduce(CellKind::widen)
        .unwrap_or(CellKind::Text);
    match kind {
        CellKind::Int => Series::new(
            name,
            cells
                .iter()
                .map(|cell| cell_to_f64(cell).map(|f| f as i64))
                .collect::<Vec<Option<i64>>>(),
        ),
        CellKind::Float => Series::new(
            name,
            cells
                .iter()
                .map(|cell| cell_to_f64(cell))
                .collect::<Vec<Option<f64>>>(),
        ),
        CellKind::Text => Series::new(
            name,
            cells
                .iter()
                .map(|cell| cell_to_string(cell))
                .collect::<Vec<Option<String>>>(),
        ),
    }
}

fn read_excel(source: &SourceSpec, sheet: Option<&str>) -> DashboardResult<DataFrame> {
    if !Path::new(&source.path).exists() {
        return Err(DashboardError::FileNotFound(source.path.clone()));
    }
    let mut workbook =
        open_workbook_auto(&source.path).map_err(|err| parse_error(&source.path, err))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| parse_error(&source.path, "workbook has no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| parse_error(&source.path, format!("sheet '{sheet_name}': {err}")))?;

    let mut rows = range.rows().skip(source.header_skip);
    let header = rows
        .next()
        .ok_or_else(|| parse_error(&source.path, format!("sheet '{sheet_name}' has no header")))?;
    let names = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| cell_to_string(cell).unwrap_or_else(|| format!("column_{}", idx + 1)))
        .collect_vec();
    let body = rows.collect_vec();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = body.iter().map(|row| &row[idx]).collect_vec();
            sheet_column(name, &cells)
        })
        .collect_vec();
    DataFrame::new(columns).map_err(|err| parse_error(&source.path, err))
}

/// Trim and lower-case every column name
pub fn normalize_column_names(mut df: DataFrame) -> DashboardResult<DataFrame> {
    let names = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect_vec();
    df.set_column_names(names.as_slice())?;
    Ok(df)
}

/// Fail with `SchemaMismatch` naming the first of `columns` absent from `df`
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> DashboardResult<()> {
    match columns
        .iter()
        .find(|name| df.get_column_index(name).is_none())
    {
        Some(missing) => Err(DashboardError::SchemaMismatch(missing.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> String {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn csv_with_preamble_should_load() {
        let dir = tempfile::tempdir().unwrap();
        let contents = [
            "\"Data Source\",\"World Development Indicators\",",
            "",
            "\"Last Updated Date\",\"2024-06-28\",",
            "",
            "\"Country Name\",\"Country Code\",\"2019\",\"2020\",",
            "\"France\",\"FRA\",\"8.4\",\"8.0\",",
            "\"Japan\",\"JPN\",\"2.4\",\"\",",
        ]
        .join("\n");
        let path = write_file(&dir, "gdp.csv", contents.as_bytes());

        let df = load(&SourceSpec::csv(&path).with_header_skip(4)).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("Country Name").unwrap().str().unwrap().get(1),
            Some("Japan")
        );
        let y2020 = df.column("2020").unwrap().cast(&DataType::Float64).unwrap();
        assert_eq!(y2020.f64().unwrap().get(0), Some(8.0));
        assert_eq!(y2020.f64().unwrap().get(1), None);
    }

    #[test]
    fn latin1_csv_should_decode() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = b"Country Name,Year\nC".to_vec();
        // 0xF4 is 'ô' in Latin-1 and invalid on its own in UTF-8
        contents.push(0xF4);
        contents.extend_from_slice(b"te d'Ivoire,2020\n");
        let path = write_file(&dir, "latin1.csv", &contents);

        let df = load(&SourceSpec::csv(&path).with_encoding(Encoding::Latin1)).unwrap();
        assert_eq!(
            df.column("Country Name").unwrap().str().unwrap().get(0),
            Some("Côte d'Ivoire")
        );
    }

    #[test]
    fn custom_separator_should_split() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "semi.csv", b"Time;France\n2019;1.5\n");
        let source = SourceSpec {
            format: SourceFormat::Csv { separator: ';' },
            ..SourceSpec::csv(&path)
        };
        let df = load(&source).unwrap();
        assert_eq!(df.shape(), (1, 2));
    }

    #[test]
    fn missing_files_are_reported() {
        let csv = load(&SourceSpec::csv("/nonexistent/file.csv"));
        assert!(matches!(csv, Err(DashboardError::FileNotFound(_))));
        let xlsx = load(&SourceSpec::excel("/nonexistent/file.xlsx", Some("Sheet1")));
        assert!(matches!(xlsx, Err(DashboardError::FileNotFound(_))));
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", b"a,b\n");
        let result = load(&SourceSpec::csv(&path).with_header_skip(3));
        assert!(matches!(result, Err(DashboardError::ParseError { .. })));
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "broken.xlsx", b"not a zip archive");
        let result = load(&SourceSpec::excel(&path, None));
        assert!(matches!(result, Err(DashboardError::ParseError { .. })));
    }

    enum Cell {
        Text(&'static str),
        Num(f64),
        Blank,
    }

    fn sheet_xml(rows: &[Vec<Cell>]) -> String {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                let cells = cells
                    .iter()
                    .enumerate()
                    .map(|(c, cell)| {
                        let pos = format!("{}{}", char::from(b'A' + c as u8), r + 1);
                        match cell {
                            Cell::Text(t) => {
                                format!(r#"<c r="{pos}" t="inlineStr"><is><t>{t}</t></is></c>"#)
                            }
                            Cell::Num(n) => format!(r#"<c r="{pos}"><v>{n}</v></c>"#),
                            Cell::Blank => String::new(),
                        }
                    })
                    .join("");
                format!(r#"<row r="{}">{cells}</row>"#, r + 1)
            })
            .join("");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
        )
    }

    /// Minimal xlsx package with one worksheet per (name, rows)
    fn write_workbook(
        dir: &tempfile::TempDir,
        name: &str,
        sheets: &[(&str, Vec<Vec<Cell>>)],
    ) -> String {
        let path = dir.path().join(name);
        let mut zip = ::zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        let options = ::zip::write::FileOptions::default();
        let mut put = |name: &str, contents: String| {
            zip.start_file(name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        };

        let overrides = (1..=sheets.len())
            .map(|i| format!(r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#))
            .join("");
        put(
            "[Content_Types].xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#),
        );
        put(
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        );
        let entries = sheets
            .iter()
            .enumerate()
            .map(|(i, (sheet, _))| {
                format!(r#"<sheet name="{sheet}" sheetId="{}" r:id="rId{}"/>"#, i + 1, i + 1)
            })
            .join("");
        put(
            "xl/workbook.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{entries}</sheets></workbook>"#),
        );
        let rels = (1..=sheets.len())
            .map(|i| format!(r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#))
            .join("");
        put(
            "xl/_rels/workbook.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#),
        );
        for (i, (_, rows)) in sheets.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(rows));
        }
        zip.finish().unwrap();
        path.to_string_lossy().into_owned()
    }

    fn support_workbook(dir: &tempfile::TempDir) -> String {
        use Cell::*;
        write_workbook(
            dir,
            "aids.xlsx",
            &[
                (
                    "Notes",
                    vec![
                        vec![Text("Source"), Text("Bruegel")],
                        vec![Text("Unit"), Text("bn EUR")],
                    ],
                ),
                (
                    "Aids",
                    vec![
                        vec![Text("Financial support by country"), Blank, Blank],
                        vec![Text("Country"), Text("Grants"), Text("Loans")],
                        vec![Text("France"), Num(40.5), Num(0.0)],
                        vec![Text("Italy"), Num(7.25), Num(12.0)],
                    ],
                ),
            ],
        )
    }

    #[test]
    fn named_sheet_loads_after_header_skip() {
        let dir = tempfile::tempdir().unwrap();
        let path = support_workbook(&dir);
        let df = load(&SourceSpec::excel(&path, Some("Aids")).with_header_skip(1)).unwrap();
        assert_eq!(df.get_column_names(), &["Country", "Grants", "Loans"]);
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("Country").unwrap().str().unwrap().get(1),
            Some("Italy")
        );
        assert_eq!(df.column("Grants").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Grants").unwrap().f64().unwrap().get(0), Some(40.5));
        assert_eq!(df.column("Loans").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Loans").unwrap().i64().unwrap().get(1), Some(12));
    }

    #[test]
    fn first_sheet_is_read_without_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = support_workbook(&dir);
        let df = load(&SourceSpec::excel(&path, None)).unwrap();
        assert_eq!(df.get_column_names(), &["Source", "Bruegel"]);
        assert_eq!(df.column("Bruegel").unwrap().str().unwrap().get(0), Some("bn EUR"));
    }

    #[test]
    fn missing_sheet_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = support_workbook(&dir);
        let result = load(&SourceSpec::excel(&path, Some("Summary")));
        assert!(
            matches!(&result, Err(DashboardError::ParseError { reason, .. }) if reason.contains("Summary")),
            "{result:?}"
        );
    }

    #[test]
    fn sheet_columns_are_typed() {
        let ints = [Data::Int(1), Data::Float(2.0), Data::Empty];
        let s = sheet_column("ints", &ints.iter().collect_vec());
        assert_eq!(s.dtype(), &DataType::Int64);
        assert_eq!(s.null_count(), 1);

        let floats = [Data::Int(1), Data::Float(2.5)];
        let s = sheet_column("floats", &floats.iter().collect_vec());
        assert_eq!(s.dtype(), &DataType::Float64);

        let text = [Data::String("a".into()), Data::Float(2.5)];
        let s = sheet_column("text", &text.iter().collect_vec());
        assert_eq!(s.dtype(), &DataType::String);
        assert_eq!(s.str().unwrap().get(1), Some("2.5"));
    }

    #[test]
    fn headers_are_normalized() {
        let df = df!(" Country " => &["France"], "Daily_New_Cases" => &[1]).unwrap();
        let df = normalize_column_names(df).unwrap();
        assert_eq!(df.get_column_names(), &["country", "daily_new_cases"]);
        assert!(require_columns(&df, &["country"]).is_ok());
        assert!(matches!(
            require_columns(&df, &["date"]),
            Err(DashboardError::SchemaMismatch(name)) if name == "date"
        ));
    }
}
