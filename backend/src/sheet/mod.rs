//! Spreadsheet grid I/O.
//!
//! The intermediate table travels between the two pipelines as a spreadsheet.
//! Workbooks (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with calamine from a
//! temporary file; CSV exports are decoded with encoding and delimiter
//! auto-detection. Only the first sheet is used and every cell is read as text.

pub mod upload;

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_xlsxwriter::{ColNum, RowNum, Workbook};
use std::io::Write;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::models::Grid;

pub use upload::TempUpload;

/// Sheet name used when writing workbooks.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Document formats accepted for the intermediate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Xlsm,
    Xls,
    Ods,
    Csv,
}

impl SheetFormat {
    /// Format from a file name's extension. Unknown or missing extensions are XLSX.
    pub fn from_file_name(name: Option<&str>) -> Self {
        let extension = name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") | Some("txt") => Self::Csv,
            Some("xlsm") => Self::Xlsm,
            Some("xls") => Self::Xls,
            Some("ods") => Self::Ods,
            _ => Self::Xlsx,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xlsm => "xlsm",
            Self::Xls => "xls",
            Self::Ods => "ods",
            Self::Csv => "csv",
        }
    }
}

// =============================================================================
// Workbooks
// =============================================================================

/// Read the first sheet of a workbook file.
pub fn read_workbook(path: &Path) -> SheetResult<Grid> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(SheetError::NoSheet)??;
    Ok(range_to_grid(&range))
}

/// Read uploaded bytes through a temporary file that is removed afterwards.
pub fn read_workbook_bytes(bytes: &[u8], format: SheetFormat, dir: &Path) -> SheetResult<Grid> {
    let upload = TempUpload::create(dir, format.extension(), bytes)?;
    let grid = read_workbook(upload.path());
    upload.close()?;
    grid
}

/// Rows and columns both start at `A1`. An empty key row (nothing written)
/// still occupies its position, so key rows never shift up.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };

    (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Text of a cell. Whole numbers lose their `.0` so a key typed as `1123` reads back as `"1123"`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Write a grid as an XLSX document with every cell stored as text.
pub fn write_xlsx(grid: &[Vec<String>], sheet_name: &str) -> SheetResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (r, row) in grid.iter().enumerate() {
        let row_num = RowNum::try_from(r).unwrap_or(RowNum::MAX);
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let col_num = ColNum::try_from(c).unwrap_or(ColNum::MAX);
            worksheet.write_string(row_num, col_num, cell.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(text) => return text.to_string(),
            // Short Latin-1 files are often detected as ASCII.
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0,
        _ => String::from_utf8_lossy(bytes),
    };
    decoded.into_owned()
}

/// Pick the separator that occurs most over the first lines.
///
/// Key rows are single cells, so the first line alone rarely has one.
pub fn detect_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(20)
        .collect();

    [b',', b';', b'\t', b'|']
        .into_iter()
        .map(|sep| {
            let count: usize = sample.iter().map(|l| l.matches(sep as char).count()).sum();
            (sep, count)
        })
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(sep, _)| sep)
        .unwrap_or(b',')
}

/// Read a CSV export of the intermediate table. Rows may have different lengths.
pub fn read_csv_bytes(bytes: &[u8]) -> SheetResult<Grid> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|record| -> SheetResult<Vec<String>> {
            Ok(record?.iter().map(str::to_string).collect())
        })
        .collect()
}

/// Write a grid as CSV. Key rows keep their single cell.
pub fn write_csv<W: Write>(grid: &[Vec<String>], writer: W) -> SheetResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in grid {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a spreadsheet file from disk, CSV or workbook by extension.
pub fn read_path(path: &Path) -> SheetResult<Grid> {
    match SheetFormat::from_file_name(path.to_str()) {
        SheetFormat::Csv => read_csv_bytes(&std::fs::read(path)?),
        _ => read_workbook(path),
    }
}
