//! Shared sheet-mapping models, options, reports and errors.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::conf::{C_FMT_DATE_DEFAULT, C_FMT_NUMBER_DEFAULT, derive_default_placeholder_row_format};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Fill pattern subset used by header and placeholder-row formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFillPattern {
    /// No fill.
    None,
    /// Solid fill using `bg_color`.
    Solid,
    /// 25% gray dots.
    LightGray,
    /// Thin crossed diagonals.
    LightTrellis,
    /// Thick crossed diagonals.
    DarkTrellis,
    /// Thin grid.
    LightGrid,
    /// 12.5% gray dots.
    Gray125,
}

/// Cell/row/column format specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Font color (`#RRGGBB`).
    pub font_color: Option<String>,
    /// Background fill color (`#RRGGBB`).
    pub bg_color: Option<String>,
    /// Fill pattern.
    pub pattern: Option<EnumFillPattern>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            pattern: other.pattern.or(self.pattern),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

/// Table style preset applied to the table region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTableStyle {
    /// Plain table without banding colors.
    None,
    /// Light style 1 (default).
    #[default]
    Light1,
    /// Light style 9.
    Light9,
    /// Light style 15.
    Light15,
    /// Medium style 2.
    Medium2,
    /// Medium style 9.
    Medium9,
    /// Dark style 1.
    Dark1,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldSpecification

/// Closed cell-kind tag assigned per field at declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCellKind {
    /// Canonical string, numeric when it parses as a real number.
    #[default]
    Generic,
    /// Date/time rendered through a date pattern.
    DateTime,
    /// Hyperlink cell.
    Hyperlink,
}

/// One declarative annotation attached to a field declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFieldAnnotation {
    /// Explicit column order (ascending).
    Order(i64),
    /// Field consumes no column.
    Hidden,
    /// Header text override.
    DisplayName(String),
    /// Number or date pattern.
    Format(String),
    /// Disable wrap for the column.
    NoWrap,
    /// Fixed column width in character units.
    FixedWidth(f64),
}

/// Resolved per-field metadata, one value per annotation kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFieldDescriptor {
    /// Declared field name.
    pub name: String,
    /// Zero-based declaration position; indexes `SheetRecord::field_values`.
    pub idx_decl: usize,
    /// Cell kind used by the row projector.
    pub kind: EnumCellKind,
    /// Explicit order, `None` when unordered.
    pub order: Option<i64>,
    /// Hidden fields consume no column.
    pub hidden: bool,
    /// Header text override.
    pub display_name: Option<String>,
    /// Number or date pattern.
    pub number_or_date_format: Option<String>,
    /// Wrap disabled for the column.
    pub no_wrap: bool,
    /// Fixed column width.
    pub fixed_width: Option<f64>,
}

impl SpecFieldDescriptor {
    /// Header text: display-name override or declared name.
    pub fn header_text(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldValues

/// Hyperlink target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumHyperlinkKind {
    /// Web URL.
    External,
    /// Location inside the workbook (`Sheet!A1`).
    Internal,
    /// Mail address. Not supported by the projector.
    Email,
    /// Local file path. Not supported by the projector.
    FilePath,
}

/// Hyperlink field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHyperlink {
    /// Display text.
    pub text: String,
    /// Link target.
    pub target: String,
    /// Target kind.
    pub kind: EnumHyperlinkKind,
}

impl SpecHyperlink {
    /// External URL link.
    pub fn external(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: target.into(),
            kind: EnumHyperlinkKind::External,
        }
    }

    /// In-workbook link.
    pub fn internal(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: target.into(),
            kind: EnumHyperlinkKind::Internal,
        }
    }
}

/// Runtime value of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFieldValue {
    /// Absent value; no cell is written.
    Null,
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Date/time value.
    DateTime(NaiveDateTime),
    /// Hyperlink value.
    Hyperlink(SpecHyperlink),
}

impl EnumFieldValue {
    /// Short variant label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::DateTime(_) => "date-time",
            Self::Hyperlink(_) => "hyperlink",
        }
    }
}

impl From<String> for EnumFieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for EnumFieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for EnumFieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for EnumFieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for EnumFieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for EnumFieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for EnumFieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for EnumFieldValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<bool> for EnumFieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDateTime> for EnumFieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for EnumFieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<SpecHyperlink> for EnumFieldValue {
    fn from(value: SpecHyperlink) -> Self {
        Self::Hyperlink(value)
    }
}

impl<T> From<Option<T>> for EnumFieldValue
where
    T: Into<EnumFieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ProjectionSpecification

/// Typed value written at one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Column slot consumed, nothing written.
    Empty,
    /// Text cell.
    Text(String),
    /// Numeric cell; `text` is the pattern rendering of `value`.
    Numeric {
        /// Value rounded to the pattern's decimals.
        value: f64,
        /// Rendered text.
        text: String,
        /// Excel number format applied to the cell.
        num_format: String,
    },
    /// Hyperlink cell.
    Hyperlink(SpecHyperlink),
}

/// One planned cell write at 1-based `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCellWrite {
    /// 1-based row index.
    pub row: usize,
    /// 1-based column index.
    pub col: usize,
    /// Cell value.
    pub value: EnumCellValue,
}

/// One projected data row.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumRowProjection {
    /// Null record: styled row without cells.
    Placeholder {
        /// 1-based row index.
        row: usize,
    },
    /// Non-null record: one entry per visible column.
    Record {
        /// 1-based row index.
        row: usize,
        /// Cells in visible-column order.
        cells: Vec<SpecCellWrite>,
    },
}

impl EnumRowProjection {
    /// 1-based row index.
    pub fn row(&self) -> usize {
        match self {
            Self::Placeholder { row } | Self::Record { row, .. } => *row,
        }
    }
}

/// Style of one visible column.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecColumnStyle {
    /// 1-based column index.
    pub col: usize,
    /// Wrap text enabled.
    pub if_wrap: bool,
    /// Fixed width; `None` keeps the writer default.
    pub width: Option<f64>,
}

/// Inclusive 1-based table bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecTableRegion {
    /// Top row.
    pub row_first: usize,
    /// Left column.
    pub col_first: usize,
    /// Bottom row.
    pub row_last: usize,
    /// Right column.
    pub col_last: usize,
}

impl SpecTableRegion {
    /// Rows spanned, header included.
    pub fn height(&self) -> usize {
        self.row_last + 1 - self.row_first
    }

    /// Columns spanned; zero when the region has no visible column.
    pub fn width(&self) -> usize {
        (self.col_last + 1).saturating_sub(self.col_first)
    }
}

/// Full projection of one record sequence onto one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetProjection {
    /// Tab name.
    pub sheet_name: String,
    /// Header cells (row 1).
    pub header: Vec<SpecCellWrite>,
    /// Data rows (row 2..).
    pub rows: Vec<EnumRowProjection>,
    /// Per visible column style.
    pub columns: Vec<SpecColumnStyle>,
    /// Table region when requested.
    pub table: Option<SpecTableRegion>,
}

impl SpecSheetProjection {
    /// Number of visible columns.
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Header texts in column order.
    pub fn header_texts(&self) -> Vec<&str> {
        self.header
            .iter()
            .filter_map(|cell| match &cell.value {
                EnumCellValue::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Per-call options of `Spreadsheet::create_and_append_worksheet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorksheetOptions {
    /// Tab name; defaults to `{TypeName}List`.
    pub tab_name: Option<String>,
    /// Define a table region over header and data rows.
    pub if_make_table: bool,
}

impl Default for SpecWorksheetOptions {
    fn default() -> Self {
        Self {
            tab_name: None,
            if_make_table: true,
        }
    }
}

/// Document-wide options for formats and default patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetWriteOptions {
    /// Format of header cells.
    pub fmt_header: SpecCellFormat,
    /// Row format of placeholder rows.
    pub fmt_placeholder_row: SpecCellFormat,
    /// Table style preset.
    pub table_style: EnumTableStyle,
    /// Date pattern used when a field has none.
    pub fmt_date_default: String,
    /// Number pattern used when a field has none.
    pub fmt_number_default: String,
}

impl Default for SpecSheetWriteOptions {
    fn default() -> Self {
        Self {
            fmt_header: SpecCellFormat::default(),
            fmt_placeholder_row: derive_default_placeholder_row_format(),
            table_style: EnumTableStyle::Light1,
            fmt_date_default: C_FMT_DATE_DEFAULT.to_string(),
            fmt_number_default: C_FMT_NUMBER_DEFAULT.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-sheet write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Data rows written, placeholder rows included.
    pub n_rows_data: usize,
    /// Visible columns written.
    pub n_cols_visible: usize,
    /// Table region requested for the sheet.
    pub table: Option<SpecTableRegion>,
    /// Whether the table was inserted into the workbook.
    pub if_table_inserted: bool,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised by resolution, projection and persistence.
#[derive(Debug, Error)]
pub enum SheetMapError {
    /// Save target path is empty.
    #[error("Save path must not be empty.")]
    EmptySavePath,
    /// Document used after `close()`.
    #[error("Cannot write after close().")]
    Closed,
    /// Two declarations share one field name.
    #[error("Duplicate field name in record schema {type_name:?}: {field:?}")]
    DuplicateFieldName {
        /// Record type name.
        type_name: String,
        /// Duplicated field name.
        field: String,
    },
    /// Fixed width is not positive and finite.
    #[error("Field {field:?} has invalid fixed width {width}; expected a positive number.")]
    InvalidFixedWidth {
        /// Field name.
        field: String,
        /// Declared width.
        width: f64,
    },
    /// Record value vector does not match the schema.
    #[error("Record in {type_name:?} yielded {actual} values; schema declares {expected} fields.")]
    FieldValueCountMismatch {
        /// Record type name.
        type_name: String,
        /// Declared field count.
        expected: usize,
        /// Yielded value count.
        actual: usize,
    },
    /// Value variant does not fit the field's cell kind.
    #[error("Field {field:?} at row {row} expects a {expected:?} value, got {actual}.")]
    FieldValueKindMismatch {
        /// Field name.
        field: String,
        /// 1-based output row.
        row: usize,
        /// Declared cell kind.
        expected: EnumCellKind,
        /// Actual value label.
        actual: &'static str,
    },
    /// Hyperlink kind outside {External, Internal}.
    #[error("Hyperlink kind {kind:?} in field {field:?} at row {row} is not supported.")]
    UnsupportedHyperlinkKind {
        /// Field name.
        field: String,
        /// 1-based output row.
        row: usize,
        /// Offending kind.
        kind: EnumHyperlinkKind,
    },
    /// Date pattern is not a valid strftime pattern.
    #[error("Invalid date format {format:?} for field {field:?}.")]
    InvalidDateFormat {
        /// Field name.
        field: String,
        /// Offending pattern.
        format: String,
    },
    /// Number pattern cannot be interpreted.
    #[error("Invalid number format {format:?} for field {field:?}.")]
    InvalidNumberFormat {
        /// Field name.
        field: String,
        /// Offending pattern.
        format: String,
    },
    /// Sheet exceeds Excel row/column limits.
    #[error("Sheet {sheet_name:?} needs {n_rows} rows x {n_cols} columns; exceeds Excel limits.")]
    SheetTooLarge {
        /// Tab name.
        sheet_name: String,
        /// Rows including header.
        n_rows: usize,
        /// Visible columns.
        n_cols: usize,
    },
    /// Row/column index does not fit the writer's index type.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `row` or `column`.
        axis: &'static str,
        /// Offending index.
        value: usize,
    },
    /// Writer failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// Stream failure.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetMapError {
    /// Whether the error is caller-correctable input.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::EmptySavePath
                | Self::Closed
                | Self::DuplicateFieldName { .. }
                | Self::InvalidFixedWidth { .. }
                | Self::FieldValueCountMismatch { .. }
                | Self::FieldValueKindMismatch { .. }
                | Self::InvalidDateFormat { .. }
                | Self::InvalidNumberFormat { .. }
                | Self::SheetTooLarge { .. }
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
