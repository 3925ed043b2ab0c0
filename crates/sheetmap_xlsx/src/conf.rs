//! Sheet-mapping constants and default preset factories.

use crate::spec::{EnumFillPattern, SpecCellFormat, SpecSheetWriteOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Media type of the produced workbook.
pub const MIME_TYPE_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Suffix appended to the record type name for the default tab name.
pub const C_TAB_NAME_SUFFIX: &str = "List";
/// Replacement for illegal sheet-name characters.
pub const C_SHEET_NAME_REPLACEMENT: &str = "_";

/// 1-based row index of the header row.
pub const N_ROW_HEADER: usize = 1;
/// 1-based row index of the first data row.
pub const N_ROW_DATA_FIRST: usize = 2;

/// Default date pattern (chrono strftime): month unpadded, day two digits.
pub const C_FMT_DATE_DEFAULT: &str = "%-m/%d";
/// Default number pattern: one decimal digit.
pub const C_FMT_NUMBER_DEFAULT: &str = "0.0";

/// Default fill applied to placeholder rows.
pub fn derive_default_placeholder_row_format() -> SpecCellFormat {
    SpecCellFormat {
        pattern: Some(EnumFillPattern::LightTrellis),
        ..Default::default()
    }
}

/// Build default document-level write options.
pub fn derive_default_sheet_write_options() -> SpecSheetWriteOptions {
    SpecSheetWriteOptions::default()
}
