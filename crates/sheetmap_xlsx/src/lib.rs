//! `sheetmap_xlsx` v1:
//! Project typed record sequences onto XLSX worksheets.
//!
//! Modules:
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options/errors
//! - `record`  : record schema registration
//! - `resolve` : field metadata resolution and ordering
//! - `project` : header/row/column projection plan
//! - `util`    : pure helper functions
//! - `writer`  : spreadsheet document over `rust_xlsxwriter`
pub mod conf;
pub mod project;
pub mod record;
pub mod resolve;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    MIME_TYPE_XLSX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
pub use project::project_sheet;
pub use record::{SheetRecord, SpecFieldDecl, SpecRecordSchema};
pub use resolve::resolve_field_sequence;
pub use spec::{
    EnumCellKind, EnumCellValue, EnumFieldAnnotation, EnumFieldValue, EnumFillPattern,
    EnumHyperlinkKind, EnumRowProjection, EnumTableStyle, SheetMapError, SpecCellFormat,
    SpecCellWrite, SpecColumnStyle, SpecFieldDescriptor, SpecHyperlink, SpecSheetProjection,
    SpecSheetReport, SpecSheetWriteOptions, SpecTableRegion, SpecWorksheetOptions,
};
pub use util::sanitize_sheet_name;
pub use writer::Spreadsheet;
