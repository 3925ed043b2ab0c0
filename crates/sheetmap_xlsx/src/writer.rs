//! Stateful spreadsheet document that applies sheet projections to a workbook.

use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rust_xlsxwriter::{
    Format, FormatPattern, Table, TableColumn, TableStyle, Url, Workbook, Worksheet,
};

use crate::conf::{C_SHEET_NAME_REPLACEMENT, C_TAB_NAME_SUFFIX, MIME_TYPE_XLSX};
use crate::project::project_sheet;
use crate::record::{SheetRecord, SpecRecordSchema};
use crate::resolve::resolve_field_sequence;
use crate::spec::{
    EnumCellValue, EnumFieldValue, EnumFillPattern, EnumHyperlinkKind, EnumRowProjection,
    EnumTableStyle, SheetMapError, SpecCellFormat, SpecFieldDescriptor, SpecHyperlink,
    SpecSheetProjection, SpecSheetReport, SpecSheetWriteOptions, SpecWorksheetOptions,
};
use crate::util::{
    cast_col_num, cast_row_num, derive_unique_sheet_name, derive_unique_table_headers,
    sanitize_sheet_name,
};

struct SpecResolvedRecordType {
    type_name: String,
    sequence: Vec<SpecFieldDescriptor>,
}

/// Workbook accumulating one sheet per projected record sequence.
///
/// The workbook is buffered in memory until saved. [`Self::close`] releases it;
/// dropping an unclosed document releases it as well.
pub struct Spreadsheet {
    workbook: Option<Workbook>,
    write_options: SpecSheetWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_sheet_names: Vec<String>,
    l_reports: Vec<SpecSheetReport>,
    dict_record_types: HashMap<TypeId, SpecResolvedRecordType>,
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Spreadsheet {
    /// Media type of the saved workbook.
    pub const MIME_TYPE: &'static str = MIME_TYPE_XLSX;

    /// Empty document with default write options.
    pub fn new() -> Self {
        Self::with_options(SpecSheetWriteOptions::default())
    }

    /// Empty document with custom write options.
    pub fn with_options(write_options: SpecSheetWriteOptions) -> Self {
        Self {
            workbook: Some(Workbook::new()),
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_sheet_names: Vec::new(),
            l_reports: Vec::new(),
            dict_record_types: HashMap::new(),
        }
    }

    /// Whether [`Self::close`] has released the workbook.
    pub fn is_closed(&self) -> bool {
        self.workbook.is_none()
    }

    /// Tab names in creation order.
    pub fn sheet_names(&self) -> &[String] {
        &self.l_sheet_names
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecSheetReport> {
        self.l_reports.clone()
    }

    /// Project `records` onto a new worksheet appended to the document.
    ///
    /// `None` entries become placeholder rows. The field sequence of `T` is resolved on
    /// first use and cached for later sheets of the same type.
    pub fn create_and_append_worksheet<T>(
        &mut self,
        records: &[Option<T>],
        options: &SpecWorksheetOptions,
    ) -> Result<(), SheetMapError>
    where
        T: SheetRecord + 'static,
    {
        if self.is_closed() {
            return Err(SheetMapError::Closed);
        }

        let record_type = match self.dict_record_types.entry(TypeId::of::<T>()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let schema = T::schema();
                let sequence = resolve_field_sequence(&schema)?;
                entry.insert(SpecResolvedRecordType {
                    type_name: schema.type_name,
                    sequence,
                })
            }
        };

        let mut report = SpecSheetReport::default();
        let c_sheet_name =
            derive_sheet_name(&record_type.type_name, options.tab_name.as_deref(), &mut report);
        let projection = project_sheet(
            &c_sheet_name,
            &record_type.type_name,
            &record_type.sequence,
            records
                .iter()
                .map(|record| record.as_ref().map(SheetRecord::field_values)),
            options.if_make_table,
            &self.write_options,
        )?;

        self.append_projection(projection, report)
    }

    /// Project rows of an explicitly supplied schema onto a new worksheet.
    ///
    /// Each row holds the values in declaration order, or `None` for a placeholder row.
    /// The schema is resolved per call.
    pub fn create_and_append_worksheet_with_schema(
        &mut self,
        schema: &SpecRecordSchema,
        records: Vec<Option<Vec<EnumFieldValue>>>,
        options: &SpecWorksheetOptions,
    ) -> Result<(), SheetMapError> {
        if self.is_closed() {
            return Err(SheetMapError::Closed);
        }

        let sequence = resolve_field_sequence(schema)?;
        let mut report = SpecSheetReport::default();
        let c_sheet_name =
            derive_sheet_name(&schema.type_name, options.tab_name.as_deref(), &mut report);
        let projection = project_sheet(
            &c_sheet_name,
            &schema.type_name,
            &sequence,
            records,
            options.if_make_table,
            &self.write_options,
        )?;

        self.append_projection(projection, report)
    }

    fn append_projection(
        &mut self,
        mut projection: SpecSheetProjection,
        mut report: SpecSheetReport,
    ) -> Result<(), SheetMapError> {
        let workbook = self.workbook.as_mut().ok_or(SheetMapError::Closed)?;

        let mut set_sheet_names_existing = self.set_sheet_names_existing.clone();
        let c_sheet_name_unique =
            derive_unique_sheet_name(&projection.sheet_name, &mut set_sheet_names_existing);
        if c_sheet_name_unique != projection.sheet_name {
            report.warn(format!(
                "Sheet name {:?} already used; renamed to {c_sheet_name_unique:?}.",
                projection.sheet_name
            ));
            log::warn!(
                "sheet name {:?} already used; renamed to {c_sheet_name_unique:?}",
                projection.sheet_name
            );
            projection.sheet_name = c_sheet_name_unique;
        }

        report.sheet_name = projection.sheet_name.clone();
        report.n_rows_data = projection.rows.len();
        report.n_cols_visible = projection.width();
        report.table = projection.table;

        // Built detached so a failed write leaves the workbook untouched.
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&projection.sheet_name)?;
        write_projection(&mut worksheet, &projection, &self.write_options, &mut report)?;
        workbook.push_worksheet(worksheet);

        self.set_sheet_names_existing = set_sheet_names_existing;
        self.l_sheet_names.push(projection.sheet_name);
        self.l_reports.push(report);
        Ok(())
    }

    /// Save the workbook to `path`. An empty path is rejected before the writer is touched.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SheetMapError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SheetMapError::EmptySavePath);
        }

        let workbook = self.prepare_save()?;
        workbook.save(path)?;
        log::debug!("saved workbook to {}", path.display());
        Ok(())
    }

    /// Save the workbook into `stream` and rewind it to the start for read-back.
    pub fn save_to_stream<W>(&mut self, stream: &mut W) -> Result<(), SheetMapError>
    where
        W: Write + Seek,
    {
        let v_buffer = self.save_to_buffer()?;
        stream.write_all(&v_buffer)?;
        stream.flush()?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Save the workbook into an in-memory buffer.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, SheetMapError> {
        let workbook = self.prepare_save()?;
        Ok(workbook.save_to_buffer()?)
    }

    fn prepare_save(&mut self) -> Result<&mut Workbook, SheetMapError> {
        let workbook = self.workbook.as_mut().ok_or(SheetMapError::Closed)?;
        if let Some(c_first_sheet) = self.l_sheet_names.first() {
            workbook
                .worksheet_from_name(c_first_sheet)?
                .set_active(true);
        }
        Ok(workbook)
    }

    /// Release the workbook. Idempotent.
    pub fn close(&mut self) {
        self.workbook = None;
    }
}

impl Drop for Spreadsheet {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!(
                "releasing unclosed spreadsheet with {} sheet(s)",
                self.l_sheet_names.len()
            );
            self.close();
        }
    }
}

fn derive_sheet_name(
    type_name: &str,
    tab_name: Option<&str>,
    report: &mut SpecSheetReport,
) -> String {
    let c_sheet_name = match tab_name {
        Some(val) if !val.is_empty() => val.to_string(),
        _ => format!("{type_name}{C_TAB_NAME_SUFFIX}"),
    };

    let c_sheet_name_sanitized = sanitize_sheet_name(&c_sheet_name, C_SHEET_NAME_REPLACEMENT);
    if c_sheet_name_sanitized != c_sheet_name {
        report.warn(format!(
            "Sheet name {c_sheet_name:?} is not valid in Excel; using {c_sheet_name_sanitized:?}."
        ));
        log::warn!("sheet name {c_sheet_name:?} sanitized to {c_sheet_name_sanitized:?}");
    }
    c_sheet_name_sanitized
}

fn write_projection(
    worksheet: &mut Worksheet,
    projection: &SpecSheetProjection,
    write_options: &SpecSheetWriteOptions,
    report: &mut SpecSheetReport,
) -> Result<(), SheetMapError> {
    let fmt_header = derive_rust_xlsx_format(&write_options.fmt_header);
    for cell in &projection.header {
        if let EnumCellValue::Text(text) = &cell.value {
            worksheet.write_string_with_format(
                cast_row_num(cell.row)?,
                cast_col_num(cell.col)?,
                text,
                &fmt_header,
            )?;
        }
    }

    let dict_fmt_by_col: BTreeMap<usize, Format> = projection
        .columns
        .iter()
        .map(|column| {
            let fmt_column = if column.if_wrap {
                Format::new().set_text_wrap()
            } else {
                Format::new()
            };
            (column.col, fmt_column)
        })
        .collect();
    let mut dict_fmt_numeric: BTreeMap<(usize, String), Format> = BTreeMap::new();
    let fmt_placeholder_row = derive_rust_xlsx_format(&write_options.fmt_placeholder_row);
    let fmt_default = Format::new();

    for row_projection in &projection.rows {
        let cells = match row_projection {
            EnumRowProjection::Placeholder { row } => {
                worksheet.set_row_format(cast_row_num(*row)?, &fmt_placeholder_row)?;
                continue;
            }
            EnumRowProjection::Record { cells, .. } => cells,
        };

        for cell in cells {
            let n_row = cast_row_num(cell.row)?;
            let n_col = cast_col_num(cell.col)?;
            let fmt_column = dict_fmt_by_col.get(&cell.col).unwrap_or(&fmt_default);
            match &cell.value {
                EnumCellValue::Empty => {}
                EnumCellValue::Text(text) => {
                    worksheet.write_string_with_format(n_row, n_col, text, fmt_column)?;
                }
                EnumCellValue::Numeric {
                    value, num_format, ..
                } => {
                    let fmt_numeric = dict_fmt_numeric
                        .entry((cell.col, num_format.clone()))
                        .or_insert_with(|| fmt_column.clone().set_num_format(num_format));
                    worksheet.write_number_with_format(n_row, n_col, *value, fmt_numeric)?;
                }
                EnumCellValue::Hyperlink(link) => {
                    worksheet.write_url(n_row, n_col, derive_url(link))?;
                }
            }
        }
    }

    for column in &projection.columns {
        let n_col = cast_col_num(column.col)?;
        if let Some(fmt_column) = dict_fmt_by_col.get(&column.col) {
            worksheet.set_column_format(n_col, fmt_column)?;
        }
        if let Some(n_width) = column.width {
            worksheet.set_column_width(n_col, n_width)?;
        }
    }

    if let Some(region) = projection.table {
        if region.height() < 2 || region.width() == 0 {
            report.warn(format!(
                "Table skipped for sheet {:?}: needs at least one data row and one column.",
                projection.sheet_name
            ));
            log::warn!(
                "table skipped for sheet {:?}: {} rows x {} columns",
                projection.sheet_name,
                region.height(),
                region.width()
            );
        } else {
            let l_headers = projection.header_texts();
            let l_headers_unique = derive_unique_table_headers(l_headers.iter().copied());
            if l_headers_unique.iter().zip(&l_headers).any(|(a, b)| a.as_str() != *b) {
                report.warn(format!(
                    "Table column names in sheet {:?} renamed to be unique: {l_headers_unique:?}.",
                    projection.sheet_name
                ));
                log::warn!(
                    "table column names in sheet {:?} renamed to {l_headers_unique:?}",
                    projection.sheet_name
                );
            }
            let l_columns: Vec<TableColumn> = l_headers_unique
                .into_iter()
                .map(|text| TableColumn::new().set_header(text))
                .collect();
            let table = Table::new()
                .set_style(derive_table_style(write_options.table_style))
                .set_columns(&l_columns);
            worksheet.add_table(
                cast_row_num(region.row_first)?,
                cast_col_num(region.col_first)?,
                cast_row_num(region.row_last)?,
                cast_col_num(region.col_last)?,
                &table,
            )?;
            report.if_table_inserted = true;
        }
    }

    Ok(())
}

fn derive_url(link: &SpecHyperlink) -> Url {
    let c_target = match link.kind {
        EnumHyperlinkKind::Internal if !link.target.starts_with("internal:") => {
            format!("internal:{}", link.target)
        }
        _ => link.target.clone(),
    };

    let url = Url::new(c_target);
    if link.text.is_empty() {
        url
    } else {
        url.set_text(&link.text)
    }
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();
    if spec.is_empty() {
        return format;
    }

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.pattern {
        format = format.set_pattern(derive_format_pattern(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_pattern(pattern: EnumFillPattern) -> FormatPattern {
    match pattern {
        EnumFillPattern::None => FormatPattern::None,
        EnumFillPattern::Solid => FormatPattern::Solid,
        EnumFillPattern::LightGray => FormatPattern::LightGray,
        EnumFillPattern::LightTrellis => FormatPattern::LightTrellis,
        EnumFillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        EnumFillPattern::LightGrid => FormatPattern::LightGrid,
        EnumFillPattern::Gray125 => FormatPattern::Gray125,
    }
}

fn derive_table_style(style: EnumTableStyle) -> TableStyle {
    match style {
        EnumTableStyle::None => TableStyle::None,
        EnumTableStyle::Light1 => TableStyle::Light1,
        EnumTableStyle::Light9 => TableStyle::Light9,
        EnumTableStyle::Light15 => TableStyle::Light15,
        EnumTableStyle::Medium2 => TableStyle::Medium2,
        EnumTableStyle::Medium9 => TableStyle::Medium9,
        EnumTableStyle::Dark1 => TableStyle::Dark1,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::record::SpecFieldDecl;

    struct TestClass {
        test_string: Option<String>,
        test_string2: Option<String>,
    }

    impl TestClass {
        fn new(val: &str) -> Self {
            Self {
                test_string: Some(val.to_string()),
                test_string2: None,
            }
        }
    }

    impl SheetRecord for TestClass {
        fn schema() -> SpecRecordSchema {
            SpecRecordSchema::new("TestClass")
                .field(SpecFieldDecl::new("TestString"))
                .field(SpecFieldDecl::new("TestString2"))
        }

        fn field_values(&self) -> Vec<EnumFieldValue> {
            vec![
                self.test_string.clone().into(),
                self.test_string2.clone().into(),
            ]
        }
    }

    struct LinkRow {
        link: SpecHyperlink,
    }

    impl SheetRecord for LinkRow {
        fn schema() -> SpecRecordSchema {
            SpecRecordSchema::new("LinkRow").field(SpecFieldDecl::hyperlink("Link").fixed_width(30.0))
        }

        fn field_values(&self) -> Vec<EnumFieldValue> {
            vec![self.link.clone().into()]
        }
    }

    fn test_records() -> Vec<Option<TestClass>> {
        vec![Some(TestClass::new("Test")), Some(TestClass::new("Test"))]
    }

    fn read_part(v_buffer: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(v_buffer)).expect("zip archive");
        let mut file = archive.by_name(name).expect("zip part");
        let mut c_text = String::new();
        file.read_to_string(&mut c_text).expect("read part");
        c_text
    }

    fn find_tag<'a>(c_xml: &'a str, c_prefix: &str) -> &'a str {
        let n_start = c_xml.find(c_prefix).expect("tag present");
        let n_end = c_xml[n_start..].find('>').expect("tag end");
        &c_xml[n_start..n_start + n_end]
    }

    #[test]
    fn test_save_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("testfile1.xlsx");

        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(&test_records(), &SpecWorksheetOptions::default())
            .expect("append");
        doc.save(&path).expect("save");

        assert!(path.exists());
        assert_eq!(doc.sheet_names(), ["TestClassList".to_string()]);
    }

    #[test]
    fn test_save_missing_path_is_usage_error() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(&test_records(), &SpecWorksheetOptions::default())
            .expect("append");

        let err = doc.save("").unwrap_err();
        assert!(matches!(err, SheetMapError::EmptySavePath));
        assert!(err.is_usage_error());
        assert!(!doc.is_closed());
    }

    #[test]
    fn test_save_to_stream_rewinds() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(&test_records(), &SpecWorksheetOptions::default())
            .expect("append");

        let mut stream = Cursor::new(Vec::new());
        doc.save_to_stream(&mut stream).expect("save");

        assert_eq!(stream.position(), 0);
        let mut v_magic = [0u8; 2];
        stream.read_exact(&mut v_magic).expect("read back");
        assert_eq!(&v_magic, b"PK");
    }

    #[test]
    fn test_table_region_and_sheet_names_in_saved_parts() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(&test_records(), &SpecWorksheetOptions::default())
            .expect("append");
        let v_buffer = doc.save_to_buffer().expect("save");

        let c_workbook = read_part(&v_buffer, "xl/workbook.xml");
        assert!(c_workbook.contains("name=\"TestClassList\""));

        let c_table = read_part(&v_buffer, "xl/tables/table1.xml");
        assert!(c_table.contains("ref=\"A1:B3\""));

        let report = doc.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].n_rows_data, 2);
        assert_eq!(report[0].n_cols_visible, 2);
        assert!(report[0].if_table_inserted);
    }

    #[test]
    fn test_repeated_tab_names_are_made_unique_and_schema_cached() {
        let mut doc = Spreadsheet::new();
        let options = SpecWorksheetOptions::default();
        doc.create_and_append_worksheet(&test_records(), &options)
            .expect("append");
        doc.create_and_append_worksheet(&test_records(), &options)
            .expect("append");

        assert_eq!(
            doc.sheet_names(),
            ["TestClassList".to_string(), "TestClassList__2".to_string()]
        );
        assert_eq!(doc.dict_record_types.len(), 1);
        assert_eq!(doc.report()[1].warnings.len(), 1);

        let v_buffer = doc.save_to_buffer().expect("save");
        assert!(read_part(&v_buffer, "xl/workbook.xml").contains("name=\"TestClassList__2\""));
    }

    #[test]
    fn test_custom_tab_name_is_sanitized() {
        let mut doc = Spreadsheet::new();
        let options = SpecWorksheetOptions {
            tab_name: Some("Q1/Q2 [draft]".to_string()),
            if_make_table: false,
        };
        doc.create_and_append_worksheet(&test_records(), &options)
            .expect("append");

        assert_eq!(doc.sheet_names(), ["Q1_Q2 _draft_".to_string()]);
        let report = doc.report();
        assert_eq!(report[0].warnings.len(), 1);
        assert_eq!(report[0].table, None);
    }

    #[test]
    fn test_placeholder_rows_and_empty_table_handling() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(
            &[None, Some(TestClass::new("x")), None],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");
        doc.create_and_append_worksheet::<TestClass>(&[], &SpecWorksheetOptions::default())
            .expect("append");

        let report = doc.report();
        assert_eq!(report[0].n_rows_data, 3);
        assert!(report[0].if_table_inserted);
        assert!(!report[1].if_table_inserted);
        assert_eq!(report[1].warnings.len(), 2);

        let v_buffer = doc.save_to_buffer().expect("save");
        assert!(read_part(&v_buffer, "xl/tables/table1.xml").contains("ref=\"A1:B4\""));
    }

    #[test]
    fn test_hyperlinks_written_and_unsupported_kind_propagates() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(
            &[
                Some(LinkRow {
                    link: SpecHyperlink::external("Docs", "https://example.com/docs"),
                }),
                Some(LinkRow {
                    link: SpecHyperlink::internal("Back", "LinkRowList!A1"),
                }),
            ],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");
        assert!(doc.save_to_buffer().expect("save").starts_with(b"PK"));

        let err = doc
            .create_and_append_worksheet(
                &[Some(LinkRow {
                    link: SpecHyperlink {
                        text: "Mail".to_string(),
                        target: "someone@example.com".to_string(),
                        kind: EnumHyperlinkKind::Email,
                    },
                })],
                &SpecWorksheetOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SheetMapError::UnsupportedHyperlinkKind { .. }));
        assert!(!err.is_usage_error());
        assert_eq!(doc.sheet_names().len(), 1);
    }

    #[test]
    fn test_dynamic_schema_entry_point() {
        let schema = SpecRecordSchema::new("Dynamic")
            .field(SpecFieldDecl::new("Amount").format("0.00"))
            .field(SpecFieldDecl::new("Note").no_wrap());

        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet_with_schema(
            &schema,
            vec![Some(vec![12.5.into(), "ok".into()]), None],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");

        assert_eq!(doc.sheet_names(), ["DynamicList".to_string()]);
        assert!(doc.dict_record_types.is_empty());
    }

    #[test]
    fn test_colliding_table_headers_are_made_unique() {
        let schema = SpecRecordSchema::new("T")
            .field(SpecFieldDecl::new("A"))
            .field(SpecFieldDecl::new("B").display_name("A"))
            .field(SpecFieldDecl::new("Name"))
            .field(SpecFieldDecl::new("name"));

        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet_with_schema(
            &schema,
            vec![Some(vec!["1".into(), "2".into(), "x".into(), "y".into()])],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");

        let report = doc.report();
        assert!(report[0].if_table_inserted);
        assert_eq!(report[0].warnings.len(), 1);

        let v_buffer = doc.save_to_buffer().expect("save");
        let c_table = read_part(&v_buffer, "xl/tables/table1.xml");
        assert!(c_table.contains("ref=\"A1:D2\""));
        for c_name in ["\"A\"", "\"A2\"", "\"Name\"", "\"name2\""] {
            assert!(c_table.contains(&format!("name={c_name}")), "missing {c_name}");
        }
    }

    #[test]
    fn test_failed_write_leaves_workbook_untouched() {
        let mut doc = Spreadsheet::new();
        let options = SpecWorksheetOptions::default();
        let link_ok = LinkRow {
            link: SpecHyperlink::external("Docs", "https://example.com/docs"),
        };
        doc.create_and_append_worksheet(&[Some(link_ok)], &options)
            .expect("append");

        let link_long = LinkRow {
            link: SpecHyperlink::external(
                "Long",
                format!("https://example.com/{}", "a".repeat(2100)),
            ),
        };
        let err = doc
            .create_and_append_worksheet(&[Some(link_long)], &options)
            .unwrap_err();
        assert!(matches!(err, SheetMapError::Xlsx(_)));
        assert_eq!(doc.sheet_names(), ["LinkRowList".to_string()]);
        assert_eq!(doc.report().len(), 1);

        let link_again = LinkRow {
            link: SpecHyperlink::internal("Back", "LinkRowList!A1"),
        };
        doc.create_and_append_worksheet(&[Some(link_again)], &options)
            .expect("append");
        assert_eq!(
            doc.sheet_names(),
            ["LinkRowList".to_string(), "LinkRowList__2".to_string()]
        );
        assert_eq!(doc.report().len(), 2);

        let v_buffer = doc.save_to_buffer().expect("save");
        let c_workbook = read_part(&v_buffer, "xl/workbook.xml");
        assert_eq!(c_workbook.matches("<sheet ").count(), 2);
    }

    #[test]
    fn test_first_sheet_is_active_in_saved_workbook() {
        let mut doc = Spreadsheet::new();
        let options = SpecWorksheetOptions::default();
        doc.create_and_append_worksheet(&test_records(), &options)
            .expect("append");
        doc.create_and_append_worksheet(&test_records(), &options)
            .expect("append");

        let v_buffer = doc.save_to_buffer().expect("save");
        assert!(read_part(&v_buffer, "xl/worksheets/sheet1.xml").contains("tabSelected=\"1\""));
        assert!(!read_part(&v_buffer, "xl/worksheets/sheet2.xml").contains("tabSelected=\"1\""));
    }

    #[test]
    fn test_placeholder_row_carries_row_format_in_saved_sheet() {
        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet(
            &[None, Some(TestClass::new("x"))],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");

        let v_buffer = doc.save_to_buffer().expect("save");
        let c_sheet = read_part(&v_buffer, "xl/worksheets/sheet1.xml");
        let c_row_placeholder = find_tag(&c_sheet, "<row r=\"2\"");
        assert!(c_row_placeholder.contains("customFormat=\"1\""));
        assert!(c_row_placeholder.contains(" s=\""));
        assert!(!find_tag(&c_sheet, "<row r=\"3\"").contains("customFormat"));
    }

    #[test]
    fn test_fixed_width_reaches_saved_sheet() {
        let schema = SpecRecordSchema::new("Widths")
            .field(SpecFieldDecl::new("Wide").fixed_width(30.0))
            .field(SpecFieldDecl::new("Default"));

        let mut doc = Spreadsheet::new();
        doc.create_and_append_worksheet_with_schema(
            &schema,
            vec![Some(vec!["a".into(), "b".into()])],
            &SpecWorksheetOptions::default(),
        )
        .expect("append");

        let v_buffer = doc.save_to_buffer().expect("save");
        let c_sheet = read_part(&v_buffer, "xl/worksheets/sheet1.xml");
        let c_col_wide = find_tag(&c_sheet, "<col min=\"1\" max=\"1\"");
        assert!(c_col_wide.contains("width=\"30."));
        assert!(c_col_wide.contains("customWidth=\"1\""));
        assert!(!find_tag(&c_sheet, "<col min=\"2\" max=\"2\"").contains("customWidth"));
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_further_use() {
        let mut doc = Spreadsheet::new();
        doc.close();
        doc.close();

        assert!(doc.is_closed());
        let err = doc
            .create_and_append_worksheet(&test_records(), &SpecWorksheetOptions::default())
            .unwrap_err();
        assert!(matches!(err, SheetMapError::Closed));
        assert!(matches!(doc.save_to_buffer(), Err(SheetMapError::Closed)));
        assert!(matches!(doc.save(""), Err(SheetMapError::EmptySavePath)));
    }

    #[test]
    fn test_mime_type_constant() {
        assert_eq!(
            Spreadsheet::MIME_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}
