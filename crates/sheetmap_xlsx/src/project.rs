//! Projection of a record sequence onto a writer-agnostic sheet plan.
//!
//! The pipeline runs once per call: header row, data rows, then column styles and
//! the table region. Nothing here touches the workbook.

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_ROW_DATA_FIRST, N_ROW_HEADER};
use crate::spec::{
    EnumCellKind, EnumCellValue, EnumFieldValue, EnumHyperlinkKind, EnumRowProjection,
    SheetMapError, SpecCellWrite, SpecColumnStyle, SpecFieldDescriptor, SpecSheetProjection,
    SpecSheetWriteOptions, SpecTableRegion,
};
use crate::util::{SpecNumberPattern, format_date_time, is_date_time_sentinel};

/// One visible column bound to its field descriptor.
#[derive(Debug, Clone)]
pub struct SpecVisibleColumn<'a> {
    /// 1-based column index.
    pub col: usize,
    /// Field shown in the column.
    pub descriptor: &'a SpecFieldDescriptor,
    /// Parsed number pattern; `None` when the effective pattern is not parseable.
    pub number_pattern: Option<SpecNumberPattern>,
}

/// Write one header cell per visible field and return the visible-column mapping.
pub fn emit_header<'a>(
    sequence: &'a [SpecFieldDescriptor],
    options: &SpecSheetWriteOptions,
) -> (Vec<SpecCellWrite>, Vec<SpecVisibleColumn<'a>>) {
    let mut l_header = Vec::new();
    let mut l_visible = Vec::new();

    for descriptor in sequence.iter().filter(|descriptor| !descriptor.hidden) {
        let col = l_visible.len() + 1;
        l_header.push(SpecCellWrite {
            row: N_ROW_HEADER,
            col,
            value: EnumCellValue::Text(descriptor.header_text().to_string()),
        });

        let number_pattern = match descriptor.kind {
            EnumCellKind::Generic => SpecNumberPattern::parse(
                descriptor
                    .number_or_date_format
                    .as_deref()
                    .unwrap_or(&options.fmt_number_default),
            ),
            EnumCellKind::DateTime | EnumCellKind::Hyperlink => None,
        };
        l_visible.push(SpecVisibleColumn {
            col,
            descriptor,
            number_pattern,
        });
    }

    (l_header, l_visible)
}

/// Project one record (or placeholder) at 1-based `row`.
///
/// Every visible column yields exactly one cell entry; absent values become
/// [`EnumCellValue::Empty`] so later columns never shift.
pub fn emit_row(
    values: Option<&[EnumFieldValue]>,
    row: usize,
    visible: &[SpecVisibleColumn<'_>],
    options: &SpecSheetWriteOptions,
) -> Result<EnumRowProjection, SheetMapError> {
    let Some(values) = values else {
        return Ok(EnumRowProjection::Placeholder { row });
    };

    let mut l_cells = Vec::with_capacity(visible.len());
    for column in visible {
        let value = values
            .get(column.descriptor.idx_decl)
            .unwrap_or(&EnumFieldValue::Null);
        l_cells.push(SpecCellWrite {
            row,
            col: column.col,
            value: project_cell(value, column, row, options)?,
        });
    }

    Ok(EnumRowProjection::Record {
        row,
        cells: l_cells,
    })
}

/// Convert one field value into a cell value, dispatching on the field's cell kind.
pub fn project_cell(
    value: &EnumFieldValue,
    column: &SpecVisibleColumn<'_>,
    row: usize,
    options: &SpecSheetWriteOptions,
) -> Result<EnumCellValue, SheetMapError> {
    let descriptor = column.descriptor;
    if matches!(value, EnumFieldValue::Null) {
        return Ok(EnumCellValue::Empty);
    }

    let err_kind_mismatch = || SheetMapError::FieldValueKindMismatch {
        field: descriptor.name.clone(),
        row,
        expected: descriptor.kind,
        actual: value.label(),
    };

    match descriptor.kind {
        EnumCellKind::DateTime => {
            let EnumFieldValue::DateTime(dt_value) = value else {
                return Err(err_kind_mismatch());
            };
            if is_date_time_sentinel(dt_value) {
                return Ok(EnumCellValue::Empty);
            }
            let c_pattern = descriptor
                .number_or_date_format
                .as_deref()
                .unwrap_or(&options.fmt_date_default);
            let c_text = format_date_time(dt_value, c_pattern).ok_or_else(|| {
                SheetMapError::InvalidDateFormat {
                    field: descriptor.name.clone(),
                    format: c_pattern.to_string(),
                }
            })?;
            Ok(EnumCellValue::Text(c_text))
        }
        EnumCellKind::Hyperlink => {
            let EnumFieldValue::Hyperlink(link) = value else {
                return Err(err_kind_mismatch());
            };
            match link.kind {
                EnumHyperlinkKind::External | EnumHyperlinkKind::Internal => {
                    Ok(EnumCellValue::Hyperlink(link.clone()))
                }
                EnumHyperlinkKind::Email | EnumHyperlinkKind::FilePath => {
                    Err(SheetMapError::UnsupportedHyperlinkKind {
                        field: descriptor.name.clone(),
                        row,
                        kind: link.kind,
                    })
                }
            }
        }
        EnumCellKind::Generic => {
            let c_text = match value {
                EnumFieldValue::Hyperlink(_) => return Err(err_kind_mismatch()),
                _ => derive_canonical_string(value),
            };
            let Some(n_value) = parse_real_number(&c_text) else {
                return Ok(EnumCellValue::Text(c_text));
            };
            let pattern =
                column
                    .number_pattern
                    .as_ref()
                    .ok_or_else(|| SheetMapError::InvalidNumberFormat {
                        field: descriptor.name.clone(),
                        format: descriptor
                            .number_or_date_format
                            .clone()
                            .unwrap_or_else(|| options.fmt_number_default.clone()),
                    })?;
            let (n_rounded, c_rendered) = pattern.render(n_value);
            Ok(EnumCellValue::Numeric {
                value: n_rounded,
                text: c_rendered,
                num_format: pattern.num_format.clone(),
            })
        }
    }
}

/// Canonical string form of a generic value.
pub fn derive_canonical_string(value: &EnumFieldValue) -> String {
    match value {
        EnumFieldValue::Null => String::new(),
        EnumFieldValue::Text(val) => val.clone(),
        EnumFieldValue::Integer(val) => val.to_string(),
        EnumFieldValue::Float(val) => val.to_string(),
        EnumFieldValue::Bool(val) => (if *val { "True" } else { "False" }).to_string(),
        EnumFieldValue::DateTime(val) => val.format("%Y-%m-%d %H:%M:%S").to_string(),
        EnumFieldValue::Hyperlink(val) => val.text.clone(),
    }
}

/// Parse a finite real number; `NaN`/`inf` spellings are not numbers here.
pub fn parse_real_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n_value| n_value.is_finite())
}

/// Column styles for every visible column and the optional table region.
pub fn format_columns(
    visible: &[SpecVisibleColumn<'_>],
    n_rows_data: usize,
    if_make_table: bool,
) -> (Vec<SpecColumnStyle>, Option<SpecTableRegion>) {
    let l_columns = visible
        .iter()
        .map(|column| SpecColumnStyle {
            col: column.col,
            if_wrap: !column.descriptor.no_wrap,
            width: column.descriptor.fixed_width,
        })
        .collect();

    let table = if_make_table.then_some(SpecTableRegion {
        row_first: N_ROW_HEADER,
        col_first: 1,
        row_last: N_ROW_HEADER + n_rows_data,
        col_last: visible.len(),
    });

    (l_columns, table)
}

/// Run the full projection for one sheet.
///
/// `records` yields one value vector per record in declaration order, or `None` for a
/// placeholder row. `sequence` is the resolved, ordered field sequence.
pub fn project_sheet<I>(
    sheet_name: &str,
    type_name: &str,
    sequence: &[SpecFieldDescriptor],
    records: I,
    if_make_table: bool,
    options: &SpecSheetWriteOptions,
) -> Result<SpecSheetProjection, SheetMapError>
where
    I: IntoIterator<Item = Option<Vec<EnumFieldValue>>>,
{
    let (l_header, l_visible) = emit_header(sequence, options);

    let mut l_rows = Vec::new();
    for (n_idx_record, values) in records.into_iter().enumerate() {
        if let Some(values) = &values
            && values.len() != sequence.len()
        {
            return Err(SheetMapError::FieldValueCountMismatch {
                type_name: type_name.to_string(),
                expected: sequence.len(),
                actual: values.len(),
            });
        }
        let row = N_ROW_DATA_FIRST + n_idx_record;
        l_rows.push(emit_row(values.as_deref(), row, &l_visible, options)?);
    }

    let n_rows_total = l_rows.len() + 1;
    if n_rows_total > N_NROWS_EXCEL_MAX || l_visible.len() > N_NCOLS_EXCEL_MAX {
        return Err(SheetMapError::SheetTooLarge {
            sheet_name: sheet_name.to_string(),
            n_rows: n_rows_total,
            n_cols: l_visible.len(),
        });
    }

    let (l_columns, table) = format_columns(&l_visible, l_rows.len(), if_make_table);

    log::debug!(
        "projected {type_name} onto sheet {sheet_name:?}: {} rows x {} visible columns",
        l_rows.len(),
        l_visible.len()
    );

    Ok(SpecSheetProjection {
        sheet_name: sheet_name.to_string(),
        header: l_header,
        rows: l_rows,
        columns: l_columns,
        table,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::record::{SpecFieldDecl, SpecRecordSchema};
    use crate::resolve::resolve_field_sequence;
    use crate::spec::SpecHyperlink;

    fn project(
        schema: &SpecRecordSchema,
        records: Vec<Option<Vec<EnumFieldValue>>>,
    ) -> Result<SpecSheetProjection, SheetMapError> {
        let sequence = resolve_field_sequence(schema).expect("resolve");
        project_sheet(
            "Sheet",
            &schema.type_name,
            &sequence,
            records,
            true,
            &SpecSheetWriteOptions::default(),
        )
    }

    fn cells(projection: &SpecSheetProjection, n_idx_row: usize) -> Vec<EnumCellValue> {
        match &projection.rows[n_idx_row] {
            EnumRowProjection::Record { cells, .. } => {
                cells.iter().map(|cell| cell.value.clone()).collect()
            }
            EnumRowProjection::Placeholder { row } => panic!("row {row} is a placeholder"),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("date")
    }

    fn two_strings() -> SpecRecordSchema {
        SpecRecordSchema::new("TestClass")
            .field(SpecFieldDecl::new("TestString"))
            .field(SpecFieldDecl::new("TestString2"))
    }

    #[test]
    fn test_header_uses_declared_names_in_order() {
        let projection = project(&two_strings(), vec![]).expect("project");
        assert_eq!(projection.header_texts(), vec!["TestString", "TestString2"]);
        assert_eq!(projection.header[1].row, 1);
        assert_eq!(projection.header[1].col, 2);
    }

    #[test]
    fn test_header_skips_hidden_and_applies_display_names() {
        let schema = SpecRecordSchema::new("Mixed")
            .field(SpecFieldDecl::new("Secret").hidden())
            .field(SpecFieldDecl::new("TestString").display_name("NewName1"))
            .field(SpecFieldDecl::new("TestString2").display_name("NewName2"))
            .field(SpecFieldDecl::new("First").order(1));

        let projection = project(
            &schema,
            vec![Some(vec!["s".into(), "a".into(), "b".into(), "f".into()])],
        )
        .expect("project");

        assert_eq!(projection.header_texts(), vec!["First", "NewName1", "NewName2"]);
        assert_eq!(
            cells(&projection, 0),
            vec![
                EnumCellValue::Text("f".to_string()),
                EnumCellValue::Text("a".to_string()),
                EnumCellValue::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_numeric_looking_text_becomes_numeric_cell() {
        let schema = SpecRecordSchema::new("Nums")
            .field(SpecFieldDecl::new("Plain"))
            .field(SpecFieldDecl::new("Money").format("#,##0.00"))
            .field(SpecFieldDecl::new("Word"));

        let projection = project(
            &schema,
            vec![Some(vec!["42".into(), 1234.5.into(), "Test".into()])],
        )
        .expect("project");

        assert_eq!(
            cells(&projection, 0),
            vec![
                EnumCellValue::Numeric {
                    value: 42.0,
                    text: "42.0".to_string(),
                    num_format: "0.0".to_string(),
                },
                EnumCellValue::Numeric {
                    value: 1234.5,
                    text: "1,234.50".to_string(),
                    num_format: "#,##0.00".to_string(),
                },
                EnumCellValue::Text("Test".to_string()),
            ]
        );
    }

    #[test]
    fn test_numeric_midpoints_round_away_from_zero() {
        let schema = SpecRecordSchema::new("Halves")
            .field(SpecFieldDecl::new("Default"))
            .field(SpecFieldDecl::new("Whole").format("0"));

        let projection = project(&schema, vec![Some(vec!["0.25".into(), "2.5".into()])])
            .expect("project");

        assert_eq!(
            cells(&projection, 0),
            vec![
                EnumCellValue::Numeric {
                    value: 0.3,
                    text: "0.3".to_string(),
                    num_format: "0.0".to_string(),
                },
                EnumCellValue::Numeric {
                    value: 3.0,
                    text: "3".to_string(),
                    num_format: "0".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_canonical_strings_of_scalars() {
        let schema = SpecRecordSchema::new("Scalars")
            .field(SpecFieldDecl::new("I"))
            .field(SpecFieldDecl::new("B"))
            .field(SpecFieldDecl::new("N"));

        let projection = project(
            &schema,
            vec![Some(vec![7i64.into(), true.into(), "NaN".into()])],
        )
        .expect("project");

        let l_cells = cells(&projection, 0);
        assert!(matches!(&l_cells[0], EnumCellValue::Numeric { text, .. } if text == "7.0"));
        assert_eq!(l_cells[1], EnumCellValue::Text("True".to_string()));
        assert_eq!(l_cells[2], EnumCellValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_null_values_leave_gaps_not_shifts() {
        let projection = project(
            &SpecRecordSchema::new("Gap")
                .field(SpecFieldDecl::new("A"))
                .field(SpecFieldDecl::new("B"))
                .field(SpecFieldDecl::new("C")),
            vec![Some(vec!["x".into(), EnumFieldValue::Null, "z".into()])],
        )
        .expect("project");

        let EnumRowProjection::Record { cells, .. } = &projection.rows[0] else {
            panic!("expected record row");
        };
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1].value, EnumCellValue::Empty);
        assert_eq!(cells[2].col, 3);
        assert_eq!(cells[2].value, EnumCellValue::Text("z".to_string()));
    }

    #[test]
    fn test_null_record_is_placeholder_and_keeps_row_indices() {
        let projection = project(
            &two_strings(),
            vec![
                Some(vec!["a".into(), "b".into()]),
                None,
                Some(vec!["c".into(), "d".into()]),
            ],
        )
        .expect("project");

        assert_eq!(projection.rows[1], EnumRowProjection::Placeholder { row: 3 });
        assert_eq!(projection.rows[2].row(), 4);
        assert_eq!(
            projection.table,
            Some(SpecTableRegion {
                row_first: 1,
                col_first: 1,
                row_last: 4,
                col_last: 2,
            })
        );
    }

    #[test]
    fn test_date_fields_default_custom_and_sentinel() {
        let schema = SpecRecordSchema::new("Dates")
            .field(SpecFieldDecl::date_time("Start"))
            .field(SpecFieldDecl::date_time("End").format("%Y-%m-%d"))
            .field(SpecFieldDecl::date_time("Unset"));

        let projection = project(
            &schema,
            vec![Some(vec![
                date(2023, 11, 5).into(),
                date(2024, 1, 31).into(),
                NaiveDateTime::MIN.into(),
            ])],
        )
        .expect("project");

        assert_eq!(
            cells(&projection, 0),
            vec![
                EnumCellValue::Text("11/05".to_string()),
                EnumCellValue::Text("2024-01-31".to_string()),
                EnumCellValue::Empty,
            ]
        );
    }

    #[test]
    fn test_invalid_date_pattern_fails() {
        let schema =
            SpecRecordSchema::new("BadDate").field(SpecFieldDecl::date_time("D").format("%Q"));
        let err = project(&schema, vec![Some(vec![date(2024, 1, 1).into()])]).unwrap_err();
        assert!(matches!(err, SheetMapError::InvalidDateFormat { .. }));
    }

    #[test]
    fn test_invalid_number_pattern_fails_only_for_numbers() {
        let schema = SpecRecordSchema::new("BadNum").field(SpecFieldDecl::new("N").format("0-0"));

        let projection = project(&schema, vec![Some(vec!["text".into()])]).expect("project");
        assert_eq!(
            cells(&projection, 0),
            vec![EnumCellValue::Text("text".to_string())]
        );

        let err = project(&schema, vec![Some(vec![5i64.into()])]).unwrap_err();
        assert!(matches!(err, SheetMapError::InvalidNumberFormat { .. }));
    }

    #[test]
    fn test_hyperlinks_external_internal_and_unsupported() {
        let schema = SpecRecordSchema::new("Links").field(SpecFieldDecl::hyperlink("Link"));

        let l_links = vec![
            SpecHyperlink::external("Docs", "https://example.com"),
            SpecHyperlink::internal("Jump", "Other!A1"),
        ];
        let projection = project(
            &schema,
            l_links
                .iter()
                .map(|link| Some(vec![link.clone().into()]))
                .collect(),
        )
        .expect("project");
        assert_eq!(
            cells(&projection, 1),
            vec![EnumCellValue::Hyperlink(l_links[1].clone())]
        );

        for kind in [EnumHyperlinkKind::Email, EnumHyperlinkKind::FilePath] {
            let link = SpecHyperlink {
                text: "x".to_string(),
                target: "y".to_string(),
                kind,
            };
            let err = project(&schema, vec![Some(vec![link.into()])]).unwrap_err();
            assert!(matches!(
                err,
                SheetMapError::UnsupportedHyperlinkKind { row: 2, kind: k, .. } if k == kind
            ));
        }
    }

    #[test]
    fn test_kind_and_count_mismatches_fail() {
        let schema = SpecRecordSchema::new("Kinds")
            .field(SpecFieldDecl::date_time("D"))
            .field(SpecFieldDecl::new("G"));

        let err = project(&schema, vec![Some(vec!["x".into(), "y".into()])]).unwrap_err();
        assert!(matches!(err, SheetMapError::FieldValueKindMismatch { .. }));

        let err = project(&schema, vec![Some(vec![EnumFieldValue::Null])]).unwrap_err();
        assert!(matches!(
            err,
            SheetMapError::FieldValueCountMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_column_styles_wrap_and_width() {
        let schema = SpecRecordSchema::new("TestClassWithDisplayWidth")
            .field(SpecFieldDecl::new("TestString").fixed_width(10.0))
            .field(SpecFieldDecl::new("Hidden").hidden().fixed_width(99.0))
            .field(SpecFieldDecl::new("TestString2").no_wrap());

        let projection = project(&schema, vec![Some(vec!["a".into(), "h".into(), "b".into()])])
            .expect("project");

        assert_eq!(
            projection.columns,
            vec![
                SpecColumnStyle {
                    col: 1,
                    if_wrap: true,
                    width: Some(10.0),
                },
                SpecColumnStyle {
                    col: 2,
                    if_wrap: false,
                    width: None,
                },
            ]
        );
    }

    #[test]
    fn test_table_region_spans_header_and_records() {
        let records = (0..5)
            .map(|n| Some(vec![n.to_string().into(), "x".into()]))
            .collect();
        let projection = project(&two_strings(), records).expect("project");

        let table = projection.table.expect("table");
        assert_eq!(table.height(), 6);
        assert_eq!(table.width(), projection.width());

        let sequence = resolve_field_sequence(&two_strings()).expect("resolve");
        let projection = project_sheet(
            "NoTable",
            "TestClass",
            &sequence,
            vec![None::<Vec<EnumFieldValue>>],
            false,
            &SpecSheetWriteOptions::default(),
        )
        .expect("project");
        assert_eq!(projection.table, None);
    }
}
