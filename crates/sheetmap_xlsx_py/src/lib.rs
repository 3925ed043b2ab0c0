use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyBool, PyBytes, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use sheetmap_xlsx::conf::derive_default_sheet_write_options;
use sheetmap_xlsx::{
    EnumCellKind, EnumFieldValue, EnumFillPattern, EnumHyperlinkKind, EnumTableStyle,
    MIME_TYPE_XLSX, SheetMapError, SpecCellFormat, SpecFieldDecl, SpecHyperlink,
    SpecRecordSchema, SpecSheetReport, SpecWorksheetOptions, Spreadsheet as RsSpreadsheet,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetmap.xlsx.spreadsheet.v1";

#[pyclass(name = "Spreadsheet")]
struct PySpreadsheet {
    inner: RsSpreadsheet,
}

#[pymethods]
impl PySpreadsheet {
    #[new]
    #[pyo3(signature = (fmt_header = None, fmt_placeholder_row = None, table_style = None))]
    fn new(
        fmt_header: Option<&Bound<'_, PyAny>>,
        fmt_placeholder_row: Option<&Bound<'_, PyAny>>,
        table_style: Option<&str>,
    ) -> PyResult<Self> {
        let mut cfg_write_options = derive_default_sheet_write_options();
        if let Some(patch) = parse_spec_cell_format(fmt_header)? {
            cfg_write_options.fmt_header = cfg_write_options.fmt_header.with_(patch);
        }
        if let Some(patch) = parse_spec_cell_format(fmt_placeholder_row)? {
            cfg_write_options.fmt_placeholder_row =
                cfg_write_options.fmt_placeholder_row.with_(patch);
        }
        if let Some(val) = table_style {
            cfg_write_options.table_style = parse_table_style(val)?;
        }

        Ok(Self {
            inner: RsSpreadsheet::with_options(cfg_write_options),
        })
    }

    fn __enter__(slf: PyRefMut<'_, Self>) -> PyRefMut<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc=None, _tb=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc: Option<&Bound<'_, PyAny>>,
        _tb: Option<&Bound<'_, PyAny>>,
    ) {
        self.close();
    }

    fn close(&mut self) {
        self.inner.close();
    }

    #[getter]
    fn closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names().to_vec()
    }

    /// Project `records` onto a new worksheet.
    ///
    /// `fields` lists field declarations (objects or dicts) in declaration order.
    /// Each record is a dict or object read by field name; `None` is a placeholder row.
    #[pyo3(signature = (
        records,
        fields,
        type_name = "Record",
        tab_name = None,
        make_table = true
    ))]
    fn create_and_append_worksheet(
        &mut self,
        records: &Bound<'_, PyAny>,
        fields: &Bound<'_, PyAny>,
        type_name: &str,
        tab_name: Option<String>,
        make_table: bool,
    ) -> PyResult<()> {
        let mut schema = SpecRecordSchema::new(type_name);
        for field_obj in fields.try_iter()? {
            schema = schema.field(parse_spec_field_decl(&field_obj?)?);
        }

        let mut l_rows = Vec::new();
        for record_obj in records.try_iter()? {
            let record_obj = record_obj?;
            if record_obj.is_none() {
                l_rows.push(None);
                continue;
            }

            let mut l_values = Vec::with_capacity(schema.len());
            for decl in &schema.fields {
                let value = match extract_optional_item(&record_obj, &decl.name)? {
                    Some(val) => parse_field_value(&val)?,
                    None => EnumFieldValue::Null,
                };
                l_values.push(value);
            }
            l_rows.push(Some(l_values));
        }

        let options = SpecWorksheetOptions {
            tab_name,
            if_make_table: make_table,
        };
        self.inner
            .create_and_append_worksheet_with_schema(&schema, l_rows, &options)
            .map_err(map_sheet_map_error)
    }

    fn save(&mut self, path: PathBuf) -> PyResult<()> {
        self.inner.save(path).map_err(map_sheet_map_error)
    }

    fn to_bytes<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let v_buffer = self.inner.save_to_buffer().map_err(map_sheet_map_error)?;
        Ok(PyBytes::new(py, &v_buffer))
    }

    fn report<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyTuple>> {
        let mut l_report_obj = Vec::new();
        for report in self.inner.report() {
            l_report_obj.push(create_report_dict(py, &report)?);
        }
        PyTuple::new(py, l_report_obj)
    }
}

fn create_report_dict<'py>(
    py: Python<'py>,
    report: &SpecSheetReport,
) -> PyResult<Bound<'py, PyDict>> {
    let dict_report = PyDict::new(py);
    dict_report.set_item("sheet_name", &report.sheet_name)?;
    dict_report.set_item("n_rows_data", report.n_rows_data)?;
    dict_report.set_item("n_cols_visible", report.n_cols_visible)?;
    dict_report.set_item(
        "table",
        report.table.map(|region| {
            (
                region.row_first,
                region.col_first,
                region.row_last,
                region.col_last,
            )
        }),
    )?;
    dict_report.set_item("table_inserted", report.if_table_inserted)?;
    dict_report.set_item("warnings", PyList::new(py, &report.warnings)?)?;
    Ok(dict_report)
}

fn map_sheet_map_error(err: SheetMapError) -> PyErr {
    if err.is_usage_error() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

fn parse_spec_cell_format(obj: Option<&Bound<'_, PyAny>>) -> PyResult<Option<SpecCellFormat>> {
    let Some(obj) = obj else {
        return Ok(None);
    };
    if obj.is_none() {
        return Ok(None);
    }

    let pattern = match extract_optional_item(obj, "pattern")? {
        Some(val) => Some(parse_fill_pattern(&extract_enum_name(&val)?)?),
        None => None,
    };
    Ok(Some(SpecCellFormat {
        font_name: extract_optional_value::<String>(obj, "font_name")?,
        font_size: extract_optional_value::<i64>(obj, "font_size")?,
        bold: extract_optional_value::<bool>(obj, "bold")?,
        italic: extract_optional_value::<bool>(obj, "italic")?,
        font_color: extract_optional_value::<String>(obj, "font_color")?,
        bg_color: extract_optional_value::<String>(obj, "bg_color")?,
        pattern,
        text_wrap: extract_optional_value::<bool>(obj, "text_wrap")?,
        num_format: extract_optional_value::<String>(obj, "num_format")?,
    }))
}

fn parse_fill_pattern(value: &str) -> PyResult<EnumFillPattern> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(EnumFillPattern::None),
        "solid" => Ok(EnumFillPattern::Solid),
        "light_gray" => Ok(EnumFillPattern::LightGray),
        "light_trellis" => Ok(EnumFillPattern::LightTrellis),
        "dark_trellis" => Ok(EnumFillPattern::DarkTrellis),
        "light_grid" => Ok(EnumFillPattern::LightGrid),
        "gray125" => Ok(EnumFillPattern::Gray125),
        _ => Err(PyValueError::new_err(format!(
            "Invalid fill pattern: {value}. Expected one of: none, solid, light_gray, \
             light_trellis, dark_trellis, light_grid, gray125."
        ))),
    }
}

fn parse_table_style(value: &str) -> PyResult<EnumTableStyle> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(EnumTableStyle::None),
        "light1" => Ok(EnumTableStyle::Light1),
        "light9" => Ok(EnumTableStyle::Light9),
        "light15" => Ok(EnumTableStyle::Light15),
        "medium2" => Ok(EnumTableStyle::Medium2),
        "medium9" => Ok(EnumTableStyle::Medium9),
        "dark1" => Ok(EnumTableStyle::Dark1),
        _ => Err(PyValueError::new_err(format!(
            "Invalid table style: {value}. Expected one of: none, light1, light9, light15, \
             medium2, medium9, dark1."
        ))),
    }
}

fn parse_spec_field_decl(obj: &Bound<'_, PyAny>) -> PyResult<SpecFieldDecl> {
    let c_name = extract_optional_item(obj, "name")?
        .ok_or_else(|| PyValueError::new_err("Field declaration requires a name."))?
        .extract::<String>()?;

    let mut decl = SpecFieldDecl::new(c_name);
    if let Some(val) = extract_optional_item(obj, "kind")? {
        decl = decl.kind(parse_cell_kind(&extract_enum_name(&val)?)?);
    }
    if let Some(val) = extract_optional_item(obj, "order")? {
        decl = decl.order(val.extract::<i64>()?);
    }
    if let Some(val) = extract_optional_item(obj, "hidden")?
        && val.extract::<bool>()?
    {
        decl = decl.hidden();
    }
    if let Some(val) = extract_optional_item(obj, "display_name")? {
        decl = decl.display_name(val.extract::<String>()?);
    }
    if let Some(val) = extract_optional_item(obj, "number_or_date_format")? {
        decl = decl.format(val.extract::<String>()?);
    }
    if let Some(val) = extract_optional_item(obj, "no_wrap")?
        && val.extract::<bool>()?
    {
        decl = decl.no_wrap();
    }
    if let Some(val) = extract_optional_item(obj, "fixed_width")? {
        decl = decl.fixed_width(val.extract::<f64>()?);
    }
    Ok(decl)
}

fn parse_cell_kind(value: &str) -> PyResult<EnumCellKind> {
    match value.to_ascii_lowercase().as_str() {
        "generic" => Ok(EnumCellKind::Generic),
        "datetime" | "date_time" => Ok(EnumCellKind::DateTime),
        "hyperlink" => Ok(EnumCellKind::Hyperlink),
        _ => Err(PyValueError::new_err(format!(
            "Invalid field kind: {value}. Expected one of: generic, datetime, hyperlink."
        ))),
    }
}

fn parse_hyperlink_kind(value: &str) -> PyResult<EnumHyperlinkKind> {
    match value.to_ascii_lowercase().as_str() {
        "external" => Ok(EnumHyperlinkKind::External),
        "internal" => Ok(EnumHyperlinkKind::Internal),
        "email" => Ok(EnumHyperlinkKind::Email),
        "file_path" | "filepath" => Ok(EnumHyperlinkKind::FilePath),
        _ => Err(PyValueError::new_err(format!(
            "Invalid hyperlink kind: {value}. Expected one of: external, internal, email, file_path."
        ))),
    }
}

/// Accept plain strings or enum members (by `name`).
fn extract_enum_name(obj: &Bound<'_, PyAny>) -> PyResult<String> {
    if let Ok(c_value) = obj.extract::<String>() {
        return Ok(c_value);
    }
    obj.getattr("name")?.extract::<String>()
}

fn parse_field_value(obj: &Bound<'_, PyAny>) -> PyResult<EnumFieldValue> {
    if obj.is_none() {
        return Ok(EnumFieldValue::Null);
    }
    // bool is a subclass of int
    if obj.is_instance_of::<PyBool>() {
        return Ok(EnumFieldValue::Bool(obj.extract::<bool>()?));
    }
    if obj.is_instance_of::<PyInt>() {
        return Ok(match obj.extract::<i64>() {
            Ok(n_value) => EnumFieldValue::Integer(n_value),
            Err(_) => EnumFieldValue::Text(obj.str()?.to_string()),
        });
    }
    if obj.is_instance_of::<PyFloat>() {
        return Ok(EnumFieldValue::Float(obj.extract::<f64>()?));
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(EnumFieldValue::Text(obj.extract::<String>()?));
    }
    // datetime is a subclass of date
    if let Ok(dt_value) = obj.extract::<NaiveDateTime>() {
        return Ok(EnumFieldValue::DateTime(dt_value));
    }
    if let Ok(date_value) = obj.extract::<NaiveDate>() {
        // aware datetimes fail the naive extraction above but still pass as dates
        if extract_optional_item(obj, "tzinfo")?.is_some() {
            return Err(PyValueError::new_err(
                "Timezone-aware datetime values are not supported; convert to naive first.",
            ));
        }
        return Ok(date_value.into());
    }
    if let Some(target) = extract_optional_item(obj, "target")? {
        return Ok(EnumFieldValue::Hyperlink(parse_hyperlink(obj, &target)?));
    }

    Ok(EnumFieldValue::Text(obj.str()?.to_string()))
}

fn parse_hyperlink(obj: &Bound<'_, PyAny>, target: &Bound<'_, PyAny>) -> PyResult<SpecHyperlink> {
    let kind = match extract_optional_item(obj, "kind")? {
        Some(val) => parse_hyperlink_kind(&extract_enum_name(&val)?)?,
        None => EnumHyperlinkKind::External,
    };
    let c_text = match extract_optional_item(obj, "text")? {
        Some(val) => val.extract::<String>()?,
        None => String::new(),
    };

    Ok(SpecHyperlink {
        text: c_text,
        target: target.extract::<String>()?,
        kind,
    })
}

fn extract_optional_value<T>(obj: &Bound<'_, PyAny>, key: &str) -> PyResult<Option<T>>
where
    for<'a> T: FromPyObject<'a>,
{
    match extract_optional_item(obj, key)? {
        Some(val) => Ok(Some(val.extract::<T>()?)),
        None => Ok(None),
    }
}

/// Read `key` from a dict or attribute `key` from an object; `None` when absent or None.
fn extract_optional_item<'py>(
    obj: &Bound<'py, PyAny>,
    key: &str,
) -> PyResult<Option<Bound<'py, PyAny>>> {
    let val = if let Ok(dict) = obj.downcast::<PyDict>() {
        match dict.get_item(key)? {
            Some(val) => val,
            None => return Ok(None),
        }
    } else {
        if !obj.hasattr(key)? {
            return Ok(None);
        }
        obj.getattr(key)?
    };

    if val.is_none() {
        return Ok(None);
    }
    Ok(Some(val))
}

#[pymodule]
fn _sheetmap_xlsx_rs(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpreadsheet>()?;
    module.add("MIME_TYPE_XLSX", MIME_TYPE_XLSX)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    Ok(())
}
