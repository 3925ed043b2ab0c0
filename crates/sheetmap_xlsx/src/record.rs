//! Record schema registration.
//!
//! A record type describes its fields once through [`SpecRecordSchema`] and yields
//! its runtime values in declaration order through [`SheetRecord::field_values`].

use crate::spec::{EnumCellKind, EnumFieldAnnotation, EnumFieldValue};

/// Record type that can be projected onto a worksheet.
///
/// ```
/// use sheetmap_xlsx::{EnumFieldValue, SheetRecord, SpecFieldDecl, SpecRecordSchema};
///
/// struct Employee {
///     name: String,
///     salary: f64,
/// }
///
/// impl SheetRecord for Employee {
///     fn schema() -> SpecRecordSchema {
///         SpecRecordSchema::new("Employee")
///             .field(SpecFieldDecl::new("Name").order(1).display_name("Full name"))
///             .field(SpecFieldDecl::new("Salary").format("#,##0.00"))
///     }
///
///     fn field_values(&self) -> Vec<EnumFieldValue> {
///         vec![self.name.clone().into(), self.salary.into()]
///     }
/// }
/// ```
pub trait SheetRecord {
    /// Type name and field declarations in declaration order.
    fn schema() -> SpecRecordSchema;

    /// Field values in declaration order.
    fn field_values(&self) -> Vec<EnumFieldValue>;
}

/// Declaration of one record field and its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFieldDecl {
    /// Declared field name.
    pub name: String,
    /// Cell kind.
    pub kind: EnumCellKind,
    /// Annotations in declaration order; same-kind repeats are allowed.
    pub annotations: Vec<EnumFieldAnnotation>,
}

impl SpecFieldDecl {
    /// Generic field without annotations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EnumCellKind::Generic,
            annotations: Vec::new(),
        }
    }

    /// Date/time field.
    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name).kind(EnumCellKind::DateTime)
    }

    /// Hyperlink field.
    pub fn hyperlink(name: impl Into<String>) -> Self {
        Self::new(name).kind(EnumCellKind::Hyperlink)
    }

    /// Set the cell kind.
    pub fn kind(mut self, kind: EnumCellKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append an annotation.
    pub fn annotate(mut self, annotation: EnumFieldAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Explicit column order.
    pub fn order(self, order: i64) -> Self {
        self.annotate(EnumFieldAnnotation::Order(order))
    }

    /// Exclude from the sheet.
    pub fn hidden(self) -> Self {
        self.annotate(EnumFieldAnnotation::Hidden)
    }

    /// Header text override.
    pub fn display_name(self, name: impl Into<String>) -> Self {
        self.annotate(EnumFieldAnnotation::DisplayName(name.into()))
    }

    /// Number or date pattern.
    pub fn format(self, pattern: impl Into<String>) -> Self {
        self.annotate(EnumFieldAnnotation::Format(pattern.into()))
    }

    /// Disable text wrap for the column.
    pub fn no_wrap(self) -> Self {
        self.annotate(EnumFieldAnnotation::NoWrap)
    }

    /// Fixed column width.
    pub fn fixed_width(self, width: f64) -> Self {
        self.annotate(EnumFieldAnnotation::FixedWidth(width))
    }
}

/// Field declaration table of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecordSchema {
    /// Record type name, used for the default tab name.
    pub type_name: String,
    /// Fields in declaration order.
    pub fields: Vec<SpecFieldDecl>,
}

impl SpecRecordSchema {
    /// Empty schema for `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field declaration.
    pub fn field(mut self, decl: SpecFieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
