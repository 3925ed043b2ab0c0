//! Field metadata resolution and deterministic field ordering.

use crate::record::{SpecFieldDecl, SpecRecordSchema};
use crate::spec::{EnumFieldAnnotation, SheetMapError, SpecFieldDescriptor};
use crate::util::find_duplicate_name;

/// Resolve every declared field into one descriptor, first annotation per kind winning.
///
/// Descriptors are returned in declaration order.
pub fn resolve_field_descriptors(
    schema: &SpecRecordSchema,
) -> Result<Vec<SpecFieldDescriptor>, SheetMapError> {
    if let Some(c_name) = find_duplicate_name(schema.fields.iter().map(|decl| decl.name.as_str()))
    {
        return Err(SheetMapError::DuplicateFieldName {
            type_name: schema.type_name.clone(),
            field: c_name.to_string(),
        });
    }

    schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx_decl, decl)| resolve_field_descriptor(idx_decl, decl))
        .collect()
}

fn resolve_field_descriptor(
    idx_decl: usize,
    decl: &SpecFieldDecl,
) -> Result<SpecFieldDescriptor, SheetMapError> {
    let mut descriptor = SpecFieldDescriptor {
        name: decl.name.clone(),
        idx_decl,
        kind: decl.kind,
        order: None,
        hidden: false,
        display_name: None,
        number_or_date_format: None,
        no_wrap: false,
        fixed_width: None,
    };

    for annotation in &decl.annotations {
        match annotation {
            EnumFieldAnnotation::Order(n_order) => {
                descriptor.order.get_or_insert(*n_order);
            }
            EnumFieldAnnotation::Hidden => descriptor.hidden = true,
            EnumFieldAnnotation::DisplayName(c_name) => {
                descriptor.display_name.get_or_insert_with(|| c_name.clone());
            }
            EnumFieldAnnotation::Format(c_fmt) => {
                descriptor
                    .number_or_date_format
                    .get_or_insert_with(|| c_fmt.clone());
            }
            EnumFieldAnnotation::NoWrap => descriptor.no_wrap = true,
            EnumFieldAnnotation::FixedWidth(n_width) => {
                if descriptor.fixed_width.is_none() {
                    if !n_width.is_finite() || *n_width <= 0.0 {
                        return Err(SheetMapError::InvalidFixedWidth {
                            field: decl.name.clone(),
                            width: *n_width,
                        });
                    }
                    descriptor.fixed_width = Some(*n_width);
                }
            }
        }
    }

    Ok(descriptor)
}

/// Ordered fields first (ascending, stable), then unordered fields in declaration order.
pub fn order_field_descriptors(descriptors: Vec<SpecFieldDescriptor>) -> Vec<SpecFieldDescriptor> {
    let (mut l_ordered, l_unordered): (Vec<_>, Vec<_>) = descriptors
        .into_iter()
        .partition(|descriptor| descriptor.order.is_some());

    l_ordered.sort_by_key(|descriptor| (descriptor.order, descriptor.idx_decl));
    l_ordered.extend(l_unordered);
    l_ordered
}

/// Resolve then order the fields of `schema`.
pub fn resolve_field_sequence(
    schema: &SpecRecordSchema,
) -> Result<Vec<SpecFieldDescriptor>, SheetMapError> {
    Ok(order_field_descriptors(resolve_field_descriptors(schema)?))
}
