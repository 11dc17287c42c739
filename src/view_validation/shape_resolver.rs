//! Output column shape of a prepared view query.

use crate::ecsql::PreparedQuery;
use crate::schema_catalog::{PrimitiveType, PropertyType, NAV_ID, NAV_REL_ECCLASSID};

/// One entry of a [`ColumnShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub name: String,
    pub origin_property_path: Option<String>,
    pub column_type: Option<PropertyType>,
    /// Type name used in mismatch messages (`null` when untyped)
    pub type_name: String,
    pub is_system_column: bool,
    /// Position of the query output column this entry comes from
    pub column_index: usize,
    /// Second entry of a navigation value (`<P>.RelECClassId`)
    pub is_navigation_companion: bool,
}

impl ResolvedColumn {
    pub fn is_navigation(&self) -> bool {
        self.column_type
            .as_ref()
            .is_some_and(PropertyType::is_navigation)
    }
}

/// Ordered column shape of one view query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnShape {
    pub columns: Vec<ResolvedColumn>,
}

impl ColumnShape {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// First entry named `name`, ignoring case.
    pub fn find(&self, name: &str) -> Option<(usize, &ResolvedColumn)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Build the shape of `prepared`. Navigation columns expand to the value
/// entry followed by its `RelECClassId` companion.
pub fn resolve(prepared: &PreparedQuery) -> ColumnShape {
    let mut columns = Vec::with_capacity(prepared.columns.len());
    for (index, column) in prepared.columns.iter().enumerate() {
        let is_navigation = column
            .column_type
            .as_ref()
            .is_some_and(PropertyType::is_navigation);
        if !is_navigation {
            columns.push(ResolvedColumn {
                name: column.name.clone(),
                origin_property_path: column.origin.clone(),
                column_type: column.column_type.clone(),
                type_name: column.type_name(),
                is_system_column: column.is_system,
                column_index: index,
                is_navigation_companion: false,
            });
            continue;
        }

        let origin = column.origin.as_deref().unwrap_or(&column.name);
        columns.push(ResolvedColumn {
            name: column.name.clone(),
            origin_property_path: Some(format!("{}.{}", origin, NAV_ID)),
            column_type: column.column_type.clone(),
            type_name: column.type_name(),
            is_system_column: false,
            column_index: index,
            is_navigation_companion: false,
        });
        let long = PropertyType::Primitive(PrimitiveType::Long);
        columns.push(ResolvedColumn {
            name: format!("{}.{}", column.name, NAV_REL_ECCLASSID),
            origin_property_path: Some(format!("{}.{}", origin, NAV_REL_ECCLASSID)),
            type_name: long.type_name(),
            column_type: Some(long),
            is_system_column: false,
            column_index: index,
            is_navigation_companion: true,
        });
    }
    ColumnShape { columns }
}
